/* src/compiler/rust/src/tests/properties.rs */

use std::sync::Arc;

use super::{ESC, body_of, compiler, loader, render};
use crate::compiler::Compiler;
use crate::config::CompilerConfig;

#[test]
fn compilation_is_deterministic() {
  let source = "<ul s:foreach=\"$items as $item\"><li s:class=\"['odd' => $loop->odd]\" s:text=\"$item\"></li></ul>\
                <div s:ifcontent><s-template s:if=\"$x\"><?= $x ?></s-template></div>";
  let first = compiler(loader()).compile_source(source, None).unwrap();
  let second = compiler(loader()).compile_source(source, None).unwrap();
  assert_eq!(first, second);
}

#[test]
fn plain_markup_is_reproduced_byte_for_byte() {
  let source = "<!DOCTYPE html>\n<html lang=\"en\">\n<body class='x'>\n  <img src=a.png alt=\"\">\n  \
                <p>Fish &amp; chips</p>\n  <!-- note -->\n</body>\n</html>\n";
  assert_eq!(render(source), source);
}

#[test]
fn newlines_after_generated_blocks_survive() {
  assert_eq!(render("<?php $x = 1; ?>\n<p></p>"), "<?php $x = 1; ?>\n\n<p></p>");
  assert_eq!(render("<p s:if=\"$a\">a</p>\n"), "<?php if ($a): ?><p>a</p><?php endif; ?>\n\n");
}

#[test]
fn raw_regions_are_byte_for_byte() {
  assert_eq!(
    render("<div s:raw>{{ x }} <b s:if=\"1\">y</b> <s-card/></div>"),
    "<div>{{ x }} <b s:if=\"1\">y</b> <s-card/></div>"
  );
}

#[test]
fn fragments_never_emit_markup() {
  assert_eq!(render("<s-template><b>x</b></s-template>"), "<b>x</b>");
}

#[test]
fn loop_with_class_round_trip() {
  assert_eq!(
    render("<ul s:foreach=\"$items as $item\"><li s:class=\"['odd' => $loop->odd]\"><?= $item ?></li></ul>"),
    format!(
      "<?php $__iter_1 = $items; $__loop_parent_2 = $loop ?? null; \
       $loop = new \\Sugar\\Runtime\\LoopMetadata($__iter_1, $__loop_parent_2); \
       foreach ($__iter_1 as $item): $loop->next(); ?>\
       <ul><li class=\"<?php echo {ESC}::attr(\\Sugar\\Runtime\\HtmlAttributeHelper::classNames(['odd' => $loop->odd])); ?>\">\
       <?php echo {ESC}::html($item); ?></li></ul>\
       <?php endforeach; $loop = $__loop_parent_2; ?>"
    )
  );
}

#[test]
fn spread_skips_explicit_attributes() {
  let body = render("<a href=\"/\" class=\"btn\" s:spread=\"$rest\">x</a>");
  assert!(body.contains("spreadAttrs($rest, ['href', 'class'])"));
}

#[test]
fn generated_file_shape() {
  let code = compiler(loader()).compile_source("<p>x</p>", None).unwrap().code;
  assert!(code.starts_with("<?php\n\ndeclare(strict_types=1);\n\nreturn static function (array|object $__data = []): string {"));
  assert!(code.contains("extract($__data, EXTR_SKIP);\n    ob_start();\n    try {\n?><p>x</p><?php\n    } catch (\\Throwable $__exception) {"));
  assert!(code.ends_with("return (string) ob_get_clean();\n};\n"));
  assert_eq!(body_of(&code), "<p>x</p>");
}

fn configured(config: CompilerConfig) -> Compiler {
  Compiler::new(config, Arc::new(loader()))
}

#[test]
fn folding_and_strict_types_are_configurable() {
  let config =
    CompilerConfig { fold_literal_output: false, strict_types: false, ..CompilerConfig::default() };
  let code = configured(config).compile_source("<p><?= 'a' ?></p>", None).unwrap().code;
  assert!(!code.contains("declare(strict_types=1);"));
  assert_eq!(body_of(&code), format!("<p><?php echo {ESC}::html('a'); ?></p>"));
}

#[test]
fn prefixes_are_configurable() {
  let config = CompilerConfig {
    directive_prefix: "x".into(),
    component_prefix: "x".into(),
    ..CompilerConfig::default()
  };
  let compiled = configured(config)
    .compile_source("<x-template x:if=\"$a\"><p s:if=\"$b\">b</p></x-template>", None)
    .unwrap();
  assert_eq!(body_of(&compiled.code), "<?php if ($a): ?><p s:if=\"$b\">b</p><?php endif; ?>");
}

#[test]
fn times_can_count_from_one() {
  let config = CompilerConfig { times_one_based: true, ..CompilerConfig::default() };
  let compiled = configured(config).compile_source("<i s:times=\"2 as $n\">.</i>", None).unwrap();
  assert!(body_of(&compiled.code).contains("for ($n = 1; $n <= $__times_1; $n++):"));
}

#[test]
fn custom_escaper_class() {
  let config = CompilerConfig { escaper_class: "\\App\\Esc".into(), ..CompilerConfig::default() };
  let compiled = configured(config).compile_source("<p><?= $x ?></p>", None).unwrap();
  assert_eq!(body_of(&compiled.code), "<p><?php echo \\App\\Esc::html($x); ?></p>");
}
