/* src/compiler/rust/src/tests/composition.rs */

use super::{ESC, compiler, loader, render_page};
use crate::error::ErrorKind;

#[test]
fn child_blocks_replace_parent_blocks() {
  let loader = loader()
    .with("layout", "<html><title s:block=\"title\">Site</title><main s:block=\"content\">default</main></html>")
    .with("page", "<s-template s:extends=\"layout\"/>\n<main s:block=\"content\">mine</main>");
  assert_eq!(render_page(loader, "page"), "<html><title>Site</title><main>mine</main></html>");
}

#[test]
fn fragment_blocks_keep_the_parent_element() {
  let loader = loader()
    .with("layout", "<main class=\"wide\" s:block=\"content\">default</main>")
    .with("page", "<s-template s:extends=\"layout\"/><s-template s:block=\"content\">mine</s-template>");
  assert_eq!(render_page(loader, "page"), "<main class=\"wide\">mine</main>");
}

#[test]
fn append_and_prepend() {
  let layout = "<ul s:block=\"items\"><li>base</li></ul>";
  let append = loader()
    .with("layout", layout)
    .with("page", "<s-template s:extends=\"layout\"/><s-template s:append=\"items\"><li>more</li></s-template>");
  assert_eq!(render_page(append, "page"), "<ul><li>base</li><li>more</li></ul>");

  let prepend = loader()
    .with("layout", layout)
    .with("page", "<s-template s:extends=\"layout\"/><s-template s:prepend=\"items\"><li>first</li></s-template>");
  assert_eq!(render_page(prepend, "page"), "<ul><li>first</li><li>base</li></ul>");
}

#[test]
fn multi_level_inheritance() {
  let loader = loader()
    .with("base", "<title s:block=\"title\">Base</title><main s:block=\"body\">b</main>")
    .with(
      "mid",
      "<s-template s:extends=\"base\"/><main s:block=\"body\">mid <s-template s:block=\"inner\">i</s-template></main>",
    )
    .with("page", "<s-template s:extends=\"mid\"/><s-template s:block=\"inner\">page</s-template>");
  let compiled = compiler(loader).compile("page").unwrap();
  assert_eq!(super::body_of(&compiled.code), "<title>Base</title><main>mid page</main>");
  assert_eq!(
    compiled.dependencies,
    vec!["page.sugar.php".to_string(), "mid.sugar.php".to_string(), "base.sugar.php".to_string()]
  );
}

#[test]
fn extends_must_be_top_level() {
  let loader = loader()
    .with("layout", "<main></main>")
    .with("page", "<div><p s:extends=\"layout\"></p></div>");
  let err = compiler(loader).compile("page").unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Syntax);
  assert_eq!(err.message(), "s:extends is only allowed on a top-level element");
}

#[test]
fn includes_fill_the_host_or_dissolve() {
  let loader = loader()
    .with("partials/nav", "<nav>n</nav>")
    .with("page", "<header s:include=\"partials/nav\"></header><s-template s:include=\"partials/nav\"/>");
  assert_eq!(render_page(loader, "page"), "<header><nav>n</nav></header><nav>n</nav>");
}

#[test]
fn relative_includes_resolve_against_the_including_template() {
  let loader = loader()
    .with("partials/a", "<s-template s:include=\"./b\"/>")
    .with("partials/b", "<b>b</b>")
    .with("page", "<s-template s:include=\"partials/a\"/>");
  let compiled = compiler(loader).compile("page").unwrap();
  assert_eq!(super::body_of(&compiled.code), "<b>b</b>");
  assert!(compiled.dependencies.contains(&"partials/b.sugar.php".to_string()));
}

#[test]
fn include_with_scopes_variables() {
  let loader = loader()
    .with("card", "<b><?= $title ?></b>")
    .with("page", "<s-template s:include=\"card\" s:with=\"['title' => $t]\"/>");
  assert_eq!(
    render_page(loader, "page"),
    format!(
      "<?php (static function (array $__vars): void {{ extract($__vars, EXTR_SKIP); ?><b><?php echo {ESC}::html($title); ?></b><?php }})(['title' => $t]); ?>"
    )
  );
}

#[test]
fn with_requires_include() {
  let loader = loader().with("page", "<div s:with=\"[]\"></div>");
  let err = compiler(loader).compile("page").unwrap_err();
  assert_eq!(err.message(), "s:with requires s:include on the same element");
}

#[test]
fn circular_includes_name_the_chain() {
  let loader = loader()
    .with("a", "<s-template s:include=\"b\"/>")
    .with("b", "<s-template s:include=\"a\"/>");
  let err = compiler(loader).compile("a").unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Compilation);
  assert_eq!(
    err.message(),
    "Circular template reference detected: a.sugar.php -> b.sugar.php -> a.sugar.php"
  );
}

#[test]
fn circular_extends_is_detected() {
  let loader = loader()
    .with("a", "<s-template s:extends=\"b\"/>")
    .with("b", "<s-template s:extends=\"a\"/>");
  let err = compiler(loader).compile("a").unwrap_err();
  assert!(
    err.message().starts_with("Circular template reference detected: a.sugar.php -> b.sugar.php")
  );
}

#[test]
fn missing_include_target() {
  let loader = loader().with("page", "<p>\n<s-template s:include=\"nope\"/></p>");
  let err = compiler(loader).compile("page").unwrap_err();
  assert_eq!(err.kind(), ErrorKind::TemplateNotFound);
}

fn card_loader() -> crate::loader::MemoryTemplateLoader {
  loader().with(
    "components/s-card",
    "<article><h2><?= $title ?></h2><div s:slot>fallback</div><footer s:slot=\"footer\"></footer></article>",
  )
}

#[test]
fn components_bind_props_and_slots() {
  let loader = card_loader().with(
    "page",
    "<s-card title=\"Hi\" s:bind=\"$extra\"><p>Body</p><span s:slot=\"footer\">F</span></s-card>",
  );
  let compiled = compiler(loader).compile("page").unwrap();
  let body = super::body_of(&compiled.code);
  assert!(body.starts_with(
    "<?php ob_start(); ?><span>F</span><?php $__slot_1 = (string) ob_get_clean(); ?>\
     <?php ob_start(); ?><p>Body</p><?php $__slot_2 = (string) ob_get_clean(); ?>"
  ));
  assert!(body.contains(
    "<?php (static function (array $__vars, array $__slots): void { extract($__vars, EXTR_SKIP); ?><article>"
  ));
  assert!(body.contains(&format!("<h2><?php echo {ESC}::html($title); ?></h2>")));
  assert!(body.contains(
    "<div><?php if (isset($__slots['slot'])): echo $__slots['slot']; else: ?>fallback<?php endif; ?></div>"
  ));
  assert!(body.contains("<footer><?php if (isset($__slots['footer'])):"));
  assert!(body.ends_with(
    "</article><?php })(array_merge((array) ($extra), ['title' => 'Hi']), ['footer' => $__slot_1, 'slot' => $__slot_2]); ?>"
  ));
  assert_eq!(
    compiled.dependencies,
    vec!["page.sugar.php".to_string(), "components/s-card.sugar.php".to_string()]
  );
}

#[test]
fn components_accept_control_flow() {
  let loader = card_loader().with("page", "<s-card s:if=\"$show\" title=\"t\"/>");
  let body = render_page(loader, "page");
  assert!(body.starts_with("<?php if ($show): ?><?php (static function"));
  assert!(body.ends_with("})(['title' => 't'], []); ?><?php endif; ?>"));
}

#[test]
fn components_reject_attribute_directives() {
  let loader = card_loader().with("page", "<s-card s:class=\"$c\"></s-card>");
  let err = compiler(loader).compile("page").unwrap_err();
  assert_eq!(err.message(), "s:class cannot be used on component <s-card>");
}

#[test]
fn slot_filled_twice() {
  let loader = card_loader()
    .with("page", "<s-card><i s:slot=\"footer\">a</i><i s:slot=\"footer\">b</i></s-card>");
  let err = compiler(loader).compile("page").unwrap_err();
  assert_eq!(err.message(), "slot \"footer\" is filled twice");
}

#[test]
fn missing_component() {
  let loader = loader().with("page", "<s-missing/>");
  let err = compiler(loader).compile("page").unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ComponentNotFound);
}

#[test]
fn nested_components_expand() {
  let loader = loader()
    .with("components/s-icon", "<i><?= $name ?></i>")
    .with("components/s-button", "<button><s-icon name=\"go\"/><span s:slot></span></button>")
    .with("page", "<s-button>Save</s-button>");
  let compiled = compiler(loader).compile("page").unwrap();
  let body = super::body_of(&compiled.code);
  assert!(body.contains("<i><?php echo"));
  assert!(body.contains("['name' => 'go']"));
  assert_eq!(compiled.dependencies.len(), 3);
}

#[test]
fn self_referencing_component_is_a_cycle() {
  let loader = loader()
    .with("components/s-tree", "<ul><s-tree/></ul>")
    .with("page", "<s-tree/>");
  let err = compiler(loader).compile("page").unwrap_err();
  assert!(err.message().contains(
    "page.sugar.php -> components/s-tree.sugar.php -> components/s-tree.sugar.php"
  ));
}

#[test]
fn dynamic_components_render_at_runtime() {
  let loader = loader().with("page", "<div s:component=\"$name\" title=\"x\">child</div>");
  assert_eq!(
    render_page(loader, "page"),
    "<?php ob_start(); ?>child<?php $__slot_1 = (string) ob_get_clean(); ?>\
     <?php echo \\Sugar\\Runtime\\RuntimeEnvironment::requireService('renderer.component')\
     ->renderComponent($name, ['title' => 'x'], ['slot' => $__slot_1]); ?>"
  );
}

#[test]
fn imports_from_components_are_hoisted_once() {
  let loader = loader()
    .with("components/s-price", "<?php use App\\Money; ?><b><?= Money::format($v) ?></b>")
    .with("page", "<?php use App\\Money; ?><s-price v=\"1\"/>");
  let code = compiler(loader).compile("page").unwrap().code;
  assert_eq!(code.matches("use App\\Money;").count(), 1);
  let header = code.find("use App\\Money;").unwrap();
  assert!(header < code.find("return static function").unwrap());
}
