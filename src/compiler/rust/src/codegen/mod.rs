/* src/compiler/rust/src/codegen/mod.rs */

// Final AST -> PHP source. Everything is resolved by now: escaping contexts
// are stamped, directives and components are gone, and only literal markup,
// outputs and raw PHP remain.

mod writer;

use crate::ast::{
  AttributeNode, AttributePart, AttributeValue, DocumentNode, ElementNode, Node, OutputContext,
  OutputNode,
};
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::escape;
use crate::extension::ServiceMap;
use crate::php;
use crate::pipeline::CompileState;
use crate::runtime;

use writer::PhpWriter;

/// How one output point ends up in the generated file.
#[derive(Debug, PartialEq, Eq)]
enum Emitted {
  /// Folded at compile time.
  Text(String),
  /// PHP expression to `echo`.
  Echo(String),
}

pub struct CodeGenerator<'a> {
  config: &'a CompilerConfig,
  services: Option<&'a ServiceMap>,
}

impl<'a> CodeGenerator<'a> {
  pub fn new(config: &'a CompilerConfig) -> Self {
    Self { config, services: None }
  }

  /// Provide `services` to the runtime when the unit is loaded.
  pub fn with_services(mut self, services: &'a ServiceMap) -> Self {
    self.services = Some(services);
    self
  }

  pub fn generate(&self, doc: &DocumentNode, state: &mut CompileState) -> Result<String> {
    let mut imports = Vec::new();
    collect_imports(&doc.children, &mut imports);

    let mut emitter = Emitter { config: self.config, state, out: PhpWriter::new() };
    for child in &doc.children {
      emitter.node(child)?;
    }
    let body = emitter.out.finish();
    log::trace!("generated {} bytes of template body, {} imports", body.len(), imports.len());
    Ok(self.wrap(&body, &imports))
  }

  fn wrap(&self, body: &str, imports: &[String]) -> String {
    let mut out = String::with_capacity(body.len() + 512);
    out.push_str("<?php\n\n");
    if self.config.strict_types {
      out.push_str("declare(strict_types=1);\n\n");
    }
    for import in imports {
      out.push_str(import);
      out.push('\n');
    }
    if !imports.is_empty() {
      out.push('\n');
    }
    if let Some(services) = self.services.filter(|s| !s.is_empty()) {
      for (id, class) in services.iter() {
        out.push_str(&runtime::provide_service(id, class));
        out.push('\n');
      }
      out.push('\n');
    }
    out.push_str("return static function (array|object $__data = []): string {\n");
    out.push_str("    if (is_object($__data)) {\n");
    out.push_str("        $__data = get_object_vars($__data);\n");
    out.push_str("    }\n");
    out.push_str("    extract($__data, EXTR_SKIP);\n");
    out.push_str("    ob_start();\n");
    out.push_str("    try {\n?>");
    out.push_str(body);
    out.push_str("<?php\n");
    out.push_str("    } catch (\\Throwable $__exception) {\n");
    out.push_str("        ob_end_clean();\n");
    out.push_str("        throw $__exception;\n");
    out.push_str("    }\n\n");
    out.push_str("    return (string) ob_get_clean();\n");
    out.push_str("};\n");
    out
  }
}

/// `use` statements anywhere in the tree, first occurrence wins.
fn collect_imports(nodes: &[Node], out: &mut Vec<String>) {
  for node in nodes {
    if let Node::PhpImport(import) = node {
      if !out.contains(&import.statement) {
        out.push(import.statement.clone());
      }
      continue;
    }
    if let Some(children) = node.children() {
      collect_imports(children, out);
    }
  }
}

struct Emitter<'a, 's> {
  config: &'a CompilerConfig,
  state: &'s mut CompileState,
  out: PhpWriter,
}

impl Emitter<'_, '_> {
  fn node(&mut self, node: &Node) -> Result<()> {
    match node {
      Node::Document(doc) => self.nodes(&doc.children),
      Node::Element(element) => self.element(element),
      Node::Fragment(fragment) => {
        if let Some(attr) = fragment.attributes.first() {
          return Err(
            CompileError::compilation(format!(
              "fragment still carries attribute \"{}\" at code generation",
              attr.name
            ))
            .at(&attr.meta),
          );
        }
        self.nodes(&fragment.children)
      }
      Node::Text(text) => {
        self.out.text(&text.content);
        Ok(())
      }
      Node::RawBody(body) => {
        self.out.text(&body.content);
        Ok(())
      }
      Node::RawPhp(raw) => {
        let code = raw.code.trim();
        if !code.is_empty() {
          self.out.php(code);
        }
        Ok(())
      }
      Node::Output(output) => {
        self.output(output, false);
        Ok(())
      }
      Node::RuntimeCall(call) => {
        self.out.php(&format!("echo {}({});", call.callable, call.arguments.join(", ")));
        Ok(())
      }
      Node::PhpImport(_) => Ok(()),
      Node::Component(_) | Node::Directive(_) => {
        Err(CompileError::unsupported_node(node.kind_name(), "code generation").at(node.meta()))
      }
    }
  }

  fn nodes(&mut self, nodes: &[Node]) -> Result<()> {
    for node in nodes {
      self.node(node)?;
    }
    Ok(())
  }

  fn element(&mut self, element: &ElementNode) -> Result<()> {
    let tag_var = element.dynamic_tag.as_ref().map(|expr| {
      let var = self.state.var("tag");
      self.out.php(&format!("{var} = {};", runtime::validate_tag(expr)));
      var
    });
    match &tag_var {
      Some(var) => {
        self.out.text("<");
        self.out.php(&format!("echo {var};"));
      }
      None => self.out.text(&format!("<{}", element.tag)),
    }
    for attr in &element.attributes {
      self.attribute(attr);
    }
    self.out.text(&format!("{}>", element.tag_end));
    if element.self_closing {
      return Ok(());
    }
    self.nodes(&element.children)?;
    match (&element.closing, &tag_var) {
      (Some(_), Some(var)) => {
        self.out.text("</");
        self.out.php(&format!("echo {var};"));
        self.out.text(">");
      }
      (Some(closing), None) => self.out.text(closing),
      (None, _) => {}
    }
    Ok(())
  }

  fn attribute(&mut self, attr: &AttributeNode) {
    match &attr.value {
      AttributeValue::Output(output) if attr.is_guarded() => self.guarded(attr, output),
      AttributeValue::Boolean => self.out.text(&format!("{}{}", attr.spacing, attr.name)),
      AttributeValue::Static(value) => match attr.quote {
        Some(q) => self.out.text(&format!("{}{}={q}{value}{q}", attr.spacing, attr.name)),
        None => self.out.text(&format!("{}{}={value}", attr.spacing, attr.name)),
      },
      AttributeValue::Output(output) => {
        let q = attr.quote.unwrap_or('"');
        self.out.text(&format!("{}{}={q}", attr.spacing, attr.name));
        self.output(output, true);
        self.out.text(&q.to_string());
      }
      AttributeValue::Parts(parts) => {
        let q = attr.quote.unwrap_or('"');
        self.out.text(&format!("{}{}={q}", attr.spacing, attr.name));
        for part in parts {
          match part {
            AttributePart::Text(text) => self.out.text(text),
            AttributePart::Output(output) => self.output(output, true),
          }
        }
        self.out.text(&q.to_string());
      }
    }
  }

  /// Attribute string computed at render time; nothing (not even the
  /// separating space) is printed when it comes out empty.
  fn guarded(&mut self, attr: &AttributeNode, output: &OutputNode) {
    let separator = if attr.spacing.is_empty() { " " } else { attr.spacing.as_str() };
    match emit_output(self.config, output, true) {
      Emitted::Text(text) if text.is_empty() => {}
      Emitted::Text(text) => self.out.text(&format!("{separator}{text}")),
      Emitted::Echo(code) => {
        let var = self.state.var("attr");
        self.out.php(&format!(
          "{var} = {code}; if ({var} !== '') {{ echo {} . {var}; }}",
          php::quote(separator)
        ));
      }
    }
  }

  fn output(&mut self, output: &OutputNode, in_attribute: bool) {
    match emit_output(self.config, output, in_attribute) {
      Emitted::Text(text) => self.out.text(&text),
      Emitted::Echo(code) => self.out.php(&format!("echo {code};")),
    }
  }
}

/// Context-escaped form of an output. Script context inside an attribute
/// (`onclick`) is JS-encoded first, then attribute-escaped.
fn emit_output(config: &CompilerConfig, output: &OutputNode, in_attribute: bool) -> Emitted {
  let fallback = if in_attribute { OutputContext::HtmlAttribute } else { OutputContext::Html };
  let context =
    if output.escape { output.context.unwrap_or(fallback) } else { OutputContext::Raw };
  let nested = in_attribute && context == OutputContext::JavaScript;

  if config.fold_literal_output && output.pipes.is_empty() {
    if let Some(int) = php::integer_literal(&output.expression) {
      return Emitted::Text(int.to_string());
    }
    if let Some(literal) = php::single_quoted_literal(&output.expression) {
      let folded = escape::escape(context, &literal);
      return Emitted::Text(if nested { escape::attr(&folded) } else { folded });
    }
  }

  let escaper = config.escaper_class.as_str();
  let chain = php::chain_pipes(&output.expression, &output.pipes);
  let context = if chain.raw { OutputContext::Raw } else { context };
  let code = match (context, chain.json) {
    (OutputContext::Raw, true) => runtime::json_call(escaper, &chain.expression),
    (OutputContext::Raw, false) => chain.expression,
    // json() output is already script-safe.
    (OutputContext::JavaScript, true) => runtime::json_call(escaper, &chain.expression),
    (ctx, json) => {
      let value =
        if json { runtime::json_call(escaper, &chain.expression) } else { chain.expression };
      runtime::escape_call(escaper, ctx, &value).unwrap_or(value)
    }
  };
  let nested = in_attribute && context == OutputContext::JavaScript;
  match (nested, runtime::escape_call(escaper, OutputContext::HtmlAttribute, &code)) {
    (true, Some(wrapped)) => Emitted::Echo(wrapped),
    _ => Emitted::Echo(code),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::{FragmentNode, Meta, PhpImportNode, RuntimeCallNode};

  const ESC: &str = "\\Sugar\\Escape\\Escaper";

  fn body(nodes: Vec<Node>) -> String {
    let config = CompilerConfig::default();
    let doc = DocumentNode { children: nodes, meta: Meta::default() };
    let code = CodeGenerator::new(&config).generate(&doc, &mut CompileState::new(None)).unwrap();
    let start = code.find("try {\n?>").map(|i| i + "try {\n?>".len()).unwrap();
    let end = code.rfind("<?php\n    } catch").unwrap();
    code[start..end].to_string()
  }

  fn out(expr: &str, context: OutputContext) -> Node {
    Node::Output(OutputNode::new(expr, true).with_context(context))
  }

  #[test]
  fn wrapper_buffers_and_rethrows() {
    let config = CompilerConfig::default();
    let doc = DocumentNode { children: vec![Node::text("hi")], meta: Meta::default() };
    let code = CodeGenerator::new(&config).generate(&doc, &mut CompileState::new(None)).unwrap();
    assert!(code.starts_with("<?php\n\ndeclare(strict_types=1);\n\nreturn static function"));
    assert!(code.contains("ob_start();"));
    assert!(code.contains("ob_end_clean();\n        throw $__exception;"));
    assert!(code.ends_with("return (string) ob_get_clean();\n};\n"));
  }

  #[test]
  fn strict_types_is_optional() {
    let config = CompilerConfig { strict_types: false, ..CompilerConfig::default() };
    let doc = DocumentNode::default();
    let code = CodeGenerator::new(&config).generate(&doc, &mut CompileState::new(None)).unwrap();
    assert!(!code.contains("declare(strict_types=1)"));
  }

  #[test]
  fn imports_are_hoisted_once() {
    let import =
      |s: &str| Node::PhpImport(PhpImportNode { statement: s.into(), meta: Meta::default() });
    let mut inner = ElementNode::new("div");
    inner.children.push(import("use App\\Models\\User;"));
    let doc = DocumentNode {
      children: vec![
        import("use App\\Models\\User;"),
        Node::Element(inner),
        import("use App\\Support\\Str;"),
      ],
      meta: Meta::default(),
    };
    let config = CompilerConfig::default();
    let code = CodeGenerator::new(&config).generate(&doc, &mut CompileState::new(None)).unwrap();
    assert_eq!(code.matches("use App\\Models\\User;").count(), 1);
    let user = code.find("use App\\Models\\User;").unwrap();
    let str_ = code.find("use App\\Support\\Str;").unwrap();
    let ret = code.find("return static function").unwrap();
    assert!(user < str_ && str_ < ret);
  }

  #[test]
  fn outputs_use_stamped_context() {
    assert_eq!(
      body(vec![out("$x", OutputContext::Html)]),
      format!("<?php echo {ESC}::html($x); ?>")
    );
    assert_eq!(
      body(vec![out("$x", OutputContext::JavaScript)]),
      format!("<?php echo {ESC}::js($x); ?>")
    );
    assert_eq!(body(vec![out("$x", OutputContext::Css)]), format!("<?php echo {ESC}::css($x); ?>"));
    assert_eq!(body(vec![out("$x", OutputContext::Raw)]), "<?php echo $x; ?>");
    assert_eq!(body(vec![Node::Output(OutputNode::new("$x", false))]), "<?php echo $x; ?>");
  }

  #[test]
  fn pipes_compile_to_nested_calls() {
    let mut o = OutputNode::new("$name", true).with_context(OutputContext::Html);
    o.pipes = vec!["trim(...)".into(), "strtoupper(...)".into()];
    assert_eq!(
      body(vec![Node::Output(o)]),
      format!("<?php echo {ESC}::html(strtoupper(trim($name))); ?>")
    );
  }

  #[test]
  fn raw_and_json_pipes_change_policy() {
    let mut raw = OutputNode::new("$html", true).with_context(OutputContext::Html);
    raw.pipes = vec!["raw()".into()];
    assert_eq!(body(vec![Node::Output(raw)]), "<?php echo $html; ?>");

    let mut json = OutputNode::new("$data", true).with_context(OutputContext::JavaScript);
    json.pipes = vec!["json()".into()];
    assert_eq!(body(vec![Node::Output(json)]), format!("<?php echo {ESC}::json($data); ?>"));

    let mut json_html = OutputNode::new("$data", true).with_context(OutputContext::Html);
    json_html.pipes = vec!["json()".into()];
    assert_eq!(
      body(vec![Node::Output(json_html)]),
      format!("<?php echo {ESC}::html({ESC}::json($data)); ?>")
    );
  }

  #[test]
  fn literals_fold_at_compile_time() {
    assert_eq!(body(vec![out("'<b>'", OutputContext::Html)]), "&lt;b&gt;");
    assert_eq!(body(vec![out("42", OutputContext::JavaScript)]), "42");
    assert_eq!(body(vec![out("'a'", OutputContext::JavaScript)]), "\"a\"");
  }

  #[test]
  fn attributes_keep_literal_spelling() {
    let mut el = ElementNode::new("input");
    el.closing = None;
    el.self_closing = true;
    el.tag_end = " /".into();
    let mut ty = AttributeNode::new("type", AttributeValue::Static("text".into()));
    ty.quote = Some('\'');
    let mut name = AttributeNode::new("name", AttributeValue::Static("q".into()));
    name.quote = None;
    name.spacing = "  ".into();
    el.attributes = vec![ty, name, AttributeNode::new("required", AttributeValue::Boolean)];
    assert_eq!(body(vec![Node::Element(el)]), "<input type='text'  name=q required />");
  }

  #[test]
  fn dynamic_attribute_values() {
    let mut a = ElementNode::new("a");
    let mut href = AttributeNode::new(
      "href",
      AttributeValue::Output(OutputNode::new("$url", true).with_context(OutputContext::Url)),
    );
    href.quote = None;
    let click = AttributeNode::new(
      "onclick",
      AttributeValue::Parts(vec![
        AttributePart::Text("go(".into()),
        AttributePart::Output(OutputNode::new("$id", true).with_context(OutputContext::JavaScript)),
        AttributePart::Text(")".into()),
      ]),
    );
    a.attributes = vec![href, click];
    assert_eq!(
      body(vec![Node::Element(a)]),
      format!(
        "<a href=\"<?php echo {ESC}::url($url); ?>\" onclick=\"go(<?php echo {ESC}::attr({ESC}::js($id)); ?>)\"></a>"
      )
    );
  }

  #[test]
  fn guarded_attributes_skip_empty_strings() {
    let mut el = ElementNode::new("div");
    el.attributes.push(AttributeNode::guarded(
      OutputNode::new("spreadAttrs($a)", false).with_context(OutputContext::Raw),
    ));
    assert_eq!(
      body(vec![Node::Element(el)]),
      "<div<?php $__attr_1 = spreadAttrs($a); if ($__attr_1 !== '') { echo ' ' . $__attr_1; } ?>></div>"
    );
  }

  #[test]
  fn dynamic_tag_validates_once() {
    let mut el = ElementNode::new("div");
    el.dynamic_tag = Some("$level".into());
    el.children.push(Node::text("x"));
    assert_eq!(
      body(vec![Node::Element(el)]),
      "<?php $__tag_1 = \\Sugar\\Runtime\\HtmlTagHelper::validateTagName($level); ?><<?php echo $__tag_1; ?>>x</<?php echo $__tag_1; ?>>"
    );
  }

  #[test]
  fn fragments_dissolve_and_raw_php_passes_through() {
    let fragment = Node::Fragment(FragmentNode {
      attributes: Vec::new(),
      children: vec![Node::php(" if ($a): "), Node::text("A"), Node::php("endif;")],
      self_closing: false,
      meta: Meta::default(),
    });
    assert_eq!(body(vec![fragment]), "<?php if ($a): ?>A<?php endif; ?>");
  }

  #[test]
  fn runtime_calls_are_echoed() {
    let call = Node::RuntimeCall(RuntimeCallNode {
      callable: "render".into(),
      arguments: vec!["$name".into(), "[]".into()],
      meta: Meta::default(),
    });
    assert_eq!(body(vec![call]), "<?php echo render($name, []); ?>");
  }

  #[test]
  fn unexpanded_nodes_are_defects() {
    let config = CompilerConfig::default();
    let doc = DocumentNode {
      children: vec![Node::Directive(crate::ast::DirectiveNode::new(
        "if",
        Some("$a".into()),
        Vec::new(),
      ))],
      meta: Meta::default(),
    };
    let err = CodeGenerator::new(&config).generate(&doc, &mut CompileState::new(None)).unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedNode);
  }

  #[test]
  fn text_is_verbatim_except_open_tags() {
    assert_eq!(body(vec![Node::text("<p>a & b</p>\n")]), "<p>a & b</p>\n");
    assert_eq!(
      body(vec![Node::text("<?xml version=\"1.0\"?>")]),
      "<?php echo '<?'; ?>xml version=\"1.0\"?>"
    );
  }
}
