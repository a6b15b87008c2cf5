/* src/compiler/rust/src/ast/mod.rs */

mod attribute;

pub use attribute::{AttributeNode, AttributePart, AttributeValue};

/// Source position of a node. `origin` is set once nodes are spliced in from
/// another template so diagnostics point at the right file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
  pub line: usize,
  pub column: usize,
  pub origin: Option<String>,
}

impl Meta {
  pub fn at(line: usize, column: usize) -> Self {
    Self { line, column, origin: None }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContext {
  Html,
  HtmlAttribute,
  JavaScript,
  Css,
  Url,
  Raw,
}

impl OutputContext {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Html => "html",
      Self::HtmlAttribute => "attr",
      Self::JavaScript => "js",
      Self::Css => "css",
      Self::Url => "url",
      Self::Raw => "raw",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
  Document(DocumentNode),
  Element(ElementNode),
  Fragment(FragmentNode),
  Component(ComponentNode),
  Text(TextNode),
  RawPhp(RawPhpNode),
  RawBody(RawBodyNode),
  Output(OutputNode),
  Directive(DirectiveNode),
  RuntimeCall(RuntimeCallNode),
  PhpImport(PhpImportNode),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentNode {
  pub children: Vec<Node>,
  pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
  pub tag: String,
  pub attributes: Vec<AttributeNode>,
  pub children: Vec<Node>,
  pub self_closing: bool,
  /// Render-time tag name expression set by `s:tag`.
  pub dynamic_tag: Option<String>,
  /// Whitespace and `/` written between the last attribute and `>`.
  pub tag_end: String,
  /// Literal close tag; `None` when the source closed it implicitly.
  pub closing: Option<String>,
  pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentNode {
  pub attributes: Vec<AttributeNode>,
  pub children: Vec<Node>,
  pub self_closing: bool,
  pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
  pub name: String,
  pub attributes: Vec<AttributeNode>,
  pub children: Vec<Node>,
  pub self_closing: bool,
  pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
  pub content: String,
  pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawPhpNode {
  pub code: String,
  pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBodyNode {
  pub content: String,
  pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputNode {
  pub expression: String,
  pub escape: bool,
  /// Stamped once by the parser or the context pass, never changed afterwards.
  pub context: Option<OutputContext>,
  pub pipes: Vec<String>,
  pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveNode {
  pub name: String,
  pub expression: Option<String>,
  pub children: Vec<Node>,
  /// Distance to the next sibling in the same chain (`if` -> `else`).
  pub paired: Option<usize>,
  pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeCallNode {
  pub callable: String,
  pub arguments: Vec<String>,
  pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhpImportNode {
  pub statement: String,
  pub meta: Meta,
}

impl ElementNode {
  pub fn new(tag: impl Into<String>) -> Self {
    let tag = tag.into();
    Self {
      closing: Some(format!("</{tag}>")),
      tag,
      attributes: Vec::new(),
      children: Vec::new(),
      self_closing: false,
      dynamic_tag: None,
      tag_end: String::new(),
      meta: Meta::default(),
    }
  }

  pub fn attribute(&self, name: &str) -> Option<&AttributeNode> {
    self.attributes.iter().find(|a| a.name.eq_ignore_ascii_case(name))
  }
}

impl TextNode {
  pub fn new(content: impl Into<String>) -> Self {
    Self { content: content.into(), meta: Meta::default() }
  }

  pub fn is_whitespace(&self) -> bool {
    self.content.trim().is_empty()
  }
}

impl RawPhpNode {
  pub fn new(code: impl Into<String>) -> Self {
    Self { code: code.into(), meta: Meta::default() }
  }
}

impl OutputNode {
  pub fn new(expression: impl Into<String>, escape: bool) -> Self {
    Self {
      expression: expression.into(),
      escape,
      context: None,
      pipes: Vec::new(),
      meta: Meta::default(),
    }
  }

  pub fn with_context(mut self, context: OutputContext) -> Self {
    self.context = Some(context);
    self
  }
}

impl DirectiveNode {
  pub fn new(name: impl Into<String>, expression: Option<String>, children: Vec<Node>) -> Self {
    Self { name: name.into(), expression, children, paired: None, meta: Meta::default() }
  }
}

impl Node {
  pub fn text(content: impl Into<String>) -> Self {
    Self::Text(TextNode::new(content))
  }

  pub fn php(code: impl Into<String>) -> Self {
    Self::RawPhp(RawPhpNode::new(code))
  }

  pub fn kind_name(&self) -> &'static str {
    match self {
      Self::Document(_) => "Document",
      Self::Element(_) => "Element",
      Self::Fragment(_) => "Fragment",
      Self::Component(_) => "Component",
      Self::Text(_) => "Text",
      Self::RawPhp(_) => "RawPhp",
      Self::RawBody(_) => "RawBody",
      Self::Output(_) => "Output",
      Self::Directive(_) => "Directive",
      Self::RuntimeCall(_) => "RuntimeCall",
      Self::PhpImport(_) => "PhpImport",
    }
  }

  pub fn meta(&self) -> &Meta {
    match self {
      Self::Document(n) => &n.meta,
      Self::Element(n) => &n.meta,
      Self::Fragment(n) => &n.meta,
      Self::Component(n) => &n.meta,
      Self::Text(n) => &n.meta,
      Self::RawPhp(n) => &n.meta,
      Self::RawBody(n) => &n.meta,
      Self::Output(n) => &n.meta,
      Self::Directive(n) => &n.meta,
      Self::RuntimeCall(n) => &n.meta,
      Self::PhpImport(n) => &n.meta,
    }
  }

  pub fn meta_mut(&mut self) -> &mut Meta {
    match self {
      Self::Document(n) => &mut n.meta,
      Self::Element(n) => &mut n.meta,
      Self::Fragment(n) => &mut n.meta,
      Self::Component(n) => &mut n.meta,
      Self::Text(n) => &mut n.meta,
      Self::RawPhp(n) => &mut n.meta,
      Self::RawBody(n) => &mut n.meta,
      Self::Output(n) => &mut n.meta,
      Self::Directive(n) => &mut n.meta,
      Self::RuntimeCall(n) => &mut n.meta,
      Self::PhpImport(n) => &mut n.meta,
    }
  }

  pub fn children(&self) -> Option<&Vec<Node>> {
    match self {
      Self::Document(n) => Some(&n.children),
      Self::Element(n) => Some(&n.children),
      Self::Fragment(n) => Some(&n.children),
      Self::Component(n) => Some(&n.children),
      Self::Directive(n) => Some(&n.children),
      _ => None,
    }
  }

  pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
    match self {
      Self::Document(n) => Some(&mut n.children),
      Self::Element(n) => Some(&mut n.children),
      Self::Fragment(n) => Some(&mut n.children),
      Self::Component(n) => Some(&mut n.children),
      Self::Directive(n) => Some(&mut n.children),
      _ => None,
    }
  }

  pub fn attributes(&self) -> Option<&Vec<AttributeNode>> {
    match self {
      Self::Element(n) => Some(&n.attributes),
      Self::Fragment(n) => Some(&n.attributes),
      Self::Component(n) => Some(&n.attributes),
      _ => None,
    }
  }

  pub fn attributes_mut(&mut self) -> Option<&mut Vec<AttributeNode>> {
    match self {
      Self::Element(n) => Some(&mut n.attributes),
      Self::Fragment(n) => Some(&mut n.attributes),
      Self::Component(n) => Some(&mut n.attributes),
      _ => None,
    }
  }

  pub fn is_whitespace(&self) -> bool {
    matches!(self, Self::Text(t) if t.is_whitespace())
  }

  /// Re-stamp this subtree (attribute outputs included) as coming from `origin`.
  pub fn stamp_origin(&mut self, origin: &str) {
    self.meta_mut().origin = Some(origin.to_string());
    if let Some(attrs) = self.attributes_mut() {
      for attr in attrs {
        attr.meta.origin = Some(origin.to_string());
        for output in attr.value.outputs_mut() {
          output.meta.origin = Some(origin.to_string());
        }
      }
    }
    if let Some(children) = self.children_mut() {
      for child in children {
        child.stamp_origin(origin);
      }
    }
  }
}

/// Remove and return the first attribute named `name`.
pub fn take_attribute(attrs: &mut Vec<AttributeNode>, name: &str) -> Option<AttributeNode> {
  let idx = attrs.iter().position(|a| a.name == name)?;
  Some(attrs.remove(idx))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Node {
    let mut el = ElementNode::new("div");
    let title = AttributeValue::Output(OutputNode::new("$t", true));
    el.attributes.push(AttributeNode::new("title", title));
    el.children.push(Node::text("hi"));
    el.children.push(Node::Output(OutputNode::new("$x", true)));
    Node::Document(DocumentNode { children: vec![Node::Element(el)], meta: Meta::default() })
  }

  #[test]
  fn stamp_origin_reaches_every_node() {
    let mut doc = sample();
    doc.stamp_origin("partials/card.sugar.php");
    let Node::Document(d) = &doc else { panic!("expected document") };
    let Node::Element(el) = &d.children[0] else { panic!("expected element") };
    assert_eq!(el.meta.origin.as_deref(), Some("partials/card.sugar.php"));
    assert!(el.children.iter().all(|c| c.meta().origin.is_some()));
    let AttributeValue::Output(o) = &el.attributes[0].value else { panic!("expected output") };
    assert_eq!(o.meta.origin.as_deref(), Some("partials/card.sugar.php"));
  }

  #[test]
  fn clone_is_deep() {
    let original = sample();
    let mut copy = original.clone();
    if let Some(children) = copy.children_mut() {
      children.clear();
    }
    assert_eq!(original.children().map(Vec::len), Some(1));
  }

  #[test]
  fn element_new_has_literal_close_tag() {
    let el = ElementNode::new("section");
    assert_eq!(el.closing.as_deref(), Some("</section>"));
    assert!(!el.self_closing);
  }

  #[test]
  fn take_attribute_removes_first_match() {
    let mut attrs = vec![
      AttributeNode::new("s:if", AttributeValue::Static("$a".into())),
      AttributeNode::new("id", AttributeValue::Static("x".into())),
    ];
    let taken = take_attribute(&mut attrs, "s:if");
    assert_eq!(taken.and_then(|a| a.static_value().map(str::to_string)).as_deref(), Some("$a"));
    assert_eq!(attrs.len(), 1);
    assert!(take_attribute(&mut attrs, "s:if").is_none());
  }
}
