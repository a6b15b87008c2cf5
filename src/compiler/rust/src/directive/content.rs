/* src/compiler/rust/src/directive/content.rs */

use super::{ContentCompiler, DirectiveUse};
use crate::ast::{Node, OutputContext, OutputNode};
use crate::error::Result;
use crate::php;
use crate::pipeline::CompileState;

fn output(usage: &DirectiveUse, expr: &str, escape: bool) -> OutputNode {
  let (base, pipes) = php::split_pipes(expr);
  let mut node = OutputNode::new(base, escape);
  node.pipes = pipes;
  node.meta = usage.meta.clone();
  node
}

/// `s:text`: escaped for wherever the element sits.
#[derive(Debug, Clone)]
pub struct TextContent {
  prefix: String,
}

impl TextContent {
  pub fn new(prefix: &str) -> Self {
    Self { prefix: prefix.to_string() }
  }
}

impl ContentCompiler for TextContent {
  fn compile(&self, usage: &DirectiveUse, _state: &mut CompileState) -> Result<Vec<Node>> {
    let expr = usage.require_expression(&self.prefix)?;
    Ok(vec![Node::Output(output(usage, expr, true))])
  }
}

/// `s:html`: printed verbatim.
#[derive(Debug, Clone)]
pub struct HtmlContent {
  prefix: String,
}

impl HtmlContent {
  pub fn new(prefix: &str) -> Self {
    Self { prefix: prefix.to_string() }
  }
}

impl ContentCompiler for HtmlContent {
  fn compile(&self, usage: &DirectiveUse, _state: &mut CompileState) -> Result<Vec<Node>> {
    let expr = usage.require_expression(&self.prefix)?;
    Ok(vec![Node::Output(output(usage, expr, false).with_context(OutputContext::Raw))])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::Meta;

  fn usage(name: &str, expr: Option<&str>) -> DirectiveUse {
    DirectiveUse { name: name.into(), expression: expr.map(str::to_string), meta: Meta::at(3, 5) }
  }

  #[test]
  fn text_is_escaped_and_context_left_open() {
    let nodes = TextContent::new("s")
      .compile(&usage("text", Some("$title |> strtoupper")), &mut CompileState::default())
      .unwrap();
    let Node::Output(o) = &nodes[0] else { panic!("expected output") };
    assert!(o.escape);
    assert_eq!(o.context, None);
    assert_eq!(o.expression, "$title");
    assert_eq!(o.pipes, vec!["strtoupper"]);
  }

  #[test]
  fn html_is_raw() {
    let nodes = HtmlContent::new("s")
      .compile(&usage("html", Some("$body")), &mut CompileState::default())
      .unwrap();
    let Node::Output(o) = &nodes[0] else { panic!("expected output") };
    assert!(!o.escape);
    assert_eq!(o.context, Some(OutputContext::Raw));
  }

  #[test]
  fn expression_is_required() {
    let err = TextContent::new("x")
      .compile(&usage("text", None), &mut CompileState::default())
      .unwrap_err();
    assert_eq!(err.message(), "x:text requires an expression");
    assert_eq!(err.line(), Some(3));
  }
}
