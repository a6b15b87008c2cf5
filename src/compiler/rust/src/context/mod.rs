/* src/compiler/rust/src/context/mod.rs */

pub mod scan;

use crate::ast::{Node, OutputContext, OutputNode};
use crate::error::Result;
use crate::pipeline::{AstPass, NodeAction, VisitContext};

/// Stamps an escaping context on every output that does not have one yet:
/// outputs produced by directives, composition, and component expansion.
/// Body outputs under a `<script>` or `<style>` element are re-stamped even
/// when the parser classified them, since spliced partials were scanned
/// without their host.
#[derive(Debug, Default)]
pub struct ContextAnalysisPass;

impl ContextAnalysisPass {
  pub fn new() -> Self {
    Self
  }
}

/// Context of the innermost raw-text element among `ancestors`.
fn raw_text_context(ancestors: &[&Node]) -> Option<OutputContext> {
  ancestors.iter().rev().find_map(|n| match n {
    Node::Element(e) if e.dynamic_tag.is_none() => match e.tag.to_ascii_lowercase().as_str() {
      "script" => Some(OutputContext::JavaScript),
      "style" => Some(OutputContext::Css),
      _ => None,
    },
    _ => None,
  })
}

fn body_context(ancestors: &[&Node]) -> OutputContext {
  raw_text_context(ancestors).unwrap_or(OutputContext::Html)
}

fn stamp(output: &mut OutputNode, detected: impl FnOnce() -> OutputContext) {
  if output.context.is_some() {
    return;
  }
  output.context = Some(if output.escape { detected() } else { OutputContext::Raw });
}

impl AstPass for ContextAnalysisPass {
  fn name(&self) -> &'static str {
    "context-analysis"
  }

  fn before(&mut self, node: &mut Node, cx: &mut VisitContext<'_>) -> Result<NodeAction> {
    if let Node::Output(output) = node {
      if output.escape
        && matches!(output.context, None | Some(OutputContext::Html))
        && let Some(context) = raw_text_context(cx.ancestors())
      {
        output.context = Some(context);
      }
      stamp(output, || body_context(cx.ancestors()));
    }
    if let Some(attrs) = node.attributes_mut() {
      for attr in attrs {
        let context = if attr.is_guarded() {
          OutputContext::HtmlAttribute
        } else {
          scan::attribute_context(&attr.name)
        };
        for output in attr.value.outputs_mut() {
          stamp(output, || context);
        }
      }
    }
    Ok(NodeAction::None)
  }
}
