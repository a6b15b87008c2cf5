/* src/compiler/rust/src/directive/pairing.rs */

use std::sync::Arc;

use super::DirectiveRegistry;
use crate::ast::Node;
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::pipeline::{AstPass, NodeAction, VisitContext};

/// Links continuation directives (`elseif`, `else`, `empty`, `finally`) to the
/// sibling they follow. Only whitespace text may sit between two links.
pub struct DirectivePairingPass {
  config: Arc<CompilerConfig>,
  registry: Arc<DirectiveRegistry>,
}

impl DirectivePairingPass {
  pub fn new(config: Arc<CompilerConfig>, registry: Arc<DirectiveRegistry>) -> Self {
    Self { config, registry }
  }

  fn pair(&self, children: &mut [Node]) -> Result<()> {
    for i in 0..children.len() {
      let Node::Directive(link) = &children[i] else {
        continue;
      };
      let Some(compiler) = self.registry.control_flow(&link.name) else {
        continue;
      };
      if !compiler.is_continuation(link) {
        continue;
      }
      let (name, meta) = (link.name.clone(), link.meta.clone());

      let previous = (0..i).rev().find(|&j| !children[j].is_whitespace());
      let accepted = previous.is_some_and(|j| match &children[j] {
        Node::Directive(prev) => {
          prev.paired.is_none()
            && self
              .registry
              .control_flow(&prev.name)
              .is_some_and(|c| c.continues().contains(&name.as_str()))
        }
        _ => false,
      });
      match previous {
        Some(j) if accepted => {
          if let Node::Directive(prev) = &mut children[j] {
            prev.paired = Some(i - j);
          }
        }
        _ => {
          return Err(
            CompileError::syntax(format!(
              "dangling {}:{} has no directive to attach to",
              self.config.directive_prefix, name
            ))
            .at(&meta),
          );
        }
      }
    }
    Ok(())
  }
}

impl AstPass for DirectivePairingPass {
  fn name(&self) -> &'static str {
    "directive-pairing"
  }

  fn before(&mut self, node: &mut Node, _cx: &mut VisitContext<'_>) -> Result<NodeAction> {
    if let Some(children) = node.children_mut() {
      self.pair(children)?;
    }
    Ok(NodeAction::None)
  }
}
