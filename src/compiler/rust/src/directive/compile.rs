/* src/compiler/rust/src/directive/compile.rs */

use std::sync::Arc;

use super::{DirectiveChain, DirectiveRegistry};
use crate::ast::Node;
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::pipeline::{AstPass, NodeAction, VisitContext};

/// Replaces each `Directive` node (and the siblings paired with it) with the
/// PHP its compiler produces.
pub struct DirectiveCompilationPass {
  config: Arc<CompilerConfig>,
  registry: Arc<DirectiveRegistry>,
}

impl DirectiveCompilationPass {
  pub fn new(config: Arc<CompilerConfig>, registry: Arc<DirectiveRegistry>) -> Self {
    Self { config, registry }
  }
}

impl AstPass for DirectiveCompilationPass {
  fn name(&self) -> &'static str {
    "directive-compilation"
  }

  fn before(&mut self, node: &mut Node, cx: &mut VisitContext<'_>) -> Result<NodeAction> {
    let Node::Directive(directive) = node else {
      return Ok(NodeAction::None);
    };
    let Some(compiler) = self.registry.control_flow(&directive.name).cloned() else {
      return Err(
        CompileError::unknown_directive(&self.config.directive_prefix, &directive.name, None)
          .at(&directive.meta),
      );
    };
    let head = std::mem::replace(directive, crate::ast::DirectiveNode::new("", None, Vec::new()));

    let mut links = Vec::new();
    let mut distance = head.paired;
    while let Some(n) = distance {
      let mut taken = cx.take_next_siblings(n);
      match taken.pop() {
        Some(Node::Directive(link)) => {
          distance = link.paired;
          links.push(link);
        }
        _ => {
          return Err(CompileError::compilation(format!(
            "{}:{} lost its paired sibling",
            self.config.directive_prefix, head.name
          ))
          .at(&head.meta));
        }
      }
    }

    let nodes = compiler.compile(DirectiveChain { head, links }, cx.state)?;
    Ok(NodeAction::restart(nodes))
  }
}
