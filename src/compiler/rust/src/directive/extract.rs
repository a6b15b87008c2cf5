/* src/compiler/rust/src/directive/extract.rs */

use std::sync::Arc;

use super::{
  AttributeCompiler, ContentCompiler, ControlFlowCompiler, Directive, DirectiveRegistry,
  DirectiveUse, INHERITANCE_ATTRIBUTES,
};
use crate::ast::{AttributeNode, AttributeValue, DirectiveNode, Node};
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::pipeline::{AstPass, NodeAction, VisitContext};

/// Turns `s:*` attributes on elements and fragments into inline attribute
/// output, replacement content, and `Directive` nodes wrapping the element.
pub struct DirectiveExtractionPass {
  config: Arc<CompilerConfig>,
  registry: Arc<DirectiveRegistry>,
}

struct Found {
  control: Option<(DirectiveUse, Arc<dyn ControlFlowCompiler>)>,
  content: Option<(DirectiveUse, Arc<dyn ContentCompiler>)>,
  attributes: Vec<(DirectiveUse, Arc<dyn AttributeCompiler>)>,
}

impl DirectiveExtractionPass {
  pub fn new(config: Arc<CompilerConfig>, registry: Arc<DirectiveRegistry>) -> Self {
    Self { config, registry }
  }

  fn prefix(&self) -> &str {
    &self.config.directive_prefix
  }

  fn directive_use(&self, name: &str, attr: AttributeNode) -> Result<DirectiveUse> {
    let expression = match attr.value {
      AttributeValue::Static(s) => Some(s),
      AttributeValue::Boolean => None,
      AttributeValue::Output(_) | AttributeValue::Parts(_) => {
        return Err(
          CompileError::syntax(format!(
            "{}:{name} takes a plain PHP expression, not <?= ?> output",
            self.prefix()
          ))
          .at(&attr.meta),
        );
      }
    };
    Ok(DirectiveUse { name: name.to_string(), expression, meta: attr.meta })
  }

  /// Remove every directive attribute from `attrs` and sort them by kind.
  fn collect(&self, attrs: &mut Vec<AttributeNode>) -> Result<Option<Found>> {
    let prefix = self.prefix().to_string();
    let is_directive = |a: &AttributeNode| self.config.directive_name(&a.name).is_some();
    if !attrs.iter().any(is_directive) {
      return Ok(None);
    }

    let mut found = Found { control: None, content: None, attributes: Vec::new() };
    let (directives, literal): (Vec<_>, Vec<_>) =
      std::mem::take(attrs).into_iter().partition(is_directive);
    *attrs = literal;

    for attr in directives {
      let name = self.config.directive_name(&attr.name).unwrap_or_default().to_string();
      let meta = attr.meta.clone();
      match self.registry.get(&name) {
        Some(Directive::ControlFlow(compiler)) => {
          let usage = self.directive_use(&name, attr)?;
          if let Some((first, _)) = &found.control {
            return Err(
              CompileError::syntax(format!(
                "only one control-flow directive is allowed per element ({prefix}:{} and {prefix}:{name})",
                first.name
              ))
              .at(&meta),
            );
          }
          found.control = Some((usage, compiler.clone()));
        }
        Some(Directive::Content(compiler)) => {
          let usage = self.directive_use(&name, attr)?;
          if let Some((first, _)) = &found.content {
            return Err(
              CompileError::syntax(format!(
                "only one content directive is allowed per element ({prefix}:{} and {prefix}:{name})",
                first.name
              ))
              .at(&meta),
            );
          }
          found.content = Some((usage, compiler.clone()));
        }
        Some(Directive::Attribute(compiler)) => {
          found.attributes.push((self.directive_use(&name, attr)?, compiler.clone()));
        }
        Some(Directive::PassThrough) if name == "raw" => {}
        Some(Directive::PassThrough) => {
          return Err(
            CompileError::syntax(format!("{prefix}:{name} is only valid on a component")).at(&meta),
          );
        }
        None if INHERITANCE_ATTRIBUTES.contains(&name.as_str()) => {
          return Err(
            CompileError::syntax(format!("{prefix}:{name} is not allowed here")).at(&meta),
          );
        }
        None => return Err(self.registry.unknown(&prefix, &name).at(&meta)),
      }
    }
    found.attributes.sort_by_key(|(_, compiler)| compiler.runs_last());
    Ok(Some(found))
  }
}

impl AstPass for DirectiveExtractionPass {
  fn name(&self) -> &'static str {
    "directive-extraction"
  }

  fn before(&mut self, node: &mut Node, cx: &mut VisitContext<'_>) -> Result<NodeAction> {
    if !matches!(node, Node::Element(_) | Node::Fragment(_)) {
      return Ok(NodeAction::None);
    }
    let Some(attrs) = node.attributes_mut() else {
      return Ok(NodeAction::None);
    };
    let found = self.collect(attrs)?;

    if let Node::Fragment(f) = node
      && let Some(attr) = f.attributes.first()
    {
      let what = if attr.is_guarded() {
        "<?= ?> output".to_string()
      } else {
        format!("\"{}\"", attr.name)
      };
      return Err(
        CompileError::syntax(format!(
          "fragments cannot carry HTML attributes (found {what}); only {}: directives are allowed",
          self.prefix()
        ))
        .at(&attr.meta),
      );
    }
    let Some(found) = found else {
      return Ok(NodeAction::None);
    };

    let mut host = std::mem::replace(node, Node::text(""));
    for (usage, compiler) in &found.attributes {
      compiler.compile(usage, &mut host, cx.state)?;
    }
    if let Some((usage, compiler)) = &found.content {
      let content = compiler.compile(usage, cx.state)?;
      if let Some(children) = host.children_mut() {
        *children = content;
      }
    }

    let mut nodes = vec![host];
    for (usage, compiler) in &found.attributes {
      let Some(at) = nodes.iter().position(|n| matches!(n, Node::Element(_) | Node::Fragment(_)))
      else {
        break;
      };
      let host = nodes.remove(at);
      let wrapped = compiler.wrap(usage, host, cx.state)?;
      nodes.splice(at..at, wrapped);
    }

    if let Some((usage, _)) = found.control {
      let mut directive = DirectiveNode::new(usage.name, usage.expression, nodes);
      directive.meta = usage.meta;
      nodes = vec![Node::Directive(directive)];
    }
    Ok(NodeAction::restart(nodes))
  }
}
