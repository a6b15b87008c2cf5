/* src/compiler/rust/src/directive/attribute.rs */

use super::{AttributeCompiler, DirectiveUse};
use crate::ast::{AttributeNode, AttributePart, AttributeValue, Node, OutputContext, OutputNode};
use crate::error::{CompileError, Result};
use crate::php;
use crate::pipeline::CompileState;
use crate::{escape, runtime};

fn element_only(prefix: &str, usage: &DirectiveUse) -> CompileError {
  CompileError::syntax(format!("{prefix}:{} can only be used on an HTML element", usage.name))
    .at(&usage.meta)
}

/// PHP expression producing an attribute's value as one string.
pub(crate) fn value_expression(value: &AttributeValue) -> String {
  let output_expr = |o: &OutputNode| {
    let chain = php::chain_pipes(&o.expression, &o.pipes);
    format!("({})", chain.expression)
  };
  match value {
    AttributeValue::Static(s) => php::quote(s),
    AttributeValue::Boolean => "''".to_string(),
    AttributeValue::Output(o) => output_expr(o),
    AttributeValue::Parts(parts) => {
      let pieces: Vec<String> = parts
        .iter()
        .map(|p| match p {
          AttributePart::Text(t) => php::quote(t),
          AttributePart::Output(o) => output_expr(o),
        })
        .collect();
      pieces.join(" . ")
    }
  }
}

/// `s:class="['active' => $on]"`; merges with a literal `class` attribute.
#[derive(Debug, Clone)]
pub struct ClassAttribute {
  prefix: String,
}

impl ClassAttribute {
  pub fn new(prefix: &str) -> Self {
    Self { prefix: prefix.to_string() }
  }
}

impl AttributeCompiler for ClassAttribute {
  fn compile(
    &self,
    usage: &DirectiveUse,
    host: &mut Node,
    _state: &mut CompileState,
  ) -> Result<()> {
    let expr = usage.require_expression(&self.prefix)?;
    let Node::Element(el) = host else {
      return Err(element_only(&self.prefix, usage));
    };
    let existing = el.attributes.iter().position(|a| a.name.eq_ignore_ascii_case("class"));
    let list = match existing.map(|i| &el.attributes[i].value) {
      Some(literal) => format!("[{}, {expr}]", value_expression(literal)),
      None => expr.to_string(),
    };
    let mut output = OutputNode::new(runtime::class_names(&list), true)
      .with_context(OutputContext::HtmlAttribute);
    output.meta = usage.meta.clone();
    let value = AttributeValue::Output(output);
    match existing {
      Some(i) => {
        let attr = &mut el.attributes[i];
        attr.value = value;
        attr.quote = Some('"');
      }
      None => el.attributes.push(AttributeNode::new("class", value).with_meta(usage.meta.clone())),
    }
    Ok(())
  }
}

/// `s:spread` / `s:attr`: render an array as attributes, skipping names the
/// element already sets explicitly.
#[derive(Debug, Clone)]
pub struct SpreadAttribute {
  prefix: String,
}

impl SpreadAttribute {
  pub fn new(prefix: &str) -> Self {
    Self { prefix: prefix.to_string() }
  }
}

impl AttributeCompiler for SpreadAttribute {
  fn compile(
    &self,
    usage: &DirectiveUse,
    host: &mut Node,
    _state: &mut CompileState,
  ) -> Result<()> {
    let expr = usage.require_expression(&self.prefix)?;
    let Node::Element(el) = host else {
      return Err(element_only(&self.prefix, usage));
    };
    let mut excluded: Vec<String> = Vec::new();
    let names = el.attributes.iter().filter_map(|a| {
      if a.is_guarded() { a.provides.as_deref() } else { Some(a.name.as_str()) }
    });
    for name in names {
      let name = name.to_ascii_lowercase();
      if !excluded.contains(&name) {
        excluded.push(name);
      }
    }
    let mut output = OutputNode::new(runtime::spread_attrs(expr, &excluded), false)
      .with_context(OutputContext::Raw);
    output.meta = usage.meta.clone();
    el.attributes.push(AttributeNode::guarded(output));
    Ok(())
  }

  fn runs_last(&self) -> bool {
    true
  }
}

/// `s:disabled="$cond"` and the other HTML boolean attributes.
#[derive(Debug, Clone)]
pub struct BooleanAttribute {
  name: String,
}

impl BooleanAttribute {
  pub fn new(name: &str) -> Self {
    Self { name: name.to_string() }
  }
}

impl AttributeCompiler for BooleanAttribute {
  fn compile(
    &self,
    usage: &DirectiveUse,
    host: &mut Node,
    _state: &mut CompileState,
  ) -> Result<()> {
    let Some(attrs) = host.attributes_mut() else {
      return Ok(());
    };
    match usage.expression.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
      None => attrs.push(
        AttributeNode::new(self.name.clone(), AttributeValue::Boolean)
          .with_meta(usage.meta.clone()),
      ),
      Some(cond) => {
        let mut output =
          OutputNode::new(format!("({cond}) ? {} : ''", php::quote(&self.name)), false)
            .with_context(OutputContext::Raw);
        output.meta = usage.meta.clone();
        attrs.push(AttributeNode::guarded(output).providing(self.name.clone()));
      }
    }
    Ok(())
  }
}

/// `s:tag="$level"`: tag name chosen at render time and validated there.
/// A literal name is checked and applied at compile time instead.
#[derive(Debug, Clone)]
pub struct TagAttribute {
  prefix: String,
}

impl TagAttribute {
  pub fn new(prefix: &str) -> Self {
    Self { prefix: prefix.to_string() }
  }
}

impl AttributeCompiler for TagAttribute {
  fn compile(
    &self,
    usage: &DirectiveUse,
    host: &mut Node,
    _state: &mut CompileState,
  ) -> Result<()> {
    let expr = usage.require_expression(&self.prefix)?;
    let Node::Element(el) = host else {
      return Err(element_only(&self.prefix, usage));
    };
    match php::single_quoted_literal(expr) {
      Some(tag) if escape::is_valid_tag_name(&tag) => {
        if el.closing.is_some() {
          el.closing = Some(format!("</{tag}>"));
        }
        el.tag = tag;
      }
      Some(tag) => {
        return Err(
          CompileError::syntax(format!("invalid tag name \"{tag}\" in {}:tag", self.prefix))
            .at(&usage.meta),
        );
      }
      None => el.dynamic_tag = Some(expr.to_string()),
    }
    Ok(())
  }
}

/// `s:ifcontent`: render the element only when its content is not blank.
#[derive(Debug, Clone, Copy)]
pub struct IfContentAttribute;

impl AttributeCompiler for IfContentAttribute {
  fn compile(
    &self,
    _usage: &DirectiveUse,
    _host: &mut Node,
    _state: &mut CompileState,
  ) -> Result<()> {
    Ok(())
  }

  fn wrap(
    &self,
    usage: &DirectiveUse,
    mut host: Node,
    state: &mut CompileState,
  ) -> Result<Vec<Node>> {
    let Some(children) = host.children_mut() else {
      return Ok(vec![host]);
    };
    let content = state.var("content");
    let body = std::mem::take(children);
    let mut output = OutputNode::new(content.clone(), false).with_context(OutputContext::Raw);
    output.meta = usage.meta.clone();
    children.push(Node::Output(output));

    let mut nodes = vec![Node::php("ob_start();")];
    nodes.extend(body);
    nodes.push(Node::php(format!(
      "{content} = (string) ob_get_clean(); if (trim({content}) !== ''):"
    )));
    nodes.push(host);
    nodes.push(Node::php("endif;"));
    Ok(nodes)
  }
}
