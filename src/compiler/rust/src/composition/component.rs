/* src/compiler/rust/src/composition/component.rs */

use std::sync::Arc;

use super::{InheritancePass, TemplateComposer, enter, leave, static_expression};
use crate::ast::{
  AttributeNode, AttributeValue, ComponentNode, FragmentNode, Meta, Node, RuntimeCallNode,
  take_attribute,
};
use crate::directive::{DirectiveRegistry, DirectiveType};
use crate::error::{CompileError, Result};
use crate::php;
use crate::pipeline::{AstPass, CompileState, NodeAction, Pipeline, VisitContext};
use crate::runtime::{self, DEFAULT_SLOT, SLOTS_VARIABLE};

/// Inlines `<s-NAME>` components and `s:component` dynamic components.
pub struct ComponentExpansionPass {
  composer: Arc<TemplateComposer>,
  registry: Arc<DirectiveRegistry>,
}

/// Directive attributes split off a component invocation.
struct Invocation {
  /// Control-flow directives (and a slot assignment) for the wrapper fragment.
  wrapper: Vec<AttributeNode>,
  bind: Option<String>,
  props: Vec<(String, String)>,
}

impl ComponentExpansionPass {
  pub fn new(composer: Arc<TemplateComposer>, registry: Arc<DirectiveRegistry>) -> Self {
    Self { composer, registry }
  }

  fn prefix(&self) -> &str {
    &self.composer.config().directive_prefix
  }

  fn split_attributes(&self, attrs: Vec<AttributeNode>, what: &str) -> Result<Invocation> {
    let config = self.composer.config();
    let mut call = Invocation { wrapper: Vec::new(), bind: None, props: Vec::new() };
    for attr in attrs {
      if attr.is_guarded() {
        return Err(
          CompileError::syntax(format!(
            "{what} cannot take <?= ?> attribute output; pass an array with {}",
            config.directive_attr("bind")
          ))
          .at(&attr.meta),
        );
      }
      let Some(name) = config.directive_name(&attr.name).map(str::to_string) else {
        let value = match &attr.value {
          AttributeValue::Boolean => "true".to_string(),
          value => crate::directive::value_expression(value),
        };
        call.props.push((attr.name.clone(), value));
        continue;
      };
      match name.as_str() {
        "bind" => {
          call.bind = static_expression(&attr, config, "bind")?.filter(|b| !b.is_empty());
        }
        "slot" | "component" => call.wrapper.push(attr),
        n if self.registry.kind(n) == Some(DirectiveType::ControlFlow) => call.wrapper.push(attr),
        n => {
          return Err(
            CompileError::syntax(format!("{}:{n} cannot be used on {what}", self.prefix()))
              .at(&attr.meta),
          );
        }
      }
    }
    Ok(call)
  }

  fn props_array(call: &Invocation) -> String {
    let entries: Vec<String> =
      call.props.iter().map(|(name, value)| format!("{} => {value}", php::quote(name))).collect();
    let props = format!("[{}]", entries.join(", "));
    match &call.bind {
      Some(bind) => format!("array_merge((array) ({bind}), {props})"),
      None => props,
    }
  }

  /// Slot captures for `children` and the PHP array literal naming them.
  fn slots(
    &self,
    children: Vec<Node>,
    state: &mut CompileState,
  ) -> Result<(Vec<Node>, String)> {
    let slot_attr = self.composer.config().directive_attr("slot");
    let mut named: Vec<(String, Vec<Node>)> = Vec::new();
    let mut default = Vec::new();
    for mut child in children {
      let taken = match &mut child {
        Node::Element(e) => take_attribute(&mut e.attributes, &slot_attr),
        Node::Fragment(f) => take_attribute(&mut f.attributes, &slot_attr),
        _ => None,
      };
      let Some(attr) = taken else {
        default.push(child);
        continue;
      };
      let name = static_expression(&attr, self.composer.config(), "slot")?
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_SLOT.to_string());
      if named.iter().any(|(n, _)| *n == name) {
        return Err(CompileError::syntax(format!("slot \"{name}\" is filled twice")).at(&attr.meta));
      }
      let content = match child {
        Node::Fragment(f) if f.attributes.is_empty() => f.children,
        other => vec![other],
      };
      named.push((name, content));
    }
    if default.iter().any(|n| !n.is_whitespace()) {
      if named.iter().any(|(n, _)| n == DEFAULT_SLOT) {
        return Err(CompileError::syntax(
          "the default slot is filled both explicitly and by loose children",
        ));
      }
      named.push((DEFAULT_SLOT.to_string(), default));
    }

    let mut nodes = Vec::new();
    let mut entries = Vec::new();
    for (name, content) in named {
      let var = state.var("slot");
      nodes.push(Node::php("ob_start();"));
      nodes.extend(content);
      nodes.push(Node::php(format!("{var} = (string) ob_get_clean();")));
      entries.push(format!("{} => {var}", php::quote(&name)));
    }
    Ok((nodes, format!("[{}]", entries.join(", "))))
  }

  /// Replace slot outlets inside a component body with provided content or
  /// their fallback children.
  fn outlets(&self, nodes: Vec<Node>) -> Result<Vec<Node>> {
    let slot_attr = self.composer.config().directive_attr("slot");
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes {
      let taken = match &mut node {
        Node::Element(e) => take_attribute(&mut e.attributes, &slot_attr),
        Node::Fragment(f) => take_attribute(&mut f.attributes, &slot_attr),
        _ => None,
      };
      if let Some(children) = node.children_mut() {
        *children = self.outlets(std::mem::take(children))?;
      }
      if let Some(attr) = taken {
        let name = static_expression(&attr, self.composer.config(), "slot")?
          .filter(|n| !n.is_empty())
          .unwrap_or_else(|| DEFAULT_SLOT.to_string());
        let key = format!("{SLOTS_VARIABLE}[{}]", php::quote(&name));
        if let Some(children) = node.children_mut() {
          let fallback = std::mem::take(children);
          children.push(Node::php(format!("if (isset({key})): echo {key}; else:")));
          children.extend(fallback);
          children.push(Node::php("endif;"));
        }
      }
      out.push(node);
    }
    Ok(out)
  }

  fn wrap(nodes: Vec<Node>, wrapper: Vec<AttributeNode>, meta: Meta) -> Vec<Node> {
    if wrapper.is_empty() {
      return nodes;
    }
    vec![Node::Fragment(FragmentNode {
      attributes: wrapper,
      children: nodes,
      self_closing: false,
      meta,
    })]
  }

  fn expand(&self, component: ComponentNode, state: &mut CompileState) -> Result<Vec<Node>> {
    let config = self.composer.config();
    let what = format!("component <{}-{}>", config.component_prefix, component.name);
    let call = self.split_attributes(component.attributes, &what)?;
    let component_attr = config.directive_attr("component");
    if let Some(attr) = call.wrapper.iter().find(|a| a.name == component_attr) {
      return Err(
        CompileError::syntax(format!(
          "{} belongs on an element or fragment, not on {what}",
          attr.name
        ))
        .at(&attr.meta),
      );
    }

    let path =
      self.composer.resolve_component(&component.name).map_err(|e| e.at(&component.meta))?;
    enter(state, &path, &component.meta)?;
    let doc = self
      .composer
      .load_component(&component.name, &path, state)
      .map_err(|e| e.at(&component.meta))?;
    log::debug!("expanding component {} from {path}", component.name);
    let mut sub = Pipeline::new();
    sub.add(10, Box::new(InheritancePass::new(self.composer.clone())));
    sub.add(
      20,
      Box::new(ComponentExpansionPass::new(self.composer.clone(), self.registry.clone())),
    );
    let doc = sub.execute(doc, state)?;
    leave(state);

    let body = self.outlets(doc.children)?;
    let (mut nodes, slots) = self.slots(component.children, state)?;
    nodes.push(Node::php(format!(
      "(static function (array $__vars, array {SLOTS_VARIABLE}): void {{ \
       extract($__vars, EXTR_SKIP);"
    )));
    nodes.extend(body);
    nodes.push(Node::php(format!("}})({}, {slots});", Self::props_array(&call))));
    Ok(Self::wrap(nodes, call.wrapper, component.meta))
  }

  /// `<div s:component="$name" title="x">` -> runtime component render.
  fn dynamic(&self, host: Node, state: &mut CompileState) -> Result<Vec<Node>> {
    let component_attr = self.composer.config().directive_attr("component");
    let (attrs, children, meta) = match host {
      Node::Element(e) => (e.attributes, e.children, e.meta),
      Node::Fragment(f) => (f.attributes, f.children, f.meta),
      other => return Err(CompileError::unsupported_node(other.kind_name(), "component expansion")),
    };
    let mut call = self.split_attributes(attrs, "a dynamic component")?;
    let Some(name_attr) = take_attribute(&mut call.wrapper, &component_attr) else {
      return Err(
        CompileError::compilation(format!("{component_attr} disappeared during expansion"))
          .at(&meta),
      );
    };
    let expr = static_expression(&name_attr, self.composer.config(), "component")?
      .filter(|e| !e.is_empty())
      .ok_or_else(|| {
        CompileError::syntax(format!("{component_attr} requires a component name expression"))
          .at(&name_attr.meta)
      })?;
    let (mut nodes, slots) = self.slots(children, state)?;
    nodes.push(Node::RuntimeCall(RuntimeCallNode {
      callable: runtime::component_renderer(),
      arguments: vec![expr, Self::props_array(&call), slots],
      meta: meta.clone(),
    }));
    Ok(Self::wrap(nodes, call.wrapper, meta))
  }
}

impl AstPass for ComponentExpansionPass {
  fn name(&self) -> &'static str {
    "component-expansion"
  }

  fn after(&mut self, node: &mut Node, cx: &mut VisitContext<'_>) -> Result<NodeAction> {
    match node {
      Node::Component(_) => {
        let Node::Component(component) = std::mem::replace(node, Node::text("")) else {
          return Ok(NodeAction::None);
        };
        Ok(NodeAction::replace(self.expand(component, cx.state)?))
      }
      Node::Element(_) | Node::Fragment(_) => {
        let component_attr = self.composer.config().directive_attr("component");
        let dynamic =
          node.attributes().is_some_and(|attrs| attrs.iter().any(|a| a.name == component_attr));
        if !dynamic {
          return Ok(NodeAction::None);
        }
        let host = std::mem::replace(node, Node::text(""));
        Ok(NodeAction::replace(self.dynamic(host, cx.state)?))
      }
      _ => Ok(NodeAction::None),
    }
  }
}
