/* src/compiler/rust/src/composition/blocks.rs */

// Template inheritance: `s:include`, `s:extends` and block overrides. Runs
// once on the document root and resolves the whole tree in one go.

use std::collections::HashMap;
use std::sync::Arc;

use super::{TemplateComposer, enter, leave, static_expression};
use crate::ast::{DocumentNode, FragmentNode, Meta, Node, take_attribute};
use crate::error::{CompileError, Result};
use crate::pipeline::{AstPass, CompileState, NodeAction, VisitContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
  Replace,
  Append,
  Prepend,
}

impl BlockMode {
  const ALL: [(&'static str, Self); 3] =
    [("block", Self::Replace), ("append", Self::Append), ("prepend", Self::Prepend)];
}

#[derive(Debug, Clone)]
struct Block {
  mode: BlockMode,
  node: Node,
}

type BlockMap = HashMap<String, Block>;

pub struct InheritancePass {
  composer: Arc<TemplateComposer>,
}

impl InheritancePass {
  pub fn new(composer: Arc<TemplateComposer>) -> Self {
    Self { composer }
  }

  fn attr(&self, name: &str) -> String {
    self.composer.config().directive_attr(name)
  }

  /// Resolve includes, then either hand this template's blocks up to the
  /// template it extends or apply `inherited` to its own blocks.
  fn resolve(
    &self,
    doc: DocumentNode,
    inherited: BlockMap,
    state: &mut CompileState,
  ) -> Result<DocumentNode> {
    let current = state.chain.last().cloned();
    let mut children = self.includes(doc.children, current.as_deref(), state)?;

    let extends_attr = self.attr("extends");
    let mut extends: Option<(String, Meta)> = None;
    for child in &mut children {
      let Some(attrs) = child.attributes_mut() else { continue };
      let Some(attr) = take_attribute(attrs, &extends_attr) else { continue };
      if extends.is_some() {
        return Err(
          CompileError::syntax(format!("a template can only use {extends_attr} once"))
            .at(&attr.meta),
        );
      }
      let target = static_expression(&attr, self.composer.config(), "extends")?
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
          CompileError::syntax(format!("{extends_attr} requires a template path")).at(&attr.meta)
        })?;
      extends = Some((target, attr.meta));
    }
    if let Some(meta) = find_attribute(&children, &extends_attr) {
      return Err(
        CompileError::syntax(format!("{extends_attr} is only allowed on a top-level element"))
          .at(&meta),
      );
    }

    let Some((target, meta)) = extends else {
      let children = self.apply(children, &inherited)?;
      return Ok(DocumentNode { children, meta: doc.meta });
    };

    let imports: Vec<Node> =
      children.iter().filter(|n| matches!(n, Node::PhpImport(_))).cloned().collect();
    let mut own = Vec::new();
    self.collect_blocks(children, &mut own)?;
    let blocks = self.merge(own, inherited)?;

    let path = self.composer.resolve(&target, current.as_deref()).map_err(|e| e.at(&meta))?;
    log::debug!("{} extends {path}", current.as_deref().unwrap_or("<string>"));
    enter(state, &path, &meta)?;
    let parent = self.composer.load(&path, state)?;
    let resolved = self.resolve(parent, blocks, state)?;
    leave(state);

    let mut children = imports;
    children.extend(resolved.children);
    Ok(DocumentNode { children, meta: doc.meta })
  }

  fn includes(
    &self,
    nodes: Vec<Node>,
    current: Option<&str>,
    state: &mut CompileState,
  ) -> Result<Vec<Node>> {
    let include_attr = self.attr("include");
    let with_attr = self.attr("with");
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes {
      let is_host = matches!(node, Node::Element(_) | Node::Fragment(_));
      let (include, with) = match node.attributes_mut() {
        Some(attrs) if is_host => {
          (take_attribute(attrs, &include_attr), take_attribute(attrs, &with_attr))
        }
        _ => (None, None),
      };
      let include = match (include, with.as_ref()) {
        (Some(include), _) => include,
        (None, Some(with)) => {
          return Err(
            CompileError::syntax(format!("{with_attr} requires {include_attr} on the same element"))
              .at(&with.meta),
          );
        }
        (None, None) => {
          if let Some(children) = node.children_mut() {
            *children = self.includes(std::mem::take(children), current, state)?;
          }
          out.push(node);
          continue;
        }
      };

      let target = static_expression(&include, self.composer.config(), "include")?
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
          CompileError::syntax(format!("{include_attr} requires a template path")).at(&include.meta)
        })?;
      if target.contains('$') {
        return Err(
          CompileError::syntax(format!(
            "{include_attr} needs a literal template path, got \"{target}\""
          ))
          .at(&include.meta),
        );
      }
      let path = self.composer.resolve(&target, current).map_err(|e| e.at(&include.meta))?;
      enter(state, &path, &include.meta)?;
      let included = self.composer.load(&path, state)?;
      let included = self.resolve(included, BlockMap::new(), state)?;
      leave(state);

      let mut content = included.children;
      if let Some(with) = with {
        let vars = static_expression(&with, self.composer.config(), "with")?
          .filter(|v| !v.is_empty())
          .ok_or_else(|| {
            CompileError::syntax(format!("{with_attr} requires an array expression")).at(&with.meta)
          })?;
        let mut scoped =
          vec![Node::php("(static function (array $__vars): void { extract($__vars, EXTR_SKIP);")];
        scoped.append(&mut content);
        scoped.push(Node::php(format!("}})({vars});")));
        content = scoped;
      }

      match node {
        Node::Fragment(f) if f.attributes.is_empty() => out.extend(content),
        mut host => {
          open_element(&mut host);
          if let Some(children) = host.children_mut() {
            *children = content;
          }
          out.push(host);
        }
      }
    }
    Ok(out)
  }

  fn marker(&self, node: &mut Node) -> Result<Option<(String, BlockMode, Meta)>> {
    if !matches!(node, Node::Element(_) | Node::Fragment(_)) {
      return Ok(None);
    }
    let Some(attrs) = node.attributes_mut() else { return Ok(None) };
    for (name, mode) in BlockMode::ALL {
      let Some(attr) = take_attribute(attrs, &self.attr(name)) else { continue };
      let block = static_expression(&attr, self.composer.config(), name)?
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
          CompileError::syntax(format!("{} requires a block name", self.attr(name))).at(&attr.meta)
        })?;
      return Ok(Some((block, mode, attr.meta)));
    }
    Ok(None)
  }

  /// Outermost block definitions of an extending template, in source order.
  fn collect_blocks(&self, nodes: Vec<Node>, out: &mut Vec<(String, Block)>) -> Result<()> {
    for mut node in nodes {
      match self.marker(&mut node)? {
        Some((name, mode, meta)) => {
          if out.iter().any(|(n, _)| *n == name) {
            return Err(
              CompileError::syntax(format!("block \"{name}\" is defined twice")).at(&meta),
            );
          }
          out.push((name, Block { mode, node }));
        }
        None => {
          if let Some(children) = node.children_mut() {
            self.collect_blocks(std::mem::take(children), out)?;
          }
        }
      }
    }
    Ok(())
  }

  /// Own blocks with the overrides from further down the chain applied,
  /// plus inherited blocks this template does not define.
  fn merge(&self, own: Vec<(String, Block)>, mut inherited: BlockMap) -> Result<BlockMap> {
    let mut merged = BlockMap::new();
    for (name, block) in own {
      let filled = self.fill(block.node, &name, &inherited)?;
      inherited.remove(&name);
      merged.insert(name, Block { mode: block.mode, node: single(filled) });
    }
    for (name, block) in inherited {
      merged.entry(name).or_insert(block);
    }
    Ok(merged)
  }

  /// Apply `blocks` to every block marker in `nodes`, stripping the markers.
  fn apply(&self, nodes: Vec<Node>, blocks: &BlockMap) -> Result<Vec<Node>> {
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes {
      match self.marker(&mut node)? {
        Some((name, _, _)) => out.extend(self.fill(node, &name, blocks)?),
        None => {
          if let Some(children) = node.children_mut() {
            *children = self.apply(std::mem::take(children), blocks)?;
          }
          out.push(node);
        }
      }
    }
    Ok(out)
  }

  /// Content for the block `name` whose default is `target`.
  fn fill(&self, mut target: Node, name: &str, blocks: &BlockMap) -> Result<Vec<Node>> {
    let Some(over) = blocks.get(name) else {
      if let Some(children) = target.children_mut() {
        *children = self.apply(std::mem::take(children), blocks)?;
      }
      return Ok(vec![target]);
    };
    log::trace!("block {name}: {:?}", over.mode);
    let mut rest = blocks.clone();
    rest.remove(name);

    let content = match &over.node {
      Node::Fragment(f) => f.children.clone(),
      other => vec![other.clone()],
    };
    let replaced = match (over.mode, &over.node) {
      (BlockMode::Replace, Node::Element(_)) => vec![over.node.clone()],
      (mode, _) => {
        open_element(&mut target);
        if let Some(children) = target.children_mut() {
          match mode {
            BlockMode::Replace => *children = content,
            BlockMode::Append => children.extend(content),
            BlockMode::Prepend => {
              let original = std::mem::replace(children, content);
              children.extend(original);
            }
          }
        }
        vec![target]
      }
    };
    self.apply(replaced, &rest)
  }
}

impl AstPass for InheritancePass {
  fn name(&self) -> &'static str {
    "inheritance"
  }

  fn before(&mut self, node: &mut Node, cx: &mut VisitContext<'_>) -> Result<NodeAction> {
    let Node::Document(doc) = node else {
      return Ok(NodeAction::SkipChildren);
    };
    let doc = std::mem::take(doc);
    let resolved = self.resolve(doc, BlockMap::new(), cx.state)?;
    Ok(NodeAction::replace(vec![Node::Document(resolved)]))
  }
}

/// One node standing for `nodes`: the node itself when there is exactly one
/// element or fragment, otherwise a fragment around them.
fn single(mut nodes: Vec<Node>) -> Node {
  if nodes.len() == 1 && matches!(nodes[0], Node::Element(_) | Node::Fragment(_)) {
    if let Some(node) = nodes.pop() {
      return node;
    }
  }
  Node::Fragment(FragmentNode {
    attributes: Vec::new(),
    children: nodes,
    self_closing: false,
    meta: Meta::default(),
  })
}

/// Give a self-closing element an explicit close tag so it can hold children.
fn open_element(node: &mut Node) {
  if let Node::Element(e) = node
    && e.self_closing
  {
    e.self_closing = false;
    e.tag_end = e.tag_end.trim_end_matches('/').to_string();
    e.closing = Some(format!("</{}>", e.tag));
  }
  if let Node::Fragment(f) = node {
    f.self_closing = false;
  }
}

fn find_attribute(nodes: &[Node], name: &str) -> Option<Meta> {
  nodes.iter().find_map(|node| {
    let own = node
      .attributes()
      .and_then(|attrs| attrs.iter().find(|a| a.name == name))
      .map(|a| a.meta.clone());
    own.or_else(|| node.children().and_then(|children| find_attribute(children, name)))
  })
}
