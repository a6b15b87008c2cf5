/* src/compiler/rust/src/pipeline/mod.rs */

// Ordered AST passes over an explicit work list. Each pass walks the whole
// tree (before hook, children, after hook) before the next pass starts.

mod state;

use std::collections::VecDeque;

pub use state::CompileState;

use crate::ast::{DocumentNode, Node};
use crate::error::{CompileError, Result};

/// A replacement re-offered more often than this is treated as a pass defect.
const MAX_RESTARTS: usize = 32;

#[derive(Debug)]
pub enum NodeAction {
  None,
  /// Substitute the current node with zero or more nodes. With `restart`
  /// the replacements go back through the same pass's before hook.
  Replace { nodes: Vec<Node>, restart: bool },
  SkipChildren,
}

impl NodeAction {
  pub fn replace(nodes: Vec<Node>) -> Self {
    Self::Replace { nodes, restart: false }
  }

  pub fn restart(nodes: Vec<Node>) -> Self {
    Self::Replace { nodes, restart: true }
  }

  pub fn remove() -> Self {
    Self::Replace { nodes: Vec::new(), restart: false }
  }
}

pub trait AstPass {
  fn name(&self) -> &'static str;

  fn before(&mut self, _node: &mut Node, _cx: &mut VisitContext<'_>) -> Result<NodeAction> {
    Ok(NodeAction::None)
  }

  fn after(&mut self, _node: &mut Node, _cx: &mut VisitContext<'_>) -> Result<NodeAction> {
    Ok(NodeAction::None)
  }
}

struct Pending {
  node: Node,
  restarts: usize,
}

struct Frame {
  /// `None` for the synthetic frame holding the root.
  node: Option<Node>,
  restarts: usize,
  pending: VecDeque<Pending>,
  done: Vec<Node>,
}

/// What a hook can see besides the node itself.
pub struct VisitContext<'a> {
  ancestors: Vec<&'a Node>,
  siblings: &'a mut VecDeque<Pending>,
  pub state: &'a mut CompileState,
}

impl<'a> VisitContext<'a> {
  fn new(stack: &'a mut [Frame], state: &'a mut CompileState) -> Option<Self> {
    let (current, outer) = stack.split_last_mut()?;
    let outer: &'a [Frame] = outer;
    let mut ancestors: Vec<&'a Node> = outer.iter().filter_map(|f| f.node.as_ref()).collect();
    let Frame { node, pending, .. } = current;
    let node: &'a Option<Node> = node;
    if let Some(parent) = node.as_ref() {
      ancestors.push(parent);
    }
    Some(Self { ancestors, siblings: pending, state })
  }

  pub fn parent(&self) -> Option<&Node> {
    self.ancestors.last().copied()
  }

  /// Outermost first.
  pub fn ancestors(&self) -> &[&'a Node] {
    &self.ancestors
  }

  pub fn is_root(&self) -> bool {
    self.ancestors.is_empty()
  }

  /// Siblings after the current node that have not been visited yet.
  pub fn next_siblings(&self) -> impl Iterator<Item = &Node> {
    self.siblings.iter().map(|p| &p.node)
  }

  /// Remove the next `count` siblings from the walk and hand them over.
  pub fn take_next_siblings(&mut self, count: usize) -> Vec<Node> {
    let count = count.min(self.siblings.len());
    self.siblings.drain(..count).map(|p| p.node).collect()
  }
}

/// Passes ordered by priority; equal priorities keep insertion order.
#[derive(Default)]
pub struct Pipeline {
  passes: Vec<(i32, Box<dyn AstPass>)>,
}

impl Pipeline {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, priority: i32, pass: Box<dyn AstPass>) {
    let at = self.passes.partition_point(|(p, _)| *p <= priority);
    self.passes.insert(at, (priority, pass));
  }

  pub fn pass_names(&self) -> Vec<&'static str> {
    self.passes.iter().map(|(_, p)| p.name()).collect()
  }

  pub fn execute(&mut self, doc: DocumentNode, state: &mut CompileState) -> Result<DocumentNode> {
    let mut root = Node::Document(doc);
    for (priority, pass) in &mut self.passes {
      log::trace!("running pass {} ({priority})", pass.name());
      let mut nodes = run_pass(pass.as_mut(), root, state)?;
      root = match (nodes.pop(), nodes.is_empty()) {
        (Some(node @ Node::Document(_)), true) => node,
        _ => {
          return Err(CompileError::compilation(format!(
            "pass {} did not produce a single document root",
            pass.name()
          )));
        }
      };
    }
    match root {
      Node::Document(doc) => Ok(doc),
      other => Err(CompileError::unsupported_node(other.kind_name(), "pipeline exit")),
    }
  }
}

fn run_pass(pass: &mut dyn AstPass, root: Node, state: &mut CompileState) -> Result<Vec<Node>> {
  let mut stack = vec![Frame {
    node: None,
    restarts: 0,
    pending: VecDeque::from([Pending { node: root, restarts: 0 }]),
    done: Vec::new(),
  }];

  loop {
    let next = stack.last_mut().and_then(|f| f.pending.pop_front());
    let Some(Pending { mut node, restarts }) = next else {
      if stack.len() == 1 {
        break;
      }
      let Some(frame) = stack.pop() else { break };
      let Some(mut node) = frame.node else { break };
      if let Some(children) = node.children_mut() {
        *children = frame.done;
      }
      finish(pass, node, frame.restarts, &mut stack, state)?;
      continue;
    };

    let action = match VisitContext::new(&mut stack, state) {
      Some(mut cx) => pass.before(&mut node, &mut cx),
      None => Ok(NodeAction::None),
    }
    .map_err(|e| e.at(node.meta()))?;

    match action {
      NodeAction::None => match node.children_mut() {
        Some(children) if !children.is_empty() => {
          let pending = std::mem::take(children)
            .into_iter()
            .map(|child| Pending { node: child, restarts: 0 })
            .collect();
          stack.push(Frame { node: Some(node), restarts, pending, done: Vec::new() });
        }
        _ => finish(pass, node, restarts, &mut stack, state)?,
      },
      NodeAction::SkipChildren => finish(pass, node, restarts, &mut stack, state)?,
      NodeAction::Replace { nodes, restart } => place(pass, nodes, restart, restarts, &mut stack)?,
    }
  }

  Ok(stack.pop().map(|f| f.done).unwrap_or_default())
}

/// Run the after hook and hand the result to the enclosing frame.
fn finish(
  pass: &mut dyn AstPass,
  mut node: Node,
  restarts: usize,
  stack: &mut [Frame],
  state: &mut CompileState,
) -> Result<()> {
  let action = match VisitContext::new(stack, state) {
    Some(mut cx) => pass.after(&mut node, &mut cx),
    None => Ok(NodeAction::None),
  }
  .map_err(|e| e.at(node.meta()))?;

  match action {
    NodeAction::None | NodeAction::SkipChildren => {
      if let Some(frame) = stack.last_mut() {
        frame.done.push(node);
      }
      Ok(())
    }
    NodeAction::Replace { nodes, restart } => place(pass, nodes, restart, restarts, stack),
  }
}

fn place(
  pass: &dyn AstPass,
  nodes: Vec<Node>,
  restart: bool,
  restarts: usize,
  stack: &mut [Frame],
) -> Result<()> {
  let Some(frame) = stack.last_mut() else {
    return Ok(());
  };
  if !restart {
    frame.done.extend(nodes);
    return Ok(());
  }
  if restarts >= MAX_RESTARTS {
    return Err(CompileError::compilation(format!(
      "pass {} restarted the same node more than {MAX_RESTARTS} times",
      pass.name()
    )));
  }
  for node in nodes.into_iter().rev() {
    frame.pending.push_front(Pending { node, restarts: restarts + 1 });
  }
  Ok(())
}
