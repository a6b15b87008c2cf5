/* src/compiler/rust/src/directive/control.rs */

// Built-in control-flow directives. Generated PHP uses the alternative
// syntax (`if (...):` / `endif;`) so inline HTML reads naturally between
// the pieces.

use super::{ControlFlowCompiler, DirectiveChain, ElementClaim};
use crate::ast::{DirectiveNode, Node};
use crate::error::{CompileError, Result};
use crate::php;
use crate::pipeline::CompileState;
use crate::runtime::{LOOP_METADATA, LOOP_VARIABLE, RUNTIME_EXCEPTION};

const CONDITION: ElementClaim = ElementClaim { attribute: Some("condition") };
const VALUELESS: ElementClaim = ElementClaim { attribute: None };

fn expression<'a>(prefix: &str, node: &'a DirectiveNode) -> Result<&'a str> {
  match node.expression.as_deref().map(str::trim) {
    Some(e) if !e.is_empty() => Ok(e),
    _ => Err(
      CompileError::syntax(format!("{prefix}:{} requires an expression", node.name)).at(&node.meta),
    ),
  }
}

fn misplaced(prefix: &str, node: &DirectiveNode, after: &str) -> CompileError {
  CompileError::syntax(format!("{prefix}:{} must directly follow {after}", node.name))
    .at(&node.meta)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Test {
  If,
  Unless,
  Isset,
  Empty,
  NotEmpty,
}

/// `if`, `unless`, `isset`, `empty` and `notEmpty`: one condition that may be
/// followed by `elseif`/`else` links.
#[derive(Debug, Clone)]
pub struct Conditional {
  prefix: String,
  test: Test,
}

impl Conditional {
  pub fn builtins(prefix: &str) -> Vec<Self> {
    [Test::If, Test::Unless, Test::Isset, Test::Empty, Test::NotEmpty]
      .into_iter()
      .map(|test| Self { prefix: prefix.to_string(), test })
      .collect()
  }

  pub fn name(&self) -> &'static str {
    match self.test {
      Test::If => "if",
      Test::Unless => "unless",
      Test::Isset => "isset",
      Test::Empty => "empty",
      Test::NotEmpty => "notEmpty",
    }
  }

  fn condition(&self, expr: &str) -> String {
    match self.test {
      Test::If => expr.to_string(),
      Test::Unless => format!("!({expr})"),
      Test::Isset => format!("isset({expr})"),
      Test::Empty => format!("empty({expr})"),
      Test::NotEmpty => format!("!empty({expr})"),
    }
  }
}

impl ControlFlowCompiler for Conditional {
  fn continues(&self) -> &[&'static str] {
    &["elseif", "else"]
  }

  /// Valueless `s:empty` is the fallback branch of `s:forelse`.
  fn is_continuation(&self, node: &DirectiveNode) -> bool {
    self.test == Test::Empty && node.expression.is_none()
  }

  fn claim(&self) -> Option<ElementClaim> {
    match self.test {
      Test::If | Test::Unless => Some(CONDITION),
      Test::Empty => Some(VALUELESS),
      Test::Isset | Test::NotEmpty => None,
    }
  }

  fn compile(&self, chain: DirectiveChain, _state: &mut CompileState) -> Result<Vec<Node>> {
    let DirectiveChain { head, links } = chain;
    if self.is_continuation(&head) {
      return Err(misplaced(&self.prefix, &head, &format!("{}:forelse", self.prefix)));
    }
    let condition = self.condition(expression(&self.prefix, &head)?);
    let mut nodes = vec![Node::php(format!("if ({condition}):"))];
    nodes.extend(head.children);
    for link in links {
      match link.name.as_str() {
        "elseif" => {
          let expr = expression(&self.prefix, &link)?;
          nodes.push(Node::php(format!("elseif ({expr}):")));
        }
        _ => nodes.push(Node::php("else:")),
      }
      nodes.extend(link.children);
    }
    nodes.push(Node::php("endif;"));
    Ok(nodes)
  }
}

/// `elseif` and `else`; only valid as links of a conditional chain.
#[derive(Debug, Clone)]
pub struct ConditionalBranch {
  prefix: String,
  else_if: bool,
}

impl ConditionalBranch {
  pub fn else_if(prefix: &str) -> Self {
    Self { prefix: prefix.to_string(), else_if: true }
  }

  pub fn else_(prefix: &str) -> Self {
    Self { prefix: prefix.to_string(), else_if: false }
  }
}

impl ControlFlowCompiler for ConditionalBranch {
  fn continues(&self) -> &[&'static str] {
    if self.else_if { &["elseif", "else"] } else { &[] }
  }

  fn is_continuation(&self, _node: &DirectiveNode) -> bool {
    true
  }

  fn claim(&self) -> Option<ElementClaim> {
    Some(if self.else_if { CONDITION } else { VALUELESS })
  }

  fn compile(&self, chain: DirectiveChain, _state: &mut CompileState) -> Result<Vec<Node>> {
    let p = &self.prefix;
    Err(misplaced(p, &chain.head, &format!("{p}:if, {p}:unless or {p}:elseif")))
  }
}

/// `foreach` and `forelse`. Both keep `$loop` pointing at loop metadata and
/// restore the enclosing loop's metadata afterwards.
#[derive(Debug, Clone)]
pub struct Loop {
  prefix: String,
  with_empty: bool,
}

impl Loop {
  pub fn foreach(prefix: &str) -> Self {
    Self { prefix: prefix.to_string(), with_empty: false }
  }

  pub fn forelse(prefix: &str) -> Self {
    Self { prefix: prefix.to_string(), with_empty: true }
  }

  fn name(&self) -> &'static str {
    if self.with_empty { "forelse" } else { "foreach" }
  }
}

impl ControlFlowCompiler for Loop {
  fn continues(&self) -> &[&'static str] {
    if self.with_empty { &["empty"] } else { &[] }
  }

  fn claim(&self) -> Option<ElementClaim> {
    Some(ElementClaim { attribute: Some("each") })
  }

  fn compile(&self, chain: DirectiveChain, state: &mut CompileState) -> Result<Vec<Node>> {
    let DirectiveChain { head, links } = chain;
    let expr = expression(&self.prefix, &head)?;
    let Some((subject, binding)) = php::split_as(expr) else {
      return Err(
        CompileError::syntax(format!(
          "{}:{} expects \"<iterable> as <binding>\", got \"{expr}\"",
          self.prefix,
          self.name()
        ))
        .at(&head.meta),
      );
    };
    let iter = state.var("iter");
    let parent = state.var("loop_parent");
    let enter = format!(
      "{parent} = {LOOP_VARIABLE} ?? null; {LOOP_VARIABLE} = new {LOOP_METADATA}({iter}, {parent}); \
       foreach ({iter} as {binding}): {LOOP_VARIABLE}->next();"
    );
    let leave = format!("endforeach; {LOOP_VARIABLE} = {parent};");

    if !self.with_empty {
      let mut nodes = vec![Node::php(format!("{iter} = {subject}; {enter}"))];
      nodes.extend(head.children);
      nodes.push(Node::php(leave));
      return Ok(nodes);
    }

    let guard = format!(
      "{iter} = {subject}; if (!is_array({iter}) && !({iter} instanceof \\Countable)) {{ \
       throw new {RUNTIME_EXCEPTION}('{}:forelse expects an array or Countable, ' . get_debug_type({iter}) . ' given'); }} \
       if (count({iter}) > 0):",
      self.prefix
    );
    let mut nodes = vec![Node::php(format!("{guard} {enter}"))];
    nodes.extend(head.children);
    match links.into_iter().next() {
      Some(empty) => {
        nodes.push(Node::php(format!("{leave} else:")));
        nodes.extend(empty.children);
        nodes.push(Node::php("endif;"));
      }
      None => nodes.push(Node::php(format!("{leave} endif;"))),
    }
    Ok(nodes)
  }
}

#[derive(Debug, Clone)]
pub struct While {
  prefix: String,
}

impl While {
  pub fn new(prefix: &str) -> Self {
    Self { prefix: prefix.to_string() }
  }
}

impl ControlFlowCompiler for While {
  fn claim(&self) -> Option<ElementClaim> {
    Some(CONDITION)
  }

  fn compile(&self, chain: DirectiveChain, _state: &mut CompileState) -> Result<Vec<Node>> {
    let expr = expression(&self.prefix, &chain.head)?;
    let mut nodes = vec![Node::php(format!("while ({expr}):"))];
    nodes.extend(chain.head.children);
    nodes.push(Node::php("endwhile;"));
    Ok(nodes)
  }
}

/// `s:times="5"` or `s:times="$n as $i"`.
#[derive(Debug, Clone)]
pub struct Times {
  prefix: String,
  one_based: bool,
}

impl Times {
  pub fn new(prefix: &str, one_based: bool) -> Self {
    Self { prefix: prefix.to_string(), one_based }
  }
}

impl ControlFlowCompiler for Times {
  fn claim(&self) -> Option<ElementClaim> {
    Some(ElementClaim { attribute: Some("count") })
  }

  fn compile(&self, chain: DirectiveChain, state: &mut CompileState) -> Result<Vec<Node>> {
    let expr = expression(&self.prefix, &chain.head)?;
    let (count, counter) = match php::split_as(expr) {
      Some((count, var)) if php::is_variable(&var) => (count, var),
      Some((_, var)) => {
        return Err(
          CompileError::syntax(format!(
            "{}:times binding must be a plain variable, got \"{var}\"",
            self.prefix
          ))
          .at(&chain.head.meta),
        );
      }
      None => (expr.to_string(), state.var("i")),
    };
    let limit = state.var("times");
    let header = if self.one_based {
      format!("{limit} = (int) ({count}); for ({counter} = 1; {counter} <= {limit}; {counter}++):")
    } else {
      format!("{limit} = (int) ({count}); for ({counter} = 0; {counter} < {limit}; {counter}++):")
    };
    let mut nodes = vec![Node::php(header)];
    nodes.extend(chain.head.children);
    nodes.push(Node::php("endfor;"));
    Ok(nodes)
  }
}

/// `s:switch` on a container whose children carry `s:case` / `s:default`.
#[derive(Debug, Clone)]
pub struct SwitchDirective {
  prefix: String,
}

impl SwitchDirective {
  pub fn new(prefix: &str) -> Self {
    Self { prefix: prefix.to_string() }
  }

  /// Turn the container's children into one `switch` statement.
  fn branches(&self, subject: &str, children: Vec<Node>) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    for child in children {
      let branch = match child {
        ws if ws.is_whitespace() => continue,
        Node::Directive(d) if d.name == "case" || d.name == "default" => d,
        other => {
          return Err(
            CompileError::syntax(format!(
              "only {p}:case and {p}:default may appear inside {p}:switch",
              p = self.prefix
            ))
            .at(other.meta()),
          );
        }
      };
      let label = match branch.name.as_str() {
        "case" => format!("case {}:", expression(&self.prefix, &branch)?),
        _ => "default:".to_string(),
      };
      let open = if nodes.is_empty() {
        format!("switch ({subject}) {{ {label}")
      } else {
        format!("break; {label}")
      };
      nodes.push(Node::php(open));
      nodes.extend(branch.children);
    }
    if nodes.is_empty() {
      return Err(CompileError::syntax(format!(
        "{p}:switch needs at least one {p}:case or {p}:default",
        p = self.prefix
      )));
    }
    nodes.push(Node::php("break; }"));
    Ok(nodes)
  }
}

impl ControlFlowCompiler for SwitchDirective {
  fn claim(&self) -> Option<ElementClaim> {
    Some(ElementClaim { attribute: Some("value") })
  }

  fn compile(&self, chain: DirectiveChain, _state: &mut CompileState) -> Result<Vec<Node>> {
    let DirectiveChain { head, .. } = chain;
    let subject = expression(&self.prefix, &head)?.to_string();
    let meta = head.meta.clone();
    let mut hosts: Vec<Node> = head.children.into_iter().filter(|n| !n.is_whitespace()).collect();
    let (Some(mut host), true) = (hosts.pop(), hosts.is_empty()) else {
      return Err(
        CompileError::syntax(format!("{}:switch must sit on a single element", self.prefix))
          .at(&meta),
      );
    };
    let Some(children) = host.children_mut() else {
      return Err(
        CompileError::syntax(format!("{}:switch must sit on a single element", self.prefix))
          .at(&meta),
      );
    };
    let branches = self.branches(&subject, std::mem::take(children)).map_err(|e| e.at(&meta))?;
    *children = branches;
    Ok(vec![host])
  }
}

/// `case` and `default`; consumed by the enclosing `s:switch`.
#[derive(Debug, Clone)]
pub struct SwitchBranch {
  prefix: String,
  has_value: bool,
}

impl SwitchBranch {
  pub fn case(prefix: &str) -> Self {
    Self { prefix: prefix.to_string(), has_value: true }
  }

  pub fn default_(prefix: &str) -> Self {
    Self { prefix: prefix.to_string(), has_value: false }
  }
}

impl ControlFlowCompiler for SwitchBranch {
  fn claim(&self) -> Option<ElementClaim> {
    Some(if self.has_value { ElementClaim { attribute: Some("value") } } else { VALUELESS })
  }

  fn compile(&self, chain: DirectiveChain, _state: &mut CompileState) -> Result<Vec<Node>> {
    Err(
      CompileError::syntax(format!(
        "{p}:{} must be a direct child of an {p}:switch element",
        chain.head.name,
        p = self.prefix
      ))
      .at(&chain.head.meta),
    )
  }
}

/// `s:try`: output of the body is discarded when it throws.
#[derive(Debug, Clone)]
pub struct TryDirective {
  prefix: String,
}

impl TryDirective {
  pub fn new(prefix: &str) -> Self {
    Self { prefix: prefix.to_string() }
  }
}

impl ControlFlowCompiler for TryDirective {
  fn continues(&self) -> &[&'static str] {
    &["finally"]
  }

  fn compile(&self, chain: DirectiveChain, state: &mut CompileState) -> Result<Vec<Node>> {
    let DirectiveChain { head, links } = chain;
    if head.expression.as_deref().is_some_and(|e| !e.trim().is_empty()) {
      return Err(
        CompileError::syntax(format!("{}:try does not take an expression", self.prefix))
          .at(&head.meta),
      );
    }
    let level = state.var("ob_level");
    let mut nodes = vec![Node::php(format!("{level} = ob_get_level(); ob_start(); try {{"))];
    nodes.extend(head.children);
    let caught = format!(
      "ob_end_flush(); }} catch (\\Throwable) {{ while (ob_get_level() > {level}) {{ ob_end_clean(); }} }}"
    );
    match links.into_iter().next() {
      Some(finally) => {
        nodes.push(Node::php(format!("{caught} finally {{")));
        nodes.extend(finally.children);
        nodes.push(Node::php("}"));
      }
      None => nodes.push(Node::php(caught)),
    }
    Ok(nodes)
  }
}

#[derive(Debug, Clone)]
pub struct Finally {
  prefix: String,
}

impl Finally {
  pub fn new(prefix: &str) -> Self {
    Self { prefix: prefix.to_string() }
  }
}

impl ControlFlowCompiler for Finally {
  fn is_continuation(&self, _node: &DirectiveNode) -> bool {
    true
  }

  fn compile(&self, chain: DirectiveChain, _state: &mut CompileState) -> Result<Vec<Node>> {
    Err(misplaced(&self.prefix, &chain.head, &format!("{}:try", self.prefix)))
  }
}
