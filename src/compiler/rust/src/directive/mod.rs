/* src/compiler/rust/src/directive/mod.rs */

mod attribute;
mod compile;
mod content;
mod control;
mod extract;
mod pairing;
mod suggest;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub(crate) use attribute::value_expression;
pub use attribute::{
  BooleanAttribute, ClassAttribute, IfContentAttribute, SpreadAttribute, TagAttribute,
};
pub use compile::DirectiveCompilationPass;
pub use content::{HtmlContent, TextContent};
pub use control::{
  Conditional, ConditionalBranch, Finally, Loop, SwitchBranch, SwitchDirective, Times, TryDirective,
  While,
};
pub use extract::DirectiveExtractionPass;
pub use pairing::DirectivePairingPass;
pub use suggest::{did_you_mean, levenshtein};

use crate::ast::{DirectiveNode, Meta, Node};
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::pipeline::CompileState;

/// Attribute names handled by template inheritance rather than the registry.
pub const INHERITANCE_ATTRIBUTES: &[&str] =
  &["extends", "block", "append", "prepend", "include", "with"];

/// HTML boolean attributes available as `s:<name>="condition"`.
pub const HTML_BOOLEAN_ATTRS: &[&str] = &[
  "allowfullscreen",
  "async",
  "autofocus",
  "autoplay",
  "checked",
  "controls",
  "defer",
  "disabled",
  "formnovalidate",
  "hidden",
  "inert",
  "loop",
  "multiple",
  "muted",
  "nomodule",
  "novalidate",
  "open",
  "readonly",
  "required",
  "reversed",
  "selected",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveType {
  /// Wraps the element in a control structure.
  ControlFlow,
  /// Compiled inline into attribute output on the same element.
  Attribute,
  /// Replaces the element's children with one value.
  Content,
  /// Reserved name resolved by another subsystem.
  PassThrough,
}

/// One directive attribute as written on an element.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveUse {
  pub name: String,
  pub expression: Option<String>,
  pub meta: Meta,
}

impl DirectiveUse {
  pub fn require_expression(&self, prefix: &str) -> Result<&str> {
    match self.expression.as_deref().map(str::trim) {
      Some(e) if !e.is_empty() => Ok(e),
      _ => Err(
        CompileError::syntax(format!("{prefix}:{} requires an expression", self.name))
          .at(&self.meta),
      ),
    }
  }
}

/// A chain head plus the siblings linked to it by pairing (`if` + `elseif`/`else`).
#[derive(Debug)]
pub struct DirectiveChain {
  pub head: DirectiveNode,
  pub links: Vec<DirectiveNode>,
}

/// `<s-NAME>` element syntax for a directive; `attribute` names the attribute
/// holding the expression, `None` for valueless directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementClaim {
  pub attribute: Option<&'static str>,
}

pub trait ControlFlowCompiler: Send + Sync {
  /// Directives allowed to directly follow this one in a chain.
  fn continues(&self) -> &[&'static str] {
    &[]
  }

  /// True when `node` can only appear as a link after a chain head.
  fn is_continuation(&self, _node: &DirectiveNode) -> bool {
    false
  }

  fn claim(&self) -> Option<ElementClaim> {
    None
  }

  fn compile(&self, chain: DirectiveChain, state: &mut CompileState) -> Result<Vec<Node>>;
}

pub trait AttributeCompiler: Send + Sync {
  /// Rewrite the host element's attributes in place.
  fn compile(&self, usage: &DirectiveUse, host: &mut Node, state: &mut CompileState) -> Result<()>;

  /// Surround the finished host with extra nodes.
  fn wrap(
    &self,
    _usage: &DirectiveUse,
    host: Node,
    _state: &mut CompileState,
  ) -> Result<Vec<Node>> {
    Ok(vec![host])
  }

  /// Compile after every other attribute directive on the same element.
  fn runs_last(&self) -> bool {
    false
  }
}

pub trait ContentCompiler: Send + Sync {
  /// Replacement children for the host element.
  fn compile(&self, usage: &DirectiveUse, state: &mut CompileState) -> Result<Vec<Node>>;
}

#[derive(Clone)]
pub enum Directive {
  ControlFlow(Arc<dyn ControlFlowCompiler>),
  Attribute(Arc<dyn AttributeCompiler>),
  Content(Arc<dyn ContentCompiler>),
  PassThrough,
}

impl Directive {
  pub fn kind(&self) -> DirectiveType {
    match self {
      Self::ControlFlow(_) => DirectiveType::ControlFlow,
      Self::Attribute(_) => DirectiveType::Attribute,
      Self::Content(_) => DirectiveType::Content,
      Self::PassThrough => DirectiveType::PassThrough,
    }
  }
}

impl std::fmt::Debug for Directive {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Directive::{:?}", self.kind())
  }
}

/// Directive name -> compiler strategy.
#[derive(Debug, Clone, Default)]
pub struct DirectiveRegistry {
  entries: HashMap<String, Directive>,
}

impl DirectiveRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_builtins(config: &CompilerConfig) -> Self {
    let mut registry = Self::new();
    let prefix = config.directive_prefix.as_str();

    for conditional in Conditional::builtins(prefix) {
      let name = conditional.name();
      registry.register(name, Directive::ControlFlow(Arc::new(conditional)));
    }
    registry
      .register("elseif", Directive::ControlFlow(Arc::new(ConditionalBranch::else_if(prefix))));
    registry.register("else", Directive::ControlFlow(Arc::new(ConditionalBranch::else_(prefix))));
    registry.register("foreach", Directive::ControlFlow(Arc::new(Loop::foreach(prefix))));
    registry.register("forelse", Directive::ControlFlow(Arc::new(Loop::forelse(prefix))));
    registry.register("while", Directive::ControlFlow(Arc::new(While::new(prefix))));
    registry.register(
      "times",
      Directive::ControlFlow(Arc::new(Times::new(prefix, config.times_one_based))),
    );
    registry.register("switch", Directive::ControlFlow(Arc::new(SwitchDirective::new(prefix))));
    registry.register("case", Directive::ControlFlow(Arc::new(SwitchBranch::case(prefix))));
    registry.register("default", Directive::ControlFlow(Arc::new(SwitchBranch::default_(prefix))));
    registry.register("try", Directive::ControlFlow(Arc::new(TryDirective::new(prefix))));
    registry.register("finally", Directive::ControlFlow(Arc::new(Finally::new(prefix))));

    registry.register("class", Directive::Attribute(Arc::new(ClassAttribute::new(prefix))));
    let spread = Arc::new(SpreadAttribute::new(prefix));
    registry.register("spread", Directive::Attribute(spread.clone()));
    registry.register("attr", Directive::Attribute(spread));
    for name in HTML_BOOLEAN_ATTRS {
      registry.register(name, Directive::Attribute(Arc::new(BooleanAttribute::new(name))));
    }
    registry.register("tag", Directive::Attribute(Arc::new(TagAttribute::new(prefix))));
    registry.register("ifcontent", Directive::Attribute(Arc::new(IfContentAttribute)));

    registry.register("text", Directive::Content(Arc::new(TextContent::new(prefix))));
    registry.register("html", Directive::Content(Arc::new(HtmlContent::new(prefix))));

    for name in ["slot", "bind", "raw", "component"] {
      registry.register(name, Directive::PassThrough);
    }
    registry
  }

  /// Add or replace the strategy for `name`.
  pub fn register(&mut self, name: &str, directive: Directive) {
    self.entries.insert(name.to_string(), directive);
  }

  pub fn get(&self, name: &str) -> Option<&Directive> {
    self.entries.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  pub fn kind(&self, name: &str) -> Option<DirectiveType> {
    self.get(name).map(Directive::kind)
  }

  pub fn control_flow(&self, name: &str) -> Option<&Arc<dyn ControlFlowCompiler>> {
    match self.get(name)? {
      Directive::ControlFlow(c) => Some(c),
      _ => None,
    }
  }

  /// Registered names in sorted order.
  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  /// Element names usable as `<prefix-NAME>` directive syntax.
  pub fn element_claims(&self) -> HashMap<String, Option<String>> {
    let sorted: BTreeMap<&String, &Directive> = self.entries.iter().collect();
    sorted
      .into_iter()
      .filter_map(|(name, directive)| match directive {
        Directive::ControlFlow(c) => {
          c.claim().map(|claim| (name.clone(), claim.attribute.map(str::to_string)))
        }
        _ => None,
      })
      .collect()
  }

  /// Error for an unregistered `prefix:name`, with the closest suggestion
  /// from the registry or the inheritance attributes (ties go to the latter).
  pub fn unknown(&self, prefix: &str, name: &str) -> CompileError {
    let suggestion = did_you_mean(name, &self.names(), INHERITANCE_ATTRIBUTES);
    CompileError::unknown_directive(prefix, name, suggestion)
  }
}
