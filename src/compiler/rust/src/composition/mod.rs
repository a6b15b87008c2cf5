/* src/compiler/rust/src/composition/mod.rs */

mod blocks;
mod component;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub use blocks::InheritancePass;
pub use component::ComponentExpansionPass;

use crate::ast::{AttributeNode, DocumentNode, Meta};
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::loader::{LoaderError, TemplateLoader};
use crate::parser::Parser;
use crate::pipeline::CompileState;

/// Parsed template ASTs by resolved path. Entries are never handed out
/// directly: every checkout is a deep clone the caller may mutate freely.
/// Holds at most `capacity` entries, evicting the oldest first.
#[derive(Debug)]
pub struct AstCache {
  capacity: usize,
  entries: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
  docs: HashMap<String, Arc<DocumentNode>>,
  order: VecDeque<String>,
}

impl AstCache {
  pub fn new(capacity: usize) -> Self {
    Self { capacity, entries: Mutex::new(Entries::default()) }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn checkout(&self, path: &str) -> Option<DocumentNode> {
    self.lock().docs.get(path).map(|doc| DocumentNode::clone(doc))
  }

  pub fn store(&self, path: &str, doc: &DocumentNode) {
    if self.capacity == 0 {
      return;
    }
    let mut entries = self.lock();
    if entries.docs.insert(path.to_string(), Arc::new(doc.clone())).is_some() {
      return;
    }
    entries.order.push_back(path.to_string());
    while entries.order.len() > self.capacity {
      if let Some(oldest) = entries.order.pop_front() {
        log::trace!("evicting parsed template {oldest}");
        entries.docs.remove(&oldest);
      }
    }
  }

  pub fn len(&self) -> usize {
    self.lock().docs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn clear(&self) {
    let mut entries = self.lock();
    entries.docs.clear();
    entries.order.clear();
  }
}

/// Loads, parses and caches the templates that `extends`, `include` and
/// components refer to.
pub struct TemplateComposer {
  config: Arc<CompilerConfig>,
  loader: Arc<dyn TemplateLoader>,
  claims: HashMap<String, Option<String>>,
  asts: AstCache,
}

impl TemplateComposer {
  pub fn new(
    config: Arc<CompilerConfig>,
    loader: Arc<dyn TemplateLoader>,
    claims: HashMap<String, Option<String>>,
  ) -> Self {
    let asts = AstCache::new(config.ast_cache_capacity);
    Self { config, loader, claims, asts }
  }

  pub fn config(&self) -> &CompilerConfig {
    &self.config
  }

  pub fn loader(&self) -> &Arc<dyn TemplateLoader> {
    &self.loader
  }

  pub fn ast_cache(&self) -> &AstCache {
    &self.asts
  }

  pub fn resolve(&self, path: &str, current: Option<&str>) -> Result<String> {
    self.loader.resolve(path, current).map_err(|e| loader_error(e, path))
  }

  pub fn resolve_component(&self, name: &str) -> Result<String> {
    let stem = format!("{}-{name}", self.config.component_prefix);
    self.loader.resolve_component(&stem).map_err(|e| match e {
      LoaderError::NotFound(_) => CompileError::component_not_found(name),
      other => CompileError::compilation(other.to_string()),
    })
  }

  /// Parsed copy of the template at resolved `path`, recorded as a dependency.
  /// Every node is stamped with `path` as its origin.
  pub fn load(&self, path: &str, state: &mut CompileState) -> Result<DocumentNode> {
    state.add_dependency(path);
    if let Some(doc) = self.asts.checkout(path) {
      log::trace!("ast cache hit for {path}");
      return Ok(doc);
    }
    log::trace!("ast cache miss for {path}");
    let source = self.loader.load(path).map_err(|e| loader_error(e, path))?;
    let mut doc = Parser::new(&self.config)
      .with_claims(self.claims.clone())
      .parse(&source)
      .map_err(|e| e.in_template(path).with_snippet(&source, self.config.snippet_context_lines))?;
    doc.meta.origin = Some(path.to_string());
    for child in &mut doc.children {
      child.stamp_origin(path);
    }
    self.asts.store(path, &doc);
    Ok(doc)
  }

  /// Like [`load`](Self::load) for a component, mapping a miss to
  /// `ComponentNotFound`.
  pub fn load_component(
    &self,
    name: &str,
    path: &str,
    state: &mut CompileState,
  ) -> Result<DocumentNode> {
    self.load(path, state).map_err(|e| {
      if e.kind() == crate::error::ErrorKind::TemplateNotFound {
        CompileError::component_not_found(name)
      } else {
        e
      }
    })
  }
}

pub(crate) fn loader_error(err: LoaderError, path: &str) -> CompileError {
  match err {
    LoaderError::NotFound(_) => CompileError::template_not_found(path),
    other => CompileError::compilation(other.to_string()),
  }
}

/// Push `path` onto the resolution chain, failing on a cycle.
pub(crate) fn enter(state: &mut CompileState, path: &str, meta: &Meta) -> Result<()> {
  if let Some(message) = state.cycle_with(path) {
    return Err(CompileError::compilation(message).at(meta));
  }
  state.chain.push(path.to_string());
  Ok(())
}

pub(crate) fn leave(state: &mut CompileState) {
  state.chain.pop();
}

/// Static value of a directive-style attribute; `None` when valueless.
pub(crate) fn static_expression(
  attr: &AttributeNode,
  config: &CompilerConfig,
  name: &str,
) -> Result<Option<String>> {
  match &attr.value {
    crate::ast::AttributeValue::Static(s) => Ok(Some(s.trim().to_string())),
    crate::ast::AttributeValue::Boolean => Ok(None),
    _ => Err(
      CompileError::syntax(format!(
        "{} takes a plain value, not <?= ?> output",
        config.directive_attr(name)
      ))
      .at(&attr.meta),
    ),
  }
}
