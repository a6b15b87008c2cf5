/* src/compiler/rust/src/extension.rs */

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::composition::TemplateComposer;
use crate::config::CompilerConfig;
use crate::directive::{Directive, DirectiveRegistry};
use crate::error::{CompileError, Result};
use crate::pipeline::AstPass;
use crate::runtime::COMPONENT_RENDERER_SERVICE;

/// Priorities of the built-in passes. Custom passes must pick another value.
pub struct PassPriority;

impl PassPriority {
  pub const INHERITANCE: i32 = 10;
  pub const COMPONENT_EXPANSION: i32 = 20;
  pub const DIRECTIVE_EXTRACTION: i32 = 30;
  pub const DIRECTIVE_PAIRING: i32 = 40;
  pub const DIRECTIVE_COMPILATION: i32 = 50;
  pub const CONTEXT_ANALYSIS: i32 = 60;

  pub const BUILTIN: [i32; 6] = [
    Self::INHERITANCE,
    Self::COMPONENT_EXPANSION,
    Self::DIRECTIVE_EXTRACTION,
    Self::DIRECTIVE_PAIRING,
    Self::DIRECTIVE_COMPILATION,
    Self::CONTEXT_ANALYSIS,
  ];

  pub fn is_reserved(priority: i32) -> bool {
    Self::BUILTIN.contains(&priority)
  }
}

/// What a pass factory gets to build a fresh pass for one compile.
#[derive(Clone)]
pub struct PassServices {
  pub config: Arc<CompilerConfig>,
  pub registry: Arc<DirectiveRegistry>,
  pub composer: Arc<TemplateComposer>,
}

pub type PassFactory = Arc<dyn Fn(&PassServices) -> Box<dyn AstPass> + Send + Sync>;

/// Runtime services by id, mapped to the PHP class providing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceMap {
  services: BTreeMap<String, String>,
}

impl ServiceMap {
  /// Bind `id`. Reserved ids can be bound once; anything else is replaced.
  pub fn bind(&mut self, id: &str, class: impl Into<String>) -> Result<()> {
    if id == COMPONENT_RENDERER_SERVICE && self.services.contains_key(id) {
      return Err(CompileError::compilation(format!(
        "runtime service \"{id}\" is reserved and already bound"
      )));
    }
    self.services.insert(id.to_string(), class.into());
    Ok(())
  }

  pub fn get(&self, id: &str) -> Option<&str> {
    self.services.get(id).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.services.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn is_empty(&self) -> bool {
    self.services.is_empty()
  }
}

/// Plugs directives, passes and runtime services into a compiler.
pub trait Extension {
  fn name(&self) -> &str;

  fn register(&self, cx: &mut RegistrationContext<'_>) -> Result<()>;
}

pub struct RegistrationContext<'a> {
  config: &'a CompilerConfig,
  registry: &'a mut DirectiveRegistry,
  passes: &'a mut Vec<(i32, PassFactory)>,
  services: &'a mut ServiceMap,
}

impl<'a> RegistrationContext<'a> {
  pub(crate) fn new(
    config: &'a CompilerConfig,
    registry: &'a mut DirectiveRegistry,
    passes: &'a mut Vec<(i32, PassFactory)>,
    services: &'a mut ServiceMap,
  ) -> Self {
    Self { config, registry, passes, services }
  }

  pub fn config(&self) -> &CompilerConfig {
    self.config
  }

  /// Add a directive, replacing a built-in of the same name.
  pub fn directive(&mut self, name: &str, directive: Directive) {
    if self.registry.contains(name) {
      log::debug!("overriding directive {}:{name}", self.config.directive_prefix);
    }
    self.registry.register(name, directive);
  }

  pub fn pass<F>(&mut self, priority: i32, factory: F) -> Result<()>
  where
    F: Fn(&PassServices) -> Box<dyn AstPass> + Send + Sync + 'static,
  {
    if PassPriority::is_reserved(priority) {
      return Err(CompileError::compilation(format!(
        "pass priority {priority} is reserved for a built-in pass"
      )));
    }
    self.passes.push((priority, Arc::new(factory)));
    Ok(())
  }

  pub fn service(&mut self, id: &str, class: impl Into<String>) -> Result<()> {
    self.services.bind(id, class)
  }
}
