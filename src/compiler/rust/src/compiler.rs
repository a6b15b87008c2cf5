/* src/compiler/rust/src/compiler.rs */

use std::sync::Arc;

use crate::codegen::CodeGenerator;
use crate::composition::{ComponentExpansionPass, InheritancePass, TemplateComposer, loader_error};
use crate::config::CompilerConfig;
use crate::context::ContextAnalysisPass;
use crate::directive::{
  DirectiveCompilationPass, DirectiveExtractionPass, DirectivePairingPass, DirectiveRegistry,
};
use crate::error::{CompileError, Result};
use crate::extension::{
  Extension, PassFactory, PassPriority, PassServices, RegistrationContext, ServiceMap,
};
use crate::loader::TemplateLoader;
use crate::parser::Parser;
use crate::pipeline::{CompileState, Pipeline};

/// Generated PHP plus every template it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
  pub code: String,
  pub dependencies: Vec<String>,
}

pub struct CompilerBuilder {
  config: CompilerConfig,
  loader: Arc<dyn TemplateLoader>,
  extensions: Vec<Box<dyn Extension>>,
}

impl CompilerBuilder {
  pub fn extension(mut self, extension: impl Extension + 'static) -> Self {
    self.extensions.push(Box::new(extension));
    self
  }

  pub fn build(self) -> Result<Compiler> {
    let mut registry = DirectiveRegistry::with_builtins(&self.config);
    let mut passes = Vec::new();
    let mut services = ServiceMap::default();
    for extension in &self.extensions {
      log::debug!("registering extension {}", extension.name());
      let mut cx =
        RegistrationContext::new(&self.config, &mut registry, &mut passes, &mut services);
      extension.register(&mut cx).map_err(|e| {
        CompileError::new(e.kind(), format!("extension {}: {}", extension.name(), e.message()))
      })?;
    }
    Ok(Compiler::assemble(self.config, self.loader, registry, passes, services))
  }
}

/// Template path in, PHP source out. One compiler serves any number of
/// compiles; parsed dependency ASTs are memoized across them.
pub struct Compiler {
  config: Arc<CompilerConfig>,
  registry: Arc<DirectiveRegistry>,
  composer: Arc<TemplateComposer>,
  passes: Vec<(i32, PassFactory)>,
  services: ServiceMap,
}

impl Compiler {
  /// Compiler with the built-in directives only.
  pub fn new(config: CompilerConfig, loader: Arc<dyn TemplateLoader>) -> Self {
    let registry = DirectiveRegistry::with_builtins(&config);
    Self::assemble(config, loader, registry, Vec::new(), ServiceMap::default())
  }

  pub fn builder(config: CompilerConfig, loader: Arc<dyn TemplateLoader>) -> CompilerBuilder {
    CompilerBuilder { config, loader, extensions: Vec::new() }
  }

  fn assemble(
    config: CompilerConfig,
    loader: Arc<dyn TemplateLoader>,
    registry: DirectiveRegistry,
    passes: Vec<(i32, PassFactory)>,
    services: ServiceMap,
  ) -> Self {
    let config = Arc::new(config);
    let claims = registry.element_claims();
    let registry = Arc::new(registry);
    let composer = Arc::new(TemplateComposer::new(config.clone(), loader, claims));
    Self { config, registry, composer, passes, services }
  }

  pub fn config(&self) -> &CompilerConfig {
    &self.config
  }

  pub fn registry(&self) -> &DirectiveRegistry {
    &self.registry
  }

  pub fn composer(&self) -> &TemplateComposer {
    &self.composer
  }

  pub fn services(&self) -> &ServiceMap {
    &self.services
  }

  /// Canonical path of a root template.
  pub fn resolve(&self, path: &str) -> Result<String> {
    self.composer.resolve(path, None)
  }

  pub fn compile(&self, path: &str) -> Result<CompiledTemplate> {
    let resolved = self.resolve(path)?;
    let source = self.composer.loader().load(&resolved).map_err(|e| loader_error(e, &resolved))?;
    self.compile_source(&source, Some(&resolved))
  }

  /// Compile `source` directly. `path` names the template for relative
  /// resolution and diagnostics.
  pub fn compile_source(&self, source: &str, path: Option<&str>) -> Result<CompiledTemplate> {
    log::debug!("compiling {}", path.unwrap_or("<string>"));
    let mut state = CompileState::new(path);
    if let Some(path) = path {
      state.add_dependency(path);
    }
    match self.run(source, &mut state) {
      Ok(code) => Ok(CompiledTemplate { code, dependencies: state.into_dependencies() }),
      Err(err) => Err(self.enrich(err, source, path)),
    }
  }

  /// Pass names in execution order.
  pub fn pass_names(&self) -> Vec<&'static str> {
    self.pipeline().pass_names()
  }

  fn run(&self, source: &str, state: &mut CompileState) -> Result<String> {
    let doc = Parser::new(&self.config).with_claims(self.registry.element_claims()).parse(source)?;
    let doc = self.pipeline().execute(doc, state)?;
    CodeGenerator::new(&self.config).with_services(&self.services).generate(&doc, state)
  }

  fn pipeline(&self) -> Pipeline {
    let services = PassServices {
      config: self.config.clone(),
      registry: self.registry.clone(),
      composer: self.composer.clone(),
    };
    let mut pipeline = Pipeline::new();
    pipeline
      .add(PassPriority::INHERITANCE, Box::new(InheritancePass::new(services.composer.clone())));
    pipeline.add(
      PassPriority::COMPONENT_EXPANSION,
      Box::new(ComponentExpansionPass::new(services.composer.clone(), services.registry.clone())),
    );
    pipeline.add(
      PassPriority::DIRECTIVE_EXTRACTION,
      Box::new(DirectiveExtractionPass::new(services.config.clone(), services.registry.clone())),
    );
    pipeline.add(
      PassPriority::DIRECTIVE_PAIRING,
      Box::new(DirectivePairingPass::new(services.config.clone(), services.registry.clone())),
    );
    pipeline.add(
      PassPriority::DIRECTIVE_COMPILATION,
      Box::new(DirectiveCompilationPass::new(services.config.clone(), services.registry.clone())),
    );
    pipeline.add(PassPriority::CONTEXT_ANALYSIS, Box::new(ContextAnalysisPass::new()));
    for (priority, factory) in &self.passes {
      pipeline.add(*priority, factory(&services));
    }
    pipeline
  }

  /// Name the template and attach a source snippet, loading the source of
  /// the template the error points into when it is not the root.
  fn enrich(&self, err: CompileError, source: &str, path: Option<&str>) -> CompileError {
    let err = match path {
      Some(path) => err.in_template(path),
      None => err,
    };
    if err.snippet().is_some() {
      return err;
    }
    let lines = self.config.snippet_context_lines;
    match err.template().map(str::to_string) {
      Some(template) if Some(template.as_str()) != path => {
        match self.composer.loader().load(&template) {
          Ok(other) => err.with_snippet(&other, lines),
          Err(_) => err,
        }
      }
      _ => err.with_snippet(source, lines),
    }
  }
}
