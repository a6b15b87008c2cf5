/* src/compiler/rust/src/engine.rs */

use std::sync::Arc;
use std::time::SystemTime;

use crate::cache::{CacheError, CacheMetadata, CachedTemplate, FileCache, TemplateCache};
use crate::compiler::Compiler;
use crate::config::{CacheConfig, CompilerConfig};
use crate::error::CompileError;
use crate::loader::TemplateLoader;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  #[error(transparent)]
  Compile(#[from] CompileError),

  #[error(transparent)]
  Cache(#[from] CacheError),
}

/// Compiler plus compiled-unit cache: what a host calls to get a PHP file
/// it can `require`.
pub struct Engine {
  compiler: Compiler,
  cache: Box<dyn TemplateCache>,
  debug: bool,
}

impl Engine {
  pub fn new(compiler: Compiler, cache: Box<dyn TemplateCache>, debug: bool) -> Self {
    Self { compiler, cache, debug }
  }

  /// Engine over a [`FileCache`] in `cache.dir`.
  pub fn from_config(
    config: CompilerConfig,
    loader: Arc<dyn TemplateLoader>,
    cache: &CacheConfig,
  ) -> Self {
    let store = FileCache::new(&cache.dir).with_loader(loader.clone());
    Self::new(Compiler::new(config, loader), Box::new(store), cache.debug)
  }

  pub fn compiler(&self) -> &Compiler {
    &self.compiler
  }

  pub fn is_debug(&self) -> bool {
    self.debug
  }

  /// Cached unit for `path`, compiling and storing it on a miss.
  pub fn compile(&self, path: &str) -> Result<CachedTemplate, EngineError> {
    let key = self.compiler.resolve(path)?;
    if let Some(hit) = self.cache.get(&key, self.debug)? {
      return Ok(hit);
    }
    if self.debug {
      // Memoized dependency ASTs may predate the edit that made this stale.
      self.compiler.composer().ast_cache().clear();
    }
    let started = SystemTime::now();
    let compiled = self.compiler.compile(&key)?;
    let metadata = CacheMetadata::new(&key, compiled.dependencies, self.debug)
      .with_source_mtime(self.compiler.composer().loader().modified(&key))
      .with_compiled_at(started);
    let path = self.cache.put(&key, &compiled.code, &metadata)?;
    log::debug!("compiled {key} ({} dependencies)", metadata.dependencies.len());
    Ok(CachedTemplate { path, code: compiled.code, metadata })
  }

  pub fn invalidate(&self, path: &str) -> Result<(), EngineError> {
    let key = self.compiler.resolve(path)?;
    self.cache.invalidate(&key)?;
    Ok(())
  }

  pub fn clear(&self) -> Result<(), EngineError> {
    self.compiler.composer().ast_cache().clear();
    self.cache.clear()?;
    Ok(())
  }
}
