/* src/cli/core/src/config/types.rs */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use sugar_compiler::{
  CacheConfig, CompilerConfig, Engine, FileTemplateLoader, LoaderConfig, TemplateLoader,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SugarConfig {
  #[serde(default)]
  pub compiler: CompilerConfig,
  #[serde(default)]
  pub loader: LoaderConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

/// A parsed `sugar.toml` together with the directory it was found in.
/// Relative template roots and the cache directory resolve against `base_dir`.
#[derive(Debug, Clone)]
pub struct Project {
  pub base_dir: PathBuf,
  pub config: SugarConfig,
}

impl Project {
  pub fn new(config_path: &Path, config: SugarConfig) -> Self {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    Self { base_dir, config }
  }

  pub fn loader(&self) -> FileTemplateLoader {
    FileTemplateLoader::new(&self.config.loader).relative_to(&self.base_dir)
  }

  pub fn cache_dir(&self) -> PathBuf {
    self.base_dir.join(&self.config.cache.dir)
  }

  pub fn engine(&self) -> Engine {
    let loader: Arc<dyn TemplateLoader> = Arc::new(self.loader());
    let cache = CacheConfig { dir: self.cache_dir(), debug: self.config.cache.debug };
    Engine::from_config(self.config.compiler.clone(), loader, &cache)
  }
}
