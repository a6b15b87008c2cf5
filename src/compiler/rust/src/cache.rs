/* src/compiler/rust/src/cache.rs */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::loader::TemplateLoader;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
  #[error("cache I/O failed for {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot encode cache metadata for {key}: {source}")]
  Encode {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Stored next to every compiled unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
  pub key: String,
  /// Every template the unit was built from, the root template included.
  pub dependencies: Vec<String>,
  /// Root template mtime at compile time, milliseconds since the epoch.
  pub source_mtime: Option<u64>,
  /// Milliseconds since the epoch.
  pub compiled_at: u64,
  pub debug: bool,
}

impl CacheMetadata {
  pub fn new(key: &str, dependencies: Vec<String>, debug: bool) -> Self {
    Self {
      key: key.to_string(),
      dependencies,
      source_mtime: None,
      compiled_at: millis(SystemTime::now()),
      debug,
    }
  }

  pub fn with_source_mtime(mut self, mtime: Option<SystemTime>) -> Self {
    self.source_mtime = mtime.map(millis);
    self
  }

  /// Backdate the build time, typically to when compilation started.
  pub fn with_compiled_at(mut self, time: SystemTime) -> Self {
    self.compiled_at = millis(time);
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTemplate {
  /// Location of the PHP file to `require`.
  pub path: PathBuf,
  pub code: String,
  pub metadata: CacheMetadata,
}

/// Storage for compiled units keyed by resolved template path.
pub trait TemplateCache: Send + Sync {
  /// Fresh entry for `key`. Entries built under a different debug flag are
  /// misses.
  fn get(&self, key: &str, debug: bool) -> Result<Option<CachedTemplate>, CacheError>;

  fn put(&self, key: &str, code: &str, metadata: &CacheMetadata) -> Result<PathBuf, CacheError>;

  fn invalidate(&self, key: &str) -> Result<(), CacheError>;

  fn clear(&self) -> Result<(), CacheError>;
}

/// `<dir>/<sha256(key)>.php` plus a `.json` metadata sidecar.
pub struct FileCache {
  dir: PathBuf,
  loader: Option<Arc<dyn TemplateLoader>>,
}

impl FileCache {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into(), loader: None }
  }

  /// Look dependency mtimes up through `loader` instead of treating
  /// dependencies as filesystem paths.
  pub fn with_loader(mut self, loader: Arc<dyn TemplateLoader>) -> Self {
    self.loader = Some(loader);
    self
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn stem(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
  }

  pub fn code_path(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.php", Self::stem(key)))
  }

  fn meta_path(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.json", Self::stem(key)))
  }

  fn modified(&self, dependency: &str) -> Option<SystemTime> {
    match &self.loader {
      Some(loader) => loader.modified(dependency),
      None => std::fs::metadata(dependency).and_then(|m| m.modified()).ok(),
    }
  }

  fn is_stale(&self, metadata: &CacheMetadata) -> bool {
    metadata.dependencies.iter().any(|dep| match self.modified(dep) {
      Some(mtime) => millis(mtime) > metadata.compiled_at,
      None => {
        log::debug!("cache entry for {} depends on missing {dep}", metadata.key);
        true
      }
    })
  }
}

impl TemplateCache for FileCache {
  fn get(&self, key: &str, debug: bool) -> Result<Option<CachedTemplate>, CacheError> {
    let meta_path = self.meta_path(key);
    let raw = match std::fs::read_to_string(&meta_path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(source) => return Err(CacheError::Io { path: meta_path, source }),
    };
    let metadata: CacheMetadata = match serde_json::from_str(&raw) {
      Ok(metadata) => metadata,
      Err(e) => {
        log::warn!("ignoring unreadable cache metadata {}: {e}", meta_path.display());
        return Ok(None);
      }
    };
    if metadata.key != key {
      log::warn!("cache key collision on {}", meta_path.display());
      return Ok(None);
    }
    if metadata.debug != debug {
      log::debug!("cache miss for {key}: built with debug={}", metadata.debug);
      return Ok(None);
    }
    if debug && self.is_stale(&metadata) {
      log::debug!("cache entry for {key} is stale");
      return Ok(None);
    }
    let path = self.code_path(key);
    let code = match std::fs::read_to_string(&path) {
      Ok(code) => code,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(source) => return Err(CacheError::Io { path, source }),
    };
    log::debug!("cache hit for {key}");
    Ok(Some(CachedTemplate { path, code, metadata }))
  }

  fn put(&self, key: &str, code: &str, metadata: &CacheMetadata) -> Result<PathBuf, CacheError> {
    std::fs::create_dir_all(&self.dir)
      .map_err(|source| CacheError::Io { path: self.dir.clone(), source })?;
    let json = serde_json::to_string_pretty(metadata)
      .map_err(|source| CacheError::Encode { key: key.to_string(), source })?;
    let path = self.code_path(key);
    // Code first: a reader that finds metadata always finds the unit too.
    write_atomic(&path, code)?;
    write_atomic(&self.meta_path(key), &json)?;
    log::debug!("cached {key} at {}", path.display());
    Ok(path)
  }

  fn invalidate(&self, key: &str) -> Result<(), CacheError> {
    for path in [self.meta_path(key), self.code_path(key)] {
      match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => return Err(CacheError::Io { path, source }),
      }
    }
    Ok(())
  }

  fn clear(&self) -> Result<(), CacheError> {
    match std::fs::remove_dir_all(&self.dir) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(source) => Err(CacheError::Io { path: self.dir.clone(), source }),
    }
  }
}

fn write_atomic(path: &Path, content: &str) -> Result<(), CacheError> {
  let tmp = path.with_extension(format!("tmp{}", std::process::id()));
  std::fs::write(&tmp, content).map_err(|source| CacheError::Io { path: tmp.clone(), source })?;
  std::fs::rename(&tmp, path).map_err(|source| CacheError::Io { path: path.to_path_buf(), source })
}

fn millis(time: SystemTime) -> u64 {
  time.duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}
