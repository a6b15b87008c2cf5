/* src/compiler/rust/src/loader.rs */

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::config::LoaderConfig;

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
  #[error("template \"{0}\" not found")]
  NotFound(String),

  #[error("template path \"{0}\" escapes the template root")]
  InvalidPath(String),

  #[error("failed to read template \"{path}\": {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to list templates under {root}: {source}")]
  Walk {
    root: String,
    #[source]
    source: walkdir::Error,
  },
}

impl LoaderError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound(_))
  }
}

/// Source of template text. Paths are logical, `/`-separated and relative to
/// the template roots (`pages/home.sugar.php`).
pub trait TemplateLoader: Send + Sync {
  /// Canonical path for `path` as written inside `current`. `./` and `../`
  /// are relative to `current`'s directory, anything else to the root.
  fn resolve(&self, path: &str, current: Option<&str>) -> Result<String, LoaderError>;

  fn load(&self, path: &str) -> Result<String, LoaderError>;

  /// Canonical path of the component file named `stem` (`s-card`).
  fn resolve_component(&self, stem: &str) -> Result<String, LoaderError>;

  /// Last modification time, when the backing store knows it.
  fn modified(&self, _path: &str) -> Option<SystemTime> {
    None
  }

  /// Every page template (components excluded), sorted.
  fn templates(&self) -> Result<Vec<String>, LoaderError>;
}

/// Normalize `path` against `current` and make sure it carries `suffix`.
pub fn resolve_logical(
  path: &str,
  current: Option<&str>,
  suffix: &str,
) -> Result<String, LoaderError> {
  let relative = path.starts_with("./") || path.starts_with("../");
  let mut segments: Vec<&str> = Vec::new();
  if relative && let Some(current) = current {
    segments.extend(current.split('/'));
    segments.pop();
  }
  for segment in path.split('/') {
    match segment {
      "" | "." => {}
      ".." => {
        if segments.pop().is_none() {
          return Err(LoaderError::InvalidPath(path.to_string()));
        }
      }
      s => segments.push(s),
    }
  }
  if segments.is_empty() {
    return Err(LoaderError::InvalidPath(path.to_string()));
  }
  let mut resolved = segments.join("/");
  if !resolved.ends_with(suffix) {
    resolved.push_str(suffix);
  }
  Ok(resolved)
}

/// Loads templates from one or more directories; the first root holding a
/// path wins.
#[derive(Debug, Clone)]
pub struct FileTemplateLoader {
  roots: Vec<PathBuf>,
  suffix: String,
  components: String,
}

impl FileTemplateLoader {
  pub fn new(config: &LoaderConfig) -> Self {
    Self {
      roots: config.paths.clone(),
      suffix: config.suffix.clone(),
      components: config.components.trim_matches('/').to_string(),
    }
  }

  /// Resolve every root against `base` (the project directory).
  pub fn relative_to(mut self, base: &Path) -> Self {
    self.roots = self.roots.into_iter().map(|r| base.join(r)).collect();
    self
  }

  pub fn roots(&self) -> &[PathBuf] {
    &self.roots
  }

  fn locate(&self, path: &str) -> Option<PathBuf> {
    self.roots.iter().map(|root| root.join(path)).find(|candidate| candidate.is_file())
  }

  /// Templates under `root`, skipping the components directory. Symlinked
  /// directories are not descended into.
  fn collect(&self, root: &Path, out: &mut BTreeSet<String>) -> Result<(), LoaderError> {
    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name().into_iter();
    let entries = walker.filter_entry(|entry| {
      !entry.file_type().is_dir()
        || logical_path(root, entry.path()).is_none_or(|logical| logical != self.components)
    });
    for entry in entries {
      let entry =
        entry.map_err(|source| LoaderError::Walk { root: root.display().to_string(), source })?;
      if entry.file_type().is_dir() {
        continue;
      }
      if let Some(logical) = logical_path(root, entry.path())
        && logical.ends_with(&self.suffix)
      {
        out.insert(logical);
      }
    }
    Ok(())
  }
}

/// `/`-separated path of `path` below `root`; `None` for `root` itself.
fn logical_path(root: &Path, path: &Path) -> Option<String> {
  let relative = path.strip_prefix(root).ok()?;
  let logical = relative.to_string_lossy().replace('\\', "/");
  (!logical.is_empty()).then_some(logical)
}

impl TemplateLoader for FileTemplateLoader {
  fn resolve(&self, path: &str, current: Option<&str>) -> Result<String, LoaderError> {
    resolve_logical(path, current, &self.suffix)
  }

  fn load(&self, path: &str) -> Result<String, LoaderError> {
    let Some(file) = self.locate(path) else {
      return Err(LoaderError::NotFound(path.to_string()));
    };
    log::debug!("loading template {path} from {}", file.display());
    std::fs::read_to_string(&file)
      .map_err(|source| LoaderError::Io { path: path.to_string(), source })
  }

  fn resolve_component(&self, stem: &str) -> Result<String, LoaderError> {
    resolve_logical(&format!("{}/{stem}", self.components), None, &self.suffix)
  }

  fn modified(&self, path: &str) -> Option<SystemTime> {
    self.locate(path).and_then(|f| f.metadata().ok()).and_then(|m| m.modified().ok())
  }

  fn templates(&self) -> Result<Vec<String>, LoaderError> {
    let mut out = BTreeSet::new();
    for root in self.roots.iter().filter(|r| r.is_dir()) {
      self.collect(root, &mut out)?;
    }
    log::trace!("found {} templates", out.len());
    Ok(out.into_iter().collect())
  }
}

/// In-memory templates, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateLoader {
  templates: BTreeMap<String, String>,
  suffix: String,
  components: String,
}

impl MemoryTemplateLoader {
  pub fn new(config: &LoaderConfig) -> Self {
    Self {
      templates: BTreeMap::new(),
      suffix: config.suffix.clone(),
      components: config.components.trim_matches('/').to_string(),
    }
  }

  /// Add a template; the suffix is appended when missing.
  pub fn insert(&mut self, path: &str, source: impl Into<String>) -> &mut Self {
    let key = resolve_logical(path, None, &self.suffix).unwrap_or_else(|_| path.to_string());
    self.templates.insert(key, source.into());
    self
  }

  pub fn with(mut self, path: &str, source: impl Into<String>) -> Self {
    self.insert(path, source);
    self
  }
}

impl TemplateLoader for MemoryTemplateLoader {
  fn resolve(&self, path: &str, current: Option<&str>) -> Result<String, LoaderError> {
    resolve_logical(path, current, &self.suffix)
  }

  fn load(&self, path: &str) -> Result<String, LoaderError> {
    self.templates.get(path).cloned().ok_or_else(|| LoaderError::NotFound(path.to_string()))
  }

  fn resolve_component(&self, stem: &str) -> Result<String, LoaderError> {
    resolve_logical(&format!("{}/{stem}", self.components), None, &self.suffix)
  }

  fn templates(&self) -> Result<Vec<String>, LoaderError> {
    let components = format!("{}/", self.components);
    Ok(self.templates.keys().filter(|k| !k.starts_with(&components)).cloned().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> LoaderConfig {
    LoaderConfig::default()
  }

  #[test]
  fn resolves_relative_and_rooted_paths() {
    let current = Some("pages/blog/post.sugar.php");
    let resolve = |path| resolve_logical(path, current, ".sugar.php").unwrap();
    assert_eq!(resolve("../layouts/base"), "pages/layouts/base.sugar.php");
    assert_eq!(resolve("./card"), "pages/blog/card.sugar.php");
    assert_eq!(resolve("layouts/base"), "layouts/base.sugar.php");
    assert_eq!(resolve_logical("/a.sugar.php", None, ".sugar.php").unwrap(), "a.sugar.php");
  }

  #[test]
  fn rejects_paths_outside_root() {
    let err = resolve_logical("../../x", Some("a.sugar.php"), ".sugar.php").unwrap_err();
    assert!(matches!(err, LoaderError::InvalidPath(_)));
  }

  #[test]
  fn memory_loader_round_trip() {
    let loader = MemoryTemplateLoader::new(&config())
      .with("pages/home", "<p>home</p>")
      .with("components/s-card", "<div>card</div>");
    assert_eq!(loader.load("pages/home.sugar.php").unwrap(), "<p>home</p>");
    assert!(loader.load("missing.sugar.php").unwrap_err().is_not_found());
    assert_eq!(loader.resolve_component("s-card").unwrap(), "components/s-card.sugar.php");
    assert_eq!(loader.templates().unwrap(), vec!["pages/home.sugar.php".to_string()]);
  }

  #[test]
  fn file_loader_searches_roots_in_order() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(second.path().join("components")).unwrap();
    std::fs::write(first.path().join("home.sugar.php"), "first").unwrap();
    std::fs::write(second.path().join("home.sugar.php"), "second").unwrap();
    std::fs::write(second.path().join("about.sugar.php"), "about").unwrap();
    std::fs::write(second.path().join("components/s-card.sugar.php"), "card").unwrap();
    std::fs::write(second.path().join("notes.txt"), "ignored").unwrap();

    let config = LoaderConfig {
      paths: vec![first.path().to_path_buf(), second.path().to_path_buf()],
      ..LoaderConfig::default()
    };
    let loader = FileTemplateLoader::new(&config);
    assert_eq!(loader.load("home.sugar.php").unwrap(), "first");
    assert_eq!(loader.load("about.sugar.php").unwrap(), "about");
    assert!(loader.modified("about.sugar.php").is_some());
    assert!(loader.load("nope.sugar.php").unwrap_err().is_not_found());
    assert_eq!(loader.templates().unwrap(), ["about.sugar.php", "home.sugar.php"]);
  }

  #[cfg(unix)]
  #[test]
  fn file_loader_does_not_follow_directory_symlinks() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("pages")).unwrap();
    std::fs::write(root.path().join("pages/home.sugar.php"), "home").unwrap();
    std::os::unix::fs::symlink(root.path(), root.path().join("pages/loop")).unwrap();

    let config = LoaderConfig { paths: vec![root.path().to_path_buf()], ..LoaderConfig::default() };
    let loader = FileTemplateLoader::new(&config);
    assert_eq!(loader.templates().unwrap(), ["pages/home.sugar.php"]);
  }

  #[test]
  fn overlapping_roots_list_each_template_once() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("pages")).unwrap();
    std::fs::write(root.path().join("pages/home.sugar.php"), "home").unwrap();

    let config = LoaderConfig {
      paths: vec![root.path().to_path_buf(), root.path().to_path_buf()],
      ..LoaderConfig::default()
    };
    let loader = FileTemplateLoader::new(&config);
    assert_eq!(loader.templates().unwrap(), ["pages/home.sugar.php"]);
  }
}
