/* src/compiler/rust/src/config.rs */

use std::path::PathBuf;

use serde::Deserialize;

/// Elements that never have children and are closed by their start tag.
pub const VOID_ELEMENTS: &[&str] = &[
  "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
  "track", "wbr",
];

#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
  /// Directive attributes are written `<prefix>:<name>`.
  #[serde(default = "default_prefix")]
  pub directive_prefix: String,
  /// Component and fragment tags are written `<prefix>-<name>`.
  #[serde(default = "default_prefix")]
  pub component_prefix: String,
  #[serde(default = "default_fragment_element")]
  pub fragment_element: String,
  #[serde(default = "default_void_elements")]
  pub void_elements: Vec<String>,
  #[serde(default = "default_escaper_class")]
  pub escaper_class: String,
  #[serde(default)]
  pub times_one_based: bool,
  #[serde(default = "default_true")]
  pub strict_types: bool,
  /// Escape plain string and integer literal outputs at compile time.
  #[serde(default = "default_true")]
  pub fold_literal_output: bool,
  #[serde(default = "default_snippet_context_lines")]
  pub snippet_context_lines: usize,
  /// Parsed dependency templates kept in memory; 0 disables the cache.
  #[serde(default = "default_ast_cache_capacity")]
  pub ast_cache_capacity: usize,
}

impl Default for CompilerConfig {
  fn default() -> Self {
    Self {
      directive_prefix: default_prefix(),
      component_prefix: default_prefix(),
      fragment_element: default_fragment_element(),
      void_elements: default_void_elements(),
      escaper_class: default_escaper_class(),
      times_one_based: false,
      strict_types: true,
      fold_literal_output: true,
      snippet_context_lines: default_snippet_context_lines(),
      ast_cache_capacity: default_ast_cache_capacity(),
    }
  }
}

impl CompilerConfig {
  pub fn is_void(&self, tag: &str) -> bool {
    self.void_elements.iter().any(|v| v.eq_ignore_ascii_case(tag))
  }

  /// `s:if` -> `Some("if")` for the configured prefix.
  pub fn directive_name<'a>(&self, attr: &'a str) -> Option<&'a str> {
    attr
      .strip_prefix(self.directive_prefix.as_str())
      .and_then(|rest| rest.strip_prefix(':'))
      .filter(|name| !name.is_empty())
  }

  pub fn directive_attr(&self, name: &str) -> String {
    format!("{}:{name}", self.directive_prefix)
  }

  /// `s-card` -> `Some("card")` for the configured component prefix.
  pub fn special_tag<'a>(&self, tag: &'a str) -> Option<&'a str> {
    tag
      .strip_prefix(self.component_prefix.as_str())
      .and_then(|rest| rest.strip_prefix('-'))
      .filter(|name| !name.is_empty())
  }
}

fn default_prefix() -> String {
  "s".to_string()
}

fn default_fragment_element() -> String {
  "template".to_string()
}

fn default_void_elements() -> Vec<String> {
  VOID_ELEMENTS.iter().map(|s| (*s).to_string()).collect()
}

fn default_escaper_class() -> String {
  "\\Sugar\\Escape\\Escaper".to_string()
}

fn default_true() -> bool {
  true
}

fn default_snippet_context_lines() -> usize {
  2
}

fn default_ast_cache_capacity() -> usize {
  256
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
  #[serde(default = "default_paths")]
  pub paths: Vec<PathBuf>,
  #[serde(default = "default_suffix")]
  pub suffix: String,
  #[serde(default = "default_components")]
  pub components: String,
}

impl Default for LoaderConfig {
  fn default() -> Self {
    Self { paths: default_paths(), suffix: default_suffix(), components: default_components() }
  }
}

fn default_paths() -> Vec<PathBuf> {
  vec![PathBuf::from("templates")]
}

fn default_suffix() -> String {
  ".sugar.php".to_string()
}

fn default_components() -> String {
  "components".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_cache_dir")]
  pub dir: PathBuf,
  #[serde(default)]
  pub debug: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { dir: default_cache_dir(), debug: false }
  }
}

fn default_cache_dir() -> PathBuf {
  PathBuf::from(".sugar/cache")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn directive_name_uses_prefix() {
    let config = CompilerConfig::default();
    assert_eq!(config.directive_name("s:if"), Some("if"));
    assert_eq!(config.directive_name("s:"), None);
    assert_eq!(config.directive_name("x:if"), None);
    assert_eq!(config.directive_name("class"), None);

    let custom = CompilerConfig { directive_prefix: "x".into(), ..CompilerConfig::default() };
    assert_eq!(custom.directive_name("x:foreach"), Some("foreach"));
    assert_eq!(custom.directive_attr("if"), "x:if");
  }

  #[test]
  fn special_tag_strips_component_prefix() {
    let config = CompilerConfig::default();
    assert_eq!(config.special_tag("s-card"), Some("card"));
    assert_eq!(config.special_tag("s-"), None);
    assert_eq!(config.special_tag("section"), None);
  }

  #[test]
  fn void_lookup_ignores_case() {
    let config = CompilerConfig::default();
    assert!(config.is_void("br"));
    assert!(config.is_void("IMG"));
    assert!(!config.is_void("div"));
  }
}
