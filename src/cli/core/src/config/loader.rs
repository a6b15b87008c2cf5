/* src/cli/core/src/config/loader.rs */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::SugarConfig;

/// Walk upward from `start` to find `sugar.toml`, like Cargo.toml discovery
pub fn find_sugar_config(start: &Path) -> Result<PathBuf> {
  let mut dir =
    start.canonicalize().with_context(|| format!("failed to canonicalize {}", start.display()))?;
  loop {
    let candidate = dir.join("sugar.toml");
    if candidate.is_file() {
      return Ok(candidate);
    }
    if !dir.pop() {
      bail!("sugar.toml not found (searched upward from {})", start.display());
    }
  }
}

pub fn load_sugar_config(path: &Path) -> Result<SugarConfig> {
  let content =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  let config: SugarConfig =
    toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
  if config.loader.paths.is_empty() {
    bail!("{}: [loader].paths must name at least one template root", path.display());
  }
  if config.compiler.directive_prefix.is_empty() || config.compiler.component_prefix.is_empty() {
    bail!("{}: directive and component prefixes cannot be empty", path.display());
  }
  Ok(config)
}
