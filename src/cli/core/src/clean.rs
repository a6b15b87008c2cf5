/* src/cli/core/src/clean.rs */

use anyhow::{Context, Result};
use sugar_compiler::{FileCache, TemplateCache};

use crate::config::Project;
use crate::ui;

pub fn run_clean(project: &Project) -> Result<()> {
  let dir = project.cache_dir();
  ui::arrow(&format!("cleaning {}", dir.display()));
  if !dir.exists() {
    ui::ok("nothing to clean");
    return Ok(());
  }
  FileCache::new(&dir).clear().with_context(|| format!("failed to remove {}", dir.display()))?;
  ui::ok("clean complete");
  Ok(())
}
