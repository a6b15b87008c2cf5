/* src/cli/core/src/build.rs */

use std::time::Instant;

use anyhow::{Context, Result, bail};
use sugar_compiler::{EngineError, TemplateLoader};

use crate::config::Project;
use crate::diagnostics;
use crate::ui;

/// Compile every template under the configured roots into the cache.
pub fn run_build(project: &Project) -> Result<()> {
  ui::banner("build");
  let templates = project.loader().templates().context("failed to list templates")?;
  if templates.is_empty() {
    ui::warn("no templates found");
    return Ok(());
  }

  let engine = project.engine();
  let cache_dir = project.cache_dir();
  ui::arrow(&format!("compiling {} templates into {}", templates.len(), cache_dir.display()));
  let started = Instant::now();
  let mut failed = 0usize;
  let mut dependencies = 0usize;
  for name in &templates {
    match engine.compile(name) {
      Ok(unit) => {
        dependencies += unit.metadata.dependencies.len().saturating_sub(1);
        log::debug!("{name} -> {}", unit.path.display());
      }
      Err(EngineError::Compile(err)) => {
        failed += 1;
        diagnostics::report(&err);
      }
      Err(EngineError::Cache(err)) => {
        return Err(err).with_context(|| format!("failed to cache {name}"));
      }
    }
  }

  let elapsed = ui::format_duration(started.elapsed());
  if failed > 0 {
    ui::blank();
    bail!("build failed: {failed} of {} templates did not compile", templates.len());
  }
  ui::ok(&format!("{} templates compiled in {elapsed}", templates.len()));
  ui::detail(&format!("{dependencies} layout, partial and component references resolved"));
  ui::blank();
  Ok(())
}
