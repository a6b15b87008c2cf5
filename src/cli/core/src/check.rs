/* src/cli/core/src/check.rs */

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use sugar_compiler::{Compiler, ErrorKind, TemplateLoader};

use crate::config::Project;
use crate::diagnostics;
use crate::ui;

/// Compile `templates` (every template when empty) without writing anything.
pub fn run_check(project: &Project, templates: &[String]) -> Result<()> {
  let loader = project.loader();
  let known = loader.templates().context("failed to list templates")?;
  let targets = if templates.is_empty() { known.clone() } else { templates.to_vec() };
  if targets.is_empty() {
    ui::warn("no templates found");
    return Ok(());
  }

  let suffix = project.config.loader.suffix.clone();
  let compiler = Compiler::new(project.config.compiler.clone(), Arc::new(loader));
  let started = Instant::now();
  let mut failed = 0usize;
  for name in &targets {
    match compiler.compile(name) {
      Ok(compiled) => {
        log::debug!("{name}: {} dependencies", compiled.dependencies.len());
        ui::ok(name);
      }
      Err(err) => {
        failed += 1;
        diagnostics::report(&err);
        if err.kind() == ErrorKind::TemplateNotFound
          && let Some(near) = diagnostics::similar_template(name, &known, &suffix)
        {
          ui::detail(&format!("did you mean {near}?"));
        }
      }
    }
  }

  ui::blank();
  let elapsed = ui::format_duration(started.elapsed());
  if failed > 0 {
    bail!("{failed} of {} templates failed to compile", targets.len());
  }
  ui::ok(&format!("{} templates compiled in {elapsed}", targets.len()));
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::SugarConfig;

  fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, Project) {
    let tmp = tempfile::tempdir().unwrap();
    for (name, source) in files {
      let path = tmp.path().join("templates").join(name);
      std::fs::create_dir_all(path.parent().unwrap()).unwrap();
      std::fs::write(path, source).unwrap();
    }
    let project = Project::new(&tmp.path().join("sugar.toml"), SugarConfig::default());
    (tmp, project)
  }

  #[test]
  fn all_templates_pass() {
    let (_tmp, project) = project(&[
      ("home.sugar.php", "<s-card title=\"Hi\">body</s-card>"),
      ("components/s-card.sugar.php", "<div><?= $title ?><span s:slot></span></div>"),
    ]);
    run_check(&project, &[]).unwrap();
    assert!(!project.cache_dir().exists());
  }

  #[test]
  fn failures_are_counted() {
    let (_tmp, project) = project(&[
      ("good.sugar.php", "<p>ok</p>"),
      ("bad.sugar.php", "<p s:forech=\"$a as $b\">x</p>"),
    ]);
    let err = run_check(&project, &[]).unwrap_err();
    assert_eq!(err.to_string(), "1 of 2 templates failed to compile");
  }

  #[test]
  fn named_templates_only() {
    let (_tmp, project) = project(&[
      ("good.sugar.php", "<p>ok</p>"),
      ("bad.sugar.php", "<p s:else>x</p>"),
    ]);
    run_check(&project, &["good".to_string()]).unwrap();
    let err = run_check(&project, &["god".to_string()]).unwrap_err();
    assert_eq!(err.to_string(), "1 of 1 templates failed to compile");
  }
}
