/* src/cli/core/src/compile.rs */

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sugar_compiler::Compiler;

use crate::config::Project;
use crate::diagnostics;
use crate::ui;

/// Compile one template and print the PHP, or write it to `out`.
pub fn run_compile(project: &Project, template: &str, out: Option<&Path>) -> Result<()> {
  let compiler = Compiler::new(project.config.compiler.clone(), Arc::new(project.loader()));
  let compiled = match compiler.compile(template) {
    Ok(compiled) => compiled,
    Err(err) => {
      diagnostics::report(&err);
      anyhow::bail!("failed to compile {template}");
    }
  };
  match out {
    Some(out) => {
      if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
          .with_context(|| format!("failed to create {}", parent.display()))?;
      }
      std::fs::write(out, &compiled.code)
        .with_context(|| format!("failed to write {}", out.display()))?;
      ui::ok(&format!("{}  {} lines", out.display(), compiled.code.lines().count()));
      for dep in compiled.dependencies.iter().skip(1) {
        ui::detail(&format!("uses {dep}"));
      }
    }
    None => std::io::stdout()
      .write_all(compiled.code.as_bytes())
      .context("failed to write to stdout")?,
  }
  Ok(())
}
