/* src/cli/core/src/diagnostics.rs */

use sugar_compiler::CompileError;
use sugar_compiler::directive::did_you_mean;

use crate::ui::{self, DIM, RESET};

/// Print a compile error with its source snippet and suggestion.
pub fn report(err: &CompileError) {
  ui::fail(&err.to_string());
  if let Some(snippet) = err.snippet() {
    for line in snippet.lines() {
      ui::detail(&format!("{DIM}{line}{RESET}"));
    }
  }
  if let Some(suggestion) = err.suggestion() {
    ui::detail(&format!("did you mean {suggestion}?"));
  }
}

/// Closest known template to a name that failed to resolve.
pub fn similar_template<'a>(name: &str, known: &'a [String], suffix: &str) -> Option<&'a str> {
  let wanted = name.strip_suffix(suffix).unwrap_or(name);
  let stems: Vec<&str> = known.iter().map(|t| t.strip_suffix(suffix).unwrap_or(t)).collect();
  let stem = did_you_mean(wanted, &stems, &[])?;
  known.iter().map(String::as_str).find(|t| t.strip_suffix(suffix).unwrap_or(t) == stem)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn suggests_near_template_names() {
    let known = vec!["pages/home.sugar.php".to_string(), "pages/about.sugar.php".to_string()];
    assert_eq!(similar_template("pages/hom", &known, ".sugar.php"), Some("pages/home.sugar.php"));
    assert_eq!(
      similar_template("pages/abut.sugar.php", &known, ".sugar.php"),
      Some("pages/about.sugar.php")
    );
    assert_eq!(similar_template("layouts/base", &known, ".sugar.php"), None);
  }
}
