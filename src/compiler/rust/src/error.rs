/* src/compiler/rust/src/error.rs */

use std::fmt;

use crate::ast::Meta;

/// Compile-time failure categories surfaced at the `compile()` boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Malformed directive, invalid placement, dangling paired directive.
  Syntax,
  /// Unknown `prefix:name` attribute; carries a did-you-mean suggestion when one is close.
  UnknownDirective,
  TemplateNotFound,
  ComponentNotFound,
  /// Generic compile failure, including generated-code validation.
  Compilation,
  /// A node reached a stage with no handler for it. Always a compiler defect.
  UnsupportedNode,
}

impl ErrorKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Syntax => "SyntaxException",
      Self::UnknownDirective => "UnknownDirectiveException",
      Self::TemplateNotFound => "TemplateNotFoundException",
      Self::ComponentNotFound => "ComponentNotFoundException",
      Self::Compilation => "CompilationException",
      Self::UnsupportedNode => "UnsupportedNodeException",
    }
  }

  /// Unknown directives are syntax errors with extra detail.
  pub fn is_syntax(self) -> bool {
    matches!(self, Self::Syntax | Self::UnknownDirective)
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
  pub template: Option<String>,
  pub line: usize,
  pub column: usize,
}

#[derive(Debug, Clone)]
pub struct CompileError {
  kind: ErrorKind,
  message: String,
  location: Option<SourceLocation>,
  suggestion: Option<String>,
  snippet: Option<String>,
}

pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self { kind, message: message.into(), location: None, suggestion: None, snippet: None }
  }

  pub fn syntax(msg: impl Into<String>) -> Self {
    Self::new(ErrorKind::Syntax, msg)
  }

  pub fn unknown_directive(prefix: &str, name: &str, suggestion: Option<&str>) -> Self {
    let mut message = format!("unknown directive \"{prefix}:{name}\"");
    if let Some(s) = suggestion {
      message.push_str(&format!(", did you mean \"{prefix}:{s}\"?"));
    }
    let mut err = Self::new(ErrorKind::UnknownDirective, message);
    err.suggestion = suggestion.map(str::to_string);
    err
  }

  pub fn template_not_found(path: &str) -> Self {
    Self::new(ErrorKind::TemplateNotFound, format!("template \"{path}\" not found"))
  }

  pub fn component_not_found(name: &str) -> Self {
    Self::new(ErrorKind::ComponentNotFound, format!("component \"{name}\" not found"))
  }

  pub fn compilation(msg: impl Into<String>) -> Self {
    Self::new(ErrorKind::Compilation, msg)
  }

  pub fn unsupported_node(node_kind: &str, stage: &str) -> Self {
    Self::new(
      ErrorKind::UnsupportedNode,
      format!("{node_kind} node reached {stage} without a handler"),
    )
  }

  /// Attach the node's position unless a more precise one is already set.
  /// Synthetic nodes (line 0) carry no position.
  pub fn at(mut self, meta: &Meta) -> Self {
    if self.location.is_none() && meta.line > 0 {
      self.location = Some(SourceLocation {
        template: meta.origin.clone(),
        line: meta.line,
        column: meta.column,
      });
    }
    self
  }

  pub fn at_position(mut self, line: usize, column: usize) -> Self {
    if self.location.is_none() {
      self.location = Some(SourceLocation { template: None, line, column });
    }
    self
  }

  /// Fill in the template path for errors raised without an origin.
  pub fn in_template(mut self, path: &str) -> Self {
    match &mut self.location {
      Some(loc) if loc.template.is_none() => loc.template = Some(path.to_string()),
      Some(_) => {}
      None => {
        self.location =
          Some(SourceLocation { template: Some(path.to_string()), line: 0, column: 0 });
      }
    }
    self
  }

  /// Render `context` lines on each side of the failing line with a caret under the column.
  pub fn with_snippet(mut self, source: &str, context: usize) -> Self {
    if let Some(loc) = &self.location
      && loc.line > 0
    {
      self.snippet = render_snippet(source, loc.line, loc.column, context);
    }
    self
  }

  pub fn kind(&self) -> ErrorKind {
    self.kind
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn location(&self) -> Option<&SourceLocation> {
    self.location.as_ref()
  }

  pub fn template(&self) -> Option<&str> {
    self.location.as_ref().and_then(|l| l.template.as_deref())
  }

  pub fn line(&self) -> Option<usize> {
    self.location.as_ref().map(|l| l.line).filter(|l| *l > 0)
  }

  pub fn column(&self) -> Option<usize> {
    self.location.as_ref().map(|l| l.column).filter(|c| *c > 0)
  }

  pub fn suggestion(&self) -> Option<&str> {
    self.suggestion.as_deref()
  }

  pub fn snippet(&self) -> Option<&str> {
    self.snippet.as_deref()
  }
}

fn render_snippet(source: &str, line: usize, column: usize, context: usize) -> Option<String> {
  let lines: Vec<&str> = source.lines().collect();
  if line == 0 || line > lines.len() {
    return None;
  }
  let first = line.saturating_sub(context).max(1);
  let last = (line + context).min(lines.len());
  let width = last.to_string().len();

  let mut out = String::new();
  for n in first..=last {
    let marker = if n == line { ">" } else { " " };
    out.push_str(&format!("{marker} {n:>width$} | {}\n", lines[n - 1]));
    if n == line && column > 0 {
      out.push_str(&format!("  {:>width$} | {}^\n", "", " ".repeat(column - 1)));
    }
  }
  Some(out)
}

impl fmt::Display for CompileError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.kind, self.message)?;
    if let Some(loc) = &self.location {
      match (&loc.template, loc.line > 0) {
        (Some(t), true) => write!(f, " in {t}:{}:{}", loc.line, loc.column)?,
        (Some(t), false) => write!(f, " in {t}")?,
        (None, true) => write!(f, " at {}:{}", loc.line, loc.column)?,
        (None, false) => {}
      }
    }
    Ok(())
  }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_includes_location() {
    let err = CompileError::syntax("dangling s:else")
      .at_position(3, 5)
      .in_template("pages/home.sugar.php");
    assert_eq!(
      err.to_string(),
      "SyntaxException: dangling s:else in pages/home.sugar.php:3:5"
    );
  }

  #[test]
  fn in_template_keeps_existing_origin() {
    let meta = Meta { line: 1, column: 1, origin: Some("partials/a.sugar.php".into()) };
    let err = CompileError::syntax("x").at(&meta).in_template("page.sugar.php");
    assert_eq!(err.template(), Some("partials/a.sugar.php"));
  }

  #[test]
  fn unknown_directive_suggestion() {
    let err = CompileError::unknown_directive("s", "fi", Some("if"));
    assert_eq!(err.kind(), ErrorKind::UnknownDirective);
    assert!(err.kind().is_syntax());
    assert_eq!(err.suggestion(), Some("if"));
    assert!(err.message().contains("did you mean \"s:if\""));
  }

  #[test]
  fn snippet_points_at_column() {
    let source = "<div>\n  <p s:fi=\"$x\">\n</div>\n";
    let err = CompileError::syntax("bad").at_position(2, 6).with_snippet(source, 1);
    let snippet = err.snippet().unwrap();
    assert!(snippet.contains("> 2 |   <p s:fi=\"$x\">"));
    assert!(snippet.contains("|      ^"));
    assert!(snippet.contains("  1 | <div>"));
    assert!(snippet.contains("  3 | </div>"));
  }

  #[test]
  fn snippet_skipped_without_line() {
    let err = CompileError::compilation("boom").with_snippet("a\nb", 2);
    assert!(err.snippet().is_none());
  }

  #[test]
  fn kind_names() {
    assert_eq!(ErrorKind::TemplateNotFound.as_str(), "TemplateNotFoundException");
    assert_eq!(ErrorKind::UnsupportedNode.to_string(), "UnsupportedNodeException");
    assert!(!ErrorKind::Compilation.is_syntax());
  }
}
