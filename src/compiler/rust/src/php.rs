/* src/compiler/rust/src/php.rs */

// Lexical helpers over opaque PHP snippets. Expressions are never parsed,
// only scanned for top-level separators outside strings and brackets.

use std::sync::LazyLock;

use regex::Regex;

/// One `use` import: optional `function`/`const`, a qualified name, then a
/// group `{...}`, an alias, or a comma-separated list of further names.
static USE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"(?s)^use\s+(?:function\s+|const\s+)?\\?[A-Za-z_]\w*(?:\\[A-Za-z_]\w*)*(?:\\\{[^{}]*\}|\s+as\s+[A-Za-z_]\w*)?(?:\s*,\s*\\?[A-Za-z_]\w*(?:\\[A-Za-z_]\w*)*(?:\s+as\s+[A-Za-z_]\w*)?)*$",
  )
  .expect("use statement pattern")
});

/// Byte offset of the `?>` that ends a PHP block starting at `code[0]`.
/// `?>` inside string literals and `/* */` comments does not count; inside
/// `//` and `#` comments it still closes the block.
pub fn find_close_tag(code: &str) -> Option<usize> {
  let bytes = code.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'\'' | b'"' | b'`' => i = skip_string(bytes, i),
      b'/' if bytes.get(i + 1) == Some(&b'*') => {
        i = code[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
      }
      b'?' if bytes.get(i + 1) == Some(&b'>') => return Some(i),
      _ => i += 1,
    }
  }
  None
}

/// Index just past the string literal opening at `start`.
fn skip_string(bytes: &[u8], start: usize) -> usize {
  let quote = bytes[start];
  let mut i = start + 1;
  while i < bytes.len() {
    if bytes[i] == b'\\' {
      i += 2;
      continue;
    }
    if bytes[i] == quote {
      return i + 1;
    }
    i += 1;
  }
  bytes.len()
}

/// Offsets of `needle` occurring at bracket depth zero outside string literals.
pub fn top_level_positions(s: &str, needle: &str) -> Vec<usize> {
  let bytes = s.as_bytes();
  let mut found = Vec::new();
  let mut depth = 0usize;
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'\'' | b'"' => {
        i = skip_string(bytes, i);
        continue;
      }
      b'(' | b'[' | b'{' => depth += 1,
      b')' | b']' | b'}' => depth = depth.saturating_sub(1),
      _ => {}
    }
    if depth == 0 && s[i..].starts_with(needle) {
      found.push(i);
      i += needle.len();
      continue;
    }
    i += 1;
  }
  found
}

pub fn split_top_level(s: &str, sep: &str) -> Vec<String> {
  let mut parts = Vec::new();
  let mut last = 0;
  for pos in top_level_positions(s, sep) {
    parts.push(s[last..pos].trim().to_string());
    last = pos + sep.len();
  }
  parts.push(s[last..].trim().to_string());
  parts
}

/// `$items |> array_filter(...) |> count(...)` -> base and stages.
pub fn split_pipes(expr: &str) -> (String, Vec<String>) {
  let mut parts = split_top_level(expr, "|>").into_iter();
  let base = parts.next().unwrap_or_default();
  (base, parts.filter(|p| !p.is_empty()).collect())
}

/// Feed `value` into one pipe stage. A `...` placeholder receives the value,
/// a bare callable is called with it.
pub fn apply_pipe(stage: &str, value: &str) -> String {
  if let Some(pos) = top_level_placeholder(stage) {
    return format!("{}{value}{}", &stage[..pos], &stage[pos + 3..]);
  }
  if stage.starts_with('$') || stage.starts_with('(') {
    return format!("({stage})({value})");
  }
  format!("{stage}({value})")
}

fn top_level_placeholder(stage: &str) -> Option<usize> {
  let bytes = stage.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'\'' | b'"' => {
        i = skip_string(bytes, i);
        continue;
      }
      b'.' if stage[i..].starts_with("...") => return Some(i),
      _ => {}
    }
    i += 1;
  }
  None
}

/// Pipe stages that change escaping policy instead of producing a call.
pub fn is_pipe_modifier(stage: &str, name: &str) -> bool {
  let compact: String = stage.chars().filter(|c| !c.is_whitespace()).collect();
  compact == format!("{name}()") || compact == name
}

/// Result of folding pipe stages into one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeChain {
  pub expression: String,
  /// A `raw()` stage was present.
  pub raw: bool,
  /// A `json()` stage was present.
  pub json: bool,
}

/// Apply `stages` left to right; `raw()` and `json()` stages set flags.
pub fn chain_pipes(base: &str, stages: &[String]) -> PipeChain {
  let mut chain = PipeChain { expression: base.to_string(), raw: false, json: false };
  for stage in stages {
    if is_pipe_modifier(stage, "raw") {
      chain.raw = true;
    } else if is_pipe_modifier(stage, "json") {
      chain.json = true;
    } else {
      chain.expression = apply_pipe(stage, &chain.expression);
    }
  }
  chain
}

/// `foreach` style `SUBJECT as BINDING`, split at the first top-level ` as `.
pub fn split_as(expr: &str) -> Option<(String, String)> {
  let pos = top_level_positions(expr, " as ").into_iter().next()?;
  let subject = expr[..pos].trim();
  let binding = expr[pos + 4..].trim();
  if subject.is_empty() || binding.is_empty() {
    return None;
  }
  Some((subject.to_string(), binding.to_string()))
}

/// Content of a plain single-quoted literal such as `'a\'b'`.
pub fn single_quoted_literal(expr: &str) -> Option<String> {
  let expr = expr.trim();
  let inner = expr.strip_prefix('\'')?.strip_suffix('\'')?;
  let mut out = String::with_capacity(inner.len());
  let mut chars = inner.chars();
  while let Some(c) = chars.next() {
    match c {
      '\\' => match chars.next() {
        Some(next @ ('\'' | '\\')) => out.push(next),
        Some(next) => {
          out.push('\\');
          out.push(next);
        }
        None => return None,
      },
      // An unescaped quote means this was a concatenation, not one literal.
      '\'' => return None,
      other => out.push(other),
    }
  }
  Some(out)
}

/// Decimal integer literal PHP prints back unchanged. Leading zeros (octal
/// in PHP) and values outside `i64` are not literals here.
pub fn integer_literal(expr: &str) -> Option<&str> {
  let expr = expr.trim();
  let digits = expr.strip_prefix('-').unwrap_or(expr);
  let decimal = !digits.is_empty()
    && digits.bytes().all(|b| b.is_ascii_digit())
    && (digits == "0" || !digits.starts_with('0'));
  (decimal && expr.parse::<i64>().is_ok() && expr != "-0").then_some(expr)
}

/// Quote a value as a single-quoted PHP string literal.
pub fn quote(value: &str) -> String {
  format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// `use A\B;` statements when `code` consists of nothing else.
pub fn use_statements(code: &str) -> Option<Vec<String>> {
  let statements: Vec<String> =
    split_top_level(code, ";").into_iter().filter(|s| !s.is_empty()).collect();
  if statements.is_empty() {
    return None;
  }
  statements
    .iter()
    .all(|s| USE_RE.is_match(s))
    .then(|| statements.iter().map(|s| format!("{s};")).collect())
}

/// Plain `$name` variable reference.
pub fn is_variable(expr: &str) -> bool {
  let Some(name) = expr.trim().strip_prefix('$') else {
    return false;
  };
  let mut chars = name.chars();
  chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn close_tag_skips_strings_and_block_comments() {
    assert_eq!(find_close_tag(" echo 1; ?>"), Some(9));
    assert_eq!(find_close_tag(" echo '?>'; ?>"), Some(12));
    assert_eq!(find_close_tag(" /* ?> */ ?>"), Some(10));
    assert_eq!(find_close_tag(" // note ?>"), Some(9));
    assert_eq!(find_close_tag(" echo \"a\\\"?>\"; ?>"), Some(15));
    assert_eq!(find_close_tag(" echo 1;"), None);
  }

  #[test]
  fn pipes_split_at_top_level() {
    let (base, stages) = split_pipes("$name |> trim(...) |> str_replace('|>', '-', ...)");
    assert_eq!(base, "$name");
    assert_eq!(stages, vec!["trim(...)", "str_replace('|>', '-', ...)"]);
  }

  #[test]
  fn pipe_application() {
    assert_eq!(apply_pipe("trim(...)", "$x"), "trim($x)");
    assert_eq!(apply_pipe("str_pad(..., 5)", "$x"), "str_pad($x, 5)");
    assert_eq!(apply_pipe("strtoupper", "$x"), "strtoupper($x)");
    assert_eq!(apply_pipe("$format", "$x"), "($format)($x)");
    assert_eq!(apply_pipe("implode('...', ...)", "$x"), "implode('...', $x)");
  }

  #[test]
  fn modifiers() {
    assert!(is_pipe_modifier("raw()", "raw"));
    assert!(is_pipe_modifier(" raw ( ) ", "raw"));
    assert!(is_pipe_modifier("json", "json"));
    assert!(!is_pipe_modifier("rawurlencode(...)", "raw"));
  }

  #[test]
  fn chained_pipes_collect_modifiers() {
    let stages = vec!["trim(...)".to_string(), "raw()".to_string(), "strtoupper".to_string()];
    let chain = chain_pipes("$name", &stages);
    assert_eq!(chain.expression, "strtoupper(trim($name))");
    assert!(chain.raw);
    assert!(!chain.json);
  }

  #[test]
  fn split_as_binding() {
    assert_eq!(split_as("$items as $item"), Some(("$items".into(), "$item".into())));
    assert_eq!(split_as("$map as $k => $v"), Some(("$map".into(), "$k => $v".into())));
    assert_eq!(split_as("fn(' as ') as $x"), Some(("fn(' as ')".into(), "$x".into())));
    assert_eq!(split_as("$items"), None);
  }

  #[test]
  fn literal_detection() {
    assert_eq!(single_quoted_literal("'a\\'b'").as_deref(), Some("a'b"));
    assert_eq!(single_quoted_literal("'<b>'").as_deref(), Some("<b>"));
    assert_eq!(single_quoted_literal("'a' . 'b'"), None);
    assert_eq!(single_quoted_literal("\"a\""), None);
    assert_eq!(integer_literal("42"), Some("42"));
    assert_eq!(integer_literal("-7"), Some("-7"));
    assert_eq!(integer_literal("4.2"), None);
    assert_eq!(integer_literal("$n"), None);
    assert_eq!(integer_literal("0"), Some("0"));
    assert_eq!(integer_literal("0123"), None);
    assert_eq!(integer_literal("-0"), None);
    assert_eq!(integer_literal("9223372036854775807"), Some("9223372036854775807"));
    assert_eq!(integer_literal("9223372036854775808"), None);
  }

  #[test]
  fn quoting() {
    assert_eq!(quote("it's"), "'it\\'s'");
    assert_eq!(quote("a\\b"), "'a\\\\b'");
  }

  #[test]
  fn use_statement_detection() {
    assert_eq!(
      use_statements(" use App\\Foo; use App\\Bar as Baz; "),
      Some(vec!["use App\\Foo;".to_string(), "use App\\Bar as Baz;".to_string()])
    );
    assert_eq!(use_statements(" use App\\Foo; echo 1; "), None);
    assert_eq!(
      use_statements("use function App\\helper;"),
      Some(vec!["use function App\\helper;".to_string()])
    );
    assert_eq!(
      use_statements("use App\\{Foo, Bar};"),
      Some(vec!["use App\\{Foo, Bar};".to_string()])
    );
    assert_eq!(use_statements("use ($x);"), None);
    assert_eq!(use_statements(" "), None);
  }

  #[test]
  fn variables() {
    assert!(is_variable("$item"));
    assert!(is_variable(" $_x1 "));
    assert!(!is_variable("$item->name"));
    assert!(!is_variable("item"));
  }
}
