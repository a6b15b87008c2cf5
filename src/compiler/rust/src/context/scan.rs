/* src/compiler/rust/src/context/scan.rs */

use crate::ast::OutputContext;

/// Attributes whose values are URLs.
pub const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "data", "poster"];

/// Context for an output inside the value of attribute `name`.
pub fn attribute_context(name: &str) -> OutputContext {
  let lower = name.to_ascii_lowercase();
  if URL_ATTRIBUTES.contains(&lower.as_str()) {
    OutputContext::Url
  } else if lower.len() > 2 && lower.starts_with("on") {
    OutputContext::JavaScript
  } else {
    OutputContext::HtmlAttribute
  }
}

/// Classify the position `offset` of `html` by looking backwards: unclosed
/// `<script>`, unclosed `<style>`, inside an attribute value, inside an open
/// tag, otherwise body text. Code blocks must already be blanked out of `html`.
pub fn scan(html: &str, offset: usize) -> OutputContext {
  let mut end = offset.min(html.len());
  while !html.is_char_boundary(end) {
    end -= 1;
  }
  let before = &html[..end];
  let lower = before.to_ascii_lowercase();

  if inside_element(&lower, "script") {
    return OutputContext::JavaScript;
  }
  if inside_element(&lower, "style") {
    return OutputContext::Css;
  }
  match open_tag_start(before) {
    Some(start) => tag_context(&before[start..]),
    None => OutputContext::Html,
  }
}

/// True when the last `<name` start tag is complete and not yet closed.
fn inside_element(lower: &str, name: &str) -> bool {
  let open_pat = format!("<{name}");
  let close_pat = format!("</{name}");
  let Some(open) = rfind_tag(lower, &open_pat) else {
    return false;
  };
  if rfind_tag(lower, &close_pat).is_some_and(|close| close > open) {
    return false;
  }
  open_tag_end(&lower[open..]).is_some()
}

fn rfind_tag(haystack: &str, pat: &str) -> Option<usize> {
  let mut search = haystack.len();
  while let Some(pos) = haystack[..search].rfind(pat) {
    let next = haystack.as_bytes().get(pos + pat.len());
    if next.is_none_or(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/') {
      return Some(pos);
    }
    search = pos;
  }
  None
}

/// Offset of the last `<letter` whose tag has not been closed by `>`.
fn open_tag_start(before: &str) -> Option<usize> {
  let bytes = before.as_bytes();
  let mut search = before.len();
  while let Some(pos) = before[..search].rfind('<') {
    if bytes.get(pos + 1).is_some_and(u8::is_ascii_alphabetic) {
      return open_tag_end(&before[pos..]).is_none().then_some(pos);
    }
    search = pos;
  }
  None
}

/// Offset of the `>` ending the tag that starts `tag`, honouring quotes.
fn open_tag_end(tag: &str) -> Option<usize> {
  let mut quote = None;
  for (i, ch) in tag.char_indices() {
    match (quote, ch) {
      (Some(q), c) if c == q => quote = None,
      (Some(_), _) => {}
      (None, '"' | '\'') => quote = Some(ch),
      (None, '>') => return Some(i),
      _ => {}
    }
  }
  None
}

fn tag_context(tag: &str) -> OutputContext {
  let mut quote = None;
  let mut quote_start = 0;
  for (i, ch) in tag.char_indices() {
    match (quote, ch) {
      (Some(q), c) if c == q => quote = None,
      (Some(_), _) => {}
      (None, '"' | '\'') => {
        quote = Some(ch);
        quote_start = i;
      }
      _ => {}
    }
  }
  if quote.is_some() {
    return attribute_name_before(&tag[..quote_start])
      .map_or(OutputContext::HtmlAttribute, attribute_context);
  }
  // unquoted value: `name=` directly before the output
  if tag.trim_end().ends_with('=') {
    return attribute_name_before(tag).map_or(OutputContext::HtmlAttribute, attribute_context);
  }
  OutputContext::HtmlAttribute
}

/// Name of the attribute whose `=` ends `prefix`.
fn attribute_name_before(prefix: &str) -> Option<&str> {
  let prefix = prefix.trim_end().strip_suffix('=')?.trim_end();
  let start = prefix.rfind(|c: char| c.is_whitespace()).map_or(0, |i| i + 1);
  let name = &prefix[start..];
  (!name.is_empty() && !name.starts_with('<')).then_some(name)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at_end(html: &str) -> OutputContext {
    scan(html, html.len())
  }

  #[test]
  fn body_text() {
    assert_eq!(at_end("<p>Hello "), OutputContext::Html);
    assert_eq!(at_end(""), OutputContext::Html);
    assert_eq!(at_end("<p title=\"a\">x</p> "), OutputContext::Html);
  }

  #[test]
  fn script_and_style() {
    assert_eq!(at_end("<script>var x = "), OutputContext::JavaScript);
    assert_eq!(at_end("<script type=\"module\">let a = "), OutputContext::JavaScript);
    assert_eq!(at_end("<script></script><p>"), OutputContext::Html);
    assert_eq!(at_end("<style>.a { color: "), OutputContext::Css);
    assert_eq!(at_end("<STYLE>body{"), OutputContext::Css);
  }

  #[test]
  fn script_tag_attribute_is_not_script_body() {
    assert_eq!(at_end("<script src=\""), OutputContext::Url);
  }

  #[test]
  fn attribute_values() {
    assert_eq!(at_end("<a href=\""), OutputContext::Url);
    assert_eq!(at_end("<img alt=\"x\" src='/img/"), OutputContext::Url);
    assert_eq!(at_end("<button onclick=\"go("), OutputContext::JavaScript);
    assert_eq!(at_end("<div title=\"Hello "), OutputContext::HtmlAttribute);
    assert_eq!(at_end("<form action="), OutputContext::Url);
  }

  #[test]
  fn inside_tag_outside_values() {
    assert_eq!(at_end("<div "), OutputContext::HtmlAttribute);
    assert_eq!(at_end("<div class=\"a\" "), OutputContext::HtmlAttribute);
  }

  #[test]
  fn gt_inside_quotes_does_not_close_tag() {
    assert_eq!(at_end("<div title=\"a>b\" data-x=\""), OutputContext::HtmlAttribute);
  }

  #[test]
  fn priority_script_over_attribute() {
    assert_eq!(at_end("<script>var s = \"<a href=\""), OutputContext::JavaScript);
  }

  #[test]
  fn attribute_name_classes() {
    assert_eq!(attribute_context("HREF"), OutputContext::Url);
    assert_eq!(attribute_context("poster"), OutputContext::Url);
    assert_eq!(attribute_context("onload"), OutputContext::JavaScript);
    assert_eq!(attribute_context("on"), OutputContext::HtmlAttribute);
    assert_eq!(attribute_context("data-url"), OutputContext::HtmlAttribute);
  }
}
