/* src/compiler/rust/src/escape.rs */

// Rust mirror of the runtime escaper. Generated code calls the PHP side;
// these functions fold literal outputs at compile time and must produce
// the same bytes.

use crate::ast::OutputContext;

pub fn escape(context: OutputContext, value: &str) -> String {
  match context {
    OutputContext::Html => html(value),
    OutputContext::HtmlAttribute => attr(value),
    OutputContext::JavaScript => js(value),
    OutputContext::Css => css(value),
    OutputContext::Url => url(value),
    OutputContext::Raw => value.to_string(),
  }
}

pub fn html(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for ch in value.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#039;"),
      _ => out.push(ch),
    }
  }
  out
}

/// HTML escaping plus the characters that can end an unquoted attribute value.
pub fn attr(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for ch in value.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#039;"),
      '`' => out.push_str("&#096;"),
      '=' => out.push_str("&#061;"),
      _ => out.push(ch),
    }
  }
  out
}

/// JSON string literal safe to place anywhere inside `<script>`.
///
/// Matches `json_encode` with the HEX_TAG/AMP/APOS/QUOT flags: markup
/// characters and quotes become `\u00XX`, `/` becomes `\/` and non-ASCII
/// characters are written as `\uXXXX` (surrogate pairs outside the BMP).
pub fn js(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('"');
  for ch in value.chars() {
    match ch {
      '<' => out.push_str("\\u003C"),
      '>' => out.push_str("\\u003E"),
      '&' => out.push_str("\\u0026"),
      '\'' => out.push_str("\\u0027"),
      '"' => out.push_str("\\u0022"),
      '\\' => out.push_str("\\\\"),
      '/' => out.push_str("\\/"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      '\u{08}' => out.push_str("\\b"),
      '\u{0C}' => out.push_str("\\f"),
      c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
      c if (c as u32) > 0x7F => {
        let code = c as u32;
        if code > 0xFFFF {
          let adjusted = code - 0x1_0000;
          let hi = (adjusted >> 10) + 0xD800;
          let lo = (adjusted & 0x3FF) + 0xDC00;
          out.push_str(&format!("\\u{hi:04x}\\u{lo:04x}"));
        } else {
          out.push_str(&format!("\\u{code:04x}"));
        }
      }
      c => out.push(c),
    }
  }
  out.push('"');
  out
}

/// Same encoding as [`js`]; kept separate because the runtime exposes both.
pub fn json(value: &str) -> String {
  js(value)
}

/// Every character other than ASCII alphanumerics becomes `\HEX `.
pub fn css(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for ch in value.chars() {
    if ch.is_ascii_alphanumeric() {
      out.push(ch);
    } else {
      out.push_str(&format!("\\{:X} ", ch as u32));
    }
  }
  out
}

const DANGEROUS_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Neutralise script-capable schemes, percent-encode bytes outside the URL
/// character set, then attribute-escape the result.
pub fn url(value: &str) -> String {
  if has_dangerous_scheme(value) {
    return "about:blank".to_string();
  }
  let mut encoded = String::with_capacity(value.len());
  for byte in value.bytes() {
    if is_url_safe(byte) {
      encoded.push(byte as char);
    } else {
      encoded.push_str(&format!("%{byte:02X}"));
    }
  }
  attr(&encoded)
}

fn has_dangerous_scheme(value: &str) -> bool {
  // Browsers ignore whitespace and control characters inside the scheme.
  let normalized: String = value
    .chars()
    .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
    .take(16)
    .collect::<String>()
    .to_ascii_lowercase();
  DANGEROUS_SCHEMES.iter().any(|scheme| normalized.starts_with(scheme))
}

fn is_url_safe(byte: u8) -> bool {
  byte.is_ascii_alphanumeric() || b"-._~:/?#[]@!$&'()*+,;=%".contains(&byte)
}

/// Tag names accepted for `s:tag`: an ASCII letter followed by letters,
/// digits or hyphens.
pub fn is_valid_tag_name(name: &str) -> bool {
  let mut chars = name.chars();
  chars.next().is_some_and(|c| c.is_ascii_alphabetic())
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
  use super::*;

  const HOSTILE: &str = "<a href=\"x\">'&'</a>";

  #[test]
  fn html_escapes_markup_and_quotes() {
    assert_eq!(html(HOSTILE), "&lt;a href=&quot;x&quot;&gt;&#039;&amp;&#039;&lt;/a&gt;");
    assert_eq!(html("plain text"), "plain text");
  }

  #[test]
  fn attr_also_escapes_backtick_and_equals() {
    assert_eq!(attr("a=`b`"), "a&#061;&#096;b&#096;");
    assert_eq!(attr("\" onmouseover=\"x"), "&quot; onmouseover&#061;&quot;x");
  }

  #[test]
  fn js_cannot_break_out_of_script() {
    let out = js("</script><script>alert('x')</script>");
    assert!(!out.contains('<'));
    assert!(!out.contains('>'));
    assert!(!out.contains('\''));
    assert_eq!(
      out,
      "\"\\u003C\\/script\\u003E\\u003Cscript\\u003Ealert(\\u0027x\\u0027)\\u003C\\/script\\u003E\""
    );
  }

  #[test]
  fn js_quotes_and_controls() {
    assert_eq!(js("a\"b"), "\"a\\u0022b\"");
    assert_eq!(js("a&b"), "\"a\\u0026b\"");
    assert_eq!(js("line\nbreak\\"), "\"line\\nbreak\\\\\"");
    assert_eq!(js("\u{1}"), "\"\\u0001\"");
  }

  #[test]
  fn js_non_ascii_uses_unicode_escapes() {
    assert_eq!(js("é"), "\"\\u00e9\"");
    assert_eq!(js("😀"), "\"\\ud83d\\ude00\"");
  }

  #[test]
  fn css_neutralises_everything_but_alphanumerics() {
    assert_eq!(css("red"), "red");
    assert_eq!(css("red;}"), "red\\3B \\7D ");
    assert_eq!(css("</style>"), "\\3C \\2F style\\3E ");
  }

  #[test]
  fn url_blocks_script_schemes() {
    assert_eq!(url("javascript:alert(1)"), "about:blank");
    assert_eq!(url("  JaVaScRiPt:alert(1)"), "about:blank");
    assert_eq!(url("java\tscript:alert(1)"), "about:blank");
    assert_eq!(url("data:text/html,<b>"), "about:blank");
    assert_eq!(url("vbscript:x"), "about:blank");
  }

  #[test]
  fn url_percent_encodes_and_attr_escapes() {
    assert_eq!(url("/search?q=a b"), "/search?q&#061;a%20b");
    assert_eq!(url("/a\"b<c>"), "/a%22b%3Cc%3E");
    assert_eq!(url("/caf\u{e9}"), "/caf%C3%A9");
    assert_eq!(url("https://example.com/?a=1&b=2"), "https://example.com/?a&#061;1&amp;b&#061;2");
  }

  #[test]
  fn raw_context_is_identity() {
    assert_eq!(escape(OutputContext::Raw, HOSTILE), HOSTILE);
    assert_eq!(escape(OutputContext::Html, HOSTILE), html(HOSTILE));
    assert_eq!(escape(OutputContext::HtmlAttribute, "="), "&#061;");
  }

  #[test]
  fn tag_names() {
    assert!(is_valid_tag_name("h1"));
    assert!(is_valid_tag_name("my-widget"));
    assert!(!is_valid_tag_name("1h"));
    assert!(!is_valid_tag_name("div onclick"));
    assert!(!is_valid_tag_name(""));
  }
}
