/* src/compiler/rust/src/parser/token.rs */

use super::lines::LineIndex;
use crate::error::{CompileError, Result};
use crate::php;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
  Html,
  /// `<?php ... ?>`
  Code,
  /// `<?= ... ?>`
  Output,
}

#[derive(Debug)]
pub(crate) struct Token {
  pub kind: TokenKind,
  /// Offset of the token in the source, including its opening delimiter.
  pub start: usize,
  pub end: usize,
  /// HTML text, code between the delimiters, or the trimmed expression.
  pub text: String,
}

pub(crate) const CODE_OPEN: &str = "<?php";
pub(crate) const OUTPUT_OPEN: &str = "<?=";
pub(crate) const CLOSE: &str = "?>";

pub(crate) fn tokenize(source: &str, lines: &LineIndex) -> Result<Vec<Token>> {
  let mut tokens = Vec::new();
  let mut pos = 0;
  let mut text_start = 0;

  while let Some(rel) = source[pos..].find("<?") {
    let open = pos + rel;
    let rest = &source[open..];
    let (kind, body_start) = if rest.starts_with(OUTPUT_OPEN) {
      (TokenKind::Output, open + OUTPUT_OPEN.len())
    } else if rest.starts_with(CODE_OPEN)
      && rest[CODE_OPEN.len()..].chars().next().is_none_or(char::is_whitespace)
    {
      (TokenKind::Code, open + CODE_OPEN.len())
    } else {
      // `<?xml` and friends stay literal text
      pos = open + 2;
      continue;
    };

    if open > text_start {
      tokens.push(html(source, text_start, open));
    }

    match php::find_close_tag(&source[body_start..]) {
      Some(close_rel) => {
        let body = &source[body_start..body_start + close_rel];
        let end = body_start + close_rel + CLOSE.len();
        tokens.push(Token { kind, start: open, end, text: token_text(kind, body) });
        pos = end;
      }
      None if kind == TokenKind::Code => {
        // PHP allows omitting the final close tag
        let body = &source[body_start..];
        tokens.push(Token { kind, start: open, end: source.len(), text: body.to_string() });
        pos = source.len();
      }
      None => {
        let (line, column) = lines.locate(open);
        return Err(CompileError::syntax("unterminated <?= output").at_position(line, column));
      }
    }
    text_start = pos;
  }

  if text_start < source.len() {
    tokens.push(html(source, text_start, source.len()));
  }
  Ok(tokens)
}

fn html(source: &str, start: usize, end: usize) -> Token {
  Token { kind: TokenKind::Html, start, end, text: source[start..end].to_string() }
}

fn token_text(kind: TokenKind, body: &str) -> String {
  match kind {
    TokenKind::Output => body.trim().trim_end_matches(';').trim_end().to_string(),
    _ => body.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tokens(source: &str) -> Vec<Token> {
    tokenize(source, &LineIndex::new(source)).unwrap()
  }

  #[test]
  fn tokenize_empty_template() {
    assert!(tokens("").is_empty());
  }

  #[test]
  fn tokenize_plain_html() {
    let t = tokens("<p>hello</p>");
    assert_eq!(t.len(), 1);
    assert!(matches!(&t[0], Token { kind: TokenKind::Html, text, .. } if text == "<p>hello</p>"));
  }

  #[test]
  fn tokenize_output_between_text() {
    let t = tokens("<p><?= $name; ?></p>");
    assert_eq!(t.len(), 3);
    assert_eq!(t[1].kind, TokenKind::Output);
    assert_eq!(t[1].text, "$name");
    assert_eq!((t[1].start, t[1].end), (3, 16));
    assert_eq!(t[2].text, "</p>");
  }

  #[test]
  fn tokenize_code_block_keeps_body() {
    let t = tokens("<?php $a = '?>'; ?>\nafter");
    assert_eq!(t[0].kind, TokenKind::Code);
    assert_eq!(t[0].text, " $a = '?>'; ");
    // newline after the close tag stays in the text
    assert_eq!(t[1].text, "\nafter");
  }

  #[test]
  fn tokenize_xml_declaration_is_text() {
    let t = tokens("<?xml version=\"1.0\"?><root/>");
    assert_eq!(t.len(), 1);
    assert_eq!(t[0].kind, TokenKind::Html);
  }

  #[test]
  fn tokenize_unclosed_code_runs_to_end() {
    let t = tokens("a<?php echo 1;");
    assert_eq!(t.len(), 2);
    assert_eq!(t[1].kind, TokenKind::Code);
    assert_eq!(t[1].end, 14);
  }

  #[test]
  fn tokenize_unclosed_output_is_error() {
    let src = "x\n<?= $a";
    let err = tokenize(src, &LineIndex::new(src)).unwrap_err();
    assert_eq!(err.line(), Some(2));
    assert_eq!(err.column(), Some(1));
  }

  #[test]
  fn tokenize_adjacent_outputs() {
    let t = tokens("<?= $a ?><?= $b ?>");
    assert_eq!(t.len(), 2);
    assert!(t.iter().all(|t| t.kind == TokenKind::Output));
  }
}
