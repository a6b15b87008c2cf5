/* src/compiler/rust/src/parser/raw.rs */

// Raw regions: the content of an element carrying the raw directive is
// blanked out before tokenizing so nothing inside it is interpreted.
// Blanking keeps byte offsets (and newlines) identical to the source.

use super::lines::LineIndex;
use crate::error::{CompileError, Result};
use crate::php;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawRegion {
  pub start: usize,
  pub end: usize,
}

pub(crate) struct Masked {
  pub source: String,
  pub regions: Vec<RawRegion>,
}

pub(crate) fn mask_raw_regions(source: &str, raw_attr: &str, lines: &LineIndex) -> Result<Masked> {
  let mut regions = Vec::new();
  let mut pos = 0;

  while let Some(rel) = source[pos..].find('<') {
    let lt = pos + rel;
    let rest = &source[lt..];
    if rest.starts_with("<!--") {
      pos = rest.find("-->").map_or(source.len(), |p| lt + p + 3);
      continue;
    }
    if rest.starts_with("<?") {
      pos = php::find_close_tag(&rest[2..]).map_or(source.len(), |p| lt + 2 + p + 2);
      continue;
    }
    let Some(open) = scan_open_tag(source, lt) else {
      pos = lt + 1;
      continue;
    };
    if open.self_closing || !has_attribute(&source[open.attrs_start..open.end - 1], raw_attr) {
      pos = open.end;
      continue;
    }
    let Some((content_end, after_close)) = find_matching_close(source, open.end, &open.name) else {
      let (line, column) = lines.locate(lt);
      return Err(
        CompileError::syntax(format!("unclosed <{}> carrying {raw_attr}", open.name))
          .at_position(line, column),
      );
    };
    regions.push(RawRegion { start: open.end, end: content_end });
    pos = after_close;
  }

  let mut masked = String::with_capacity(source.len());
  let mut last = 0;
  for region in &regions {
    masked.push_str(&source[last..region.start]);
    for ch in source[region.start..region.end].chars() {
      if ch == '\n' {
        masked.push('\n');
      } else {
        masked.extend(std::iter::repeat_n(' ', ch.len_utf8()));
      }
    }
    last = region.end;
  }
  masked.push_str(&source[last..]);

  Ok(Masked { source: masked, regions })
}

struct OpenTag {
  name: String,
  attrs_start: usize,
  /// Offset just past `>`.
  end: usize,
  self_closing: bool,
}

fn scan_open_tag(source: &str, lt: usize) -> Option<OpenTag> {
  let bytes = source.as_bytes();
  let mut i = lt + 1;
  if !bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
    return None;
  }
  while i < bytes.len() && is_name_byte(bytes[i]) {
    i += 1;
  }
  let name = source[lt + 1..i].to_string();
  let attrs_start = i;
  while i < bytes.len() {
    match bytes[i] {
      b'"' | b'\'' => {
        let quote = bytes[i];
        i = source[i + 1..].find(quote as char).map_or(bytes.len(), |p| i + 1 + p + 1);
      }
      b'<' if bytes.get(i + 1) == Some(&b'?') => {
        i = php::find_close_tag(&source[i + 2..]).map_or(bytes.len(), |p| i + 2 + p + 2);
      }
      b'>' => {
        let self_closing = i > attrs_start && bytes[i - 1] == b'/';
        return Some(OpenTag { name, attrs_start, end: i + 1, self_closing });
      }
      _ => i += 1,
    }
  }
  None
}

pub(crate) fn is_name_byte(b: u8) -> bool {
  b.is_ascii_alphanumeric() || matches!(b, b'-' | b':' | b'_' | b'.')
}

fn has_attribute(attrs: &str, wanted: &str) -> bool {
  let bytes = attrs.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i].is_ascii_whitespace() || bytes[i] == b'/' {
      i += 1;
      continue;
    }
    let start = i;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'/') {
      i += 1;
    }
    if &attrs[start..i] == wanted {
      return true;
    }
    if i < bytes.len() && bytes[i] == b'=' {
      i += 1;
      if i < bytes.len() && matches!(bytes[i], b'"' | b'\'') {
        let quote = bytes[i] as char;
        i = attrs[i + 1..].find(quote).map_or(bytes.len(), |p| i + 1 + p + 1);
      } else {
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
          i += 1;
        }
      }
    }
  }
  false
}

/// Returns (offset of the matching `</name`, offset past its `>`).
fn find_matching_close(source: &str, from: usize, name: &str) -> Option<(usize, usize)> {
  let mut depth = 1usize;
  let mut pos = from;
  while let Some(rel) = source[pos..].find('<') {
    let lt = pos + rel;
    let rest = &source[lt..];
    if let Some(after) = rest.strip_prefix("</")
      && starts_with_tag_name(after, name)
    {
      depth -= 1;
      let gt = rest.find('>').map_or(source.len(), |p| lt + p + 1);
      if depth == 0 {
        return Some((lt, gt));
      }
      pos = gt;
      continue;
    }
    if starts_with_tag_name(&rest[1..], name)
      && let Some(open) = scan_open_tag(source, lt)
    {
      if !open.self_closing {
        depth += 1;
      }
      pos = open.end;
      continue;
    }
    pos = lt + 1;
  }
  None
}

fn starts_with_tag_name(s: &str, name: &str) -> bool {
  s.len() >= name.len()
    && s.is_char_boundary(name.len())
    && s[..name.len()].eq_ignore_ascii_case(name)
    && !s.as_bytes().get(name.len()).is_some_and(|b| is_name_byte(*b))
}
