/* src/compiler/rust/src/parser/html.rs */

// HTML tree builder. Consumes the token stream chunk by chunk; a start tag
// whose attributes are interrupted by an output token keeps its state
// pending until the following HTML chunk completes it.

use std::collections::HashMap;

use super::lines::LineIndex;
use super::raw::{RawRegion, is_name_byte};
use super::token::{Token, TokenKind};
use crate::ast::{
  AttributeNode, AttributePart, AttributeValue, ComponentNode, ElementNode, FragmentNode, Meta,
  Node, OutputNode, PhpImportNode, RawBodyNode, RawPhpNode, TextNode,
};
use crate::config::CompilerConfig;
use crate::context::scan;
use crate::error::{CompileError, Result};
use crate::php;

const RAWTEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) struct TreeBuilder<'a> {
  config: &'a CompilerConfig,
  claims: &'a HashMap<String, Option<String>>,
  source: &'a str,
  /// Source with raw regions and PHP blocks blanked, used for context scanning.
  view: &'a str,
  lines: &'a LineIndex<'a>,
  regions: &'a [RawRegion],
  next_region: usize,
  stack: Vec<Open>,
  root: Vec<Node>,
  mode: Mode,
  text: String,
  text_start: usize,
  tag: Option<PendingTag>,
  rawtext: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
  Data,
  Comment,
  Tag,
}

struct Open {
  node: Node,
  /// Tag name as written, matched against close tags.
  name: String,
  special: bool,
  offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrState {
  BeforeName,
  Name,
  AfterName,
  BeforeValue,
  Quoted(char),
  Unquoted,
}

struct PendingTag {
  name: String,
  start: usize,
  attributes: Vec<AttributeNode>,
  attr: Option<PendingAttr>,
  state: AttrState,
  /// Whitespace (and `/`) seen since the last attribute.
  spacing: String,
}

struct PendingAttr {
  name: String,
  spacing: String,
  start: usize,
  has_value: bool,
  quote: Option<char>,
  parts: Vec<AttributePart>,
  text: String,
}

impl PendingAttr {
  fn finish(mut self, meta: Meta) -> AttributeNode {
    if !self.text.is_empty() {
      self.parts.push(AttributePart::Text(std::mem::take(&mut self.text)));
    }
    let value = if !self.has_value {
      AttributeValue::Boolean
    } else if self.parts.is_empty() {
      AttributeValue::Static(String::new())
    } else if self.parts.len() == 1 {
      match self.parts.pop() {
        Some(AttributePart::Text(t)) => AttributeValue::Static(t),
        Some(AttributePart::Output(o)) => AttributeValue::Output(o),
        None => AttributeValue::Static(String::new()),
      }
    } else {
      AttributeValue::Parts(self.parts)
    };
    let quote = match value {
      AttributeValue::Boolean => None,
      _ => self.quote,
    };
    AttributeNode { name: self.name, value, quote, spacing: self.spacing, provides: None, meta }
  }
}

impl<'a> TreeBuilder<'a> {
  pub(crate) fn new(
    config: &'a CompilerConfig,
    claims: &'a HashMap<String, Option<String>>,
    source: &'a str,
    view: &'a str,
    lines: &'a LineIndex<'a>,
    regions: &'a [RawRegion],
  ) -> Self {
    Self {
      config,
      claims,
      source,
      view,
      lines,
      regions,
      next_region: 0,
      stack: Vec::new(),
      root: Vec::new(),
      mode: Mode::Data,
      text: String::new(),
      text_start: 0,
      tag: None,
      rawtext: None,
    }
  }

  fn meta(&self, offset: usize) -> Meta {
    let (line, column) = self.lines.locate(offset);
    Meta::at(line, column)
  }

  fn error(&self, offset: usize, msg: impl Into<String>) -> CompileError {
    let (line, column) = self.lines.locate(offset);
    CompileError::syntax(msg).at_position(line, column)
  }

  pub(crate) fn build(mut self, tokens: &[Token]) -> Result<Vec<Node>> {
    for token in tokens {
      match token.kind {
        TokenKind::Html => self.feed_html(&token.text, token.start)?,
        TokenKind::Output => self.feed_output(token)?,
        TokenKind::Code => self.feed_code(token)?,
      }
    }
    self.finish()
  }

  // -- text --

  fn push_text(&mut self, s: &str, offset: usize) {
    if self.text.is_empty() {
      self.text_start = offset;
    }
    self.text.push_str(s);
  }

  fn flush_text(&mut self) {
    if self.text.is_empty() {
      return;
    }
    let content = std::mem::take(&mut self.text);
    let meta = self.meta(self.text_start);
    self.append(Node::Text(TextNode { content, meta }));
  }

  fn append(&mut self, node: Node) {
    match self.stack.last_mut().and_then(|open| open.node.children_mut()) {
      Some(children) => children.push(node),
      None => self.root.push(node),
    }
  }

  // -- tokens --

  fn output_node(&self, token: &Token) -> OutputNode {
    let (expression, pipes) = php::split_pipes(&token.text);
    OutputNode {
      expression,
      escape: true,
      context: Some(scan::scan(self.view, token.start)),
      pipes,
      meta: self.meta(token.start),
    }
  }

  fn feed_output(&mut self, token: &Token) -> Result<()> {
    let output = self.output_node(token);
    if self.mode != Mode::Tag {
      self.flush_text();
      self.append(Node::Output(output));
      return Ok(());
    }
    let meta = self.meta(token.start);
    let Some(tag) = self.tag.as_mut() else {
      return Ok(());
    };
    match tag.state {
      AttrState::BeforeName => {
        let spacing = std::mem::take(&mut tag.spacing);
        tag.attributes.push(AttributeNode {
          name: String::new(),
          value: AttributeValue::Output(output),
          quote: None,
          spacing,
          provides: None,
          meta,
        });
      }
      AttrState::Name | AttrState::AfterName => {
        return Err(self.error(token.start, "output is not allowed inside an attribute name"));
      }
      AttrState::BeforeValue | AttrState::Quoted(_) | AttrState::Unquoted => {
        if tag.state == AttrState::BeforeValue {
          tag.state = AttrState::Unquoted;
        }
        if let Some(attr) = tag.attr.as_mut() {
          if !attr.text.is_empty() {
            attr.parts.push(AttributePart::Text(std::mem::take(&mut attr.text)));
          }
          attr.parts.push(AttributePart::Output(output));
        }
      }
    }
    Ok(())
  }

  fn feed_code(&mut self, token: &Token) -> Result<()> {
    if self.mode == Mode::Tag {
      return Err(self.error(token.start, "PHP code blocks are not allowed inside a tag"));
    }
    self.flush_text();
    let meta = self.meta(token.start);
    let code = token.text.trim().to_string();
    if self.stack.is_empty()
      && let Some(statements) = php::use_statements(&code)
    {
      for statement in statements {
        self.append(Node::PhpImport(PhpImportNode { statement, meta: meta.clone() }));
      }
      return Ok(());
    }
    self.append(Node::RawPhp(RawPhpNode { code, meta }));
    Ok(())
  }

  fn feed_html(&mut self, chunk: &str, base: usize) -> Result<()> {
    let bytes = chunk.as_bytes();
    let mut i = 0;
    while i < chunk.len() {
      let abs = base + i;
      let rest = &chunk[i..];
      let Some(ch) = rest.chars().next() else { break };

      match self.mode {
        Mode::Tag => {
          self.feed_tag_char(ch, abs)?;
          i += ch.len_utf8();
        }
        Mode::Comment => {
          if rest.starts_with("-->") {
            self.push_text("-->", abs);
            self.mode = Mode::Data;
            i += 3;
          } else {
            self.push_text(&rest[..ch.len_utf8()], abs);
            i += ch.len_utf8();
          }
        }
        Mode::Data => {
          if let Some(region) = self.regions.get(self.next_region)
            && region.start == abs
          {
            self.flush_text();
            let content = self.source[region.start..region.end].to_string();
            let meta = self.meta(region.start);
            self.append(Node::RawBody(RawBodyNode { content, meta }));
            self.next_region += 1;
            i += region.end - region.start;
            continue;
          }

          if let Some(raw) = self.rawtext.clone() {
            if let Some(consumed) = self.try_close_tag(rest, abs, Some(&raw))? {
              i += consumed;
            } else {
              self.push_text(&rest[..ch.len_utf8()], abs);
              i += ch.len_utf8();
            }
            continue;
          }

          if ch != '<' {
            self.push_text(&rest[..ch.len_utf8()], abs);
            i += ch.len_utf8();
            continue;
          }
          if rest.starts_with("<!--") {
            self.push_text("<!--", abs);
            self.mode = Mode::Comment;
            i += 4;
            continue;
          }
          if rest.starts_with("</") {
            if let Some(consumed) = self.try_close_tag(rest, abs, None)? {
              i += consumed;
            } else {
              self.push_text("<", abs);
              i += 1;
            }
            continue;
          }
          if bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            let mut end = i + 1;
            while end < bytes.len() && is_name_byte(bytes[end]) {
              end += 1;
            }
            self.flush_text();
            self.tag = Some(PendingTag {
              name: chunk[i + 1..end].to_string(),
              start: abs,
              attributes: Vec::new(),
              attr: None,
              state: AttrState::BeforeName,
              spacing: String::new(),
            });
            self.mode = Mode::Tag;
            i = end;
            continue;
          }
          self.push_text("<", abs);
          i += 1;
        }
      }
    }
    Ok(())
  }

  /// Handle `</name ...>` at the start of `rest`. With `only` set (inside
  /// script/style) other close tags are text. Returns consumed bytes.
  fn try_close_tag(&mut self, rest: &str, abs: usize, only: Option<&str>) -> Result<Option<usize>> {
    let Some(after) = rest.strip_prefix("</") else {
      return Ok(None);
    };
    let name_len = after.bytes().take_while(|b| is_name_byte(*b)).count();
    if name_len == 0 {
      return Ok(None);
    }
    let name = &after[..name_len];
    if only.is_some_and(|o| !o.eq_ignore_ascii_case(name)) {
      return Ok(None);
    }
    let Some(gt) = rest.find('>') else {
      return Ok(None);
    };
    let literal = &rest[..=gt];
    self.flush_text();
    self.close_element(name, literal, abs)?;
    Ok(Some(gt + 1))
  }

  fn close_element(&mut self, name: &str, literal: &str, abs: usize) -> Result<()> {
    let matching = self.stack.iter().rposition(|open| {
      if open.special { open.name == name } else { open.name.eq_ignore_ascii_case(name) }
    });
    let Some(idx) = matching else {
      // stray close tag: keep it as text
      self.push_text(literal, abs);
      self.flush_text();
      return Ok(());
    };
    while self.stack.len() > idx + 1 {
      self.close_implicitly(false)?;
    }
    if let Some(open) = self.stack.pop() {
      let mut node = open.node;
      if let Node::Element(el) = &mut node {
        el.closing = Some(literal.to_string());
      }
      if RAWTEXT_ELEMENTS.iter().any(|t| t.eq_ignore_ascii_case(&open.name)) {
        self.rawtext = None;
      }
      self.append(node);
    }
    Ok(())
  }

  /// Pop the innermost open element without a close tag. Special tags may
  /// be closed this way by an enclosing close tag, but not by end of input.
  fn close_implicitly(&mut self, at_end: bool) -> Result<()> {
    let Some(open) = self.stack.pop() else {
      return Ok(());
    };
    if open.special && at_end {
      return Err(self.error(open.offset, format!("unclosed <{}> tag", open.name)));
    }
    let mut node = open.node;
    if let Node::Element(el) = &mut node {
      el.closing = None;
    }
    self.append(node);
    Ok(())
  }

  // -- start tags --

  fn feed_tag_char(&mut self, ch: char, abs: usize) -> Result<()> {
    let Some(tag) = self.tag.as_mut() else {
      self.mode = Mode::Data;
      return Ok(());
    };
    match (tag.state, ch) {
      (AttrState::BeforeName, '>') => return self.finish_tag(),
      (AttrState::BeforeName, c) if c.is_whitespace() || c == '/' => tag.spacing.push(c),
      (AttrState::BeforeName, c) => start_attr(tag, c, abs),

      (AttrState::Name | AttrState::AfterName, '=') => {
        tag.spacing.clear();
        if let Some(attr) = tag.attr.as_mut() {
          attr.has_value = true;
        }
        tag.state = AttrState::BeforeValue;
      }
      (AttrState::Name | AttrState::AfterName, '>') => {
        self.end_attr();
        return self.finish_tag();
      }
      (AttrState::Name | AttrState::AfterName, '/') => {
        self.end_attr();
        self.push_spacing('/');
      }
      (AttrState::Name | AttrState::AfterName, c) if c.is_whitespace() => {
        tag.spacing.push(c);
        tag.state = AttrState::AfterName;
      }
      (AttrState::Name, c) => {
        if let Some(attr) = tag.attr.as_mut() {
          attr.name.push(c);
        }
      }
      (AttrState::AfterName, c) => {
        // whitespace after a valueless attribute, then the next name
        self.end_attr();
        if let Some(tag) = self.tag.as_mut() {
          start_attr(tag, c, abs);
        }
      }

      (AttrState::BeforeValue, '"' | '\'') => {
        if let Some(attr) = tag.attr.as_mut() {
          attr.quote = Some(ch);
        }
        tag.state = AttrState::Quoted(ch);
      }
      (AttrState::BeforeValue, '>') => {
        self.end_attr();
        return self.finish_tag();
      }
      (AttrState::BeforeValue, c) if c.is_whitespace() => {}
      (AttrState::BeforeValue, c) => {
        if let Some(attr) = tag.attr.as_mut() {
          attr.text.push(c);
        }
        tag.state = AttrState::Unquoted;
      }

      (AttrState::Quoted(q), c) if c == q => self.end_attr(),
      (AttrState::Quoted(_), c) => {
        if let Some(attr) = tag.attr.as_mut() {
          attr.text.push(c);
        }
      }

      (AttrState::Unquoted, '>') => {
        self.end_attr();
        return self.finish_tag();
      }
      (AttrState::Unquoted, c) if c.is_whitespace() => {
        self.end_attr();
        self.push_spacing(c);
      }
      (AttrState::Unquoted, c) => {
        if let Some(attr) = tag.attr.as_mut() {
          attr.text.push(c);
        }
      }
    }
    Ok(())
  }

  fn push_spacing(&mut self, c: char) {
    if let Some(tag) = self.tag.as_mut() {
      tag.spacing.push(c);
    }
  }

  fn end_attr(&mut self) {
    let Some(tag) = self.tag.as_mut() else { return };
    tag.state = AttrState::BeforeName;
    let Some(attr) = tag.attr.take() else { return };
    let (line, column) = self.lines.locate(attr.start);
    let node = attr.finish(Meta::at(line, column));
    tag.attributes.push(node);
  }

  fn finish_tag(&mut self) -> Result<()> {
    self.mode = Mode::Data;
    let Some(tag) = self.tag.take() else {
      return Ok(());
    };
    let meta = self.meta(tag.start);
    let explicit_close = tag.spacing.trim_end().ends_with('/');

    let (node, special) = match self.config.special_tag(&tag.name) {
      Some(sub) => (self.special_node(sub, &tag, meta, explicit_close)?, true),
      None => {
        let self_closing = explicit_close || self.config.is_void(&tag.name);
        let node = Node::Element(ElementNode {
          tag: tag.name.clone(),
          attributes: tag.attributes,
          children: Vec::new(),
          self_closing,
          dynamic_tag: None,
          tag_end: tag.spacing,
          closing: None,
          meta,
        });
        (node, false)
      }
    };

    let self_closing = match &node {
      Node::Element(el) => el.self_closing,
      _ => explicit_close,
    };
    if self_closing {
      self.append(node);
      return Ok(());
    }
    if !special && RAWTEXT_ELEMENTS.iter().any(|t| t.eq_ignore_ascii_case(&tag.name)) {
      self.rawtext = Some(tag.name.clone());
    }
    self.stack.push(Open { node, name: tag.name, special, offset: tag.start });
    Ok(())
  }

  /// `<s-template>` fragments, directive elements such as `<s-if condition>`,
  /// and everything else as a component invocation.
  fn special_node(
    &self,
    sub: &str,
    tag: &PendingTag,
    meta: Meta,
    self_closing: bool,
  ) -> Result<Node> {
    let mut attributes = tag.attributes.clone();
    if sub == self.config.fragment_element {
      return Ok(Node::Fragment(FragmentNode {
        attributes,
        children: Vec::new(),
        self_closing,
        meta,
      }));
    }
    if let Some(claim) = self.claims.get(sub) {
      let directive = self.config.directive_attr(sub);
      let value = match claim {
        Some(source_attr) => {
          let Some(pos) = attributes.iter().position(|a| &a.name == source_attr) else {
            return Err(self.error(
              tag.start,
              format!("<{}> requires a \"{source_attr}\" attribute", tag.name),
            ));
          };
          let source = attributes.remove(pos);
          match source.value {
            AttributeValue::Static(v) => AttributeValue::Static(v),
            AttributeValue::Boolean => AttributeValue::Boolean,
            _ => {
              return Err(self.error(
                tag.start,
                format!("\"{source_attr}\" on <{}> must be a plain expression", tag.name),
              ));
            }
          }
        }
        None => AttributeValue::Boolean,
      };
      attributes.insert(0, AttributeNode::new(directive, value).with_meta(meta.clone()));
      return Ok(Node::Fragment(FragmentNode {
        attributes,
        children: Vec::new(),
        self_closing,
        meta,
      }));
    }
    Ok(Node::Component(ComponentNode {
      name: sub.to_string(),
      attributes,
      children: Vec::new(),
      self_closing,
      meta,
    }))
  }

  fn finish(mut self) -> Result<Vec<Node>> {
    if let Some(tag) = &self.tag {
      return Err(self.error(tag.start, format!("unterminated <{}> tag", tag.name)));
    }
    self.flush_text();
    while !self.stack.is_empty() {
      self.close_implicitly(true)?;
    }
    Ok(self.root)
  }
}

fn start_attr(tag: &mut PendingTag, first: char, abs: usize) {
  let spacing = std::mem::take(&mut tag.spacing);
  tag.attr = Some(PendingAttr {
    name: first.to_string(),
    spacing,
    start: abs,
    has_value: false,
    quote: None,
    parts: Vec::new(),
    text: String::new(),
  });
  tag.state = AttrState::Name;
}
