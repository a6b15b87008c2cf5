/* src/compiler/rust/src/parser/mod.rs */

mod html;
mod lines;
mod raw;
mod token;

use std::collections::HashMap;

use crate::ast::{DocumentNode, Meta};
use crate::config::CompilerConfig;
use crate::error::Result;

use self::html::TreeBuilder;
use self::lines::LineIndex;
use self::token::TokenKind;

/// Template source -> raw AST.
pub struct Parser<'a> {
  config: &'a CompilerConfig,
  /// `<prefix-NAME>` elements that stand for a directive, mapped to the
  /// attribute carrying its expression (`None` for valueless directives).
  claims: HashMap<String, Option<String>>,
}

impl<'a> Parser<'a> {
  pub fn new(config: &'a CompilerConfig) -> Self {
    Self { config, claims: HashMap::new() }
  }

  pub fn with_claims(mut self, claims: HashMap<String, Option<String>>) -> Self {
    self.claims = claims;
    self
  }

  pub fn parse(&self, source: &str) -> Result<DocumentNode> {
    let lines = LineIndex::new(source);
    let raw_attr = self.config.directive_attr("raw");
    let masked = raw::mask_raw_regions(source, &raw_attr, &lines)?;
    let tokens = token::tokenize(&masked.source, &lines)?;
    let view = blank_code(&masked.source, &tokens);

    let builder =
      TreeBuilder::new(self.config, &self.claims, source, &view, &lines, &masked.regions);
    let children = builder.build(&tokens)?;
    log::trace!("parsed {} top-level nodes, {} raw regions", children.len(), masked.regions.len());
    Ok(DocumentNode { children, meta: Meta::at(1, 1) })
  }
}

/// Copy of the source with every PHP block replaced by spaces.
fn blank_code(source: &str, tokens: &[token::Token]) -> String {
  let mut view = String::with_capacity(source.len());
  let mut last = 0;
  for t in tokens.iter().filter(|t| t.kind != TokenKind::Html) {
    view.push_str(&source[last..t.start]);
    view.extend(std::iter::repeat_n(' ', t.end - t.start));
    last = t.end;
  }
  view.push_str(&source[last..]);
  view
}
