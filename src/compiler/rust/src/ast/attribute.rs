/* src/compiler/rust/src/ast/attribute.rs */

use super::{Meta, OutputNode};

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
  Static(String),
  Output(OutputNode),
  /// Interpolated value such as `class="card <?= $extra ?>"`.
  Parts(Vec<AttributePart>),
  /// Valueless attribute (`disabled`, `s:else`).
  Boolean,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributePart {
  Text(String),
  Output(OutputNode),
}

impl AttributeValue {
  pub fn as_static(&self) -> Option<&str> {
    match self {
      Self::Static(s) => Some(s),
      _ => None,
    }
  }

  pub fn is_dynamic(&self) -> bool {
    match self {
      Self::Output(_) => true,
      Self::Parts(parts) => parts.iter().any(|p| matches!(p, AttributePart::Output(_))),
      Self::Static(_) | Self::Boolean => false,
    }
  }

  pub fn outputs_mut(&mut self) -> Vec<&mut OutputNode> {
    match self {
      Self::Output(o) => vec![o],
      Self::Parts(parts) => parts
        .iter_mut()
        .filter_map(|p| match p {
          AttributePart::Output(o) => Some(o),
          AttributePart::Text(_) => None,
        })
        .collect(),
      Self::Static(_) | Self::Boolean => Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeNode {
  /// Empty for an output written directly inside a tag (`<div <?= $attrs ?>>`)
  /// and for attribute strings produced by spread and boolean directives.
  pub name: String,
  pub value: AttributeValue,
  pub quote: Option<char>,
  /// Whitespace written before the attribute name.
  pub spacing: String,
  /// Name a guarded attribute string renders, when a directive knows it.
  pub provides: Option<String>,
  pub meta: Meta,
}

impl AttributeNode {
  pub fn new(name: impl Into<String>, value: AttributeValue) -> Self {
    let quote = match value {
      AttributeValue::Boolean => None,
      _ => Some('"'),
    };
    Self {
      name: name.into(),
      value,
      quote,
      spacing: " ".to_string(),
      provides: None,
      meta: Meta::default(),
    }
  }

  pub fn with_meta(mut self, meta: Meta) -> Self {
    self.meta = meta;
    self
  }

  /// Attribute string computed at render time, printed only when non-empty.
  pub fn guarded(output: OutputNode) -> Self {
    let meta = output.meta.clone();
    Self {
      name: String::new(),
      value: AttributeValue::Output(output),
      quote: None,
      spacing: String::new(),
      provides: None,
      meta,
    }
  }

  pub fn providing(mut self, name: impl Into<String>) -> Self {
    self.provides = Some(name.into());
    self
  }

  pub fn is_guarded(&self) -> bool {
    self.name.is_empty()
  }

  /// Directive expression text; `None` for valueless attributes.
  pub fn static_value(&self) -> Option<&str> {
    self.value.as_static()
  }
}
