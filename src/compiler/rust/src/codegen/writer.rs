/* src/compiler/rust/src/codegen/writer.rs */

/// Accumulates template output as inline HTML interleaved with `<?php ?>`
/// blocks, starting in inline-HTML mode.
#[derive(Debug)]
pub(crate) struct PhpWriter {
  out: String,
  /// The last thing written was a generated `?>`.
  after_close: bool,
}

impl PhpWriter {
  pub fn new() -> Self {
    Self { out: String::new(), after_close: true }
  }

  /// Literal output. `<?` is routed through `echo` so the generated file
  /// never opens an unintended PHP block.
  pub fn text(&mut self, text: &str) {
    let mut pieces = text.split("<?");
    if let Some(first) = pieces.next() {
      self.literal(first);
    }
    for piece in pieces {
      self.php("echo '<?';");
      self.literal(piece);
    }
  }

  fn literal(&mut self, text: &str) {
    if text.is_empty() {
      return;
    }
    // PHP drops one newline directly after `?>`.
    if self.after_close {
      if text.starts_with("\r\n") {
        self.out.push_str("\r\n");
      } else if text.starts_with('\n') {
        self.out.push('\n');
      }
    }
    self.out.push_str(text);
    self.after_close = false;
  }

  pub fn php(&mut self, code: &str) {
    self.out.push_str("<?php ");
    self.out.push_str(code);
    self.out.push_str(" ?>");
    self.after_close = true;
  }

  pub fn finish(self) -> String {
    self.out
  }
}
