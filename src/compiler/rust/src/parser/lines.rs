/* src/compiler/rust/src/parser/lines.rs */

/// Byte offsets of every line start, searched instead of rescanning the source
/// for each node position.
pub(crate) struct LineIndex<'a> {
  source: &'a str,
  starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
  pub(crate) fn new(source: &'a str) -> Self {
    let mut starts = vec![0];
    starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
    Self { source, starts }
  }

  /// 1-based line and character column of a byte offset.
  pub(crate) fn locate(&self, offset: usize) -> (usize, usize) {
    let offset = offset.min(self.source.len());
    let line = self.starts.partition_point(|&s| s <= offset);
    let start = self.starts[line - 1];
    let column = self.source.get(start..offset).map_or(offset - start, |s| s.chars().count());
    (line, column + 1)
  }
}
