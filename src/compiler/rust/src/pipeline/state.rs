/* src/compiler/rust/src/pipeline/state.rs */

/// Per-compile state shared by every pass, including the sub-pipelines run
/// for components, so generated variable names never collide.
#[derive(Debug, Default)]
pub struct CompileState {
  pub template: Option<String>,
  /// Templates being resolved, outermost first; used for cycle detection.
  pub chain: Vec<String>,
  dependencies: Vec<String>,
  counter: usize,
}

impl CompileState {
  pub fn new(template: Option<&str>) -> Self {
    Self {
      template: template.map(str::to_string),
      chain: template.map(|t| vec![t.to_string()]).unwrap_or_default(),
      dependencies: Vec::new(),
      counter: 0,
    }
  }

  pub fn next_id(&mut self) -> usize {
    self.counter += 1;
    self.counter
  }

  /// Fresh PHP variable such as `$__loop_3`.
  pub fn var(&mut self, stem: &str) -> String {
    format!("$__{stem}_{}", self.next_id())
  }

  pub fn add_dependency(&mut self, path: &str) {
    if !self.dependencies.iter().any(|d| d == path) {
      self.dependencies.push(path.to_string());
    }
  }

  pub fn dependencies(&self) -> &[String] {
    &self.dependencies
  }

  pub fn into_dependencies(self) -> Vec<String> {
    self.dependencies
  }

  /// Error message listing the chain when `path` is already being resolved.
  pub fn cycle_with(&self, path: &str) -> Option<String> {
    self.chain.iter().any(|p| p == path).then(|| {
      let mut steps = self.chain.clone();
      steps.push(path.to_string());
      format!("Circular template reference detected: {}", steps.join(" -> "))
    })
  }
}
