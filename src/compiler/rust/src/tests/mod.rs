/* src/compiler/rust/src/tests/mod.rs */

// End-to-end suites: template source in, generated PHP out.

mod composition;
mod properties;

use std::sync::Arc;

use crate::compiler::Compiler;
use crate::config::{CompilerConfig, LoaderConfig};
use crate::error::CompileError;
use crate::loader::MemoryTemplateLoader;

pub(super) const ESC: &str = "\\Sugar\\Escape\\Escaper";

pub(super) fn loader() -> MemoryTemplateLoader {
  MemoryTemplateLoader::new(&LoaderConfig::default())
}

pub(super) fn compiler(loader: MemoryTemplateLoader) -> Compiler {
  Compiler::new(CompilerConfig::default(), Arc::new(loader))
}

/// Template body of a generated file, between the buffering prologue and
/// the catch block.
pub(super) fn body_of(code: &str) -> String {
  let open = "try {\n?>";
  let start = code.find(open).map(|i| i + open.len()).unwrap_or(0);
  let end = code.rfind("<?php\n    } catch").unwrap_or(code.len());
  code[start..end].to_string()
}

pub(super) fn render(source: &str) -> String {
  let compiled = compiler(loader()).compile_source(source, None).unwrap();
  body_of(&compiled.code)
}

pub(super) fn render_page(loader: MemoryTemplateLoader, path: &str) -> String {
  body_of(&compiler(loader).compile(path).unwrap().code)
}

pub(super) fn compile_error(source: &str) -> CompileError {
  compiler(loader()).compile_source(source, None).unwrap_err()
}
