/* src/compiler/rust/src/lib.rs */

pub mod ast;
pub mod cache;
pub mod codegen;
pub mod compiler;
pub mod composition;
pub mod config;
pub mod context;
pub mod directive;
pub mod engine;
pub mod error;
pub mod escape;
pub mod extension;
pub mod loader;
pub mod parser;
pub mod php;
pub mod pipeline;
pub mod runtime;

// Public API re-exports
pub use cache::{CacheError, CacheMetadata, CachedTemplate, FileCache, TemplateCache};
pub use compiler::{CompiledTemplate, Compiler, CompilerBuilder};
pub use config::{CacheConfig, CompilerConfig, LoaderConfig};
pub use directive::{Directive, DirectiveRegistry, DirectiveType};
pub use engine::{Engine, EngineError};
pub use error::{CompileError, ErrorKind, Result, SourceLocation};
pub use extension::{Extension, PassPriority, PassServices, RegistrationContext, ServiceMap};
pub use loader::{FileTemplateLoader, LoaderError, MemoryTemplateLoader, TemplateLoader};

#[cfg(test)]
mod tests;
