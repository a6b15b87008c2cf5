/* src/compiler/rust/src/runtime.rs */

// Names of the PHP runtime pieces generated code depends on. The PHP
// package ships them; the compiler only references them.

use crate::ast::OutputContext;
use crate::php;

pub const ATTRIBUTE_HELPER: &str = "\\Sugar\\Runtime\\HtmlAttributeHelper";
pub const TAG_HELPER: &str = "\\Sugar\\Runtime\\HtmlTagHelper";
/// Constructed as `new LoopMetadata($iterable, $parent)`; `next()` is called
/// at the top of every iteration.
pub const LOOP_METADATA: &str = "\\Sugar\\Runtime\\LoopMetadata";
pub const RUNTIME_ENVIRONMENT: &str = "\\Sugar\\Runtime\\RuntimeEnvironment";
pub const RUNTIME_EXCEPTION: &str = "\\Sugar\\Exception\\TemplateRuntimeException";

/// Reserved service id of the component renderer.
pub const COMPONENT_RENDERER_SERVICE: &str = "renderer.component";

/// Variable holding the loop metadata inside `foreach`/`forelse` bodies.
pub const LOOP_VARIABLE: &str = "$loop";
/// Variable holding captured slot content inside a component body.
pub const SLOTS_VARIABLE: &str = "$__slots";
pub const DEFAULT_SLOT: &str = "slot";

/// `Escaper::html(...)`-style call for a context, `None` for raw output.
pub fn escape_call(escaper: &str, context: OutputContext, value: &str) -> Option<String> {
  match context {
    OutputContext::Raw => None,
    ctx => Some(format!("{escaper}::{}({value})", ctx.as_str())),
  }
}

pub fn json_call(escaper: &str, value: &str) -> String {
  format!("{escaper}::json({value})")
}

pub fn class_names(list: &str) -> String {
  format!("{ATTRIBUTE_HELPER}::classNames({list})")
}

pub fn spread_attrs(source: &str, excluded: &[String]) -> String {
  let excluded: Vec<String> = excluded.iter().map(|n| php::quote(n)).collect();
  format!("{ATTRIBUTE_HELPER}::spreadAttrs({source}, [{}])", excluded.join(", "))
}

pub fn validate_tag(expr: &str) -> String {
  format!("{TAG_HELPER}::validateTagName({expr})")
}

pub fn component_renderer() -> String {
  format!("{RUNTIME_ENVIRONMENT}::requireService('{COMPONENT_RENDERER_SERVICE}')->renderComponent")
}

/// File-scope registration of an extension-bound service.
pub fn provide_service(id: &str, class: &str) -> String {
  format!("{RUNTIME_ENVIRONMENT}::provideService({}, {});", php::quote(id), php::quote(class))
}
