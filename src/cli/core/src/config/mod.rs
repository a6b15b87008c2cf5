/* src/cli/core/src/config/mod.rs */

mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use loader::{find_sugar_config, load_sugar_config};
pub use types::{Project, SugarConfig};
