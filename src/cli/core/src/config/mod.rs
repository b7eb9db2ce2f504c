/* src/cli/core/src/config/mod.rs */

mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use loader::{apply_api_override, find_cms_config, load_cms_config, resolve_config};
pub use types::{CmsConfig, RenderSection, ServeSection};
