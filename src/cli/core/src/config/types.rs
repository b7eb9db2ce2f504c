/* src/cli/core/src/config/types.rs */

use anyhow::{Result, bail};
use cms_api::{ApiConfig, SiteId};
use serde::Deserialize;

/// Contents of `cms.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CmsConfig {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub render: RenderSection,
  #[serde(default)]
  pub serve: ServeSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderSection {
  /// Site used by `cms pages` when `--site` is omitted.
  pub site_id: Option<SiteId>,
  /// Wrap output in a full HTML document (title, meta, injected styles).
  /// `false` emits the rendered body only.
  #[serde(default = "default_true")]
  pub document: bool,
  /// Fetch and render mounted components before writing output.
  #[serde(default = "default_true")]
  pub resolve_components: bool,
}

impl Default for RenderSection {
  fn default() -> Self {
    Self { site_id: None, document: true, resolve_components: true }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
  /// Memoize page and component fetches across requests. Off by default so
  /// edits in the CMS show up on reload.
  #[serde(default)]
  pub cache: bool,
}

impl Default for ServeSection {
  fn default() -> Self {
    Self { host: default_host(), port: default_port(), cache: false }
  }
}

impl CmsConfig {
  pub fn validate(&self) -> Result<()> {
    self.api.validate()?;
    if self.serve.host.trim().is_empty() {
      bail!("serve.host must not be empty");
    }
    Ok(())
  }
}

fn default_true() -> bool {
  true
}

fn default_host() -> String {
  "127.0.0.1".to_string()
}

fn default_port() -> u16 {
  4000
}
