/* src/cli/core/src/config/loader.rs */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::CmsConfig;

pub const CONFIG_FILE: &str = "cms.toml";

/// Walk upward from `start` to find `cms.toml`, like Cargo.toml discovery
pub fn find_cms_config(start: &Path) -> Result<PathBuf> {
  let mut dir =
    start.canonicalize().with_context(|| format!("failed to canonicalize {}", start.display()))?;
  loop {
    let candidate = dir.join(CONFIG_FILE);
    if candidate.is_file() {
      return Ok(candidate);
    }
    if !dir.pop() {
      bail!("{CONFIG_FILE} not found (searched upward from {})", start.display());
    }
  }
}

pub fn load_cms_config(path: &Path) -> Result<CmsConfig> {
  let content =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  let config: CmsConfig =
    toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
  config.validate().with_context(|| format!("invalid {}", path.display()))?;
  Ok(config)
}

/// An explicit path must exist and parse. Without one, search upward from
/// `cwd` and fall back to defaults when nothing is found.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<(Option<PathBuf>, CmsConfig)> {
  if let Some(path) = explicit {
    let config = load_cms_config(path)?;
    return Ok((Some(path.to_path_buf()), config));
  }
  match find_cms_config(cwd) {
    Ok(path) => {
      let config = load_cms_config(&path)?;
      Ok((Some(path), config))
    }
    Err(_) => Ok((None, CmsConfig::default())),
  }
}

/// Point the API client at `base_url` (the `--api` flag), keeping the rest
/// of `[api]` from the file.
pub fn apply_api_override(config: &mut CmsConfig, base_url: &str) -> Result<()> {
  config.api.base_url = base_url.trim().to_string();
  config.api.validate().with_context(|| format!("invalid --api value {base_url:?}"))?;
  Ok(())
}
