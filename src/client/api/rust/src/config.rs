/* src/client/api/rust/src/config.rs */

use serde::Deserialize;

use crate::errors::ApiError;

/// `[api]` section of `cms.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self { base_url: default_base_url(), timeout_secs: default_timeout_secs() }
  }
}

impl ApiConfig {
  pub fn with_base_url(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into(), ..Self::default() }
  }

  pub fn validate(&self) -> Result<(), ApiError> {
    if self.base_url.trim().is_empty() {
      return Err(ApiError::invalid_config("api.base_url must not be empty"));
    }
    if self.timeout_secs == 0 {
      return Err(ApiError::invalid_config("api.timeout_secs must be greater than zero"));
    }
    Ok(())
  }
}

fn default_base_url() -> String {
  "http://localhost:5000".to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let config = ApiConfig::default();
    assert_eq!(config.base_url, "http://localhost:5000");
    assert_eq!(config.timeout_secs, 10);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn rejects_empty_base_url() {
    let config = ApiConfig::with_base_url("  ");
    let err = config.validate().unwrap_err();
    assert_eq!(err.code(), "INVALID_CONFIG");
  }

  #[test]
  fn rejects_zero_timeout() {
    let config = ApiConfig { timeout_secs: 0, ..ApiConfig::default() };
    assert!(config.validate().is_err());
  }
}
