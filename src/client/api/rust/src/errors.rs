/* src/client/api/rust/src/errors.rs */

use std::fmt;

#[derive(Debug, Clone)]
pub struct ApiError {
  code: String,
  message: String,
  status: u16,
}

fn default_status(code: &str) -> u16 {
  match code {
    "NOT_FOUND" => 404,
    "TIMEOUT" => 504,
    "NETWORK_ERROR" | "DECODE_ERROR" => 502,
    "INVALID_CONFIG" | "INTERNAL_ERROR" => 500,
    _ => 500,
  }
}

impl ApiError {
  pub fn new(code: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
    Self { code: code.into(), message: message.into(), status }
  }

  pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
    let code = code.into();
    let status = default_status(&code);
    Self { code, message: message.into(), status }
  }

  pub fn not_found(msg: impl Into<String>) -> Self {
    Self::with_code("NOT_FOUND", msg)
  }

  pub fn network(msg: impl Into<String>) -> Self {
    Self::with_code("NETWORK_ERROR", msg)
  }

  pub fn timeout(msg: impl Into<String>) -> Self {
    Self::with_code("TIMEOUT", msg)
  }

  pub fn decode(msg: impl Into<String>) -> Self {
    Self::with_code("DECODE_ERROR", msg)
  }

  pub fn invalid_config(msg: impl Into<String>) -> Self {
    Self::with_code("INVALID_CONFIG", msg)
  }

  pub fn internal(msg: impl Into<String>) -> Self {
    Self::with_code("INTERNAL_ERROR", msg)
  }

  /// Non-success HTTP response. 404 keeps its dedicated code so callers can
  /// treat absence separately from failure.
  pub fn http(status: u16, msg: impl Into<String>) -> Self {
    if status == 404 {
      return Self::new("NOT_FOUND", msg, 404);
    }
    Self::new("HTTP_ERROR", msg, status)
  }

  pub fn code(&self) -> &str {
    &self.code
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn status(&self) -> u16 {
    self.status
  }

  pub fn is_not_found(&self) -> bool {
    self.code == "NOT_FOUND"
  }
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.code, self.message)
  }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::timeout(err.to_string())
    } else if err.is_decode() {
      Self::decode(err.to_string())
    } else if let Some(status) = err.status() {
      Self::http(status.as_u16(), err.to_string())
    } else {
      Self::network(err.to_string())
    }
  }
}
