/* src/cli/core/src/preview/error.rs */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cms_engine::EngineError;

/// `IntoResponse` for engine errors; the orphan rule keeps the impl here.
pub(crate) struct PreviewError(pub EngineError);

impl PreviewError {
  fn code(&self) -> &str {
    match &self.0 {
      EngineError::Api(e) => e.code(),
      EngineError::StaleTicket(_) => "STALE_PAGE",
      EngineError::UnknownInstance(_) => "NOT_FOUND",
    }
  }
}

impl IntoResponse for PreviewError {
  fn into_response(self) -> Response {
    let status =
      StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match &self.0 {
      EngineError::Api(e) => e.message().to_string(),
      other => other.to_string(),
    };
    let body = serde_json::json!({
      "ok": false,
      "error": {
        "code": self.code(),
        "message": message,
      }
    });
    (status, axum::Json(body)).into_response()
  }
}

impl From<EngineError> for PreviewError {
  fn from(err: EngineError) -> Self {
    Self(err)
  }
}

impl From<cms_api::ApiError> for PreviewError {
  fn from(err: cms_api::ApiError) -> Self {
    Self(err.into())
  }
}
