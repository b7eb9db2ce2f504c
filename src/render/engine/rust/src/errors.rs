/* src/render/engine/rust/src/errors.rs */

use cms_api::{ApiError, PageId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("page {0} was superseded by a newer selection")]
  StaleTicket(PageId),

  #[error("unknown component instance {0}")]
  UnknownInstance(usize),

  #[error(transparent)]
  Api(#[from] ApiError),
}

impl EngineError {
  /// HTTP status an embedding server should answer with.
  pub fn status(&self) -> u16 {
    match self {
      Self::Api(e) => e.status(),
      Self::StaleTicket(_) => 409,
      Self::UnknownInstance(_) => 404,
    }
  }
}
