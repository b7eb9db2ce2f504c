/* src/render/script/rust/src/errors.rs */

use thiserror::Error;

pub type EvalResult<T> = Result<T, ScriptError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
  #[error("syntax error at offset {offset}: {message}")]
  Syntax { offset: usize, message: String },

  #[error("'{0}' is not defined")]
  UndefinedName(String),

  #[error("'{0}' is not a function")]
  NotCallable(String),

  #[error("type error: {0}")]
  Type(String),

  #[error("loop exceeded {0} iterations")]
  LoopLimit(usize),

  #[error("call depth exceeded {0}")]
  RecursionLimit(usize),

  #[error("uncaught {0}")]
  Thrown(String),
}

impl ScriptError {
  pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
    Self::Syntax { offset, message: message.into() }
  }

  pub(crate) fn type_error(message: impl Into<String>) -> Self {
    Self::Type(message.into())
  }
}
