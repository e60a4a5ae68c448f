use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by every client operation. Nothing is retried
/// internally and no operation returns a partial result.
#[derive(Debug, Error)]
pub enum Error {
  /// Missing credentials, an incomplete upload policy or a malformed URL.
  /// Raised before any I/O is attempted.
  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("HTTP method {0} is not supported")]
  UnsupportedMethod(String),

  #[error("transport error: {0}")]
  Transport(String),

  #[error("remote returned HTTP {status}")]
  Remote { status: u16, body: String },

  #[error("cannot read {}: {source}", path.display())]
  FileAccess {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot decode response: {0}")]
  Decode(String),

  #[error("operation cancelled")]
  Cancelled,
}

impl Error {
  pub(crate) fn configuration(msg: impl Into<String>) -> Self {
    Error::Configuration(msg.into())
  }

  /// HTTP status carried by a remote failure, if any.
  pub fn status(&self) -> Option<u16> {
    match self {
      Error::Remote { status, .. } => Some(*status),
      _ => None,
    }
  }
}

impl From<reqwest::Error> for Error {
  fn from(err: reqwest::Error) -> Self {
    Error::Transport(err.to_string())
  }
}

impl From<serde_json::Error> for Error {
  fn from(err: serde_json::Error) -> Self {
    Error::Decode(err.to_string())
  }
}

impl From<quick_xml::Error> for Error {
  fn from(err: quick_xml::Error) -> Self {
    Error::Decode(err.to_string())
  }
}

impl From<url::ParseError> for Error {
  fn from(err: url::ParseError) -> Self {
    Error::Configuration(format!("invalid URL: {}", err))
  }
}
