//! Error taxonomy for the store and backup layers.

use thiserror::Error;

/// Errors surfaced by the record store and backup layers.
///
/// Not-found on a single-record read is represented as `Ok(None)`, never as
/// an error. Failures propagate to the immediate caller uninterpreted; there
/// is no internal retry.
#[derive(Debug, Error)]
pub enum StoreError {
  /// The engine could not be opened or provisioned.
  #[error("storage unavailable: {0}")]
  Unavailable(String),

  /// A statement or transaction failed and was rolled back.
  #[error("storage operation failed")]
  Storage(#[from] rusqlite::Error),

  /// A record blob could not be encoded or decoded.
  #[error("record serialization failed")]
  Encode(#[from] serde_json::Error),

  /// A backup payload is missing its required array fields or holds records
  /// that do not decode.
  #[error("invalid backup format: {0}")]
  InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
