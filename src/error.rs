//! Error types for the remote store and cache layers.

use crate::store::types::{EntityType, RecordId};

/// Errors produced by remote store operations.
///
/// All variants carry owned strings so a snapshot can hold a clone of the
/// error that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
  /// Network or remote-service failure.
  #[error("transport error: {message}")]
  Transport { message: String },

  /// The store rejected the payload shape or content.
  #[error("validation rejected: {message}")]
  Validation { message: String },

  /// The operation targeted a nonexistent remote id.
  #[error("not found: {entity}/{id}")]
  NotFound { entity: EntityType, id: RecordId },

  /// The store returned a malformed response.
  #[error("malformed response: {message}")]
  Schema { message: String },
}

impl StoreError {
  pub fn transport(message: impl Into<String>) -> Self {
    Self::Transport {
      message: message.into(),
    }
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation {
      message: message.into(),
    }
  }

  pub fn not_found(entity: &EntityType, id: &RecordId) -> Self {
    Self::NotFound {
      entity: entity.clone(),
      id: id.clone(),
    }
  }

  pub fn schema(message: impl Into<String>) -> Self {
    Self::Schema {
      message: message.into(),
    }
  }

  /// Whether this error means the target record is already gone.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}

impl From<reqwest::Error> for StoreError {
  fn from(e: reqwest::Error) -> Self {
    Self::Transport {
      message: e.to_string(),
    }
  }
}

pub type StoreResult<T> = Result<T, StoreError>;
