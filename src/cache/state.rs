//! Snapshot types observed by cache subscribers.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::store::types::Record;

/// The status of a cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// No fetch has been started yet
  Idle,
  /// A fetch is in flight
  Loading,
  /// Data reflects the last successful fetch
  Success,
  /// The last fetch failed and nothing succeeded since
  Error,
}

impl QueryStatus {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryStatus::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryStatus::Success)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryStatus::Error)
  }

  /// A settled query has either data or an error to show.
  pub fn is_settled(&self) -> bool {
    matches!(self, QueryStatus::Success | QueryStatus::Error)
  }
}

/// The cache's current belief about one collection.
///
/// Exactly one snapshot exists per entity type at any time; updates replace
/// it wholesale. On a failed refetch the previous `data` is retained so
/// views can keep rendering it alongside the error.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
  pub status: QueryStatus,
  pub data: Vec<Record>,
  pub error: Option<StoreError>,
  /// When `data` was last confirmed against the store.
  pub last_updated: Option<DateTime<Utc>>,
}

impl QuerySnapshot {
  pub(crate) fn idle() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: Vec::new(),
      error: None,
      last_updated: None,
    }
  }

  pub fn is_loading(&self) -> bool {
    self.status.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.status.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.status.is_error()
  }

  /// The error message if the last fetch failed.
  pub fn error_message(&self) -> Option<String> {
    self.error.as_ref().map(|e| e.to_string())
  }
}
