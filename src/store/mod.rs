//! Remote store adapter.
//!
//! Translates the core operations (list, create, update, delete, asset
//! upload) into calls against the remote collection store. The adapter owns
//! no state beyond connection plumbing; consistency is the cache's job.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::StoreResult;
use types::{EntityType, Fields, Record, RecordId};

pub use client::StoreClient;

/// Operations the cache needs from a remote collection store.
///
/// `StoreClient` is the production implementation; tests substitute an
/// in-memory store.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
  /// Fetch every record in a collection, in store order.
  async fn list(&self, entity: &EntityType) -> StoreResult<Vec<Record>>;

  /// Create a record; the store assigns the id.
  async fn create(&self, entity: &EntityType, fields: Fields) -> StoreResult<Record>;

  /// Update a record's fields by id.
  async fn update(
    &self,
    entity: &EntityType,
    id: &RecordId,
    fields: Fields,
  ) -> StoreResult<Record>;

  /// Delete a record by id. Fails with `NotFound` if already absent.
  async fn delete(&self, entity: &EntityType, id: &RecordId) -> StoreResult<()>;

  /// Upload a blob and return its publicly resolvable URL.
  async fn upload_asset(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> StoreResult<String>;
}
