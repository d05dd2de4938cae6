//! Cache layer that orchestrates fetching, fan-out and invalidation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::store::types::{EntityType, Fields, Record, RecordId};
use crate::store::RemoteStore;

use super::state::{QuerySnapshot, QueryStatus};

/// Keyed query cache over a remote store.
///
/// One instance is created at application start and handed (by clone) to
/// every consumer; clones share state. Dropping the last clone tears the
/// cache down; in-flight fetch tasks run to completion and are then
/// discarded.
pub struct QueryCache<S> {
  inner: Arc<Inner<S>>,
}

impl<S> Clone for QueryCache<S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

struct Inner<S> {
  store: S,
  entries: Mutex<HashMap<EntityType, Entry>>,
}

/// Per-key bookkeeping. The snapshot itself lives in the watch channel so
/// subscribers observe replacements without holding the map lock.
struct Entry {
  tx: watch::Sender<QuerySnapshot>,
  /// One fetch in flight at most; guards against duplicate requests.
  fetching: bool,
  /// Invalidated while a fetch was in flight; coalesces into exactly one
  /// follow-up refetch.
  dirty: bool,
  /// Invalidated with no subscribers; refetch deferred to next subscribe.
  stale: bool,
}

impl Entry {
  fn new() -> Self {
    let (tx, _rx) = watch::channel(QuerySnapshot::idle());
    Self {
      tx,
      fetching: false,
      dirty: false,
      stale: false,
    }
  }
}

impl<S: RemoteStore> QueryCache<S> {
  pub fn new(store: S) -> Self {
    Self {
      inner: Arc::new(Inner {
        store,
        entries: Mutex::new(HashMap::new()),
      }),
    }
  }

  /// Direct access to the underlying store, for operations the cache does
  /// not mediate (asset upload, sign-in).
  pub fn store(&self) -> &S {
    &self.inner.store
  }

  /// Subscribe to the collection under `entity`.
  ///
  /// Returns the current snapshot plus a stream of updates. Starts a fetch
  /// when the key is new, idle, or marked stale; a fetch already in flight
  /// is shared with the new subscriber rather than re-issued.
  pub fn subscribe(&self, entity: &EntityType) -> QuerySubscription {
    let mut entries = self.lock_entries();
    let entry = entries.entry(entity.clone()).or_insert_with(Entry::new);
    let rx = entry.tx.subscribe();

    let idle = entry.tx.borrow().status == QueryStatus::Idle;
    if !entry.fetching && (idle || entry.stale) {
      entry.fetching = true;
      entry.stale = false;
      self.spawn_fetch(entity.clone());
    }

    QuerySubscription { rx }
  }

  /// Mark the collection under `entity` for refresh.
  ///
  /// With a fetch in flight, a single follow-up refetch is scheduled no
  /// matter how many invalidations arrive (serialization: responses never
  /// race each other for the same key). With active subscribers, a refetch
  /// starts immediately; with none, the key is marked stale and the next
  /// subscription refetches.
  pub fn invalidate(&self, entity: &EntityType) {
    let mut entries = self.lock_entries();
    let Some(entry) = entries.get_mut(entity) else {
      // Nothing cached: the first subscription fetches fresh anyway.
      return;
    };

    if entry.fetching {
      entry.dirty = true;
    } else if entry.tx.receiver_count() > 0 {
      entry.fetching = true;
      entry.stale = false;
      self.spawn_fetch(entity.clone());
    } else {
      entry.stale = true;
    }
  }

  /// Force a refresh of `entity` even if the snapshot is fresh.
  pub fn refetch(&self, entity: &EntityType) {
    let mut entries = self.lock_entries();
    let Some(entry) = entries.get_mut(entity) else {
      return;
    };

    if entry.fetching {
      entry.dirty = true;
    } else {
      entry.fetching = true;
      entry.stale = false;
      self.spawn_fetch(entity.clone());
    }
  }

  /// Create a record and invalidate the entity's collection.
  ///
  /// No optimistic write: the cached snapshot is untouched until the store
  /// confirms, then the invalidation-triggered refetch picks the record up.
  pub async fn create(&self, entity: &EntityType, fields: Fields) -> StoreResult<Record> {
    let record = self.inner.store.create(entity, fields).await?;
    debug!(entity = %entity, id = %record.id, "record created");
    self.invalidate(entity);
    Ok(record)
  }

  /// Update a record by id and invalidate the entity's collection.
  pub async fn update(
    &self,
    entity: &EntityType,
    id: &RecordId,
    fields: Fields,
  ) -> StoreResult<Record> {
    let record = self.inner.store.update(entity, id, fields).await?;
    debug!(entity = %entity, id = %id, "record updated");
    self.invalidate(entity);
    Ok(record)
  }

  /// Delete a record by id and invalidate the entity's collection.
  ///
  /// Deleting an id the store no longer has counts as success.
  pub async fn delete(&self, entity: &EntityType, id: &RecordId) -> StoreResult<()> {
    match self.inner.store.delete(entity, id).await {
      Ok(()) => {}
      Err(e) if e.is_not_found() => {
        debug!(entity = %entity, id = %id, "delete target already absent");
      }
      Err(e) => return Err(e),
    }
    self.invalidate(entity);
    Ok(())
  }

  fn lock_entries(&self) -> MutexGuard<'_, HashMap<EntityType, Entry>> {
    self.inner.entries.lock().expect("cache lock poisoned")
  }

  fn spawn_fetch(&self, entity: EntityType) {
    let inner = Arc::clone(&self.inner);
    tokio::spawn(async move {
      run_fetch(inner, entity).await;
    });
  }
}

/// Fetch loop for one key. Loops while invalidations arrive mid-fetch, so
/// refetches for a key are strictly serialized.
async fn run_fetch<S: RemoteStore>(inner: Arc<Inner<S>>, entity: EntityType) {
  loop {
    {
      let entries = inner.entries.lock().expect("cache lock poisoned");
      let Some(entry) = entries.get(&entity) else {
        return;
      };
      // Previous data stays visible while loading.
      entry.tx.send_modify(|snap| snap.status = QueryStatus::Loading);
    }

    let result = inner.store.list(&entity).await;

    let again = {
      let mut entries = inner.entries.lock().expect("cache lock poisoned");
      let Some(entry) = entries.get_mut(&entity) else {
        return;
      };

      match result {
        Ok(records) => {
          debug!(entity = %entity, count = records.len(), "fetch complete");
          entry.tx.send_replace(QuerySnapshot {
            status: QueryStatus::Success,
            data: records,
            error: None,
            last_updated: Some(Utc::now()),
          });
        }
        Err(e) => {
          warn!(entity = %entity, error = %e, "fetch failed");
          entry.tx.send_modify(|snap| {
            snap.status = QueryStatus::Error;
            snap.error = Some(e);
          });
        }
      }

      if entry.dirty {
        entry.dirty = false;
        true
      } else {
        entry.fetching = false;
        false
      }
    };

    if !again {
      return;
    }
  }
}

/// Handle returned by [`QueryCache::subscribe`].
///
/// Holds the subscriber end of the key's watch channel. Dropping it simply
/// stops receiving updates; a fetch in flight runs to completion.
pub struct QuerySubscription {
  rx: watch::Receiver<QuerySnapshot>,
}

impl QuerySubscription {
  /// The current snapshot, marking it as seen.
  pub fn snapshot(&mut self) -> QuerySnapshot {
    self.rx.borrow_and_update().clone()
  }

  /// The current snapshot without consuming the change notification.
  pub fn peek(&self) -> QuerySnapshot {
    self.rx.borrow().clone()
  }

  /// Wait for the snapshot to change since last seen.
  ///
  /// Returns false if the cache was torn down.
  pub async fn changed(&mut self) -> bool {
    self.rx.changed().await.is_ok()
  }

  /// Wait until the query settles into success or error.
  ///
  /// Returns immediately if it already has.
  pub async fn settled(&mut self) -> QuerySnapshot {
    loop {
      let snap = self.rx.borrow_and_update().clone();
      if snap.status.is_settled() {
        return snap;
      }
      if self.rx.changed().await.is_err() {
        return self.rx.borrow().clone();
      }
    }
  }
}
