//! Query/mutation cache over the remote store.
//!
//! This module is the single source of truth for what the UI currently
//! believes the server state is. It provides:
//! - One cached snapshot per entity type, replaced atomically
//! - Subscriber fan-out via watch channels
//! - Request de-duplication (one in-flight fetch per key)
//! - Mutation dispatch with invalidation-triggered, serialized refetches

mod layer;
mod state;

pub use layer::{QueryCache, QuerySubscription};
pub use state::{QuerySnapshot, QueryStatus};
