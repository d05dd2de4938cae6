//! gigbook: client-side data access and caching for an events & venues app.
//!
//! The crate has two layers. The [`store`] module is a thin adapter over the
//! remote record store (list/create/update/delete per collection, plus asset
//! upload and a sign-in pass-through). The [`cache`] module wraps it with a
//! keyed query cache: views subscribe to a collection, share one in-flight
//! fetch, and see a refreshed snapshot after every successful mutation.
//!
//! ```ignore
//! let config = Config::load(None)?;
//! let client = StoreClient::new(&config)?;
//! let cache = QueryCache::new(client);
//!
//! let mut events = cache.subscribe(&store::types::EVENTS);
//! let snapshot = events.settled().await;
//! let visible = filter::filter_by_name(&snapshot.data, "gala");
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod store;

pub use cache::{QueryCache, QuerySnapshot, QueryStatus, QuerySubscription};
pub use config::{Config, ConfigError};
pub use error::{StoreError, StoreResult};
pub use store::{RemoteStore, StoreClient};
