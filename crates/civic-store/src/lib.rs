//! CivicSphere Storage Layer
//!
//! Implements the [`SessionStore`](civic_domain::traits::SessionStore) contract.
//!
//! # Architecture
//!
//! - [`MemoryStore`]: in-process partitions, for tests and ephemeral sessions
//! - [`SqliteStore`]: persistent message log in SQLite
//! - [`Subscription`]: live, restartable partition feed shared by both stores,
//!   driven by a `tokio::sync::broadcast` change channel
//!
//! Every read path returns messages ordered by `(created_at, id)` regardless
//! of the order in which writes arrived.
//!
//! # Examples
//!
//! ```no_run
//! use civic_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for append/subscribe
//! ```

#![warn(missing_docs)]

mod feed;
mod memory;
mod sqlite;

pub use feed::Subscription;
pub use memory::MemoryStore;
pub use sqlite::{SessionSummary, SqliteStore};

use civic_domain::MessageId;
use thiserror::Error;

/// Capacity of the change channel behind each store's subscriptions
pub const DEFAULT_FEED_CAPACITY: usize = 64;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Response payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A message with the same id was already appended
    #[error("Duplicate message: {0}")]
    Duplicate(MessageId),

    /// The store has been closed
    #[error("Store is closed")]
    Closed,
}

/// Largest `created_at` either store accepts
///
/// SQLite keeps timestamps as signed 64-bit integers; both stores share the
/// bound so they order the same messages the same way.
pub const MAX_CREATED_AT: u64 = i64::MAX as u64;

pub(crate) fn check_created_at(created_at: u64) -> Result<i64, StoreError> {
    i64::try_from(created_at).map_err(|_| {
        StoreError::InvalidData(format!(
            "created_at {} exceeds {}",
            created_at, MAX_CREATED_AT
        ))
    })
}

pub(crate) fn stored_created_at(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("Negative created_at: {}", value)))
}
