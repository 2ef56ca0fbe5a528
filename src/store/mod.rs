//! Persistent highlight stores
//!
//! Each store is a named JSON array kept in a `StorageBackend`, so contents
//! survive restarts when the backend does.

mod backend;
mod collection;
mod stores;

use thiserror::Error;

pub use backend::{MemoryBackend, SqliteBackend, StorageBackend};
pub use collection::{dedup, HighlightStore};
pub use stores::{
    HighlightStores, BLACKLISTED_KEY, LOCAL_KEY, REMOTE_KEY, UPLOADABLE_KEY, UPVOTED_KEY,
};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record in {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
