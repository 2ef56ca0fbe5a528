//! The five stores a highlighter keeps

use std::sync::Arc;

use crate::highlights::Highlight;
use crate::reconcile::StoreSnapshot;

use super::backend::{MemoryBackend, StorageBackend};
use super::collection::HighlightStore;
use super::StoreError;

pub const LOCAL_KEY: &str = "local-highlights";
pub const REMOTE_KEY: &str = "remote-highlights";
pub const UPLOADABLE_KEY: &str = "uploadable-highlights";
pub const UPVOTED_KEY: &str = "upvoted-highlights";
pub const BLACKLISTED_KEY: &str = "blacklisted-highlights";

/// Local, remote, uploadable, upvoted and blacklisted highlights sharing one
/// backend
#[derive(Debug)]
pub struct HighlightStores {
    /// Uploaded by this client and acknowledged by the peer
    pub local: HighlightStore<Highlight>,
    /// Canonical set last received from the peer
    pub remote: HighlightStore<Highlight>,
    /// Created here and not yet uploaded
    pub uploadable: HighlightStore<Highlight>,
    /// Upvoted by the user
    pub upvoted: HighlightStore<Highlight>,
    /// Ids the user has suppressed
    pub blacklisted: HighlightStore<i64>,
}

impl HighlightStores {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            local: HighlightStore::new(LOCAL_KEY, backend.clone()),
            remote: HighlightStore::new(REMOTE_KEY, backend.clone()),
            uploadable: HighlightStore::new(UPLOADABLE_KEY, backend.clone()),
            upvoted: HighlightStore::new(UPVOTED_KEY, backend.clone()),
            blacklisted: HighlightStore::new(BLACKLISTED_KEY, backend),
        }
    }

    /// Stores kept only for the life of the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Read every store
    ///
    /// A store that fails to load is logged and treated as empty so one
    /// corrupt record cannot hide the others.
    pub async fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            local: or_empty(LOCAL_KEY, self.local.get().await),
            remote: or_empty(REMOTE_KEY, self.remote.get().await),
            uploadable: or_empty(UPLOADABLE_KEY, self.uploadable.get().await),
            upvoted: or_empty(UPVOTED_KEY, self.upvoted.get().await),
            blacklisted: or_empty(BLACKLISTED_KEY, self.blacklisted.get().await),
        }
    }
}

fn or_empty<T>(key: &str, result: Result<Vec<T>, StoreError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(store = %key, error = %e, "Failed to read highlight store");
        Vec::new()
    })
}
