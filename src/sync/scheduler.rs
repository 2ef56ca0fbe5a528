//! Periodic upload of pending highlights
//!
//! ```text
//!          tick, uploadable non-empty
//!   Idle ─────────────────────────────▶ Uploading
//!    ▲                                     │
//!    └──────── upsert settled ─────────────┘
//! ```
//!
//! A tick that finds an upload in flight does nothing. On success the peer's
//! canonical list replaces the remote store, the uploaded batch moves from
//! uploadable to local, and the merged set is recomputed. On failure the
//! stores are left as they were and the next tick retries.
//!
//! The stores are written one at a time, local first and remote last. A
//! store write that fails part way leaves the batch in local and possibly
//! still in uploadable, never in neither, and remote is only replaced once
//! the batch has left uploadable.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::highlights::Highlight;
use crate::reconcile::Reconciler;
use crate::remote::{HighlightsApi, PageIdentity, TransportError};
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Uploading,
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing pending
    Empty,
    /// An upload was already in flight
    Busy,
    /// A batch was accepted by the peer
    Uploaded { count: usize },
    /// The upload or a store update failed
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resets the state to idle however the upload ends
struct UploadGuard<'a> {
    state: &'a Mutex<SyncState>,
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = SyncState::Idle;
    }
}

/// Moves highlights from the uploadable store to the peer
pub struct SyncScheduler {
    reconciler: Arc<Reconciler>,
    api: Arc<dyn HighlightsApi>,
    page: PageIdentity,
    batch_size: usize,
    state: Mutex<SyncState>,
}

impl SyncScheduler {
    pub fn new(
        reconciler: Arc<Reconciler>,
        api: Arc<dyn HighlightsApi>,
        page: PageIdentity,
        batch_size: usize,
    ) -> Self {
        Self {
            reconciler,
            api,
            page,
            batch_size: batch_size.max(1),
            state: Mutex::new(SyncState::Idle),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock()
    }

    /// Claim the uploading state, or `None` if an upload is in flight
    fn begin_upload(&self) -> Option<UploadGuard<'_>> {
        let mut state = self.state.lock();
        if *state == SyncState::Uploading {
            return None;
        }
        *state = SyncState::Uploading;
        Some(UploadGuard { state: &self.state })
    }

    /// Upload at most one batch
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = self.begin_upload() else {
            tracing::debug!("Upload already in flight, skipping tick");
            return TickOutcome::Busy;
        };

        let pending = match self.reconciler.stores().uploadable.get().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read uploadable highlights");
                return TickOutcome::Failed;
            }
        };
        if pending.is_empty() {
            return TickOutcome::Empty;
        }

        let batch: Vec<Highlight> = pending.into_iter().take(self.batch_size).collect();
        let count = batch.len();
        tracing::debug!(page = self.page.hash(), count, "Uploading highlights");

        match self.upload(batch).await {
            Ok(()) => {
                tracing::info!(page = self.page.hash(), count, "Uploaded highlights");
                TickOutcome::Uploaded { count }
            }
            Err(e) => {
                tracing::warn!(page = self.page.hash(), count, error = %e, "Highlight upload failed");
                TickOutcome::Failed
            }
        }
    }

    async fn upload(&self, batch: Vec<Highlight>) -> Result<(), SyncError> {
        let canonical = self.api.upsert(self.page.hash(), &batch).await?;

        let stores = self.reconciler.stores();
        stores.local.push_all(batch.clone()).await?;
        // Entries queued while the request was in flight stay pending
        stores
            .uploadable
            .update(move |items| {
                items
                    .into_iter()
                    .filter(|item| !batch.contains(item))
                    .collect()
            })
            .await?;
        stores.remote.set(canonical).await?;

        self.reconciler.recompute().await;
        Ok(())
    }

    /// Replace the remote store with the peer's list and recompute
    pub async fn fetch_remote(&self) -> Result<(), SyncError> {
        let remote = self.api.fetch(self.page.hash()).await?;
        tracing::debug!(page = self.page.hash(), count = remote.len(), "Fetched remote highlights");

        self.reconciler.stores().remote.set(remote).await?;
        self.reconciler.recompute().await;
        Ok(())
    }

    /// Tick every `period`, starting one period from now
    pub fn start(self: Arc<Self>, period: Duration) -> SchedulerHandle {
        let (stop, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Upload timer stopped");
        });

        SchedulerHandle { stop, task }
    }
}

/// Running upload timer
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop ticking; an upload already in flight still completes
    pub fn stop(self) -> JoinHandle<()> {
        let _ = self.stop.send(true);
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingRenderer;
    use async_trait::async_trait;

    use crate::remote::mock::ScriptedApi;
    use crate::store::{HighlightStores, MemoryBackend, StorageBackend, LOCAL_KEY, REMOTE_KEY};

    /// Memory storage that refuses writes to one key on demand
    #[derive(Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        refuse: Mutex<Option<&'static str>>,
    }

    #[async_trait]
    impl StorageBackend for FlakyBackend {
        async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.load(key).await
        }

        async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.refuse.lock().map_or(false, |refused| refused == key) {
                return Err(StoreError::Database(sqlx::Error::PoolClosed));
            }
            self.inner.save(key, value).await
        }
    }

    struct Fixture {
        scheduler: Arc<SyncScheduler>,
        reconciler: Arc<Reconciler>,
        api: Arc<ScriptedApi>,
        renderer: Arc<RecordingRenderer>,
    }

    fn fixture(batch_size: usize) -> Fixture {
        fixture_with(batch_size, HighlightStores::in_memory())
    }

    fn fixture_with(batch_size: usize, stores: HighlightStores) -> Fixture {
        let stores = Arc::new(stores);
        let renderer = Arc::new(RecordingRenderer::default());
        let reconciler = Arc::new(Reconciler::new(stores, renderer.clone()));
        reconciler.set_active(true);
        let api = Arc::new(ScriptedApi::default());
        let page = PageIdentity::parse("https://example.com/post").unwrap();
        let scheduler = Arc::new(SyncScheduler::new(
            reconciler.clone(),
            api.clone(),
            page,
            batch_size,
        ));
        Fixture {
            scheduler,
            reconciler,
            api,
            renderer,
        }
    }

    fn pending(n: usize) -> Vec<Highlight> {
        (0..n)
            .map(|i| Highlight::new(format!("BODY/P[{}]", i + 1), 0, 3, "abc"))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_tick() {
        let f = fixture(10);
        assert_eq!(f.scheduler.tick().await, TickOutcome::Empty);
        assert!(f.api.upserts().is_empty());
        assert_eq!(f.scheduler.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_successful_upload_moves_batch() {
        let f = fixture(10);
        let stores = f.reconciler.stores();
        stores.uploadable.set(pending(3)).await.unwrap();

        assert_eq!(f.scheduler.tick().await, TickOutcome::Uploaded { count: 3 });

        assert!(stores.uploadable.get().await.unwrap().is_empty());
        assert_eq!(stores.local.get().await.unwrap(), pending(3));
        let remote = stores.remote.get().await.unwrap();
        assert_eq!(remote.len(), 3);
        assert!(remote.iter().all(|h| h.id.is_some()));
        assert_eq!(f.renderer.renders().len(), 1);
        assert_eq!(f.scheduler.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_batches_are_capped() {
        let f = fixture(10);
        let stores = f.reconciler.stores();
        stores.uploadable.set(pending(12)).await.unwrap();

        assert_eq!(f.scheduler.tick().await, TickOutcome::Uploaded { count: 10 });
        let remaining = stores.uploadable.get().await.unwrap();
        assert_eq!(remaining, pending(12)[10..].to_vec());

        assert_eq!(f.scheduler.tick().await, TickOutcome::Uploaded { count: 2 });
        assert!(stores.uploadable.get().await.unwrap().is_empty());
        assert_eq!(f.api.upserts().len(), 2);
        assert_eq!(stores.local.get().await.unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_stores() {
        let f = fixture(10);
        let stores = f.reconciler.stores();
        stores.uploadable.set(pending(2)).await.unwrap();
        f.api.set_failing(true);

        assert_eq!(f.scheduler.tick().await, TickOutcome::Failed);
        assert_eq!(stores.uploadable.get().await.unwrap(), pending(2));
        assert!(stores.local.get().await.unwrap().is_empty());
        assert!(stores.remote.get().await.unwrap().is_empty());
        assert_eq!(f.scheduler.state(), SyncState::Idle);

        f.api.set_failing(false);
        assert_eq!(f.scheduler.tick().await, TickOutcome::Uploaded { count: 2 });
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_all_pending() {
        let f = fixture(10);
        let stores = f.reconciler.stores();
        stores.uploadable.set(pending(25)).await.unwrap();
        f.api.set_failing(true);

        assert_eq!(f.scheduler.tick().await, TickOutcome::Failed);
        assert_eq!(f.api.upserts().len(), 1);
        assert_eq!(f.api.upserts()[0].len(), 10);

        assert_eq!(stores.uploadable.get().await.unwrap(), pending(25));
        assert!(stores.local.get().await.unwrap().is_empty());
        assert!(stores.remote.get().await.unwrap().is_empty());
        assert!(f.renderer.renders().is_empty());
    }

    #[tokio::test]
    async fn test_local_write_failure_changes_nothing() {
        let backend = Arc::new(FlakyBackend::default());
        let f = fixture_with(10, HighlightStores::new(backend.clone()));
        let stores = f.reconciler.stores();
        let old = vec![Highlight::new("BODY/P[1]", 0, 3, "old").with_id(1)];
        stores.remote.set(old.clone()).await.unwrap();
        stores.uploadable.set(pending(2)).await.unwrap();
        *backend.refuse.lock() = Some(LOCAL_KEY);

        assert_eq!(f.scheduler.tick().await, TickOutcome::Failed);
        assert_eq!(f.api.upserts().len(), 1);
        assert_eq!(stores.remote.get().await.unwrap(), old);
        assert_eq!(stores.uploadable.get().await.unwrap(), pending(2));
        assert!(stores.local.get().await.unwrap().is_empty());
        assert_eq!(f.scheduler.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_remote_write_failure_keeps_batch() {
        let backend = Arc::new(FlakyBackend::default());
        let f = fixture_with(10, HighlightStores::new(backend.clone()));
        let stores = f.reconciler.stores();
        let old = vec![Highlight::new("BODY/P[1]", 0, 3, "old").with_id(1)];
        stores.remote.set(old.clone()).await.unwrap();
        stores.uploadable.set(pending(2)).await.unwrap();
        *backend.refuse.lock() = Some(REMOTE_KEY);

        assert_eq!(f.scheduler.tick().await, TickOutcome::Failed);
        assert_eq!(stores.remote.get().await.unwrap(), old);
        assert_eq!(stores.local.get().await.unwrap(), pending(2));
        assert!(stores.uploadable.get().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tick_while_uploading_is_busy() {
        let f = fixture(10);
        let stores = f.reconciler.stores();
        stores.uploadable.set(pending(1)).await.unwrap();
        let gate = f.api.hold_upserts();

        let scheduler = f.scheduler.clone();
        let first = tokio::spawn(async move { scheduler.tick().await });
        f.api.upsert_started().await;

        assert_eq!(f.scheduler.state(), SyncState::Uploading);
        assert_eq!(f.scheduler.tick().await, TickOutcome::Busy);

        // Queued during the upload, must survive it
        let late = Highlight::new("BODY/P[9]", 0, 3, "new");
        stores.uploadable.push(late.clone()).await.unwrap();

        gate.notify_one();
        assert_eq!(first.await.unwrap(), TickOutcome::Uploaded { count: 1 });
        assert_eq!(f.api.upserts().len(), 1);
        assert_eq!(stores.uploadable.get().await.unwrap(), vec![late]);
    }

    #[tokio::test]
    async fn test_fetch_remote_replaces_store() {
        let f = fixture(10);
        let stores = f.reconciler.stores();
        stores
            .remote
            .set(vec![Highlight::new("BODY/P[1]", 0, 3, "old").with_id(1)])
            .await
            .unwrap();

        f.api.upsert(0, &pending(1)).await.unwrap();
        f.scheduler.fetch_remote().await.unwrap();

        let remote = stores.remote.get().await.unwrap();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].text, "abc");
        assert_eq!(f.renderer.renders().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_remote() {
        let f = fixture(10);
        let stores = f.reconciler.stores();
        let old = vec![Highlight::new("BODY/P[1]", 0, 3, "old").with_id(1)];
        stores.remote.set(old.clone()).await.unwrap();
        f.api.set_failing(true);

        assert!(f.scheduler.fetch_remote().await.is_err());
        assert_eq!(stores.remote.get().await.unwrap(), old);
    }

    #[tokio::test]
    async fn test_timer_uploads_until_stopped() {
        let f = fixture(10);
        f.reconciler.stores().uploadable.set(pending(1)).await.unwrap();

        let handle = f.scheduler.clone().start(Duration::from_millis(20));
        tokio::time::timeout(Duration::from_secs(5), f.api.upsert_started())
            .await
            .unwrap();
        handle.stop().await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let stores = f.reconciler.stores();
        assert!(stores.uploadable.get().await.unwrap().is_empty());
        assert_eq!(stores.local.get().await.unwrap().len(), 1);

        // No further ticks after stop
        stores.uploadable.set(pending(2)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(f.api.upserts().len(), 1);
    }
}
