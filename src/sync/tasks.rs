//! Fire-and-forget work with logged failures

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Detached tasks spawned on behalf of the engine
///
/// Failures are logged, never returned. Handles are kept so callers can
/// wait for outstanding work, e.g. before shutdown.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task`, logging its error under `label`
    pub fn spawn<F, E>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::warn!(task = label, error = %e, "Background task failed");
            }
        });

        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Number of tasks not yet finished
    pub fn pending(&self) -> usize {
        self.handles.lock().iter().filter(|handle| !handle.is_finished()).count()
    }

    /// Wait until every spawned task, including ones spawned meanwhile,
    /// has finished
    pub async fn wait_idle(&self) {
        loop {
            let handles = std::mem::take(&mut *self.handles.lock());
            if handles.is_empty() {
                return;
            }
            for result in futures::future::join_all(handles).await {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Background task panicked");
                }
            }
        }
    }
}
