//! Scripted in-process peer for tests

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{HighlightsApi, TransportError};
use crate::highlights::Highlight;

#[derive(Default)]
struct Script {
    remote: Vec<Highlight>,
    failing: bool,
    next_id: i64,
    fetches: usize,
    upserts: Vec<Vec<Highlight>>,
    blacklisted: Vec<i64>,
    upvoted: Vec<i64>,
    gate: Option<Arc<Notify>>,
}

/// Peer that assigns sequential ids and records every call
#[derive(Default)]
pub(crate) struct ScriptedApi {
    script: Mutex<Script>,
    upsert_started: Notify,
}

impl ScriptedApi {
    pub(crate) fn with_remote(remote: Vec<Highlight>) -> Self {
        let api = Self::default();
        api.script.lock().remote = remote;
        api
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.script.lock().failing = failing;
    }

    /// Make upserts wait until the returned handle is notified
    pub(crate) fn hold_upserts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script.lock().gate = Some(gate.clone());
        gate
    }

    /// Resolves once an upsert has reached the peer
    pub(crate) async fn upsert_started(&self) {
        self.upsert_started.notified().await
    }

    pub(crate) fn fetches(&self) -> usize {
        self.script.lock().fetches
    }

    pub(crate) fn upserts(&self) -> Vec<Vec<Highlight>> {
        self.script.lock().upserts.clone()
    }

    pub(crate) fn blacklisted(&self) -> Vec<i64> {
        self.script.lock().blacklisted.clone()
    }

    pub(crate) fn upvoted(&self) -> Vec<i64> {
        self.script.lock().upvoted.clone()
    }

    fn unavailable() -> TransportError {
        TransportError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }
    }
}

#[async_trait]
impl HighlightsApi for ScriptedApi {
    async fn fetch(&self, _page: u32) -> Result<Vec<Highlight>, TransportError> {
        let mut script = self.script.lock();
        script.fetches += 1;
        if script.failing {
            return Err(Self::unavailable());
        }
        Ok(script.remote.clone())
    }

    async fn upsert(&self, _page: u32, batch: &[Highlight]) -> Result<Vec<Highlight>, TransportError> {
        self.upsert_started.notify_one();
        let gate = self.script.lock().gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut script = self.script.lock();
        script.upserts.push(batch.to_vec());
        if script.failing {
            return Err(Self::unavailable());
        }
        for highlight in batch {
            script.next_id += 1;
            let stored = highlight.clone().with_id(script.next_id);
            script.remote.push(stored);
        }
        Ok(script.remote.clone())
    }

    async fn blacklist(&self, id: i64) -> Result<(), TransportError> {
        let mut script = self.script.lock();
        if script.failing {
            return Err(Self::unavailable());
        }
        script.blacklisted.push(id);
        Ok(())
    }

    async fn upvote(&self, id: i64) -> Result<(), TransportError> {
        let mut script = self.script.lock();
        if script.failing {
            return Err(Self::unavailable());
        }
        script.upvoted.push(id);
        Ok(())
    }
}
