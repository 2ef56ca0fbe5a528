//! Merging the stores into one renderable set
//!
//! `reconcile` is a pure function of the store contents:
//!
//! 1. remote entries whose path and text match an upvoted entry are dropped
//!    (the upvoted copy replaces them)
//! 2. local, remote, upvoted and uploadable entries are concatenated in
//!    that order and deduplicated by value, first occurrence winning
//! 3. entries whose id is blacklisted are removed
//!
//! The order of the result is the order highlights are painted in, which
//! decides which of two overlapping highlights is shown.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::highlights::{Highlight, HighlightKind, LocalizedHighlight};
use crate::render::{HighlightRenderer, RenderReport};
use crate::store::HighlightStores;

/// Contents of every store at one moment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub local: Vec<Highlight>,
    pub remote: Vec<Highlight>,
    pub uploadable: Vec<Highlight>,
    pub upvoted: Vec<Highlight>,
    pub blacklisted: Vec<i64>,
}

/// Compute the kind-tagged highlights to render
pub fn reconcile(snapshot: &StoreSnapshot) -> Vec<LocalizedHighlight> {
    let remote = snapshot.remote.iter().filter(|remote| {
        !snapshot
            .upvoted
            .iter()
            .any(|upvoted| upvoted.path == remote.path && upvoted.text == remote.text)
    });

    let candidates = snapshot
        .local
        .iter()
        .map(|h| (h, HighlightKind::Local))
        .chain(remote.map(|h| (h, HighlightKind::Remote)))
        .chain(snapshot.upvoted.iter().map(|h| (h, HighlightKind::Upvoted)))
        .chain(snapshot.uploadable.iter().map(|h| (h, HighlightKind::Uploadable)));

    let blacklisted: HashSet<i64> = snapshot.blacklisted.iter().copied().collect();
    let mut seen: HashSet<&Highlight> = HashSet::new();
    let mut merged = Vec::new();

    for (highlight, kind) in candidates {
        if !seen.insert(highlight) {
            continue;
        }
        if highlight.id.map_or(false, |id| blacklisted.contains(&id)) {
            continue;
        }
        merged.push(highlight.clone().localize(kind));
    }

    merged
}

/// Recomputes the merged set and hands it to a renderer
///
/// While inactive, the set is still computed but nothing is painted.
pub struct Reconciler {
    stores: Arc<HighlightStores>,
    renderer: Arc<dyn HighlightRenderer>,
    active: AtomicBool,
}

impl Reconciler {
    pub fn new(stores: Arc<HighlightStores>, renderer: Arc<dyn HighlightRenderer>) -> Self {
        Self {
            stores,
            renderer,
            active: AtomicBool::new(false),
        }
    }

    pub fn stores(&self) -> &HighlightStores {
        &self.stores
    }

    pub fn renderer(&self) -> &dyn HighlightRenderer {
        self.renderer.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Re-read the stores, merge, and paint if active
    pub async fn recompute(&self) -> Vec<LocalizedHighlight> {
        let snapshot = self.stores.snapshot().await;
        let merged = reconcile(&snapshot);

        if self.is_active() {
            let report = self.renderer.render(&merged);
            log_report(&report);
        } else {
            tracing::debug!(count = merged.len(), "Highlighter inactive, skipping render");
        }

        merged
    }
}

fn log_report(report: &RenderReport) {
    for skipped in &report.skipped {
        tracing::debug!(
            path = %skipped.highlight.highlight.path,
            kind = %skipped.highlight.kind,
            reason = %skipped.reason,
            "Highlight not painted"
        );
    }
    tracing::debug!(
        painted = report.painted,
        skipped = report.skipped.len(),
        "Rendered highlights"
    );
}
