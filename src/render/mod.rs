//! Rendering highlights onto a document
//!
//! The renderer is the seam between the sync engine and whatever displays
//! the page. `DocumentRenderer` paints into a shared in-memory `Document`.

mod painter;
pub mod span;

use crate::anchor::AnchorError;
use crate::dom::SharedDocument;
use crate::highlights::LocalizedHighlight;

pub use painter::{clear_highlights, clear_previews, focus, paint};
pub use span::{target_attributes, HIGHLIGHT_CLASS, QUERIED_CLASS};

/// A highlight left unpainted, and why
#[derive(Debug)]
pub struct SkippedHighlight {
    pub highlight: LocalizedHighlight,
    pub reason: AnchorError,
}

/// Outcome of one render pass
#[derive(Debug, Default)]
pub struct RenderReport {
    pub painted: usize,
    pub skipped: Vec<SkippedHighlight>,
}

impl RenderReport {
    fn skip(&mut self, highlight: &LocalizedHighlight, reason: AnchorError) {
        self.skipped.push(SkippedHighlight {
            highlight: highlight.clone(),
            reason,
        });
    }
}

/// Displays a merged highlight set
pub trait HighlightRenderer: Send + Sync {
    /// Replace whatever is displayed with `highlights`
    fn render(&self, highlights: &[LocalizedHighlight]) -> RenderReport;

    /// Remove every displayed highlight
    fn clear(&self);

    /// Mark the element at `path` as the target of a shared link
    fn focus(&self, path: &str) -> bool;
}

/// Paints into a shared `Document`
#[derive(Clone)]
pub struct DocumentRenderer {
    document: SharedDocument,
}

impl DocumentRenderer {
    pub fn new(document: SharedDocument) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }
}

impl HighlightRenderer for DocumentRenderer {
    fn render(&self, highlights: &[LocalizedHighlight]) -> RenderReport {
        let mut doc = self.document.lock();
        paint(&mut doc, highlights)
    }

    fn clear(&self) {
        let mut doc = self.document.lock();
        let removed = clear_highlights(&mut doc);
        tracing::debug!(removed, "Cleared highlights");
    }

    fn focus(&self, path: &str) -> bool {
        let mut doc = self.document.lock();
        focus(&mut doc, path)
    }
}

#[cfg(test)]
pub(crate) use recording::RecordingRenderer;
