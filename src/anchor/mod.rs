//! Highlight anchoring
//!
//! A highlight is anchored by a structural path to its container element
//! plus a UTF-16 offset range into that element's serialized content. This
//! module computes and resolves paths, locates and validates offsets, and
//! expands raw selections to word boundaries.

mod expand;
mod offsets;
mod path;

use thiserror::Error;

use crate::dom::{Document, DomError, NodeId};
use crate::highlights::Highlight;

pub use expand::{expand_to_word, is_word_char};
pub use offsets::{utf16_len, utf16_slice, utf16_to_byte, TextAnchor};
pub use path::{
    compute_path, compute_path_skipping, parse as parse_path, resolve_path, PathBuilder,
    PathExpression, PathParseError, PathRoot, PathStep,
};

/// Reasons a highlight cannot be placed in a document
#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("Path does not resolve: {0}")]
    Unresolved(String),

    #[error("Content at [{start}, {end}) no longer matches the stored text")]
    Drift { start: usize, end: usize },

    #[error("Invalid offset range [{start}, {end})")]
    InvalidRange { start: usize, end: usize },

    #[error("Overlaps an earlier highlight at [{start}, {end})")]
    Overlap { start: usize, end: usize },

    #[error("Painting produced malformed markup: {0}")]
    Markup(#[from] DomError),
}

/// Resolve a highlight's container and check its stored text is still there
pub fn resolve_anchor(doc: &Document, highlight: &Highlight) -> Result<(NodeId, TextAnchor), AnchorError> {
    let node = resolve_path(doc, &highlight.path)
        .ok_or_else(|| AnchorError::Unresolved(highlight.path.clone()))?;
    let anchor = TextAnchor::new(highlight.start_offset, highlight.end_offset)?;
    anchor.validate(&doc.inner_html(node), &highlight.text)?;
    Ok((node, anchor))
}
