//! Turning a raw text selection into a highlightable preview

use std::ops::Range;

use crate::anchor::{compute_path_skipping, expand_to_word, utf16_len, TextAnchor};
use crate::config::HighlighterConfig;
use crate::dom::{escape_text, Document, NodeId};
use crate::highlights::{HighlightKind, TargetAttributes};
use crate::render::{clear_previews, span, HIGHLIGHT_CLASS};

/// A selection inside one text node, in characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSelection {
    pub node: NodeId,
    pub range: Range<usize>,
}

impl TextSelection {
    pub fn new(node: NodeId, range: Range<usize>) -> Self {
        Self { node, range }
    }

    pub fn is_collapsed(&self) -> bool {
        self.range.start >= self.range.end
    }
}

/// Capture a selection as a preview span
///
/// Any earlier preview is removed first. The selection is expanded to word
/// boundaries, checked against the selectable-element rules and the minimum
/// length, anchored, and wrapped in a `highlightable` span. Returns the
/// preview's attributes, or `None` when the selection is rejected.
///
/// Removing an earlier preview merges the text around it, so a selection
/// inside text that touched the old preview no longer exists and is
/// rejected. Painted highlights stay in place, but offsets and paths are
/// measured as if they were cleared.
pub fn capture_selection(
    doc: &mut Document,
    selection: &TextSelection,
    config: &HighlighterConfig,
) -> Option<TargetAttributes> {
    clear_previews(doc);

    if selection.is_collapsed() {
        return None;
    }
    if !doc.is_attached(selection.node) {
        tracing::debug!("Selection no longer attached to the document");
        return None;
    }

    let text = doc.text(selection.node)?.to_string();
    let container = doc.parent(selection.node)?;
    let tag = doc.tag_name(container)?;
    if !config.is_selectable(tag) || doc.has_class(container, HIGHLIGHT_CLASS) {
        tracing::debug!(tag = %tag, "Selection in an unselectable element");
        return None;
    }

    let expanded = expand_to_word(&text, selection.range.clone())?;
    let selected: String = text
        .chars()
        .skip(expanded.start)
        .take(expanded.end - expanded.start)
        .collect();
    let selected_html = escape_text(&selected);
    if selected.trim().is_empty() || utf16_len(&selected_html) < config.min_selection_length {
        return None;
    }

    // anchors index the document as it reads with every highlight cleared
    let start =
        doc.content_offset_skipping(selection.node, expanded.start, &span::is_highlight_span)?;
    let anchor = TextAnchor::at(start, &selected_html);
    let path = compute_path_skipping(doc, container, &span::is_highlight_span)?.to_string();

    let target = TargetAttributes {
        kind: HighlightKind::Highlightable,
        start_offset: anchor.start_offset,
        end_offset: anchor.end_offset,
        text: selected_html,
        path,
        id: None,
    };

    let wrapper = doc.create_element("span", span::span_attributes(&target));
    if let Err(e) = doc.wrap_text(selection.node, expanded, wrapper) {
        tracing::debug!(error = %e, "Failed to wrap selection");
        return None;
    }

    Some(target)
}
