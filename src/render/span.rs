//! Highlight span markup
//!
//! Every painted or previewed highlight is a `<span class="highlighted">`
//! carrying its anchor in `data-highlight-*` attributes, so a span is
//! self-describing when the user interacts with it.

use crate::dom::{Document, NodeId};
use crate::highlights::{HighlightKind, TargetAttributes};

pub const HIGHLIGHT_CLASS: &str = "highlighted";
pub const QUERIED_CLASS: &str = "queried";

pub const ATTR_START: &str = "data-highlight-start-offset";
pub const ATTR_END: &str = "data-highlight-end-offset";
pub const ATTR_TYPE: &str = "data-highlight-type";
pub const ATTR_ID: &str = "data-highlight-id";
pub const ATTR_PATH: &str = "data-highlight-xpath";

/// Attributes of the span describing `target`, in output order
pub fn span_attributes(target: &TargetAttributes) -> Vec<(String, String)> {
    let mut attributes = vec![
        ("class".to_string(), HIGHLIGHT_CLASS.to_string()),
        (ATTR_START.to_string(), target.start_offset.to_string()),
        (ATTR_END.to_string(), target.end_offset.to_string()),
        (ATTR_TYPE.to_string(), target.kind.to_string()),
    ];
    if let Some(id) = target.id {
        attributes.push((ATTR_ID.to_string(), id.to_string()));
    }
    attributes.push((ATTR_PATH.to_string(), target.path.clone()));
    attributes
}

/// Serialized opening tag for `target`
pub fn open_tag(target: &TargetAttributes) -> String {
    let mut tag = String::from("<span");
    for (key, value) in span_attributes(target) {
        tag.push(' ');
        tag.push_str(&key);
        tag.push_str("=\"");
        tag.push_str(&html_escape::encode_double_quoted_attribute(&value));
        tag.push('"');
    }
    tag.push('>');
    tag
}

pub fn is_highlight_span(doc: &Document, node: NodeId) -> bool {
    doc.tag_name(node)
        .map(|tag| tag.eq_ignore_ascii_case("span"))
        .unwrap_or(false)
        && doc.has_class(node, HIGHLIGHT_CLASS)
}

/// Read back what a span says about itself
///
/// The text is the span's serialized content, which is exactly what was
/// stored when the highlight was created.
pub fn target_attributes(doc: &Document, span: NodeId) -> Option<TargetAttributes> {
    if !is_highlight_span(doc, span) {
        return None;
    }

    let kind: HighlightKind = doc.attribute(span, ATTR_TYPE)?.parse().ok()?;
    let start_offset = doc.attribute(span, ATTR_START)?.parse().ok()?;
    let end_offset = doc.attribute(span, ATTR_END)?.parse().ok()?;
    let path = doc.attribute(span, ATTR_PATH)?.to_string();
    let id = doc.attribute(span, ATTR_ID).and_then(|id| id.parse().ok());

    Some(TargetAttributes {
        kind,
        start_offset,
        end_offset,
        text: doc.inner_html(span),
        path,
        id,
    })
}
