//! Painting highlights into a document

use std::collections::HashMap;

use crate::anchor::{resolve_anchor, resolve_path, AnchorError, TextAnchor};
use crate::dom::{Document, NodeId};
use crate::highlights::{HighlightKind, LocalizedHighlight, TargetAttributes};

use super::span::{self, HIGHLIGHT_CLASS, QUERIED_CLASS};
use super::RenderReport;

/// Unwrap every highlight span, restoring the original markup
pub fn clear_highlights(doc: &mut Document) -> usize {
    let spans: Vec<NodeId> = doc
        .elements_with_class(HIGHLIGHT_CLASS)
        .into_iter()
        .filter(|&node| span::is_highlight_span(doc, node))
        .collect();
    unwrap_all(doc, spans)
}

/// Unwrap only unsaved selection previews
pub fn clear_previews(doc: &mut Document) -> usize {
    let previews: Vec<NodeId> = doc
        .elements_with_class(HIGHLIGHT_CLASS)
        .into_iter()
        .filter(|&node| {
            span::is_highlight_span(doc, node)
                && doc.attribute(node, span::ATTR_TYPE) == Some(HighlightKind::Highlightable.as_str())
        })
        .collect();
    unwrap_all(doc, previews)
}

fn unwrap_all(doc: &mut Document, spans: Vec<NodeId>) -> usize {
    let mut removed = 0;
    // Innermost first so nested spans unwrap cleanly
    for node in spans.into_iter().rev() {
        if doc.unwrap(node).is_ok() {
            removed += 1;
        }
    }
    removed
}

/// Mark the element addressed by `path` as the one a shared link points at
pub fn focus(doc: &mut Document, path: &str) -> bool {
    match resolve_path(doc, path) {
        Some(node) => doc.add_class(node, QUERIED_CLASS).is_ok(),
        None => false,
    }
}

struct Accepted {
    index: usize,
    anchor: TextAnchor,
}

/// Clear existing highlights and paint `highlights`
///
/// Entries that no longer resolve, whose stored text has drifted, or that
/// overlap an earlier entry in the same element are skipped. Within an
/// element, spans are inserted from the highest start offset down so earlier
/// offsets stay valid. Elements are processed in reverse document order so
/// that rewriting one element never replaces another still waiting to be
/// painted.
pub fn paint(doc: &mut Document, highlights: &[LocalizedHighlight]) -> RenderReport {
    clear_highlights(doc);

    let mut report = RenderReport::default();
    let mut groups: HashMap<NodeId, Vec<Accepted>> = HashMap::new();

    for (index, localized) in highlights.iter().enumerate() {
        let (node, anchor) = match resolve_anchor(doc, &localized.highlight) {
            Ok(resolved) => resolved,
            Err(reason) => {
                report.skip(localized, reason);
                continue;
            }
        };

        let group = groups.entry(node).or_default();
        if let Some(other) = group.iter().find(|a| overlaps(&a.anchor, &anchor)) {
            let reason = AnchorError::Overlap {
                start: other.anchor.start_offset,
                end: other.anchor.end_offset,
            };
            report.skip(localized, reason);
            continue;
        }
        group.push(Accepted { index, anchor });
    }

    let order: HashMap<NodeId, usize> = doc
        .descendants(doc.root())
        .into_iter()
        .enumerate()
        .map(|(position, node)| (node, position))
        .collect();
    let mut nodes: Vec<NodeId> = groups.keys().copied().collect();
    nodes.sort_by_key(|node| std::cmp::Reverse(order.get(node).copied().unwrap_or(0)));

    for node in nodes {
        let Some(mut group) = groups.remove(&node) else {
            continue;
        };
        group.sort_by_key(|accepted| std::cmp::Reverse(accepted.anchor.start_offset));

        for accepted in group {
            let localized = &highlights[accepted.index];
            match paint_one(doc, node, accepted.anchor, localized) {
                Ok(()) => report.painted += 1,
                Err(reason) => report.skip(localized, reason),
            }
        }
    }

    report
}

fn overlaps(a: &TextAnchor, b: &TextAnchor) -> bool {
    a.start_offset < b.end_offset && b.start_offset < a.end_offset
}

fn paint_one(
    doc: &mut Document,
    node: NodeId,
    anchor: TextAnchor,
    localized: &LocalizedHighlight,
) -> Result<(), AnchorError> {
    let content = doc.inner_html(node);
    // A descendant painted earlier may have changed this element's content
    anchor.validate(&content, &localized.highlight.text)?;
    let (before, within, after) = anchor.split(&content).ok_or(AnchorError::Drift {
        start: anchor.start_offset,
        end: anchor.end_offset,
    })?;

    let target = TargetAttributes::from(localized);
    let markup = format!("{}{}{}</span>{}", before, span::open_tag(&target), within, after);
    doc.set_inner_html(node, &markup)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlights::Highlight;

    const PAGE: &str = "<html><body><p>the cat sat on the mat</p><p>second <em>para</em> here</p></body></html>";

    fn first_p(doc: &Document) -> NodeId {
        doc.element_children(doc.body().unwrap())[0]
    }

    fn local(path: &str, start: usize, text: &str) -> LocalizedHighlight {
        Highlight::new(path, start, start + text.len(), text).localize(HighlightKind::Local)
    }

    #[test]
    fn test_paint_single() {
        let mut doc = Document::parse(PAGE).unwrap();
        let report = paint(&mut doc, &[local("BODY/P[1]", 4, "cat")]);

        assert_eq!(report.painted, 1);
        let html = doc.inner_html(first_p(&doc));
        assert!(html.starts_with("the <span class=\"highlighted\""));
        assert!(html.contains("data-highlight-type=\"local\""));
        assert!(html.ends_with(">cat</span> sat on the mat"));
    }

    #[test]
    fn test_multiple_in_one_element_keep_offsets() {
        let mut doc = Document::parse(PAGE).unwrap();
        let highlights = [local("BODY/P[1]", 0, "the"), local("BODY/P[1]", 19, "mat")];
        let report = paint(&mut doc, &highlights);

        assert_eq!(report.painted, 2);
        let p = first_p(&doc);
        let spans: Vec<_> = doc
            .element_children(p)
            .into_iter()
            .filter_map(|span| span::target_attributes(&doc, span))
            .collect();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "the");
        assert_eq!(spans[1].text, "mat");
        assert_eq!(doc.text_content(p), "the cat sat on the mat");
    }

    #[test]
    fn test_overlap_keeps_earlier_entry() {
        let mut doc = Document::parse(PAGE).unwrap();
        let highlights = [local("BODY/P[1]", 4, "cat sat"), local("BODY/P[1]", 8, "sat on")];
        let report = paint(&mut doc, &highlights);

        assert_eq!(report.painted, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0].reason, AnchorError::Overlap { start: 4, end: 11 }));
        assert_eq!(report.skipped[0].highlight, highlights[1]);
    }

    #[test]
    fn test_drifted_and_unresolved_skipped() {
        let mut doc = Document::parse(PAGE).unwrap();
        let highlights = [
            local("BODY/P[1]", 4, "dog"),
            local("BODY/P[9]", 0, "x"),
            local("BODY/P[2]", 0, "second"),
        ];
        let report = paint(&mut doc, &highlights);

        assert_eq!(report.painted, 1);
        assert!(matches!(report.skipped[0].reason, AnchorError::Drift { .. }));
        assert!(matches!(report.skipped[1].reason, AnchorError::Unresolved(_)));
    }

    #[test]
    fn test_markup_inside_range() {
        let mut doc = Document::parse(PAGE).unwrap();
        let report = paint(&mut doc, &[local("BODY/P[2]", 7, "<em>para</em>")]);

        assert_eq!(report.painted, 1);
        let p = doc.element_children(doc.body().unwrap())[1];
        assert!(doc.inner_html(p).contains("\"><em>para</em></span> here"));
    }

    #[test]
    fn test_range_cutting_through_tag_is_skipped() {
        let mut doc = Document::parse(PAGE).unwrap();
        let report = paint(&mut doc, &[local("BODY/P[2]", 7, "<em>pa")]);

        assert_eq!(report.painted, 0);
        assert!(matches!(report.skipped[0].reason, AnchorError::Markup(_)));
        let p = doc.element_children(doc.body().unwrap())[1];
        assert_eq!(doc.inner_html(p), "second <em>para</em> here");
    }

    #[test]
    fn test_nested_elements_both_painted() {
        let mut doc = Document::parse(PAGE).unwrap();
        let highlights = [local("BODY/P[2]", 0, "second"), local("BODY/P[2]/EM[1]", 0, "para")];
        let report = paint(&mut doc, &highlights);

        assert_eq!(report.painted, 2);
        let p = doc.element_children(doc.body().unwrap())[1];
        assert_eq!(doc.elements_with_class(HIGHLIGHT_CLASS).len(), 2);
        assert_eq!(doc.text_content(p), "second para here");
    }

    #[test]
    fn test_repaint_is_idempotent() {
        let mut doc = Document::parse(PAGE).unwrap();
        let highlights = [local("BODY/P[1]", 4, "cat")];
        paint(&mut doc, &highlights);
        let once = doc.inner_html(doc.root());
        paint(&mut doc, &highlights);

        assert_eq!(doc.inner_html(doc.root()), once);
    }

    #[test]
    fn test_clear_restores_markup() {
        let mut doc = Document::parse(PAGE).unwrap();
        let original = doc.inner_html(doc.root());
        paint(&mut doc, &[local("BODY/P[1]", 4, "cat"), local("BODY/P[2]/EM[1]", 0, "para")]);

        assert_eq!(clear_highlights(&mut doc), 2);
        assert_eq!(doc.inner_html(doc.root()), original);
    }

    #[test]
    fn test_clear_previews_only() {
        let mut doc = Document::parse(PAGE).unwrap();
        let preview = Highlight::new("BODY/P[1]", 0, 3, "the").localize(HighlightKind::Highlightable);
        paint(&mut doc, &[preview, local("BODY/P[1]", 4, "cat")]);

        assert_eq!(clear_previews(&mut doc), 1);
        let remaining = doc.elements_with_class(HIGHLIGHT_CLASS);
        assert_eq!(remaining.len(), 1);
        assert_eq!(doc.attribute(remaining[0], span::ATTR_TYPE), Some("local"));
    }

    #[test]
    fn test_focus() {
        let mut doc = Document::parse(PAGE).unwrap();
        assert!(focus(&mut doc, "BODY/P[2]"));
        assert!(!focus(&mut doc, "BODY/P[5]"));

        let p = doc.element_children(doc.body().unwrap())[1];
        assert!(doc.has_class(p, QUERIED_CLASS));
    }
}
