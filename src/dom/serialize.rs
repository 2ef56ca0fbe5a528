//! Markup serialization
//!
//! Serialization is canonical: parsing the output of `inner_html` and
//! serializing again yields the same string. Stored offsets index into this
//! form, so it must not change shape between releases.

use super::tree::{Document, NodeId, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

/// Escape text content the way `inner_html` writes it
pub fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Predicate marking elements whose tags are left out of a serialization
pub type Transparent<'a> = &'a dyn Fn(&Document, NodeId) -> bool;

fn opaque(_: &Document, _: NodeId) -> bool {
    false
}

impl Document {
    /// Serialized content of a node's children
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out, &opaque);
        }
        out
    }

    /// Serialized node including its own tag
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out, &opaque);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String, transparent: Transparent<'_>) {
        match self.kind(id) {
            NodeKind::Document => {
                for &child in self.children(id) {
                    self.write_node(child, out, transparent);
                }
            }
            NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeKind::Element(_) if transparent(self, id) => {
                for &child in self.children(id) {
                    self.write_node(child, out, transparent);
                }
            }
            NodeKind::Element(data) => {
                out.push('<');
                out.push_str(&data.tag);
                for (key, value) in &data.attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                let children = self.children(id);
                if children.is_empty() && is_void(&data.tag) {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &child in children {
                    self.write_node(child, out, transparent);
                }
                out.push_str("</");
                out.push_str(&data.tag);
                out.push('>');
            }
        }
    }

    /// Position, in UTF-16 code units of the parent's `inner_html`, of a
    /// character offset inside a text node
    pub fn content_offset(&self, text_node: NodeId, char_offset: usize) -> Option<usize> {
        self.content_offset_skipping(text_node, char_offset, &opaque)
    }

    /// Like `content_offset`, measured as if every element matching
    /// `transparent` were replaced by its children
    pub fn content_offset_skipping(
        &self,
        text_node: NodeId,
        char_offset: usize,
        transparent: Transparent<'_>,
    ) -> Option<usize> {
        let text = self.text(text_node)?;
        let parent = self.parent(text_node)?;

        let mut preceding = String::new();
        for &sibling in self.children(parent) {
            if sibling == text_node {
                break;
            }
            self.write_node(sibling, &mut preceding, transparent);
        }
        let offset = preceding.encode_utf16().count();

        if char_offset > text.chars().count() {
            return None;
        }
        let prefix: String = text.chars().take(char_offset).collect();
        Some(offset + escape_text(&prefix).encode_utf16().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_is_stable() {
        let source = "<div id=\"x\" title=\"a &quot;q&quot;\">a &lt; b <img src=\"c.png\"/><p></p></div>";
        let doc = Document::parse(source).unwrap();
        let first = doc.inner_html(doc.root());

        let reparsed = Document::parse(&first).unwrap();
        assert_eq!(reparsed.inner_html(reparsed.root()), first);
        assert!(first.contains("a &lt; b"));
        assert!(first.contains("<img src=\"c.png\"/>"));
        assert!(first.contains("<p></p>"));
    }

    #[test]
    fn test_content_offset_counts_markup() {
        let doc = Document::parse("<p>one <b>two</b> three &amp; four</p>").unwrap();
        let p = doc.document_element().unwrap();
        let tail = doc.children(p)[2];

        // "one <b>two</b>" is 14 units, then " three " is 7 more
        assert_eq!(doc.content_offset(tail, 7), Some(21));
        // "&" serializes as "&amp;"
        assert_eq!(doc.content_offset(tail, 8), Some(26));
        assert_eq!(doc.content_offset(tail, 100), None);
    }

    #[test]
    fn test_content_offset_skips_transparent_wrappers() {
        let doc = Document::parse("<p><mark>one <b>two</b></mark> three</p>").unwrap();
        let p = doc.document_element().unwrap();
        let tail = doc.children(p)[1];
        let is_mark = |doc: &Document, id: NodeId| doc.tag_name(id) == Some("mark");

        assert_eq!(doc.content_offset(tail, 1), Some(28));
        // "one <b>two</b>" without the <mark> wrapper
        assert_eq!(doc.content_offset_skipping(tail, 1, &is_mark), Some(15));
    }
}
