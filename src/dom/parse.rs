//! XHTML parsing into a `Document`
//!
//! Markup must be well-formed XML. Comments, processing instructions and
//! doctypes are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::tree::{Document, DomError, NodeId};

/// The five XML entities plus named ones common in XHTML content
fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some("\u{a0}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "hellip" => Some("\u{2026}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        "ldquo" => Some("\u{201c}"),
        "rdquo" => Some("\u{201d}"),
        "copy" => Some("\u{a9}"),
        _ => None,
    }
}

impl Document {
    /// Parse a complete document or a fragment
    pub fn parse(markup: &str) -> Result<Self, DomError> {
        let mut doc = Document::new();
        let root = doc.root();
        doc.parse_into(root, markup)?;
        Ok(doc)
    }

    /// Replace the children of `id` with the nodes parsed from `markup`
    ///
    /// On error the existing children are left untouched.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Result<(), DomError> {
        let holder = self.create_element("template", Vec::new());
        self.parse_into(holder, markup)?;

        self.clear_children(id);
        for child in self.children(holder).to_vec() {
            self.append_child(id, child);
        }
        Ok(())
    }

    fn parse_into(&mut self, parent: NodeId, markup: &str) -> Result<(), DomError> {
        let mut reader = Reader::from_str(markup);
        reader.trim_text(false);
        reader.check_end_names(true);

        let mut stack = vec![parent];

        loop {
            let position = reader.buffer_position();
            let event = reader.read_event().map_err(|e| DomError::Parse {
                position,
                message: e.to_string(),
            })?;

            // The stack always holds at least `parent`
            let top = stack[stack.len() - 1];

            match event {
                Event::Start(start) => {
                    let element = self.element_from(&start, position)?;
                    self.append_child(top, element);
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = self.element_from(&start, position)?;
                    self.append_child(top, element);
                }
                Event::End(_) => {
                    if stack.len() == 1 {
                        return Err(DomError::UnexpectedClose(position));
                    }
                    stack.pop();
                }
                Event::Text(text) => {
                    let text = text.unescape_with(html_entity).map_err(|e| DomError::Parse {
                        position,
                        message: e.to_string(),
                    })?;
                    self.append_text(top, &text);
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    self.append_text(top, &text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() > 1 {
            let open = stack[stack.len() - 1];
            return Err(DomError::Unclosed(
                self.tag_name(open).unwrap_or_default().to_string(),
            ));
        }

        Ok(())
    }

    fn element_from(&mut self, start: &BytesStart<'_>, position: usize) -> Result<NodeId, DomError> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| DomError::Parse {
                position,
                message: e.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| DomError::Parse {
                    position,
                    message: e.to_string(),
                })?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(self.create_element(&tag, attributes))
    }

    /// Append text, merging with a trailing text sibling
    fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(&last) = self.children(parent).last() {
            if let Some(existing) = self.text(last) {
                let merged = format!("{}{}", existing, text);
                let node = self.create_text(&merged);
                let index = self.children(parent).len() - 1;
                self.detach(last);
                self.insert_child(parent, index, node);
                return;
            }
        }
        let node = self.create_text(text);
        self.append_child(parent, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let doc = Document::parse("<body><p>Hello <em>big</em> world</p><br/></body>").unwrap();
        let body = doc.body().unwrap();
        let children = doc.element_children(body);

        assert_eq!(children.len(), 2);
        assert_eq!(doc.tag_name(children[1]), Some("br"));
        assert_eq!(doc.text_content(children[0]), "Hello big world");
    }

    #[test]
    fn test_entities() {
        let doc = Document::parse("<p>a &amp; b&nbsp;c</p>").unwrap();
        let p = doc.document_element().unwrap();
        assert_eq!(doc.text_content(p), "a & b\u{a0}c");
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(Document::parse("<p><em>x</p></em>").is_err());
        assert!(Document::parse("<p>open").is_err());
        assert!(Document::parse("text</p>").is_err());
    }

    #[test]
    fn test_set_inner_html_keeps_content_on_error() {
        let mut doc = Document::parse("<p>keep me</p>").unwrap();
        let p = doc.document_element().unwrap();

        assert!(doc.set_inner_html(p, "<b>broken").is_err());
        assert_eq!(doc.inner_html(p), "keep me");

        doc.set_inner_html(p, "now <b>bold</b>").unwrap();
        assert_eq!(doc.inner_html(p), "now <b>bold</b>");
    }
}
