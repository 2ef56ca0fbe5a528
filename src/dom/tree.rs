//! Arena-backed document tree
//!
//! Nodes live in a single `Vec` and are addressed by `NodeId`. Removing a
//! node only detaches it; its id stays valid but it is no longer reachable
//! from the root.

use std::ops::Range;

use thiserror::Error;

/// Document tree errors
#[derive(Debug, Error)]
pub enum DomError {
    #[error("Malformed markup at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Unclosed element <{0}>")]
    Unclosed(String),

    #[error("Unexpected closing tag at byte {0}")]
    UnexpectedClose(usize),

    #[error("Node is not a text node")]
    NotText,

    #[error("Node is not an element")]
    NotElement,

    #[error("Range {start}..{end} is outside text of length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    #[error("Node is detached from the document")]
    Detached,
}

/// Handle to a node in a `Document`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Element name and attributes, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable document tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The first top-level element
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| self.is_element(id))
    }

    /// The `body` element, if the document has one
    pub fn body(&self) -> Option<NodeId> {
        self.descendants(self.root()).into_iter().find(|&id| {
            self.tag_name(id)
                .map(|tag| tag.eq_ignore_ascii_case("body"))
                .unwrap_or(false)
        })
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text(_))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element(data) => Some(data.tag.as_str()),
            _ => None,
        }
    }

    /// Content of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element(data) => data
                .attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(data) => {
                match data.attributes.iter_mut().find(|(key, _)| key == name) {
                    Some((_, existing)) => *existing = value.to_string(),
                    None => data.attributes.push((name.to_string(), value.to_string())),
                }
                Ok(())
            }
            _ => Err(DomError::NotElement),
        }
    }

    /// The element's `id` attribute; an empty value counts as unset
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.attribute(id, "id").filter(|value| !value.is_empty())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        if self.has_class(id, class) {
            return Ok(());
        }
        let classes = match self.attribute(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute(id, "class", &classes)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children only
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
            .collect()
    }

    /// Nearest ancestor (or self) that is an element
    pub fn closest_element(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_element(node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Whether the node is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.root()
    }

    /// All descendants in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// First attached element whose `id` attribute equals `value`
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        if value.is_empty() {
            return None;
        }
        self.descendants(self.root())
            .into_iter()
            .find(|&node| self.element_id(node) == Some(value))
    }

    /// Attached elements carrying `class`, in document order
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&node| self.has_class(node, class))
            .collect()
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str, attributes: Vec<(String, String)>) -> NodeId {
        self.push_node(NodeKind::Element(ElementData {
            tag: tag.to_string(),
            attributes,
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` at `index` among `parent`'s children
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let index = index.min(self.nodes[parent.0].children.len());
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
    }

    /// Remove a node from its parent; the subtree stays intact
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&child| child != id);
        }
    }

    /// Remove every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    /// Replace an element with its own children
    pub fn unwrap(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.parent(id).ok_or(DomError::Detached)?;
        let index = self.index_in_parent(id).ok_or(DomError::Detached)?;
        let children = self.children(id).to_vec();
        self.detach(id);
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child(parent, index + offset, child);
        }
        self.normalize(parent);
        Ok(())
    }

    /// Merge adjacent text nodes and drop empty ones, recursively
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        for child in children {
            let text = self.text(child).map(str::to_string);
            match text {
                Some(text) if text.is_empty() => {
                    self.nodes[child.0].parent = None;
                }
                Some(text) => {
                    let previous = kept.last().copied().filter(|&prev| self.is_text(prev));
                    match previous {
                        Some(prev) => {
                            if let NodeKind::Text(existing) = &mut self.nodes[prev.0].kind {
                                existing.push_str(&text);
                            }
                            self.nodes[child.0].parent = None;
                        }
                        None => kept.push(child),
                    }
                }
                None => {
                    self.normalize(child);
                    kept.push(child);
                }
            }
        }
        self.nodes[id.0].children = kept;
    }

    /// Split a text node around a character range and wrap the middle part
    /// in `wrapper`
    ///
    /// `range` counts characters of the text node. Returns the wrapper.
    pub fn wrap_text(
        &mut self,
        text_node: NodeId,
        range: Range<usize>,
        wrapper: NodeId,
    ) -> Result<NodeId, DomError> {
        let text = self.text(text_node).ok_or(DomError::NotText)?.to_string();
        let len = text.chars().count();
        if range.start > range.end || range.end > len {
            return Err(DomError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        let parent = self.parent(text_node).ok_or(DomError::Detached)?;
        let index = self.index_in_parent(text_node).ok_or(DomError::Detached)?;

        let before: String = text.chars().take(range.start).collect();
        let middle: String = text.chars().skip(range.start).take(range.end - range.start).collect();
        let after: String = text.chars().skip(range.end).collect();

        self.detach(text_node);
        let mut position = index;
        if !before.is_empty() {
            let node = self.create_text(&before);
            self.insert_child(parent, position, node);
            position += 1;
        }
        let inner = self.create_text(&middle);
        self.append_child(wrapper, inner);
        self.insert_child(parent, position, wrapper);
        position += 1;
        if !after.is_empty() {
            let node = self.create_text(&after);
            self.insert_child(parent, position, node);
        }
        Ok(wrapper)
    }
}
