//! Document tree module
//!
//! An in-memory XHTML tree that highlights are anchored into and painted
//! onto. Provides:
//! - parsing of well-formed markup (`quick-xml`)
//! - canonical `inner_html` serialization, the coordinate space of stored
//!   offsets
//! - the small set of mutations painting needs: wrap a text range, unwrap an
//!   element, replace an element's content

mod parse;
mod serialize;
mod tree;

use std::sync::Arc;

use parking_lot::Mutex;

pub use serialize::{escape_text, Transparent};
pub use tree::{Document, DomError, ElementData, NodeId, NodeKind};

/// A document shared between the host and the renderer
pub type SharedDocument = Arc<Mutex<Document>>;

/// Wrap a document for sharing
pub fn shared(document: Document) -> SharedDocument {
    Arc::new(Mutex::new(document))
}
