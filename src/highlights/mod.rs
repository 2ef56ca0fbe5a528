//! Highlight data model
//!
//! - `Highlight`: the persisted unit, shared with the remote peer
//! - `HighlightKind`: closed set of rendering classes
//! - `LocalizedHighlight`: a highlight tagged with its kind at merge time
//! - `TargetAttributes`: what a span on the page reports about itself

mod types;

pub use types::{Action, Highlight, HighlightKind, LocalizedHighlight, TargetAttributes, UnknownKind};
