//! Marginalia
//!
//! Anchors text highlights to a document and keeps them in sync with a
//! remote peer.
//!
//! # Modules
//!
//! - `anchor`: structural paths, offsets and word expansion
//! - `dom`: the in-memory document highlights are painted onto
//! - `store`: persisted local, remote, uploadable, upvoted and blacklisted
//!   stores
//! - `reconcile`: merging the stores into one renderable set
//! - `render`: painting and clearing highlight spans
//! - `remote`: the peer API and page identity
//! - `sync`: the upload scheduler
//! - `engine`: the `Highlighter` tying it together
//!
//! The peer server binary lives in main.rs and is built from `db`, `routes`
//! and `state`.

pub mod anchor;
pub mod config;
pub mod db;
pub mod dom;
pub mod engine;
pub mod error;
pub mod highlights;
pub mod reconcile;
pub mod remote;
pub mod render;
pub mod routes;
pub mod state;
pub mod store;
pub mod sync;

pub use engine::{Highlighter, HighlighterBuilder, TextSelection};
pub use highlights::{Action, Highlight, HighlightKind, LocalizedHighlight, TargetAttributes};
