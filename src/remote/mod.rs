//! Talking to the remote highlight peer

mod client;
mod hash;
#[cfg(test)]
pub(crate) mod mock;

pub use client::{HighlightsApi, HttpHighlightsApi, TransportError};
pub use hash::{djb2, InvalidPageUrl, PageIdentity, SHARE_PARAM};
