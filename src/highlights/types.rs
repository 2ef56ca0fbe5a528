//! Highlight types shared by the client engine and the reference peer
//!
//! Field names on the wire follow the JSON produced by browser clients
//! (`xPath`, `startOffset`, ...), so stores written by either side stay
//! readable by the other.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A persisted highlight
///
/// Offsets are UTF-16 code units into the serialized content of the node
/// addressed by `path`, half-open: `[start_offset, end_offset)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Highlight {
    /// Identity assigned by the remote peer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Identity of the owning page, assigned by the remote peer
    #[serde(rename = "pageId", default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<i64>,
    /// Exact serialized content captured at creation time
    pub text: String,
    /// Structural address of the anchor element
    #[serde(rename = "xPath", alias = "path")]
    pub path: String,
    #[serde(rename = "startOffset")]
    pub start_offset: usize,
    #[serde(rename = "endOffset")]
    pub end_offset: usize,
    /// Creating user
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Highlight {
    /// Create a not-yet-uploaded highlight
    pub fn new(path: impl Into<String>, start_offset: usize, end_offset: usize, text: impl Into<String>) -> Self {
        Self {
            id: None,
            page_id: None,
            text: text.into(),
            path: path.into(),
            start_offset,
            end_offset,
            user_id: None,
        }
    }

    /// Set the peer-assigned identity
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the owning page
    pub fn with_page(mut self, page_id: i64) -> Self {
        self.page_id = Some(page_id);
        self
    }

    /// Set the creating user
    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    /// Whether both highlights cover the same span of the same element
    pub fn same_anchor(&self, other: &Highlight) -> bool {
        self.path == other.path
            && self.start_offset == other.start_offset
            && self.end_offset == other.end_offset
    }

    /// Tag with a kind for rendering
    pub fn localize(self, kind: HighlightKind) -> LocalizedHighlight {
        LocalizedHighlight {
            highlight: self,
            kind,
        }
    }
}

/// Rendering class of a highlight, assigned at merge time and never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    /// Uploaded by this client
    Local,
    /// Fetched from the peer
    Remote,
    /// Suppressed by the user
    Blacklisted,
    /// Unsaved selection preview
    Highlightable,
    /// Created here, waiting for upload
    Uploadable,
    /// Marked as upvoted by the user
    Upvoted,
}

impl HighlightKind {
    pub const ALL: [HighlightKind; 6] = [
        HighlightKind::Local,
        HighlightKind::Remote,
        HighlightKind::Blacklisted,
        HighlightKind::Highlightable,
        HighlightKind::Uploadable,
        HighlightKind::Upvoted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightKind::Local => "local",
            HighlightKind::Remote => "remote",
            HighlightKind::Blacklisted => "blacklisted",
            HighlightKind::Highlightable => "highlightable",
            HighlightKind::Uploadable => "uploadable",
            HighlightKind::Upvoted => "upvoted",
        }
    }

    /// Actions offered for a highlight of this kind
    pub fn actions(&self) -> &'static [Action] {
        match self {
            HighlightKind::Highlightable => &[Action::Highlight, Action::Copy, Action::Share],
            HighlightKind::Local => &[Action::Unhighlight, Action::Copy, Action::Share],
            HighlightKind::Uploadable => &[Action::Unhighlight, Action::Copy, Action::Share],
            HighlightKind::Remote => &[Action::Upvote, Action::Blacklist, Action::Copy, Action::Share],
            HighlightKind::Upvoted => &[Action::Blacklist, Action::Copy, Action::Share],
            HighlightKind::Blacklisted => &[],
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.actions().contains(&action)
    }
}

impl fmt::Display for HighlightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown highlight kind
#[derive(Debug, thiserror::Error)]
#[error("Unknown highlight kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for HighlightKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HighlightKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// User-facing operations on a highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Highlight,
    Unhighlight,
    Copy,
    Share,
    Blacklist,
    Upvote,
}

/// A highlight tagged with its rendering kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedHighlight {
    #[serde(flatten)]
    pub highlight: Highlight,
    #[serde(rename = "type")]
    pub kind: HighlightKind,
}

/// What a painted or previewed span says about itself
///
/// Handed to user-action callbacks at the moment of invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAttributes {
    #[serde(rename = "type")]
    pub kind: HighlightKind,
    #[serde(rename = "startOffset")]
    pub start_offset: usize,
    #[serde(rename = "endOffset")]
    pub end_offset: usize,
    pub text: String,
    #[serde(rename = "xPath")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl TargetAttributes {
    /// The highlight these attributes describe, without peer metadata
    pub fn to_highlight(&self) -> Highlight {
        Highlight {
            id: self.id,
            page_id: None,
            text: self.text.clone(),
            path: self.path.clone(),
            start_offset: self.start_offset,
            end_offset: self.end_offset,
            user_id: None,
        }
    }
}

impl From<&LocalizedHighlight> for TargetAttributes {
    fn from(localized: &LocalizedHighlight) -> Self {
        let h = &localized.highlight;
        Self {
            kind: localized.kind,
            start_offset: h.start_offset,
            end_offset: h.end_offset,
            text: h.text.clone(),
            path: h.path.clone(),
            id: h.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let highlight = Highlight::new("BODY/P[2]", 4, 7, "cat").with_id(12).with_page(3);
        let json = serde_json::to_string(&highlight).unwrap();

        assert!(json.contains("\"xPath\":\"BODY/P[2]\""));
        assert!(json.contains("\"startOffset\":4"));
        assert!(json.contains("\"pageId\":3"));
        assert!(!json.contains("userId"));
    }

    #[test]
    fn test_parse_browser_payload() {
        let json = r#"{"id":5,"text":"word","xPath":"id(\"main\")/P[1]","startOffset":5,"endOffset":9}"#;
        let highlight: Highlight = serde_json::from_str(json).unwrap();

        assert_eq!(highlight.id, Some(5));
        assert_eq!(highlight.page_id, None);
        assert_eq!(highlight.path, "id(\"main\")/P[1]");
        assert_eq!(highlight.end_offset, 9);
    }

    #[test]
    fn test_localized_serializes_flat() {
        let localized = Highlight::new("BODY", 0, 3, "abc").localize(HighlightKind::Uploadable);
        let value = serde_json::to_value(&localized).unwrap();

        assert_eq!(value["type"], "uploadable");
        assert_eq!(value["xPath"], "BODY");
    }

    #[test]
    fn test_kind_parse() {
        for kind in HighlightKind::ALL {
            assert_eq!(kind.as_str().parse::<HighlightKind>().unwrap(), kind);
        }
        assert!("undefined".parse::<HighlightKind>().is_err());
    }

    #[test]
    fn test_actions_per_kind() {
        assert!(HighlightKind::Highlightable.allows(Action::Highlight));
        assert!(HighlightKind::Remote.allows(Action::Blacklist));
        assert!(!HighlightKind::Remote.allows(Action::Unhighlight));
        assert!(!HighlightKind::Upvoted.allows(Action::Upvote));
        assert!(HighlightKind::Blacklisted.actions().is_empty());
    }
}
