use serde::{Deserialize, Serialize};

/// Relations that wire the catalog hierarchy together. Links with any of
/// these rels are stripped before a document is re-attached elsewhere in a
/// tree or published to a new endpoint; all other rels pass through.
pub const STRUCTURAL_RELS: [&str; 6] = ["self", "root", "parent", "child", "item", "collection"];

/// A typed, directional reference between two documents.
///
/// `href` may be relative (to the directory of the owning document's
/// location) or absolute. For a given `(rel, href)` pair a document holds
/// at most one link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            media_type: None,
            title: None,
        }
    }

    pub fn is_structural(&self) -> bool {
        STRUCTURAL_RELS.contains(&self.rel.as_str())
    }
}
