//! Content model and enumeration
//!
//! This module owns the [`Item`] value type (an immutable snapshot of one
//! exportable content item), the [`ContentSource`] trait for enumerating
//! items, and the extraction logic that turns an item into a normalized
//! text artifact.

mod extract;
mod source;

pub use extract::{extract_content, summarize_body};
pub use source::{ContentSource, KindStats, SourceError, SourceResult, SqliteContentSource};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An exportable content item, snapshotted at enumeration time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub excerpt: Option<String>,
    pub permalink: String,
    pub author: Option<String>,
    /// RFC 3339 publication timestamp; enumeration orders newest-first on it
    pub published_at: String,
    /// Taxonomy label -> term names, rendered when `include_taxonomies` is set
    #[serde(default)]
    pub taxonomies: BTreeMap<String, Vec<String>>,
    /// Access-restricted items are silently dropped at enumeration
    pub restricted: bool,
    /// Items opted out of indexing are silently dropped at enumeration
    pub noindex: bool,
}

impl Item {
    /// Deterministic artifact filename, collision-resistant via the id
    pub fn artifact_filename(&self) -> String {
        format!("{}_{}_{}.md", self.kind, self.id, self.slug)
    }
}

/// Display label for a content kind (capitalized kind name)
pub fn kind_label(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_filename() {
        let item = Item {
            id: 42,
            kind: "post".to_string(),
            title: "Hello World".to_string(),
            slug: "hello-world".to_string(),
            body: String::new(),
            excerpt: None,
            permalink: "https://example.com/hello-world".to_string(),
            author: None,
            published_at: "2026-01-01T00:00:00Z".to_string(),
            taxonomies: BTreeMap::new(),
            restricted: false,
            noindex: false,
        };
        assert_eq!(item.artifact_filename(), "post_42_hello-world.md");
    }

    #[test]
    fn test_kind_label() {
        assert_eq!(kind_label("post"), "Post");
        assert_eq!(kind_label("case_study"), "Case_study");
        assert_eq!(kind_label(""), "");
    }
}
