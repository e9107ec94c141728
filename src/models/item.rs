//! Parsed article data structure.

use serde::{Deserialize, Serialize};

/// An article extracted from a candidate link.
///
/// Dates are best-effort strings in `YYYY.MM.DD` form; an empty string means
/// no date was found, which is a normal state rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ParsedItem {
    /// Full URL of the article page
    pub url: String,

    /// Article title (falls back to the URL when the page has none)
    pub title: String,

    /// Publication date, empty if not found
    pub published: String,

    /// Last-updated date, empty if not found
    pub updated: String,

    /// Collapsed main body text, empty for title-only rules
    pub body: String,

    /// Whether the item matched the site rule's keywords
    pub hit: bool,
}

impl ParsedItem {
    /// The date that identifies this revision of the item: the updated
    /// date when present, otherwise the published date.
    pub fn revision_date(&self) -> &str {
        if self.updated.is_empty() {
            &self.published
        } else {
            &self.updated
        }
    }
}
