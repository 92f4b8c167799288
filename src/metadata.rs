//! Chapter metadata as consumed by the naming, fetch and assembly stages.

use serde::{Deserialize, Serialize};

/// Everything needed to name, fetch and archive one chapter.
///
/// Built from the upstream chapter record and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterMetadata {
    /// Chapter identifier.
    pub id: u64,
    /// Identifier of the owning title.
    pub manga_id: u64,
    /// Volume label; empty when the chapter has no volume.
    pub volume: String,
    /// Chapter number, possibly with a decimal sub-number (`"12.5"`).
    pub chapter: String,
    /// Chapter title (informational only).
    pub title: String,
    /// Service language code (`gb`, `fr`, ...).
    pub language: String,
    /// Ordered group/attribution names.
    pub groups: Vec<String>,
    /// Ordered remote page image names.
    pub pages: Vec<String>,
    /// Path fragment identifying the chapter's image directory.
    pub hash: String,
    /// Image server base URL.
    pub server: String,
}

impl ChapterMetadata {
    /// Base URL that page names are appended to: `<server><hash>/`.
    #[must_use]
    pub fn page_base_url(&self) -> String {
        let server = self.server.trim_end_matches('/');
        let hash = self.hash.trim_matches('/');
        format!("{server}/{hash}/")
    }

    /// Full remote URL for one page reference.
    #[must_use]
    pub fn page_url(&self, page_ref: &str) -> String {
        format!("{}{page_ref}", self.page_base_url())
    }
}

#[cfg(test)]
pub(crate) fn sample_chapter() -> ChapterMetadata {
    ChapterMetadata {
        id: 1001,
        manga_id: 47,
        volume: "3".to_string(),
        chapter: "12.5".to_string(),
        title: "The Return".to_string(),
        language: "gb".to_string(),
        groups: vec!["Scan Team".to_string()],
        pages: vec!["x1.png".to_string(), "x2.png".to_string()],
        hash: "abc123".to_string(),
        server: "https://s2.example.org/data/".to_string(),
    }
}
