//! The section row type, the unit stored and embedded.

use serde::{Deserialize, Serialize};

/// One token-bounded piece of a page's content.
///
/// Rows are append-only and ordered by insertion. Row *i*'s embedding lives
/// at position *i* of the embedding index; the two grow together or not at
/// all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Title of the source page.
    pub page_title: String,

    /// Heading of the source section. `None` for the lead section.
    pub section_heading: Option<String>,

    /// Zero-based position of this piece within its (possibly split)
    /// source section.
    pub section_index: u32,

    /// The piece's text content.
    pub content: String,

    /// Token count of `content` under the corpus tokenizer.
    pub token_count: u32,
}

impl Section {
    /// Create a new section row.
    pub fn new(
        page_title: impl Into<String>,
        section_heading: Option<String>,
        section_index: u32,
        content: impl Into<String>,
        token_count: u32,
    ) -> Self {
        Self {
            page_title: page_title.into(),
            section_heading,
            section_index,
            content: content.into(),
            token_count,
        }
    }
}
