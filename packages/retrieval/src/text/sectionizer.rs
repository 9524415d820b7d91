//! Splits a page's raw source text into token-bounded sections.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::text::tokenizer::Tokenizer;
use crate::types::Section;

/// Section headings whose content is never indexed.
///
/// Matched case-insensitively against the trimmed heading text. The lead
/// section (no heading) is always kept.
pub const DISCARD_HEADINGS: [&str; 18] = [
    "See also",
    "References",
    "External links",
    "Further reading",
    "Footnotes",
    "Bibliography",
    "Sources",
    "Citations",
    "Literature",
    "Notes and references",
    "Photo gallery",
    "Works cited",
    "Photos",
    "Gallery",
    "Notes",
    "References and sources",
    "References and notes",
    "General and cited references",
];

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(={2,6})\s*(.*?)\s*(={2,6})\s*$").unwrap());

/// Parse raw page markup into an ordered sequence of `(heading, body)`.
///
/// A heading is a line of the form `== Heading ==` (two to six equals
/// signs). Text before the first heading is the lead and carries heading
/// `None`. This is the only markup parsing in the library.
pub fn parse_sections(raw_page: &str) -> Vec<(Option<String>, String)> {
    let mut sections = Vec::new();
    let mut heading: Option<String> = None;
    let mut body = String::new();

    for line in raw_page.lines() {
        if let Some(caps) = HEADING_RE.captures(line) {
            sections.push((heading.take(), std::mem::take(&mut body)));
            heading = Some(caps[2].to_string());
        } else {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(line);
        }
    }
    sections.push((heading, body));
    sections
}

fn is_discarded(heading: &str) -> bool {
    let trimmed = heading.trim();
    DISCARD_HEADINGS
        .iter()
        .any(|d| d.eq_ignore_ascii_case(trimmed))
}

/// Turns pages into [`Section`] rows bounded by a token ceiling.
#[derive(Debug, Clone)]
pub struct Sectionizer {
    tokenizer: Arc<Tokenizer>,
    max_section_tokens: usize,
}

impl Sectionizer {
    /// Create a sectionizer with the given token ceiling per piece.
    pub fn new(tokenizer: Arc<Tokenizer>, max_section_tokens: usize) -> Self {
        Self {
            tokenizer,
            max_section_tokens,
        }
    }

    /// The configured token ceiling.
    pub fn max_section_tokens(&self) -> usize {
        self.max_section_tokens
    }

    /// Split a page into section rows, in page order.
    ///
    /// Discard-listed sections are dropped whole; retained sections below the
    /// token ceiling are emitted unsplit with `section_index = 0`, larger
    /// ones are split on sentence boundaries and numbered in emission order.
    pub fn split(&self, page_title: &str, raw_page: &str) -> Vec<Section> {
        let mut rows = Vec::new();
        for (heading, body) in parse_sections(raw_page) {
            if let Some(h) = heading.as_deref() {
                if is_discarded(h) {
                    continue;
                }
            }
            if body.trim().is_empty() {
                continue;
            }
            for (i, (content, token_count)) in self.bounded_pieces(&body).into_iter().enumerate() {
                rows.push(Section::new(
                    page_title,
                    heading.clone(),
                    i as u32,
                    content,
                    token_count as u32,
                ));
            }
        }
        rows
    }

    /// Split `text` into pieces under the token ceiling.
    ///
    /// Sentences accumulate into a run, charging one token for each joining
    /// space; the sentence that would push the run to the ceiling closes it
    /// and starts the next run.
    fn bounded_pieces(&self, text: &str) -> Vec<(String, usize)> {
        let total = self.tokenizer.count(text);
        if total < self.max_section_tokens {
            return vec![(text.to_string(), total)];
        }

        let flattened = text.replace('\n', " ");
        let sentences: Vec<&str> = flattened.unicode_sentences().collect();

        let mut pieces = Vec::new();
        let mut run_start = 0;
        let mut running = 0usize;
        for (i, sentence) in sentences.iter().enumerate() {
            running += 1 + self.tokenizer.count(sentence);
            if running >= self.max_section_tokens {
                self.close_run(&sentences[run_start..i], &mut pieces);
                running = 0;
                run_start = i;
            }
        }
        self.close_run(&sentences[run_start..], &mut pieces);
        pieces
    }

    fn close_run(&self, run: &[&str], pieces: &mut Vec<(String, usize)>) {
        if run.is_empty() {
            return;
        }
        let joined = run
            .iter()
            .map(|s| s.trim())
            .collect::<Vec<_>>()
            .join(" ");
        let token_count = self.tokenizer.count(&joined);
        // A run whose joined text alone exceeds the ceiling is dropped,
        // never truncated. Pinned behavior.
        if token_count <= self.max_section_tokens {
            pieces.push((joined, token_count));
        }
    }
}
