//! The authoritative table of indexed sections.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, RetrievalError};
use crate::store::embedding::EmbeddingIndex;
use crate::text::Sectionizer;
use crate::traits::EmbeddingProvider;
use crate::types::Section;

/// Ordinally-aligned store of section rows and their embeddings.
///
/// Row *i*'s embedding lives at position *i* of the embedding index. No row
/// is appended unless its embedding has been appended first, and both grow
/// by the same count in the same operation. Rows are never deleted or
/// reordered.
pub struct SectionStore<E> {
    index: EmbeddingIndex<E>,
    sectionizer: Sectionizer,
    rows: RwLock<Vec<Section>>,
    // Serializes the embed-then-append pair; reads stay lock-free against
    // an append-only table.
    write_lock: tokio::sync::Mutex<()>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    saved_at: DateTime<Utc>,
    row_count: usize,
    rows: Vec<Section>,
}

impl<E: EmbeddingProvider> SectionStore<E> {
    /// Create an empty store.
    pub fn new(index: EmbeddingIndex<E>, sectionizer: Sectionizer) -> Self {
        Self {
            index,
            sectionizer,
            rows: RwLock::new(Vec::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Number of stored section rows.
    pub fn row_count(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    /// Number of stored embedding vectors.
    pub fn embedding_count(&self) -> usize {
        self.index.len()
    }

    /// True if at least one row of `title` is stored.
    pub fn contains_title(&self, title: &str) -> bool {
        self.rows
            .read()
            .unwrap()
            .iter()
            .any(|row| row.page_title == title)
    }

    /// Fetch one section row by position.
    pub fn get_section(&self, row: usize) -> Result<Section> {
        let rows = self.rows.read().unwrap();
        rows.get(row).cloned().ok_or(RetrievalError::RowOutOfRange {
            row,
            len: rows.len(),
        })
    }

    /// Fetch several section rows by position, preserving input order.
    pub fn get_sections(&self, row_ids: &[usize]) -> Result<Vec<Section>> {
        let rows = self.rows.read().unwrap();
        row_ids
            .iter()
            .map(|&row| {
                rows.get(row).cloned().ok_or(RetrievalError::RowOutOfRange {
                    row,
                    len: rows.len(),
                })
            })
            .collect()
    }

    /// Sectionize, embed, and append one page.
    ///
    /// Idempotent by title membership: a title with at least one stored row
    /// is skipped, so content changes to an already-indexed page are never
    /// re-ingested. Embedding failure skips the whole page; no partial
    /// sections are ever stored. Returns the number of rows appended.
    pub async fn add_page(&self, title: &str, raw_page: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        if self.contains_title(title) {
            debug!(title = %title, "page already indexed, skipping");
            return Ok(0);
        }

        let sections = self.sectionizer.split(title, raw_page);
        if sections.is_empty() {
            debug!(title = %title, "page produced no sections");
            return Ok(0);
        }

        let texts: Vec<String> = sections.iter().map(|s| s.content.clone()).collect();
        self.index.add(&texts).await?;

        let appended = sections.len();
        self.rows.write().unwrap().extend(sections);
        info!(title = %title, sections = appended, "indexed page");
        Ok(appended)
    }

    /// The `k` stored sections most similar to `query_text`, most similar
    /// first.
    pub async fn nearest_sections(&self, query_text: &str, k: usize) -> Result<Vec<Section>> {
        let positions = self.index.closest(query_text, k).await?;
        let rows = self.rows.read().unwrap();
        // A concurrent add_page may have extended the vector side already;
        // positions past the row table are not yet resolvable.
        Ok(positions
            .into_iter()
            .filter_map(|p| rows.get(p).cloned())
            .collect())
    }

    /// Write both halves of the store to disk.
    pub fn persist(&self, sections_path: &Path, index_path: &Path) -> Result<()> {
        self.index.persist(index_path)?;
        let rows = self.rows.read().unwrap();
        let snapshot = Snapshot {
            saved_at: Utc::now(),
            row_count: rows.len(),
            rows: rows.clone(),
        };
        let file = File::create(sections_path)?;
        serde_json::to_writer(BufWriter::new(file), &snapshot)?;
        info!(rows = snapshot.row_count, "persisted section store");
        Ok(())
    }

    /// Load a store previously written by [`persist`].
    ///
    /// Fails fast with [`RetrievalError::StoreCorrupted`] if the row count
    /// and the embedding count have diverged; there is no reconciliation.
    ///
    /// [`persist`]: SectionStore::persist
    pub fn restore(
        sections_path: &Path,
        index_path: &Path,
        provider: E,
        sectionizer: Sectionizer,
    ) -> Result<Self> {
        let index = EmbeddingIndex::restore(index_path, provider)?;
        let file = File::open(sections_path)?;
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))?;

        if snapshot.rows.len() != snapshot.row_count {
            return Err(RetrievalError::StoreCorrupted {
                rows: snapshot.rows.len(),
                vectors: snapshot.row_count,
            });
        }
        if snapshot.rows.len() != index.len() {
            return Err(RetrievalError::StoreCorrupted {
                rows: snapshot.rows.len(),
                vectors: index.len(),
            });
        }

        Ok(Self {
            index,
            sectionizer,
            rows: RwLock::new(snapshot.rows),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEmbedder;
    use crate::text::Tokenizer;
    use std::sync::Arc;

    const DIM: usize = 16;

    fn store() -> SectionStore<MockEmbedder> {
        let tokenizer = Arc::new(Tokenizer::cl100k().unwrap());
        let sectionizer = Sectionizer::new(tokenizer, 500);
        SectionStore::new(EmbeddingIndex::new(MockEmbedder::new(DIM), DIM), sectionizer)
    }

    fn failing_store() -> SectionStore<MockEmbedder> {
        let tokenizer = Arc::new(Tokenizer::cl100k().unwrap());
        let sectionizer = Sectionizer::new(tokenizer, 500);
        SectionStore::new(
            EmbeddingIndex::new(MockEmbedder::new(DIM).failing(), DIM),
            sectionizer,
        )
    }

    const PAGE: &str = "The lead paragraph of the page.\n\
== History ==\nIt has a long history.\n\
== References ==\nSmith 1999.";

    #[tokio::test]
    async fn test_add_page_appends_rows_and_vectors_together() {
        let store = store();
        let added = store.add_page("Topic", PAGE).await.unwrap();

        assert_eq!(added, 2);
        assert_eq!(store.row_count(), 2);
        assert_eq!(store.embedding_count(), store.row_count());
    }

    #[tokio::test]
    async fn test_add_page_is_idempotent_by_title() {
        let store = store();
        store.add_page("Topic", PAGE).await.unwrap();
        let rows_before = store.row_count();
        let vectors_before = store.embedding_count();

        let added = store.add_page("Topic", "Entirely different content.").await.unwrap();

        assert_eq!(added, 0);
        assert_eq!(store.row_count(), rows_before);
        assert_eq!(store.embedding_count(), vectors_before);
    }

    #[tokio::test]
    async fn test_discarded_headings_never_stored() {
        let store = store();
        store.add_page("Topic", PAGE).await.unwrap();

        for row in 0..store.row_count() {
            let section = store.get_section(row).unwrap();
            assert_ne!(section.section_heading.as_deref(), Some("References"));
        }
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_whole_page() {
        let store = failing_store();
        let err = store.add_page("Topic", PAGE).await;

        assert!(err.is_err());
        assert_eq!(store.row_count(), 0);
        assert_eq!(store.embedding_count(), 0);
    }

    #[tokio::test]
    async fn test_get_section_out_of_range() {
        let store = store();
        let err = store.get_section(5).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::RowOutOfRange { row: 5, len: 0 }
        ));
    }

    #[tokio::test]
    async fn test_nearest_sections_resolves_positions_in_rank_order() {
        let store = store();
        store.add_page("Topic", PAGE).await.unwrap();

        let lead = store.get_section(0).unwrap();
        let nearest = store.nearest_sections(&lead.content, 1).await.unwrap();
        assert_eq!(nearest.len(), 1);
        assert_eq!(nearest[0], lead);
    }

    #[tokio::test]
    async fn test_persist_restore_round_trip() {
        let store = store();
        store.add_page("Topic", PAGE).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let sections_path = dir.path().join("sections.json");
        let index_path = dir.path().join("embeddings.json");
        store.persist(&sections_path, &index_path).unwrap();

        let tokenizer = Arc::new(Tokenizer::cl100k().unwrap());
        let restored = SectionStore::restore(
            &sections_path,
            &index_path,
            MockEmbedder::new(DIM),
            Sectionizer::new(tokenizer, 500),
        )
        .unwrap();

        assert_eq!(restored.row_count(), store.row_count());
        assert_eq!(restored.embedding_count(), store.embedding_count());
        assert_eq!(restored.get_section(0).unwrap(), store.get_section(0).unwrap());
        assert!(restored.contains_title("Topic"));
    }

    #[tokio::test]
    async fn test_restore_fails_fast_on_count_divergence() {
        let store = store();
        store.add_page("Topic", PAGE).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let sections_path = dir.path().join("sections.json");
        let index_path = dir.path().join("embeddings.json");
        let empty_index_path = dir.path().join("empty.json");
        store.persist(&sections_path, &index_path).unwrap();

        // An empty index next to a populated row table must not load.
        EmbeddingIndex::new(MockEmbedder::new(DIM), DIM)
            .persist(&empty_index_path)
            .unwrap();

        let tokenizer = Arc::new(Tokenizer::cl100k().unwrap());
        let err = SectionStore::restore(
            &sections_path,
            &empty_index_path,
            MockEmbedder::new(DIM),
            Sectionizer::new(tokenizer, 500),
        )
        .unwrap_err();

        assert!(matches!(err, RetrievalError::StoreCorrupted { .. }));
    }
}
