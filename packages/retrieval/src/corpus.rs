//! The unifying corpus façade.

use tracing::warn;

use crate::archive::{ArchiveIndex, ArchiveReader};
use crate::error::{Result, RetrievalError};
use crate::store::SectionStore;
use crate::traits::{EmbeddingProvider, TitleSearcher};

/// One object tying the archive, the section store, and title search
/// together: title to raw page, query to candidate titles, and page to
/// indexed sections.
pub struct CorpusDatabase<E, S> {
    archive_index: ArchiveIndex,
    reader: ArchiveReader,
    store: SectionStore<E>,
    searcher: S,
}

impl<E: EmbeddingProvider, S: TitleSearcher> CorpusDatabase<E, S> {
    /// Assemble a corpus database from its parts.
    pub fn new(
        archive_index: ArchiveIndex,
        reader: ArchiveReader,
        store: SectionStore<E>,
        searcher: S,
    ) -> Self {
        Self {
            archive_index,
            reader,
            store,
            searcher,
        }
    }

    /// Fetch the raw source text of a page by title.
    ///
    /// Returns `Ok(None)` when the title is absent from the archive index or
    /// its chunk does not contain the record; both mean "page unavailable"
    /// and neither is fatal. Other archive failures propagate.
    pub fn page(&self, title: &str) -> Result<Option<String>> {
        let (offset, length) = match self.archive_index.resolve(title) {
            Ok(range) => range,
            Err(RetrievalError::TitleNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        match self.reader.read_page(title, offset, length) {
            Ok(text) => Ok(Some(text)),
            Err(RetrievalError::PageNotFoundInChunk { .. }) => {
                warn!(title = %title, "page unavailable in archive chunk");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Candidate page titles for a query, via the external title search.
    pub async fn search_titles(&self, query: &str) -> Result<Vec<String>> {
        self.searcher.search_titles(query).await
    }

    /// True if the title already has indexed sections.
    pub fn is_indexed(&self, title: &str) -> bool {
        self.store.contains_title(title)
    }

    /// Sectionize, embed, and index one page. See [`SectionStore::add_page`].
    pub async fn add_page(&self, title: &str, raw_page: &str) -> Result<usize> {
        self.store.add_page(title, raw_page).await
    }

    /// The underlying section store.
    pub fn store(&self) -> &SectionStore<E> {
        &self.store
    }
}
