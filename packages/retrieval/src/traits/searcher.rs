//! Title search capability for corpus discovery.
//!
//! When the section store cannot answer a question, the agent needs a way
//! to discover which archive pages might. This trait abstracts the external
//! full-text title lookup (it is not the vector index).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;

/// Full-text title lookup over the corpus.
#[async_trait]
pub trait TitleSearcher: Send + Sync {
    /// Return page titles relevant to `query`, most relevant first.
    async fn search_titles(&self, query: &str) -> Result<Vec<String>>;

    /// Search with a result cap.
    async fn search_titles_with_limit(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let mut titles = self.search_titles(query).await?;
        titles.truncate(limit);
        Ok(titles)
    }
}

/// Mock title searcher for testing.
#[derive(Default)]
pub struct MockTitleSearcher {
    results: RwLock<HashMap<String, Vec<String>>>,
}

impl MockTitleSearcher {
    /// Create a new mock searcher with no results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add titles returned for a query.
    pub fn with_titles(self, query: &str, titles: &[&str]) -> Self {
        self.results.write().unwrap().insert(
            query.to_string(),
            titles.iter().map(|t| t.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl TitleSearcher for MockTitleSearcher {
    async fn search_titles(&self, query: &str) -> Result<Vec<String>> {
        Ok(self
            .results
            .read()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}
