//! MediaWiki opensearch implementation of the title search capability.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::{Result, RetrievalError};
use crate::traits::TitleSearcher;

const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// Title searcher backed by a MediaWiki `opensearch` endpoint.
pub struct WikipediaTitleSearcher {
    client: reqwest::Client,
    endpoint: Url,
    /// Maximum titles requested per search.
    pub limit: usize,
}

/// Opensearch replies with a positional JSON array:
/// `[query, [titles], [descriptions], [urls]]`.
#[derive(Deserialize)]
struct OpenSearchResponse(
    #[allow(dead_code)] String,
    Vec<String>,
    #[allow(dead_code)] Vec<String>,
    #[allow(dead_code)] Vec<String>,
);

impl WikipediaTitleSearcher {
    /// Create a searcher against the English Wikipedia API.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            limit: 10,
        }
    }

    /// Point the searcher at a different MediaWiki API endpoint.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.endpoint = Url::parse(endpoint)
            .map_err(|e| RetrievalError::Config(format!("invalid search endpoint: {e}")))?;
        Ok(self)
    }

    /// Set the per-search title limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

impl Default for WikipediaTitleSearcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TitleSearcher for WikipediaTitleSearcher {
    async fn search_titles(&self, query: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", &self.limit.to_string()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| RetrievalError::Search(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(RetrievalError::Search(
                format!("opensearch returned {}", response.status()).into(),
            ));
        }

        let parsed: OpenSearchResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Search(Box::new(e)))?;
        Ok(parsed.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opensearch_wire_shape_parses() {
        let raw = r#"["apollo",["Apollo","Apollo 11"],["d1","d2"],["u1","u2"]]"#;
        let parsed: OpenSearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.1, vec!["Apollo", "Apollo 11"]);
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = WikipediaTitleSearcher::new().with_endpoint("::nope::");
        assert!(err.is_err());
    }
}
