//! Testing utilities including mock providers.
//!
//! These make it possible to exercise the store and the agent without real
//! provider or network calls. Responses are deterministic and configurable.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{Result, RetrievalError};
use crate::traits::{CompletionProvider, EmbeddingProvider};

/// A mock embedding provider.
///
/// Unconfigured texts get a deterministic vector derived from their SHA-256
/// hash, so equal texts always embed equally and distinct texts almost
/// always differ.
#[derive(Clone)]
pub struct MockEmbedder {
    dimension: usize,
    fixed: Arc<RwLock<HashMap<String, Vec<f32>>>>,
    fail: bool,
    batches: Arc<RwLock<Vec<usize>>>,
}

impl MockEmbedder {
    /// Create a mock embedder producing vectors of `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fixed: Arc::new(RwLock::new(HashMap::new())),
            fail: false,
            batches: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Pin the embedding returned for a specific text.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.fixed.write().unwrap().insert(text.into(), embedding);
        self
    }

    /// Make every call fail, as if provider retries were exhausted.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Sizes of the batches embedded so far.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.read().unwrap().clone()
    }

    fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();

        (0..self.dimension)
            .map(|i| {
                let byte = hash[i % 32] as f32;
                // Normalize to [-1, 1].
                (byte / 127.5) - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.fail {
            return Err(RetrievalError::Provider(
                "mock embedder configured to fail".to_string(),
            ));
        }
        self.batches.write().unwrap().push(texts.len());

        let fixed = self.fixed.read().unwrap();
        Ok(texts
            .iter()
            .map(|text| {
                fixed
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| self.deterministic_embedding(text))
            })
            .collect())
    }
}

/// A mock completion provider scripted by prompt content.
///
/// Rules are checked in insertion order; the first rule whose marker
/// substring appears in the prompt wins. Prompts matching no rule get the
/// default response.
#[derive(Clone)]
pub struct MockCompleter {
    rules: Arc<RwLock<Vec<(String, String)>>>,
    default_response: String,
    fail: bool,
    prompts: Arc<RwLock<Vec<String>>>,
}

impl MockCompleter {
    /// Create a completer answering everything with `default_response`.
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            rules: Arc::new(RwLock::new(Vec::new())),
            default_response: default_response.into(),
            fail: false,
            prompts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Respond with `response` to prompts containing `marker`.
    pub fn with_rule(self, marker: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules
            .write()
            .unwrap()
            .push((marker.into(), response.into()));
        self
    }

    /// Make every call fail, as if provider retries were exhausted.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// All prompts completed so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().unwrap().clone()
    }

    /// Number of completion calls made.
    pub fn call_count(&self) -> usize {
        self.prompts.read().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for MockCompleter {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
        if self.fail {
            return Err(RetrievalError::Provider(
                "mock completer configured to fail".to_string(),
            ));
        }
        self.prompts.write().unwrap().push(prompt.to_string());

        let rules = self.rules.read().unwrap();
        for (marker, response) in rules.iter() {
            if prompt.contains(marker.as_str()) {
                return Ok(response.clone());
            }
        }
        Ok(self.default_response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(8);
        let a = embedder.embed("same text").await.unwrap();
        let b = embedder.embed("same text").await.unwrap();
        let c = embedder.embed("other text").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_mock_embedder_pinned_vectors_win() {
        let embedder = MockEmbedder::new(2).with_embedding("pinned", vec![1.0, 0.0]);
        assert_eq!(embedder.embed("pinned").await.unwrap(), vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_mock_completer_rules_in_order() {
        let completer = MockCompleter::new("default")
            .with_rule("alpha", "first")
            .with_rule("beta", "second");

        assert_eq!(
            completer.complete("has alpha and beta", 10).await.unwrap(),
            "first"
        );
        assert_eq!(completer.complete("only beta", 10).await.unwrap(), "second");
        assert_eq!(completer.complete("neither", 10).await.unwrap(), "default");
        assert_eq!(completer.call_count(), 3);
    }
}
