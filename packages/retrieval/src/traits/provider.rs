//! Embedding and completion capabilities.
//!
//! Implementations wrap a concrete model provider and own their retry
//! policy; by the time an error escapes one of these calls, retries have
//! been exhausted and the caller sees a [`RetrievalError::Provider`].

use async_trait::async_trait;

use crate::error::{Result, RetrievalError};

/// Embedding capability: text in, fixed-dimension float vectors out.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts in one provider call.
    ///
    /// Returns one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RetrievalError::Provider("provider returned no embedding".to_string()))
    }
}

/// Completion capability: prompt in, generated text out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt`, generating at most `max_tokens` tokens.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

// One provider instance commonly backs both capabilities; shared handles
// count as providers too.
#[async_trait]
impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for std::sync::Arc<T> {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }
}

#[async_trait]
impl<T: CompletionProvider + ?Sized> CompletionProvider for std::sync::Arc<T> {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        (**self).complete(prompt, max_tokens).await
    }
}
