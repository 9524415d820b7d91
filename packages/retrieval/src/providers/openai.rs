//! OpenAI-compatible embedding and completion provider.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, RetrievalError};
use crate::traits::{CompletionProvider, EmbeddingProvider};

/// Bounded exponential backoff with random jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Ceiling on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): exponential growth
    /// capped at `max_delay`, with the upper half randomized.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .as_millis()
            .saturating_mul(1u128 << attempt.min(16)) as u64;
        let capped = exp.min(self.max_delay.as_millis() as u64).max(1);
        let jittered = capped / 2 + rand::thread_rng().gen_range(0..=capped / 2);
        Duration::from_millis(jittered)
    }
}

/// Client for OpenAI-compatible `/embeddings` and `/completions` endpoints.
///
/// Retries transient failures (429, 5xx, transport errors) under the
/// configured [`RetryPolicy`]; exhausting attempts surfaces as
/// [`RetrievalError::Provider`].
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    embeddings_url: String,
    completions_url: String,
    embedding_model: String,
    completion_model: String,
    retry: RetryPolicy,
}

impl OpenAiProvider {
    /// Build a provider against `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(api_key: SecretString, base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| RetrievalError::Config(format!("invalid provider base URL: {e}")))?;
        let trimmed = base.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            embeddings_url: format!("{trimmed}/embeddings"),
            completions_url: format!("{trimmed}/completions"),
            embedding_model: "text-embedding-ada-002".to_string(),
            completion_model: "text-davinci-003".to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Set the embedding model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the completion model.
    pub fn with_completion_model(mut self, model: impl Into<String>) -> Self {
        self.completion_model = model.into();
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn should_retry_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn should_retry_transport(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect() || err.is_request()
    }

    /// Issue `body` as a POST to `url`, retrying transient failures.
    async fn post_with_retry<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let response = self
                .client
                .post(url)
                .bearer_auth(self.api_key.expose_secret())
                .json(body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json::<R>().await.map_err(|e| {
                            RetrievalError::Provider(format!("malformed provider response: {e}"))
                        });
                    }

                    let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
                    if Self::should_retry_status(status) && attempt < self.retry.max_attempts {
                        let delay = self.retry.delay(attempt);
                        debug!(%status, attempt, ?delay, "provider request retrying");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(RetrievalError::Provider(format!(
                        "provider request failed ({status}): {text}"
                    )));
                }
                Err(err) => {
                    if Self::should_retry_transport(&err) && attempt < self.retry.max_attempts {
                        let delay = self.retry.delay(attempt);
                        warn!(error = %err, attempt, ?delay, "provider transport error, retrying");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(RetrievalError::Provider(format!(
                        "provider transport error: {err}"
                    )));
                }
            }
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let mut response: EmbeddingResponse =
            self.post_with_retry(&self.embeddings_url, &request).await?;

        response.data.sort_by_key(|entry| entry.index);
        if response.data.len() != texts.len() {
            return Err(RetrievalError::Provider(format!(
                "provider returned {} embeddings for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }
        Ok(response.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = CompletionRequest {
            model: &self.completion_model,
            prompt,
            max_tokens,
            temperature: 0.0,
        };
        let response: CompletionResponse =
            self.post_with_retry(&self.completions_url, &request).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| RetrievalError::Provider("provider returned no choices".to_string()))
    }
}
