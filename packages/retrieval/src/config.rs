//! Process-wide settings.
//!
//! All tunables and credentials live in one explicit [`Settings`] object
//! constructed once at startup and passed by reference into the components
//! that need it. There is no ambient global state.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::{Result, RetrievalError};

/// Default embedding vector dimension.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Default token ceiling for a single stored section.
pub const DEFAULT_MAX_SECTION_TOKENS: usize = 500;

/// Process-wide settings: provider credentials, archive paths, and
/// index tunables.
#[derive(Debug)]
pub struct Settings {
    /// API key for the embedding/completion provider.
    pub api_key: SecretString,

    /// Base URL of the OpenAI-compatible API.
    pub api_base_url: String,

    /// Model used for completions.
    pub completion_model: String,

    /// Model used for embeddings.
    pub embedding_model: String,

    /// Path to the archive manifest (`offset:id:title` lines).
    pub manifest_path: PathBuf,

    /// Path to the compressed archive dump.
    pub dump_path: PathBuf,

    /// Path where the built archive index is cached.
    pub index_cache_path: PathBuf,

    /// Embedding vector dimension.
    pub embedding_dimension: usize,

    /// Token ceiling for a single stored section.
    pub max_section_tokens: usize,
}

impl Settings {
    /// Load settings from the environment, reading a `.env` file if present.
    ///
    /// Required variables: `OPENAI_API_KEY`, `ARCHIVE_MANIFEST_PATH`,
    /// `ARCHIVE_DUMP_PATH`. Everything else has a default.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = require_env("OPENAI_API_KEY")?;
        let manifest_path = PathBuf::from(require_env("ARCHIVE_MANIFEST_PATH")?);
        let dump_path = PathBuf::from(require_env("ARCHIVE_DUMP_PATH")?);
        let index_cache_path = std::env::var("ARCHIVE_INDEX_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| manifest_path.with_extension("index.json"));

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base_url: env_or("OPENAI_API_BASE_URL", "https://api.openai.com/v1"),
            completion_model: env_or("COMPLETION_MODEL", "text-davinci-003"),
            embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-ada-002"),
            manifest_path,
            dump_path,
            index_cache_path,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            max_section_tokens: DEFAULT_MAX_SECTION_TOKENS,
        })
    }

    /// Set the embedding dimension.
    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = dimension;
        self
    }

    /// Set the section token ceiling.
    pub fn with_max_section_tokens(mut self, max: usize) -> Self {
        self.max_section_tokens = max;
        self
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| RetrievalError::Config(format!("missing environment variable {name}")))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Tunables for the conversation/retrieval agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Token budget for the assembled context window.
    pub max_context_tokens: usize,

    /// Completion token cap for answer generation.
    pub max_completion_tokens: u32,

    /// Number of nearest sections fetched per question.
    pub search_k: usize,

    /// Separator inserted before each accepted context section.
    pub context_separator: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 2000,
            max_completion_tokens: 300,
            search_k: 4,
            context_separator: "\n* ".to_string(),
        }
    }
}

impl AgentConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the context token budget.
    pub fn with_max_context_tokens(mut self, max: usize) -> Self {
        self.max_context_tokens = max;
        self
    }

    /// Set the completion token cap.
    pub fn with_max_completion_tokens(mut self, max: u32) -> Self {
        self.max_completion_tokens = max;
        self
    }

    /// Set the number of nearest sections fetched per question.
    pub fn with_search_k(mut self, k: usize) -> Self {
        self.search_k = k;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_context_tokens, 2000);
        assert_eq!(config.max_completion_tokens, 300);
        assert_eq!(config.search_k, 4);
        assert_eq!(config.context_separator, "\n* ");
    }

    #[test]
    fn test_agent_config_builders() {
        let config = AgentConfig::new()
            .with_max_context_tokens(1000)
            .with_search_k(8);
        assert_eq!(config.max_context_tokens, 1000);
        assert_eq!(config.search_k, 8);
    }
}
