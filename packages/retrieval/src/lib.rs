//! Retrieval-Grounded Question Answering
//!
//! A library for answering questions from a local, compressed encyclopedia
//! dump. Three pieces cooperate:
//!
//! - an archive layer giving random access to one page's raw text without
//!   decompressing the whole dump ([`archive`]),
//! - a section-level index keeping page content, token counts, and
//!   embedding vectors in strict positional correspondence ([`store`]),
//! - a conversation agent that answers from the index, notices when it
//!   cannot, and synchronously extends the index before retrying
//!   ([`agent`]), with a streaming variant that reports progress mid-flight.
//!
//! External collaborators (embedding, completion, title search) are
//! capability traits in [`traits`]; HTTP implementations live in
//! [`providers`], deterministic mocks in [`testing`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use retrieval::{
//!     ArchiveIndex, ArchiveReader, CorpusDatabase, EmbeddingIndex,
//!     OpenAiProvider, RetrievalAgent, SectionStore, Sectionizer, Settings,
//!     Tokenizer, WikipediaTitleSearcher,
//! };
//!
//! let settings = Settings::from_env()?;
//! let tokenizer = Arc::new(Tokenizer::cl100k()?);
//! let provider = Arc::new(OpenAiProvider::new(settings.api_key, &settings.api_base_url)?);
//!
//! let corpus = CorpusDatabase::new(
//!     ArchiveIndex::open(&settings.manifest_path, &settings.index_cache_path)?,
//!     ArchiveReader::new(&settings.dump_path),
//!     SectionStore::new(
//!         EmbeddingIndex::new(Arc::clone(&provider), settings.embedding_dimension),
//!         Sectionizer::new(tokenizer.clone(), settings.max_section_tokens),
//!     ),
//!     WikipediaTitleSearcher::new(),
//! );
//!
//! let agent = RetrievalAgent::new(corpus, provider, tokenizer);
//! let reply = agent.answer_query("Who designed the Saturn V?").await?;
//! ```

pub mod agent;
pub mod archive;
pub mod config;
pub mod corpus;
pub mod error;
pub mod providers;
pub mod store;
pub mod testing;
pub mod text;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use agent::{prompts, RetrievalAgent};
pub use archive::{ArchiveIndex, ArchiveReader};
pub use config::{AgentConfig, Settings};
pub use corpus::CorpusDatabase;
pub use error::{Result, RetrievalError};
pub use providers::{OpenAiProvider, RetryPolicy, WikipediaTitleSearcher};
pub use store::{EmbeddingIndex, SectionStore};
pub use text::{parse_sections, Sectionizer, Tokenizer, DISCARD_HEADINGS};
pub use traits::{
    CompletionProvider, EmbeddingProvider, MockTitleSearcher, TitleSearcher,
};
pub use types::{Author, ChatEntry, Section};
