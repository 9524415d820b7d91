//! Typed errors for the retrieval library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Title absent from the archive index.
    ///
    /// Recoverable: callers surface this as "page unavailable".
    #[error("title not found in archive index: {title}")]
    TitleNotFound { title: String },

    /// A chunk decompressed cleanly but did not contain the requested title.
    ///
    /// Logged and treated as "page unavailable", never fatal.
    #[error("page not found in decompressed chunk: {title}")]
    PageNotFoundInChunk { title: String },

    /// Section row id past the end of the store.
    #[error("section row {row} out of range (store has {len} rows)")]
    RowOutOfRange { row: usize, len: usize },

    /// Embedding or completion call failed after retries were exhausted.
    #[error("provider error: {0}")]
    Provider(String),

    /// Title search against the external full-text lookup failed.
    #[error("title search error: {0}")]
    Search(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A manifest line could not be parsed. Unrecoverable for the build.
    #[error("malformed manifest line {line}: {reason}")]
    Manifest { line: usize, reason: String },

    /// Archive read or decompression failure.
    #[error("archive error: {0}")]
    Archive(String),

    /// Section rows and embedding vectors have diverged in count.
    ///
    /// There is no reconciliation path; fail fast.
    #[error("store corrupted: {rows} section rows vs {vectors} embedding vectors")]
    StoreCorrupted { rows: usize, vectors: usize },

    /// An embedding vector did not match the index dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A chat history that cannot be answered (e.g. empty).
    #[error("invalid chat: {reason}")]
    InvalidChat { reason: String },

    /// Operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration or construction error.
    #[error("config error: {0}")]
    Config(String),

    /// Underlying IO failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;
