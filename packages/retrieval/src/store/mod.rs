//! Vector and section storage.
//!
//! [`EmbeddingIndex`] is an append-only sequence of fixed-dimension vectors
//! searchable by inner product. [`SectionStore`] is the authoritative table
//! of indexed sections, ordinally aligned with the embedding index: row *i*
//! and vector *i* always refer to the same section.

pub mod embedding;
pub mod sections;

pub use embedding::EmbeddingIndex;
pub use sections::SectionStore;
