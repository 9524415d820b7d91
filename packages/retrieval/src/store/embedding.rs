//! Append-only flat inner-product vector index.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RetrievalError};
use crate::traits::EmbeddingProvider;

/// Ordered sequence of fixed-dimension vectors with exact nearest-neighbor
/// search under inner-product similarity.
///
/// Vectors are produced by the embedding provider one batch per [`add`]
/// call. No deletion, no reordering; positions are stable forever, which is
/// what lets the section store key rows by position.
///
/// [`add`]: EmbeddingIndex::add
pub struct EmbeddingIndex<E> {
    provider: E,
    dimension: usize,
    vectors: RwLock<Vec<Vec<f32>>>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl<E: EmbeddingProvider> EmbeddingIndex<E> {
    /// Create an empty index of the given dimension.
    pub fn new(provider: E, dimension: usize) -> Self {
        Self {
            provider,
            dimension,
            vectors: RwLock::new(Vec::new()),
        }
    }

    /// Vector dimension fixed at construction.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.read().unwrap().len()
    }

    /// True when no vectors are stored.
    pub fn is_empty(&self) -> bool {
        self.vectors.read().unwrap().is_empty()
    }

    /// Embed `texts` as one provider batch and append the vectors.
    ///
    /// On provider failure the index is not mutated; callers must not
    /// assume partial progress. Returns the number of vectors appended.
    pub async fn add(&self, texts: &[String]) -> Result<usize> {
        if texts.is_empty() {
            return Ok(0);
        }

        let embeddings = self.provider.embed_batch(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(RetrievalError::Provider(format!(
                "provider returned {} vectors for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }
        for vector in &embeddings {
            if vector.len() != self.dimension {
                return Err(RetrievalError::DimensionMismatch {
                    expected: self.dimension,
                    got: vector.len(),
                });
            }
        }

        let mut vectors = self.vectors.write().unwrap();
        vectors.extend(embeddings);
        debug!(added = texts.len(), total = vectors.len(), "extended embedding index");
        Ok(texts.len())
    }

    /// Positional indices of the `k` stored vectors most similar to
    /// `query` by inner product. Ties break toward the lower index.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<usize> {
        let vectors = self.vectors.read().unwrap();
        let mut scored: Vec<(usize, f32)> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, inner_product(query, v)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.into_iter().take(k).map(|(i, _)| i).collect()
    }

    /// Embed `query_text` and search for its `k` nearest vectors.
    pub async fn closest(&self, query_text: &str, k: usize) -> Result<Vec<usize>> {
        let query = self.provider.embed(query_text).await?;
        Ok(self.search(&query, k))
    }

    /// Write a snapshot of the index to `path`.
    ///
    /// A persist/restore round trip reproduces identical search results.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let vectors = self.vectors.read().unwrap();
        let snapshot = Snapshot {
            dimension: self.dimension,
            vectors: vectors.clone(),
        };
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), &snapshot)?;
        Ok(())
    }

    /// Load an index previously written by [`persist`].
    ///
    /// Fails fast if any stored vector disagrees with the snapshot's
    /// declared dimension.
    ///
    /// [`persist`]: EmbeddingIndex::persist
    pub fn restore(path: &Path, provider: E) -> Result<Self> {
        let file = File::open(path)?;
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))?;
        for vector in &snapshot.vectors {
            if vector.len() != snapshot.dimension {
                return Err(RetrievalError::DimensionMismatch {
                    expected: snapshot.dimension,
                    got: vector.len(),
                });
            }
        }
        Ok(Self {
            provider,
            dimension: snapshot.dimension,
            vectors: RwLock::new(snapshot.vectors),
        })
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
