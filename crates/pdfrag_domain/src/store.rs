use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{Chunk, ChunkId, QueryResult, Result};

/// Identifies the embedding space an index was built in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{model} ({dimensions} dimensions)")]
pub struct EmbeddingSignature {
    pub model: String,
    pub dimensions: usize,
}

impl EmbeddingSignature {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self { model: model.into(), dimensions }
    }
}

/// Similarity metric of a store; fixed for the lifetime of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    #[default]
    #[display("cosine")]
    Cosine,
    #[display("euclidean")]
    Euclidean,
}

impl Distance {
    /// Relevance of `candidate` to `query`; larger is closer.
    pub fn score(&self, query: &[f32], candidate: &[f32]) -> f32 {
        match self {
            Distance::Cosine => {
                let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
                let norm_q = query.iter().map(|v| v * v).sum::<f32>().sqrt();
                let norm_c = candidate.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm_q == 0.0 || norm_c == 0.0 {
                    0.0
                } else {
                    dot / (norm_q * norm_c)
                }
            }
            Distance::Euclidean => {
                let l2 = query
                    .iter()
                    .zip(candidate)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>()
                    .sqrt();
                1.0 / (1.0 + l2)
            }
        }
    }
}

/// A persistent, id-addressed vector index.
///
/// Implementations own their on-disk representation; callers only go through
/// this contract. A `Handle` is the loaded, in-memory view of one index.
#[async_trait]
pub trait IndexStore: Send + Sync {
    type Handle: Send + Sync;

    /// Whether a persisted index is present.
    fn exists(&self) -> bool;

    async fn load(&self) -> Result<Self::Handle>;

    /// Embeds `chunks`, builds a fresh index and persists it.
    ///
    /// Fails with [`crate::Error::EmptyCorpus`] when `chunks` is empty.
    async fn create(&self, chunks: Vec<Chunk>) -> Result<Self::Handle>;

    /// Embeds and persists the chunks whose ids are not yet indexed and
    /// returns how many were inserted. Either every new chunk lands or none
    /// does.
    async fn add(&self, handle: &mut Self::Handle, chunks: Vec<Chunk>) -> Result<usize>;

    fn contains(&self, handle: &Self::Handle, id: &ChunkId) -> bool;

    /// Up to `k` chunks closest to `query`, most relevant first.
    async fn search(&self, handle: &Self::Handle, query: &str, k: usize) -> Result<QueryResult>;

    /// Deletes all persisted state; a no-op when nothing is persisted.
    async fn reset(&self) -> Result<()>;
}
