use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::Chunk;

/// A retrieved chunk and its relevance; higher scores are more relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, score: f32) -> Self {
        Self { chunk, score }
    }
}

/// Chunks returned by a similarity search, ordered by descending relevance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult(Vec<ScoredChunk>);

impl QueryResult {
    /// Sorts `hits` by non-increasing score (ties broken by chunk id) and
    /// keeps at most `k` of them.
    pub fn ranked(mut hits: Vec<ScoredChunk>, k: usize) -> Self {
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        hits.truncate(k);
        Self(hits)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredChunk> {
        self.0.iter()
    }
}

/// The page a piece of context came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{source_path} - Page {page_number}")]
pub struct Source {
    pub source_path: String,
    pub page_number: usize,
}

impl Source {
    pub fn new(source_path: impl Into<String>, page_number: usize) -> Self {
        Self { source_path: source_path.into(), page_number }
    }
}

impl From<&Chunk> for Source {
    fn from(chunk: &Chunk) -> Self {
        Self::new(chunk.source_path.clone(), chunk.page_number)
    }
}

/// Post-processed model output plus the pages it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<Source>,
}
