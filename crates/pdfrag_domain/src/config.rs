use std::path::PathBuf;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

use crate::{Distance, Error, Result};

/// Window geometry for the chunker, measured in Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Setters)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, overlap: 200 }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self { chunk_size, overlap }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance between the starts of consecutive windows.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// What ingestion does when there is nothing to index and no index yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptyCorpusPolicy {
    /// Return the report without creating an index.
    #[default]
    Skip,
    /// Surface [`Error::EmptyCorpus`].
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Setters)]
pub struct IngestConfig {
    /// Number of chunk texts sent per embedding request
    pub embed_batch_size: usize,
    /// Maximum number of embedding requests in flight
    pub max_concurrent_embeds: usize,
    pub empty_corpus_policy: EmptyCorpusPolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            embed_batch_size: 16,
            max_concurrent_embeds: 4,
            empty_corpus_policy: EmptyCorpusPolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per query
    pub top_k: usize,
    /// Hits scoring below this are discarded
    pub min_relevance: Option<f32>,
    pub distance: Distance,
    /// Upper bound on the assembled context block
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 20,
            min_relevance: None,
            distance: Distance::Cosine,
            max_context_chars: 16_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(into)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub temperature: f32,
    /// Timeout applied to every HTTP request, in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "deepseek-r1:1.5b".to_string(),
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

/// Delimiters some models wrap their chain of thought in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Setters)]
#[setters(into)]
pub struct ReasoningMarkers {
    pub open: String,
    pub close: String,
}

impl Default for ReasoningMarkers {
    fn default() -> Self {
        Self { open: "<think>".to_string(), close: "</think>".to_string() }
    }
}

/// Everything a pipeline run needs; passed explicitly to each component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(into)]
pub struct RagConfig {
    pub corpus_dir: PathBuf,
    pub index_dir: PathBuf,
    pub chunk: ChunkConfig,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
    pub ollama: OllamaConfig,
    pub reasoning: ReasoningMarkers,
}

impl RagConfig {
    pub fn new(corpus_dir: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus_dir: corpus_dir.into(),
            index_dir: index_dir.into(),
            chunk: ChunkConfig::default(),
            ingest: IngestConfig::default(),
            retrieval: RetrievalConfig::default(),
            ollama: OllamaConfig::default(),
            reasoning: ReasoningMarkers::default(),
        }
    }

    /// Rejects settings that would only fail later, after ingestion has
    /// already touched the index.
    pub fn validate(&self) -> Result<()> {
        self.chunk.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::Configuration(
                "top_k must be greater than zero".to_string(),
            ));
        }
        if self.ingest.embed_batch_size == 0 || self.ingest.max_concurrent_embeds == 0 {
            return Err(Error::Configuration(
                "embed_batch_size and max_concurrent_embeds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
