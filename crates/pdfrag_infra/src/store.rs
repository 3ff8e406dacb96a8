use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use indexmap::IndexMap;
use pdfrag_domain::{
    Chunk, ChunkId, Distance, Embedder, EmbeddingSignature, Error, IndexStore, IndexedChunk,
    IngestConfig, QueryResult, Result, RetrievalConfig, ScoredChunk,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const INDEX_FILE: &str = "index.json";
const FORMAT_VERSION: u32 = 1;

/// Metadata persisted next to the vectors, used to reject incompatible loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub embedding: EmbeddingSignature,
    pub distance: Distance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    manifest: Manifest,
    entries: Vec<IndexedChunk>,
}

/// In-memory view of a flat index, as returned by [`FlatIndexStore::load`].
#[derive(Debug, Clone)]
pub struct FlatIndex {
    manifest: Manifest,
    entries: IndexMap<ChunkId, IndexedChunk>,
}

impl FlatIndex {
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exact nearest-neighbour index kept in memory and persisted as one JSON
/// document under `dir`.
///
/// Writes go to a temporary file that is renamed over the previous index, so
/// a crash never leaves a half-written index behind.
pub struct FlatIndexStore<E> {
    dir: PathBuf,
    embedder: E,
    distance: Distance,
    min_relevance: Option<f32>,
    embed_batch_size: usize,
    max_concurrent_embeds: usize,
}

impl<E: Embedder> FlatIndexStore<E> {
    pub fn new(
        dir: impl Into<PathBuf>,
        embedder: E,
        retrieval: &RetrievalConfig,
        ingest: &IngestConfig,
    ) -> Self {
        Self {
            dir: dir.into(),
            embedder,
            distance: retrieval.distance,
            min_relevance: retrieval.min_relevance,
            embed_batch_size: ingest.embed_batch_size.max(1),
            max_concurrent_embeds: ingest.max_concurrent_embeds.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn staging_path(&self) -> PathBuf {
        self.dir.join(format!("{INDEX_FILE}.tmp"))
    }

    fn corruption(&self, reason: impl Into<String>) -> Error {
        Error::StorageCorruption { path: self.index_path(), reason: reason.into() }
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
        move |source| Error::Io { path: path.to_path_buf(), source }
    }

    /// Embeds chunks in batches, several in flight at once, preserving input
    /// order.
    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<IndexedChunk>> {
        let batches: Vec<Vec<Chunk>> = chunks
            .chunks(self.embed_batch_size)
            .map(<[Chunk]>::to_vec)
            .collect();
        debug!(batches = batches.len(), "Embedding chunks");

        let embedded: Vec<Vec<IndexedChunk>> = stream::iter(batches)
            .map(|batch| async move {
                let texts = batch.iter().map(|chunk| chunk.text.clone()).collect();
                let vectors = self
                    .embedder
                    .embed_batch(texts)
                    .await
                    .map_err(Error::Embedding)?;
                if vectors.len() != batch.len() {
                    return Err(Error::Embedding(anyhow::anyhow!(
                        "Expected {} embeddings but received {}",
                        batch.len(),
                        vectors.len()
                    )));
                }
                Ok(batch
                    .into_iter()
                    .zip(vectors)
                    .map(|(chunk, embedding)| IndexedChunk::new(chunk, embedding))
                    .collect::<Vec<_>>())
            })
            .buffered(self.max_concurrent_embeds)
            .try_collect()
            .await?;

        Ok(embedded.into_iter().flatten().collect())
    }

    fn ensure_compatible(&self, expected: &EmbeddingSignature, dimensions: usize) -> Result<()> {
        let actual = EmbeddingSignature::new(self.embedder.model(), dimensions);
        if &actual != expected {
            return Err(Error::EmbeddingMismatch { expected: expected.clone(), actual });
        }
        Ok(())
    }

    async fn persist(&self, index: &FlatIndex) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(Self::io_error(&self.dir))?;

        let document = PersistedIndex {
            manifest: index.manifest.clone(),
            entries: index.entries.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec(&document).map_err(|e| Error::Io {
            path: self.index_path(),
            source: std::io::Error::other(e),
        })?;

        let target = self.index_path();
        let staging = self.staging_path();
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(Self::io_error(&staging))?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(Self::io_error(&target))?;

        debug!(path = %target.display(), entries = index.len(), "Index persisted");
        Ok(())
    }
}

#[async_trait]
impl<E: Embedder> IndexStore for FlatIndexStore<E> {
    type Handle = FlatIndex;

    fn exists(&self) -> bool {
        self.index_path().is_file()
    }

    async fn load(&self) -> Result<Self::Handle> {
        let path = self.index_path();
        let bytes = tokio::fs::read(&path).await.map_err(Self::io_error(&path))?;
        let document: PersistedIndex = serde_json::from_slice(&bytes)
            .map_err(|e| self.corruption(format!("cannot be deserialized ({e})")))?;
        let manifest = document.manifest;

        if manifest.version != FORMAT_VERSION {
            return Err(self.corruption(format!(
                "format version {} is not supported (expected {FORMAT_VERSION})",
                manifest.version
            )));
        }
        if manifest.embedding.model != self.embedder.model() {
            return Err(self.corruption(format!(
                "it was built with embedding model '{}' but '{}' is configured",
                manifest.embedding.model,
                self.embedder.model()
            )));
        }
        if manifest.distance != self.distance {
            return Err(self.corruption(format!(
                "it uses {} distance but {} is configured",
                manifest.distance, self.distance
            )));
        }

        let mut entries = IndexMap::with_capacity(document.entries.len());
        for entry in document.entries {
            if entry.embedding.len() != manifest.embedding.dimensions {
                return Err(self.corruption(format!(
                    "chunk {} has {} dimensions, expected {}",
                    entry.chunk.id,
                    entry.embedding.len(),
                    manifest.embedding.dimensions
                )));
            }
            if entries.insert(entry.chunk.id.clone(), entry).is_some() {
                return Err(self.corruption("it contains duplicate chunk ids"));
            }
        }

        info!(path = %path.display(), entries = entries.len(), "Loaded existing index");
        Ok(FlatIndex { manifest, entries })
    }

    async fn create(&self, chunks: Vec<Chunk>) -> Result<Self::Handle> {
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let indexed = self.embed_chunks(chunks).await?;
        let dimensions = indexed.first().map_or(0, |entry| entry.embedding.len());
        if dimensions == 0 || indexed.iter().any(|entry| entry.embedding.len() != dimensions) {
            return Err(Error::Embedding(anyhow::anyhow!(
                "Embedder returned vectors of inconsistent or zero dimensionality"
            )));
        }

        let now = Utc::now();
        let manifest = Manifest {
            version: FORMAT_VERSION,
            embedding: EmbeddingSignature::new(self.embedder.model(), dimensions),
            distance: self.distance,
            created_at: now,
            updated_at: now,
        };
        let mut entries = IndexMap::with_capacity(indexed.len());
        for entry in indexed {
            entries.entry(entry.chunk.id.clone()).or_insert(entry);
        }

        let index = FlatIndex { manifest, entries };
        self.persist(&index).await?;
        info!(path = %self.dir.display(), entries = index.len(), "Created new index");
        Ok(index)
    }

    async fn add(&self, handle: &mut Self::Handle, chunks: Vec<Chunk>) -> Result<usize> {
        let mut fresh = IndexMap::new();
        for chunk in chunks {
            if !handle.entries.contains_key(&chunk.id) {
                fresh.entry(chunk.id.clone()).or_insert(chunk);
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        let expected = handle.manifest.embedding.clone();
        self.ensure_compatible(&expected, expected.dimensions)?;

        let indexed = self.embed_chunks(fresh.into_values().collect()).await?;
        if let Some(bad) = indexed.iter().find(|e| e.embedding.len() != expected.dimensions) {
            return Err(Error::EmbeddingMismatch {
                expected: expected.clone(),
                actual: EmbeddingSignature::new(self.embedder.model(), bad.embedding.len()),
            });
        }

        let previous_len = handle.entries.len();
        let previous_updated_at = handle.manifest.updated_at;
        let added = indexed.len();
        handle.entries.extend(indexed.into_iter().map(|entry| (entry.chunk.id.clone(), entry)));
        handle.manifest.updated_at = Utc::now();

        if let Err(e) = self.persist(handle).await {
            handle.entries.truncate(previous_len);
            handle.manifest.updated_at = previous_updated_at;
            return Err(e);
        }
        Ok(added)
    }

    fn contains(&self, handle: &Self::Handle, id: &ChunkId) -> bool {
        handle.entries.contains_key(id)
    }

    async fn search(&self, handle: &Self::Handle, query: &str, k: usize) -> Result<QueryResult> {
        if k == 0 {
            return Err(Error::Configuration("k must be greater than zero".to_string()));
        }

        let expected = &handle.manifest.embedding;
        self.ensure_compatible(expected, expected.dimensions)?;
        let vector = self.embedder.embed(query).await.map_err(Error::Embedding)?;
        self.ensure_compatible(expected, vector.len())?;

        let distance = handle.manifest.distance;
        let hits = handle
            .entries
            .values()
            .map(|entry| ScoredChunk::new(entry.chunk.clone(), distance.score(&vector, &entry.embedding)))
            .filter(|hit| self.min_relevance.is_none_or(|min| hit.score >= min))
            .collect();

        let results = QueryResult::ranked(hits, k);
        debug!(k, hits = results.len(), "Similarity search complete");
        Ok(results)
    }

    async fn reset(&self) -> Result<()> {
        let mut removed = false;
        for path in [self.index_path(), self.staging_path()] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io { path, source: e }),
            }
        }

        // Only index files are ours; the directory goes only when nothing else lives there.
        if let Err(e) = tokio::fs::remove_dir(&self.dir).await {
            debug!(path = %self.dir.display(), error = %e, "Index directory kept");
        }
        if removed {
            info!(path = %self.dir.display(), "Index cleared");
        }
        Ok(())
    }
}
