//! In-memory collaborators shared by the service tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pdfrag_domain::{
    Chunk, ChunkId, Distance, Embedder, Error, GenerationError, Generator,
    IndexStore, IndexedChunk, PageLoader, QueryResult, RawPage, Result, ScoredChunk,
};

/// Embeds text as letter frequencies, so texts sharing letters score close.
#[derive(Debug, Default)]
pub struct LetterEmbedder {
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl LetterEmbedder {
    /// Fails any batch containing a text that includes `needle`.
    pub fn failing_on(needle: &str) -> Self {
        Self { fail_on: Some(needle.to_string()), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut counts = vec![0.0; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            counts[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        counts
    }
}

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model(&self) -> &str {
        "letters"
    }

    async fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(needle) = &self.fail_on {
            anyhow::ensure!(
                !texts.iter().any(|text| text.contains(needle.as_str())),
                "embedding backend unavailable"
            );
        }
        Ok(texts.iter().map(|text| Self::vector(text)).collect())
    }
}

/// Serves canned pages per path; paths without an entry fail to load.
#[derive(Debug, Default)]
pub struct ScriptedLoader {
    pages: HashMap<PathBuf, Vec<RawPage>>,
}

impl ScriptedLoader {
    pub fn with(mut self, path: impl Into<PathBuf>, pages: Vec<RawPage>) -> Self {
        self.pages.insert(path.into(), pages);
        self
    }
}

#[async_trait]
impl PageLoader for ScriptedLoader {
    async fn load_pages(&self, path: &Path) -> anyhow::Result<Vec<RawPage>> {
        self.pages
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("not a valid PDF"))
    }
}

/// Replays one response and records every prompt it receives.
#[derive(Debug)]
pub struct ScriptedGenerator {
    response: std::result::Result<String, fn() -> GenerationError>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(text: &str) -> Self {
        Self { response: Ok(text.to_string()), prompts: Mutex::default() }
    }

    pub fn failing(error: fn() -> GenerationError) -> Self {
        Self { response: Err(error), prompts: Mutex::default() }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(make) => Err(make()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryIndex {
    pub entries: BTreeMap<ChunkId, IndexedChunk>,
}

/// Index store whose "disk" is a mutex-guarded snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub embedder: LetterEmbedder,
    pub persisted: Mutex<Option<MemoryIndex>>,
    pub min_relevance: Option<f32>,
}

impl MemoryStore {
    pub fn new(embedder: LetterEmbedder) -> Self {
        Self { embedder, ..Default::default() }
    }

    pub fn min_relevance(mut self, threshold: f32) -> Self {
        self.min_relevance = Some(threshold);
        self
    }

    pub fn persisted_len(&self) -> usize {
        self.persisted
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, |index| index.entries.len())
    }

    async fn embed(&self, chunks: Vec<Chunk>) -> Result<Vec<IndexedChunk>> {
        let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(texts)
            .await
            .map_err(Error::Embedding)?;
        Ok(chunks.into_iter().zip(vectors).map(|(c, v)| IndexedChunk::new(c, v)).collect())
    }
}

#[async_trait]
impl IndexStore for MemoryStore {
    type Handle = MemoryIndex;

    fn exists(&self) -> bool {
        self.persisted.lock().unwrap().is_some()
    }

    async fn load(&self) -> Result<Self::Handle> {
        self.persisted.lock().unwrap().clone().ok_or_else(|| Error::StorageCorruption {
            path: PathBuf::from("memory"),
            reason: "nothing persisted".to_string(),
        })
    }

    async fn create(&self, chunks: Vec<Chunk>) -> Result<Self::Handle> {
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let mut index = MemoryIndex::default();
        self.add(&mut index, chunks).await?;
        Ok(index)
    }

    async fn add(&self, handle: &mut Self::Handle, chunks: Vec<Chunk>) -> Result<usize> {
        let fresh: Vec<_> = chunks
            .into_iter()
            .filter(|chunk| !handle.entries.contains_key(&chunk.id))
            .collect();
        let indexed = self.embed(fresh).await?;
        let count = indexed.len();
        for entry in indexed {
            handle.entries.insert(entry.chunk.id.clone(), entry);
        }
        *self.persisted.lock().unwrap() = Some(handle.clone());
        Ok(count)
    }

    fn contains(&self, handle: &Self::Handle, id: &ChunkId) -> bool {
        handle.entries.contains_key(id)
    }

    async fn search(&self, handle: &Self::Handle, query: &str, k: usize) -> Result<QueryResult> {
        let vector = LetterEmbedder::vector(query);
        let hits = handle
            .entries
            .values()
            .map(|entry| {
                let score = Distance::Cosine.score(&vector, &entry.embedding);
                ScoredChunk::new(entry.chunk.clone(), score)
            })
            .filter(|hit| self.min_relevance.is_none_or(|min| hit.score >= min))
            .collect();
        Ok(QueryResult::ranked(hits, k))
    }

    async fn reset(&self) -> Result<()> {
        *self.persisted.lock().unwrap() = None;
        Ok(())
    }
}
