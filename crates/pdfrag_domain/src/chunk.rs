use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Stable identifier of a chunk: `"{source_path}:{page_number}:{sequence}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{}", _0)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn new(source_path: &str, page_number: usize, sequence_in_page: usize) -> Self {
        Self(format!("{source_path}:{page_number}:{sequence_in_page}"))
    }
}

/// A bounded slice of page text carrying its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source_path: String,
    pub page_number: usize,
    pub sequence_in_page: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(
        source_path: impl Into<String>,
        page_number: usize,
        sequence_in_page: usize,
        text: impl Into<String>,
    ) -> Self {
        let source_path = source_path.into();
        let id = ChunkId::new(&source_path, page_number, sequence_in_page);
        Self {
            id,
            source_path,
            page_number,
            sequence_in_page,
            text: text.into(),
        }
    }
}

/// A chunk together with the embedding it was indexed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

impl IndexedChunk {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }
}
