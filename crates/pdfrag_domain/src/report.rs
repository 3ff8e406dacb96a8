use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A document that could not be loaded during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Documents that produced pages
    pub documents_loaded: usize,
    /// Chunks produced by the splitter, before dedup
    pub chunks_created: usize,
    /// Chunks embedded and written to the index
    pub chunks_added: usize,
    /// Chunks whose id was already indexed
    pub chunks_skipped_duplicate: usize,
    pub failures: Vec<LoadFailure>,
}
