use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;
use pdfrag_domain::{
    ChunkConfig, EmptyCorpusPolicy, Error, IndexStore, IngestConfig, IngestionReport, LoadFailure,
    PageLoader, Result,
};
use tracing::{debug, info, warn};

use crate::ChunkSplitter;

/// Outcome of [`IngestionPipeline::ingest`].
///
/// `handle` is `None` only when no index existed and there was nothing to
/// create one from.
#[derive(Debug)]
pub struct Ingestion<H> {
    pub report: IngestionReport,
    pub handle: Option<H>,
}

/// Loads every PDF of a corpus directory, splits it into chunks and indexes
/// the chunks the store has not seen yet.
///
/// The flow is:
/// 1. Enumerate top-level `*.pdf` files (subdirectories are not visited)
/// 2. Extract pages, recording documents that fail instead of aborting
/// 3. Split the pages in corpus order
/// 4. Drop chunks whose id is already indexed
/// 5. Embed and persist the remainder as one batch
pub struct IngestionPipeline<L, S> {
    loader: L,
    store: Arc<S>,
    splitter: ChunkSplitter,
    config: IngestConfig,
}

impl<L: PageLoader, S: IndexStore> IngestionPipeline<L, S> {
    pub fn new(loader: L, store: Arc<S>, chunk: ChunkConfig, config: IngestConfig) -> Result<Self> {
        let splitter = ChunkSplitter::new(chunk)?;
        Ok(Self { loader, store, splitter, config })
    }

    pub async fn ingest(&self, document_directory: &Path) -> Result<Ingestion<S::Handle>> {
        let documents = discover_documents(document_directory)?;
        info!(
            count = documents.len(),
            dir = %document_directory.display(),
            "Discovered documents"
        );

        let mut report = IngestionReport::default();
        let mut pages = Vec::new();
        for path in documents {
            match self.loader.load_pages(&path).await {
                Ok(document_pages) => {
                    debug!(path = %path.display(), pages = document_pages.len(), "Loaded document");
                    report.documents_loaded += 1;
                    pages.extend(document_pages);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping document that failed to load");
                    report.failures.push(LoadFailure { path, reason: format!("{e:#}") });
                }
            }
        }

        let chunks = self.splitter.split(&pages);
        report.chunks_created = chunks.len();
        info!(
            documents = report.documents_loaded,
            chunks = report.chunks_created,
            "Split documents into chunks"
        );

        let mut handle = if self.store.exists() {
            Some(self.store.load().await?)
        } else {
            None
        };

        let mut staged_ids = HashSet::new();
        let staged: Vec<_> = chunks
            .into_iter()
            .filter(|chunk| {
                let indexed = handle
                    .as_ref()
                    .is_some_and(|handle| self.store.contains(handle, &chunk.id));
                let fresh = !indexed && staged_ids.insert(chunk.id.clone());
                if !fresh {
                    report.chunks_skipped_duplicate += 1;
                }
                fresh
            })
            .collect();

        if staged.is_empty() {
            if handle.is_none() && self.config.empty_corpus_policy == EmptyCorpusPolicy::Fail {
                self.store.create(staged).await?;
            }
            info!(
                skipped = report.chunks_skipped_duplicate,
                "Index is up to date, nothing to add"
            );
            return Ok(Ingestion { report, handle });
        }

        let staged_count = staged.len();
        match handle.as_mut() {
            Some(existing) => {
                report.chunks_added = self.store.add(existing, staged).await?;
            }
            None => {
                handle = Some(self.store.create(staged).await?);
                report.chunks_added = staged_count;
            }
        }

        info!(
            added = report.chunks_added,
            skipped = report.chunks_skipped_duplicate,
            "Index updated"
        );
        Ok(Ingestion { report, handle })
    }
}

/// Top-level `*.pdf` files of `dir`, sorted by file name.
fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Load {
            path: dir.to_path_buf(),
            reason: "corpus directory does not exist".to_string(),
        });
    }

    let walk = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut documents = Vec::new();
    for entry in walk {
        let entry = entry.map_err(|e| Error::Load { path: dir.to_path_buf(), reason: e.to_string() })?;
        let path = entry.path();
        if entry.depth() == 1 && path.is_file() && is_pdf(path) {
            documents.push(entry.into_path());
        }
    }
    Ok(documents)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
