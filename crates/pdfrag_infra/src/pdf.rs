use std::path::Path;

use anyhow::Context as _;
use async_trait::async_trait;
use pdfrag_domain::{PageLoader, RawPage};
use tracing::debug;

/// Extracts per-page text from PDF files.
///
/// Pages are numbered from zero. The source path recorded on each page is the
/// file name, so chunk ids stay stable when the corpus directory moves.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfPageLoader;

#[async_trait]
impl PageLoader for PdfPageLoader {
    async fn load_pages(&self, path: &Path) -> anyhow::Result<Vec<RawPage>> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        // Extraction is CPU bound and panics on some malformed inputs; the
        // blocking task contains both.
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .with_context(|| format!("PDF parser crashed on {}", path.display()))?
        .map_err(|e| anyhow::anyhow!("Failed to extract text from {}: {e}", path.display()))?;

        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!(path = %path.display(), pages = pages.len(), "Extracted PDF text");

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(page_number, text)| RawPage::new(source.clone(), page_number, text))
            .collect())
    }
}
