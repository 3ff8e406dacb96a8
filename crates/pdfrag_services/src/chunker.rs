use pdfrag_domain::{Chunk, ChunkConfig, RawPage, Result};

/// Tracks which page the previous window came from so sequence numbers
/// restart at 0 on every new `(source_path, page_number)` run.
#[derive(Debug, Default)]
struct PageCursor {
    current: Option<(String, usize)>,
    next_sequence: usize,
}

impl PageCursor {
    /// Sequence number for the next window of the given page.
    fn advance(&mut self, source_path: &str, page_number: usize) -> usize {
        let same_page = self
            .current
            .as_ref()
            .is_some_and(|(path, page)| path == source_path && *page == page_number);

        if !same_page {
            self.current = Some((source_path.to_string(), page_number));
            self.next_sequence = 0;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

/// Splits page text into fixed-size, overlapping character windows.
///
/// Sizes are counted in Unicode scalar values, never bytes, so a window never
/// cuts a multi-byte character in half.
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    config: ChunkConfig,
}

impl ChunkSplitter {
    /// Fails with a configuration error when `overlap >= chunk_size` or the
    /// size is zero.
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn split(&self, pages: &[RawPage]) -> Vec<Chunk> {
        let mut cursor = PageCursor::default();
        pages
            .iter()
            .flat_map(|page| {
                self.windows(&page.text)
                    .into_iter()
                    .map(|text| {
                        let sequence = cursor.advance(&page.source_path, page.page_number);
                        Chunk::new(page.source_path.clone(), page.page_number, sequence, text)
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn windows(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let size = self.config.chunk_size;
        let stride = self.config.stride();

        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + size).min(chars.len());
            windows.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        windows
    }
}
