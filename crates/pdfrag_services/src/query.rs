use std::sync::Arc;

use indexmap::IndexSet;
use pdfrag_domain::{
    Answer, Error, GenerationError, Generator, IndexStore, QueryResult, ReasoningMarkers, Result,
    RetrievalConfig, Source,
};
use tracing::{debug, info};

use crate::postprocess::clean_response;

/// Retrieved text handed to the model, with the pages it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub text: String,
    pub sources: Vec<Source>,
}

impl Context {
    /// Concatenates hits in rank order, each under a `[path - Page n]`
    /// header. Hits that would push the block past `max_chars` are left out,
    /// except the first, which is always kept.
    pub fn assemble(results: &QueryResult, max_chars: usize) -> Self {
        let mut text = String::new();
        let mut used = 0;
        let mut sources = IndexSet::new();

        for hit in results.iter() {
            let source = Source::from(&hit.chunk);
            let block = format!("\n[{source}]\n{}\n", hit.chunk.text);
            let size = block.chars().count();
            if !sources.is_empty() && used + size > max_chars {
                debug!(chunk = %hit.chunk.id, "Context budget exhausted, dropping chunk");
                continue;
            }
            used += size;
            text.push_str(&block);
            sources.insert(source);
        }

        Self { text, sources: sources.into_iter().collect() }
    }
}

pub fn build_prompt(context: &str, query: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {query}\nAnswer:")
}

/// Answers questions from an index: search, assemble context, generate,
/// clean up.
pub struct QueryEngine<S, G> {
    store: Arc<S>,
    generator: G,
    config: RetrievalConfig,
    markers: ReasoningMarkers,
}

impl<S: IndexStore, G: Generator> QueryEngine<S, G> {
    pub fn new(
        store: Arc<S>,
        generator: G,
        config: RetrievalConfig,
        markers: ReasoningMarkers,
    ) -> Self {
        Self { store, generator, config, markers }
    }

    /// Answers with the configured `top_k`.
    pub async fn ask(&self, query: &str, handle: &S::Handle) -> Result<Answer> {
        self.answer(query, handle, self.config.top_k).await
    }

    pub async fn answer(&self, query: &str, handle: &S::Handle, k: usize) -> Result<Answer> {
        let results = self.store.search(handle, query, k).await?;
        if results.is_empty() {
            return Err(Error::NoContext);
        }

        let context = Context::assemble(&results, self.config.max_context_chars);
        info!(
            chunks = results.len(),
            pages = context.sources.len(),
            "Context retrieved"
        );

        let prompt = build_prompt(&context.text, query);
        debug!(chars = prompt.len(), "Sending prompt to generation service");
        let raw = self.generator.generate(&prompt).await?;

        let text = clean_response(&raw, &self.markers);
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse.into());
        }

        Ok(Answer { text, sources: context.sources })
    }
}
