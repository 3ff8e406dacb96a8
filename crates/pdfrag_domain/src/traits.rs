use std::path::Path;

use async_trait::async_trait;

use crate::{GenerationError, RawPage};

/// Extracts page-level text from a single document.
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load_pages(&self, path: &Path) -> anyhow::Result<Vec<RawPage>>;
}

/// Maps text into a fixed-dimension vector space.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model, recorded alongside the index.
    fn model(&self) -> &str;

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Embedder returned no vector for the query"))
    }
}

/// A language model that turns a prompt into a complete answer.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[cfg(test)]
mod tests {
    use crate::{Embedder, Generator, PageLoader};

    #[test]
    fn traits_are_object_safe() {
        let _: Option<Box<dyn PageLoader>> = None;
        let _: Option<Box<dyn Embedder>> = None;
        let _: Option<Box<dyn Generator>> = None;
    }
}
