use std::path::PathBuf;

use clap::Parser;
use pdfrag_domain::RagConfig;

#[derive(Parser, Debug)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Delete the persisted index before ingesting.
    #[arg(long, default_value_t = false)]
    pub reset: bool,

    /// Directory whose top-level PDF files are indexed.
    #[arg(long, value_name = "DIR")]
    pub corpus: Option<PathBuf>,

    /// Directory holding the persisted index.
    #[arg(long, value_name = "DIR")]
    pub index: Option<PathBuf>,

    /// Number of chunks retrieved per question.
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub top_k: Option<usize>,

    /// Answer a single question and exit instead of starting the
    /// interactive loop.
    #[arg(long, short = 'q', value_name = "TEXT")]
    pub query: Option<String>,

    /// Log at debug level.
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Layers the flags that were given over an environment-derived config.
    pub fn apply(&self, mut config: RagConfig) -> RagConfig {
        if let Some(corpus) = &self.corpus {
            config.corpus_dir = corpus.clone();
        }
        if let Some(index) = &self.index {
            config.index_dir = index.clone();
        }
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        config
    }
}
