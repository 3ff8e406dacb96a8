use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use pdfrag_domain::{Answer, IndexStore, IngestionReport, RagConfig};
use pdfrag_infra::{
    FlatIndex, FlatIndexStore, OllamaEmbedder, OllamaGenerator, PdfPageLoader, RagEnvironment,
};
use pdfrag_services::{Ingestion, IngestionPipeline, QueryEngine};
use tracing::{debug, info};

use crate::cli::Cli;
use crate::editor::{QueryEditor, ReadResult};
use crate::prompt::QueryPrompt;

type Engine = QueryEngine<FlatIndexStore<OllamaEmbedder>, OllamaGenerator>;

/// What the question loop does with the outcome of one query.
#[derive(Debug, PartialEq)]
pub enum Turn {
    Answered(String),
    Failed(String),
}

impl Turn {
    /// Query-level failures become a [`Turn::Failed`] so the session goes on;
    /// anything else ends it.
    pub fn from_outcome(outcome: pdfrag_domain::Result<Answer>) -> Result<Self> {
        match outcome {
            Ok(answer) => Ok(Turn::Answered(format_answer(&answer))),
            Err(error) if error.is_recoverable() => Ok(Turn::Failed(error.to_string())),
            Err(error) => Err(error.into()),
        }
    }
}

pub struct UI {
    cli: Cli,
    config: RagConfig,
}

impl UI {
    pub fn init(cli: Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let config = cli.apply(RagEnvironment::new(cwd).get());
        Self::new(cli, config)
    }

    /// Fails on invalid settings before anything is reset or ingested.
    pub fn new(cli: Cli, config: RagConfig) -> Result<Self> {
        config.validate()?;
        debug!(?config, "Resolved configuration");
        Ok(Self { cli, config })
    }

    pub async fn run(&self) -> Result<()> {
        let config = &self.config;
        let store = Arc::new(FlatIndexStore::new(
            config.index_dir.clone(),
            OllamaEmbedder::new(&config.ollama)?,
            &config.retrieval,
            &config.ingest,
        ));

        if self.cli.reset {
            store.reset().await?;
            println!("{} {}", "Index cleared:".yellow().bold(), config.index_dir.display());
        }

        let pipeline = IngestionPipeline::new(
            PdfPageLoader,
            store.clone(),
            config.chunk,
            config.ingest.clone(),
        )?;
        let Ingestion { report, handle } = pipeline.ingest(&config.corpus_dir).await?;
        print!("{}", format_report(&report));

        let Some(handle) = handle else {
            anyhow::bail!(
                "No documents indexed. Add PDF files to {} and run again",
                config.corpus_dir.display()
            );
        };

        let engine = QueryEngine::new(
            store,
            OllamaGenerator::new(&config.ollama)?,
            config.retrieval.clone(),
            config.reasoning.clone(),
        );

        match self.cli.query.clone() {
            Some(question) => {
                let answer = engine.ask(&question, &handle).await?;
                print!("{}", format_answer(&answer));
                Ok(())
            }
            None => self.chat(&engine, &handle).await,
        }
    }

    async fn chat(&self, engine: &Engine, handle: &FlatIndex) -> Result<()> {
        let history = dirs::data_dir().map(|dir| dir.join("pdfrag").join("history.txt"));
        let mut editor = QueryEditor::new(history);
        let prompt = QueryPrompt::new(handle.len());
        println!("{}", "Ask a question about your documents, or type 'exit' to quit.".dimmed());

        loop {
            match editor.prompt(&prompt)? {
                ReadResult::Exit => break,
                ReadResult::Empty => continue,
                ReadResult::Question(question) => {
                    match Turn::from_outcome(engine.ask(&question, handle).await)? {
                        Turn::Answered(text) => print!("{text}"),
                        Turn::Failed(reason) => eprintln!("{} {reason}", "Error:".red().bold()),
                    }
                }
            }
        }

        info!("Session ended");
        Ok(())
    }
}

pub fn format_report(report: &IngestionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} documents, {} chunks ({} new, {} already indexed)",
        "Indexed".green().bold(),
        report.documents_loaded,
        report.chunks_created,
        report.chunks_added,
        report.chunks_skipped_duplicate
    );
    for failure in &report.failures {
        let _ = writeln!(
            out,
            "{} {}: {}",
            "Skipped".yellow().bold(),
            failure.path.display(),
            failure.reason
        );
    }
    out
}

pub fn format_answer(answer: &Answer) -> String {
    let mut out = format!("\n{}\n{}\n", "Answer:".green().bold(), answer.text);
    if !answer.sources.is_empty() {
        let _ = writeln!(out, "\n{}", "Sources:".cyan().bold());
        for source in &answer.sources {
            let _ = writeln!(out, "  - {source}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use pdfrag_domain::{ChunkConfig, Error, GenerationError, LoadFailure, Source};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn embedding_outage_keeps_the_session_alive() {
        let fixture = Err(Error::Embedding(anyhow::anyhow!(
            "Failed to reach embedding service at http://localhost:11434/api/embed"
        )));
        let actual = matches!(Turn::from_outcome(fixture), Ok(Turn::Failed(_)));
        let expected = true;
        assert_eq!(actual, expected);
    }

    #[test]
    fn generation_and_missing_context_keep_the_session_alive() {
        let actual = (
            matches!(Turn::from_outcome(Err(Error::NoContext)), Ok(Turn::Failed(_))),
            matches!(
                Turn::from_outcome(Err(GenerationError::Timeout(120).into())),
                Ok(Turn::Failed(_))
            ),
        );
        let expected = (true, true);
        assert_eq!(actual, expected);
    }

    #[test]
    fn configuration_error_ends_the_session() {
        let fixture = Err(Error::Configuration("k must be greater than zero".to_string()));
        let actual = Turn::from_outcome(fixture).is_err();
        let expected = true;
        assert_eq!(actual, expected);
    }

    #[test]
    fn invalid_chunk_geometry_is_rejected_before_reset() {
        let cli = Cli::try_parse_from(["pdfrag", "--reset"]).unwrap();
        let fixture = RagConfig::new("data", "index").chunk(ChunkConfig::new(1000, 5000));
        let actual = UI::new(cli, fixture).is_err();
        let expected = true;
        assert_eq!(actual, expected);
    }

    #[test]
    fn zero_top_k_from_environment_is_rejected_up_front() {
        let cli = Cli::try_parse_from(["pdfrag"]).unwrap();
        let mut fixture = RagConfig::new("data", "index");
        fixture.retrieval.top_k = 0;
        let actual = UI::new(cli, fixture).is_err();
        let expected = true;
        assert_eq!(actual, expected);
    }

    #[test]
    fn answer_lists_each_source_once() {
        colored::control::set_override(false);
        let fixture = Answer {
            text: "Values have one owner.".to_string(),
            sources: vec![Source::new("rust.pdf", 3), Source::new("rust.pdf", 4)],
        };

        let actual = format_answer(&fixture);
        let expected = "\nAnswer:\nValues have one owner.\n\nSources:\n  - rust.pdf - Page 3\n  - rust.pdf - Page 4\n";
        assert_eq!(actual, expected);
    }

    #[test]
    fn report_mentions_skipped_documents() {
        colored::control::set_override(false);
        let fixture = IngestionReport {
            documents_loaded: 2,
            chunks_created: 10,
            chunks_added: 4,
            chunks_skipped_duplicate: 6,
            failures: vec![LoadFailure {
                path: PathBuf::from("data/bad.pdf"),
                reason: "not a PDF".to_string(),
            }],
        };

        let actual = format_report(&fixture);
        let expected = "Indexed 2 documents, 10 chunks (4 new, 6 already indexed)\nSkipped data/bad.pdf: not a PDF\n";
        assert_eq!(actual, expected);
    }
}
