use std::path::{Path, PathBuf};
use std::str::FromStr;

use pdfrag_domain::{ChunkConfig, RagConfig};
use tracing::{debug, warn};

/// Resolves [`RagConfig`] from `.env` files and process environment
/// variables, falling back to defaults for anything unset.
pub struct RagEnvironment {
    cwd: PathBuf,
}

impl RagEnvironment {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    pub fn get(&self) -> RagConfig {
        let loaded = load_dotenv(&self.cwd);
        debug!(files = ?loaded, "Loaded .env files");
        Self::resolve(&self.cwd, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    fn resolve(cwd: &Path, lookup: impl Fn(&str) -> Option<String>) -> RagConfig {
        let corpus_dir = lookup("PDFRAG_CORPUS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.join("data"));
        let index_dir = lookup("PDFRAG_INDEX_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_index_dir);

        let mut config = RagConfig::new(corpus_dir, index_dir);

        let defaults = config.chunk;
        config.chunk = ChunkConfig::new(
            parse_var(&lookup, "PDFRAG_CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            parse_var(&lookup, "PDFRAG_CHUNK_OVERLAP").unwrap_or(defaults.overlap),
        );

        if let Some(top_k) = parse_var(&lookup, "PDFRAG_TOP_K") {
            config.retrieval.top_k = top_k;
        }
        if let Some(min) = parse_var(&lookup, "PDFRAG_MIN_RELEVANCE") {
            config.retrieval.min_relevance = Some(min);
        }

        if let Some(url) = lookup("OLLAMA_URL") {
            config.ollama.base_url = url;
        }
        if let Some(model) = lookup("PDFRAG_EMBEDDING_MODEL") {
            config.ollama.embedding_model = model;
        }
        if let Some(model) = lookup("PDFRAG_GENERATION_MODEL") {
            config.ollama.generation_model = model;
        }
        if let Some(temperature) = parse_var(&lookup, "PDFRAG_TEMPERATURE") {
            config.ollama.temperature = temperature;
        }
        if let Some(secs) = parse_var(&lookup, "PDFRAG_TIMEOUT_SECS") {
            config.ollama.timeout_secs = secs;
        }

        config
    }
}

/// Walks from `cwd` up to the filesystem root, loading each `.env` found.
/// dotenvy never overwrites a variable that is already set, so the closest
/// file and the real process environment take precedence. Returns the
/// files that were applied.
fn load_dotenv(cwd: &Path) -> Vec<PathBuf> {
    let mut loaded = Vec::new();
    for file in cwd.ancestors().map(|dir| dir.join(".env")) {
        if !file.is_file() {
            continue;
        }
        match dotenvy::from_path(&file) {
            Ok(()) => loaded.push(file),
            Err(error) => warn!(path = %file.display(), %error, "Skipping unreadable .env file"),
        }
    }
    loaded
}

fn default_index_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("pdfrag").join("index"))
        .unwrap_or_else(|| PathBuf::from(".pdfrag").join("index"))
}

/// Parses `key`, ignoring it with a warning when the value is malformed.
fn parse_var<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}
