use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use pdfrag_domain::{Embedder, GenerationError, Generator, OllamaConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn http_client(config: &OllamaConfig) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeds text through a local Ollama server's `/api/embed` endpoint.
pub struct OllamaEmbedder {
    client: Client,
    url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(config: &OllamaConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            url: endpoint(&config.base_url, "api/embed"),
            model: config.embedding_model.clone(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let response = self
            .client
            .post(&self.url)
            .json(&EmbedRequest { model: &self.model, input: texts })
            .send()
            .await
            .with_context(|| format!("Failed to reach embedding service at {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding service returned {status}: {body}");
        }

        let body: EmbedResponse = response
            .json()
            .await
            .context("Embedding service returned a malformed body")?;
        anyhow::ensure!(
            body.embeddings.len() == expected,
            "Expected {expected} embeddings but received {}",
            body.embeddings.len()
        );
        debug!(count = expected, model = %self.model, "Embedded batch");
        Ok(body.embeddings)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

/// Single-shot, non-streaming completion against `/api/generate`.
pub struct OllamaGenerator {
    client: Client,
    url: String,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

impl OllamaGenerator {
    pub fn new(config: &OllamaConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            url: endpoint(&config.base_url, "api/generate"),
            model: config.generation_model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::Timeout(self.timeout_secs)
        } else {
            GenerationError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: self.temperature },
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(GenerationError::Status { status: status.as_u16(), body });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Protocol(format!("invalid JSON body: {e}")))?;
        match (parsed.response, parsed.error) {
            (Some(text), _) => Ok(text),
            (None, Some(error)) => Err(GenerationError::Protocol(error)),
            (None, None) => Err(GenerationError::Protocol(
                "body has no `response` field".to_string(),
            )),
        }
    }
}
