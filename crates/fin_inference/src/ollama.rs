use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use fin_core::{EmbeddingProvider, EngineConfig, Error, LanguageModel, Result};
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Ollama-backed model. Generation goes through `/api/generate` (NDJSON when
/// streaming), embeddings through `/api/embeddings`. Everything stays on the
/// host machine; there is no network egress beyond the configured base URL.
pub struct OllamaModel {
    client: Client,
    base_url: String,
    llm_model: String,
    embedding_model: String,
    dimension: usize,
}

impl OllamaModel {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            llm_model: config.llm_model.clone(),
            embedding_model: config.embedding_model.clone(),
            dimension: embedding_dimension(&config.embedding_model),
        })
    }
}

/// Known dimensions for the embedding models this system is run with.
fn embedding_dimension(model: &str) -> usize {
    match model {
        m if m.starts_with("nomic-embed-text") => 768,
        m if m.starts_with("all-minilm") => 384,
        m if m.starts_with("mxbai-embed-large") => 1024,
        _ => 768,
    }
}

impl fmt::Debug for OllamaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaModel")
            .field("base_url", &self.base_url)
            .field("llm_model", &self.llm_model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.llm_model,
            prompt,
            stream: false,
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::GenerationUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::GenerationUnavailable(e.to_string()))?
            .json::<GenerateChunk>()
            .await
            .map_err(|e| Error::GenerationUnavailable(e.to_string()))?;
        Ok(response.response)
    }

    async fn stream(&self, prompt: &str, tokens: mpsc::Sender<String>) -> Result<String> {
        let request = GenerateRequest {
            model: &self.llm_model,
            prompt,
            stream: true,
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::GenerationUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::GenerationUnavailable(e.to_string()))?;

        let mut full_text = String::new();
        let mut line_buffer = String::new();
        let mut stream = response.bytes_stream();

        while let Some(bytes) = stream.next().await {
            let bytes = bytes.map_err(|e| Error::GenerationUnavailable(e.to_string()))?;
            line_buffer.push_str(&String::from_utf8_lossy(&bytes));

            // Ollama streams one JSON object per line.
            while let Some(newline) = line_buffer.find('\n') {
                let line: String = line_buffer.drain(..=newline).collect();
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let chunk: GenerateChunk = serde_json::from_str(line)
                    .map_err(|e| Error::GenerationUnavailable(format!("bad stream chunk: {}", e)))?;
                if !chunk.response.is_empty() {
                    full_text.push_str(&chunk.response);
                    if tokens.send(chunk.response).await.is_err() {
                        // Consumer hung up; dropping the response body aborts
                        // the in-flight request.
                        return Err(Error::Cancelled);
                    }
                }
                if chunk.done {
                    return Ok(full_text);
                }
            }
        }
        Ok(full_text)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaModel {
    fn model_name(&self) -> &str {
        &self.embedding_model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Embedding(e.to_string()))?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;
        if response.embedding.is_empty() {
            return Err(Error::Embedding("model returned an empty vector".to_string()));
        }
        Ok(response.embedding)
    }
}
