use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Recognized configuration surface for the whole engine. Every field has a
/// default, so a config file is optional and may be partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ollama model used for generation and query rewriting.
    pub llm_model: String,
    /// Ollama model used for embeddings. Must match between ingestion and
    /// query time or retrieval scores are meaningless.
    pub embedding_model: String,
    pub ollama_url: String,
    pub chunk_max_tokens: usize,
    pub chunk_overlap_tokens: usize,
    pub retrieval_k_default: usize,
    pub retrieval_k_max: usize,
    pub history_window_turns: usize,
    /// Per-article retry budget for embedding failures during ingestion.
    pub ingest_retries: u32,
    pub request_timeout_secs: u64,
    pub sources: Vec<SourceConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm_model: "llama3".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            chunk_max_tokens: 300,
            chunk_overlap_tokens: 50,
            retrieval_k_default: 5,
            retrieval_k_max: 20,
            history_window_turns: 5,
            ingest_retries: 2,
            request_timeout_secs: 30,
            sources: SourceConfig::defaults(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_max_tokens == 0 {
            return Err(Error::Config("chunk_max_tokens must be positive".to_string()));
        }
        if self.chunk_overlap_tokens >= self.chunk_max_tokens {
            return Err(Error::Config(format!(
                "chunk_overlap_tokens ({}) must be smaller than chunk_max_tokens ({})",
                self.chunk_overlap_tokens, self.chunk_max_tokens
            )));
        }
        if self.retrieval_k_max == 0 {
            return Err(Error::Config("retrieval_k_max must be positive".to_string()));
        }
        if self.retrieval_k_default > self.retrieval_k_max {
            return Err(Error::Config(format!(
                "retrieval_k_default ({}) exceeds retrieval_k_max ({})",
                self.retrieval_k_default, self.retrieval_k_max
            )));
        }
        if self.history_window_turns == 0 {
            return Err(Error::Config("history_window_turns must be positive".to_string()));
        }
        Ok(())
    }
}

/// One outlet's scraping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub name: String,
    pub base_url: String,
    pub sections: Vec<String>,
    pub enabled: bool,
    pub max_articles_per_section: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_url: String::new(),
            sections: vec!["/".to_string()],
            enabled: true,
            max_articles_per_section: 7,
        }
    }
}

impl SourceConfig {
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                name: "Economic Times".to_string(),
                base_url: "https://economictimes.indiatimes.com".to_string(),
                sections: vec!["/markets".to_string(), "/news/economy".to_string()],
                ..Self::default()
            },
            Self {
                name: "Livemint".to_string(),
                base_url: "https://www.livemint.com".to_string(),
                sections: vec!["/market".to_string(), "/economy".to_string()],
                ..Self::default()
            },
            Self {
                name: "Moneycontrol".to_string(),
                base_url: "https://www.moneycontrol.com".to_string(),
                sections: vec!["/news/business/markets".to_string()],
                ..Self::default()
            },
        ]
    }
}
