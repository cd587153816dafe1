use std::sync::Arc;

use fin_core::{EmbeddingProvider, EngineConfig, Error, LanguageModel, Result};

pub mod offline;
pub mod ollama;

pub use offline::OfflineModel;
pub use ollama::OllamaModel;

/// Builds the language model and embedding provider from their CLI/config
/// name. Both roles are served by the same underlying model object so the
/// embedding dimension stays consistent between ingestion and query time.
pub fn create_models(
    kind: &str,
    config: &EngineConfig,
) -> Result<(Arc<dyn LanguageModel>, Arc<dyn EmbeddingProvider>)> {
    match kind {
        "ollama" => {
            let model = Arc::new(OllamaModel::new(config)?);
            Ok((model.clone(), model))
        }
        "offline" => {
            let model = Arc::new(OfflineModel::new());
            Ok((model.clone(), model))
        }
        other => Err(Error::Config(format!("unknown model backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::{create_models, OfflineModel, OllamaModel};
    pub use fin_core::{EmbeddingProvider, LanguageModel, Result};
}
