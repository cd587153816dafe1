use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

/// Maps text to a fixed-dimension vector.
///
/// The same model (and therefore dimension) must be used at ingestion and
/// query time; mixing models makes similarity scores meaningless. That
/// consistency is a configuration invariant, not something enforced here.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// Embedding dimension, e.g. 384/768/1024 depending on the model.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// A locally hosted language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Single-shot completion, used for query rewriting.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Streaming generation. Tokens are pushed into `tokens` as they arrive;
    /// the full text is returned once the stream ends.
    ///
    /// A dropped receiver means the consumer went away: implementations must
    /// stop the underlying call promptly and return `Error::Cancelled`.
    async fn stream(&self, prompt: &str, tokens: mpsc::Sender<String>) -> Result<String>;
}
