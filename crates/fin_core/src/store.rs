use async_trait::async_trait;

use crate::types::{Chunk, MetadataFilter, RetrievalResult, StoreStats};
use crate::Result;

/// Persistence boundary for (chunk text, vector, metadata) triples.
///
/// `upsert` must be atomic per call: ingestion hands over all chunks of one
/// article at once, and concurrent readers must never observe a partially
/// written article.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace chunks, keyed by `chunk_id`.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Nearest-neighbor search, ordered by descending score. Ties on equal
    /// score break by ascending `chunk_id` so results are reproducible.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>>;

    /// Whether any chunk of the given article is already stored.
    async fn exists(&self, article_id: &str) -> Result<bool>;

    async fn stats(&self) -> Result<StoreStats>;
}
