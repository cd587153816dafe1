use std::sync::Arc;

use fin_core::{EmbeddingProvider, MetadataFilter, Result, RetrievalResult, VectorStore};
use tracing::debug;

/// Embeds a query and runs a filtered nearest-neighbor search.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    k_max: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>, k_max: usize) -> Self {
        Self {
            store,
            embedder,
            k_max: k_max.max(1),
        }
    }

    /// `k` is clamped, not rejected, to keep prompt size bounded. Results
    /// are re-sorted (score descending, chunk_id ascending) so the ordering
    /// contract holds regardless of backend. Query-time failures are not
    /// retried; they fail the turn.
    pub async fn retrieve(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let k = k.clamp(1, self.k_max);
        let embedding = self.embedder.embed(query).await?;
        let mut results = self.store.query(&embedding, k, filter).await?;
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        debug!(query, k, results = results.len(), "retrieval complete");
        Ok(results)
    }
}
