use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use fin_core::{Chunk, MetadataFilter, Result, RetrievalResult, StoreStats, VectorStore};
use tokio::sync::RwLock;

/// In-memory vector store, the default backend.
///
/// Chunks are keyed by `chunk_id` in a `BTreeMap`, so iteration order is
/// stable and equal-score query results come out in ascending chunk_id order
/// without extra bookkeeping. One write lock spans a whole `upsert` call,
/// which is what makes per-article ingestion atomic for concurrent readers.
pub struct MemoryVectorStore {
    inner: Arc<RwLock<BTreeMap<String, Chunk>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        let mut store = self.inner.write().await;
        for chunk in chunks {
            store.insert(chunk.chunk_id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>> {
        let store = self.inner.read().await;
        let mut results: Vec<RetrievalResult> = store
            .values()
            .filter(|chunk| filter.map_or(true, |f| f.matches(&chunk.metadata)))
            .map(|chunk| RetrievalResult {
                chunk_id: chunk.chunk_id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                score: cosine_similarity(vector, &chunk.embedding),
            })
            .collect();
        // Descending score; chunk_id ascending already holds for equal scores
        // because BTreeMap iteration is ordered and the sort is stable.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        Ok(results)
    }

    async fn exists(&self, article_id: &str) -> Result<bool> {
        let store = self.inner.read().await;
        Ok(store.values().any(|chunk| chunk.article_id == article_id))
    }

    async fn stats(&self) -> Result<StoreStats> {
        let store = self.inner.read().await;
        let mut stats = StoreStats {
            total_chunks: store.len(),
            ..StoreStats::default()
        };
        for chunk in store.values() {
            *stats
                .per_source_counts
                .entry(chunk.metadata.source_name.clone())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }
}
