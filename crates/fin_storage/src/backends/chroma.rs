use std::sync::Arc;

use async_trait::async_trait;
use chromadb::v1::{
    client::ChromaClient,
    collection::{CollectionEntries, QueryOptions},
};
use fin_core::{Chunk, Error, MetadataFilter, Result, RetrievalResult, StoreStats, VectorStore};

use super::memory::cosine_similarity;

const COLLECTION_NAME: &str = "fin_chunks";
const DEFAULT_DIMENSION: usize = 768;

/// ChromaDB-backed vector store.
///
/// Each entry is keyed by `chunk_id`; the full chunk is serialized into the
/// entry metadata under `doc` so query results round-trip without a second
/// lookup. Source equality is pushed down as `where_metadata`; remaining
/// predicates are applied to the fetched candidates, which are over-fetched
/// to compensate. Metadata-only lookups (`exists`, `stats`) go through a
/// zero-vector query, the only lookup shape the client exposes.
pub struct ChromaVectorStore {
    client: Arc<ChromaClient>,
    collection_name: String,
    dimension: usize,
}

impl ChromaVectorStore {
    pub fn new(url: Option<&str>) -> Result<Self> {
        if let Some(url) = url {
            // The chromadb client resolves its endpoint itself.
            tracing::warn!(url, "backend url flag is ignored for chroma");
        }
        let client = Arc::new(ChromaClient::new(Default::default()));
        Ok(Self {
            client,
            collection_name: COLLECTION_NAME.to_string(),
            dimension: DEFAULT_DIMENSION,
        })
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    fn entry_metadata(chunk: &Chunk) -> Result<serde_json::Map<String, serde_json::Value>> {
        let doc = serde_json::to_string(chunk)?;
        Ok(serde_json::Map::from_iter(vec![
            (
                "article_id".to_string(),
                serde_json::Value::String(chunk.article_id.clone()),
            ),
            (
                "source_name".to_string(),
                serde_json::Value::String(chunk.metadata.source_name.clone()),
            ),
            (
                "published_at".to_string(),
                serde_json::Value::String(chunk.metadata.published_at.to_rfc3339()),
            ),
            ("doc".to_string(), serde_json::Value::String(doc)),
        ]))
    }

    fn where_metadata(filter: Option<&MetadataFilter>) -> Option<serde_json::Value> {
        let filter = filter?;
        let source = filter.source_name.as_ref()?;
        Some(serde_json::json!({ "source_name": source }))
    }

    fn chunks_from_metadatas(
        metadatas: Option<Vec<Option<Vec<Option<serde_json::Map<String, serde_json::Value>>>>>>,
    ) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let Some(metadatas) = metadatas else {
            return chunks;
        };
        for group in metadatas.into_iter().flatten() {
            for metadata in group.into_iter().flatten() {
                if let Some(doc) = metadata.get("doc").and_then(|v| v.as_str()) {
                    if let Ok(chunk) = serde_json::from_str::<Chunk>(doc) {
                        chunks.push(chunk);
                    }
                }
            }
        }
        chunks
    }

    fn run_query(
        &self,
        embedding: Vec<f32>,
        n_results: usize,
        where_metadata: Option<serde_json::Value>,
    ) -> Result<Vec<Chunk>> {
        let collection = self
            .client
            .get_or_create_collection(&self.collection_name, None)
            .map_err(|e| Error::Retrieval(e.to_string()))?;

        let options = QueryOptions {
            query_embeddings: Some(vec![embedding]),
            query_texts: None,
            n_results: Some(n_results),
            where_document: None,
            where_metadata,
            include: None,
        };
        let response = collection
            .query(options, None)
            .map_err(|e| Error::Retrieval(e.to_string()))?;
        Ok(Self::chunks_from_metadatas(response.metadatas))
    }
}

#[async_trait]
impl VectorStore for ChromaVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let collection = self
            .client
            .get_or_create_collection(&self.collection_name, None)
            .map_err(Error::External)?;

        let ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        let embeddings: Vec<Vec<f32>> = chunks.iter().map(|c| c.embedding.clone()).collect();
        let metadatas = chunks
            .iter()
            .map(Self::entry_metadata)
            .collect::<Result<Vec<_>>>()?;

        let entries = CollectionEntries {
            ids,
            embeddings: Some(embeddings),
            metadatas: Some(metadatas),
            documents: None,
        };
        collection.add(entries, None).map_err(Error::External)?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>> {
        // Over-fetch so client-side range filtering still fills k.
        let candidates = self.run_query(
            vector.to_vec(),
            k.saturating_mul(4).max(k),
            Self::where_metadata(filter),
        )?;

        let mut results: Vec<RetrievalResult> = candidates
            .into_iter()
            .filter(|chunk| filter.map_or(true, |f| f.matches(&chunk.metadata)))
            .map(|chunk| RetrievalResult {
                score: cosine_similarity(vector, &chunk.embedding),
                chunk_id: chunk.chunk_id,
                text: chunk.text,
                metadata: chunk.metadata,
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        results.truncate(k);
        Ok(results)
    }

    async fn exists(&self, article_id: &str) -> Result<bool> {
        let probe = vec![0.0; self.dimension];
        let found = self
            .run_query(probe, 1, Some(serde_json::json!({ "article_id": article_id })))
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(!found.is_empty())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let probe = vec![0.0; self.dimension];
        let chunks = self
            .run_query(probe, 100_000, None)
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut stats = StoreStats {
            total_chunks: chunks.len(),
            ..StoreStats::default()
        };
        for chunk in &chunks {
            *stats
                .per_source_counts
                .entry(chunk.metadata.source_name.clone())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }
}
