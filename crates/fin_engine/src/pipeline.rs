use std::sync::Arc;

use fin_core::{
    chunk_id_for, Article, Chunk, ChunkMetadata, EmbeddingProvider, Error, IngestReport, Result,
    SourceAdapter, VectorStore,
};
use tracing::{debug, info, warn};

use crate::processor::{ChunkSpan, TextProcessor};

/// Outcome of ingesting a single article.
#[derive(Debug, PartialEq)]
pub enum ArticleOutcome {
    /// The article was already in the store; nothing was embedded.
    Duplicate,
    /// The article was ingested with this many chunks.
    Ingested(usize),
}

/// Orchestrates scrape → clean → chunk → embed → upsert.
///
/// One adapter failing never aborts the others, and one article failing
/// never aborts its source: failures are counted into the report. Upserts
/// happen once per article after every chunk embedded, so the store never
/// holds a partial chunk set.
pub struct IngestionPipeline {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    processor: TextProcessor,
    retries: u32,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        processor: TextProcessor,
        retries: u32,
    ) -> Self {
        Self {
            store,
            embedder,
            processor,
            retries,
        }
    }

    pub async fn ingest(&self, adapters: &[Arc<dyn SourceAdapter>]) -> IngestReport {
        let mut report = IngestReport::default();
        for adapter in adapters {
            let source = adapter.source_name();
            let urls = match adapter.article_urls().await {
                Ok(urls) => urls,
                Err(e) => {
                    warn!(source, error = %e, "failed to list articles for source");
                    report.record_source_error(source);
                    continue;
                }
            };
            info!(source, candidates = urls.len(), "fetching candidate articles");

            for url in urls {
                let article = match adapter.fetch_article(&url).await {
                    Ok(article) => article,
                    Err(e) => {
                        debug!(source, url, error = %e, "skipping article");
                        report.record_source_error(source);
                        continue;
                    }
                };
                report.articles_fetched += 1;

                match self.ingest_article(&article).await {
                    Ok(ArticleOutcome::Duplicate) => report.duplicates_skipped += 1,
                    Ok(ArticleOutcome::Ingested(chunks)) => {
                        report.articles_new += 1;
                        report.chunks_written += chunks;
                    }
                    Err(e) => {
                        warn!(source, url, error = %e, "failed to ingest article");
                        report.articles_failed += 1;
                        report.record_source_error(source);
                    }
                }
            }
        }
        info!(
            fetched = report.articles_fetched,
            new = report.articles_new,
            chunks = report.chunks_written,
            duplicates = report.duplicates_skipped,
            failed = report.articles_failed,
            "ingestion run complete"
        );
        report
    }

    /// Ingests one article transactionally: all of its chunks are embedded
    /// before a single upsert, and an embedding failure retries the whole
    /// article up to the configured budget before giving up on it.
    pub async fn ingest_article(&self, article: &Article) -> Result<ArticleOutcome> {
        if self.store.exists(&article.article_id).await? {
            debug!(article_id = %article.article_id, "article already ingested");
            return Ok(ArticleOutcome::Duplicate);
        }

        let cleaned = self.processor.clean(&article.body_text);
        let spans = self.processor.chunk(&cleaned);
        if spans.is_empty() {
            return Ok(ArticleOutcome::Ingested(0));
        }

        let mut attempt = 0;
        let chunks = loop {
            match self.embed_spans(article, &spans).await {
                Ok(chunks) => break chunks,
                Err(e) if attempt < self.retries && e.is_ingest_recoverable() => {
                    attempt += 1;
                    warn!(
                        article_id = %article.article_id,
                        attempt,
                        error = %e,
                        "embedding failed, retrying article"
                    );
                }
                Err(e) => return Err(e),
            }
        };

        self.store.upsert(&chunks).await?;
        Ok(ArticleOutcome::Ingested(chunks.len()))
    }

    async fn embed_spans(&self, article: &Article, spans: &[ChunkSpan]) -> Result<Vec<Chunk>> {
        let metadata = ChunkMetadata {
            source_name: article.source_name.clone(),
            published_at: article.published_at,
            category: article.category.clone(),
            title: article.title.clone(),
            url: article.url.clone(),
        };

        let mut chunks = Vec::with_capacity(spans.len());
        for span in spans {
            let embedding = self.embedder.embed(&span.text).await?;
            if embedding.len() != self.embedder.dimension() {
                return Err(Error::Embedding(format!(
                    "model {} returned {} dimensions, expected {}",
                    self.embedder.model_name(),
                    embedding.len(),
                    self.embedder.dimension()
                )));
            }
            chunks.push(Chunk {
                chunk_id: chunk_id_for(&article.article_id, span.start_offset),
                article_id: article.article_id.clone(),
                text: span.text.clone(),
                start_offset: span.start_offset,
                end_offset: span.end_offset,
                embedding,
                metadata: metadata.clone(),
            });
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{article, MockEmbedder, StaticAdapter};
    use fin_storage::MemoryVectorStore;

    fn pipeline(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> IngestionPipeline {
        IngestionPipeline::new(store, embedder, TextProcessor::new(50, 10).unwrap(), 1)
    }

    fn long_article(url: &str, source: &str) -> Article {
        article(url, source, &"market words ".repeat(80))
    }

    #[tokio::test]
    async fn test_ingest_writes_chunks_and_counts() {
        let store = Arc::new(MemoryVectorStore::new());
        let embedder = Arc::new(MockEmbedder::new());
        let adapter: Arc<dyn SourceAdapter> = Arc::new(StaticAdapter::new(
            "Livemint",
            vec![long_article("https://www.livemint.com/market/a-1", "Livemint")],
        ));

        let report = pipeline(store.clone(), embedder).ingest(&[adapter]).await;
        assert_eq!(report.articles_fetched, 1);
        assert_eq!(report.articles_new, 1);
        assert!(report.chunks_written > 1);
        assert_eq!(report.duplicates_skipped, 0);
        assert!(report.source_errors.is_empty());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, report.chunks_written);
        assert_eq!(stats.per_source_counts["Livemint"], report.chunks_written);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let store = Arc::new(MemoryVectorStore::new());
        let embedder = Arc::new(MockEmbedder::new());
        let articles = vec![long_article("https://www.livemint.com/market/a-1", "Livemint")];
        let adapter: Arc<dyn SourceAdapter> =
            Arc::new(StaticAdapter::new("Livemint", articles.clone()));
        let pipeline = pipeline(store.clone(), embedder);

        let first = pipeline.ingest(std::slice::from_ref(&adapter)).await;
        let before = store.stats().await.unwrap().total_chunks;

        let second = pipeline.ingest(&[adapter]).await;
        assert_eq!(second.duplicates_skipped, 1);
        assert_eq!(second.articles_new, 0);
        assert_eq!(second.chunks_written, 0);
        assert_eq!(store.stats().await.unwrap().total_chunks, before);
        assert_eq!(first.chunks_written, before);
    }

    #[tokio::test]
    async fn test_adapter_failure_is_isolated() {
        let store = Arc::new(MemoryVectorStore::new());
        let embedder = Arc::new(MockEmbedder::new());
        let broken: Arc<dyn SourceAdapter> = Arc::new(StaticAdapter::broken("Moneycontrol"));
        let healthy: Arc<dyn SourceAdapter> = Arc::new(StaticAdapter::new(
            "Livemint",
            vec![long_article("https://www.livemint.com/market/a-1", "Livemint")],
        ));

        let report = pipeline(store.clone(), embedder).ingest(&[broken, healthy]).await;
        assert_eq!(report.source_errors["Moneycontrol"], 1);
        assert_eq!(report.articles_new, 1);
        assert!(store.stats().await.unwrap().total_chunks > 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_article_without_partial_chunks() {
        let store = Arc::new(MemoryVectorStore::new());
        // Fails every call, which exhausts the retry budget.
        let embedder = Arc::new(MockEmbedder::failing_times(u32::MAX));
        let art = long_article("https://www.livemint.com/market/a-1", "Livemint");
        let article_id = art.article_id.clone();
        let adapter: Arc<dyn SourceAdapter> = Arc::new(StaticAdapter::new("Livemint", vec![art]));

        let report = pipeline(store.clone(), embedder).ingest(&[adapter]).await;
        assert_eq!(report.articles_failed, 1);
        assert_eq!(report.articles_new, 0);
        assert_eq!(store.stats().await.unwrap().total_chunks, 0);
        assert!(!store.exists(&article_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_embedding_retry_recovers_transient_failure() {
        let store = Arc::new(MemoryVectorStore::new());
        // First embed call fails, the article-level retry then succeeds.
        let embedder = Arc::new(MockEmbedder::failing_times(1));
        let adapter: Arc<dyn SourceAdapter> = Arc::new(StaticAdapter::new(
            "Livemint",
            vec![long_article("https://www.livemint.com/market/a-1", "Livemint")],
        ));

        let report = pipeline(store.clone(), embedder).ingest(&[adapter]).await;
        assert_eq!(report.articles_new, 1);
        assert_eq!(report.articles_failed, 0);
        assert!(store.stats().await.unwrap().total_chunks > 0);
    }

    #[tokio::test]
    async fn test_reingest_produces_identical_chunk_ids() {
        let embedder = Arc::new(MockEmbedder::new());
        let art = long_article("https://www.livemint.com/market/a-1", "Livemint");

        let store_a = Arc::new(MemoryVectorStore::new());
        pipeline(store_a.clone(), embedder.clone())
            .ingest_article(&art)
            .await
            .unwrap();
        let store_b = Arc::new(MemoryVectorStore::new());
        pipeline(store_b.clone(), embedder)
            .ingest_article(&art)
            .await
            .unwrap();

        let probe = vec![0.5; 8];
        let ids_a: Vec<String> = store_a
            .query(&probe, 100, None)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.chunk_id)
            .collect();
        let ids_b: Vec<String> = store_b
            .query(&probe, 100, None)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.chunk_id)
            .collect();
        assert_eq!(ids_a, ids_b);
        assert!(!ids_a.is_empty());
    }
}
