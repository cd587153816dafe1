use std::sync::Arc;

use fin_core::{
    ConversationTurn, EmbeddingProvider, EngineConfig, IngestReport, LanguageModel,
    MetadataFilter, Result, SourceAdapter, StoreStats, VectorStore,
};
use tracing::info;

use crate::orchestrator::{AnswerStream, GenerationOrchestrator};
use crate::pipeline::IngestionPipeline;
use crate::processor::TextProcessor;
use crate::retriever::Retriever;
use crate::rewriter::QueryRewriter;
use crate::session::SessionManager;

/// The assembled engine: ingestion pipeline, query path and session registry
/// sharing one store and one set of models.
pub struct RagEngine {
    config: EngineConfig,
    store: Arc<dyn VectorStore>,
    sessions: SessionManager,
    orchestrator: GenerationOrchestrator,
    pipeline: IngestionPipeline,
}

impl RagEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let processor = TextProcessor::from_config(&config)?;
        let pipeline = IngestionPipeline::new(
            store.clone(),
            embedder.clone(),
            processor,
            config.ingest_retries,
        );
        let orchestrator = GenerationOrchestrator::new(
            QueryRewriter::new(llm.clone()),
            Retriever::new(store.clone(), embedder, config.retrieval_k_max),
            llm,
            config.history_window_turns,
            config.retrieval_k_default,
        );
        Ok(Self {
            config,
            store,
            sessions: SessionManager::new(),
            orchestrator,
            pipeline,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one ingestion pass over the configured sources.
    pub async fn ingest(&self) -> IngestReport {
        let adapters = fin_sources::adapters_from_config(&self.config.sources);
        self.pipeline.ingest(&adapters).await
    }

    /// Runs one ingestion pass over the given adapters instead of the
    /// configured ones. Used by tests and custom embedders of the engine.
    pub async fn ingest_with(&self, adapters: &[Arc<dyn SourceAdapter>]) -> IngestReport {
        self.pipeline.ingest(adapters).await
    }

    pub async fn start_session(&self) -> String {
        let session_id = self.sessions.start_session().await;
        info!(session_id, "started session");
        session_id
    }

    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        self.sessions.end_session(session_id).await
    }

    /// Answers a question within an existing session, streaming tokens.
    pub async fn ask(
        &self,
        session_id: &str,
        question: &str,
        filter: Option<MetadataFilter>,
        k: Option<usize>,
    ) -> Result<AnswerStream> {
        let session = self.sessions.get(session_id).await?;
        self.orchestrator.answer(session, question, filter, k).await
    }

    pub async fn session_turns(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        self.sessions.turns(session_id).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.store.stats().await
    }
}
