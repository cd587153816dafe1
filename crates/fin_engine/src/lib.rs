//! The assembled query engine: text processing, ingestion, retrieval,
//! generation and session bookkeeping on top of the `fin_core` traits.

pub mod engine;
pub mod orchestrator;
pub mod pipeline;
pub mod processor;
pub mod prompt;
pub mod retriever;
pub mod rewriter;
pub mod session;

pub use engine::RagEngine;
pub use orchestrator::{Answer, AnswerStream, CitedSource, GenerationOrchestrator};
pub use pipeline::{ArticleOutcome, IngestionPipeline};
pub use processor::{ChunkSpan, TextProcessor};
pub use retriever::Retriever;
pub use rewriter::QueryRewriter;
pub use session::SessionManager;
