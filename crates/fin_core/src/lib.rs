pub mod config;
pub mod error;
pub mod model;
pub mod source;
pub mod store;
pub mod types;

pub use config::{EngineConfig, SourceConfig};
pub use error::Error;
pub use model::{EmbeddingProvider, LanguageModel};
pub use source::SourceAdapter;
pub use store::VectorStore;
pub use types::{
    article_id_for_url, chunk_id_for, normalize_url, Article, Chunk, ChunkMetadata,
    ConversationState, ConversationTurn, IngestReport, MetadataFilter, RetrievalResult, StoreStats,
};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::config::{EngineConfig, SourceConfig};
    pub use crate::model::{EmbeddingProvider, LanguageModel};
    pub use crate::source::SourceAdapter;
    pub use crate::store::VectorStore;
    pub use crate::types::*;
    pub use crate::{Error, Result};
}
