use std::sync::Arc;

use fin_core::{Error, Result, VectorStore};

pub mod backends;

pub use backends::MemoryVectorStore;

#[cfg(feature = "chroma")]
pub use backends::ChromaVectorStore;

/// Builds a vector store from its CLI/config name.
#[cfg_attr(not(feature = "chroma"), allow(unused_variables))]
pub fn create_store(kind: &str, url: Option<&str>) -> Result<Arc<dyn VectorStore>> {
    match kind {
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        #[cfg(feature = "chroma")]
        "chroma" => Ok(Arc::new(ChromaVectorStore::new(url)?)),
        other => Err(Error::Config(format!("unknown storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::backends::MemoryVectorStore;
    pub use fin_core::{Chunk, MetadataFilter, Result, RetrievalResult, StoreStats, VectorStore};
}
