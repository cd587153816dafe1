pub mod memory;

#[cfg(feature = "chroma")]
pub mod chroma;

pub use memory::MemoryVectorStore;

#[cfg(feature = "chroma")]
pub use chroma::ChromaVectorStore;
