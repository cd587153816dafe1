use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown session: {0}")]
    Session(String),

    #[error("Stream cancelled by consumer")]
    Cancelled,

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// True for errors that abort only the affected article during ingestion
    /// rather than the whole run.
    pub fn is_ingest_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Scraping(_) | Error::Embedding(_) | Error::Http(_) | Error::InvalidUrl(_)
        )
    }
}
