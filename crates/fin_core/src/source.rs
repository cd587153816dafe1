use async_trait::async_trait;

use crate::types::Article;
use crate::Result;

/// Fetches raw articles from one news outlet and normalizes them into
/// canonical `Article` records. Site-specific selectors live behind this
/// trait; the ingestion pipeline only sees the fixed output contract.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable outlet name, also used as `source_name` metadata.
    fn source_name(&self) -> &str;

    /// True if this adapter knows how to fetch the given URL.
    fn can_handle(&self, url: &str) -> bool;

    /// Candidate article URLs from the outlet's configured sections.
    async fn article_urls(&self) -> Result<Vec<String>>;

    /// Fetches and parses a single article. Irrelevant or paywalled pages
    /// surface as `Error::Scraping`.
    async fn fetch_article(&self, url: &str) -> Result<Article>;
}
