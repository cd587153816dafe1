use async_trait::async_trait;
use chrono::Utc;
use fin_core::{Article, Error, Result, SourceAdapter, SourceConfig};
use scraper::Html;

use crate::{extract, relevance};

const SOURCE_NAME: &str = "Economic Times";
const HOST_FRAGMENT: &str = "economictimes";
const BODY_SELECTOR: &str = "div.artText p, article p";

pub struct EconomicTimesAdapter {
    config: SourceConfig,
    client: reqwest::Client,
}

impl EconomicTimesAdapter {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

/// Parses a fetched Economic Times page into an article record. Pure with
/// respect to the network, so it is testable on inline HTML.
pub fn parse_article(html: &str, url: &str) -> Result<Article> {
    let document = Html::parse_document(html);
    let title = extract::first_text(&document, "h1")?
        .or_else(|| extract::jsonld_string_field(&document, "headline"))
        .ok_or_else(|| Error::Scraping(format!("no title found at {}", url)))?;
    let body = extract::paragraphs(&document, BODY_SELECTOR)?.join("\n\n");
    if !relevance::is_relevant(&title, &body) {
        return Err(Error::Scraping(format!(
            "irrelevant or paywalled article: {}",
            url
        )));
    }
    let published_at = extract::jsonld_published_at(&document).unwrap_or_else(Utc::now);
    Article::new(
        url,
        title,
        body,
        published_at,
        SOURCE_NAME.to_string(),
        extract::category_from_url(url),
    )
}

#[async_trait]
impl SourceAdapter for EconomicTimesAdapter {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("economictimes.indiatimes.com")
    }

    async fn article_urls(&self) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        for section in &self.config.sections {
            let section_url = format!("{}{}", self.config.base_url, section);
            let html = extract::fetch_html(&self.client, &section_url).await?;
            let document = Html::parse_document(&html);
            urls.extend(extract::collect_article_links(
                &document,
                &self.config.base_url,
                HOST_FRAGMENT,
                self.config.max_articles_per_section,
            )?);
        }
        urls.sort();
        urls.dedup();
        Ok(urls)
    }

    async fn fetch_article(&self, url: &str) -> Result<Article> {
        let html = extract::fetch_html(&self.client, url).await?;
        parse_article(&html, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"
        <html><head>
        <script type="application/ld+json">
        {"@type": "NewsArticle", "datePublished": "2024-01-01T10:00:00+05:30"}
        </script>
        </head><body>
        <h1>Sensex ends at record high as earnings season begins</h1>
        <div class="artText">
          <p>The sensex closed at a record high on Monday as investors cheered
          strong quarterly earnings from index heavyweights. The nifty also
          advanced, led by banking shares, while brokerage upgrades lifted
          sentiment across the market. Analysts said the rally reflected
          optimism about the economy and corporate profit growth heading into
          the new fiscal year, though some cautioned that inflation remains a
          risk for equity valuations in the near term.</p>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_can_handle() {
        let adapter = EconomicTimesAdapter::new(SourceConfig::defaults()[0].clone());
        assert!(adapter.can_handle("https://economictimes.indiatimes.com/markets/story-101234567.cms"));
        assert!(!adapter.can_handle("https://www.livemint.com/market/story"));
    }

    #[test]
    fn test_parse_article_extracts_fields() {
        let url = "https://economictimes.indiatimes.com/markets/stocks/news/sensex-record-101234567.cms";
        let article = parse_article(ARTICLE_HTML, url).unwrap();
        assert_eq!(article.source_name, "Economic Times");
        assert!(article.title.starts_with("Sensex ends at record high"));
        assert!(article.body_text.contains("record high on Monday"));
        assert_eq!(article.category.as_deref(), Some("markets"));
        assert_eq!(article.published_at.to_rfc3339(), "2024-01-01T04:30:00+00:00");
    }

    #[test]
    fn test_parse_article_rejects_irrelevant_page() {
        let html = "<h1>Movie review</h1><article><p>A fine film about friendship.</p></article>";
        let result = parse_article(html, "https://economictimes.indiatimes.com/news/x-123456.cms");
        assert!(matches!(result, Err(Error::Scraping(_))));
    }
}
