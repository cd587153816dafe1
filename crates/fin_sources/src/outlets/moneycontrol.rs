use async_trait::async_trait;
use chrono::Utc;
use fin_core::{Article, Error, Result, SourceAdapter, SourceConfig};
use scraper::Html;

use crate::{extract, relevance};

const SOURCE_NAME: &str = "Moneycontrol";
const HOST_FRAGMENT: &str = "moneycontrol";
const BODY_SELECTOR: &str = "div.content_wrapper p, div#contentdata p, article p";

pub struct MoneycontrolAdapter {
    config: SourceConfig,
    client: reqwest::Client,
}

impl MoneycontrolAdapter {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

pub fn parse_article(html: &str, url: &str) -> Result<Article> {
    let document = Html::parse_document(html);
    let title = extract::first_text(&document, "h1.article_title, h1")?
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
impl SourceAdapter for MoneycontrolAdapter {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("moneycontrol.com")
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

    #[test]
    fn test_can_handle() {
        let adapter = MoneycontrolAdapter::new(SourceConfig::defaults()[2].clone());
        assert!(adapter.can_handle("https://www.moneycontrol.com/news/business/markets/story-12345678.html"));
        assert!(!adapter.can_handle("https://economictimes.indiatimes.com/markets"));
    }

    #[test]
    fn test_parse_article_prefers_article_title_class() {
        let html = r#"
            <h1 class="article_title">Nifty ends above 22,000 for the first time</h1>
            <h1>Site banner</h1>
            <div id="contentdata">
              <p>The nifty closed above the 22,000 mark for the first time on
              Friday, powered by gains in IT shares after upbeat earnings
              commentary. Broader market breadth stayed positive and foreign
              investors turned net buyers of equity, while the sensex added
              over four hundred points. Traders said momentum in the market
              may continue into the next quarter if inflation stays benign.</p>
            </div>
        "#;
        let url = "https://www.moneycontrol.com/news/business/markets/nifty-22000-12345678.html";
        let article = parse_article(html, url).unwrap();
        assert!(article.title.starts_with("Nifty ends above"));
        assert_eq!(article.category.as_deref(), Some("news"));
    }

    #[test]
    fn test_missing_title_is_a_scraping_error() {
        let html = "<div id=\"contentdata\"><p>text</p></div>";
        let result = parse_article(html, "https://www.moneycontrol.com/news/x-12345678.html");
        assert!(matches!(result, Err(Error::Scraping(_))));
    }
}
