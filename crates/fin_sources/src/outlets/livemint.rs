use async_trait::async_trait;
use chrono::Utc;
use fin_core::{Article, Error, Result, SourceAdapter, SourceConfig};
use scraper::Html;

use crate::{extract, relevance};

const SOURCE_NAME: &str = "Livemint";
const HOST_FRAGMENT: &str = "livemint";
const BODY_SELECTOR: &str = "div.mainArea p, div.storyParagraph p, article p";

pub struct LivemintAdapter {
    config: SourceConfig,
    client: reqwest::Client,
}

impl LivemintAdapter {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

pub fn parse_article(html: &str, url: &str) -> Result<Article> {
    let document = Html::parse_document(html);
    let title = extract::first_text(&document, "h1#article-headline, h1")?
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
impl SourceAdapter for LivemintAdapter {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("livemint.com")
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
