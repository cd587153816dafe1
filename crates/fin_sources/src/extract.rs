use std::time::Duration;

use chrono::{DateTime, Utc};
use fin_core::{Error, Result};
use scraper::{Html, Selector};
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

pub async fn fetch_html(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| Error::Scraping(format!("GET {}: {}", url, e)))?
        .error_for_status()
        .map_err(|e| Error::Scraping(format!("GET {}: {}", url, e)))?;
    response
        .text()
        .await
        .map_err(|e| Error::Scraping(format!("reading {}: {}", url, e)))
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::Scraping(format!("invalid selector: {}", e)))
}

/// Text of the first element matching `selector`, if any.
pub fn first_text(document: &Html, selector: &str) -> Result<Option<String>> {
    let selector = parse_selector(selector)?;
    Ok(document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty()))
}

/// Non-empty text of every element matching `selector`, in document order.
pub fn paragraphs(document: &Html, selector: &str) -> Result<Vec<String>> {
    let selector = parse_selector(selector)?;
    Ok(document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect())
}

/// Walks JSON-LD script blocks for a string field such as `datePublished`
/// or `headline`.
pub fn jsonld_string_field(document: &Html, field: &str) -> Option<String> {
    let selector = Selector::parse("script[type='application/ld+json']").ok()?;
    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        let Ok(json) = serde_json::from_str::<serde_json::Value>(raw.trim()) else {
            continue;
        };
        let nodes: Vec<&serde_json::Value> = match &json {
            serde_json::Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for node in nodes {
            if let Some(value) = node.get(field).and_then(|v| v.as_str()) {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

pub fn jsonld_published_at(document: &Html) -> Option<DateTime<Utc>> {
    let raw = jsonld_string_field(document, "datePublished")?;
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

const ARTICLE_PATH_MARKERS: &[&str] = &["/news/", "/article/", "/story/", "/opinion/"];
const EXCLUDED_PATH_MARKERS: &[&str] = &["/category/", "/author/", "/topic/", "/tag/", "/videos/"];

fn has_long_digit_run(path: &str) -> bool {
    let mut run = 0;
    for c in path.chars() {
        if c.is_ascii_digit() {
            run += 1;
            if run >= 6 {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// Heuristic for whether a link points at an article rather than a section
/// or index page: article-like path markers or a long numeric id, and none
/// of the known non-article markers.
pub fn looks_like_article_path(path: &str) -> bool {
    if EXCLUDED_PATH_MARKERS.iter().any(|marker| path.contains(marker)) {
        return false;
    }
    ARTICLE_PATH_MARKERS.iter().any(|marker| path.contains(marker)) || has_long_digit_run(path)
}

/// First path segment of an article URL, used as its category metadata
/// (e.g. `/markets/stocks/...` → `markets`).
pub fn category_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    url.path_segments()?
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
}

/// Collects candidate article URLs from a section page: every href resolved
/// against `base_url`, restricted to the outlet's host, shaped like an
/// article, deduplicated, capped at `limit`.
pub fn collect_article_links(
    document: &Html,
    base_url: &str,
    host_fragment: &str,
    limit: usize,
) -> Result<Vec<String>> {
    let base =
        Url::parse(base_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", base_url, e)))?;
    let selector = parse_selector("a[href]")?;

    let mut urls: Vec<String> = document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| {
            url.host_str().map_or(false, |host| host.contains(host_fragment))
                && looks_like_article_path(url.path())
        })
        .map(|url| url.to_string())
        .collect();

    urls.sort();
    urls.dedup();
    urls.truncate(limit);
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTION_HTML: &str = r#"
        <html><body>
          <a href="/markets/stocks/news/sensex-rallies-101234567.cms">Sensex rallies</a>
          <a href="/markets/stocks/news/sensex-rallies-101234567.cms">dup</a>
          <a href="https://www.example.com/topic/budget">topic page</a>
          <a href="/category/markets">category page</a>
          <a href="https://other-site.com/news/story-123456">other site</a>
          <a href="/about-us">about</a>
        </body></html>
    "#;

    #[test]
    fn test_article_path_heuristics() {
        assert!(looks_like_article_path("/news/economy/rbi-holds-rates"));
        assert!(looks_like_article_path("/markets/sensex-101234567.cms"));
        assert!(!looks_like_article_path("/topic/budget"));
        assert!(!looks_like_article_path("/category/markets"));
        assert!(!looks_like_article_path("/about-us"));
    }

    #[test]
    fn test_collect_links_filters_and_dedupes() {
        let document = Html::parse_document(SECTION_HTML);
        let urls =
            collect_article_links(&document, "https://www.example.com", "example.com", 10).unwrap();
        assert_eq!(
            urls,
            vec!["https://www.example.com/markets/stocks/news/sensex-rallies-101234567.cms"]
        );
    }

    #[test]
    fn test_collect_links_respects_limit() {
        let html = r#"
            <a href="/news/a-123456">a</a>
            <a href="/news/b-123456">b</a>
            <a href="/news/c-123456">c</a>
        "#;
        let document = Html::parse_document(html);
        let urls =
            collect_article_links(&document, "https://www.example.com", "example.com", 2).unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_jsonld_published_at() {
        let html = r#"
            <script type="application/ld+json">
            {"@type": "NewsArticle", "headline": "RBI holds rates",
             "datePublished": "2024-01-01T09:30:00+05:30"}
            </script>
        "#;
        let document = Html::parse_document(html);
        let published = jsonld_published_at(&document).unwrap();
        assert_eq!(published.to_rfc3339(), "2024-01-01T04:00:00+00:00");
        assert_eq!(
            jsonld_string_field(&document, "headline").unwrap(),
            "RBI holds rates"
        );
    }

    #[test]
    fn test_category_from_url() {
        assert_eq!(
            category_from_url("https://www.example.com/markets/stocks/story-123456").unwrap(),
            "markets"
        );
        assert!(category_from_url("https://www.example.com/").is_none());
    }

    #[test]
    fn test_first_text_and_paragraphs() {
        let html = r#"<h1> Title here </h1><article><p>one</p><p> </p><p>two</p></article>"#;
        let document = Html::parse_document(html);
        assert_eq!(first_text(&document, "h1").unwrap().unwrap(), "Title here");
        assert_eq!(
            paragraphs(&document, "article p").unwrap(),
            vec!["one".to_string(), "two".to_string()]
        );
        assert!(first_text(&document, "h2").unwrap().is_none());
    }
}
