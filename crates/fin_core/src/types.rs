use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A canonical article record as produced by a source adapter.
///
/// Identity is a UUIDv5 over the normalized URL, so scraping the same page
/// twice (with or without a fragment, trailing slash, etc.) yields the same
/// `article_id`. Articles are immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub article_id: String,
    pub url: String,
    pub title: String,
    pub body_text: String,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
    pub category: Option<String>,
}

impl Article {
    pub fn new(
        url: &str,
        title: String,
        body_text: String,
        published_at: DateTime<Utc>,
        source_name: String,
        category: Option<String>,
    ) -> Result<Self> {
        let normalized = normalize_url(url)?;
        Ok(Self {
            article_id: article_id_for_url(&normalized),
            url: normalized,
            title,
            body_text,
            published_at,
            source_name,
            category,
        })
    }
}

/// Normalizes a URL for identity purposes: lowercased scheme/host (done by
/// the `url` crate), fragment dropped, trailing path slash trimmed. The query
/// string is kept since some outlets key articles on it.
pub fn normalize_url(raw: &str) -> Result<String> {
    let mut parsed =
        url::Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{}: {}", raw, e)))?;
    parsed.set_fragment(None);
    let mut out = parsed.to_string();
    if out.ends_with('/') && parsed.path() != "/" {
        out.pop();
    }
    Ok(out)
}

pub fn article_id_for_url(normalized_url: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, normalized_url.as_bytes()).to_string()
}

/// Deterministic chunk identity: the same article and start offset always
/// map to the same id, which is what makes re-ingestion idempotent.
pub fn chunk_id_for(article_id: &str, start_offset: usize) -> String {
    let key = format!("{}:{}", article_id, start_offset);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

/// Metadata carried alongside every chunk; the subset of article fields that
/// retrieval filters and source attribution need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub category: Option<String>,
    pub title: String,
    pub url: String,
}

/// A bounded span of an article's text, the unit of embedding and retrieval.
///
/// `article_id` is a non-owning back-reference; chunks never embed the
/// article itself. Offsets are token indices into the cleaned article text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub article_id: String,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One ranked hit from a vector store query. Ephemeral, produced per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Conjunction of equality/range predicates over chunk metadata. An absent
/// field places no restriction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub source_name: Option<String>,
    pub category: Option<String>,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
}

impl MetadataFilter {
    pub fn by_source(source_name: &str) -> Self {
        Self {
            source_name: Some(source_name.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source_name.is_none()
            && self.category.is_none()
            && self.published_after.is_none()
            && self.published_before.is_none()
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        if let Some(source) = &self.source_name {
            if &metadata.source_name != source {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if metadata.category.as_ref() != Some(category) {
                return false;
            }
        }
        if let Some(after) = &self.published_after {
            if metadata.published_at < *after {
                return false;
            }
        }
        if let Some(before) = &self.published_before {
            if metadata.published_at > *before {
                return false;
            }
        }
        true
    }
}

/// A completed question/answer exchange. Appended to a session, never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_index: usize,
    pub user_question: String,
    pub rewritten_query: String,
    pub answer_text: String,
    pub cited_chunk_ids: Vec<String>,
}

/// Ordered, append-only record of a session's turns. History truncation for
/// prompt assembly is a read-time window (`recent`), not a mutation, so the
/// full history stays available for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    session_id: String,
    turns: Vec<ConversationTurn>,
}

impl ConversationState {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            turns: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent `window` turns, oldest first.
    pub fn recent(&self, window: usize) -> &[ConversationTurn] {
        let skip = self.turns.len().saturating_sub(window);
        &self.turns[skip..]
    }

    pub fn push_turn(
        &mut self,
        user_question: String,
        rewritten_query: String,
        answer_text: String,
        cited_chunk_ids: Vec<String>,
    ) -> &ConversationTurn {
        let turn_index = self.turns.len();
        self.turns.push(ConversationTurn {
            turn_index,
            user_question,
            rewritten_query,
            answer_text,
            cited_chunk_ids,
        });
        &self.turns[turn_index]
    }
}

/// Aggregate outcome of one ingestion run. Per-source errors are counted
/// here instead of aborting the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub articles_fetched: usize,
    pub articles_new: usize,
    pub chunks_written: usize,
    pub duplicates_skipped: usize,
    pub articles_failed: usize,
    pub source_errors: BTreeMap<String, usize>,
}

impl IngestReport {
    pub fn record_source_error(&mut self, source_name: &str) {
        *self.source_errors.entry(source_name.to_string()).or_insert(0) += 1;
    }
}

/// Vector store statistics for the stats surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_chunks: usize,
    pub per_source_counts: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metadata(source: &str, category: Option<&str>, day: u32) -> ChunkMetadata {
        ChunkMetadata {
            source_name: source.to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            category: category.map(|c| c.to_string()),
            title: "t".to_string(),
            url: "https://example.com/a".to_string(),
        }
    }

    #[test]
    fn test_url_normalization_is_stable() {
        let a = normalize_url("https://Example.com/markets/story/123/").unwrap();
        let b = normalize_url("https://example.com/markets/story/123#section").unwrap();
        assert_eq!(a, b);
        assert_eq!(article_id_for_url(&a), article_id_for_url(&b));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_chunk_id_deterministic() {
        let id = article_id_for_url("https://example.com/a");
        assert_eq!(chunk_id_for(&id, 250), chunk_id_for(&id, 250));
        assert_ne!(chunk_id_for(&id, 0), chunk_id_for(&id, 250));
    }

    #[test]
    fn test_filter_matches_conjunction() {
        let meta = metadata("Livemint", Some("markets"), 15);

        assert!(MetadataFilter::default().matches(&meta));
        assert!(MetadataFilter::by_source("Livemint").matches(&meta));
        assert!(!MetadataFilter::by_source("Economic Times").matches(&meta));

        let filter = MetadataFilter {
            source_name: Some("Livemint".to_string()),
            category: Some("markets".to_string()),
            published_after: Some(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()),
            published_before: Some(Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap()),
        };
        assert!(filter.matches(&meta));
        assert!(!filter.matches(&metadata("Livemint", Some("markets"), 25)));
        assert!(!filter.matches(&metadata("Livemint", None, 15)));
    }

    #[test]
    fn test_conversation_recent_window() {
        let mut state = ConversationState::new("s1".to_string());
        for i in 0..5 {
            state.push_turn(
                format!("q{}", i),
                format!("q{}", i),
                format!("a{}", i),
                vec![],
            );
        }
        let recent = state.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].turn_index, 3);
        assert_eq!(recent[1].turn_index, 4);
        // Full history is preserved.
        assert_eq!(state.turns().len(), 5);
        assert_eq!(state.recent(10).len(), 5);
    }
}
