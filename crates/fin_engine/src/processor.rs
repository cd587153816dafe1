use fin_core::{EngineConfig, Error, Result};

/// One chunk-to-be: cleaned text plus its token offsets in the cleaned
/// article. Offsets are whitespace-token indices, not bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSpan {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Cleans article text and splits it into overlapping windows for embedding.
///
/// Window starts advance by `max_tokens - overlap_tokens`, so starts are
/// strictly increasing and non-overlapping while the texts themselves share
/// `overlap_tokens` of context. A window that would cut mid-text prefers to
/// end on a sentence boundary found in its trailing fifth, as long as that
/// still moves the next window forward.
#[derive(Debug, Clone)]
pub struct TextProcessor {
    max_tokens: usize,
    overlap_tokens: usize,
}

impl TextProcessor {
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Result<Self> {
        if max_tokens == 0 {
            return Err(Error::Config("chunk window must be positive".to_string()));
        }
        if overlap_tokens >= max_tokens {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than the window ({})",
                overlap_tokens, max_tokens
            )));
        }
        Ok(Self {
            max_tokens,
            overlap_tokens,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(config.chunk_max_tokens, config.chunk_overlap_tokens)
    }

    /// Strips control characters and collapses all whitespace runs to single
    /// spaces. Same input always yields the same output.
    pub fn clean(&self, raw: &str) -> String {
        raw.chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Splits cleaned text into ordered, overlapping spans. Empty or
    /// whitespace-only input yields no spans; text shorter than the window
    /// yields exactly one span covering everything.
    pub fn chunk(&self, text: &str) -> Vec<ChunkSpan> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            let hard_end = (start + self.max_tokens).min(tokens.len());
            let end = if hard_end < tokens.len() {
                self.snap_to_sentence(&tokens, start, hard_end)
            } else {
                hard_end
            };
            spans.push(ChunkSpan {
                text: tokens[start..end].join(" "),
                start_offset: start,
                end_offset: end,
            });
            if end >= tokens.len() {
                break;
            }
            start = end - self.overlap_tokens;
        }
        spans
    }

    /// Looks back from the hard cut for a sentence-final token within the
    /// trailing fifth of the window. Snapping must keep
    /// `end > start + overlap` or the next window would not advance.
    fn snap_to_sentence(&self, tokens: &[&str], start: usize, hard_end: usize) -> usize {
        let lookback = (self.max_tokens / 5).max(1);
        let floor = hard_end.saturating_sub(lookback).max(start + self.overlap_tokens + 1);
        for end in (floor..=hard_end).rev() {
            if ends_sentence(tokens[end - 1]) {
                return end;
            }
        }
        hard_end
    }
}

fn ends_sentence(token: &str) -> bool {
    token
        .trim_end_matches(['"', '\'', ')', ']', '\u{201d}'])
        .ends_with(['.', '!', '?'])
}
