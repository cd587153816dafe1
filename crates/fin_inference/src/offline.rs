use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use fin_core::{EmbeddingProvider, Error, LanguageModel, Result};
use tokio::sync::mpsc;

const DIMENSION: usize = 384;

/// Deterministic, dependency-free model used by tests and as a no-network
/// fallback. Embeddings are built from text length and character frequency
/// buckets, so identical text always maps to the identical vector; the
/// "completion" is a templated echo of the prompt's last line.
pub struct OfflineModel;

impl OfflineModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OfflineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OfflineModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineModel").finish()
    }
}

#[async_trait]
impl LanguageModel for OfflineModel {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let last_line = prompt.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        Ok(last_line.trim().to_string())
    }

    async fn stream(&self, prompt: &str, tokens: mpsc::Sender<String>) -> Result<String> {
        let answer = format!(
            "[offline] no local model is running; echoing the question: {}",
            prompt.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
        );
        let mut full_text = String::new();
        for word in answer.split_inclusive(' ') {
            full_text.push_str(word);
            if tokens.send(word.to_string()).await.is_err() {
                return Err(Error::Cancelled);
            }
        }
        Ok(full_text)
    }
}

#[async_trait]
impl EmbeddingProvider for OfflineModel {
    fn model_name(&self) -> &str {
        "offline-char-frequency"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0; DIMENSION];
        let text_len = text.len().max(1) as f32;
        embedding[0] = text_len / 1000.0;

        let mut char_freq = HashMap::new();
        for c in text.chars() {
            *char_freq.entry(c).or_insert(0usize) += 1;
        }
        for (c, count) in char_freq {
            // Bucket by code point so the vector does not depend on hash
            // iteration order.
            let bucket = 1 + (c as usize) % (DIMENSION - 1);
            embedding[bucket] += count as f32 / text_len;
        }
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embedding_is_deterministic() {
        let model = OfflineModel::new();
        let a = model.embed("RBI rate decision").await.unwrap();
        let b = model.embed("RBI rate decision").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DIMENSION);
        let other = model.embed("completely different words").await.unwrap();
        assert_ne!(a, other);
    }

    #[tokio::test]
    async fn test_stream_pushes_every_token() {
        let model = OfflineModel::new();
        let (tx, mut rx) = mpsc::channel(64);
        let full = model.stream("question?", tx).await.unwrap();
        let mut collected = String::new();
        while let Some(token) = rx.recv().await {
            collected.push_str(&token);
        }
        assert_eq!(full, collected);
    }

    #[tokio::test]
    async fn test_stream_cancelled_when_receiver_dropped() {
        let model = OfflineModel::new();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let result = model.stream("question?", tx).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
