use std::sync::Arc;

use fin_core::{
    ConversationState, ConversationTurn, Error, LanguageModel, MetadataFilter, Result,
    RetrievalResult,
};
use tokio::sync::mpsc;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::prompt::build_prompt;
use crate::retriever::Retriever;
use crate::rewriter::QueryRewriter;

/// A source cited in an answer, one per distinct article URL, in retrieval
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct CitedSource {
    pub chunk_id: String,
    pub title: String,
    pub url: String,
    pub source_name: String,
}

/// The completed result of one question-answer turn.
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer_text: String,
    pub cited_sources: Vec<CitedSource>,
    pub turn_index: usize,
}

/// A live answer: tokens arrive as the model produces them, and `finish`
/// resolves to the full [`Answer`] once generation completes.
///
/// Dropping the stream before it finishes cancels generation; a cancelled
/// turn is never appended to the conversation.
pub struct AnswerStream {
    tokens: mpsc::Receiver<String>,
    handle: JoinHandle<Result<Answer>>,
}

impl AnswerStream {
    /// Next token of the answer, or `None` once generation is finished.
    pub async fn next_token(&mut self) -> Option<String> {
        self.tokens.recv().await
    }

    /// Waits for generation to complete and returns the full answer.
    ///
    /// Any tokens not yet consumed are drained first, so calling `finish`
    /// early never reads as a cancellation.
    pub async fn finish(mut self) -> Result<Answer> {
        while self.tokens.recv().await.is_some() {}
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::External(anyhow::anyhow!(
                "generation task panicked: {e}"
            ))),
        }
    }
}

/// Runs the query path: rewrite, retrieve, generate, record.
///
/// The caller hands over an owned lock on the session state; the guard moves
/// into the generation task and is released when the turn completes or
/// fails, which serializes turns within a session without blocking other
/// sessions.
pub struct GenerationOrchestrator {
    rewriter: QueryRewriter,
    retriever: Retriever,
    llm: Arc<dyn LanguageModel>,
    history_window: usize,
    default_k: usize,
}

impl GenerationOrchestrator {
    pub fn new(
        rewriter: QueryRewriter,
        retriever: Retriever,
        llm: Arc<dyn LanguageModel>,
        history_window: usize,
        default_k: usize,
    ) -> Self {
        Self {
            rewriter,
            retriever,
            llm,
            history_window,
            default_k,
        }
    }

    /// Answers `question` within the session held by `session`.
    ///
    /// Rewrite and retrieval run before the stream is returned, so a
    /// retrieval failure surfaces as an error here and leaves the
    /// conversation untouched. Generation failures surface from
    /// [`AnswerStream::finish`] and likewise append no turn.
    pub async fn answer(
        &self,
        session: Arc<tokio::sync::Mutex<ConversationState>>,
        question: &str,
        filter: Option<MetadataFilter>,
        k: Option<usize>,
    ) -> Result<AnswerStream> {
        let guard = session.lock_owned().await;
        let history: Vec<ConversationTurn> = guard.recent(self.history_window).to_vec();

        let standalone = self.rewriter.rewrite(&history, question).await;
        debug!(question, standalone, "rewrote question");

        let results = self
            .retriever
            .retrieve(&standalone, filter.as_ref(), k.unwrap_or(self.default_k))
            .await?;

        let prompt = build_prompt(&history, &results, &standalone);
        let cited_sources = cited_sources(&results);
        let (tx, rx) = mpsc::channel(32);

        let llm = self.llm.clone();
        let question = question.to_string();
        let handle = tokio::spawn(finish_turn(
            guard, llm, prompt, question, standalone, cited_sources, tx,
        ));

        Ok(AnswerStream { tokens: rx, handle })
    }
}

async fn finish_turn(
    mut guard: OwnedMutexGuard<ConversationState>,
    llm: Arc<dyn LanguageModel>,
    prompt: String,
    question: String,
    standalone: String,
    cited_sources: Vec<CitedSource>,
    tx: mpsc::Sender<String>,
) -> Result<Answer> {
    let answer_text = match llm.stream(&prompt, tx).await {
        Ok(text) => text,
        Err(e) => {
            if matches!(e, Error::Cancelled) {
                debug!("generation cancelled by caller");
            } else {
                warn!(error = %e, "generation failed");
            }
            return Err(e);
        }
    };

    let cited_chunk_ids: Vec<String> = cited_sources.iter().map(|s| s.chunk_id.clone()).collect();
    let turn = guard.push_turn(question, standalone, answer_text.clone(), cited_chunk_ids);
    let turn_index = turn.turn_index;

    Ok(Answer {
        answer_text,
        cited_sources,
        turn_index,
    })
}

/// One citation per distinct article URL, keeping retrieval order.
fn cited_sources(results: &[RetrievalResult]) -> Vec<CitedSource> {
    let mut seen = Vec::new();
    let mut sources = Vec::new();
    for result in results {
        if seen.contains(&result.metadata.url) {
            continue;
        }
        seen.push(result.metadata.url.clone());
        sources.push(CitedSource {
            chunk_id: result.chunk_id.clone(),
            title: result.metadata.title.clone(),
            url: result.metadata.url.clone(),
            source_name: result.metadata.source_name.clone(),
        });
    }
    sources
}
