use std::sync::Arc;

use fin_core::{ConversationTurn, LanguageModel};
use tracing::warn;

/// Turns a follow-up question into a standalone retrieval query by resolving
/// pronouns and ellipsis against the conversation so far.
pub struct QueryRewriter {
    llm: Arc<dyn LanguageModel>,
}

impl QueryRewriter {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// With an empty history the question already stands alone, so no model
    /// call is made. A failed or empty rewrite falls back to the raw
    /// question: degraded retrieval beats a failed turn.
    pub async fn rewrite(&self, history: &[ConversationTurn], question: &str) -> String {
        if history.is_empty() {
            return question.to_string();
        }

        let prompt = rewrite_prompt(history, question);
        match self.llm.complete(&prompt).await {
            Ok(completion) => {
                let standalone = tidy_completion(&completion);
                if standalone.is_empty() {
                    warn!("query rewrite returned empty text, using raw question");
                    question.to_string()
                } else {
                    standalone
                }
            }
            Err(e) => {
                warn!(error = %e, "query rewrite failed, using raw question");
                question.to_string()
            }
        }
    }
}

fn rewrite_prompt(history: &[ConversationTurn], question: &str) -> String {
    let mut prompt = String::from(
        "Given the conversation below, rephrase the follow-up question as a \
         single self-contained question. Keep every name, date and topic it \
         refers to. Reply with the question only.\n\nConversation:\n",
    );
    for turn in history {
        prompt.push_str(&format!(
            "User: {}\nAssistant: {}\n",
            turn.user_question, turn.answer_text
        ));
    }
    prompt.push_str(&format!(
        "\nFollow-up question: {}\nStandalone question:",
        question
    ));
    prompt
}

/// Models tend to decorate short rewrites: take the first non-empty line and
/// strip wrapping quotes.
fn tidy_completion(completion: &str) -> String {
    let line = completion
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    line.trim_matches('"').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{turn, ScriptedModel};

    #[tokio::test]
    async fn test_empty_history_passes_question_through_without_model_call() {
        let model = Arc::new(ScriptedModel::completing("SHOULD NOT BE USED"));
        let rewriter = QueryRewriter::new(model.clone());
        let result = rewriter.rewrite(&[], "What did RBI announce?").await;
        assert_eq!(result, "What did RBI announce?");
        assert_eq!(model.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_followup_carries_context_from_history() {
        let model = Arc::new(ScriptedModel::completing(
            "When did RBI announce the repo rate decision?",
        ));
        let rewriter = QueryRewriter::new(model.clone());
        let history = vec![turn(
            "What did RBI announce?",
            "RBI kept the repo rate unchanged.",
        )];

        let result = rewriter.rewrite(&history, "When?").await;
        assert!(result.contains("RBI"));
        assert_eq!(model.complete_calls(), 1);

        // The prompt itself must carry the prior exchange.
        let prompt = model.last_prompt();
        assert!(prompt.contains("What did RBI announce?"));
        assert!(prompt.contains("When?"));
    }

    #[tokio::test]
    async fn test_failed_rewrite_falls_back_to_raw_question() {
        let model = Arc::new(ScriptedModel::failing());
        let rewriter = QueryRewriter::new(model);
        let history = vec![turn("What did RBI announce?", "A rate decision.")];
        let result = rewriter.rewrite(&history, "When?").await;
        assert_eq!(result, "When?");
    }

    #[tokio::test]
    async fn test_blank_rewrite_falls_back_to_raw_question() {
        let model = Arc::new(ScriptedModel::completing("   \n  "));
        let rewriter = QueryRewriter::new(model);
        let history = vec![turn("q", "a")];
        assert_eq!(rewriter.rewrite(&history, "When?").await, "When?");
    }

    #[test]
    fn test_tidy_completion_strips_decoration() {
        assert_eq!(
            tidy_completion("\n\"What did RBI announce?\"\nExplanation: ..."),
            "What did RBI announce?"
        );
        assert_eq!(tidy_completion(""), "");
    }
}
