use fin_core::{ConversationTurn, RetrievalResult};

pub const SYSTEM_INSTRUCTIONS: &str = "You are a professional financial news analyst. Answer the \
question using ONLY the numbered context passages below. Cite passages by their number. If the \
context is insufficient, say that you cannot find relevant information instead of guessing.";

/// Placed in the context section when retrieval came back empty, so the
/// model can decline gracefully instead of hallucinating.
pub const NO_CONTEXT_MARKER: &str = "No relevant context was found.";

/// Assembles the generation prompt: system instructions, the retrieved
/// passages with their attribution, the (already windowed) chat history,
/// and the standalone question.
pub fn build_prompt(
    history: &[ConversationTurn],
    context: &[RetrievalResult],
    question: &str,
) -> String {
    let mut prompt = String::from(SYSTEM_INSTRUCTIONS);
    prompt.push_str("\n\nContext:\n");

    if context.is_empty() {
        prompt.push_str(NO_CONTEXT_MARKER);
        prompt.push('\n');
    } else {
        for (i, result) in context.iter().enumerate() {
            prompt.push_str(&format!(
                "[{}] {} - {} ({})\n{}\n\n",
                i + 1,
                result.metadata.source_name,
                result.metadata.title,
                result.metadata.published_at.format("%Y-%m-%d"),
                result.text
            ));
        }
    }

    prompt.push_str("\nChat history:\n");
    if history.is_empty() {
        prompt.push_str("(none)\n");
    } else {
        for turn in history {
            prompt.push_str(&format!(
                "User: {}\nAssistant: {}\n",
                turn.user_question, turn.answer_text
            ));
        }
    }

    prompt.push_str(&format!("\nQuestion: {}\nAnswer:", question));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{stored_chunk, turn};
    use fin_core::RetrievalResult;

    fn result(chunk_id: &str, source: &str) -> RetrievalResult {
        let chunk = stored_chunk(chunk_id, "a1", source, vec![0.5; 8]);
        RetrievalResult {
            chunk_id: chunk.chunk_id,
            text: chunk.text,
            metadata: chunk.metadata,
            score: 0.9,
        }
    }

    #[test]
    fn test_prompt_numbers_context_and_attributes_sources() {
        let prompt = build_prompt(
            &[turn("What did RBI announce?", "A rate hold.")],
            &[result("c1", "Livemint"), result("c2", "Economic Times")],
            "When was it announced?",
        );
        assert!(prompt.starts_with(SYSTEM_INSTRUCTIONS));
        assert!(prompt.contains("[1] Livemint"));
        assert!(prompt.contains("[2] Economic Times"));
        assert!(prompt.contains("User: What did RBI announce?"));
        assert!(prompt.ends_with("Question: When was it announced?\nAnswer:"));
    }

    #[test]
    fn test_empty_retrieval_inserts_no_context_marker() {
        let prompt = build_prompt(&[], &[], "What happened to the sensex?");
        assert!(prompt.contains(NO_CONTEXT_MARKER));
        assert!(prompt.contains("(none)"));
    }
}
