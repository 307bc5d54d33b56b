use rag_audit_core::ConversationTurn;

pub const SYSTEM_PROMPT: &str =
    "You are an expert evaluator of retrieval-augmented AI assistants. Always respond with valid JSON.";

const NO_CONTEXT: &str = "(no context was retrieved)";

/// The single composite prompt asking for every quality dimension at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgePrompt {
    text: String,
}

impl JudgePrompt {
    pub fn new(user_query: &str, ai_response: &str, context: &[String]) -> Self {
        let context = if context.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            context
                .iter()
                .enumerate()
                .map(|(i, snippet)| format!("[{}] {}", i + 1, snippet))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let text = format!(
            r#"Evaluate the AI response below against the retrieved context.

CONTEXT (retrieved documents):
{context}

USER QUERY:
{user_query}

AI RESPONSE:
{ai_response}

Score each dimension with an integer from 1 (very poor) to 5 (excellent):
- relevance_score: does the response address the user's query?
- completeness_score: does it cover everything the query asks for?
- factual_accuracy_score: is every claim supported by the context?

Respond with a single JSON object and nothing else:
{{"relevance_score": <1-5>, "completeness_score": <1-5>, "factual_accuracy_score": <1-5>, "reasoning": "<brief justification>"}}"#
        );

        Self { text }
    }

    /// Prompt for a turn, with `context` as the retrieved snippets. Absent
    /// query or response text is rendered empty.
    pub fn for_turn(turn: &ConversationTurn, context: &[String]) -> Self {
        Self::new(
            turn.user_query().unwrap_or_default(),
            turn.ai_response().unwrap_or_default(),
            context,
        )
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}
