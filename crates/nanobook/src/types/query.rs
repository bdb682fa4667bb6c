//! Chat request types

use serde::{Deserialize, Serialize};

/// A prior turn of the conversation, as sent by the frontend
///
/// Accepts both Gemini-style (`role` + `parts`) and OpenAI-style (`role` + `content`)
/// messages; normalisation happens in [`crate::generation::normalize_history`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Speaker role (`user`, `model`, `assistant`, `system`, ...)
    #[serde(default)]
    pub role: String,
    /// A string, a list of strings, or a list of `{ "text": .. }` objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<serde_json::Value>,
    /// Used when `parts` is missing or empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

impl HistoryMessage {
    /// Build a single-text message
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: Some(serde_json::Value::String(text.into())),
            content: None,
        }
    }
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    #[serde(default)]
    pub user_query: Option<String>,

    /// Conversation so far
    #[serde(default)]
    pub history: Vec<HistoryMessage>,

    /// Whether to rerank retrieved passages (default: true)
    #[serde(default)]
    pub use_reranking: Option<bool>,
}

impl ChatRequest {
    /// Create a request for a single question
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: Some(user_query.into()),
            ..Default::default()
        }
    }

    /// Attach conversation history
    pub fn with_history(mut self, history: Vec<HistoryMessage>) -> Self {
        self.history = history;
        self
    }

    /// Set reranking on or off
    pub fn with_reranking(mut self, enabled: bool) -> Self {
        self.use_reranking = Some(enabled);
        self
    }

    /// The question, if present and not blank
    pub fn question(&self) -> Option<&str> {
        self.user_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
    }

    /// Reranking flag with its default applied
    pub fn reranking_enabled(&self) -> bool {
        self.use_reranking.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"user_query": "flu symptoms?"}"#).unwrap();
        assert_eq!(request.question(), Some("flu symptoms?"));
        assert!(request.history.is_empty());
        assert!(request.reranking_enabled());
    }

    #[test]
    fn test_blank_question_is_missing() {
        let request: ChatRequest = serde_json::from_str(r#"{"user_query": "   "}"#).unwrap();
        assert!(request.question().is_none());

        let request: ChatRequest = serde_json::from_str(r#"{"history": []}"#).unwrap();
        assert!(request.question().is_none());
    }

    #[test]
    fn test_mixed_history_shapes() {
        let request: ChatRequest = serde_json::from_str(
            r#"{
                "user_query": "and treatment?",
                "use_reranking": false,
                "history": [
                    {"role": "user", "parts": [{"text": "flu symptoms?"}]},
                    {"role": "assistant", "content": "Fever, cough."}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[1].role, "assistant");
        assert!(!request.reranking_enabled());
    }
}
