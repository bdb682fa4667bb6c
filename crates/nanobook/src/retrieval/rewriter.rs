//! Query rewriting for retrieval

use std::sync::Arc;

use crate::providers::{GenerationRequest, LlmProvider};

/// Outcome of rewriting a user question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Query to search with
    pub text: String,
    /// False when the original question is used unchanged
    pub rewritten: bool,
}

impl Rewrite {
    fn fallback(original: &str) -> Self {
        Self {
            text: original.to_string(),
            rewritten: false,
        }
    }
}

/// Turns conversational questions into keyword-focused search queries
pub struct QueryRewriter {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl QueryRewriter {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Rewrite `original`; never fails, falling back to the original question
    pub async fn rewrite(&self, original: &str) -> Rewrite {
        let request = GenerationRequest::prompt(&self.model, rewrite_prompt(original));

        match self.llm.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                tracing::info!("Original query: {}", original);
                tracing::info!("Rewritten query: {}", text);
                Rewrite {
                    text,
                    rewritten: true,
                }
            }
            Ok(_) => {
                tracing::warn!("Query rewrite returned nothing, using original query");
                Rewrite::fallback(original)
            }
            Err(e) => {
                tracing::warn!("Error rewriting query: {}", e);
                Rewrite::fallback(original)
            }
        }
    }
}

/// Prompt for the search query optimizer
pub fn rewrite_prompt(original: &str) -> String {
    format!(
        r#"System Role: You are the Search Query Optimizer for "NanoBook." Your goal is to convert natural language questions into precise, database-friendly search queries.

Input Context: You will be provided with:

    Raw User Input: The latest message sent by the user.

Your Objective: Transform the Raw User Input into an optimized search string.

Rules for Rewriting:

    Remove Fluff: Strip out conversational politeness (e.g., "Hello," "I was wondering," "Can you find," "Please").

    Fix Ambiguity: If the user uses vague terms but the intent is clear from the sentence itself, make it specific (e.g., "How much is it?" -> "Price/Cost details"). Note: Do not invent context if it is completely missing.

    Keyword Focus: Prioritize nouns, entities, and technical terms.

    No Answering: Do NOT answer the question. Output only the rewritten query string.

Examples:

    Example 1:

        Input: "Can you please tell me what the revenue was for Q3?"

        Output: Q3 revenue figures

    Example 2:

        Input: "I'm looking for info on how to reset the password."

        Output: Password reset instructions procedure

    Example 3:

        Input: "Why is the sky blue?"

        Output: Reason sky blue scattering

Current Task:
        Raw User Input: {original}
"#
    )
}
