//! Grounded answer generation

use std::sync::Arc;

use super::history::normalize_history;
use super::prompt::{PromptBuilder, SYSTEM_PROMPT};
use crate::config::LlmConfig;
use crate::error::Result;
use crate::providers::{Content, GenerationParams, GenerationRequest, LlmProvider};
use crate::types::HistoryMessage;

/// Answers a question from retrieved context and the conversation so far
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    model: String,
    params: GenerationParams,
}

impl AnswerGenerator {
    /// Create a generator using the answer model and sampling settings from `config`
    pub fn new(llm: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            llm,
            model: config.generate_model.clone(),
            params: GenerationParams {
                temperature: Some(config.temperature),
                top_p: Some(config.top_p),
                top_k: Some(config.top_k),
                max_output_tokens: Some(config.max_output_tokens),
            },
        }
    }

    /// Build the generation request: normalised history followed by the context turn
    pub fn build_request(
        &self,
        question: &str,
        context: &str,
        history: &[HistoryMessage],
    ) -> GenerationRequest {
        let mut contents = normalize_history(history);
        contents.push(Content::user(PromptBuilder::build_user_turn(context, question)));

        GenerationRequest {
            model: self.model.clone(),
            system_instruction: Some(SYSTEM_PROMPT.to_string()),
            contents,
            params: self.params.clone(),
        }
    }

    /// Generate the answer
    pub async fn answer(
        &self,
        question: &str,
        context: &str,
        history: &[HistoryMessage],
    ) -> Result<String> {
        let request = self.build_request(question, context, history);
        tracing::info!(
            "Generating answer with {} ({} history turns)",
            self.model,
            request.contents.len() - 1
        );
        self.llm.generate(&request).await
    }
}
