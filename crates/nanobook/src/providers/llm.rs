//! LLM provider trait for query rewriting and answer generation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`
    pub role: String,
    /// Text parts of the turn
    pub parts: Vec<Part>,
}

impl Content {
    /// A user turn with a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    /// A model turn with a single text part
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::text(text)],
        }
    }
}

/// A text part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Sampling parameters; unset values use the model defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl GenerationParams {
    /// True when every parameter is left to the model default
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
            && self.max_output_tokens.is_none()
    }
}

/// A single generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Model name, e.g. `gemini-2.5-flash`
    pub model: String,
    /// System instruction, if any
    pub system_instruction: Option<String>,
    /// Conversation, ending with the user turn to answer
    pub contents: Vec<Content>,
    /// Sampling parameters
    pub params: GenerationParams,
}

impl GenerationRequest {
    /// Single-prompt request with default parameters
    pub fn prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            contents: vec![Content::user(prompt)],
            params: GenerationParams::default(),
        }
    }
}

/// Trait for text generation
///
/// Implementations:
/// - `GeminiClient`: Gemini `generateContent` REST API
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate text for the request
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
