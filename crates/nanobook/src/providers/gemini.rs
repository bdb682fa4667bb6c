//! Gemini client for the `generateContent` REST API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::llm::{Content, GenerationParams, GenerationRequest, LlmProvider, Part};
use super::retry::{retry_request, Failure};
use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Gemini API client authenticated with an API key
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Get the API endpoint URL for a model
    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: &'a [Content],
    #[serde(skip_serializing_if = "GenerationParams::is_empty")]
    generation_config: &'a GenerationParams,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

impl<'a> From<&'a GenerationRequest> for GenerateContentRequest<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            system_instruction: request.system_instruction.as_ref().map(|text| SystemInstruction {
                parts: vec![Part::text(text.clone())],
            }),
            contents: &request.contents,
            generation_config: &request.params,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::llm(format!("Prompt blocked by Gemini: {}", reason)));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::llm("No candidates in Gemini response"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::llm(format!(
                "No text in Gemini response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = self.endpoint(&request.model);
        let body = serde_json::to_value(GenerateContentRequest::from(request))?;

        tracing::debug!("Calling Gemini model {}", request.model);

        retry_request("Gemini request", self.max_retries, || {
            let request = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body);

            async move {
                let response = request.send().await.map_err(|e| {
                    Failure::from_send(&e, Error::llm(format!("Gemini request failed: {}", e)))
                })?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Failure::from_status(
                        status,
                        Error::llm(format!("Gemini generation failed ({}): {}", status, body)),
                    ));
                }

                let response: GenerateContentResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::llm(format!("Failed to parse Gemini response: {}", e)))?;

                // Blocked prompts and empty candidates are not retried
                Ok(response.into_text()?)
            }
        })
        .await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
