//! Chat endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{ChatMetadata, ChatRequest, ChatResponse, ErrorResponse};

/// POST /chat - Answer a question from the uploaded documents
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(body)) if !is_empty_payload(&body) => serde_json::from_value::<ChatRequest>(body)
            .map_err(|e| tracing::debug!("Chat payload has the wrong shape: {}", e))
            .ok(),
        Ok(_) => None,
        Err(rejection) => {
            tracing::debug!("Rejected chat payload: {}", rejection.body_text());
            None
        }
    };
    let Some(request) = request else {
        return Error::bad_request("Invalid request: No JSON payload received.").into_response();
    };

    let Some(question) = request.question() else {
        return Error::bad_request("Missing 'user_query' in the request.").into_response();
    };

    match answer(&state, question, &request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("Error in chat handler: {}", e);
            let details = if state.config().server.debug {
                e.to_string()
            } else {
                "Internal server error".to_string()
            };
            let body = ErrorResponse::new("Failed to get a response from the AI system.")
                .with_details(details);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Retrieve context and generate the answer
async fn answer(state: &AppState, question: &str, request: &ChatRequest) -> Result<ChatResponse> {
    let use_reranking = request.reranking_enabled();
    let retrieved = state
        .retriever()
        .retrieve(question, state.config().retrieval.top_k, use_reranking)
        .await?;

    let response = state
        .generator()
        .answer(question, &retrieved.context, &request.history)
        .await?;

    Ok(ChatResponse {
        response,
        metadata: ChatMetadata {
            reranking_used: use_reranking,
            context_retrieved: !retrieved.passages.is_empty(),
            query_rewritten: retrieved.query.rewritten,
        },
    })
}

/// Empty bodies count as no payload: `null`, `false`, `0`, `""`, `[]` and `{}`
fn is_empty_payload(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}
