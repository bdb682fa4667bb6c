//! Reset endpoint

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ErrorResponse, ResetResponse};

/// DELETE /reset - Drop the collection and delete every uploaded file
pub async fn reset(State(state): State<AppState>) -> Response {
    match clear_all(&state).await {
        Ok(()) => Json(ResetResponse::default()).into_response(),
        Err(e) => {
            tracing::error!("Error during reset: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("Failed to reset document store: {}", e))),
            )
                .into_response()
        }
    }
}

async fn clear_all(state: &AppState) -> Result<()> {
    let dropped = state.vector_store().delete_collection().await?;
    let removed = state.document_store().clear().await?;

    tracing::info!(
        "Reset complete (collection dropped: {}, files removed: {})",
        dropped,
        removed
    );
    Ok(())
}
