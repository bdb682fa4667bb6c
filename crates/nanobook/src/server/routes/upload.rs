//! Document upload and ingestion endpoint

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{Error, Result};
use crate::providers::sanitize_filename;
use crate::server::state::AppState;
use crate::types::{is_allowed_upload, ErrorResponse, UploadResponse, ALLOWED_EXTENSIONS};

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

/// POST /upload - Save a file and ingest it into the vector store
pub async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let Ok(mut multipart) = multipart else {
        return Error::bad_request("No file part in the request.").into_response();
    };

    // Find the file field
    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read multipart body: {}", e);
                return (e.status(), Json(ErrorResponse::new(e.body_text()))).into_response();
            }
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        match field.bytes().await {
            Ok(data) => {
                upload = Some((filename, data));
                break;
            }
            Err(e) => {
                tracing::warn!("Failed to read uploaded file: {}", e);
                return (e.status(), Json(ErrorResponse::new(e.body_text()))).into_response();
            }
        }
    }

    let Some((filename, data)) = upload else {
        return Error::bad_request("No file part in the request.").into_response();
    };

    if filename.is_empty() {
        return Error::bad_request("No selected file.").into_response();
    }

    if !is_allowed_upload(&filename) {
        return Error::bad_request(format!(
            "Unsupported file type. Allowed types: {}",
            ALLOWED_EXTENSIONS.join(", ")
        ))
        .into_response();
    }

    let Some(filename) = sanitize_filename(&filename) else {
        return Error::bad_request("No selected file.").into_response();
    };

    tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

    match ingest(&state, &filename, data.to_vec()).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("Error during file upload and ingestion: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("Failed to process file: {}", e))),
            )
                .into_response()
        }
    }
}

/// Save, parse, chunk, embed and store; the saved file is removed on failure
async fn ingest(state: &AppState, filename: &str, data: Vec<u8>) -> Result<UploadResponse> {
    let stored = state.document_store().save(filename, &data).await?;

    let result = async {
        let (document, chunks) = state.pipeline().ingest(filename, &stored.path, data).await?;
        let written = state.indexer().index(chunks).await?;
        tracing::info!(
            "Ingested {} ({} pages, {} chunks)",
            document.filename,
            document.total_pages.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            written
        );
        Ok::<_, Error>(written)
    }
    .await;

    match result {
        Ok(chunks_created) => Ok(UploadResponse::ingested(
            &stored.filename,
            chunks_created,
            stored.path,
        )),
        Err(e) => {
            if let Err(remove_err) = state.document_store().remove(&stored.path).await {
                tracing::warn!("Failed to remove {}: {}", stored.path, remove_err);
            }
            Err(e)
        }
    }
}
