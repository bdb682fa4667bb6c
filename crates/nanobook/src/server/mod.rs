//! HTTP server for the RAG backend

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// RAG HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a new server with clients for the configured services
    pub fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Create a server around prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .merge(routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting NanoBook server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LocalDocumentStore;
    use crate::server::state::Providers;
    use crate::test_support::{passage, FakeEmbedder, FakeLlm, FakeReranker, FakeVectorStore};
    use crate::types::{ChatRequest, HistoryMessage};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "nanobook-test-boundary";

    struct Harness {
        router: Router,
        llm: Arc<FakeLlm>,
        store: Arc<FakeVectorStore>,
        upload_dir: tempfile::TempDir,
    }

    fn harness(
        llm: FakeLlm,
        embedder: FakeEmbedder,
        store: FakeVectorStore,
        debug: bool,
    ) -> Harness {
        let upload_dir = tempfile::tempdir().unwrap();
        let mut config = RagConfig::default();
        config.server.debug = debug;
        config.storage.upload_dir = upload_dir.path().to_path_buf();

        let llm = Arc::new(llm);
        let store = Arc::new(store);
        let providers = Providers {
            llm: llm.clone(),
            embedder: Arc::new(embedder),
            reranker: Arc::new(FakeReranker::default()),
            vector_store: store.clone(),
            document_store: Arc::new(LocalDocumentStore::new(upload_dir.path())),
        };

        let state = AppState::with_providers(config, providers);
        Harness {
            router: RagServer::with_state(state).build_router(),
            llm,
            store,
            upload_dir,
        }
    }

    fn default_harness() -> Harness {
        harness(
            FakeLlm::default(),
            FakeEmbedder::default(),
            FakeVectorStore::default(),
            false,
        )
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)));
        (status, body)
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn files_in(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn reset_request() -> Request<Body> {
        Request::delete("/reset").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let h = default_harness();
        let (status, body) = send(&h.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("OK"));

        let (status, _) = send(&h.router, get("/ready")).await;
        assert_eq!(status, StatusCode::OK);

        let h = harness(
            FakeLlm::default(),
            FakeEmbedder::default(),
            FakeVectorStore::unhealthy(),
            false,
        );
        let (status, _) = send(&h.router, get("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_chat_answers_from_context() {
        let store = FakeVectorStore::with_passages(vec![
            passage("Influenza causes fever and cough.", Some("data_sources/flu.txt")),
            passage("Rest.", None),
        ]);
        let h = harness(
            FakeLlm::with_replies(["influenza symptoms", "Fever and cough."]),
            FakeEmbedder::default(),
            store,
            false,
        );

        let (status, body) = send(
            &h.router,
            chat_request(
                r#"{"user_query": "what are flu symptoms?",
                    "history": [{"role": "assistant", "content": "Hi!"}]}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "response": "Fever and cough.",
                "metadata": {
                    "reranking_used": true,
                    "context_retrieved": true,
                    "query_rewritten": true
                }
            })
        );
        assert_eq!(h.store.last_limit(), Some(45));

        let requests = h.llm.requests();
        assert_eq!(requests.len(), 2);
        let answer = &requests[1];
        assert_eq!(answer.contents[0].role, "model");
        let turn = &answer.contents[1].parts[0].text;
        assert!(turn.contains(
            "Source: data_sources/flu.txt\nContent: Influenza causes fever and cough."
        ));
        assert!(turn.contains("User Question: what are flu symptoms?"));
    }

    #[tokio::test]
    async fn test_chat_without_reranking() {
        let store = FakeVectorStore::with_passages(vec![passage("Fever.", None)]);
        let h = harness(
            FakeLlm::with_replies(["q", "A."]),
            FakeEmbedder::default(),
            store,
            false,
        );

        let request = ChatRequest::new("flu?")
            .with_history(vec![
                HistoryMessage::text("user", "hello"),
                HistoryMessage::text("assistant", "Hi, ask me about your documents."),
            ])
            .with_reranking(false);
        let body = serde_json::to_string(&request).unwrap();

        let (status, body) = send(&h.router, chat_request(&body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metadata"]["reranking_used"], false);
        assert_eq!(h.store.last_limit(), Some(15));

        let roles: Vec<String> = h.llm.requests()[1]
            .contents
            .iter()
            .map(|c| c.role.clone())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
    }

    #[tokio::test]
    async fn test_chat_metadata_reports_fallbacks() {
        // Blank rewrite falls back to the question; the collection exists but is empty
        let h = harness(
            FakeLlm::with_replies(["   ", "I could not find that in the documents."]),
            FakeEmbedder::default(),
            FakeVectorStore::with_passages(Vec::new()),
            false,
        );

        let (status, body) = send(&h.router, chat_request(r#"{"user_query": "flu?"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["metadata"],
            json!({
                "reranking_used": true,
                "context_retrieved": false,
                "query_rewritten": false
            })
        );
    }

    #[tokio::test]
    async fn test_chat_bad_requests() {
        let h = default_harness();
        let no_payload = json!({ "error": "Invalid request: No JSON payload received." });

        let (status, body) = send(&h.router, chat_request("not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, no_payload);

        let (status, body) = send(&h.router, chat_request("{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, no_payload);

        let (status, body) = send(&h.router, chat_request(r#"{"history": []}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing 'user_query' in the request." }));

        let (status, _) = send(&h.router, chat_request(r#"{"user_query": ""}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_failure_hides_details() {
        let h = default_harness();
        let (status, body) = send(&h.router, chat_request(r#"{"user_query": "flu?"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "error": "Failed to get a response from the AI system.",
                "details": "Internal server error"
            })
        );
    }

    #[tokio::test]
    async fn test_chat_failure_details_in_debug() {
        let h = harness(
            FakeLlm::default(),
            FakeEmbedder::default(),
            FakeVectorStore::default(),
            true,
        );
        let (status, body) = send(&h.router, chat_request(r#"{"user_query": "flu?"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["details"].as_str().unwrap().contains("'data_sources' not found"));
    }

    #[tokio::test]
    async fn test_upload_ingests_file() {
        let h = default_harness();
        let text = "Influenza is a contagious respiratory illness.\n\n".repeat(20);

        let (status, body) =
            send(&h.router, upload_request("file", "flu.txt", text.as_bytes())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "File 'flu.txt' uploaded and ingested successfully.");
        assert_eq!(body["statusText"], "ingestion_complete");

        let chunks = body["chunks_created"].as_u64().unwrap() as usize;
        assert!(chunks > 1);
        assert_eq!(h.store.upserted().len(), chunks);
        assert_eq!(h.store.created_dimensions(), Some(3));

        let path = body["file_path"].as_str().unwrap();
        assert!(path.ends_with("flu.txt"));
        assert_eq!(std::fs::read(path).unwrap(), text.as_bytes());
        assert_eq!(h.store.upserted()[0].source.source_path, path);
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let h = default_harness();

        let (status, body) = send(&h.router, upload_request("document", "flu.txt", b"x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file part in the request.");

        let (status, body) = send(&h.router, upload_request("file", "tool.exe", b"MZ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Unsupported file type. Allowed types: .txt, .pdf, .doc, .docx, .md, .html, .htm, \
             .csv, .xlsx, .xls, .pptx, .ppt"
        );

        let request = Request::post("/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(&h.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file part in the request.");

        assert_eq!(files_in(&h.upload_dir), 0);
    }

    #[tokio::test]
    async fn test_upload_empty_filename() {
        let h = default_harness();

        let (status, body) = send(&h.router, upload_request("file", "", b"Fever.")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No selected file." }));
        assert_eq!(files_in(&h.upload_dir), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_removes_saved_file() {
        let h = harness(
            FakeLlm::default(),
            FakeEmbedder::failing(),
            FakeVectorStore::default(),
            false,
        );

        let (status, body) =
            send(&h.router, upload_request("file", "flu.md", b"# Flu\n\nFever.")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to process file: Embedding generation failed"));
        assert_eq!(files_in(&h.upload_dir), 0);
        assert!(!h.store.has_collection());
    }

    #[tokio::test]
    async fn test_upload_unparseable_file() {
        let h = default_harness();

        let (status, body) = send(&h.router, upload_request("file", "empty.txt", b"   ")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Failed to process file:"));
        assert_eq!(files_in(&h.upload_dir), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let store = FakeVectorStore::with_passages(vec![passage("Fever.", None)]);
        let h = harness(FakeLlm::default(), FakeEmbedder::default(), store, false);
        std::fs::write(h.upload_dir.path().join("flu.txt"), "Fever.").unwrap();

        let (status, body) = send(&h.router, reset_request()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Document store has been reset successfully." }));
        assert!(!h.store.has_collection());
        assert_eq!(files_in(&h.upload_dir), 0);

        // Resetting an empty store also succeeds
        let (status, _) = send(&h.router, reset_request()).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reset_failure() {
        let h = harness(
            FakeLlm::default(),
            FakeEmbedder::default(),
            FakeVectorStore::unhealthy(),
            false,
        );
        std::fs::write(h.upload_dir.path().join("flu.txt"), "Fever.").unwrap();

        let (status, body) = send(&h.router, reset_request()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "error": "Failed to reset document store: Vector database error: connection refused"
            })
        );
        // Files stay when the collection could not be dropped
        assert_eq!(files_in(&h.upload_dir), 1);
    }
}
