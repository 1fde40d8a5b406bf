use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::{DocumentCandidate, PDF_MIME};
use crate::error::ServiceError;
use crate::state::ChatMessage;

pub const INGEST_FALLBACK: &str = "Failed to process PDF";
pub const CHAT_FALLBACK: &str = "Failed to get response";

/// The two exchanges the session needs from the backend.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Upload a document for ingestion. Any success status is enough.
    async fn ingest(&self, document: &DocumentCandidate) -> Result<(), ServiceError>;

    /// Send the whole transcript and get the assistant's reply.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ServiceError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    detail: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload raw bytes as the `file` field of a multipart form.
    pub async fn ingest_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), ServiceError> {
        let url = format!("{}/api/scrape", self.base_url);

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)?;
        let form = Form::new().part("file", part);

        debug!(%url, file_name, "uploading document");
        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(rejection(response, INGEST_FALLBACK).await);
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentService for RemoteClient {
    async fn ingest(&self, document: &DocumentCandidate) -> Result<(), ServiceError> {
        let bytes = tokio::fs::read(document.path())
            .await
            .map_err(|source| ServiceError::Io {
                path: document.path().to_path_buf(),
                source,
            })?;

        self.ingest_bytes(document.name(), bytes).await
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ServiceError> {
        let url = format!("{}/api/chat", self.base_url);

        debug!(%url, turns = messages.len(), "sending chat transcript");
        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { messages })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response, CHAT_FALLBACK).await);
        }

        let chat_response: ChatResponse = response.json().await.map_err(|err| {
            warn!(error = %err, "chat response had no usable `response` field");
            ServiceError::UnexpectedResponse(CHAT_FALLBACK.to_string())
        })?;

        Ok(chat_response.response)
    }
}

/// Build the error for a non-success response, taking the message from the
/// JSON `detail` field when there is a non-empty string there.
async fn rejection(response: Response, fallback: &str) -> ServiceError {
    let status = response.status();

    let message = response
        .json::<ErrorResponse>()
        .await
        .ok()
        .and_then(|body| body.detail)
        .and_then(|detail| match detail {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
        .unwrap_or_else(|| fallback.to_string());

    warn!(status = status.as_u16(), %message, "backend rejected request");
    ServiceError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;
    use axum::{
        extract::{Multipart, State},
        http::StatusCode,
        response::IntoResponse,
        routing::post,
        Json, Router,
    };
    use std::sync::Arc;
    use tokio::{net::TcpListener, sync::Mutex};

    #[derive(Debug, Clone)]
    struct Upload {
        field: String,
        file_name: Option<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    }

    #[derive(Clone, Default)]
    struct ServerState {
        uploads: Arc<Mutex<Vec<Upload>>>,
        transcripts: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    async fn scrape_ok(State(state): State<ServerState>, mut multipart: Multipart) -> impl IntoResponse {
        while let Ok(Some(field)) = multipart.next_field().await {
            let upload = Upload {
                field: field.name().unwrap_or_default().to_string(),
                file_name: field.file_name().map(str::to_string),
                content_type: field.content_type().map(str::to_string),
                bytes: field.bytes().await.map(|b| b.to_vec()).unwrap_or_default(),
            };
            state.uploads.lock().await.push(upload);
        }
        Json(serde_json::json!({ "message": "PDF processed successfully!" }))
    }

    async fn chat_ok(
        State(state): State<ServerState>,
        Json(body): Json<serde_json::Value>,
    ) -> impl IntoResponse {
        let messages: Vec<ChatMessage> =
            serde_json::from_value(body["messages"].clone()).unwrap_or_default();
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        state.transcripts.lock().await.push(messages);
        Json(serde_json::json!({ "response": format!("You asked: {last}") }))
    }

    async fn reject_with_detail() -> impl IntoResponse {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "detail": "No PDF content has been processed yet." })),
        )
    }

    async fn reject_with_html() -> impl IntoResponse {
        (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>")
    }

    async fn reject_with_list_detail() -> impl IntoResponse {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "detail": [{ "msg": "field required" }] })),
        )
    }

    async fn chat_without_response() -> impl IntoResponse {
        Json(serde_json::json!({ "answer": "wrong field" }))
    }

    /// Client for the in-process test server; skips any proxy settings in
    /// the environment so loopback requests go direct.
    fn local_client(base_url: &str) -> RemoteClient {
        RemoteClient {
            client: Client::builder().no_proxy().build().unwrap(),
            base_url: base_url.to_string(),
        }
    }

    async fn spawn_server(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    async fn spawn_happy_server() -> (String, ServerState) {
        let state = ServerState::default();
        let app = Router::new()
            .route("/api/scrape", post(scrape_ok))
            .route("/api/chat", post(chat_ok))
            .with_state(state.clone());
        (spawn_server(app).await, state)
    }

    fn write_pdf(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> DocumentCandidate {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        DocumentCandidate::from_path(&path).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = RemoteClient::new("http://localhost:8000/");
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_ingest_sends_file_field() {
        let (url, state) = spawn_happy_server().await;
        let client = local_client(&url);
        let dir = tempfile::tempdir().unwrap();
        let doc = write_pdf(&dir, "notes.pdf", b"%PDF-1.7 fake");

        client.ingest(&doc).await.unwrap();

        let uploads = state.uploads.lock().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].field, "file");
        assert_eq!(uploads[0].file_name.as_deref(), Some("notes.pdf"));
        assert_eq!(uploads[0].content_type.as_deref(), Some(PDF_MIME));
        assert_eq!(uploads[0].bytes, b"%PDF-1.7 fake");
    }

    #[tokio::test]
    async fn test_chat_sends_whole_transcript() {
        let (url, state) = spawn_happy_server().await;
        let client = local_client(&url);

        let transcript = vec![
            ChatMessage::assistant("welcome"),
            ChatMessage::user("What is section 2 about?"),
        ];
        let reply = client.chat(&transcript).await.unwrap();
        assert_eq!(reply, "You asked: What is section 2 about?");

        let seen = state.transcripts.lock().await;
        assert_eq!(seen[0], transcript);
        assert_eq!(seen[0][0].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_detail_becomes_message() {
        let app = Router::new()
            .route("/api/scrape", post(reject_with_detail))
            .route("/api/chat", post(reject_with_detail));
        let client = local_client(&spawn_server(app).await);

        let err = client.chat(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert_eq!(err.user_message(), "No PDF content has been processed yet.");
        assert_eq!(err.status(), Some(400));

        let err = client.ingest_bytes("a.pdf", b"x".to_vec()).await.unwrap_err();
        assert_eq!(err.user_message(), "No PDF content has been processed yet.");
    }

    #[tokio::test]
    async fn test_malformed_error_body_uses_fallback() {
        let app = Router::new()
            .route("/api/scrape", post(reject_with_html))
            .route("/api/chat", post(reject_with_list_detail));
        let client = local_client(&spawn_server(app).await);

        let err = client.ingest_bytes("a.pdf", b"x".to_vec()).await.unwrap_err();
        assert_eq!(err.user_message(), INGEST_FALLBACK);
        assert_eq!(err.status(), Some(500));

        let err = client.chat(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert_eq!(err.user_message(), CHAT_FALLBACK);
    }

    #[tokio::test]
    async fn test_success_without_response_field() {
        let app = Router::new().route("/api/chat", post(chat_without_response));
        let client = local_client(&spawn_server(app).await);

        let err = client.chat(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnexpectedResponse(_)));
        assert_eq!(err.user_message(), CHAT_FALLBACK);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Bind and drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = local_client(&format!("http://{addr}"));
        let err = client.chat(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)));
        assert!(!err.user_message().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_fails_before_request() {
        let (url, state) = spawn_happy_server().await;
        let client = local_client(&url);
        let doc = DocumentCandidate::new("/nope/gone.pdf", 10, PDF_MIME);

        let err = client.ingest(&doc).await.unwrap_err();
        assert!(matches!(err, ServiceError::Io { .. }));
        assert!(state.uploads.lock().await.is_empty());
    }
}
