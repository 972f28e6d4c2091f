//! HTTP surface for docsift.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /documents` – Multipart upload (`file`, optional `owner`); stores a `pending` document.
//! - `GET /documents` – List documents, optionally filtered with `?owner=`.
//! - `GET /documents/:id`, `DELETE /documents/:id` – Fetch or remove one document.
//! - `GET /documents/:id/file` – Download the stored upload.
//! - `POST /documents/:id/summary` – Extract, summarize, and index. `?background=true` returns
//!   `202 Accepted` immediately and runs the pipeline on a task.
//! - `GET /documents/:id/status` – Poll the summary lifecycle.
//! - `GET /documents/:id/similar` – Most similar documents by summary embedding (`?k=`).
//! - `POST /clusters` – Re-cluster all summaries; requires the admin bearer token when set.
//! - `POST /keywords` – Frequency keywords of arbitrary text.
//! - `GET /metrics` – Pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The HTTP surface shares the same processing pipeline with the MCP server, so behavior is
//! identical across interfaces.

use crate::config::Config;
use crate::processing::{ProcessingApi, ProcessingError};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartError},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const DEFAULT_SIMILAR_K: usize = 5;
/// Room for multipart boundaries and the `owner` field on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Router-level settings taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct ApiSettings {
    /// Bearer token required by administrative routes; `None` leaves them open.
    pub admin_token: Option<String>,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
}

impl ApiSettings {
    /// Extract router settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            admin_token: config.admin_token.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

struct AppState<S> {
    service: Arc<S>,
    admin_token: Option<Arc<str>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            admin_token: self.admin_token.clone(),
        }
    }
}

/// Build the HTTP router exposing the document API surface.
pub fn create_router<S>(service: Arc<S>, settings: ApiSettings) -> Router
where
    S: ProcessingApi + 'static,
{
    let state = AppState {
        service,
        admin_token: settings.admin_token.map(Arc::from),
    };
    Router::new()
        .route(
            "/documents",
            get(list_documents::<S>).post(upload_document::<S>),
        )
        .route(
            "/documents/:id",
            get(get_document::<S>).delete(delete_document::<S>),
        )
        .route("/documents/:id/file", get(download_document::<S>))
        .route("/documents/:id/summary", post(summarize_document::<S>))
        .route("/documents/:id/status", get(document_status::<S>))
        .route("/documents/:id/similar", get(similar_documents::<S>))
        .route("/clusters", post(cluster_documents::<S>))
        .route("/keywords", post(extract_keywords::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(
            settings
                .max_upload_bytes
                .saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
        .with_state(state)
}

/// Accept a multipart upload with a `file` part and an optional `owner` part.
async fn upload_document<S>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError>
where
    S: ProcessingApi,
{
    let mut owner = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("owner") => owner = Some(field.text().await?),
            _ => {}
        }
    }

    let Some((filename, bytes)) = file else {
        return Err(AppError::BadRequest("missing `file` part".into()));
    };
    if filename.trim().is_empty() {
        return Err(AppError::BadRequest("uploaded file has no name".into()));
    }

    let record = state
        .service
        .ingest_document(owner, filename, bytes)
        .await?;
    tracing::info!(id = record.id, title = %record.title, "Upload accepted");
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    owner: Option<String>,
}

async fn list_documents<S>(
    State(state): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError>
where
    S: ProcessingApi,
{
    let documents = state.service.list_documents(query.owner).await?;
    Ok(Json(json!({ "documents": documents })))
}

async fn get_document<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError>
where
    S: ProcessingApi,
{
    Ok(Json(state.service.get_document(id).await?))
}

async fn delete_document<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError>
where
    S: ProcessingApi,
{
    let record = state.service.delete_document(id).await?;
    Ok(Json(json!({ "deleted": record.id })))
}

/// Serve the stored upload inline with a content type derived from its extension.
async fn download_document<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<Response, AppError>
where
    S: ProcessingApi,
{
    let (record, bytes) = state.service.read_document_file(id).await?;
    let disposition = format!("inline; filename=\"{}\"", record.title.replace('"', ""));
    let mime = mime_guess::from_path(&record.title).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((headers, bytes).into_response())
}

#[derive(Deserialize)]
struct SummaryQuery {
    #[serde(default)]
    background: bool,
}

/// Run the summarization pipeline for one document.
///
/// With `?background=true` the document is checked for existence, the pipeline is spawned, and
/// the handler returns `202 Accepted`; clients poll `/documents/:id/status`.
async fn summarize_document<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
    Query(query): Query<SummaryQuery>,
) -> Result<Response, AppError>
where
    S: ProcessingApi + 'static,
{
    if query.background {
        state.service.get_document(id).await?;
        let service = Arc::clone(&state.service);
        tokio::spawn(async move {
            if let Err(error) = service.summarize_document(id).await {
                tracing::warn!(id, %error, "Background summarization failed");
            }
        });
        tracing::info!(id, "Summarization scheduled");
        return Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "id": id, "status": "accepted" })),
        )
            .into_response());
    }

    let outcome = state.service.summarize_document(id).await?;
    Ok(Json(outcome).into_response())
}

async fn document_status<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError>
where
    S: ProcessingApi,
{
    Ok(Json(state.service.document_status(id).await?))
}

#[derive(Deserialize)]
struct SimilarQuery {
    #[serde(default)]
    k: Option<usize>,
}

async fn similar_documents<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
    Query(query): Query<SimilarQuery>,
) -> Result<impl IntoResponse, AppError>
where
    S: ProcessingApi,
{
    let k = query.k.unwrap_or(DEFAULT_SIMILAR_K);
    let similar = state.service.similar_documents(id, k).await?;
    Ok(Json(json!({ "similar": similar })))
}

/// Request body for `POST /clusters`; an empty body uses the configured default.
#[derive(Deserialize, Default)]
struct ClusterRequest {
    #[serde(default)]
    n_clusters: Option<usize>,
}

/// Re-cluster every summarized document.
async fn cluster_documents<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    S: ProcessingApi,
{
    authorize_admin(state.admin_token.as_deref(), &headers)?;
    let request: ClusterRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ClusterRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|error| AppError::BadRequest(format!("invalid JSON body: {error}")))?
    };
    if request.n_clusters == Some(0) {
        return Err(AppError::BadRequest("n_clusters must be at least 1".into()));
    }

    let outcome = state.service.cluster_documents(request.n_clusters).await?;
    Ok(Json(outcome))
}

fn authorize_admin(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    if presented == Some(expected) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Request body for `POST /keywords`.
#[derive(Deserialize)]
struct KeywordsRequest {
    text: String,
    #[serde(default)]
    top_n: Option<usize>,
}

async fn extract_keywords<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<KeywordsRequest>,
) -> Json<serde_json::Value>
where
    S: ProcessingApi,
{
    let keywords = state.service.keywords(&request.text, request.top_n);
    Json(json!({ "keywords": keywords }))
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(state): State<AppState<S>>) -> impl IntoResponse
where
    S: ProcessingApi,
{
    Json(state.service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload_document",
                method: "POST",
                path: "/documents",
                description: "Upload a PDF, DOC, or DOCX file as multipart form data (`file`, optional `owner`). Returns the stored document with status `pending`.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_documents",
                method: "GET",
                path: "/documents",
                description: "List stored documents, newest first. Filter with `?owner=`.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summarize_document",
                method: "POST",
                path: "/documents/{id}/summary",
                description: "Extract text, summarize, store keywords, and embed the summary. Add `?background=true` to run asynchronously (202).",
                request_example: None,
            },
            CommandDescriptor {
                name: "document_status",
                method: "GET",
                path: "/documents/{id}/status",
                description: "Return { \"summary_status\": pending|processing|done|error, \"has_summary\": bool }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "similar_documents",
                method: "GET",
                path: "/documents/{id}/similar",
                description: "Rank other documents by cosine similarity of summary embeddings. Optional `?k=` (default 5).",
                request_example: None,
            },
            CommandDescriptor {
                name: "cluster_documents",
                method: "POST",
                path: "/clusters",
                description: "Cluster all summarized documents with k-means and label each cluster with its top TF-IDF terms. Requires the admin bearer token when configured.",
                request_example: Some(json!({ "n_clusters": 6 })),
            },
            CommandDescriptor {
                name: "keywords",
                method: "POST",
                path: "/keywords",
                description: "Return the most frequent non-stop-word terms of the supplied text.",
                request_example: Some(json!({ "text": "Document contents", "top_n": 6 })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Processing(ProcessingError),
    BadRequest(String),
    Forbidden,
    Multipart(MultipartError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Processing(error) => (processing_status(&error), error.to_string()),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Forbidden => (StatusCode::FORBIDDEN, "admin token required".to_string()),
            Self::Multipart(error) => (error.status(), error.body_text()),
        };
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "Request failed");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn processing_status(error: &ProcessingError) -> StatusCode {
    match error {
        ProcessingError::NotFound(_) | ProcessingError::StoredFileMissing(_) => {
            StatusCode::NOT_FOUND
        }
        ProcessingError::UnsupportedFileType(_)
        | ProcessingError::EmptyUpload
        | ProcessingError::NoEmbedding(_)
        | ProcessingError::NothingToCluster => StatusCode::BAD_REQUEST,
        ProcessingError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiSettings, create_router, get_commands};
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        ClusterOutcome, DocumentStatus, PipelineInfo, ProcessingApi, ProcessingError,
        SimilarDocument, SummaryOutcome, SummaryStrategy,
    };
    use crate::store::{DocumentRecord, SummaryStatus};
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const MISSING_ID: i64 = 404;
    const UNEMBEDDED_ID: i64 = 7;
    const LOST_FILE_ID: i64 = 13;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Ingest {
            owner: Option<String>,
            filename: String,
            bytes: Vec<u8>,
        },
        Summarize(i64),
        Cluster(Option<usize>),
    }

    #[derive(Clone, Default)]
    struct StubProcessingService {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl StubProcessingService {
        async fn recorded_calls(&self) -> Vec<Call> {
            self.calls.lock().await.clone()
        }

        fn record(id: i64) -> Result<DocumentRecord, ProcessingError> {
            if id == MISSING_ID {
                return Err(ProcessingError::NotFound(id));
            }
            Ok(DocumentRecord {
                id,
                owner: Some("ana".into()),
                title: "report.pdf".into(),
                file_path: "uploads/abc-report.pdf".into(),
                content_hash: "abc".into(),
                summary: None,
                summary_status: SummaryStatus::Pending,
                status_detail: None,
                keywords: Vec::new(),
                cluster_id: None,
                topics: Vec::new(),
                embedding: None,
                created_at: "2025-01-01T00:00:00Z".into(),
                updated_at: "2025-01-01T00:00:00Z".into(),
            })
        }
    }

    #[async_trait]
    impl ProcessingApi for StubProcessingService {
        async fn ingest_document(
            &self,
            owner: Option<String>,
            filename: String,
            bytes: Vec<u8>,
        ) -> Result<DocumentRecord, ProcessingError> {
            self.calls.lock().await.push(Call::Ingest {
                owner: owner.clone(),
                filename: filename.clone(),
                bytes,
            });
            if !filename.ends_with(".pdf") {
                return Err(ProcessingError::UnsupportedFileType(filename));
            }
            let mut record = Self::record(1)?;
            record.owner = owner;
            record.title = filename;
            Ok(record)
        }

        async fn summarize_document(&self, id: i64) -> Result<SummaryOutcome, ProcessingError> {
            self.calls.lock().await.push(Call::Summarize(id));
            Self::record(id)?;
            Ok(SummaryOutcome {
                id,
                summary: "A short summary.".into(),
                strategy: SummaryStrategy::Extractive,
                keywords: vec!["budget".into()],
                chunk_count: 0,
                provider: None,
                model: None,
            })
        }

        async fn document_status(&self, id: i64) -> Result<DocumentStatus, ProcessingError> {
            Self::record(id)?;
            Ok(DocumentStatus {
                summary_status: SummaryStatus::Done,
                has_summary: true,
                detail: None,
            })
        }

        async fn get_document(&self, id: i64) -> Result<DocumentRecord, ProcessingError> {
            Self::record(id)
        }

        async fn read_document_file(
            &self,
            id: i64,
        ) -> Result<(DocumentRecord, Vec<u8>), ProcessingError> {
            if id == LOST_FILE_ID {
                return Err(ProcessingError::StoredFileMissing(id));
            }
            Ok((Self::record(id)?, b"%PDF-1.4".to_vec()))
        }

        async fn list_documents(
            &self,
            owner: Option<String>,
        ) -> Result<Vec<DocumentRecord>, ProcessingError> {
            let mut record = Self::record(1)?;
            record.owner = owner;
            Ok(vec![record])
        }

        async fn delete_document(&self, id: i64) -> Result<DocumentRecord, ProcessingError> {
            Self::record(id)
        }

        async fn cluster_documents(
            &self,
            n_clusters: Option<usize>,
        ) -> Result<ClusterOutcome, ProcessingError> {
            self.calls.lock().await.push(Call::Cluster(n_clusters));
            Ok(ClusterOutcome {
                clusters: Vec::new(),
                assignments: Vec::new(),
            })
        }

        async fn similar_documents(
            &self,
            id: i64,
            k: usize,
        ) -> Result<Vec<SimilarDocument>, ProcessingError> {
            if id == UNEMBEDDED_ID {
                return Err(ProcessingError::NoEmbedding(id));
            }
            Ok((0..k as i64)
                .map(|offset| SimilarDocument {
                    id: id + offset + 1,
                    title: format!("doc-{offset}.pdf"),
                    score: 0.5,
                })
                .collect())
        }

        fn keywords(&self, text: &str, top_n: Option<usize>) -> Vec<String> {
            text.split_whitespace()
                .take(top_n.unwrap_or(6))
                .map(str::to_string)
                .collect()
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot::default()
        }

        fn pipeline_info(&self) -> PipelineInfo {
            unimplemented!("not exercised by the HTTP surface")
        }
    }

    fn app(service: Arc<StubProcessingService>, admin_token: Option<&str>) -> Router {
        create_router(
            service,
            ApiSettings {
                admin_token: admin_token.map(str::to_string),
                max_upload_bytes: 1024 * 1024,
            },
        )
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json body")
        };
        (status, json)
    }

    fn multipart_request(filename: &str, owner: Option<&str>, content: &[u8]) -> Request<Body> {
        let boundary = "docsift-test-boundary";
        let mut body = Vec::new();
        if let Some(owner) = owner {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"owner\"\r\n\r\n{owner}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/documents")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn commands_catalog_exposes_summary_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let summarize = commands
            .iter()
            .find(|cmd| cmd.name == "summarize_document")
            .expect("summarize command present");

        assert_eq!(summarize.method, "POST");
        assert_eq!(summarize.path, "/documents/{id}/summary");
        assert!(commands.iter().any(|cmd| cmd.path == "/clusters"));
    }

    #[tokio::test]
    async fn upload_passes_file_and_owner_to_service() {
        let service = Arc::new(StubProcessingService::default());
        let (status, json) = send(
            app(service.clone(), None),
            multipart_request("report.pdf", Some("ana"), b"%PDF-1.4 body"),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["title"], "report.pdf");
        assert_eq!(json["summary_status"], "pending");
        assert!(json.get("embedding").is_none());

        let calls = service.recorded_calls().await;
        assert_eq!(
            calls,
            vec![Call::Ingest {
                owner: Some("ana".into()),
                filename: "report.pdf".into(),
                bytes: b"%PDF-1.4 body".to_vec(),
            }]
        );
    }

    #[tokio::test]
    async fn unsupported_upload_is_bad_request() {
        let service = Arc::new(StubProcessingService::default());
        let (status, json) = send(
            app(service, None),
            multipart_request("notes.txt", None, b"plain text"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json["error"]
                .as_str()
                .is_some_and(|message| message.contains("notes.txt"))
        );
    }

    #[tokio::test]
    async fn summary_route_returns_outcome() {
        let service = Arc::new(StubProcessingService::default());
        let (status, json) = send(
            app(service, None),
            empty_request(Method::POST, "/documents/3/summary"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"], "A short summary.");
        assert_eq!(json["strategy"], "extractive");
        assert_eq!(json["keywords"], json!(["budget"]));
    }

    #[tokio::test]
    async fn background_summary_is_accepted_and_runs() {
        let service = Arc::new(StubProcessingService::default());
        let (status, json) = send(
            app(service.clone(), None),
            empty_request(Method::POST, "/documents/3/summary?background=true"),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["id"], 3);

        let mut ran = false;
        for _ in 0..100 {
            if service.recorded_calls().await.contains(&Call::Summarize(3)) {
                ran = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(ran, "background task should call the pipeline");
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let service = Arc::new(StubProcessingService::default());
        let (status, json) = send(
            app(service.clone(), None),
            empty_request(Method::GET, &format!("/documents/{MISSING_ID}/status")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().is_some());

        let (status, _) = send(
            app(service.clone(), None),
            empty_request(
                Method::POST,
                &format!("/documents/{MISSING_ID}/summary?background=true"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn lost_upload_file_is_not_found() {
        let service = Arc::new(StubProcessingService::default());
        let (status, json) = send(
            app(service, None),
            empty_request(Method::GET, &format!("/documents/{LOST_FILE_ID}/file")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(
            json["error"]
                .as_str()
                .is_some_and(|message| message.contains("missing"))
        );
    }

    #[tokio::test]
    async fn similar_without_embedding_is_bad_request() {
        let service = Arc::new(StubProcessingService::default());
        let (status, _) = send(
            app(service.clone(), None),
            empty_request(Method::GET, &format!("/documents/{UNEMBEDDED_ID}/similar")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(
            app(service, None),
            empty_request(Method::GET, "/documents/1/similar?k=2"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["similar"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn clustering_requires_admin_token_when_configured() {
        let service = Arc::new(StubProcessingService::default());

        let (status, _) = send(
            app(service.clone(), Some("s3cret")),
            Request::builder()
                .method(Method::POST)
                .uri("/clusters")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "n_clusters": 3 }).to_string()))
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(service.recorded_calls().await.is_empty());

        let (status, json) = send(
            app(service.clone(), Some("s3cret")),
            Request::builder()
                .method(Method::POST)
                .uri("/clusters")
                .header(header::AUTHORIZATION, "Bearer s3cret")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "n_clusters": 3 }).to_string()))
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["clusters"].is_array());
        assert_eq!(service.recorded_calls().await, vec![Call::Cluster(Some(3))]);
    }

    #[tokio::test]
    async fn clustering_accepts_empty_body_without_token() {
        let service = Arc::new(StubProcessingService::default());
        let (status, _) = send(
            app(service.clone(), None),
            empty_request(Method::POST, "/clusters"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(service.recorded_calls().await, vec![Call::Cluster(None)]);
    }

    #[tokio::test]
    async fn file_route_sets_content_type() {
        let service = Arc::new(StubProcessingService::default());
        let response = app(service, None)
            .oneshot(empty_request(Method::GET, "/documents/1/file"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"report.pdf\""
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(&body[..], b"%PDF-1.4");
    }

    #[tokio::test]
    async fn keywords_route_respects_top_n() {
        let service = Arc::new(StubProcessingService::default());
        let (status, json) = send(
            app(service, None),
            Request::builder()
                .method(Method::POST)
                .uri("/keywords")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "text": "alpha beta gamma", "top_n": 2 }).to_string(),
                ))
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["keywords"], json!(["alpha", "beta"]));
    }
}
