//! HTTP surface for Lega.
//!
//! Core routes are always mounted:
//!
//! - `GET /health`, `GET /settings`, `GET /stats`, `GET /commands` – service status and discovery.
//! - `POST /documents` – Multipart upload (field `file`); returns the stored analysis record.
//! - `GET /documents/:id` – One stored record.
//! - `POST /documents/:id/similar-clauses`, `POST /search` – Semantic search over indexed chunks.
//! - `POST /simplify` – Plain-language rewrite of arbitrary text.
//!
//! Feature flags add the rest: the document library (`GET /documents`, `GET /documents/stats`,
//! `DELETE /documents/:id`), the Q&A assistant (`/documents/:id/questions`,
//! `/documents/:id/suggested-questions`), and exports (`/documents/:id/report`,
//! `/documents/:id/questions/export`). Disabled routes answer 404, or 405 where another method
//! on the same path stays mounted.

use crate::{
    analysis::SimplificationResult,
    config::{ConfigSummary, FeatureFlags},
    document::{DocumentRecord, DocumentSummary, DocumentType, QaExchange},
    extraction::ExtractionError,
    processing::{
        ChunkHit, DocumentApi, ExportedFile, HealthSnapshot, LibraryFilter, LibraryStats,
        ProcessingError, ServiceStats,
    },
    store::StoreError,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the HTTP router; `max_upload_bytes` bounds request bodies.
pub fn create_router<S>(service: Arc<S>, features: FeatureFlags, max_upload_bytes: u64) -> Router
where
    S: DocumentApi + 'static,
{
    let mut documents: MethodRouter<Arc<S>> = post(upload_document::<S>);
    let mut document: MethodRouter<Arc<S>> = get(get_document::<S>);
    if features.document_library {
        documents = documents.get(list_documents::<S>);
        document = document.delete(delete_document::<S>);
    }

    let mut router = Router::new()
        .route("/health", get(health::<S>))
        .route("/settings", get(settings::<S>))
        .route("/stats", get(stats::<S>))
        .route("/commands", get(get_commands))
        .route("/documents", documents)
        .route("/documents/:id", document)
        .route(
            "/documents/:id/similar-clauses",
            post(similar_clauses::<S>),
        )
        .route("/search", post(search::<S>))
        .route("/simplify", post(simplify::<S>));

    if features.document_library {
        router = router.route("/documents/stats", get(library_stats::<S>));
    }
    if features.qa_assistant {
        router = router
            .route(
                "/documents/:id/questions",
                get(qa_history::<S>)
                    .post(ask_question::<S>)
                    .delete(clear_qa_history::<S>),
            )
            .route(
                "/documents/:id/suggested-questions",
                get(suggested_questions::<S>),
            );
    }
    if features.export_features {
        router = router
            .route("/documents/:id/report", get(export_report::<S>))
            .route(
                "/documents/:id/questions/export",
                get(export_qa_transcript::<S>),
            );
    }

    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    router
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

/// Accept a multipart upload and run the full analysis.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError>
where
    S: DocumentApi,
{
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                ProcessingError::InvalidRequest("file field must carry a filename".to_string())
            })?;
        let content = field.bytes().await?.to_vec();
        let record = service.analyze_upload(filename, content).await?;
        return Ok((StatusCode::CREATED, Json(record)));
    }
    Err(ProcessingError::InvalidRequest("multipart field `file` is required".to_string()).into())
}

async fn get_document<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentRecord>, AppError>
where
    S: DocumentApi,
{
    Ok(Json(service.get_document(&id).await?))
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentSummary>,
}

async fn list_documents<S>(
    State(service): State<Arc<S>>,
    Query(filter): Query<LibraryFilter>,
) -> Json<DocumentListResponse>
where
    S: DocumentApi,
{
    Json(DocumentListResponse {
        documents: service.list_documents(filter).await,
    })
}

async fn library_stats<S>(State(service): State<Arc<S>>) -> Json<LibraryStats>
where
    S: DocumentApi,
{
    Json(service.library_stats().await)
}

async fn delete_document<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError>
where
    S: DocumentApi,
{
    service.delete_document(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
}

async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<QaExchange>, AppError>
where
    S: DocumentApi,
{
    Ok(Json(service.ask_question(&id, &request.question).await?))
}

#[derive(Serialize)]
struct QaHistoryResponse {
    document_id: String,
    exchanges: Vec<QaExchange>,
}

async fn qa_history<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<QaHistoryResponse>, AppError>
where
    S: DocumentApi,
{
    let exchanges = service.qa_history(&id).await?;
    Ok(Json(QaHistoryResponse {
        document_id: id,
        exchanges,
    }))
}

async fn clear_qa_history<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError>
where
    S: DocumentApi,
{
    service.clear_qa_history(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct SuggestedQuestionsResponse {
    questions: Vec<String>,
}

async fn suggested_questions<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<SuggestedQuestionsResponse>, AppError>
where
    S: DocumentApi,
{
    Ok(Json(SuggestedQuestionsResponse {
        questions: service.suggested_questions(&id).await?,
    }))
}

async fn export_report<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Response, AppError>
where
    S: DocumentApi,
{
    Ok(text_download(service.export_report(&id).await?))
}

async fn export_qa_transcript<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Response, AppError>
where
    S: DocumentApi,
{
    Ok(text_download(service.export_qa_transcript(&id).await?))
}

fn text_download(file: ExportedFile) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file.filename.replace('"', ""));
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.content,
    )
        .into_response()
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<ChunkHit>,
}

#[derive(Deserialize)]
struct SimilarClausesRequest {
    clause_text: String,
    #[serde(default)]
    limit: Option<usize>,
}

async fn similar_clauses<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
    Json(request): Json<SimilarClausesRequest>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: DocumentApi,
{
    let results = service
        .find_similar_clauses(&id, &request.clause_text, request.limit)
        .await?;
    Ok(Json(SearchResponse { results }))
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    document_type: Option<DocumentType>,
}

async fn search<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: DocumentApi,
{
    let results = service
        .search_documents(&request.query, request.limit, request.document_type)
        .await?;
    tracing::debug!(hits = results.len(), "Search completed");
    Ok(Json(SearchResponse { results }))
}

#[derive(Deserialize)]
struct SimplifyRequest {
    text: String,
    #[serde(default)]
    document_type: Option<DocumentType>,
}

async fn simplify<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SimplifyRequest>,
) -> Result<Json<SimplificationResult>, AppError>
where
    S: DocumentApi,
{
    Ok(Json(
        service
            .simplify_text(&request.text, request.document_type)
            .await?,
    ))
}

async fn stats<S>(State(service): State<Arc<S>>) -> Json<ServiceStats>
where
    S: DocumentApi,
{
    Json(service.stats().await)
}

async fn health<S>(State(service): State<Arc<S>>) -> Json<HealthSnapshot>
where
    S: DocumentApi,
{
    Json(service.health().await)
}

async fn settings<S>(State(service): State<Arc<S>>) -> Json<ConfigSummary>
where
    S: DocumentApi,
{
    Json(service.settings())
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

#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

fn command(
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
) -> CommandDescriptor {
    CommandDescriptor {
        name,
        method,
        path,
        description,
        request_example: None,
    }
}

/// Enumerate supported HTTP commands for discovery.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            command(
                "upload_document",
                "POST",
                "/documents",
                "Upload a PDF, DOCX, or TXT file as multipart field `file`; returns the analysis record.",
            ),
            command(
                "list_documents",
                "GET",
                "/documents",
                "List stored documents. Query: type, risk (low|medium|high), q (filename substring).",
            ),
            command(
                "library_stats",
                "GET",
                "/documents/stats",
                "Totals, most common type, and high-risk count for the library.",
            ),
            command(
                "get_document",
                "GET",
                "/documents/:id",
                "Return one document with its full analysis.",
            ),
            command(
                "delete_document",
                "DELETE",
                "/documents/:id",
                "Remove a document, its vectors, and its raw upload.",
            ),
            CommandDescriptor {
                request_example: Some(json!({ "question": "Can the landlord keep my deposit?" })),
                ..command(
                    "ask_question",
                    "POST",
                    "/documents/:id/questions",
                    "Ask a question answered from the document's most relevant passages.",
                )
            },
            command(
                "qa_history",
                "GET",
                "/documents/:id/questions",
                "Questions asked about the document, oldest first.",
            ),
            command(
                "clear_qa_history",
                "DELETE",
                "/documents/:id/questions",
                "Forget the document's Q&A history.",
            ),
            command(
                "suggested_questions",
                "GET",
                "/documents/:id/suggested-questions",
                "Starter questions for the document's type.",
            ),
            command(
                "export_report",
                "GET",
                "/documents/:id/report",
                "Download the plain-text analysis report.",
            ),
            command(
                "export_qa_transcript",
                "GET",
                "/documents/:id/questions/export",
                "Download the Q&A history as plain text.",
            ),
            CommandDescriptor {
                request_example: Some(json!({ "clause_text": "The deposit is non-refundable.", "limit": 3 })),
                ..command(
                    "similar_clauses",
                    "POST",
                    "/documents/:id/similar-clauses",
                    "Find passages in other documents that resemble a clause.",
                )
            },
            CommandDescriptor {
                request_example: Some(json!({ "query": "termination notice", "limit": 5, "document_type": "employment" })),
                ..command(
                    "search",
                    "POST",
                    "/search",
                    "Semantic search across every indexed document.",
                )
            },
            CommandDescriptor {
                request_example: Some(json!({ "text": "The lessee shall indemnify the lessor.", "document_type": "rental" })),
                ..command(
                    "simplify",
                    "POST",
                    "/simplify",
                    "Rewrite legal text in plain language with key points and definitions.",
                )
            },
            command("stats", "GET", "/stats", "Document count, vector count, and counters."),
            command("health", "GET", "/health", "AI key and vector store status."),
            command("settings", "GET", "/settings", "Non-secret configuration."),
        ],
    })
}

/// Error wrapper translating failures into JSON error responses.
enum AppError {
    Processing(ProcessingError),
    Multipart(MultipartError),
}

fn status_for(error: &ProcessingError) -> StatusCode {
    if error.is_credentials_error() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    match error {
        ProcessingError::Extraction(inner) => match inner {
            ExtractionError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ExtractionError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ExtractionError::EmptyFile => StatusCode::BAD_REQUEST,
            ExtractionError::Pdf(_) | ExtractionError::Docx(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ExtractionError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        ProcessingError::EmptyDocument => StatusCode::UNPROCESSABLE_ENTITY,
        ProcessingError::NotFound(_) | ProcessingError::Store(StoreError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        ProcessingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ProcessingError::MissingCredentials => StatusCode::SERVICE_UNAVAILABLE,
        ProcessingError::Llm(_)
        | ProcessingError::Embedding(_)
        | ProcessingError::Qdrant(_)
        | ProcessingError::DimensionMismatch { .. } => StatusCode::BAD_GATEWAY,
        ProcessingError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ProcessingError::Chunking(_) | ProcessingError::Store(_) | ProcessingError::Io { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Processing(error) => (status_for(&error), error.to_string()),
            Self::Multipart(error) => (error.status(), error.body_text()),
        };
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %message, "Request rejected");
        }
        (
            status,
            Json(json!({ "error": message, "status": status.as_u16() })),
        )
            .into_response()
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
