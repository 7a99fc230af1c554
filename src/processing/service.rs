//! Document service coordinating extraction, AI analysis, indexing, and the local store.

use crate::{
    analysis::{AiAnalyzer, SimplificationResult},
    config::{Config, ConfigSummary},
    document::{
        self, DocumentRecord, DocumentSummary, DocumentType, QaExchange, detect_document_type,
        format_file_size, now_rfc3339, render_qa_transcript, render_report, report_filename,
        risk::HIGH_RISK_THRESHOLD, sanitize_filename, transcript_filename, truncate_chars,
    },
    embedding::{EmbeddingClient, embedding_client_from_config},
    extraction::{UploadLimits, validate_upload},
    llm::{GeminiClient, LlmClient},
    logging::preview,
    metrics::AnalysisMetrics,
    processing::{
        chunking::{CHUNK_OVERLAP, CHUNK_SIZE, chunk_text},
        mappers::{build_points, ensure_dimension, map_scored_point},
        pipeline::{NewRecord, build_analysis, read_upload},
        types::{
            ChunkHit, ExportedFile, HealthSnapshot, LibraryFilter, LibraryStats, ProcessingError,
            ServiceStats,
        },
    },
    qdrant::{ChunkSource, QdrantService, SearchFilterArgs, build_search_filter, document_filter},
    store::DocumentStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, Semaphore};
use uuid::Uuid;

const DEFAULT_SEARCH_LIMIT: usize = 5;
const DEFAULT_SIMILAR_LIMIT: usize = 3;
const MAX_SEARCH_LIMIT: usize = 50;
const QA_CONTEXT_CHUNKS: usize = 5;
const QA_SCORE_THRESHOLD: f32 = 0.6;
const QA_FALLBACK_CHARS: usize = 3000;

/// Values the service reads from configuration once, at construction.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Qdrant collection holding document chunks.
    pub collection: String,
    /// Expected embedding size.
    pub embedding_dimension: usize,
    /// Where raw uploads are written.
    pub upload_dir: PathBuf,
    /// Upload acceptance rules.
    pub upload_limits: UploadLimits,
    /// Cap on stored risk factors per analysis.
    pub max_risk_factors: usize,
    /// Upper bound on one upload's analysis.
    pub processing_timeout: Duration,
    /// Concurrent analyses allowed.
    pub max_concurrent_uploads: usize,
    /// Non-secret settings view.
    pub summary: ConfigSummary,
}

impl ServiceSettings {
    /// Derive settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            collection: config.qdrant_collection_name.clone(),
            embedding_dimension: config.embedding_dimension,
            upload_dir: config.upload_dir.clone(),
            upload_limits: UploadLimits {
                max_bytes: config.max_file_size_bytes(),
                supported_types: config.supported_file_types.clone(),
            },
            max_risk_factors: config.max_risk_factors,
            processing_timeout: Duration::from_secs(config.document_processing_timeout_secs),
            max_concurrent_uploads: config.max_concurrent_uploads.max(1),
            summary: config.summary(),
        }
    }

    fn ai_configured(&self) -> bool {
        self.summary.api_configured
    }
}

/// Operations exposed to the HTTP surface.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Analyze, index, and store an uploaded file.
    async fn analyze_upload(
        &self,
        filename: String,
        content: Vec<u8>,
    ) -> Result<DocumentRecord, ProcessingError>;

    /// Fetch one stored document.
    async fn get_document(&self, id: &str) -> Result<DocumentRecord, ProcessingError>;

    /// Library listing, newest first.
    async fn list_documents(&self, filter: LibraryFilter) -> Vec<DocumentSummary>;

    /// Aggregate library figures.
    async fn library_stats(&self) -> LibraryStats;

    /// Remove a document, its vectors, and its raw upload.
    async fn delete_document(&self, id: &str) -> Result<(), ProcessingError>;

    /// Answer a question about one document and record the exchange.
    async fn ask_question(&self, id: &str, question: &str)
    -> Result<QaExchange, ProcessingError>;

    /// Questions asked so far, oldest first.
    async fn qa_history(&self, id: &str) -> Result<Vec<QaExchange>, ProcessingError>;

    /// Forget the Q&A history of a document.
    async fn clear_qa_history(&self, id: &str) -> Result<(), ProcessingError>;

    /// Canned starter questions for the document's type.
    async fn suggested_questions(&self, id: &str) -> Result<Vec<String>, ProcessingError>;

    /// Plain-text analysis report.
    async fn export_report(&self, id: &str) -> Result<ExportedFile, ProcessingError>;

    /// Plain-text Q&A transcript.
    async fn export_qa_transcript(&self, id: &str) -> Result<ExportedFile, ProcessingError>;

    /// Semantic search across every indexed document.
    async fn search_documents(
        &self,
        query: &str,
        limit: Option<usize>,
        document_type: Option<DocumentType>,
    ) -> Result<Vec<ChunkHit>, ProcessingError>;

    /// Chunks from other documents resembling `clause`.
    async fn find_similar_clauses(
        &self,
        id: &str,
        clause: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChunkHit>, ProcessingError>;

    /// Plain-language rewrite of arbitrary text.
    async fn simplify_text(
        &self,
        text: &str,
        document_type: Option<DocumentType>,
    ) -> Result<SimplificationResult, ProcessingError>;

    /// Store size, vector count, and counters.
    async fn stats(&self) -> ServiceStats;

    /// Dependency reachability.
    async fn health(&self) -> HealthSnapshot;

    /// Non-secret configuration.
    fn settings(&self) -> ConfigSummary;
}

/// Coordinates the full document lifecycle.
///
/// The service owns long-lived handles to the AI analyzer, embedding client, Qdrant transport,
/// document store, and metrics. Construct it once near process start and share it through an
/// `Arc`.
pub struct DocumentService {
    settings: ServiceSettings,
    analyzer: AiAnalyzer,
    embedder: Arc<dyn EmbeddingClient>,
    qdrant: QdrantService,
    store: DocumentStore,
    metrics: AnalysisMetrics,
    upload_permits: Semaphore,
    collection_ready: OnceCell<()>,
}

impl DocumentService {
    /// Build the service from configuration and open the document store.
    ///
    /// The vector collection is prepared on first use so the server starts even while Qdrant
    /// is down.
    pub async fn new(config: &Config) -> Result<Self, ProcessingError> {
        let llm: Arc<dyn LlmClient> = Arc::new(GeminiClient::from_config(config)?);
        let embedder = embedding_client_from_config(config)?;
        let qdrant = QdrantService::new(config)?;
        let store = DocumentStore::open(config.documents_dir()).await?;
        if config.api_key().is_none() {
            tracing::warn!("GOOGLE_API_KEY is not set; analysis and Q&A will be unavailable");
        }

        let service = Self::with_components(
            ServiceSettings::from_config(config),
            llm,
            embedder,
            qdrant,
            store,
        );
        if let Err(error) = service.ensure_collection().await {
            tracing::warn!(error = %error, "Vector collection not ready; retrying on first use");
        }
        Ok(service)
    }

    /// Assemble the service from already-built parts.
    pub fn with_components(
        settings: ServiceSettings,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingClient>,
        qdrant: QdrantService,
        store: DocumentStore,
    ) -> Self {
        let upload_permits = Semaphore::new(settings.max_concurrent_uploads);
        Self {
            settings,
            analyzer: AiAnalyzer::new(llm),
            embedder,
            qdrant,
            store,
            metrics: AnalysisMetrics::new(),
            upload_permits,
            collection_ready: OnceCell::new(),
        }
    }

    async fn ensure_collection(&self) -> Result<(), ProcessingError> {
        let collection = &self.settings.collection;
        let vector_size = self.settings.embedding_dimension as u64;
        self.collection_ready
            .get_or_try_init(|| async {
                self.qdrant
                    .create_collection_if_not_exists(collection, vector_size)
                    .await?;
                self.qdrant.ensure_payload_indexes(collection).await?;
                tracing::debug!(collection = %collection, vector_size, "Collection ensured");
                Ok::<(), ProcessingError>(())
            })
            .await?;
        Ok(())
    }

    async fn require_document(&self, id: &str) -> Result<DocumentRecord, ProcessingError> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| ProcessingError::NotFound(id.to_string()))
    }

    async fn process_upload(
        &self,
        id: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<DocumentRecord, ProcessingError> {
        let started = Instant::now();
        let (kind, text) = read_upload(filename, &content, &self.settings.upload_limits).await?;
        tracing::info!(
            filename,
            characters = text.chars().count(),
            "Analysis started"
        );

        let analysis =
            build_analysis(&self.analyzer, &text, self.settings.max_risk_factors).await?;
        let file_path = self.save_upload(id, filename, &content).await?;

        let mut record = NewRecord {
            id: id.to_string(),
            filename,
            file_path: file_path.display().to_string(),
            kind,
            content: &content,
            text,
            analysis,
        }
        .into_record();

        let chunk_count = match self.index_document(&record).await {
            Ok(count) => {
                record.indexed = true;
                count
            }
            Err(error) => {
                tracing::warn!(document_id = %record.id, error = %error, "Indexing failed; document stored without search");
                0
            }
        };

        self.store.insert(record.clone()).await?;
        self.metrics.record_document(chunk_count as u64);
        tracing::info!(
            document_id = %record.id,
            document_type = %record.analysis.document_type,
            risk_score = record.analysis.risk_score,
            risk_factors = record.analysis.risk_factors.len(),
            chunks = chunk_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis completed"
        );
        Ok(record)
    }

    async fn save_upload(
        &self,
        id: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, ProcessingError> {
        let dir = &self.settings.upload_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| ProcessingError::Io {
                path: dir.clone(),
                source,
            })?;
        let path = self.upload_path(id, filename);
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| ProcessingError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    fn upload_path(&self, id: &str, filename: &str) -> PathBuf {
        self.settings
            .upload_dir
            .join(format!("{id}_{}", sanitize_filename(filename)))
    }

    /// Drop the raw file and any chunks a failed upload left behind.
    async fn discard_upload(&self, id: &str, filename: &str) {
        remove_file_quietly(id, &self.upload_path(id, filename)).await;
        if self.collection_ready.initialized()
            && let Err(error) = self
                .qdrant
                .delete_points(&self.settings.collection, document_filter(id))
                .await
        {
            tracing::warn!(document_id = id, error = %error, "Failed to discard vectors of a failed upload");
        }
    }

    async fn index_document(&self, record: &DocumentRecord) -> Result<usize, ProcessingError> {
        self.ensure_collection().await?;
        let chunks = chunk_text(&record.text, CHUNK_SIZE, CHUNK_OVERLAP)?;
        if chunks.is_empty() {
            return Ok(0);
        }

        let vectors = self.embedder.generate_embeddings(chunks.clone()).await?;
        let points = build_points(chunks, vectors, self.settings.embedding_dimension)?;
        let source = ChunkSource {
            document_id: record.id.clone(),
            filename: record.filename.clone(),
            document_type: record.analysis.document_type.as_str().to_string(),
            upload_date: record.upload_timestamp.clone(),
        };
        Ok(self
            .qdrant
            .index_points(&self.settings.collection, &source, points)
            .await?)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProcessingError> {
        let vector = self
            .embedder
            .generate_embeddings(vec![text.to_string()])
            .await?
            .pop()
            .ok_or(ProcessingError::DimensionMismatch {
                expected: self.settings.embedding_dimension,
                actual: 0,
            })?;
        ensure_dimension(&vector, self.settings.embedding_dimension)?;
        Ok(vector)
    }

    async fn search_chunks(
        &self,
        query: &str,
        filter: SearchFilterArgs,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ChunkHit>, ProcessingError> {
        self.ensure_collection().await?;
        let vector = self.embed_query(query).await?;
        let points = self
            .qdrant
            .search_points(
                &self.settings.collection,
                vector,
                build_search_filter(&filter),
                limit,
                score_threshold,
            )
            .await?;
        Ok(points.into_iter().filter_map(map_scored_point).collect())
    }

    /// Relevant chunks of the document, or its opening text when search has nothing.
    async fn question_context(&self, record: &DocumentRecord, question: &str) -> String {
        if record.indexed {
            let filter = SearchFilterArgs {
                document_id: Some(record.id.clone()),
                ..SearchFilterArgs::default()
            };
            match self
                .search_chunks(question, filter, QA_CONTEXT_CHUNKS, Some(QA_SCORE_THRESHOLD))
                .await
            {
                Ok(hits) if !hits.is_empty() => {
                    tracing::debug!(document_id = %record.id, chunks = hits.len(), "Using retrieved context");
                    return hits
                        .into_iter()
                        .map(|hit| hit.text)
                        .collect::<Vec<_>>()
                        .join("\n\n");
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(document_id = %record.id, error = %error, "Context search failed; using document opening");
                }
            }
        }
        truncate_chars(&record.text, QA_FALLBACK_CHARS).to_string()
    }
}

async fn remove_file_quietly(id: &str, path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => {
            tracing::warn!(document_id = id, path = %path.display(), error = %error, "Failed to remove raw upload");
        }
    }
}

fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_SEARCH_LIMIT)
}

fn most_common_type(records: &[DocumentRecord]) -> Option<DocumentType> {
    let mut counts: HashMap<DocumentType, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.analysis.document_type).or_default() += 1;
    }
    [
        DocumentType::Rental,
        DocumentType::Loan,
        DocumentType::Employment,
        DocumentType::Service,
        DocumentType::Nda,
        DocumentType::Other,
    ]
    .into_iter()
    .filter_map(|ty| counts.get(&ty).map(|count| (ty, *count)))
    .fold(None, |best: Option<(DocumentType, usize)>, (ty, count)| match best {
        Some((_, best_count)) if best_count >= count => best,
        _ => Some((ty, count)),
    })
    .map(|(ty, _)| ty)
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn analyze_upload(
        &self,
        filename: String,
        content: Vec<u8>,
    ) -> Result<DocumentRecord, ProcessingError> {
        tracing::info!(filename = %filename, bytes = content.len(), "Upload received");
        if let Err(error) =
            validate_upload(&filename, content.len() as u64, &self.settings.upload_limits)
        {
            tracing::warn!(filename = %filename, error = %error, "Upload rejected");
            self.metrics.record_failure();
            return Err(error.into());
        }
        if !self.settings.ai_configured() {
            self.metrics.record_failure();
            return Err(ProcessingError::MissingCredentials);
        }

        let _permit = self.upload_permits.acquire().await.map_err(|_| {
            ProcessingError::InvalidRequest("upload queue is shut down".to_string())
        })?;

        let id = Uuid::new_v4().to_string();
        let timeout = self.settings.processing_timeout;
        let outcome =
            tokio::time::timeout(timeout, self.process_upload(&id, &filename, content)).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(ProcessingError::Timeout(timeout.as_secs())),
        };
        if let Err(error) = &result {
            tracing::error!(filename = %filename, error = %error, "Analysis failed");
            self.metrics.record_failure();
            self.discard_upload(&id, &filename).await;
        }
        result
    }

    async fn get_document(&self, id: &str) -> Result<DocumentRecord, ProcessingError> {
        self.require_document(id).await
    }

    async fn list_documents(&self, filter: LibraryFilter) -> Vec<DocumentSummary> {
        let query = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .map(str::to_lowercase);

        self.store
            .list()
            .await
            .iter()
            .filter(|record| {
                filter
                    .document_type
                    .is_none_or(|ty| record.analysis.document_type == ty)
            })
            .filter(|record| {
                filter
                    .risk
                    .is_none_or(|band| band.matches(record.analysis.risk_score))
            })
            .filter(|record| {
                query
                    .as_deref()
                    .is_none_or(|query| record.filename.to_lowercase().contains(query))
            })
            .map(DocumentSummary::from)
            .collect()
    }

    async fn library_stats(&self) -> LibraryStats {
        let records = self.store.list().await;
        let total_size_bytes = records.iter().map(|record| record.file_size).sum();
        LibraryStats {
            total_documents: records.len(),
            most_common_type: most_common_type(&records),
            high_risk_documents: records
                .iter()
                .filter(|record| record.analysis.risk_score > HIGH_RISK_THRESHOLD)
                .count(),
            total_size_bytes,
            total_size: format_file_size(total_size_bytes),
        }
    }

    async fn delete_document(&self, id: &str) -> Result<(), ProcessingError> {
        let record = self.require_document(id).await?;
        if record.indexed
            && let Err(error) = self
                .qdrant
                .delete_points(&self.settings.collection, document_filter(id))
                .await
        {
            tracing::warn!(document_id = id, error = %error, "Failed to delete document vectors");
        }
        self.store.remove(id).await?;
        remove_file_quietly(id, Path::new(&record.file_path)).await;
        tracing::info!(document_id = id, "Document deleted");
        Ok(())
    }

    async fn ask_question(
        &self,
        id: &str,
        question: &str,
    ) -> Result<QaExchange, ProcessingError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ProcessingError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }
        let record = self.require_document(id).await?;
        if !self.settings.ai_configured() {
            return Err(ProcessingError::MissingCredentials);
        }

        let context = self.question_context(&record, question).await;
        let answer = self
            .analyzer
            .answer_question(question, &context, record.analysis.document_type)
            .await
            .inspect_err(|error| {
                tracing::error!(document_id = id, error = %error, "Question answering failed");
            })?;

        let exchange = QaExchange {
            id: Uuid::new_v4().to_string(),
            question: question.to_string(),
            answer,
            timestamp: now_rfc3339(),
        };
        let stored = exchange.clone();
        self.store
            .update(id, move |record| record.qa_history.push(stored))
            .await?;
        self.metrics.record_question();
        tracing::info!(
            document_id = id,
            question = %preview(question, 100),
            "Question answered"
        );
        Ok(exchange)
    }

    async fn qa_history(&self, id: &str) -> Result<Vec<QaExchange>, ProcessingError> {
        Ok(self.require_document(id).await?.qa_history)
    }

    async fn clear_qa_history(&self, id: &str) -> Result<(), ProcessingError> {
        self.require_document(id).await?;
        self.store
            .update(id, |record| record.qa_history.clear())
            .await?;
        tracing::info!(document_id = id, "Q&A history cleared");
        Ok(())
    }

    async fn suggested_questions(&self, id: &str) -> Result<Vec<String>, ProcessingError> {
        let record = self.require_document(id).await?;
        Ok(document::suggested_questions(record.analysis.document_type)
            .iter()
            .map(|question| question.to_string())
            .collect())
    }

    async fn export_report(&self, id: &str) -> Result<ExportedFile, ProcessingError> {
        let record = self.require_document(id).await?;
        Ok(ExportedFile {
            filename: report_filename(&record.filename),
            content: render_report(&record, &now_rfc3339()),
        })
    }

    async fn export_qa_transcript(&self, id: &str) -> Result<ExportedFile, ProcessingError> {
        let record = self.require_document(id).await?;
        if record.qa_history.is_empty() {
            return Err(ProcessingError::InvalidRequest(
                "no questions have been asked about this document".to_string(),
            ));
        }
        Ok(ExportedFile {
            filename: transcript_filename(&record.filename),
            content: render_qa_transcript(&record, &now_rfc3339()),
        })
    }

    async fn search_documents(
        &self,
        query: &str,
        limit: Option<usize>,
        document_type: Option<DocumentType>,
    ) -> Result<Vec<ChunkHit>, ProcessingError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ProcessingError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        let filter = SearchFilterArgs {
            document_type: document_type.map(|ty| ty.as_str().to_string()),
            ..SearchFilterArgs::default()
        };
        self.search_chunks(query, filter, clamp_limit(limit, DEFAULT_SEARCH_LIMIT), None)
            .await
    }

    async fn find_similar_clauses(
        &self,
        id: &str,
        clause: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChunkHit>, ProcessingError> {
        let clause = clause.trim();
        if clause.is_empty() {
            return Err(ProcessingError::InvalidRequest(
                "clause text must not be empty".to_string(),
            ));
        }
        self.require_document(id).await?;
        let filter = SearchFilterArgs {
            exclude_document_id: Some(id.to_string()),
            ..SearchFilterArgs::default()
        };
        self.search_chunks(clause, filter, clamp_limit(limit, DEFAULT_SIMILAR_LIMIT), None)
            .await
    }

    async fn simplify_text(
        &self,
        text: &str,
        document_type: Option<DocumentType>,
    ) -> Result<SimplificationResult, ProcessingError> {
        if text.trim().is_empty() {
            return Err(ProcessingError::InvalidRequest(
                "text must not be empty".to_string(),
            ));
        }
        if !self.settings.ai_configured() {
            return Err(ProcessingError::MissingCredentials);
        }
        let document_type = document_type.unwrap_or_else(|| detect_document_type(text));
        Ok(self.analyzer.simplify(text, document_type).await?)
    }

    async fn stats(&self) -> ServiceStats {
        let vector_count = match self
            .qdrant
            .count_points(&self.settings.collection, None)
            .await
        {
            Ok(count) => Some(count),
            Err(error) => {
                tracing::warn!(error = %error, "Vector count unavailable");
                None
            }
        };
        ServiceStats {
            documents_stored: self.store.len().await,
            collection: self.settings.collection.clone(),
            vector_count,
            metrics: self.metrics.snapshot(),
        }
    }

    async fn health(&self) -> HealthSnapshot {
        let ai_configured = self.settings.ai_configured();
        let (reachable, present, error) = match self.qdrant.list_collections().await {
            Ok(collections) => (
                true,
                collections
                    .iter()
                    .any(|name| *name == self.settings.collection),
                None,
            ),
            Err(error) => {
                tracing::warn!(error = %error, "Qdrant health probe failed");
                (false, false, Some(error.to_string()))
            }
        };
        HealthSnapshot {
            status: if ai_configured && reachable && present {
                "ok"
            } else {
                "degraded"
            },
            ai_configured,
            vector_store_reachable: reachable,
            collection_present: present,
            error,
        }
    }

    fn settings(&self) -> ConfigSummary {
        self.settings.summary.clone()
    }
}
