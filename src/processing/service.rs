//! Processing service coordinating extraction, summarization, embedding, and clustering.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    clustering::{DEFAULT_MAX_ITER, DEFAULT_SEED, kmeans, label_clusters, rank_similar},
    config::Config,
    embedding::{EmbeddingClient, EmbeddingClientError, build_embedding_client},
    extraction::{TextExtractor, is_supported_extension},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        mappers::{map_clusters, map_similar, to_status},
        sanitize::{sanitize_filename, sanitize_string, stored_file_name},
        summarize::Summarizer,
        types::{
            ClusterOutcome, DocumentStatus, PipelineInfo, ProcessingError, SimilarDocument,
            SummaryOutcome,
        },
    },
    store::{DocumentRecord, DocumentStore, NewDocument, SummaryStatus},
    text::extract_keywords,
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Settings copied out of [`Config`] at construction.
#[derive(Debug, Clone)]
struct Limits {
    upload_dir: PathBuf,
    max_upload_bytes: usize,
    keywords_top_n: usize,
    cluster_default_count: usize,
    cluster_top_terms: usize,
    embedding_dimension: usize,
}

/// Coordinates the document pipeline: upload storage, text extraction, summarization,
/// keywords, embeddings, and clustering.
///
/// The service owns the document store, the summarizer with its provider client, the
/// embedding client, and the metrics registry so that the HTTP surface and the MCP tools reuse
/// the same components. Construct it once near process start and share it through an `Arc`.
pub struct ProcessingService {
    store: DocumentStore,
    extractor: TextExtractor,
    summarizer: Summarizer,
    embedding_client: Box<dyn EmbeddingClient>,
    metrics: Arc<PipelineMetrics>,
    limits: Limits,
    info: PipelineInfo,
}

/// Abstraction over the processing pipeline used by external surfaces (HTTP, MCP).
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Validate and store an upload, registering it as `pending`.
    async fn ingest_document(
        &self,
        owner: Option<String>,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<DocumentRecord, ProcessingError>;

    /// Extract, summarize, and index one stored document.
    async fn summarize_document(&self, id: i64) -> Result<SummaryOutcome, ProcessingError>;

    /// Summary lifecycle state of one document.
    async fn document_status(&self, id: i64) -> Result<DocumentStatus, ProcessingError>;

    /// Fetch one document row.
    async fn get_document(&self, id: i64) -> Result<DocumentRecord, ProcessingError>;

    /// Read the stored upload bytes of one document.
    async fn read_document_file(
        &self,
        id: i64,
    ) -> Result<(DocumentRecord, Vec<u8>), ProcessingError>;

    /// List documents newest first, optionally for one owner.
    async fn list_documents(
        &self,
        owner: Option<String>,
    ) -> Result<Vec<DocumentRecord>, ProcessingError>;

    /// Delete a document row and its stored file.
    async fn delete_document(&self, id: i64) -> Result<DocumentRecord, ProcessingError>;

    /// Re-cluster every summarized document.
    async fn cluster_documents(
        &self,
        n_clusters: Option<usize>,
    ) -> Result<ClusterOutcome, ProcessingError>;

    /// Documents whose summary embeddings are closest to `id`'s.
    async fn similar_documents(
        &self,
        id: i64,
        k: usize,
    ) -> Result<Vec<SimilarDocument>, ProcessingError>;

    /// Frequency keywords of arbitrary text.
    fn keywords(&self, text: &str, top_n: Option<usize>) -> Vec<String>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Providers and defaults in effect.
    fn pipeline_info(&self) -> PipelineInfo;
}

impl ProcessingService {
    /// Build a service from configuration, opening the store and provider clients.
    pub fn new(config: &Config) -> Result<Self, ProcessingError> {
        tracing::info!(path = %config.database_path.display(), "Opening document store");
        let store = DocumentStore::open(&config.database_path)?;
        let summarizer = Summarizer::from_config(config)?;
        tracing::info!(
            provider = config.summarization_provider.label(),
            model = ?summarizer.model(),
            "Summarizer initialized"
        );
        let embedding_client = build_embedding_client(config)?;
        tracing::info!(
            provider = config.embedding_provider.label(),
            model = %config.embedding_model,
            dimension = config.embedding_dimension,
            "Embedding client initialized"
        );

        Ok(Self {
            store,
            extractor: TextExtractor::new()
                .with_ocr(config.ocr_enabled)
                .with_language(&config.ocr_language),
            summarizer,
            embedding_client,
            metrics: Arc::new(PipelineMetrics::new()),
            limits: Limits {
                upload_dir: config.upload_dir.clone(),
                max_upload_bytes: config.max_upload_bytes,
                keywords_top_n: config.keywords_top_n,
                cluster_default_count: config.cluster_default_count,
                cluster_top_terms: config.cluster_top_terms,
                embedding_dimension: config.embedding_dimension,
            },
            info: pipeline_info(config),
        })
    }

    /// Replace the summarizer, e.g. to inject a provider client.
    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.info.summarization_provider = summarizer.provider().label().to_string();
        self.info.summarization_model = summarizer.model().map(str::to_string);
        self.summarizer = summarizer;
        self
    }

    /// Replace the embedding client.
    pub fn with_embedding_client(mut self, client: Box<dyn EmbeddingClient>) -> Self {
        self.embedding_client = client;
        self
    }

    /// Validate and store an upload, registering it as `pending`.
    pub async fn ingest_document(
        &self,
        owner: Option<String>,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<DocumentRecord, ProcessingError> {
        if !is_supported_extension(&filename) {
            return Err(ProcessingError::UnsupportedFileType(filename));
        }
        if bytes.is_empty() {
            return Err(ProcessingError::EmptyUpload);
        }
        if bytes.len() > self.limits.max_upload_bytes {
            return Err(ProcessingError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.limits.max_upload_bytes,
            });
        }

        let content_hash = hex::encode(Sha256::digest(&bytes));
        let title = sanitize_filename(&filename);
        let path = self
            .limits
            .upload_dir
            .join(stored_file_name(&content_hash, &filename));
        tokio::fs::create_dir_all(&self.limits.upload_dir).await?;
        tokio::fs::write(&path, &bytes).await?;

        let record = self.store.insert_document(NewDocument {
            owner: sanitize_string(owner),
            title,
            file_path: path.to_string_lossy().into_owned(),
            content_hash,
        })?;
        tracing::info!(
            id = record.id,
            title = %record.title,
            bytes = bytes.len(),
            "Document stored"
        );
        Ok(record)
    }

    /// Extract, summarize, and index one stored document.
    ///
    /// Extraction and chunking failures leave the document in the `error` state with a detail
    /// message. Embedding failures only log a warning; the summary is kept.
    pub async fn summarize_document(&self, id: i64) -> Result<SummaryOutcome, ProcessingError> {
        let record = self.require_document(id)?;
        self.store.set_status(id, SummaryStatus::Processing, None)?;
        tracing::info!(id, title = %record.title, "Summarizing document");

        let extractor = self.extractor.clone();
        let path = PathBuf::from(&record.file_path);
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|error| ProcessingError::Task(error.to_string()));
        let extracted = match extracted {
            Ok(Ok(extracted)) => extracted,
            Ok(Err(error)) => return Err(self.fail(id, error.into())),
            Err(error) => return Err(self.fail(id, error)),
        };
        tracing::debug!(
            id,
            method = ?extracted.method,
            chars = extracted.text.chars().count(),
            "Text extracted"
        );

        let summary = match self
            .summarizer
            .summarize(&extracted.text, &self.metrics)
            .await
        {
            Ok(summary) => summary,
            Err(error) => return Err(self.fail(id, error.into())),
        };
        let keywords = extract_keywords(&extracted.text, self.limits.keywords_top_n);
        if let Err(error) = self.store.save_summary(id, &summary.text, &keywords) {
            return Err(self.fail(id, error.into()));
        }
        self.metrics.record_summary(summary.chunk_count as u64);

        if let Err(error) = self.embed_summary(id, &summary.text).await {
            tracing::warn!(id, %error, "Embedding failed; summary kept without embedding");
        }

        tracing::info!(
            id,
            strategy = ?summary.strategy,
            chunks = summary.chunk_count,
            keywords = keywords.len(),
            "Document summarized"
        );

        Ok(SummaryOutcome {
            id,
            summary: summary.text,
            strategy: summary.strategy,
            keywords,
            chunk_count: summary.chunk_count,
            provider: summary.provider,
            model: summary.model,
        })
    }

    /// Summary lifecycle state of one document.
    pub fn document_status(&self, id: i64) -> Result<DocumentStatus, ProcessingError> {
        Ok(to_status(&self.require_document(id)?))
    }

    /// Fetch one document row.
    pub fn get_document(&self, id: i64) -> Result<DocumentRecord, ProcessingError> {
        self.require_document(id)
    }

    /// Read the stored upload bytes of one document.
    pub async fn read_document_file(
        &self,
        id: i64,
    ) -> Result<(DocumentRecord, Vec<u8>), ProcessingError> {
        let record = self.require_document(id)?;
        let bytes = match tokio::fs::read(&record.file_path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(id, path = %record.file_path, "Stored upload missing");
                return Err(ProcessingError::StoredFileMissing(id));
            }
            Err(error) => return Err(error.into()),
        };
        Ok((record, bytes))
    }

    /// List documents newest first, optionally for one owner.
    pub fn list_documents(
        &self,
        owner: Option<String>,
    ) -> Result<Vec<DocumentRecord>, ProcessingError> {
        let owner = sanitize_string(owner);
        Ok(self.store.list_documents(owner.as_deref())?)
    }

    /// Delete a document row and its stored file.
    ///
    /// The file stays on disk while another row still points at it.
    pub async fn delete_document(&self, id: i64) -> Result<DocumentRecord, ProcessingError> {
        let record = self
            .store
            .delete_document(id)?
            .ok_or(ProcessingError::NotFound(id))?;
        let remaining = self.store.file_references(&record.file_path)?;
        if remaining == 0 {
            remove_upload(Path::new(&record.file_path)).await;
        } else {
            tracing::debug!(id, remaining, "Stored upload still referenced; keeping file");
        }
        tracing::info!(id, title = %record.title, "Document deleted");
        Ok(record)
    }

    /// Re-cluster every summarized document and persist the assignments.
    pub async fn cluster_documents(
        &self,
        n_clusters: Option<usize>,
    ) -> Result<ClusterOutcome, ProcessingError> {
        let documents = self.store.summaries_with_status(SummaryStatus::Done)?;
        if documents.is_empty() {
            return Err(ProcessingError::NothingToCluster);
        }

        let texts: Vec<String> = documents
            .iter()
            .map(|document| document.summary.clone().unwrap_or_default())
            .collect();
        let vectors = self.embed(texts.clone()).await?;
        for (document, vector) in documents.iter().zip(&vectors) {
            self.store.save_embedding(document.id, vector)?;
        }

        let requested = n_clusters.unwrap_or(self.limits.cluster_default_count);
        let result = kmeans(&vectors, requested, DEFAULT_SEED, DEFAULT_MAX_ITER)?;
        let topics = label_clusters(&texts, &result.labels, self.limits.cluster_top_terms)?;

        for (document, label) in documents.iter().zip(&result.labels) {
            let terms = topics.get(*label).map(Vec::as_slice).unwrap_or(&[]);
            self.store.assign_cluster(document.id, *label as i64, terms)?;
        }

        tracing::info!(
            documents = documents.len(),
            requested,
            clusters = result.cluster_count(),
            iterations = result.iterations,
            "Documents clustered"
        );

        let (clusters, assignments) = map_clusters(&documents, &result, &topics);
        Ok(ClusterOutcome {
            clusters,
            assignments,
        })
    }

    /// Documents whose summary embeddings are closest to `id`'s, best first.
    pub fn similar_documents(
        &self,
        id: i64,
        k: usize,
    ) -> Result<Vec<SimilarDocument>, ProcessingError> {
        let target = self.require_document(id)?;
        let embedding = target.embedding.ok_or(ProcessingError::NoEmbedding(id))?;

        let candidates: Vec<(DocumentRecord, Vec<f32>)> = self
            .store
            .embedded_documents(Some(id))?
            .into_iter()
            .filter_map(|mut record| {
                let vector = record.embedding.take()?;
                (vector.len() == embedding.len()).then_some((record, vector))
            })
            .collect();

        Ok(map_similar(rank_similar(&embedding, candidates, k)))
    }

    /// Frequency keywords of arbitrary text.
    pub fn keywords(&self, text: &str, top_n: Option<usize>) -> Vec<String> {
        extract_keywords(text, top_n.unwrap_or(self.limits.keywords_top_n))
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Providers and defaults in effect.
    pub fn pipeline_info(&self) -> PipelineInfo {
        self.info.clone()
    }

    fn require_document(&self, id: i64) -> Result<DocumentRecord, ProcessingError> {
        self.store
            .get_document(id)?
            .ok_or(ProcessingError::NotFound(id))
    }

    /// Mark `id` as failed and hand the error back for propagation.
    fn fail(&self, id: i64, error: ProcessingError) -> ProcessingError {
        self.metrics.record_failure();
        tracing::error!(id, %error, "Document processing failed");
        if let Err(store_error) =
            self.store
                .set_status(id, SummaryStatus::Error, Some(&error.to_string()))
        {
            tracing::error!(id, error = %store_error, "Failed to record error status");
        }
        error
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, ProcessingError> {
        let vectors = self.embedding_client.generate_embeddings(texts).await?;
        let expected = self.limits.embedding_dimension;
        if let Some(vector) = vectors.iter().find(|vector| vector.len() != expected) {
            return Err(EmbeddingClientError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }
            .into());
        }
        Ok(vectors)
    }

    async fn embed_summary(&self, id: i64, summary: &str) -> Result<(), ProcessingError> {
        let vector = self
            .embed(vec![summary.to_string()])
            .await?
            .pop()
            .ok_or_else(|| {
                EmbeddingClientError::GenerationFailed("provider returned no vectors".into())
            })?;
        self.store.save_embedding(id, &vector)?;
        Ok(())
    }
}

async fn remove_upload(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "Failed to remove stored upload");
        }
    }
}

fn pipeline_info(config: &Config) -> PipelineInfo {
    PipelineInfo {
        summarization_provider: config.summarization_provider.label().to_string(),
        summarization_model: config.resolved_summarization_model(),
        embedding_provider: config.embedding_provider.label().to_string(),
        embedding_model: config.embedding_model.clone(),
        embedding_dimension: config.embedding_dimension,
        chunk_chars: config.chunk_chars(),
        summary_max_retries: config.summary_max_retries,
        summary_sentences: config.summary_sentences,
        keywords_top_n: config.keywords_top_n,
        cluster_default_count: config.cluster_default_count,
        cluster_top_terms: config.cluster_top_terms,
        ocr_enabled: config.ocr_enabled,
        max_upload_bytes: config.max_upload_bytes,
    }
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn ingest_document(
        &self,
        owner: Option<String>,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<DocumentRecord, ProcessingError> {
        ProcessingService::ingest_document(self, owner, filename, bytes).await
    }

    async fn summarize_document(&self, id: i64) -> Result<SummaryOutcome, ProcessingError> {
        ProcessingService::summarize_document(self, id).await
    }

    async fn document_status(&self, id: i64) -> Result<DocumentStatus, ProcessingError> {
        ProcessingService::document_status(self, id)
    }

    async fn get_document(&self, id: i64) -> Result<DocumentRecord, ProcessingError> {
        ProcessingService::get_document(self, id)
    }

    async fn read_document_file(
        &self,
        id: i64,
    ) -> Result<(DocumentRecord, Vec<u8>), ProcessingError> {
        ProcessingService::read_document_file(self, id).await
    }

    async fn list_documents(
        &self,
        owner: Option<String>,
    ) -> Result<Vec<DocumentRecord>, ProcessingError> {
        ProcessingService::list_documents(self, owner)
    }

    async fn delete_document(&self, id: i64) -> Result<DocumentRecord, ProcessingError> {
        ProcessingService::delete_document(self, id).await
    }

    async fn cluster_documents(
        &self,
        n_clusters: Option<usize>,
    ) -> Result<ClusterOutcome, ProcessingError> {
        ProcessingService::cluster_documents(self, n_clusters).await
    }

    async fn similar_documents(
        &self,
        id: i64,
        k: usize,
    ) -> Result<Vec<SimilarDocument>, ProcessingError> {
        ProcessingService::similar_documents(self, id, k)
    }

    fn keywords(&self, text: &str, top_n: Option<usize>) -> Vec<String> {
        ProcessingService::keywords(self, text, top_n)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ProcessingService::metrics_snapshot(self)
    }

    fn pipeline_info(&self) -> PipelineInfo {
        ProcessingService::pipeline_info(self)
    }
}
