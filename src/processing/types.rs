//! Core data types and error definitions for the processing pipeline.

use serde::Serialize;
use thiserror::Error;

use crate::{
    clustering::ClusteringError,
    embedding::EmbeddingClientError,
    extraction::ExtractionError,
    store::{StoreError, SummaryStatus},
    summarization::SummarizationClientError,
};

/// Errors produced while splitting text into summarization chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Caller configured an impossible character budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted by the document processing pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// No document exists with the requested id.
    #[error("Document {0} not found")]
    NotFound(i64),
    /// The row exists but its upload is gone from disk.
    #[error("Stored file for document {0} is missing")]
    StoredFileMissing(i64),
    /// Upload used an extension outside the accepted set.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    /// Upload carried no bytes.
    #[error("Uploaded file is empty")]
    EmptyUpload,
    /// Upload exceeded the configured size limit.
    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Size of the rejected upload.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },
    /// Text could not be extracted from the stored file.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Document store rejected a read or write.
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
    /// Summarization provider could not be constructed.
    #[error("Summarization provider setup failed: {0}")]
    Summarization(#[from] SummarizationClientError),
    /// Embedding provider failed to produce vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Clustering rejected its input.
    #[error("Clustering failed: {0}")]
    Clustering(#[from] ClusteringError),
    /// Similarity was requested for a document without a stored embedding.
    #[error("Document {0} has no embedding yet; summarize it first")]
    NoEmbedding(i64),
    /// Clustering was requested before any document finished summarizing.
    #[error("No summarized documents available to cluster")]
    NothingToCluster,
    /// Filesystem access for uploads failed.
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
    /// A blocking worker panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}

/// How a summary was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStrategy {
    /// Generated by a language model provider.
    Abstractive,
    /// Selected sentences by TF-IDF weight.
    Extractive,
}

/// Output of the summarization pipeline for one text.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    /// Final summary text.
    pub text: String,
    /// Strategy that produced `text`.
    pub strategy: SummaryStrategy,
    /// Chunks sent to the provider (zero for extractive runs).
    pub chunk_count: usize,
    /// Provider label when a model produced the summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model identifier when a model produced the summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Result of summarizing a stored document.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutcome {
    /// Document id.
    pub id: i64,
    /// Stored summary text.
    pub summary: String,
    /// Strategy that produced the summary.
    pub strategy: SummaryStrategy,
    /// Keywords stored alongside the summary.
    pub keywords: Vec<String>,
    /// Chunks sent to the provider.
    pub chunk_count: usize,
    /// Provider label when a model produced the summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model identifier when a model produced the summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Lightweight status view for polling clients.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatus {
    /// Current summary lifecycle state.
    pub summary_status: SummaryStatus,
    /// Whether a non-empty summary is stored.
    pub has_summary: bool,
    /// Error detail when the status is `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// One cluster produced by a clustering run.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    /// Cluster index.
    pub cluster_id: i64,
    /// Label terms, heaviest first.
    pub topics: Vec<String>,
    /// Documents assigned to the cluster.
    pub document_ids: Vec<i64>,
}

/// Cluster assigned to one document.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterAssignment {
    /// Document id.
    pub id: i64,
    /// Document title.
    pub title: String,
    /// Assigned cluster index.
    pub cluster_id: i64,
}

/// Result of a clustering run.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterOutcome {
    /// Clusters with their label terms.
    pub clusters: Vec<ClusterSummary>,
    /// Per-document assignments.
    pub assignments: Vec<ClusterAssignment>,
}

/// Document ranked by summary-embedding similarity.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarDocument {
    /// Document id.
    pub id: i64,
    /// Document title.
    pub title: String,
    /// Cosine similarity to the target document.
    pub score: f32,
}

/// Provider and default settings the pipeline runs with.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineInfo {
    /// Abstractive summarization provider label (`none`, `ollama`, `gemini`).
    pub summarization_provider: String,
    /// Model used for abstractive summaries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarization_model: Option<String>,
    /// Embedding provider label.
    pub embedding_provider: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Embedding vector length.
    pub embedding_dimension: usize,
    /// Character budget per summarization chunk.
    pub chunk_chars: usize,
    /// Retries per chunk after the first failure.
    pub summary_max_retries: u32,
    /// Sentences kept by extractive summaries.
    pub summary_sentences: usize,
    /// Keywords stored per document.
    pub keywords_top_n: usize,
    /// Cluster count used when none is requested.
    pub cluster_default_count: usize,
    /// Label terms per cluster.
    pub cluster_top_terms: usize,
    /// Whether scanned PDFs go through OCR.
    pub ocr_enabled: bool,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
}
