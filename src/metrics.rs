use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_summarized: AtomicU64,
    chunks_summarized: AtomicU64,
    extractive_fallbacks: AtomicU64,
    failed_documents: AtomicU64,
    last_chunk_count: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a summarized document and the number of chunks it was split into.
    pub fn record_summary(&self, chunk_count: u64) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.last_chunk_count.store(chunk_count, Ordering::Relaxed);
    }

    /// Record that an abstractive run fell back to the extractive summarizer.
    pub fn record_fallback(&self) {
        self.extractive_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a document whose processing ended in the `error` status.
    pub fn record_failure(&self) {
        self.failed_documents.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let documents_summarized = self.documents_summarized.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_summarized,
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            extractive_fallbacks: self.extractive_fallbacks.load(Ordering::Relaxed),
            failed_documents: self.failed_documents.load(Ordering::Relaxed),
            last_chunk_count: (documents_summarized > 0)
                .then(|| self.last_chunk_count.load(Ordering::Relaxed)),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents summarized since startup.
    pub documents_summarized: u64,
    /// Total chunks sent through the summarizer.
    pub chunks_summarized: u64,
    /// Abstractive runs that degraded to the extractive summarizer.
    pub extractive_fallbacks: u64,
    /// Documents whose processing ended in the `error` status.
    pub failed_documents: u64,
    /// Chunk count of the most recent summary, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_count: Option<u64>,
}
