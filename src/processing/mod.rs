//! Document processing pipeline: extraction, chunking, summarization, and clustering.

pub mod chunking;
mod mappers;
pub mod sanitize;
mod service;
pub mod summarize;
pub mod types;

pub use service::{ProcessingApi, ProcessingService};
pub use summarize::Summarizer;
pub use types::{
    ChunkingError, ClusterAssignment, ClusterOutcome, ClusterSummary, DocumentStatus,
    PipelineInfo, ProcessingError, SimilarDocument, SummaryOutcome, SummaryResult,
    SummaryStrategy,
};
