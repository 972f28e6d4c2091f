//! Handler for the metrics tool.

use crate::processing::ProcessingApi;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

/// Handle the `metrics` tool, returning the current pipeline counters.
pub(crate) async fn handle_metrics(
    processing: &dyn ProcessingApi,
) -> Result<CallToolResult, McpError> {
    let snapshot = processing.metrics_snapshot();
    Ok(CallToolResult::structured(json!({
        "documentsSummarized": snapshot.documents_summarized,
        "chunksSummarized": snapshot.chunks_summarized,
        "extractiveFallbacks": snapshot.extractive_fallbacks,
        "failedDocuments": snapshot.failed_documents,
        "lastChunkCount": snapshot.last_chunk_count,
    })))
}
