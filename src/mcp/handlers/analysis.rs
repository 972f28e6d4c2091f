//! Handlers for corpus-level tools: keyword extraction and clustering.

use crate::{
    mcp::{
        format::{map_processing_error, to_payload},
        handlers::parse_arguments,
    },
    processing::ProcessingApi,
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeywordsRequest {
    text: String,
    #[serde(default)]
    top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClusterRequest {
    #[serde(default)]
    n_clusters: Option<usize>,
}

/// Handle `keywords`: frequency keywords of caller-supplied text.
pub(crate) async fn handle_keywords(
    processing: &dyn ProcessingApi,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let KeywordsRequest { text, top_n } = parse_arguments(arguments)?;
    if text.trim().is_empty() {
        return Err(McpError::invalid_params("text must not be empty", None));
    }
    if top_n == Some(0) {
        return Err(McpError::invalid_params("top_n must be at least 1", None));
    }
    let keywords = processing.keywords(&text, top_n);
    Ok(CallToolResult::structured(json!({ "keywords": keywords })))
}

/// Handle `cluster-documents`: re-cluster every summarized document.
pub(crate) async fn handle_cluster_documents(
    processing: &dyn ProcessingApi,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let ClusterRequest { n_clusters } = parse_arguments(arguments)?;
    if n_clusters == Some(0) {
        return Err(McpError::invalid_params(
            "n_clusters must be at least 1",
            None,
        ));
    }
    let outcome = processing
        .cluster_documents(n_clusters)
        .await
        .map_err(map_processing_error)?;
    tracing::info!(
        clusters = outcome.clusters.len(),
        documents = outcome.assignments.len(),
        "MCP cluster-documents completed"
    );
    Ok(CallToolResult::structured(to_payload(&outcome)?))
}
