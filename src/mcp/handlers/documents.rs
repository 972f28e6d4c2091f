//! Handlers for tools that operate on stored documents.

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

const DEFAULT_SIMILAR_K: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentIdRequest {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListDocumentsRequest {
    #[serde(default)]
    owner: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimilarRequest {
    id: i64,
    #[serde(default)]
    k: Option<usize>,
}

/// Handle `summarize-document`: run the full pipeline for one stored document.
pub(crate) async fn handle_summarize_document(
    processing: &dyn ProcessingApi,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let DocumentIdRequest { id } = parse_arguments(arguments)?;
    tracing::info!(document_id = id, "MCP summarize-document");
    let outcome = processing
        .summarize_document(id)
        .await
        .map_err(map_processing_error)?;
    Ok(CallToolResult::structured(to_payload(&outcome)?))
}

/// Handle `document-status`.
pub(crate) async fn handle_document_status(
    processing: &dyn ProcessingApi,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let DocumentIdRequest { id } = parse_arguments(arguments)?;
    let status = processing
        .document_status(id)
        .await
        .map_err(map_processing_error)?;
    let mut payload = to_payload(&status)?;
    if let Some(map) = payload.as_object_mut() {
        map.insert("id".into(), json!(id));
    }
    Ok(CallToolResult::structured(payload))
}

/// Handle `list-documents`.
pub(crate) async fn handle_list_documents(
    processing: &dyn ProcessingApi,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let ListDocumentsRequest { owner } = parse_arguments(arguments)?;
    let owner = owner
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let documents = processing
        .list_documents(owner)
        .await
        .map_err(map_processing_error)?;
    Ok(CallToolResult::structured(json!({
        "documents": to_payload(&documents)?,
        "count": documents.len(),
    })))
}

/// Handle `similar-documents`.
pub(crate) async fn handle_similar_documents(
    processing: &dyn ProcessingApi,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let SimilarRequest { id, k } = parse_arguments(arguments)?;
    let k = k.unwrap_or(DEFAULT_SIMILAR_K);
    if k == 0 {
        return Err(McpError::invalid_params("k must be at least 1", None));
    }
    let similar = processing
        .similar_documents(id, k)
        .await
        .map_err(map_processing_error)?;
    Ok(CallToolResult::structured(json!({
        "id": id,
        "similar": to_payload(&similar)?,
    })))
}
