//! Formatting helpers shared across MCP handlers and resources.

use crate::processing::{PipelineInfo, ProcessingError};
use rmcp::{ErrorData as McpError, model::ResourceContents};
use serde::Serialize;
use serde_json::{Value, json};

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Build the health payload describing which providers the pipeline uses.
pub(crate) fn health_payload(info: &PipelineInfo) -> String {
    let payload = json!({
        "status": "ok",
        "summarization": {
            "provider": info.summarization_provider,
            "model": info.summarization_model,
            "maxRetries": info.summary_max_retries,
        },
        "embedding": {
            "provider": info.embedding_provider,
            "model": info.embedding_model,
            "dimension": info.embedding_dimension,
        },
        "ocr": info.ocr_enabled,
    });

    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
}

/// Build the settings payload describing pipeline defaults.
pub(crate) fn settings_payload(info: &PipelineInfo) -> String {
    let payload = json!({
        "summary": {
            "chunkChars": info.chunk_chars,
            "sentences": info.summary_sentences,
        },
        "keywords": {
            "defaultTopN": info.keywords_top_n,
        },
        "clustering": {
            "defaultClusters": info.cluster_default_count,
            "topTerms": info.cluster_top_terms,
        },
        "uploads": {
            "maxBytes": info.max_upload_bytes,
        },
    });

    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}

/// Convert a serializable tool result into a JSON value.
pub(crate) fn to_payload<T: Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|err| {
        McpError::internal_error(format!("Failed to serialize tool result: {err}"), None)
    })
}

/// Map a pipeline error onto the MCP error the caller should see.
///
/// Errors the caller can fix by changing arguments become `invalid_params`; everything else is
/// reported as an internal error.
pub(crate) fn map_processing_error(error: ProcessingError) -> McpError {
    match error {
        ProcessingError::NotFound(_)
        | ProcessingError::StoredFileMissing(_)
        | ProcessingError::UnsupportedFileType(_)
        | ProcessingError::EmptyUpload
        | ProcessingError::PayloadTooLarge { .. }
        | ProcessingError::NoEmbedding(_)
        | ProcessingError::NothingToCluster => McpError::invalid_params(error.to_string(), None),
        other => {
            tracing::error!(error = %other, "MCP tool failed");
            McpError::internal_error(other.to_string(), None)
        }
    }
}
