use crate::{
    processing::{
        chunking::{ChunkStrategy, chunk_text},
        types::ChunkingError,
    },
    summarization::{RetryPolicy, SummarizationClient, SummarizationRequest, generate_with_retry},
};

use super::{build_chunk_prompt, build_merge_prompt};

/// Chunk, summarize each chunk with retries, then merge.
///
/// Returns `Ok(None)` when any chunk exhausts its retries so the caller can fall back to an
/// extractive summary of the whole text. A failed merge degrades to the chunk summaries joined
/// by spaces.
pub(super) async fn summarize_abstractive(
    client: &dyn SummarizationClient,
    model: &str,
    text: &str,
    chunk_chars: usize,
    strategy: ChunkStrategy,
    retry: &RetryPolicy,
) -> Result<Option<(String, usize)>, ChunkingError> {
    let chunks = chunk_text(text, chunk_chars, strategy)?;
    let chunk_count = chunks.len();
    tracing::debug!(chunk_count, chunk_chars, ?strategy, model, "Summarizing chunks");

    let mut chunk_summaries = Vec::with_capacity(chunk_count);
    for (index, chunk) in chunks.iter().enumerate() {
        let request = SummarizationRequest {
            model: model.to_string(),
            prompt: build_chunk_prompt(chunk),
        };
        match generate_with_retry(client, &request, retry).await {
            Ok(summary) => chunk_summaries.push(summary),
            Err(error) => {
                tracing::warn!(chunk = index, %error, "Chunk summarization exhausted retries");
                return Ok(None);
            }
        }
    }

    if chunk_summaries.len() <= 1 {
        return Ok(chunk_summaries.pop().map(|summary| (summary, chunk_count)));
    }

    let request = SummarizationRequest {
        model: model.to_string(),
        prompt: build_merge_prompt(&chunk_summaries),
    };
    let merged = match client.generate_summary(request).await {
        Ok(summary) => summary,
        Err(error) => {
            tracing::warn!(%error, "Merging chunk summaries failed; joining them instead");
            chunk_summaries.join(" ")
        }
    };

    Ok(Some((merged, chunk_count)))
}
