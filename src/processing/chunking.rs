//! Character-budget chunking for the summarization pipeline.
//!
//! Two strategies are offered:
//!
//! - Sentence packing ([`chunk_sentences`]): greedily packs whole sentences into chunks of at
//!   most `max_chars` characters. Local models have small input windows, so this is used for
//!   the local provider. Sentences longer than the budget are split with `semchunk-rs` using a
//!   character counter, so the budget is a hard bound.
//! - Windowing ([`chunk_windows`]): fixed windows extended to the next sentence end within a
//!   short look-ahead. Used for the remote provider, whose context is large and where fewer,
//!   fuller requests are cheaper.

use semchunk_rs::Chunker;

use super::types::ChunkingError;
use crate::text::split_sentences;

/// Characters scanned past a window edge when looking for a sentence end.
const WINDOW_LOOKAHEAD: usize = 200;

/// Chunking strategy applied before per-chunk summarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Pack whole sentences up to the budget.
    Sentences,
    /// Fixed windows snapped forward to a sentence end.
    Windows,
}

/// Split `text` into chunks of at most `max_chars` characters using `strategy`.
///
/// Window chunks may exceed the budget by up to the look-ahead when snapping to a sentence end.
pub fn chunk_text(
    text: &str,
    max_chars: usize,
    strategy: ChunkStrategy,
) -> Result<Vec<String>, ChunkingError> {
    if max_chars == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(match strategy {
        ChunkStrategy::Sentences => chunk_sentences(&split_sentences(text), max_chars),
        ChunkStrategy::Windows => chunk_windows(text, max_chars),
    })
}

/// Greedily pack sentences into chunks whose summed sentence lengths stay within `max_chars`.
///
/// Separating spaces are not counted against the budget.
pub fn chunk_sentences(sentences: &[String], max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for sentence in sentences {
        let sentence_len = sentence.chars().count();
        if sentence_len == 0 {
            continue;
        }

        if sentence_len > max_chars {
            flush(&mut chunks, &mut current, &mut current_len);
            chunks.extend(split_oversized(sentence, max_chars));
            continue;
        }

        if current_len + sentence_len > max_chars {
            flush(&mut chunks, &mut current, &mut current_len);
        }
        current.push(sentence);
        current_len += sentence_len;
    }
    flush(&mut chunks, &mut current, &mut current_len);

    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut Vec<&str>, current_len: &mut usize) {
    if !current.is_empty() {
        chunks.push(current.join(" "));
        current.clear();
    }
    *current_len = 0;
}

fn split_oversized(sentence: &str, max_chars: usize) -> Vec<String> {
    let chunker = Chunker::new(
        max_chars,
        Box::new(|segment: &str| segment.chars().count()),
    );
    chunker
        .chunk(sentence)
        .into_iter()
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Cut `text` into windows of `max_chars` characters, extending each window through the first
/// `.`, `!` or `?` followed by whitespace found within the look-ahead.
pub fn chunk_windows(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = start + max_chars;
        if end >= chars.len() {
            push_window(&mut chunks, &chars[start..]);
            break;
        }

        let lookahead_end = (end + WINDOW_LOOKAHEAD).min(chars.len());
        if let Some(offset) = (end..lookahead_end.saturating_sub(1)).find(|&index| {
            matches!(chars[index], '.' | '!' | '?') && chars[index + 1].is_whitespace()
        }) {
            end = offset + 2;
        }

        push_window(&mut chunks, &chars[start..end]);
        start = end;
    }

    chunks
}

fn push_window(chunks: &mut Vec<String>, window: &[char]) {
    let text: String = window.iter().collect();
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
