//! Summarization pipeline: chunk, summarize each chunk, merge.
//!
//! The [`Summarizer`] owns the optional abstractive client. Without one, or whenever a chunk
//! exhausts its retries, the whole text is summarized extractively instead.

mod strategy;

use crate::{
    config::{Config, SummarizationProvider},
    metrics::PipelineMetrics,
    processing::{
        chunking::ChunkStrategy,
        types::{ChunkingError, SummaryResult, SummaryStrategy},
    },
    summarization::{
        RetryPolicy, SummarizationClient, SummarizationClientError, build_summarization_client,
    },
    text::extractive_summary,
};

/// Returned when a document has too little text to summarize.
pub const INSUFFICIENT_CONTENT: &str = "Not enough extractable content to summarize.";
const MIN_SUMMARY_CHARS: usize = 50;

const CHUNK_INSTRUCTIONS: &str = "Please produce a concise summary of the following document \
     chunk. Format as a short paragraph (3-6 sentences). Be factual and preserve main points.";
const MERGE_INSTRUCTIONS: &str = "You are given several intermediate summaries (each from a \
     chunk of the same document). Please combine them into a single concise summary (4-6 \
     sentences) that covers the main points:";

/// Prompt asking the model to summarize one chunk.
pub fn build_chunk_prompt(chunk: &str) -> String {
    format!("{CHUNK_INSTRUCTIONS}\n\n{chunk}")
}

/// Prompt asking the model to merge per-chunk summaries.
pub fn build_merge_prompt(chunk_summaries: &[String]) -> String {
    format!("{MERGE_INSTRUCTIONS}\n\n{}", chunk_summaries.join("\n\n"))
}

/// Summarizes documents with an optional abstractive provider and an extractive fallback.
pub struct Summarizer {
    client: Option<Box<dyn SummarizationClient>>,
    provider: SummarizationProvider,
    model: Option<String>,
    chunk_chars: usize,
    retry: RetryPolicy,
    extractive_sentences: usize,
}

impl Summarizer {
    /// Extractive-only summarizer keeping `sentences` sentences.
    pub fn extractive(sentences: usize) -> Self {
        Self {
            client: None,
            provider: SummarizationProvider::None,
            model: None,
            chunk_chars: 1000,
            retry: RetryPolicy::default(),
            extractive_sentences: sentences,
        }
    }

    /// Build the summarizer described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, SummarizationClientError> {
        let summarizer = Self::extractive(config.summary_sentences)
            .with_chunk_chars(config.chunk_chars())
            .with_retry(RetryPolicy::new(config.summary_max_retries));
        Ok(match build_summarization_client(config)? {
            Some(client) => summarizer.with_client(
                client,
                config.summarization_provider,
                config.resolved_summarization_model().unwrap_or_default(),
            ),
            None => summarizer,
        })
    }

    /// Attach an abstractive provider.
    pub fn with_client(
        mut self,
        client: Box<dyn SummarizationClient>,
        provider: SummarizationProvider,
        model: impl Into<String>,
    ) -> Self {
        self.client = Some(client);
        self.provider = provider;
        self.model = Some(model.into());
        self
    }

    /// Override the per-chunk character budget.
    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars;
        self
    }

    /// Override the retry policy applied to each provider call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Provider that abstractive summaries come from.
    pub fn provider(&self) -> SummarizationProvider {
        self.provider
    }

    /// Model used for abstractive summaries, if any.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn chunk_strategy(&self) -> ChunkStrategy {
        match self.provider {
            SummarizationProvider::Gemini => ChunkStrategy::Windows,
            SummarizationProvider::Ollama | SummarizationProvider::None => {
                ChunkStrategy::Sentences
            }
        }
    }

    /// Summarize `text`, recording fallbacks on `metrics`.
    pub async fn summarize(
        &self,
        text: &str,
        metrics: &PipelineMetrics,
    ) -> Result<SummaryResult, ChunkingError> {
        if text.trim().chars().count() < MIN_SUMMARY_CHARS {
            return Ok(extractive_result(INSUFFICIENT_CONTENT.to_string()));
        }

        let (Some(client), Some(model)) = (self.client.as_deref(), self.model.as_deref()) else {
            return Ok(extractive_result(extractive_summary(
                text,
                self.extractive_sentences,
            )));
        };

        match strategy::summarize_abstractive(
            client,
            model,
            text,
            self.chunk_chars,
            self.chunk_strategy(),
            &self.retry,
        )
        .await?
        {
            Some((summary, chunk_count)) => Ok(SummaryResult {
                text: summary,
                strategy: SummaryStrategy::Abstractive,
                chunk_count,
                provider: Some(self.provider.label().to_string()),
                model: Some(model.to_string()),
            }),
            None => {
                metrics.record_fallback();
                tracing::warn!(
                    provider = self.provider.label(),
                    model,
                    "Abstractive summarization failed; falling back to extractive"
                );
                Ok(extractive_result(extractive_summary(
                    text,
                    self.extractive_sentences,
                )))
            }
        }
    }
}

fn extractive_result(text: String) -> SummaryResult {
    SummaryResult {
        text,
        strategy: SummaryStrategy::Extractive,
        chunk_count: 0,
        provider: None,
        model: None,
    }
}
