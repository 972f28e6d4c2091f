#![deny(missing_docs)]

//! Core library for the docsift document summarization service.

/// HTTP routing and REST handlers.
pub mod api;
/// Topic clustering and similarity ranking over document embeddings.
pub mod clustering;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Plain-text extraction from uploaded PDF and DOCX files.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Pipeline metrics helpers.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// SQLite persistence for documents and their summary status.
pub mod store;
/// Abstractive summarization providers.
pub mod summarization;
/// Tokenization, TF-IDF weighting, and keyword extraction.
pub mod text;
