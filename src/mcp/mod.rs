//! Model Context Protocol (MCP) integration for docsift.
//!
//! This module exposes the document pipeline to editors and agent hosts over stdio. The surface
//! area consists of:
//!
//! - Tools: `summarize-document`, `document-status`, `list-documents`, `keywords`,
//!   `cluster-documents`, `similar-documents`, and `metrics`.
//! - Resources: `mcp://health` (providers in use) and `mcp://settings` (pipeline defaults).
//!
//! Handlers, schemas, and formatting helpers live in focused submodules so tests stay small.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::DocsiftMcpServer;
