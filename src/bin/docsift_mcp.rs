//! MCP server entrypoint (stdio transport).
//!
//! Exposes docsift's document tools and resources over stdio for editor and agent hosts. The
//! pipeline shares its database, upload directory, and provider settings with the HTTP binary.
use anyhow::{Context, Result};
use docsift::{config, logging, mcp::DocsiftMcpServer, processing};
use rmcp::{service::ServiceExt, transport::stdio};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_mcp_tracing();

    let processing = processing::ProcessingService::new(config::get_config())
        .context("failed to initialize document pipeline")?;
    let server = DocsiftMcpServer::new(Arc::new(processing));

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
