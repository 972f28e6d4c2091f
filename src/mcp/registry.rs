//! Name-to-handler lookup for the MCP surface.
//!
//! Tools and resources are plain function pointers so the server can dispatch without boxing
//! closures. Lookups for names that were never registered come back as `invalid_params`, which
//! is what clients see for a mistyped tool or resource URI.
use std::{collections::HashMap, future::Future, pin::Pin};

use rmcp::ErrorData as McpError;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ReadResourceRequestParam, ReadResourceResult,
};

use super::server::DocsiftMcpServer;

pub type ResourceFuture =
    Pin<Box<dyn Future<Output = Result<ReadResourceResult, McpError>> + Send>>;
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<CallToolResult, McpError>> + Send>>;

pub type ResourceHandler = fn(&DocsiftMcpServer, ReadResourceRequestParam) -> ResourceFuture;
pub type ToolHandler = fn(&DocsiftMcpServer, CallToolRequestParam) -> ToolFuture;

#[derive(Default)]
pub struct Registry {
    resources: HashMap<&'static str, ResourceHandler>,
    tools: HashMap<&'static str, ToolHandler>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering the same URI twice keeps the later handler.
    pub fn register_resource(&mut self, uri: &'static str, handler: ResourceHandler) {
        if self.resources.insert(uri, handler).is_some() {
            tracing::warn!(uri, "Resource handler replaced");
        }
    }

    /// Registering the same name twice keeps the later handler.
    pub fn register_tool(&mut self, name: &'static str, handler: ToolHandler) {
        if self.tools.insert(name, handler).is_some() {
            tracing::warn!(tool = name, "Tool handler replaced");
        }
    }

    pub fn resource(&self, uri: &str) -> Result<ResourceHandler, McpError> {
        self.resources
            .get(uri)
            .copied()
            .ok_or_else(|| McpError::invalid_params(format!("Unknown resource URI: {uri}"), None))
    }

    pub fn tool(&self, name: &str) -> Result<ToolHandler, McpError> {
        self.tools
            .get(name)
            .copied()
            .ok_or_else(|| McpError::invalid_params(format!("Unknown tool: {name}"), None))
    }

    /// Registered tool names in sorted order.
    pub fn tool_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.tools.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
