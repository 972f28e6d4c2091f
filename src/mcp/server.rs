//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    mcp::{
        format::{health_payload, json_resource_contents, settings_payload},
        handlers::{
            analysis::{handle_cluster_documents, handle_keywords},
            documents::{
                handle_document_status, handle_list_documents, handle_similar_documents,
                handle_summarize_document,
            },
            metrics::handle_metrics,
        },
        registry, schemas,
    },
    processing::ProcessingApi,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, JsonObject, ListResourcesResult,
        ListToolsResult, RawResource, ReadResourceRequestParam, ReadResourceResult, Resource,
        ServerCapabilities, ServerInfo, Tool, ToolAnnotations,
    },
};

const HEALTH_URI: &str = "mcp://health";
const SETTINGS_URI: &str = "mcp://settings";

/// MCP server exposing the docsift document pipeline.
#[derive(Clone)]
pub struct DocsiftMcpServer {
    processing: Arc<dyn ProcessingApi>,
    registry: Arc<registry::Registry>,
}

impl DocsiftMcpServer {
    /// Create a new MCP server backed by the supplied pipeline.
    pub fn new(processing: Arc<dyn ProcessingApi>) -> Self {
        let mut registry = registry::Registry::new();
        registry.register_resource(HEALTH_URI, resource_health);
        registry.register_resource(SETTINGS_URI, resource_settings);

        registry.register_tool("summarize-document", tool_summarize_document);
        registry.register_tool("document-status", tool_document_status);
        registry.register_tool("list-documents", tool_list_documents);
        registry.register_tool("keywords", tool_keywords);
        registry.register_tool("cluster-documents", tool_cluster_documents);
        registry.register_tool("similar-documents", tool_similar_documents);
        registry.register_tool("metrics", tool_metrics);
        tracing::debug!(tools = ?registry.tool_names(), "MCP tools registered");

        Self {
            processing,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        let info = self.processing.pipeline_info();
        let document_schema = Arc::new(schemas::document_id_input_schema());
        vec![
            describe_tool(
                "summarize-document",
                "Summarize Document",
                "Extract, summarize, and index an uploaded document; falls back to an extractive summary when the model provider fails.",
                document_schema.clone(),
                ToolAnnotations::with_title("Summarize Document")
                    .destructive(false)
                    .idempotent(true)
                    .open_world(true),
            ),
            describe_tool(
                "document-status",
                "Document Status",
                "Poll the summary lifecycle (pending, processing, done, error) of one document.",
                document_schema,
                ToolAnnotations::with_title("Document Status")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            describe_tool(
                "list-documents",
                "List Documents",
                "List uploaded documents newest first, optionally for one owner.",
                Arc::new(schemas::list_documents_input_schema()),
                ToolAnnotations::with_title("List Documents")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            describe_tool(
                "keywords",
                "Extract Keywords",
                "Return the most frequent content words of a text, stop words removed.",
                Arc::new(schemas::keywords_input_schema(info.keywords_top_n)),
                ToolAnnotations::with_title("Extract Keywords")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            describe_tool(
                "cluster-documents",
                "Cluster Documents",
                "Group every summarized document by summary embedding and label each cluster with its top terms.",
                Arc::new(schemas::cluster_input_schema(info.cluster_default_count)),
                ToolAnnotations::with_title("Cluster Documents")
                    .destructive(false)
                    .idempotent(true)
                    .open_world(false),
            ),
            describe_tool(
                "similar-documents",
                "Similar Documents",
                "Rank other summarized documents by cosine similarity to one document.",
                Arc::new(schemas::similar_input_schema()),
                ToolAnnotations::with_title("Similar Documents")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            describe_tool(
                "metrics",
                "Metrics Snapshot",
                "Check summarization volume, fallbacks, and failures at a glance.",
                Arc::new(schemas::empty_object_schema()),
                ToolAnnotations::with_title("Metrics Snapshot")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut health = RawResource::new(HEALTH_URI, "health");
        health.description = Some("Summarization and embedding providers in use".into());

        let mut settings = RawResource::new(SETTINGS_URI, "settings");
        settings.description =
            Some("Effective defaults for chunking, keywords, clustering, and uploads".into());

        vec![health.no_annotation(), settings.no_annotation()]
    }
}

fn describe_tool(
    name: &'static str,
    title: &str,
    description: &'static str,
    input_schema: Arc<JsonObject>,
    annotations: ToolAnnotations,
) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        title: Some(title.to_string()),
        description: Some(Cow::Borrowed(description)),
        input_schema,
        output_schema: None,
        annotations: Some(annotations),
        icons: None,
    }
}

fn resource_health(
    server: &DocsiftMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let info = server.processing.pipeline_info();
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(HEALTH_URI, health_payload(&info))],
        })
    })
}

fn resource_settings(
    server: &DocsiftMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let info = server.processing.pipeline_info();
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                SETTINGS_URI,
                settings_payload(&info),
            )],
        })
    })
}

fn tool_summarize_document(
    server: &DocsiftMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let processing = server.processing.clone();
    Box::pin(async move { handle_summarize_document(processing.as_ref(), request.arguments).await })
}

fn tool_document_status(
    server: &DocsiftMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let processing = server.processing.clone();
    Box::pin(async move { handle_document_status(processing.as_ref(), request.arguments).await })
}

fn tool_list_documents(
    server: &DocsiftMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let processing = server.processing.clone();
    Box::pin(async move { handle_list_documents(processing.as_ref(), request.arguments).await })
}

fn tool_keywords(server: &DocsiftMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let processing = server.processing.clone();
    Box::pin(async move { handle_keywords(processing.as_ref(), request.arguments).await })
}

fn tool_cluster_documents(
    server: &DocsiftMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let processing = server.processing.clone();
    Box::pin(async move { handle_cluster_documents(processing.as_ref(), request.arguments).await })
}

fn tool_similar_documents(
    server: &DocsiftMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let processing = server.processing.clone();
    Box::pin(async move { handle_similar_documents(processing.as_ref(), request.arguments).await })
}

fn tool_metrics(server: &DocsiftMcpServer, _request: CallToolRequestParam) -> registry::ToolFuture {
    let processing = server.processing.clone();
    Box::pin(async move { handle_metrics(processing.as_ref()).await })
}

impl ServerHandler for DocsiftMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "docsift".to_string();
        implementation.title = Some("docsift MCP".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to summarize uploaded documents, extract keywords, and group or compare documents by topic. Summarize a document first; similarity and clustering only see summarized documents.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let handler = self.registry.resource(request.uri.as_str())?;
            handler(self, request).await
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let handler = self.registry.tool(request.name.as_ref())?;
            handler(self, request).await
        }
    }
}
