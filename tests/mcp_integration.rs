mod common;

use std::sync::Arc;

use common::{BAKING, ROCKETS, docx, temp_config};
use docsift::{mcp::DocsiftMcpServer, processing::ProcessingService};
use rmcp::{
    handler::client::ClientHandler,
    model::{
        self, CallToolRequestParam, ClientInfo, PaginatedRequestParam, ReadResourceRequestParam,
        ResourceContents,
    },
    service::{RoleClient, RoleServer, RunningService, ServiceError, serve_directly},
    transport::async_rw::AsyncRwTransport,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::split;

#[derive(Clone, Default)]
struct DummyClientHandler;

impl ClientHandler for DummyClientHandler {
    fn get_info(&self) -> ClientInfo {
        ClientInfo::default()
    }
}

struct TestHarness {
    service: RunningService<RoleClient, DummyClientHandler>,
    server: RunningService<RoleServer, DocsiftMcpServer>,
    processing: Arc<ProcessingService>,
    _dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let (dir, config) = temp_config();
        let processing = Arc::new(ProcessingService::new(&config).expect("processing service"));
        let server = DocsiftMcpServer::new(processing.clone());

        let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = split(client_stream);
        let (server_read, server_write) = split(server_stream);

        let client_transport = AsyncRwTransport::new_client(client_read, client_write);
        let server_transport = AsyncRwTransport::new_server(server_read, server_write);

        let server_info = rmcp::handler::server::ServerHandler::get_info(&server);
        let client_handler = DummyClientHandler;
        let client_info = ClientHandler::get_info(&client_handler);

        let server =
            serve_directly::<RoleServer, _, _, _, _>(server, server_transport, Some(client_info));
        let service = serve_directly::<RoleClient, _, _, _, _>(
            client_handler,
            client_transport,
            Some(server_info),
        );

        Self {
            service,
            server,
            processing,
            _dir: dir,
        }
    }

    async fn upload(&self, name: &str, paragraphs: &[&str]) -> i64 {
        self.processing
            .ingest_document(None, name.into(), docx(paragraphs))
            .await
            .expect("upload")
            .id
    }

    async fn call(&self, name: &str, arguments: Value) -> Result<Value, ServiceError> {
        let response = self
            .service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: arguments.as_object().cloned(),
            })
            .await?;
        assert_eq!(response.is_error, Some(false));
        Ok(response.structured_content.expect("structured payload"))
    }

    async fn shutdown(self) {
        let Self {
            service, server, ..
        } = self;
        let _ = service.cancel().await;
        let _ = server.cancel().await;
    }
}

fn assert_invalid_params(error: ServiceError) {
    match error {
        ServiceError::McpError(data) => {
            assert_eq!(data.code, model::ErrorCode::INVALID_PARAMS);
        }
        other => panic!("expected MCP error, got {other:?}"),
    }
}

#[tokio::test]
async fn initialize_and_list_tools() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let info = service
        .peer_info()
        .expect("server info should be initialized");
    assert_eq!(info.server_info.name, "docsift");
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.resources.is_some());

    let tools_result = service
        .list_tools(Some(PaginatedRequestParam { cursor: None }))
        .await
        .expect("list_tools");
    let names: Vec<_> = tools_result
        .tools
        .iter()
        .map(|tool| tool.name.as_ref())
        .collect();
    for expected in [
        "summarize-document",
        "document-status",
        "list-documents",
        "keywords",
        "cluster-documents",
        "similar-documents",
        "metrics",
    ] {
        assert!(names.contains(&expected), "missing tool {expected}");
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn summarize_then_poll_status_and_metrics() {
    let harness = TestHarness::new().await;
    let id = harness.upload("rockets.docx", &ROCKETS).await;

    let status = harness
        .call("document-status", json!({ "id": id }))
        .await
        .expect("status before");
    assert_eq!(status["summary_status"], "pending");
    assert_eq!(status["has_summary"], false);

    let summary = harness
        .call("summarize-document", json!({ "id": id }))
        .await
        .expect("summarize");
    assert_eq!(summary["id"], id);
    assert_eq!(summary["strategy"], "extractive");
    assert!(summary["summary"].as_str().is_some_and(|text| !text.is_empty()));
    assert!(summary["keywords"].as_array().is_some_and(|k| !k.is_empty()));

    let status = harness
        .call("document-status", json!({ "id": id }))
        .await
        .expect("status after");
    assert_eq!(status["summary_status"], "done");
    assert_eq!(status["has_summary"], true);

    let listed = harness
        .call("list-documents", json!({}))
        .await
        .expect("list");
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["documents"][0]["title"], "rockets.docx");

    let metrics = harness.call("metrics", json!({})).await.expect("metrics");
    assert_eq!(metrics["documentsSummarized"], 1);
    assert_eq!(metrics["lastChunkCount"], 0);

    harness.shutdown().await;
}

#[tokio::test]
async fn cluster_and_similarity_tools() {
    let harness = TestHarness::new().await;
    let rockets = harness.upload("rockets.docx", &ROCKETS).await;
    let bread = harness.upload("bread.docx", &BAKING).await;
    for id in [rockets, bread] {
        harness
            .call("summarize-document", json!({ "id": id }))
            .await
            .expect("summarize");
    }

    let clusters = harness
        .call("cluster-documents", json!({ "n_clusters": 2 }))
        .await
        .expect("cluster");
    assert_eq!(clusters["clusters"].as_array().map(Vec::len), Some(2));
    assert_eq!(clusters["assignments"].as_array().map(Vec::len), Some(2));

    let similar = harness
        .call("similar-documents", json!({ "id": rockets, "k": 5 }))
        .await
        .expect("similar");
    let neighbours = similar["similar"].as_array().expect("similar array");
    assert_eq!(neighbours.len(), 1);
    assert_eq!(neighbours[0]["id"], bread);

    harness.shutdown().await;
}

#[tokio::test]
async fn keywords_tool_ranks_frequent_terms() {
    let harness = TestHarness::new().await;

    let keywords = harness
        .call(
            "keywords",
            json!({ "text": "invoice invoice invoice payment payment overdue", "top_n": 2 }),
        )
        .await
        .expect("keywords");
    assert_eq!(keywords["keywords"], json!(["invoice", "payment"]));

    let error = harness
        .call("keywords", json!({ "text": "   " }))
        .await
        .expect_err("blank text rejected");
    assert_invalid_params(error);

    harness.shutdown().await;
}

#[tokio::test]
async fn caller_mistakes_return_invalid_params() {
    let harness = TestHarness::new().await;

    let missing = harness
        .call("document-status", json!({ "id": 404 }))
        .await
        .expect_err("unknown document");
    assert_invalid_params(missing);

    let unknown_field = harness
        .call("document-status", json!({ "id": 1, "verbose": true }))
        .await
        .expect_err("unknown field");
    assert_invalid_params(unknown_field);

    let nothing = harness
        .call("cluster-documents", json!({}))
        .await
        .expect_err("nothing summarized");
    assert_invalid_params(nothing);

    let unknown_tool = harness
        .call("push", json!({ "text": "hello" }))
        .await
        .expect_err("unknown tool");
    assert_invalid_params(unknown_tool);

    harness.shutdown().await;
}

#[tokio::test]
async fn resources_describe_the_pipeline() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let resources = service
        .list_resources(Some(PaginatedRequestParam { cursor: None }))
        .await
        .expect("list_resources");
    let uris: Vec<_> = resources
        .resources
        .iter()
        .map(|resource| resource.uri.as_str())
        .collect();
    assert!(uris.contains(&"mcp://health"));
    assert!(uris.contains(&"mcp://settings"));

    let health = service
        .read_resource(ReadResourceRequestParam {
            uri: "mcp://health".into(),
        })
        .await
        .expect("read health");
    let ResourceContents::TextResourceContents { text, .. } = &health.contents[0] else {
        panic!("expected text contents");
    };
    let payload: Value = serde_json::from_str(text).expect("health JSON");
    assert_eq!(payload["summarization"]["provider"], "none");
    assert_eq!(payload["embedding"]["provider"], "hash");
    assert_eq!(payload["embedding"]["dimension"], 128);

    let settings = service
        .read_resource(ReadResourceRequestParam {
            uri: "mcp://settings".into(),
        })
        .await
        .expect("read settings");
    let ResourceContents::TextResourceContents { text, .. } = &settings.contents[0] else {
        panic!("expected text contents");
    };
    let payload: Value = serde_json::from_str(text).expect("settings JSON");
    assert_eq!(payload["keywords"]["defaultTopN"], 5);
    assert_eq!(payload["clustering"]["defaultClusters"], 2);

    harness.shutdown().await;
}
