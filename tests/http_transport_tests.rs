// HTTP transport tests - in-process server on an ephemeral port
//
// The client side goes through HttpToolServer and ToolCatalog exactly as
// the chat binary does.

use lean_mcp::rpc::SESSION_HEADER;
use lean_mcp::server::http::router;
use lean_mcp::server::{McpHandler, ToolDispatcher};
use lean_mcp::tooling::{HttpToolServer, ToolCatalog, ToolInvokeError, ToolServerInterface};
use lean_mcp::types::ToolCallRequest;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = router(McpHandler::new(ToolDispatcher::new()));
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .await
            .expect("serve");
    });
    format!("http://{addr}/mcp")
}

#[tokio::test]
async fn catalog_discovers_six_strict_tools() {
    let url = spawn_server().await;
    let server = Arc::new(HttpToolServer::connect(url).await.expect("connect"));
    let catalog = ToolCatalog::discover(server).await.expect("discover");

    let names: Vec<_> = catalog.tools().iter().map(|tool| tool.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "read_file",
            "write_file",
            "list_directory",
            "delete_file",
            "create_directory",
            "file_info"
        ]
    );
    let write = catalog
        .specs()
        .iter()
        .find(|spec| spec.name == "write_file")
        .expect("write_file spec");
    assert_eq!(write.parameters["additionalProperties"], false);
    let mut required: Vec<_> = write.parameters["required"]
        .as_array()
        .expect("required list")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    required.sort_unstable();
    assert_eq!(required, vec!["content", "file_path"]);
    catalog.close().await;
}

#[tokio::test]
async fn tool_calls_round_trip_over_http() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("greeting.txt").to_string_lossy().into_owned();
    let url = spawn_server().await;
    let catalog = ToolCatalog::discover(Arc::new(HttpToolServer::connect(url).await.expect("connect")))
        .await
        .expect("discover");

    let write = ToolCallRequest::new(
        "call_w",
        "write_file",
        json!({"file_path": file, "content": "hi there"})
            .as_object()
            .cloned()
            .unwrap_or_default(),
    );
    let result = catalog.call(&write).await.expect("write");
    assert_eq!(result.tool_call_id, "call_w");
    assert_eq!(result.text, format!("Successfully wrote 8 characters to '{file}'"));

    let read = ToolCallRequest::new(
        "call_r",
        "read_file",
        json!({"file_path": file}).as_object().cloned().unwrap_or_default(),
    );
    assert_eq!(catalog.call(&read).await.expect("read").text, "hi there");

    let missing = ToolCallRequest::new(
        "call_m",
        "read_file",
        json!({"file_path": "/no/such/file"}).as_object().cloned().unwrap_or_default(),
    );
    assert_eq!(
        catalog.call(&missing).await.expect("fault is text").text,
        "Error: File not found - '/no/such/file'"
    );
}

#[tokio::test]
async fn closed_connection_rejects_calls() {
    let url = spawn_server().await;
    let server = HttpToolServer::connect(url).await.expect("connect");
    server.close().await;
    let err = server.list_tools().await.expect_err("closed");
    assert!(matches!(err, ToolInvokeError::Transport { .. }));
}

#[tokio::test]
async fn raw_http_semantics() {
    let url = spawn_server().await;
    let client = reqwest::Client::new();

    let get = client.get(&url).send().await.expect("get");
    assert_eq!(get.status(), StatusCode::METHOD_NOT_ALLOWED);

    let init = client
        .post(&url)
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
        .send()
        .await
        .expect("initialize");
    assert_eq!(init.status(), StatusCode::OK);
    let session = init
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .expect("session header");
    let body: Value = init.json().await.expect("json");
    assert_eq!(body["result"]["protocolVersion"], "2025-06-18");

    let notified = client
        .post(&url)
        .header(SESSION_HEADER, &session)
        .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .send()
        .await
        .expect("notification");
    assert_eq!(notified.status(), StatusCode::ACCEPTED);

    let unknown: Value = client
        .post(&url)
        .header(SESSION_HEADER, &session)
        .json(&json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"}))
        .send()
        .await
        .expect("unknown method")
        .json()
        .await
        .expect("json");
    assert_eq!(unknown["error"]["code"], -32601);

    let deleted = client
        .delete(&url)
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("delete");
    assert_eq!(deleted.status(), StatusCode::OK);
}
