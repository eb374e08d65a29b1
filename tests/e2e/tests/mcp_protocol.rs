//! Black-box MCP protocol tests: initialize -> tools/list -> tools/call,
//! driving `McpServer` directly rather than over stdio (§6).

use std::sync::Arc;
use std::time::Duration;

use shirokuma_core::enrichment::NullEnrichmentProvider;
use shirokuma_core::Storage;
use shirokuma_mcp::protocol::types::JsonRpcRequest;
use shirokuma_mcp::server::McpServer;
use tempfile::TempDir;

fn request(method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(serde_json::json!(1)),
        method: method.to_string(),
        params,
    }
}

async fn new_server() -> (McpServer, TempDir) {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(Storage::new(Some(dir.path().join("test.db"))).unwrap());
    let server = McpServer::new(storage, Arc::new(NullEnrichmentProvider), Duration::from_secs(1));
    (server, dir)
}

async fn call(server: &mut McpServer, name: &str, args: serde_json::Value) -> serde_json::Value {
    let response = server
        .handle_request(request(
            "tools/call",
            Some(serde_json::json!({ "name": name, "arguments": args })),
        ))
        .await
        .unwrap();
    assert!(response.error.is_none(), "{} failed: {:?}", name, response.error);
    let result = response.result.unwrap();
    let text = result["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn initialize_then_list_then_call_happy_path() {
    let (mut server, _dir) = new_server().await;

    let init = server.handle_request(request("initialize", None)).await.unwrap();
    assert!(init.error.is_none());

    let list = server.handle_request(request("tools/list", None)).await.unwrap();
    let tools = list.result.unwrap()["tools"].as_array().unwrap().len();
    assert_eq!(tools, 13);

    let item = call(
        &mut server,
        "create_item",
        serde_json::json!({ "type": "issue", "title": "Fix login" }),
    )
    .await;
    assert_eq!(item["title"], "Fix login");
    assert!(item.get("embedding").is_none());
}

#[tokio::test]
async fn requests_before_initialize_are_rejected() {
    let (mut server, _dir) = new_server().await;

    let response = server.handle_request(request("tools/list", None)).await.unwrap();
    assert_eq!(response.error.unwrap().code, -32003);
}

#[tokio::test]
async fn malformed_tool_arguments_return_invalid_params() {
    let (mut server, _dir) = new_server().await;
    server.handle_request(request("initialize", None)).await;

    let response = server
        .handle_request(request(
            "tools/call",
            Some(serde_json::json!({ "name": "create_item", "arguments": { "title": "missing type" } })),
        ))
        .await
        .unwrap();

    assert_eq!(response.error.unwrap().code, -32602);
}

#[tokio::test]
async fn unknown_field_in_arguments_is_rejected() {
    let (mut server, _dir) = new_server().await;
    server.handle_request(request("initialize", None)).await;

    let response = server
        .handle_request(request(
            "tools/call",
            Some(serde_json::json!({
                "name": "get_item",
                "arguments": { "id": 1, "bogusField": true }
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.error.unwrap().code, -32602);
}

#[tokio::test]
async fn core_error_surfaces_as_application_error_with_details() {
    let (mut server, _dir) = new_server().await;
    server.handle_request(request("initialize", None)).await;

    let response = server
        .handle_request(request(
            "tools/call",
            Some(serde_json::json!({ "name": "get_item", "arguments": { "id": 42 } })),
        ))
        .await
        .unwrap();

    let error = response.error.unwrap();
    assert_eq!(error.code, -32002);
    let data = error.data.unwrap();
    assert_eq!(data["code"], "NotFound");
    assert!(data["message"].is_string());
}

#[tokio::test]
async fn item_projection_never_carries_embedding() {
    let (mut server, _dir) = new_server().await;
    server.handle_request(request("initialize", None)).await;

    let item = call(
        &mut server,
        "create_item",
        serde_json::json!({ "type": "note", "title": "No leaks here" }),
    )
    .await;
    assert!(item.get("embedding").is_none());

    let fetched = call(&mut server, "get_item", serde_json::json!({ "id": item["id"] })).await;
    assert!(fetched.get("embedding").is_none());
}
