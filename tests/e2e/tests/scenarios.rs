//! The six concrete scenarios and a sample of the testable properties
//! from §8, driven end-to-end through the MCP tool surface.

use std::sync::Arc;
use std::time::Duration;

use shirokuma_core::enrichment::{AlwaysFailingProvider, NullEnrichmentProvider};
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

async fn new_server_with(
    provider: Arc<dyn shirokuma_core::enrichment::EnrichmentProvider>,
) -> (McpServer, TempDir) {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(Storage::new(Some(dir.path().join("test.db"))).unwrap());
    let mut server = McpServer::new(storage, provider, Duration::from_millis(50));
    server.handle_request(request("initialize", None)).await;
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

async fn call_err(server: &mut McpServer, name: &str, args: serde_json::Value) -> serde_json::Value {
    let response = server
        .handle_request(request(
            "tools/call",
            Some(serde_json::json!({ "name": name, "arguments": args })),
        ))
        .await
        .unwrap();
    response.error.unwrap().data.unwrap()
}

/// Scenario 1: tags normalize to lowercase-deduplicated, status/priority
/// resolve to their defaults.
#[tokio::test]
async fn scenario_1_create_normalizes_tags_and_resolves_defaults() {
    let (mut server, _dir) = new_server_with(Arc::new(NullEnrichmentProvider)).await;

    let item = call(
        &mut server,
        "create_item",
        serde_json::json!({
            "type": "issue",
            "title": "Fix login",
            "tags": ["Bug", "bug", "AUTH"]
        }),
    )
    .await;

    let mut tags: Vec<&str> = item["tags"].as_array().unwrap().iter().map(|t| t.as_str().unwrap()).collect();
    tags.sort();
    assert_eq!(tags, vec!["auth", "bug"]);
    assert_eq!(item["status"], "Open");
    assert_eq!(item["priority"], "MEDIUM");
}

/// Scenario 2: updating type + priority leaves other fields unchanged.
#[tokio::test]
async fn scenario_2_update_changes_only_requested_fields() {
    let (mut server, _dir) = new_server_with(Arc::new(NullEnrichmentProvider)).await;

    let created = call(
        &mut server,
        "create_item",
        serde_json::json!({ "type": "issue", "title": "Fix login" }),
    )
    .await;
    let id = created["id"].clone();

    let updated = call(
        &mut server,
        "update_item",
        serde_json::json!({ "id": id, "priority": "HIGH", "type": "bug_fix" }),
    )
    .await;

    assert_eq!(updated["type"], "bug_fix");
    assert_eq!(updated["priority"], "HIGH");
    assert_eq!(updated["title"], "Fix login");
}

/// Scenario 3: an invalid type on update fails validation, not storage.
#[tokio::test]
async fn scenario_3_update_with_invalid_type_fails_validation() {
    let (mut server, _dir) = new_server_with(Arc::new(NullEnrichmentProvider)).await;

    let created = call(
        &mut server,
        "create_item",
        serde_json::json!({ "type": "issue", "title": "Fix login" }),
    )
    .await;

    let error = call_err(
        &mut server,
        "update_item",
        serde_json::json!({ "id": created["id"], "type": "Bug Fix" }),
    )
    .await;
    assert_eq!(error["code"], "InvalidType");
}

/// Scenario 4: manual relations show up in `get_related_items`'s manual list.
#[tokio::test]
async fn scenario_4_add_relations_appears_in_manual_list() {
    let (mut server, _dir) = new_server_with(Arc::new(NullEnrichmentProvider)).await;

    let a = call(&mut server, "create_item", serde_json::json!({ "type": "issue", "title": "A" })).await;
    let b = call(&mut server, "create_item", serde_json::json!({ "type": "issue", "title": "B" })).await;

    let inserted = call(
        &mut server,
        "add_relations",
        serde_json::json!({ "sourceId": a["id"], "targetIds": [b["id"]] }),
    )
    .await;
    assert_eq!(inserted["inserted"], 1);

    let related = call(&mut server, "get_related_items", serde_json::json!({ "id": a["id"] })).await;
    let manual_ids: Vec<i64> = related["manual"].as_array().unwrap().iter().map(|i| i["id"].as_i64().unwrap()).collect();
    assert!(manual_ids.contains(&b["id"].as_i64().unwrap()));
}

/// Scenario 5: keyword-overlap ranking prefers the item sharing more keywords.
#[tokio::test]
async fn scenario_5_keyword_strategy_ranks_overlap_higher() {
    let (mut server, _dir) = new_server_with(Arc::new(NullEnrichmentProvider)).await;

    let seed = call(
        &mut server,
        "create_item",
        serde_json::json!({ "type": "note", "title": "alpha beta", "content": "alpha beta shared topic" }),
    )
    .await;
    let close = call(
        &mut server,
        "create_item",
        serde_json::json!({ "type": "note", "title": "alpha gamma", "content": "alpha gamma shared topic" }),
    )
    .await;
    let far = call(
        &mut server,
        "create_item",
        serde_json::json!({ "type": "note", "title": "delta epsilon", "content": "delta epsilon unrelated" }),
    )
    .await;

    let related = call(
        &mut server,
        "get_related_items",
        serde_json::json!({ "id": seed["id"], "strategy": "keywords" }),
    )
    .await;
    let computed = related["computed"].as_array().unwrap();
    let ids: Vec<i64> = computed.iter().map(|i| i["id"].as_i64().unwrap()).collect();

    let close_pos = ids.iter().position(|&id| id == close["id"].as_i64().unwrap());
    let far_pos = ids.iter().position(|&id| id == far["id"].as_i64().unwrap());
    if let (Some(cp), Some(fp)) = (close_pos, far_pos) {
        assert!(cp < fp, "item sharing more keyword overlap should rank higher");
    }
}

/// Scenario 6 / P8: enrichment permanently failing never blocks a create,
/// and the item is still lexically searchable.
#[tokio::test]
async fn scenario_6_create_survives_enrichment_timeout_and_stays_searchable() {
    let (mut server, _dir) = new_server_with(Arc::new(AlwaysFailingProvider)).await;

    let item = call(
        &mut server,
        "create_item",
        serde_json::json!({ "type": "note", "title": "Xylophone marks the spot" }),
    )
    .await;

    let results = call(
        &mut server,
        "search_items",
        serde_json::json!({ "query": "xylophone" }),
    )
    .await;
    let ids: Vec<i64> = results.as_array().unwrap().iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert!(ids.contains(&item["id"].as_i64().unwrap()));
}

/// P3: deleting an item removes it from tags and outgoing relations.
#[tokio::test]
async fn p3_delete_cascades_tags_and_relations() {
    let (mut server, _dir) = new_server_with(Arc::new(NullEnrichmentProvider)).await;

    let a = call(
        &mut server,
        "create_item",
        serde_json::json!({ "type": "issue", "title": "A", "tags": ["keepme"] }),
    )
    .await;
    let b = call(&mut server, "create_item", serde_json::json!({ "type": "issue", "title": "B" })).await;
    call(
        &mut server,
        "add_relations",
        serde_json::json!({ "sourceId": a["id"], "targetIds": [b["id"]] }),
    )
    .await;

    let deleted = call(&mut server, "delete_item", serde_json::json!({ "id": a["id"] })).await;
    assert_eq!(deleted, serde_json::json!(true));

    let error = call_err(&mut server, "get_item", serde_json::json!({ "id": a["id"] })).await;
    assert_eq!(error["code"], "NotFound");

    let tags = call(&mut server, "get_tags", serde_json::json!({})).await;
    assert!(tags.as_array().unwrap().iter().all(|t| t["name"] != "keepme" || t["count"].as_i64().unwrap() == 0));
}

/// P6: relations are directed.
#[tokio::test]
async fn p6_relations_are_directed() {
    let (mut server, _dir) = new_server_with(Arc::new(NullEnrichmentProvider)).await;

    let a = call(&mut server, "create_item", serde_json::json!({ "type": "issue", "title": "A" })).await;
    let b = call(&mut server, "create_item", serde_json::json!({ "type": "issue", "title": "B" })).await;
    call(
        &mut server,
        "add_relations",
        serde_json::json!({ "sourceId": a["id"], "targetIds": [b["id"]] }),
    )
    .await;

    let related_b = call(&mut server, "get_related_items", serde_json::json!({ "id": b["id"] })).await;
    let manual_b: Vec<i64> = related_b["manual"].as_array().unwrap().iter().map(|i| i["id"].as_i64().unwrap()).collect();
    assert!(!manual_b.contains(&a["id"].as_i64().unwrap()));
}
