//! MCP Server Core
//!
//! Routes JSON-RPC requests to the 13 tools in §6, translating
//! `shirokuma_core` results into the wire protocol envelopes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolDescription, ToolResultContent,
};
use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
use crate::tools;
use shirokuma_core::enrichment::EnrichmentProvider;
use shirokuma_core::Storage;

/// MCP Server implementation
pub struct McpServer {
    storage: Arc<Storage>,
    enrichment: Arc<dyn EnrichmentProvider>,
    enrichment_timeout: Duration,
    initialized: bool,
}

impl McpServer {
    pub fn new(
        storage: Arc<Storage>,
        enrichment: Arc<dyn EnrichmentProvider>,
        enrichment_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            enrichment,
            enrichment_timeout,
            initialized: false,
        }
    }

    /// Handle an incoming JSON-RPC request
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Handling request: {}", request.method);

        if !self.initialized && request.method != "initialize" && request.method != "notifications/initialized" {
            warn!("Rejecting request '{}': server not initialized", request.method);
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::server_not_initialized(),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "notifications/initialized" => {
                return None;
            }
            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!("Unknown method: {}", method);
                Err(JsonRpcError::method_not_found())
            }
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    /// Handle initialize request
    async fn handle_initialize(
        &mut self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let request: InitializeRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => InitializeRequest::default(),
        };

        // Version negotiation: use client's version if older than server's.
        let negotiated_version = if request.protocol_version.as_str() < MCP_VERSION {
            info!("Client requested older protocol version {}, using it", request.protocol_version);
            request.protocol_version.clone()
        } else {
            MCP_VERSION.to_string()
        };

        self.initialized = true;
        info!("MCP session initialized with protocol version {}", negotiated_version);

        let result = InitializeResult {
            protocol_version: negotiated_version,
            server_info: ServerInfo {
                name: "shirokuma".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some({
                    let mut map = HashMap::new();
                    map.insert("listChanged".to_string(), serde_json::json!(false));
                    map
                }),
            },
            instructions: Some(
                "Shirokuma is a persistent item store with hybrid keyword/concept/embedding \
                 retrieval. Create items with create_item, search them with search_items, and \
                 use get_related_items / find_similar_items to navigate connections between \
                 them.".to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    /// Handle tools/list request
    async fn handle_tools_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let tools = vec![
            ToolDescription {
                name: "create_item".to_string(),
                description: Some("Create a new item in the store.".to_string()),
                input_schema: tools::items::create_schema(),
            },
            ToolDescription {
                name: "get_item".to_string(),
                description: Some("Fetch a single item by id.".to_string()),
                input_schema: tools::items::get_schema(),
            },
            ToolDescription {
                name: "update_item".to_string(),
                description: Some("Update fields on an existing item.".to_string()),
                input_schema: tools::items::update_schema(),
            },
            ToolDescription {
                name: "delete_item".to_string(),
                description: Some("Delete an item and its relations/junction rows.".to_string()),
                input_schema: tools::items::delete_schema(),
            },
            ToolDescription {
                name: "list_items".to_string(),
                description: Some("List items with type/status/priority/tag filters, sorted and paginated.".to_string()),
                input_schema: tools::list::schema(),
            },
            ToolDescription {
                name: "search_items".to_string(),
                description: Some("Keyword search over items, ranked by relevance.".to_string()),
                input_schema: tools::search::schema(),
            },
            ToolDescription {
                name: "get_related_items".to_string(),
                description: Some("Manual relations plus computed relations via keywords/concepts/embedding/hybrid strategies.".to_string()),
                input_schema: tools::related::related_schema(),
            },
            ToolDescription {
                name: "find_similar_items".to_string(),
                description: Some("Nearest items by dense embedding cosine similarity.".to_string()),
                input_schema: tools::related::find_similar_schema(),
            },
            ToolDescription {
                name: "add_relations".to_string(),
                description: Some("Add manual relation edges from one item to others.".to_string()),
                input_schema: tools::relations::schema(),
            },
            ToolDescription {
                name: "get_tags".to_string(),
                description: Some("List tags with usage counts, optionally filtered by prefix.".to_string()),
                input_schema: tools::tags::schema(),
            },
            ToolDescription {
                name: "get_stats".to_string(),
                description: Some("Aggregate counters over the item store.".to_string()),
                input_schema: tools::stats::schema(),
            },
            ToolDescription {
                name: "get_current_state".to_string(),
                description: Some("Fetch the singleton current-state record.".to_string()),
                input_schema: tools::state::get_schema(),
            },
            ToolDescription {
                name: "update_current_state".to_string(),
                description: Some("Update the singleton current-state record.".to_string()),
                input_schema: tools::state::update_schema(),
            },
        ];

        let result = ListToolsResult { tools };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    /// Handle tools/call request
    async fn handle_tools_call(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("Missing tool call parameters")),
        };

        let result = match request.name.as_str() {
            "create_item" => {
                tools::items::create(&self.storage, &self.enrichment, self.enrichment_timeout, request.arguments).await
            }
            "get_item" => tools::items::get(&self.storage, request.arguments).await,
            "update_item" => {
                tools::items::update(&self.storage, &self.enrichment, self.enrichment_timeout, request.arguments).await
            }
            "delete_item" => tools::items::delete(&self.storage, request.arguments).await,
            "list_items" => tools::list::execute(&self.storage, request.arguments).await,
            "search_items" => tools::search::execute(&self.storage, request.arguments).await,
            "get_related_items" => tools::related::get_related(&self.storage, request.arguments).await,
            "find_similar_items" => tools::related::find_similar(&self.storage, request.arguments).await,
            "add_relations" => tools::relations::execute(&self.storage, request.arguments).await,
            "get_tags" => tools::tags::execute(&self.storage, request.arguments).await,
            "get_stats" => tools::stats::execute(&self.storage, request.arguments).await,
            "get_current_state" => tools::state::get(&self.storage, request.arguments).await,
            "update_current_state" => tools::state::update(&self.storage, request.arguments).await,
            name => {
                return Err(JsonRpcError::method_not_found_with_message(&format!(
                    "Unknown tool: {}",
                    name
                )));
            }
        };

        let call_result = match result {
            Ok(content) => CallToolResult {
                content: vec![ToolResultContent {
                    content_type: "text".to_string(),
                    text: serde_json::to_string_pretty(&content).unwrap_or_else(|_| content.to_string()),
                }],
                is_error: Some(false),
            },
            Err(e) => return Err(e),
        };

        serde_json::to_value(call_result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shirokuma_core::enrichment::NullEnrichmentProvider;
    use tempfile::TempDir;

    async fn test_storage() -> (Arc<Storage>, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(Some(dir.path().join("test.db"))).unwrap();
        (Arc::new(storage), dir)
    }

    async fn test_server() -> (McpServer, TempDir) {
        let (storage, dir) = test_storage().await;
        let server = McpServer::new(storage, Arc::new(NullEnrichmentProvider), Duration::from_secs(1));
        (server, dir)
    }

    fn make_request(method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(serde_json::json!(1)),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn initialize_sets_initialized_flag() {
        let (mut server, _dir) = test_server().await;
        assert!(!server.initialized);

        let request = make_request(
            "initialize",
            Some(serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0.0" }
            })),
        );

        let response = server.handle_request(request).await.unwrap();
        assert!(response.result.is_some());
        assert!(response.error.is_none());
        assert!(server.initialized);
    }

    #[tokio::test]
    async fn initialize_returns_server_info() {
        let (mut server, _dir) = test_server().await;
        let params = serde_json::json!({
            "protocolVersion": MCP_VERSION,
            "capabilities": {},
            "clientInfo": { "name": "test", "version": "1.0" }
        });
        let request = make_request("initialize", Some(params));

        let response = server.handle_request(request).await.unwrap();
        let result = response.result.unwrap();

        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], "shirokuma");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn request_before_initialize_returns_error() {
        let (mut server, _dir) = test_server().await;

        let request = make_request("tools/list", None);
        let response = server.handle_request(request).await.unwrap();

        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, -32003);
    }

    #[tokio::test]
    async fn initialized_notification_returns_none() {
        let (mut server, _dir) = test_server().await;
        server.handle_request(make_request("initialize", None)).await;

        let response = server.handle_request(make_request("notifications/initialized", None)).await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn tools_list_returns_all_thirteen_tools() {
        let (mut server, _dir) = test_server().await;
        server.handle_request(make_request("initialize", None)).await;

        let response = server.handle_request(make_request("tools/list", None)).await.unwrap();
        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();

        assert_eq!(tools.len(), 13);
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        for expected in [
            "create_item",
            "get_item",
            "update_item",
            "delete_item",
            "list_items",
            "search_items",
            "get_related_items",
            "find_similar_items",
            "add_relations",
            "get_tags",
            "get_stats",
            "get_current_state",
            "update_current_state",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
    }

    #[tokio::test]
    async fn unknown_tool_returns_method_not_found() {
        let (mut server, _dir) = test_server().await;
        server.handle_request(make_request("initialize", None)).await;

        let request = make_request(
            "tools/call",
            Some(serde_json::json!({ "name": "nonexistent_tool", "arguments": {} })),
        );
        let response = server.handle_request(request).await.unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn create_then_get_round_trips_through_tool_layer() {
        let (mut server, _dir) = test_server().await;
        server.handle_request(make_request("initialize", None)).await;

        let create = make_request(
            "tools/call",
            Some(serde_json::json!({
                "name": "create_item",
                "arguments": { "type": "issue", "title": "Fix login" }
            })),
        );
        let response = server.handle_request(create).await.unwrap();
        assert!(response.error.is_none(), "{:?}", response.error);
        let result = response.result.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        let item: serde_json::Value = serde_json::from_str(text).unwrap();
        let id = item["id"].as_i64().unwrap();

        let get = make_request(
            "tools/call",
            Some(serde_json::json!({ "name": "get_item", "arguments": { "id": id } })),
        );
        let response = server.handle_request(get).await.unwrap();
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn get_item_unknown_id_surfaces_application_error() {
        let (mut server, _dir) = test_server().await;
        server.handle_request(make_request("initialize", None)).await;

        let request = make_request(
            "tools/call",
            Some(serde_json::json!({ "name": "get_item", "arguments": { "id": 999999 } })),
        );
        let response = server.handle_request(request).await.unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32002);
        assert_eq!(error.data.unwrap()["code"], "NotFound");
    }
}
