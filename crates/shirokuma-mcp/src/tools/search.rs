//! `search_items` (§4.7.2 / §6).

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use shirokuma_core::{items::ItemFilter, ItemProjection, Storage};

use crate::protocol::types::JsonRpcError;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {"type": "string"},
            "types": {"type": "array", "items": {"type": "string"}},
            "statuses": {"type": "array", "items": {"type": "string"}},
            "priorities": {"type": "array", "items": {"type": "string"}},
            "tags": {"type": "array", "items": {"type": "string"}},
            "limit": {"type": "integer"}
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SearchItemsArgs {
    query: String,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    statuses: Vec<String>,
    #[serde(default)]
    priorities: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    limit: Option<i64>,
}

pub async fn execute(storage: &Arc<Storage>, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args: SearchItemsArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => return Err(JsonRpcError::invalid_params("missing arguments")),
    };

    let filter = ItemFilter {
        types: args.types,
        statuses: args.statuses,
        priorities: args.priorities,
        tags: args.tags,
    };
    let limit = args.limit.unwrap_or(20);

    let results = storage.with_reader(|conn| {
        shirokuma_core::search::search(conn, &args.query, &filter, limit)
    })?;

    let out: Vec<Value> = results
        .into_iter()
        .map(|(item, score)| {
            let mut v = serde_json::to_value(ItemProjection::from(&item)).unwrap();
            v.as_object_mut().unwrap().insert("score".to_string(), serde_json::json!(score));
            v
        })
        .collect();
    Ok(serde_json::json!(out))
}
