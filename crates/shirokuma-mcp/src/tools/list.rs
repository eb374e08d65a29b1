//! `list_items` (§4.7.1 / §6).

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use shirokuma_core::{
    items::{ItemFilter, SortBy, SortOrder},
    ItemProjection, Storage,
};

use crate::protocol::types::JsonRpcError;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "types": {"type": "array", "items": {"type": "string"}},
            "statuses": {"type": "array", "items": {"type": "string"}},
            "priorities": {"type": "array", "items": {"type": "string"}},
            "tags": {"type": "array", "items": {"type": "string"}},
            "sortBy": {"type": "string", "enum": ["created", "updated", "priority"]},
            "sortOrder": {"type": "string", "enum": ["asc", "desc"]},
            "limit": {"type": "integer"},
            "offset": {"type": "integer"}
        }
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ListItemsArgs {
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    statuses: Vec<String>,
    #[serde(default)]
    priorities: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    sort_by: Option<String>,
    #[serde(default)]
    sort_order: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
}

pub async fn execute(storage: &Arc<Storage>, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args: ListItemsArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => ListItemsArgs::default(),
    };

    let filter = ItemFilter {
        types: args.types,
        statuses: args.statuses,
        priorities: args.priorities,
        tags: args.tags,
    };
    let sort_by = match args.sort_by.as_deref() {
        Some("priority") => SortBy::Priority,
        Some("created") => SortBy::Created,
        _ => SortBy::Updated,
    };
    let sort_order = match args.sort_order.as_deref() {
        Some("asc") => SortOrder::Asc,
        _ => SortOrder::Desc,
    };
    let limit = args.limit.unwrap_or(50);
    let offset = args.offset.unwrap_or(0);

    let items = storage.with_reader(|conn| {
        shirokuma_core::items::list_items(conn, &filter, sort_by, sort_order, limit, offset)
    })?;

    let projected: Vec<ItemProjection> = items.iter().map(ItemProjection::from).collect();
    Ok(serde_json::to_value(projected).unwrap())
}
