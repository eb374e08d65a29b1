//! `create_item` / `get_item` / `update_item` / `delete_item` (§6).

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use shirokuma_core::{
    enrichment::EnrichmentProvider, write_pipeline, CreateItemInput, ItemProjection, Storage,
    UpdateItemInput,
};

use crate::protocol::types::JsonRpcError;

pub fn create_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "type": {"type": "string", "description": "Item type, ^[a-z0-9_]+$"},
            "title": {"type": "string"},
            "description": {"type": "string"},
            "content": {"type": "string"},
            "status": {"type": "string"},
            "priority": {"type": "string", "enum": ["CRITICAL", "HIGH", "MEDIUM", "LOW", "MINIMAL"]},
            "tags": {"type": "array", "items": {"type": "string"}},
            "related": {"type": "array", "items": {"type": "integer"}},
            "version": {"type": "string"},
            "category": {"type": "string"},
            "startDate": {"type": "string", "description": "YYYY-MM-DD"},
            "endDate": {"type": "string", "description": "YYYY-MM-DD"}
        },
        "required": ["type", "title"]
    })
}

pub async fn create(
    storage: &Arc<Storage>,
    enrichment: &Arc<dyn EnrichmentProvider>,
    enrichment_timeout: Duration,
    args: Option<Value>,
) -> Result<Value, JsonRpcError> {
    let input: CreateItemInput = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => return Err(JsonRpcError::invalid_params("missing arguments")),
    };

    let item = write_pipeline::create_item(storage, input, enrichment.as_ref(), enrichment_timeout).await?;
    Ok(serde_json::to_value(ItemProjection::from(&item)).unwrap())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GetItemArgs {
    id: i64,
}

pub fn get_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {"id": {"type": "integer"}},
        "required": ["id"]
    })
}

pub async fn get(storage: &Arc<Storage>, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args: GetItemArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => return Err(JsonRpcError::invalid_params("missing arguments")),
    };
    let item = storage.with_reader(|conn| shirokuma_core::items::get_item(conn, args.id))?;
    Ok(serde_json::to_value(ItemProjection::from(&item)).unwrap())
}

pub fn update_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "type": {"type": "string"},
            "title": {"type": "string"},
            "description": {"type": ["string", "null"]},
            "content": {"type": ["string", "null"]},
            "status": {"type": "string"},
            "priority": {"type": "string"},
            "tags": {"type": "array", "items": {"type": "string"}},
            "related": {"type": "array", "items": {"type": "integer"}},
            "version": {"type": ["string", "null"]},
            "category": {"type": ["string", "null"]},
            "startDate": {"type": ["string", "null"]},
            "endDate": {"type": ["string", "null"]}
        },
        "required": ["id"]
    })
}

pub async fn update(
    storage: &Arc<Storage>,
    enrichment: &Arc<dyn EnrichmentProvider>,
    enrichment_timeout: Duration,
    args: Option<Value>,
) -> Result<Value, JsonRpcError> {
    let input: UpdateItemInput = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => return Err(JsonRpcError::invalid_params("missing arguments")),
    };

    let item = write_pipeline::update_item(storage, input, enrichment.as_ref(), enrichment_timeout).await?;
    Ok(serde_json::to_value(ItemProjection::from(&item)).unwrap())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DeleteItemArgs {
    id: i64,
}

pub fn delete_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {"id": {"type": "integer"}},
        "required": ["id"]
    })
}

pub async fn delete(storage: &Arc<Storage>, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args: DeleteItemArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => return Err(JsonRpcError::invalid_params("missing arguments")),
    };
    let deleted = storage.transaction(|tx| shirokuma_core::items::delete_item(tx, args.id))?;
    Ok(serde_json::json!(deleted))
}
