//! `get_current_state` / `update_current_state` (§4.9 / §6).

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use shirokuma_core::Storage;

use crate::protocol::types::JsonRpcError;

pub fn get_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

pub async fn get(storage: &Arc<Storage>, _args: Option<Value>) -> Result<Value, JsonRpcError> {
    let state = storage.transaction(|tx| shirokuma_core::system_state::get_current_state(tx))?;
    Ok(serde_json::to_value(state).unwrap())
}

pub fn update_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "content": {"type": "string"},
            "tags": {"type": "array", "items": {"type": "string"}},
            "metadata": {"type": "object"}
        }
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdateStateArgs {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    metadata: Option<Value>,
}

pub async fn update(storage: &Arc<Storage>, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args: UpdateStateArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => UpdateStateArgs::default(),
    };

    let state = storage.transaction(|tx| {
        shirokuma_core::system_state::update_current_state(tx, args.content, args.tags, args.metadata)
    })?;
    Ok(serde_json::to_value(state).unwrap())
}
