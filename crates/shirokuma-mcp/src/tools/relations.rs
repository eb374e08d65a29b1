//! `add_relations` (§4.6 / §6).

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use shirokuma_core::Storage;

use crate::protocol::types::JsonRpcError;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "sourceId": {"type": "integer"},
            "targetIds": {"type": "array", "items": {"type": "integer"}}
        },
        "required": ["sourceId", "targetIds"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AddRelationsArgs {
    source_id: i64,
    target_ids: Vec<i64>,
}

pub async fn execute(storage: &Arc<Storage>, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args: AddRelationsArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => return Err(JsonRpcError::invalid_params("missing arguments")),
    };

    let inserted = storage.transaction(|tx| {
        shirokuma_core::relations::add_relations(tx, args.source_id, &args.target_ids)
    })?;
    Ok(serde_json::json!({"inserted": inserted}))
}
