//! `get_tags` (§4.3 / §6).

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use shirokuma_core::Storage;

use crate::protocol::types::JsonRpcError;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "prefix": {"type": "string"},
            "limit": {"type": "integer"}
        }
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GetTagsArgs {
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
}

pub async fn execute(storage: &Arc<Storage>, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args: GetTagsArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => GetTagsArgs::default(),
    };

    let tags = storage.with_reader(|conn| {
        shirokuma_core::vocab::get_tags(conn, args.prefix.as_deref(), args.limit)
    })?;

    let out: Vec<Value> = tags
        .into_iter()
        .map(|(name, count)| serde_json::json!({"name": name, "count": count}))
        .collect();
    Ok(serde_json::json!(out))
}
