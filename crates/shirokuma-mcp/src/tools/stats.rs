//! `get_stats` (§6): aggregate counters over the item store.

use std::sync::Arc;

use serde_json::Value;
use shirokuma_core::Storage;

use crate::protocol::types::JsonRpcError;

pub fn schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

pub async fn execute(storage: &Arc<Storage>, _args: Option<Value>) -> Result<Value, JsonRpcError> {
    let stats = storage.with_reader(|conn| -> shirokuma_core::error::Result<Value> {
        let mut items_by_type = serde_json::Map::new();
        {
            let mut stmt = conn.prepare("SELECT item_type, COUNT(*) FROM item GROUP BY item_type")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
            for row in rows {
                let (item_type, count) = row?;
                items_by_type.insert(item_type, serde_json::json!(count));
            }
        }

        let total_items: i64 = conn.query_row("SELECT COUNT(*) FROM item", [], |r| r.get(0))?;
        let total_relations: i64 = conn.query_row("SELECT COUNT(*) FROM item_relation", [], |r| r.get(0))?;
        let total_tags: i64 = conn.query_row("SELECT COUNT(*) FROM tag", [], |r| r.get(0))?;
        let items_with_embedding: i64 =
            conn.query_row("SELECT COUNT(*) FROM item_embedding", [], |r| r.get(0))?;

        let avg_connections = if total_items > 0 {
            total_relations as f64 / total_items as f64
        } else {
            0.0
        };

        Ok(serde_json::json!({
            "totalItems": total_items,
            "itemsByType": items_by_type,
            "totalRelations": total_relations,
            "avgConnections": avg_connections,
            "totalTags": total_tags,
            "itemsWithEmbedding": items_with_embedding,
        }))
    })?;

    Ok(stats)
}
