//! Embedding Store (§4.5)
//!
//! One row per item carrying a dense vector of fixed dimension. Similarity
//! is cosine; retrieval is a brute-force scan over all rows, the
//! spec-sanctioned baseline (no approximate index is carried here).

mod local;

pub use local::{cosine_similarity, euclidean_distance, from_bytes, to_bytes};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CoreError, Result};

/// Upsert the embedding row for `item_id`, rejecting dimension mismatches.
pub fn upsert(conn: &Connection, item_id: i64, vector: &[f32], expected_dim: usize) -> Result<()> {
    if vector.len() != expected_dim {
        return Err(CoreError::EmbeddingDimMismatch {
            expected: expected_dim,
            got: vector.len(),
        });
    }
    conn.execute(
        "INSERT INTO item_embedding (item_id, vector, dim) VALUES (?1, ?2, ?3)
         ON CONFLICT(item_id) DO UPDATE SET vector = excluded.vector, dim = excluded.dim",
        params![item_id, to_bytes(vector), vector.len() as i64],
    )?;
    Ok(())
}

/// Remove the embedding row for `item_id`, if any.
pub fn delete(conn: &Connection, item_id: i64) -> Result<()> {
    conn.execute("DELETE FROM item_embedding WHERE item_id = ?1", params![item_id])?;
    Ok(())
}

/// Fetch the embedding vector for a single item, if present.
pub fn get(conn: &Connection, item_id: i64) -> Result<Option<Vec<f32>>> {
    let blob: Option<Vec<u8>> = conn
        .query_row(
            "SELECT vector FROM item_embedding WHERE item_id = ?1",
            params![item_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(blob.and_then(|b| from_bytes(&b)))
}

/// Brute-force scan: cosine-similarity every stored vector against `query`,
/// excluding `exclude_id`, returning the top `limit` by score descending.
pub fn find_similar(
    conn: &Connection,
    query: &[f32],
    exclude_id: i64,
    limit: usize,
) -> Result<Vec<(i64, f32)>> {
    let mut stmt = conn.prepare("SELECT item_id, vector FROM item_embedding WHERE item_id != ?1")?;
    let rows = stmt.query_map(params![exclude_id], |row| {
        let id: i64 = row.get(0)?;
        let blob: Vec<u8> = row.get(1)?;
        Ok((id, blob))
    })?;

    let mut scored = Vec::new();
    for row in rows {
        let (id, blob) = row?;
        if let Some(vector) = from_bytes(&blob) {
            scored.push((id, cosine_similarity(query, &vector)));
        }
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    Ok(scored)
}
