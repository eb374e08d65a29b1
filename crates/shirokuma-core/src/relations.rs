//! Relation Graph (§4.6)
//!
//! Directed edges between items, declared explicitly by callers (never
//! inferred). Used both as a first-class feature (`add_relations`,
//! `get_related_items` manual results) and as an optional candidate-set
//! expansion signal for §4.7.3's hybrid search.

use rusqlite::{params, Connection};
use std::collections::{HashSet, VecDeque};

use crate::error::{CoreError, Result};

fn item_exists(conn: &Connection, id: i64) -> Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM item WHERE id = ?1", params![id], |r| r.get(0))?;
    Ok(count > 0)
}

/// Insert `(source_id, t)` for each `t` in `target_ids`, all within the
/// caller's transaction. No-ops on duplicates; fails `UnknownItem` if any
/// endpoint is missing. Returns the count actually inserted.
pub fn add_relations(conn: &Connection, source_id: i64, target_ids: &[i64]) -> Result<u64> {
    if !item_exists(conn, source_id)? {
        return Err(CoreError::UnknownItem(source_id));
    }
    for target in target_ids {
        if !item_exists(conn, *target)? {
            return Err(CoreError::UnknownItem(*target));
        }
    }

    let mut inserted = 0u64;
    for target in target_ids {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO item_relation (source_id, target_id) VALUES (?1, ?2)",
            params![source_id, target],
        )?;
        inserted += changed as u64;
    }
    Ok(inserted)
}

/// Outgoing neighbor ids of `id`.
pub fn get_outgoing(conn: &Connection, id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT target_id FROM item_relation WHERE source_id = ?1 ORDER BY target_id ASC")?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, i64>(0))?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(CoreError::from)
}

/// Incoming neighbor ids of `id`.
pub fn get_incoming(conn: &Connection, id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT source_id FROM item_relation WHERE target_id = ?1 ORDER BY source_id ASC")?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, i64>(0))?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(CoreError::from)
}

/// Breadth-first traversal of outgoing edges up to `depth` hops,
/// deduplicated and excluding the seed itself.
pub fn bfs(conn: &Connection, id: i64, depth: u32) -> Result<Vec<i64>> {
    let mut visited = HashSet::new();
    visited.insert(id);
    let mut frontier = VecDeque::new();
    frontier.push_back((id, 0u32));
    let mut result = Vec::new();

    while let Some((current, d)) = frontier.pop_front() {
        if d >= depth {
            continue;
        }
        for next in get_outgoing(conn, current)? {
            if visited.insert(next) {
                result.push(next);
                frontier.push_back((next, d + 1));
            }
        }
    }

    Ok(result)
}
