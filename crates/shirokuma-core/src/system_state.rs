//! System State (§4.9)
//!
//! A mutable singleton describing the current working context, plus
//! checkpointed history entries cloned off it by name.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub id: i64,
    pub name: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Option<serde_json::Value>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn row_to_state(row: &rusqlite::Row<'_>) -> rusqlite::Result<SystemState> {
    let tags_json: Option<String> = row.get("tags")?;
    let metadata_json: Option<String> = row.get("metadata")?;
    Ok(SystemState {
        id: row.get("id")?,
        name: row.get("name")?,
        content: row.get("content")?,
        summary: row.get("summary")?,
        tags: tags_json
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        metadata: metadata_json.and_then(|s| serde_json::from_str(&s).ok()),
        is_active: row.get::<_, i64>("is_active")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

const STATE_SELECT: &str = "SELECT id, name, content, summary, tags, metadata, is_active, created_at, updated_at FROM system_state";

/// Return the active row, creating a default one on first call.
pub fn get_current_state(conn: &Connection) -> Result<SystemState> {
    let existing = conn
        .query_row(
            &format!("{STATE_SELECT} WHERE is_active = 1 ORDER BY id DESC LIMIT 1"),
            [],
            row_to_state,
        )
        .optional()?;

    if let Some(state) = existing {
        return Ok(state);
    }

    conn.execute(
        "INSERT INTO system_state (is_active, created_at, updated_at)
         VALUES (1, datetime('now'), datetime('now'))",
        [],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row(&format!("{STATE_SELECT} WHERE id = ?1"), params![id], row_to_state)
        .map_err(CoreError::from)
}

/// Replace the active row's mutable fields and bump `updated_at`.
pub fn update_current_state(
    conn: &Connection,
    content: Option<String>,
    tags: Option<Vec<String>>,
    metadata: Option<serde_json::Value>,
) -> Result<SystemState> {
    let current = get_current_state(conn)?;

    let tags_json = serde_json::to_string(&tags.unwrap_or(current.tags)).unwrap();
    let metadata_json = metadata
        .or(current.metadata)
        .map(|m| serde_json::to_string(&m).unwrap());
    let content = content.or(current.content);

    conn.execute(
        "UPDATE system_state SET content = ?1, tags = ?2, metadata = ?3, updated_at = datetime('now')
         WHERE id = ?4",
        params![content, tags_json, metadata_json, current.id],
    )?;

    conn.query_row(&format!("{STATE_SELECT} WHERE id = ?1"), params![current.id], row_to_state)
        .map_err(CoreError::from)
}

/// Clone the active row, mark the clone inactive, and retain it as a named
/// history entry.
pub fn checkpoint(conn: &Connection, name: &str) -> Result<SystemState> {
    let current = get_current_state(conn)?;

    conn.execute(
        "INSERT INTO system_state (name, content, summary, tags, metadata, is_active, created_at, updated_at)
         SELECT ?1, content, summary, tags, metadata, 0, datetime('now'), datetime('now')
         FROM system_state WHERE id = ?2",
        params![name, current.id],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row(&format!("{STATE_SELECT} WHERE id = ?1"), params![id], row_to_state)
        .map_err(CoreError::from)
}
