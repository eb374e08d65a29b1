//! Item repository: row <-> [`Item`] mapping and the read/delete operations
//! that don't belong to the write pipeline (§4.8) or search (§4.7).

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{CoreError, Result};
use crate::model::{Item, Priority};

fn parse_date(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_item(row: &Row<'_>, tags: Vec<String>, has_embedding: bool) -> rusqlite::Result<Item> {
    let priority_str: String = row.get("priority")?;
    let priority: Priority = priority_str.parse().unwrap_or_default();

    Ok(Item {
        id: row.get("id")?,
        item_type: row.get("item_type")?,
        title: row.get("title")?,
        description: row.get("description")?,
        content: row.get("content")?,
        status_id: row.get("status_id")?,
        status_name: row.get("status_name")?,
        priority,
        version: row.get("version")?,
        category: row.get("category")?,
        start_date: parse_date(row.get("start_date")?),
        end_date: parse_date(row.get("end_date")?),
        summary: row.get("summary")?,
        tags,
        has_embedding,
        created_at: parse_datetime(row.get("created_at")?),
        updated_at: parse_datetime(row.get("updated_at")?),
    })
}

const ITEM_SELECT: &str = "SELECT i.id, i.item_type, i.title, i.description, i.content,
           i.status_id, s.name as status_name, i.priority, i.version, i.category,
           i.start_date, i.end_date, i.summary, i.created_at, i.updated_at
    FROM item i JOIN status s ON s.id = i.status_id";

fn tags_for(conn: &Connection, item_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name FROM tag t JOIN item_tag it ON it.tag_id = t.id
         WHERE it.item_id = ?1 ORDER BY t.name ASC",
    )?;
    let rows = stmt.query_map(params![item_id], |row| row.get::<_, String>(0))?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(CoreError::from)
}

fn has_embedding(conn: &Connection, item_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM item_embedding WHERE item_id = ?1",
        params![item_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Load a single item by id, `NotFound` if missing.
pub fn get_item(conn: &Connection, id: i64) -> Result<Item> {
    let sql = format!("{ITEM_SELECT} WHERE i.id = ?1");
    let item = conn
        .query_row(&sql, params![id], |row| row_to_item(row, Vec::new(), false))
        .optional()?;
    let Some(mut item) = item else {
        return Err(CoreError::NotFound(format!("item {id}")));
    };
    item.tags = tags_for(conn, id)?;
    item.has_embedding = has_embedding(conn, id)?;
    Ok(item)
}

/// Sort key for `list_items` / `search_items` (§4.7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Created,
    Updated,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filter predicates shared by `list_items` and as a post-filter for
/// `search_items` (§4.7.1 / §4.7.2).
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub types: Vec<String>,
    pub statuses: Vec<String>,
    pub priorities: Vec<String>,
    pub tags: Vec<String>,
}

/// Pure relational filter + sort (§4.7.1).
pub fn list_items(
    conn: &Connection,
    filter: &ItemFilter,
    sort_by: SortBy,
    sort_order: SortOrder,
    limit: i64,
    offset: i64,
) -> Result<Vec<Item>> {
    let mut sql = ITEM_SELECT.to_string();
    let mut clauses = Vec::new();

    if !filter.types.is_empty() {
        let list = filter.types.iter().map(|t| format!("'{}'", t.replace('\'', "''"))).collect::<Vec<_>>().join(",");
        clauses.push(format!("i.item_type IN ({list})"));
    }
    if !filter.statuses.is_empty() {
        let list = filter.statuses.iter().map(|s| format!("'{}'", s.replace('\'', "''"))).collect::<Vec<_>>().join(",");
        clauses.push(format!("s.name IN ({list})"));
    }
    if !filter.priorities.is_empty() {
        let list = filter.priorities.iter().map(|p| format!("'{}'", p.replace('\'', "''"))).collect::<Vec<_>>().join(",");
        clauses.push(format!("i.priority IN ({list})"));
    }
    if !filter.tags.is_empty() {
        let list = filter.tags.iter().map(|t| format!("'{}'", t.replace('\'', "''"))).collect::<Vec<_>>().join(",");
        clauses.push(format!(
            "i.id IN (SELECT it.item_id FROM item_tag it JOIN tag t ON t.id = it.tag_id WHERE t.name IN ({list}))"
        ));
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let order_col = match sort_by {
        SortBy::Created => "i.created_at",
        SortBy::Updated => "i.updated_at",
        SortBy::Priority => "priority_rank",
    };
    let order_dir = match sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };

    if sort_by == SortBy::Priority {
        sql = format!(
            "SELECT * FROM (SELECT *, CASE priority
                WHEN 'CRITICAL' THEN 4 WHEN 'HIGH' THEN 3 WHEN 'MEDIUM' THEN 2
                WHEN 'LOW' THEN 1 WHEN 'MINIMAL' THEN 0 ELSE 2 END as priority_rank
             FROM ({sql}))"
        );
        sql.push_str(&format!(" ORDER BY priority_rank {order_dir}, id ASC LIMIT ?1 OFFSET ?2"));
    } else {
        sql.push_str(&format!(" ORDER BY {order_col} {order_dir}, i.id ASC LIMIT ?1 OFFSET ?2"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit, offset], |row| {
        row_to_item(row, Vec::new(), false)
    })?;

    let mut items = Vec::new();
    for row in rows {
        let mut item = row?;
        item.tags = tags_for(conn, item.id)?;
        item.has_embedding = has_embedding(conn, item.id)?;
        items.push(item);
    }
    Ok(items)
}

/// Load items by id, preserving the relative score ordering of `scored`
/// (id, score) pairs. Missing ids are silently skipped.
pub fn load_scored(conn: &Connection, scored: &[(i64, f32)]) -> Result<Vec<(Item, f32)>> {
    let mut out = Vec::with_capacity(scored.len());
    for (id, score) in scored {
        if let Ok(item) = get_item(conn, *id) {
            out.push((item, *score));
        }
    }
    Ok(out)
}

/// Delete an item. Junctions, relations, and the embedding row cascade via
/// `ON DELETE CASCADE` foreign keys (P3).
pub fn delete_item(conn: &Connection, id: i64) -> Result<bool> {
    let affected = conn.execute("DELETE FROM item WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

/// Resolve a status name to its id, `UnknownStatus` if it doesn't exist.
pub fn resolve_status_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM status WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| CoreError::UnknownStatus(name.to_string()))
}
