//! Tag / Keyword / Concept Indices (§4.3)
//!
//! Three parallel vocabularies sharing the same shape: a unique-name table
//! plus a many-to-many junction against `item`. All three use
//! *ensure-exists* semantics on write — inserting a new item with tag "bug"
//! creates the "bug" row if it doesn't exist yet, then links it.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CoreError, Result};

/// Which vocabulary table/junction pair to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabKind {
    Tag,
    Keyword,
    Concept,
}

impl VocabKind {
    fn table(self) -> &'static str {
        match self {
            VocabKind::Tag => "tag",
            VocabKind::Keyword => "keyword",
            VocabKind::Concept => "concept",
        }
    }

    fn junction(self) -> &'static str {
        match self {
            VocabKind::Tag => "item_tag",
            VocabKind::Keyword => "item_keyword",
            VocabKind::Concept => "item_concept",
        }
    }

    fn junction_fk(self) -> &'static str {
        match self {
            VocabKind::Tag => "tag_id",
            VocabKind::Keyword => "keyword_id",
            VocabKind::Concept => "concept_id",
        }
    }
}

/// Insert `name` if it doesn't already exist and return its id. A unique
/// constraint violation from a concurrent insert is treated as success: the
/// row already exists, so re-select and return its id (§4.3's "concurrent
/// duplicate inserts collapse via unique-name constraint and retry").
pub fn ensure_exists(conn: &Connection, kind: VocabKind, name: &str) -> Result<i64> {
    let table = kind.table();
    match conn.execute(
        &format!("INSERT INTO {table} (name) VALUES (?1)"),
        params![name],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            conn.query_row(
                &format!("SELECT id FROM {table} WHERE name = ?1"),
                params![name],
                |row| row.get(0),
            )
            .map_err(CoreError::from)
        }
        Err(e) => Err(e.into()),
    }
}

/// Ensure every name in `names` exists, returning their ids in the same order.
pub fn ensure_all_exist(conn: &Connection, kind: VocabKind, names: &[String]) -> Result<Vec<i64>> {
    names.iter().map(|n| ensure_exists(conn, kind, n)).collect()
}

/// Replace the junction rows linking `item_id` to `kind` with exactly
/// `ids`, clearing whatever was previously linked (§4.8 step 6: "Replace
/// (not merge)").
pub fn replace_links(conn: &Connection, kind: VocabKind, item_id: i64, ids: &[i64]) -> Result<()> {
    let junction = kind.junction();
    let fk = kind.junction_fk();
    conn.execute(
        &format!("DELETE FROM {junction} WHERE item_id = ?1"),
        params![item_id],
    )?;
    for id in ids {
        conn.execute(
            &format!("INSERT OR IGNORE INTO {junction} (item_id, {fk}) VALUES (?1, ?2)"),
            params![item_id, id],
        )?;
    }
    Ok(())
}

/// Replace the weighted junction rows (keywords/concepts carry a weight,
/// tags do not) for `item_id`.
pub fn replace_weighted_links(
    conn: &Connection,
    kind: VocabKind,
    item_id: i64,
    weighted: &[(i64, f32)],
) -> Result<()> {
    let junction = kind.junction();
    let fk = kind.junction_fk();
    conn.execute(
        &format!("DELETE FROM {junction} WHERE item_id = ?1"),
        params![item_id],
    )?;
    for (id, weight) in weighted {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {junction} (item_id, {fk}, weight) VALUES (?1, ?2, ?3)"
            ),
            params![item_id, id, weight],
        )?;
    }
    Ok(())
}

/// Rename a tag in place, remapping every junction row inside the caller's
/// transaction. Only tags are renamable per §4.3.
pub fn rename_tag(conn: &Connection, old_name: &str, new_name: &str) -> Result<()> {
    let affected = conn.execute(
        "UPDATE tag SET name = ?1 WHERE name = ?2",
        params![new_name, old_name],
    )?;
    if affected == 0 {
        return Err(CoreError::NotFound(format!("tag '{old_name}'")));
    }
    Ok(())
}

/// Delete a tag/keyword/concept. Refuses when usage count > 0 unless
/// `force` is set, in which case junctions are removed first (§4.3).
pub fn delete_vocab(conn: &Connection, kind: VocabKind, name: &str, force: bool) -> Result<()> {
    let table = kind.table();
    let junction = kind.junction();
    let fk = kind.junction_fk();

    let id: Option<i64> = conn
        .query_row(
            &format!("SELECT id FROM {table} WHERE name = ?1"),
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    let Some(id) = id else {
        return Err(CoreError::NotFound(format!("{table} '{name}'")));
    };

    let usage: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {junction} WHERE {fk} = ?1"),
        params![id],
        |row| row.get(0),
    )?;

    if usage > 0 && !force {
        return Err(CoreError::Conflict(format!(
            "{table} '{name}' is used by {usage} item(s); pass force=true to delete"
        )));
    }

    if usage > 0 {
        conn.execute(
            &format!("DELETE FROM {junction} WHERE {fk} = ?1"),
            params![id],
        )?;
    }
    conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])?;
    Ok(())
}

/// `(name, usage_count)` pairs for every tag, optionally filtered by a
/// case-insensitive name prefix and capped at `limit`.
pub fn get_tags(conn: &Connection, prefix: Option<&str>, limit: Option<i64>) -> Result<Vec<(String, i64)>> {
    let limit = limit.unwrap_or(i64::MAX);
    let sql = "SELECT t.name, COUNT(it.item_id) as usage_count
               FROM tag t
               LEFT JOIN item_tag it ON it.tag_id = t.id
               WHERE (?1 IS NULL OR t.name LIKE ?1 || '%')
               GROUP BY t.id
               ORDER BY usage_count DESC, t.name ASC
               LIMIT ?2";
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![prefix, limit], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(CoreError::from)
}

/// Sparse keyword-weight vector for an item, as `(keyword_id, weight)` pairs.
pub fn keyword_weights(conn: &Connection, item_id: i64) -> Result<Vec<(i64, f32)>> {
    let mut stmt =
        conn.prepare("SELECT keyword_id, weight FROM item_keyword WHERE item_id = ?1")?;
    let rows = stmt.query_map(params![item_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, f32>(1)?))
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(CoreError::from)
}

/// Weighted concept-label set for an item, as `(concept_id, weight)` pairs.
pub fn concept_weights(conn: &Connection, item_id: i64) -> Result<Vec<(i64, f32)>> {
    let mut stmt =
        conn.prepare("SELECT concept_id, weight FROM item_concept WHERE item_id = ?1")?;
    let rows = stmt.query_map(params![item_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, f32>(1)?))
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(CoreError::from)
}

/// Items sharing at least one tag/keyword/concept with `item_id` — the
/// vocabulary-junction candidate narrowing required by §4.7.3 so hybrid
/// search never degrades into a full table scan.
pub fn candidate_ids_sharing_vocab(conn: &Connection, item_id: i64) -> Result<Vec<i64>> {
    let sql = "SELECT DISTINCT other.item_id FROM (
                 SELECT it2.item_id FROM item_tag it1
                 JOIN item_tag it2 ON it2.tag_id = it1.tag_id
                 WHERE it1.item_id = ?1
                 UNION
                 SELECT ik2.item_id FROM item_keyword ik1
                 JOIN item_keyword ik2 ON ik2.keyword_id = ik1.keyword_id
                 WHERE ik1.item_id = ?1
                 UNION
                 SELECT ic2.item_id FROM item_concept ic1
                 JOIN item_concept ic2 ON ic2.concept_id = ic1.concept_id
                 WHERE ic1.item_id = ?1
               ) other
               WHERE other.item_id != ?1";
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![item_id], |row| row.get::<_, i64>(0))?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(CoreError::from)
}
