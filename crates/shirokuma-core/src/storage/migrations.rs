//! Database Migrations
//!
//! Schema migration definitions for the storage layer (§4.1). Each entry is
//! a named, ordered, idempotent unit of SQL applied in a single batch; the
//! engine is forward-only and never downgrades a schema.

/// Migration definitions, applied strictly in version order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial item store schema: items, vocabularies, junctions, relations",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Lexical index table and supporting indices",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS status (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    is_closable INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO status (name, is_closable, sort_order) VALUES
    ('Open', 0, 0),
    ('Specification', 0, 1),
    ('Waiting', 0, 2),
    ('Ready', 0, 3),
    ('In Progress', 0, 4),
    ('Review', 0, 5),
    ('Testing', 0, 6),
    ('Pending', 0, 7),
    ('Completed', 1, 8),
    ('Closed', 1, 9),
    ('Canceled', 1, 10),
    ('Rejected', 1, 11);

CREATE TABLE IF NOT EXISTS item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_type TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    content TEXT,
    status_id INTEGER NOT NULL REFERENCES status(id),
    priority TEXT NOT NULL DEFAULT 'MEDIUM',
    version TEXT,
    category TEXT,
    start_date TEXT,
    end_date TEXT,
    summary TEXT,
    search_index TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_item_type ON item(item_type);
CREATE INDEX IF NOT EXISTS idx_item_status ON item(status_id);
CREATE INDEX IF NOT EXISTS idx_item_updated ON item(updated_at);
CREATE INDEX IF NOT EXISTS idx_item_created ON item(created_at);

CREATE TABLE IF NOT EXISTS tag (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS keyword (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS concept (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS item_tag (
    item_id INTEGER NOT NULL REFERENCES item(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tag(id),
    PRIMARY KEY (item_id, tag_id)
);
CREATE INDEX IF NOT EXISTS idx_item_tag_tag ON item_tag(tag_id);

CREATE TABLE IF NOT EXISTS item_keyword (
    item_id INTEGER NOT NULL REFERENCES item(id) ON DELETE CASCADE,
    keyword_id INTEGER NOT NULL REFERENCES keyword(id),
    weight REAL NOT NULL DEFAULT 1.0,
    PRIMARY KEY (item_id, keyword_id)
);
CREATE INDEX IF NOT EXISTS idx_item_keyword_keyword ON item_keyword(keyword_id);

CREATE TABLE IF NOT EXISTS item_concept (
    item_id INTEGER NOT NULL REFERENCES item(id) ON DELETE CASCADE,
    concept_id INTEGER NOT NULL REFERENCES concept(id),
    weight REAL NOT NULL DEFAULT 1.0,
    PRIMARY KEY (item_id, concept_id)
);
CREATE INDEX IF NOT EXISTS idx_item_concept_concept ON item_concept(concept_id);

CREATE TABLE IF NOT EXISTS item_relation (
    source_id INTEGER NOT NULL REFERENCES item(id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES item(id) ON DELETE CASCADE,
    PRIMARY KEY (source_id, target_id)
);
CREATE INDEX IF NOT EXISTS idx_item_relation_target ON item_relation(target_id);

CREATE TABLE IF NOT EXISTS item_embedding (
    item_id INTEGER PRIMARY KEY REFERENCES item(id) ON DELETE CASCADE,
    vector BLOB NOT NULL,
    dim INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS system_state (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    version TEXT,
    content TEXT,
    summary TEXT,
    metrics TEXT,
    context TEXT,
    checkpoint TEXT,
    related_items TEXT,
    tags TEXT,
    metadata TEXT,
    is_active INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS lexical_term (
    item_id INTEGER NOT NULL REFERENCES item(id) ON DELETE CASCADE,
    term TEXT NOT NULL,
    term_frequency INTEGER NOT NULL,
    PRIMARY KEY (item_id, term)
);
CREATE INDEX IF NOT EXISTS idx_lexical_term_term ON lexical_term(term);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (2, datetime('now'));
"#;

/// Get current schema version from database.
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations, in order, inside the caller's connection.
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL, applied_at TEXT NOT NULL);",
    )?;

    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn migrations_bring_fresh_db_to_latest_version() {
        let conn = Connection::open_in_memory().unwrap();
        let applied = apply_migrations(&conn).unwrap();
        assert_eq!(applied, MIGRATIONS.len() as u32);
        assert_eq!(
            get_current_version(&conn).unwrap(),
            MIGRATIONS.last().unwrap().version
        );
    }

    #[test]
    fn migrations_are_idempotent_when_rerun() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        let applied_again = apply_migrations(&conn).unwrap();
        assert_eq!(applied_again, 0);
    }

    #[test]
    fn bootstrap_statuses_are_seeded() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM status", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 12);
    }
}
