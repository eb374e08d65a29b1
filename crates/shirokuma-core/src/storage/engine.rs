//! Storage Engine (§4.1)
//!
//! Embedded relational store providing ACID single-writer transactions. Owns
//! the schema, runs versioned migrations at startup, and exposes a
//! `transaction()` primitive every other component composes on top of.

use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{CoreError, Result};

/// Default embedding dimension, fixed at storage-init (§3).
pub const DEFAULT_EMBEDDING_DIM: usize = 128;

/// Main storage struct.
///
/// Uses separate reader/writer connections for interior mutability: every
/// method takes `&self`, so `Storage` is `Send + Sync` and usable behind a
/// bare `Arc<Storage>` without an outer mutex.
pub struct Storage {
    pub(crate) writer: Mutex<Connection>,
    pub(crate) reader: Mutex<Connection>,
    pub(crate) embedding_dim: usize,
}

impl Storage {
    fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA mmap_size = 134217728;",
        )
    }

    /// Resolve the database file path per §6's persisted-state-layout contract:
    /// explicit path, then `MCP_DATABASE_PATH`, then `.shirokuma/data` under
    /// the current working directory.
    pub fn resolve_db_path(db_path: Option<PathBuf>) -> std::io::Result<PathBuf> {
        let dir = match db_path {
            Some(p) => return Ok(p),
            None => match std::env::var("MCP_DATABASE_PATH") {
                Ok(v) if !v.is_empty() => PathBuf::from(v),
                _ => PathBuf::from(".shirokuma/data"),
            },
        };

        std::fs::create_dir_all(&dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(&dir, perms);
        }

        Ok(dir.join("shirokuma.db"))
    }

    /// Open (creating if necessary) the store at `db_path`, or the default
    /// location when `None`.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        Self::with_embedding_dim(db_path, DEFAULT_EMBEDDING_DIM)
    }

    pub fn with_embedding_dim(db_path: Option<PathBuf>, embedding_dim: usize) -> Result<Self> {
        let path = Self::resolve_db_path(db_path)?;

        let writer_conn = Connection::open(&path)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            embedding_dim,
        })
    }

    /// Open an in-memory store, primarily for tests. Writer and reader share
    /// the same named, cached in-memory database so both connections see the
    /// same schema and rows.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with_dim(DEFAULT_EMBEDDING_DIM)
    }

    pub fn open_in_memory_with_dim(embedding_dim: usize) -> Result<Self> {
        use rusqlite::OpenFlags;

        let uri = format!(
            "file:shirokuma-{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4()
        );
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let writer_conn = Connection::open_with_flags(&uri, flags)?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open_with_flags(&uri, flags)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            embedding_dim,
        })
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Run `f` inside a single write transaction. All multi-table mutations
    /// that together preserve invariants I1–I6 must go through here (§4.1).
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self
            .writer
            .lock()
            .map_err(|_| CoreError::StorageError("writer lock poisoned".into()))?;
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Borrow the reader connection for read-only queries outside a transaction.
    pub fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .reader
            .lock()
            .map_err(|_| CoreError::StorageError("reader lock poisoned".into()))?;
        f(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_and_migrates_in_memory_store() {
        let storage = Storage::open_in_memory().unwrap();
        assert_eq!(storage.embedding_dim(), DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn transaction_commits_writes() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .transaction(|tx| {
                tx.execute("INSERT INTO tag (name) VALUES ('bug')", [])?;
                Ok(())
            })
            .unwrap();

        let count: i64 = storage
            .with_reader(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM tag", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }
}
