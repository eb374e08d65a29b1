//! Storage Engine (§4.1)
//!
//! Embedded SQLite-based item store: versioned migrations, a dual
//! reader/writer connection pool, and a single-transaction primitive that
//! every higher-level component (vocab, lexical index, embeddings,
//! relations, search, write pipeline, system state) builds on.

mod engine;
mod migrations;

pub use engine::{Storage, DEFAULT_EMBEDDING_DIM};
pub use migrations::{Migration, MIGRATIONS};
