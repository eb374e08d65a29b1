//! # Shirokuma Core
//!
//! An embedded item store and hybrid retrieval engine: structured items
//! with normalized tag/keyword/concept vocabularies, a lexical (TF-IDF)
//! index, a brute-force dense-embedding store, an explicit relation graph,
//! and search that fuses all three into ranked related-item candidates.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use shirokuma_core::{CreateItemInput, Storage, enrichment::NullEnrichmentProvider, write_pipeline};
//! use std::time::Duration;
//!
//! # async fn run() -> shirokuma_core::error::Result<()> {
//! let storage = Storage::new(None)?;
//! let input = CreateItemInput {
//!     item_type: "issue".to_string(),
//!     title: "Fix login".to_string(),
//!     description: None,
//!     content: None,
//!     status: None,
//!     priority: None,
//!     tags: vec!["bug".to_string()],
//!     related: vec![],
//!     version: None,
//!     category: None,
//!     start_date: None,
//!     end_date: None,
//! };
//! let provider = NullEnrichmentProvider;
//! let item = write_pipeline::create_item(&storage, input, &provider, Duration::from_secs(30)).await?;
//! assert_eq!(item.status_name, "Open");
//! # Ok(())
//! # }
//! ```

pub mod embeddings;
pub mod enrichment;
pub mod error;
pub mod items;
pub mod lexical;
pub mod model;
pub mod relations;
pub mod search;
pub mod storage;
pub mod system_state;
pub mod vocab;
pub mod write_pipeline;

pub use error::{CoreError, Result};
pub use items::{ItemFilter, SortBy, SortOrder};
pub use model::{CreateItemInput, Item, ItemProjection, Nullable, Priority, UpdateItemInput};
pub use storage::{Storage, DEFAULT_EMBEDDING_DIM};

/// Crate version, surfaced through `get_stats` / server metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use crate::enrichment::{EnrichmentOutput, EnrichmentProvider, NullEnrichmentProvider};
    pub use crate::error::{CoreError, Result};
    pub use crate::items::{ItemFilter, SortBy, SortOrder};
    pub use crate::model::{CreateItemInput, Item, ItemProjection, Nullable, Priority, UpdateItemInput};
    pub use crate::search::{RelatedItemsResult, RelatedStrategy};
    pub use crate::storage::Storage;
}
