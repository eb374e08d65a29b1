//! Write Pipeline (§4.8)
//!
//! The orchestrator behind `create_item` and `update_item`. Enrichment is
//! the one step that suspends on external I/O, so it runs *before* the SQL
//! transaction opens; every other step — validation, vocab resolution,
//! persistence, junction replacement, lexical reindex, embedding upsert,
//! relation application — runs synchronously inside a single
//! [`crate::storage::Storage::transaction`] call. A failing or slow
//! enrichment call never blocks the write: its output degrades to empty and
//! the transaction commits anyway (§4.8, §5, P8).

use std::time::Duration;

use chrono::Utc;
use rusqlite::params;

use crate::enrichment::{EnrichmentOutput, EnrichmentProvider};
use crate::error::{CoreError, Result};
use crate::items;
use crate::lexical;
use crate::model::{
    normalize_tags, validate_date, validate_date_range, validate_priority, validate_title,
    validate_type, CreateItemInput, Item, Nullable, Priority, UpdateItemInput,
};
use crate::relations;
use crate::storage::Storage;
use crate::vocab::{self, VocabKind};

pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(30);

fn merged_text(title: &str, description: Option<&str>, content: Option<&str>) -> String {
    format!(
        "{} {} {}",
        title,
        description.unwrap_or_default(),
        content.unwrap_or_default()
    )
}

async fn run_enrichment(
    provider: &dyn EnrichmentProvider,
    text: &str,
    timeout: Duration,
) -> EnrichmentOutput {
    match tokio::time::timeout(timeout, provider.enrich(text)).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::warn!("enrichment capability errored, committing without it: {e}");
            EnrichmentOutput::default()
        }
        Err(_) => {
            tracing::warn!("enrichment capability timed out, committing without it");
            EnrichmentOutput::default()
        }
    }
}

/// Create a new item (§4.8, create path).
pub async fn create_item(
    storage: &Storage,
    input: CreateItemInput,
    enrichment: &dyn EnrichmentProvider,
    enrichment_timeout: Duration,
) -> Result<Item> {
    validate_type(&input.item_type)?;
    let title = validate_title(&input.title)?;
    let priority = match &input.priority {
        Some(p) => validate_priority(p)?,
        None => Priority::default(),
    };
    let start_date = input.start_date.as_deref().map(validate_date).transpose()?;
    let end_date = input.end_date.as_deref().map(validate_date).transpose()?;
    validate_date_range(start_date, end_date)?;
    let tags = normalize_tags(&input.tags);
    let status_name = input.status.clone().unwrap_or_else(|| "Open".to_string());

    let text = merged_text(&title, input.description.as_deref(), input.content.as_deref());
    let enrichment_output = run_enrichment(enrichment, &text, enrichment_timeout).await;

    let embedding_dim = storage.embedding_dim();

    storage.transaction(|tx| {
        let status_id = items::resolve_status_id(tx, &status_name)?;

        tx.execute(
            "INSERT INTO item (item_type, title, description, content, status_id, priority,
                version, category, start_date, end_date, summary, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
            params![
                input.item_type,
                title,
                input.description,
                input.content,
                status_id,
                priority.to_string(),
                input.version,
                input.category,
                start_date.map(|d| d.to_string()),
                end_date.map(|d| d.to_string()),
                enrichment_output.summary,
                Utc::now().to_rfc3339(),
            ],
        )?;
        let item_id = tx.last_insert_rowid();

        let tag_ids = vocab::ensure_all_exist(tx, VocabKind::Tag, &tags)?;
        vocab::replace_links(tx, VocabKind::Tag, item_id, &tag_ids)?;

        apply_keywords_and_concepts(tx, item_id, &enrichment_output)?;

        let lexical_text = format!(
            "{} {}",
            text,
            enrichment_output.summary.clone().unwrap_or_default()
        );
        lexical::reindex_item(tx, item_id, &lexical_text)?;

        if let Some(vector) = &enrichment_output.embedding {
            crate::embeddings::upsert(tx, item_id, vector, embedding_dim)?;
        }

        if !input.related.is_empty() {
            relations::add_relations(tx, item_id, &input.related)?;
        }

        items::get_item(tx, item_id)
    })
}

/// Update an existing item (§4.8, update path).
pub async fn update_item(
    storage: &Storage,
    input: UpdateItemInput,
    enrichment: &dyn EnrichmentProvider,
    enrichment_timeout: Duration,
) -> Result<Item> {
    let current = storage.with_reader(|conn| items::get_item(conn, input.id))?;

    let item_type = resolve_non_clearable(&input.item_type, &current.item_type, |v| {
        validate_type(v)?;
        Ok(v.clone())
    })?;
    let title = resolve_non_clearable(&input.title, &current.title, |v| validate_title(v))?;
    let priority = match &input.priority {
        Nullable::Value(p) => validate_priority(p)?,
        Nullable::Absent => current.priority,
        Nullable::Null => return Err(CoreError::InvalidPriority("priority cannot be null".into())),
    };
    let status_name = match &input.status {
        Nullable::Value(s) => s.clone(),
        Nullable::Absent => current.status_name.clone(),
        Nullable::Null => return Err(CoreError::UnknownStatus("null".into())),
    };

    let description = resolve_clearable(&input.description, current.description.clone());
    let content = resolve_clearable(&input.content, current.content.clone());
    let version = resolve_clearable(&input.version, current.version.clone());
    let category = resolve_clearable(&input.category, current.category.clone());

    let start_date = resolve_clearable_date(&input.start_date, current.start_date)?;
    let end_date = resolve_clearable_date(&input.end_date, current.end_date)?;
    validate_date_range(start_date, end_date)?;

    let tags = match &input.tags {
        Some(tags) => normalize_tags(tags),
        None => current.tags.clone(),
    };

    let text = merged_text(&title, description.as_deref(), content.as_deref());
    let enrichment_output = run_enrichment(enrichment, &text, enrichment_timeout).await;
    let embedding_dim = storage.embedding_dim();

    storage.transaction(|tx| {
        let status_id = items::resolve_status_id(tx, &status_name)?;

        tx.execute(
            "UPDATE item SET item_type = ?1, title = ?2, description = ?3, content = ?4,
                status_id = ?5, priority = ?6, version = ?7, category = ?8,
                start_date = ?9, end_date = ?10,
                summary = COALESCE(?11, summary), updated_at = ?12
             WHERE id = ?13",
            params![
                item_type,
                title,
                description,
                content,
                status_id,
                priority.to_string(),
                version,
                category,
                start_date.map(|d| d.to_string()),
                end_date.map(|d| d.to_string()),
                enrichment_output.summary,
                Utc::now().to_rfc3339(),
                input.id,
            ],
        )?;

        let tag_ids = vocab::ensure_all_exist(tx, VocabKind::Tag, &tags)?;
        vocab::replace_links(tx, VocabKind::Tag, input.id, &tag_ids)?;

        if !enrichment_output.keywords.is_empty() || !enrichment_output.concepts.is_empty() {
            apply_keywords_and_concepts(tx, input.id, &enrichment_output)?;
        }

        let lexical_text = format!(
            "{} {}",
            text,
            enrichment_output.summary.clone().unwrap_or_default()
        );
        lexical::reindex_item(tx, input.id, &lexical_text)?;

        if let Some(vector) = &enrichment_output.embedding {
            crate::embeddings::upsert(tx, input.id, vector, embedding_dim)?;
        }

        if !input.related.is_empty() {
            relations::add_relations(tx, input.id, &input.related)?;
        }

        items::get_item(tx, input.id)
    })
}

fn apply_keywords_and_concepts(
    conn: &rusqlite::Connection,
    item_id: i64,
    output: &EnrichmentOutput,
) -> Result<()> {
    let keyword_ids = output
        .keywords
        .iter()
        .map(|(name, weight)| Ok((vocab::ensure_exists(conn, VocabKind::Keyword, name)?, *weight)))
        .collect::<Result<Vec<_>>>()?;
    vocab::replace_weighted_links(conn, VocabKind::Keyword, item_id, &keyword_ids)?;

    let concept_ids = output
        .concepts
        .iter()
        .map(|(name, weight)| Ok((vocab::ensure_exists(conn, VocabKind::Concept, name)?, *weight)))
        .collect::<Result<Vec<_>>>()?;
    vocab::replace_weighted_links(conn, VocabKind::Concept, item_id, &concept_ids)?;

    Ok(())
}

/// For fields that cannot be cleared to null (type, title): absent keeps
/// the current value, a value is validated, an explicit null is an error.
fn resolve_non_clearable(
    field: &Nullable<String>,
    current: &str,
    validate: impl FnOnce(&String) -> Result<String>,
) -> Result<String> {
    match field {
        Nullable::Value(v) => validate(v),
        Nullable::Absent => Ok(current.to_string()),
        Nullable::Null => Err(CoreError::InvalidType("field cannot be cleared to null".into())),
    }
}

/// For fields that can be cleared to null (description, content, version,
/// category, summary): absent keeps current, null clears, value replaces.
fn resolve_clearable(field: &Nullable<String>, current: Option<String>) -> Option<String> {
    match field {
        Nullable::Value(v) => Some(v.clone()),
        Nullable::Null => None,
        Nullable::Absent => current,
    }
}

fn resolve_clearable_date(
    field: &Nullable<String>,
    current: Option<chrono::NaiveDate>,
) -> Result<Option<chrono::NaiveDate>> {
    match field {
        Nullable::Value(v) => Ok(Some(validate_date(v)?)),
        Nullable::Null => Ok(None),
        Nullable::Absent => Ok(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::NullEnrichmentProvider;

    fn create_input(title: &str, tags: Vec<&str>) -> CreateItemInput {
        CreateItemInput {
            item_type: "issue".into(),
            title: title.into(),
            description: None,
            content: None,
            status: None,
            priority: None,
            tags: tags.into_iter().map(str::to_string).collect(),
            related: Vec::new(),
            version: None,
            category: None,
            start_date: None,
            end_date: None,
        }
    }

    #[tokio::test]
    async fn create_normalizes_tags_and_defaults_status_and_priority() {
        let storage = Storage::open_in_memory().unwrap();
        let provider = NullEnrichmentProvider;
        let item = create_item(
            &storage,
            create_input("Fix login", vec!["Bug", "bug", "AUTH"]),
            &provider,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(item.tags, vec!["bug", "auth"]);
        assert_eq!(item.status_name, "Open");
        assert_eq!(item.priority, Priority::Medium);
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let storage = Storage::open_in_memory().unwrap();
        let provider = NullEnrichmentProvider;
        let created = create_item(
            &storage,
            create_input("Fix login", vec!["bug"]),
            &provider,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let update = UpdateItemInput {
            id: created.id,
            item_type: Nullable::Value("bug_fix".into()),
            title: Nullable::Absent,
            description: Nullable::Absent,
            content: Nullable::Absent,
            status: Nullable::Absent,
            priority: Nullable::Value("HIGH".into()),
            tags: None,
            related: Vec::new(),
            version: Nullable::Absent,
            category: Nullable::Absent,
            start_date: Nullable::Absent,
            end_date: Nullable::Absent,
        };

        let updated = update_item(&storage, update, &provider, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(updated.item_type, "bug_fix");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.title, "Fix login");
        assert_eq!(updated.tags, vec!["bug".to_string()]);
    }

    #[tokio::test]
    async fn rejected_type_update_fails_validation() {
        let storage = Storage::open_in_memory().unwrap();
        let provider = NullEnrichmentProvider;
        let created = create_item(
            &storage,
            create_input("Fix login", vec![]),
            &provider,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let update = UpdateItemInput {
            id: created.id,
            item_type: Nullable::Value("Bug Fix".into()),
            title: Nullable::Absent,
            description: Nullable::Absent,
            content: Nullable::Absent,
            status: Nullable::Absent,
            priority: Nullable::Absent,
            tags: None,
            related: Vec::new(),
            version: Nullable::Absent,
            category: Nullable::Absent,
            start_date: Nullable::Absent,
            end_date: Nullable::Absent,
        };

        let err = update_item(&storage, update, &provider, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidType(_)));
    }

    #[tokio::test]
    async fn enrichment_failure_still_commits_the_write() {
        let storage = Storage::open_in_memory().unwrap();
        let provider = crate::enrichment::AlwaysFailingProvider;
        let item = create_item(
            &storage,
            create_input("Fix login", vec![]),
            &provider,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let results = storage
            .with_reader(|conn| crate::lexical::search(conn, "login", None))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, item.id);
    }
}
