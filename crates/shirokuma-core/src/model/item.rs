//! The central stored entity and the create/update DTOs used at the write
//! boundary. Field shapes follow §3/§4.2 of the specification this engine
//! implements; the `deny_unknown_fields` DTO idiom and tri-state "absent vs
//! null" update field follow the pattern this codebase already uses for its
//! other ingest inputs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::priority::Priority;

/// A stored item. `embedding` and `search_index` are never serialized to API
/// responses (P7); callers get them stripped via [`Item::into_projection`].
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub item_type: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub status_id: i64,
    pub status_name: String,
    pub priority: Priority,
    pub version: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub has_embedding: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A nullable field that distinguishes "absent from payload" (`Absent`) from
/// "explicitly set to null" (`Null`) from "explicitly set to a value"
/// (`Value`). Required because `update_item` leaves absent fields untouched
/// but clears fields explicitly passed as `null` (§4.2).
#[derive(Debug, Clone, Default)]
pub enum Nullable<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Nullable<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Nullable::Absent)
    }
}

impl<'de, T> Deserialize<'de> for Nullable<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|opt| match opt {
            Some(v) => Nullable::Value(v),
            None => Nullable::Null,
        })
    }
}

fn default_nullable<T>() -> Nullable<T> {
    Nullable::Absent
}

/// Input payload for `create_item` (§6). Unknown fields are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateItemInput {
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related: Vec<i64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Input payload for `update_item` (§6). Every field is `Nullable` so the
/// write pipeline can tell "absent" apart from "set to null".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateItemInput {
    pub id: i64,
    #[serde(default = "default_nullable", rename = "type")]
    pub item_type: Nullable<String>,
    #[serde(default = "default_nullable")]
    pub title: Nullable<String>,
    #[serde(default = "default_nullable")]
    pub description: Nullable<String>,
    #[serde(default = "default_nullable")]
    pub content: Nullable<String>,
    #[serde(default = "default_nullable")]
    pub status: Nullable<String>,
    #[serde(default = "default_nullable")]
    pub priority: Nullable<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub related: Vec<i64>,
    #[serde(default = "default_nullable")]
    pub version: Nullable<String>,
    #[serde(default = "default_nullable")]
    pub category: Nullable<String>,
    #[serde(default = "default_nullable")]
    pub start_date: Nullable<String>,
    #[serde(default = "default_nullable")]
    pub end_date: Nullable<String>,
}

/// The wire projection of an `Item`: never carries `embedding` or
/// `search_index` (P7).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProjection {
    pub id: i64,
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub status: String,
    pub priority: String,
    pub version: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub has_embedding: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Item> for ItemProjection {
    fn from(item: &Item) -> Self {
        ItemProjection {
            id: item.id,
            item_type: item.item_type.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            content: item.content.clone(),
            status: item.status_name.clone(),
            priority: item.priority.to_string(),
            version: item.version.clone(),
            category: item.category.clone(),
            start_date: item.start_date.map(|d| d.to_string()),
            end_date: item.end_date.map(|d| d.to_string()),
            summary: item.summary.clone(),
            tags: item.tags.clone(),
            has_embedding: item.has_embedding,
            created_at: item.created_at.to_rfc3339(),
            updated_at: item.updated_at.to_rfc3339(),
        }
    }
}
