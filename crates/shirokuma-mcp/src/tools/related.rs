//! `get_related_items` / `find_similar_items` (§4.7.3 / §4.7.4 / §6).

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use shirokuma_core::{
    search::{self, HybridWeights, RelatedStrategy},
    ItemProjection, Storage,
};

use crate::protocol::types::JsonRpcError;

pub fn related_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "strategy": {"type": "string", "enum": ["keywords", "concepts", "embedding", "hybrid"]},
            "weights": {
                "type": "object",
                "properties": {
                    "keywords": {"type": "number"},
                    "concepts": {"type": "number"},
                    "embedding": {"type": "number"}
                }
            },
            "depth": {"type": "integer"},
            "limit": {"type": "integer"},
            "includeRelations": {"type": "boolean"}
        },
        "required": ["id"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct RelatedWeightsArgs {
    keywords: f32,
    concepts: f32,
    embedding: f32,
}

impl Default for RelatedWeightsArgs {
    fn default() -> Self {
        let d = HybridWeights::default();
        Self { keywords: d.keywords, concepts: d.concepts, embedding: d.embedding }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GetRelatedItemsArgs {
    id: i64,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    weights: Option<RelatedWeightsArgs>,
    #[serde(default)]
    depth: Option<u32>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    include_relations: Option<bool>,
}

fn parse_strategy(s: Option<&str>) -> RelatedStrategy {
    match s {
        Some("concepts") => RelatedStrategy::Concepts,
        Some("embedding") => RelatedStrategy::Embedding,
        Some("hybrid") => RelatedStrategy::Hybrid,
        _ => RelatedStrategy::Keywords,
    }
}

fn strategy_name(s: RelatedStrategy) -> &'static str {
    match s {
        RelatedStrategy::Keywords => "keywords",
        RelatedStrategy::Concepts => "concepts",
        RelatedStrategy::Embedding => "embedding",
        RelatedStrategy::Hybrid => "hybrid",
    }
}

pub async fn get_related(storage: &Arc<Storage>, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args: GetRelatedItemsArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => return Err(JsonRpcError::invalid_params("missing arguments")),
    };

    let strategy = parse_strategy(args.strategy.as_deref());
    let weights = args
        .weights
        .map(|w| HybridWeights { keywords: w.keywords, concepts: w.concepts, embedding: w.embedding })
        .unwrap_or_default();
    let depth = args.depth.unwrap_or(1);
    let limit = args.limit.unwrap_or(10);
    let include_relations = args.include_relations.unwrap_or(false);

    let result = storage.with_reader(|conn| {
        search::related_items(conn, args.id, strategy, weights, depth, limit, include_relations)
    })?;

    let manual: Vec<Value> = result.manual.iter().map(|i| serde_json::to_value(ItemProjection::from(i)).unwrap()).collect();
    let computed: Vec<Value> = result
        .computed
        .iter()
        .map(|r| {
            let mut v = serde_json::to_value(ItemProjection::from(&r.item)).unwrap();
            let obj = v.as_object_mut().unwrap();
            obj.insert("score".to_string(), serde_json::json!(r.score));
            obj.insert("strategy".to_string(), serde_json::json!(strategy_name(r.strategy)));
            v
        })
        .collect();

    Ok(serde_json::json!({"manual": manual, "computed": computed}))
}

pub fn find_similar_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "limit": {"type": "integer"}
        },
        "required": ["id"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FindSimilarArgs {
    id: i64,
    #[serde(default)]
    limit: Option<usize>,
}

pub async fn find_similar(storage: &Arc<Storage>, args: Option<Value>) -> Result<Value, JsonRpcError> {
    let args: FindSimilarArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
        None => return Err(JsonRpcError::invalid_params("missing arguments")),
    };
    let limit = args.limit.unwrap_or(10);

    let results = storage.with_reader(|conn| search::find_similar(conn, args.id, limit))?;
    let out: Vec<Value> = results
        .into_iter()
        .map(|(item, score)| {
            let mut v = serde_json::to_value(ItemProjection::from(&item)).unwrap();
            v.as_object_mut().unwrap().insert("score".to_string(), serde_json::json!(score));
            v
        })
        .collect();
    Ok(serde_json::json!(out))
}
