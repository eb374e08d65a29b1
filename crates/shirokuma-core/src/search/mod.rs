//! Search & Ranking (§4.7)
//!
//! The heart of the core: filtered listing, lexical search, and
//! related-items retrieval across four strategies, unified by a common
//! candidate-scoring pipeline and a single tie-break rule (score desc,
//! `updated_at` desc, id asc).

mod hybrid;

pub use hybrid::{linear_combination, reciprocal_rank_fusion, HybridWeights};

use rusqlite::Connection;
use std::collections::HashMap;

use crate::embeddings;
use crate::error::Result;
use crate::items::{self, ItemFilter, SortBy, SortOrder};
use crate::model::Item;
use crate::relations;
use crate::vocab;

/// Strategy for `get_related_items` / `find_similar_items` (§4.7.3/4.7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedStrategy {
    Keywords,
    Concepts,
    Embedding,
    Hybrid,
}

/// One computed related-item result.
#[derive(Debug, Clone)]
pub struct ScoredRelated {
    pub item: Item,
    pub score: f32,
    pub strategy: RelatedStrategy,
}

/// Split of manually-declared vs computed related items (§4.7.3).
#[derive(Debug, Clone, Default)]
pub struct RelatedItemsResult {
    pub manual: Vec<Item>,
    pub computed: Vec<ScoredRelated>,
}

/// `list(types?, statuses?, priorities?, tags?, sortBy, sortOrder, limit, offset)` (§4.7.1).
pub fn list(
    conn: &Connection,
    filter: &ItemFilter,
    sort_by: SortBy,
    sort_order: SortOrder,
    limit: i64,
    offset: i64,
) -> Result<Vec<Item>> {
    items::list_items(conn, filter, sort_by, sort_order, limit, offset)
}

/// `search(query, filters, limit)` (§4.7.2): lexical query intersected with
/// filter predicates, sorted by lexical score desc, tie-broken by
/// `updated_at` desc, id asc.
pub fn search(
    conn: &Connection,
    query: &str,
    filter: &ItemFilter,
    limit: i64,
) -> Result<Vec<(Item, f32)>> {
    let lexical_hits = crate::lexical::search(conn, query, None)?;
    if lexical_hits.is_empty() {
        return Ok(Vec::new());
    }

    let allowed_ids: std::collections::HashSet<i64> = if filter_is_empty(filter) {
        lexical_hits.iter().map(|(id, _)| *id).collect()
    } else {
        items::list_items(conn, filter, SortBy::Updated, SortOrder::Desc, i64::MAX, 0)?
            .into_iter()
            .map(|i| i.id)
            .collect()
    };

    let mut scored = items::load_scored(
        conn,
        &lexical_hits
            .into_iter()
            .filter(|(id, _)| allowed_ids.contains(id))
            .take(limit.max(0) as usize)
            .collect::<Vec<_>>(),
    )?;

    scored.sort_by(|(a_item, a_score), (b_item, b_score)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b_item.updated_at.cmp(&a_item.updated_at))
            .then_with(|| a_item.id.cmp(&b_item.id))
    });

    Ok(scored)
}

fn filter_is_empty(filter: &ItemFilter) -> bool {
    filter.types.is_empty()
        && filter.statuses.is_empty()
        && filter.priorities.is_empty()
        && filter.tags.is_empty()
}

/// Cosine similarity of sparse keyword-weight vectors, as a score in `[0, 1]`.
fn sparse_cosine(a: &[(i64, f32)], b: &[(i64, f32)]) -> f32 {
    let a_map: HashMap<i64, f32> = a.iter().cloned().collect();
    let b_map: HashMap<i64, f32> = b.iter().cloned().collect();

    let dot: f32 = a_map.iter().filter_map(|(k, v)| b_map.get(k).map(|w| v * w)).sum();
    let norm_a = a_map.values().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b_map.values().map(|v| v * v).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom > 0.0 {
        (dot / denom).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Weighted Jaccard of concept label sets: `Σ min(w_S, w_C)` over the union,
/// giving a score in `[0, 1]`.
fn weighted_jaccard(a: &[(i64, f32)], b: &[(i64, f32)]) -> f32 {
    let a_map: HashMap<i64, f32> = a.iter().cloned().collect();
    let b_map: HashMap<i64, f32> = b.iter().cloned().collect();

    let mut union: std::collections::HashSet<i64> = a_map.keys().cloned().collect();
    union.extend(b_map.keys().cloned());
    if union.is_empty() {
        return 0.0;
    }

    let mut min_sum = 0.0_f32;
    let mut max_sum = 0.0_f32;
    for id in &union {
        let wa = a_map.get(id).cloned().unwrap_or(0.0);
        let wb = b_map.get(id).cloned().unwrap_or(0.0);
        min_sum += wa.min(wb);
        max_sum += wa.max(wb);
    }

    if max_sum > 0.0 {
        (min_sum / max_sum).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Score every candidate against the seed under one sub-strategy.
fn score_candidates(
    conn: &Connection,
    seed_id: i64,
    candidates: &[i64],
    strategy: RelatedStrategy,
) -> Result<Vec<(i64, f32)>> {
    match strategy {
        RelatedStrategy::Keywords => {
            let seed = vocab::keyword_weights(conn, seed_id)?;
            candidates
                .iter()
                .map(|id| Ok((*id, sparse_cosine(&seed, &vocab::keyword_weights(conn, *id)?))))
                .collect()
        }
        RelatedStrategy::Concepts => {
            let seed = vocab::concept_weights(conn, seed_id)?;
            candidates
                .iter()
                .map(|id| Ok((*id, weighted_jaccard(&seed, &vocab::concept_weights(conn, *id)?))))
                .collect()
        }
        RelatedStrategy::Embedding => {
            let Some(seed_vec) = embeddings::get(conn, seed_id)? else {
                return Ok(candidates.iter().map(|id| (*id, 0.0)).collect());
            };
            candidates
                .iter()
                .map(|id| {
                    let score = embeddings::get(conn, *id)?
                        .map(|v| embeddings::cosine_similarity(&seed_vec, &v))
                        .unwrap_or(0.0);
                    Ok((*id, score.clamp(0.0, 1.0)))
                })
                .collect()
        }
        RelatedStrategy::Hybrid => unreachable!("hybrid is fused from the other three"),
    }
}

/// `get_related_items(id, strategy, weights?, depth?, limit?, includeRelations?)` (§4.7.3).
#[allow(clippy::too_many_arguments)]
pub fn related_items(
    conn: &Connection,
    seed_id: i64,
    strategy: RelatedStrategy,
    weights: HybridWeights,
    depth: u32,
    limit: usize,
    include_relations: bool,
) -> Result<RelatedItemsResult> {
    let manual_ids = relations::get_outgoing(conn, seed_id)?;
    let manual = manual_ids
        .iter()
        .filter_map(|id| items::get_item(conn, *id).ok())
        .collect();

    let mut candidates = vocab::candidate_ids_sharing_vocab(conn, seed_id)?;
    if include_relations {
        candidates.extend(relations::bfs(conn, seed_id, depth)?);
    }
    candidates.retain(|id| *id != seed_id);
    candidates.sort_unstable();
    candidates.dedup();

    let scored: Vec<(i64, f32)> = match strategy {
        RelatedStrategy::Keywords | RelatedStrategy::Concepts | RelatedStrategy::Embedding => {
            score_candidates(conn, seed_id, &candidates, strategy)?
        }
        RelatedStrategy::Hybrid => {
            let keywords = score_candidates(conn, seed_id, &candidates, RelatedStrategy::Keywords)?;
            let concepts = score_candidates(conn, seed_id, &candidates, RelatedStrategy::Concepts)?;
            let embedding = score_candidates(conn, seed_id, &candidates, RelatedStrategy::Embedding)?;
            linear_combination(&[
                (&keywords, weights.keywords),
                (&concepts, weights.concepts),
                (&embedding, weights.embedding),
            ])
        }
    };

    let mut loaded = items::load_scored(conn, &scored)?;
    loaded.sort_by(|(a_item, a_score), (b_item, b_score)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b_item.updated_at.cmp(&a_item.updated_at))
            .then_with(|| a_item.id.cmp(&b_item.id))
    });
    loaded.truncate(limit);

    let computed = loaded
        .into_iter()
        .map(|(item, score)| ScoredRelated { item, score, strategy })
        .collect();

    Ok(RelatedItemsResult { manual, computed })
}

/// `find_similar_items(id, limit)` — shorthand for `related` with strategy
/// `embedding` (§4.7.4).
pub fn find_similar(conn: &Connection, seed_id: i64, limit: usize) -> Result<Vec<(Item, f32)>> {
    let result = related_items(
        conn,
        seed_id,
        RelatedStrategy::Embedding,
        HybridWeights::default(),
        1,
        limit,
        false,
    )?;
    Ok(result.computed.into_iter().map(|r| (r.item, r.score)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use rusqlite::params;

    fn insert_item(conn: &Connection, title: &str) -> i64 {
        conn.execute(
            "INSERT INTO item (item_type, title, status_id, priority, created_at, updated_at)
             VALUES ('issue', ?1, 1, 'MEDIUM', datetime('now'), datetime('now'))",
            params![title],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn related_by_keywords_narrows_via_vocab_junction() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .transaction(|tx| {
                let a = insert_item(tx, "a");
                let b = insert_item(tx, "b");
                let unrelated = insert_item(tx, "c");
                let kw = vocab::ensure_exists(tx, vocab::VocabKind::Keyword, "login")?;
                vocab::replace_weighted_links(tx, vocab::VocabKind::Keyword, a, &[(kw, 1.0)])?;
                vocab::replace_weighted_links(tx, vocab::VocabKind::Keyword, b, &[(kw, 0.8)])?;
                let _ = unrelated;

                let result = related_items(
                    tx,
                    a,
                    RelatedStrategy::Keywords,
                    HybridWeights::default(),
                    1,
                    10,
                    false,
                )?;
                assert_eq!(result.computed.len(), 1);
                assert_eq!(result.computed[0].item.id, b);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn manual_relations_are_reported_separately_from_computed() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .transaction(|tx| {
                let a = insert_item(tx, "a");
                let b = insert_item(tx, "b");
                relations::add_relations(tx, a, &[b])?;

                let result = related_items(
                    tx,
                    a,
                    RelatedStrategy::Keywords,
                    HybridWeights::default(),
                    1,
                    10,
                    false,
                )?;
                assert_eq!(result.manual.len(), 1);
                assert_eq!(result.manual[0].id, b);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn hybrid_scores_stay_within_unit_bounds() {
        let storage = Storage::open_in_memory_with_dim(2).unwrap();
        storage
            .transaction(|tx| {
                let a = insert_item(tx, "a");
                let b = insert_item(tx, "b");
                let kw = vocab::ensure_exists(tx, vocab::VocabKind::Keyword, "login")?;
                vocab::replace_weighted_links(tx, vocab::VocabKind::Keyword, a, &[(kw, 1.0)])?;
                vocab::replace_weighted_links(tx, vocab::VocabKind::Keyword, b, &[(kw, 1.0)])?;
                embeddings::upsert(tx, a, &[1.0, 0.0], 2)?;
                embeddings::upsert(tx, b, &[0.9, 0.1], 2)?;

                let result = related_items(
                    tx,
                    a,
                    RelatedStrategy::Hybrid,
                    HybridWeights::default(),
                    1,
                    10,
                    false,
                )?;
                for r in &result.computed {
                    assert!(r.score >= 0.0 && r.score <= 1.0);
                }
                Ok(())
            })
            .unwrap();
    }
}
