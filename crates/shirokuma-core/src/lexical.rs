//! Lexical Index (§4.4)
//!
//! A tokenized, case-folded, accent-stripped inverted index over
//! `title || description || content || search_index`, scored with
//! logarithmic-TF / smoothed-IDF TF-IDF rather than SQLite FTS5/BM25 — the
//! index is a plain relational junction table (`lexical_term`) so scoring
//! stays explicit and testable.

use rusqlite::{params, Connection};
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;

const STOP_WORDS: &[&str] = &["the", "a", "an", "of", "to", "and", "or"];

/// Case-fold, strip accents (NFD then drop combining marks), split on
/// non-alphanumerics, and drop stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .filter(|t| !STOP_WORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F)
}

/// Rebuild the lexical index entry for one item (§4.8 step 7): delete any
/// prior terms, tokenize the concatenated text fields, and insert term
/// frequencies.
pub fn reindex_item(conn: &Connection, item_id: i64, text: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM lexical_term WHERE item_id = ?1",
        params![item_id],
    )?;

    let mut freq: HashMap<String, i64> = HashMap::new();
    for term in tokenize(text) {
        *freq.entry(term).or_default() += 1;
    }

    for (term, tf) in freq {
        conn.execute(
            "INSERT INTO lexical_term (item_id, term, term_frequency) VALUES (?1, ?2, ?3)",
            params![item_id, term, tf],
        )?;
    }
    Ok(())
}

/// Parsed query: a flat list of required terms (AND groups), optional terms
/// (OR groups), and exact phrases. §4.4 default connector is AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    pub and_terms: Vec<String>,
    pub or_terms: Vec<String>,
    pub phrases: Vec<String>,
}

/// Parse a query string into AND/OR terms and quoted phrases.
///
/// Grammar: whitespace-separated tokens; `OR` (case-insensitive, standalone)
/// switches the following bare term into the OR group; quoted `"..."` spans
/// are kept as a single phrase term. Everything else is an AND term.
pub fn parse_query(query: &str) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();
    let mut chars = query.trim().chars().peekable();
    let mut pending_or = false;

    while chars.peek().is_some() {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        if *chars.peek().unwrap() == '"' {
            chars.next();
            let mut phrase = String::new();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                phrase.push(c);
            }
            let normalized = tokenize(&phrase).join(" ");
            if !normalized.is_empty() {
                parsed.phrases.push(normalized);
            }
            pending_or = false;
            continue;
        }

        let mut word = String::new();
        while matches!(chars.peek(), Some(c) if !c.is_whitespace()) {
            word.push(chars.next().unwrap());
        }

        if word.eq_ignore_ascii_case("or") {
            pending_or = true;
            continue;
        }
        if word.eq_ignore_ascii_case("and") {
            pending_or = false;
            continue;
        }

        let tokens = tokenize(&word);
        for t in tokens {
            if pending_or {
                parsed.or_terms.push(t);
            } else {
                parsed.and_terms.push(t);
            }
        }
        pending_or = false;
    }

    parsed
}

/// Run a lexical query against the index, returning `(item_id, score)`
/// pairs with score max-normalized to `[0, 1]` across the result set. Empty
/// queries return no results (§4.4).
pub fn search(conn: &Connection, query: &str, candidate_ids: Option<&[i64]>) -> Result<Vec<(i64, f32)>> {
    let parsed = parse_query(query);
    if parsed.and_terms.is_empty() && parsed.or_terms.is_empty() && parsed.phrases.is_empty() {
        return Ok(Vec::new());
    }

    let total_items: i64 = conn.query_row("SELECT COUNT(*) FROM item", [], |r| r.get(0))?;
    if total_items == 0 {
        return Ok(Vec::new());
    }

    let all_terms: Vec<String> = parsed
        .and_terms
        .iter()
        .cloned()
        .chain(parsed.or_terms.iter().cloned())
        .chain(parsed.phrases.iter().flat_map(|p| p.split(' ').map(str::to_string)))
        .collect();

    let mut idf: HashMap<String, f32> = HashMap::new();
    for term in all_terms.iter().collect::<std::collections::HashSet<_>>() {
        let df: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT item_id) FROM lexical_term WHERE term = ?1",
            params![term],
            |r| r.get(0),
        )?;
        let smoothed = ((total_items as f32 + 1.0) / (df as f32 + 1.0)).ln() + 1.0;
        idf.insert(term.clone(), smoothed);
    }

    let mut matches: HashMap<i64, f32> = HashMap::new();
    let mut and_hits: HashMap<i64, std::collections::HashSet<String>> = HashMap::new();

    for term in &parsed.and_terms {
        let mut stmt = conn.prepare(
            "SELECT item_id, term_frequency FROM lexical_term WHERE term = ?1",
        )?;
        let rows = stmt.query_map(params![term], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (item_id, tf) = row?;
            if let Some(allowed) = candidate_ids {
                if !allowed.contains(&item_id) {
                    continue;
                }
            }
            let tf_weight = 1.0 + (tf as f32).ln();
            *matches.entry(item_id).or_default() += tf_weight * idf[term];
            and_hits.entry(item_id).or_default().insert(term.clone());
        }
    }

    // AND semantics: an item must contain every AND term.
    if !parsed.and_terms.is_empty() {
        let required: std::collections::HashSet<&String> = parsed.and_terms.iter().collect();
        matches.retain(|id, _| {
            and_hits
                .get(id)
                .map(|hits| required.iter().all(|t| hits.contains(*t)))
                .unwrap_or(false)
        });
    }

    for term in &parsed.or_terms {
        let mut stmt = conn.prepare(
            "SELECT item_id, term_frequency FROM lexical_term WHERE term = ?1",
        )?;
        let rows = stmt.query_map(params![term], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (item_id, tf) = row?;
            if let Some(allowed) = candidate_ids {
                if !allowed.contains(&item_id) {
                    continue;
                }
            }
            let tf_weight = 1.0 + (tf as f32).ln();
            *matches.entry(item_id).or_default() += tf_weight * idf[term];
        }
    }

    for phrase in &parsed.phrases {
        let words: Vec<&str> = phrase.split(' ').collect();
        let Some(first) = words.first() else { continue };
        let mut stmt = conn.prepare("SELECT item_id FROM lexical_term WHERE term = ?1")?;
        let candidate_rows = stmt.query_map(params![first], |row| row.get::<_, i64>(0))?;
        for row in candidate_rows {
            let item_id = row?;
            if let Some(allowed) = candidate_ids {
                if !allowed.contains(&item_id) {
                    continue;
                }
            }
            if phrase_present(conn, item_id, &words)? {
                let score: f32 = words
                    .iter()
                    .filter_map(|w| idf.get(*w))
                    .sum::<f32>()
                    .max(1.0);
                *matches.entry(item_id).or_default() += score;
            }
        }
    }

    if matches.is_empty() {
        return Ok(Vec::new());
    }

    let max_score = matches.values().cloned().fold(0.0_f32, f32::max).max(1e-6);
    let mut results: Vec<(i64, f32)> = matches
        .into_iter()
        .map(|(id, s)| (id, (s / max_score).clamp(0.0, 1.0)))
        .collect();
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    Ok(results)
}

/// Check whether every word of a phrase is indexed for the item. This index
/// stores term frequencies, not positions, so phrase matching here is
/// conservative (all-words-present) rather than exact-adjacency; acceptable
/// for the scoring baseline this index provides.
fn phrase_present(conn: &Connection, item_id: i64, words: &[&str]) -> Result<bool> {
    for w in words {
        let present: i64 = conn.query_row(
            "SELECT COUNT(*) FROM lexical_term WHERE item_id = ?1 AND term = ?2",
            params![item_id, w],
            |r| r.get(0),
        )?;
        if present == 0 {
            return Ok(false);
        }
    }
    Ok(true)
}
