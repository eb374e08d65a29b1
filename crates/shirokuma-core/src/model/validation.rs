//! Item payload validation (§4.2).

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::CoreError;
use crate::error::Result;

use super::priority::Priority;

static TYPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-z0-9_]+$").expect("static regex is valid"));

pub fn validate_type(item_type: &str) -> Result<()> {
    if TYPE_PATTERN.is_match(item_type) {
        Ok(())
    } else {
        Err(CoreError::InvalidType(item_type.to_string()))
    }
}

pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(CoreError::InvalidType("title must not be empty".into()))
    } else if trimmed.chars().count() > 512 {
        Err(CoreError::InvalidType("title exceeds 512 characters".into()))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn validate_priority(priority: &str) -> Result<Priority> {
    priority.parse()
}

pub fn validate_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidDate(date.to_string()))
}

pub fn validate_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(CoreError::InvalidDate(format!(
                "start_date {s} is after end_date {e}"
            )));
        }
    }
    Ok(())
}

/// Lowercase, trim, and dedupe tags while preserving first-seen order (§4.2).
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let normalized = tag.trim().to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }
    out
}
