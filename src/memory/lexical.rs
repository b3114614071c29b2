//! Keyword relevance ranking for the local store.
//!
//! The local file has no embeddings, so retrieval is a plain term-overlap
//! count: each distinct query term found in an entry adds one point.

use std::collections::BTreeSet;

/// Split text into lowercase alphanumeric terms, deduplicated.
pub fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Number of distinct `query_terms` that occur as terms of `entry`.
pub fn score(query_terms: &BTreeSet<String>, entry: &str) -> usize {
    let entry_terms = terms(entry);
    query_terms
        .iter()
        .filter(|t| entry_terms.contains(t.as_str()))
        .count()
}

/// Rank `entries` (oldest first) against `query`.
///
/// Returns at most `limit` entries ordered by score descending, newest first
/// on ties. Zero-score entries are dropped. A query without terms yields the
/// newest `limit` entries.
pub fn rank(entries: &[String], query: &str, limit: usize) -> Vec<String> {
    let query_terms = terms(query);

    if query_terms.is_empty() {
        return entries.iter().rev().take(limit).cloned().collect();
    }

    let mut scored: Vec<(usize, usize, &String)> = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| (score(&query_terms, entry), idx, entry))
        .filter(|(score, _, _)| *score > 0)
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, _, entry)| entry.clone())
        .collect()
}
