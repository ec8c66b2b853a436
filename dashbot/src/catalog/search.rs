//! Substring search over the catalog.

use crate::models::CatalogEntry;

use super::Catalog;

/// Matches for one query, capped at the configured limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Matches in catalog order.
    pub matches: Vec<CatalogEntry>,
    /// The cap was reached. More matches may or may not exist; callers cannot
    /// tell "exactly `limit`" apart from "more than `limit`".
    pub truncated: bool,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Case-insensitive substring match of `query` against display names.
///
/// Scanning stops as soon as `limit` matches have been collected.
pub fn search(catalog: &Catalog, query: &str, limit: usize) -> SearchResult {
    let needle = query.to_lowercase();
    let matches: Vec<CatalogEntry> = catalog
        .iter()
        .filter(|entry| entry.display_name.to_lowercase().contains(&needle))
        .take(limit)
        .cloned()
        .collect();
    let truncated = matches.len() >= limit;

    SearchResult { matches, truncated }
}
