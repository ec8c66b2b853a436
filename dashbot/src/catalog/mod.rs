//! In-memory dashboard catalog.
//!
//! The catalog is built once per load pass and never mutated in place.
//! [`CatalogStore`] hands readers an `Arc` snapshot, so a reload swaps the
//! whole catalog atomically.

mod loader;
mod search;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::CatalogEntry;

pub use loader::{load_all, ViewPage, ViewSource};
pub use search::{search, SearchResult};

/// Ordered sequence of entries, in the order the pages were fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub const fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether some entry renders under `render_key`.
    pub fn contains_render_key(&self, render_key: &str) -> bool {
        self.entries.iter().any(|entry| entry.render_key == render_key)
    }
}

/// Holder of the current catalog snapshot.
#[derive(Debug, Default)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Stays valid even if the store is replaced afterwards.
    pub async fn snapshot(&self) -> Arc<Catalog> {
        self.current.read().await.clone()
    }

    /// Swap in a freshly loaded catalog.
    pub async fn replace(&self, catalog: Catalog) {
        *self.current.write().await = Arc::new(catalog);
    }
}
