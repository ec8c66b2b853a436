//! Tableau integration: sign-in, catalog loading and view rendering.

mod client;
mod session;
mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::catalog::{load_all, search, CatalogStore, SearchResult};
use crate::error::{AuthError, CatalogLoadError, RenderFetchError};
use crate::fulfillment::ViewRenderer;
use crate::models::Session;

pub use client::{TableauClient, TableauConfig};
pub use session::SessionManager;

/// Facade over one Tableau server: session, catalog and renderer.
#[derive(Debug)]
pub struct TableauService {
    client: Arc<TableauClient>,
    sessions: SessionManager,
    catalog: CatalogStore,
}

impl TableauService {
    pub fn new(client: TableauClient) -> Self {
        let client = Arc::new(client);
        Self {
            sessions: SessionManager::new(Arc::clone(&client)),
            client,
            catalog: CatalogStore::new(),
        }
    }

    pub async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Arc<Session>, AuthError> {
        self.sessions.authenticate(login, password).await
    }

    /// Load every page of views and replace the catalog. Returns the entry count.
    pub async fn load_catalog(&self) -> Result<usize, CatalogLoadError> {
        let session = self
            .sessions
            .current()
            .await
            .ok_or(CatalogLoadError::NoSession)?;

        let catalog = load_all(self.client.as_ref(), &session).await?;
        let count = catalog.len();
        if catalog.is_empty() {
            warn!("Tableau reported no views, searches will find nothing");
        }
        self.catalog.replace(catalog).await;
        info!(views = count, "Catalog replaced");
        Ok(count)
    }

    pub async fn search(&self, query: &str, limit: usize) -> SearchResult {
        let snapshot = self.catalog.snapshot().await;
        search(&snapshot, query, limit)
    }

    /// Whether `render_key` belongs to a view in the current catalog.
    pub async fn knows_view(&self, render_key: &str) -> bool {
        self.catalog.snapshot().await.contains_render_key(render_key)
    }

    #[cfg(test)]
    pub const fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }
}

#[async_trait]
impl ViewRenderer for TableauService {
    async fn render(&self, render_key: &str) -> Result<Vec<u8>, RenderFetchError> {
        let session = self
            .sessions
            .current()
            .await
            .ok_or(RenderFetchError::NoSession)?;

        self.client
            .render_view(&session, render_key)
            .await
            .map_err(|cause| RenderFetchError::Request {
                render_key: render_key.to_string(),
                cause,
            })
    }
}
