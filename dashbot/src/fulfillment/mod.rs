//! Asynchronous fulfillment of dashboard selections.
//!
//! A selection is acknowledged immediately, then fetched from Tableau and
//! uploaded to the chat channel in a background task. Progress is reported
//! through the selection's response sink.

mod pool;

use async_trait::async_trait;

use crate::error::RenderFetchError;

pub use pool::{FulfillmentPool, PoolLimits};

/// Produces the rendered image for a render key.
#[async_trait]
pub trait ViewRenderer: Send + Sync {
    async fn render(&self, render_key: &str) -> Result<Vec<u8>, RenderFetchError>;
}
