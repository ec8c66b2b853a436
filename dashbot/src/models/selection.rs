//! Selection model: a user's pick from a presented dashboard list.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chat::ResponseSink;

/// Lifecycle state of a selection as it moves through fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentState {
    /// Acknowledged to the user, waiting for a worker slot.
    Accepted,
    /// Rendered image is being fetched from Tableau.
    Fetching,
    /// Image is being uploaded to the chat channel.
    Delivering,
    /// Image delivered and completion reported.
    Completed,
    /// Fetch or delivery failed; failure reported.
    Failed,
}

impl FulfillmentState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Fetching => "fetching",
            Self::Delivering => "delivering",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transitions can happen.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for FulfillmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request to render one catalog entry and deliver it to a channel.
///
/// Consumed exactly once by the fulfillment pool.
#[derive(Clone)]
pub struct SelectionRequest {
    /// Render key of the chosen entry.
    pub render_key: String,
    /// Channel the image is uploaded to.
    pub delivery_target: String,
    /// Where progress notices are sent.
    pub response_sink: Arc<dyn ResponseSink>,
}

impl SelectionRequest {
    pub fn new(
        render_key: impl Into<String>,
        delivery_target: impl Into<String>,
        response_sink: Arc<dyn ResponseSink>,
    ) -> Self {
        Self {
            render_key: render_key.into(),
            delivery_target: delivery_target.into(),
            response_sink,
        }
    }
}

impl std::fmt::Debug for SelectionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionRequest")
            .field("render_key", &self.render_key)
            .field("delivery_target", &self.delivery_target)
            .finish_non_exhaustive()
    }
}
