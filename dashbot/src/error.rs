//! Error taxonomy for the Tableau and chat integrations.
//!
//! Startup errors (`AuthError`, `CatalogLoadError`) abort the process.
//! Per-request errors are caught at the fulfillment boundary and reported to
//! the user without affecting other work.

use reqwest::StatusCode;
use thiserror::Error;

/// Why a single outbound HTTP call failed.
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// Connection, timeout or body read error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Body could not be parsed.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Tableau sign-in failed.
#[derive(Debug, Error)]
#[error("tableau sign-in failed: {0}")]
pub struct AuthError(#[from] pub RequestFailure);

/// Initial catalog build failed. Pages already fetched are discarded.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("no tableau session; authenticate before loading the catalog")]
    NoSession,

    #[error("failed to fetch views page {page}: {cause}")]
    Page {
        page: u32,
        #[source]
        cause: RequestFailure,
    },

    #[error("views page {page} was empty after {received} of {total} reported views")]
    Inconsistent { page: u32, received: usize, total: u64 },
}

/// Fetching a rendered view image failed.
#[derive(Debug, Error)]
pub enum RenderFetchError {
    #[error("no tableau session; authenticate before rendering")]
    NoSession,

    #[error("failed to render view {render_key}: {cause}")]
    Request {
        render_key: String,
        #[source]
        cause: RequestFailure,
    },
}

/// Posting to the chat transport failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("chat request failed: {0}")]
    Request(#[from] RequestFailure),

    /// Slack answered 200 with `ok: false`.
    #[error("chat api error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(RequestFailure::Transport(err))
    }
}

/// Inbound interaction carried a verification token that does not match.
#[derive(Debug, Error)]
#[error("interaction verification token mismatch")]
pub struct AuthorizationError;

/// The fulfillment pool refused a selection.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("fulfillment pool is full ({limit} requests in flight)")]
    Busy { limit: usize },
}
