//! HTTP server receiving Slack callbacks.
//!
//! Endpoints:
//! - POST /events - Events API callbacks (`find` commands, URL verification)
//! - POST /interaction - Interactive message actions from the dashboard picker
//! - POST / - URL verification challenge

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::chat::{
    parse_command, results_text, Challenge, ChatTransport, Command, EventEnvelope, Interaction,
    Notice, ACTION_CANCEL, ACTION_SELECT, NO_RESULTS_TEXT,
};
use crate::error::{AuthorizationError, DeliveryError};
use crate::fulfillment::FulfillmentPool;
use crate::models::SelectionRequest;
use crate::tableau::TableauService;

/// Request-independent settings for the handlers.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Shared secret every callback must carry.
    pub verification_token: String,
    /// Bot user the `find` mention must address, when known.
    pub bot_id: Option<String>,
    /// Maximum number of dashboards offered per search.
    pub limit: usize,
}

/// Shared server state.
pub struct ServerState {
    tableau: Arc<TableauService>,
    chat: Arc<dyn ChatTransport>,
    pool: FulfillmentPool,
    settings: ServerSettings,
}

impl ServerState {
    pub fn new(
        tableau: Arc<TableauService>,
        chat: Arc<dyn ChatTransport>,
        pool: FulfillmentPool,
        settings: ServerSettings,
    ) -> Self {
        Self {
            tableau,
            chat,
            pool,
            settings,
        }
    }

    fn verify(&self, token: &str) -> Result<(), AuthorizationError> {
        let expected = self.settings.verification_token.as_bytes();
        if bool::from(token.as_bytes().ct_eq(expected)) {
            Ok(())
        } else {
            Err(AuthorizationError)
        }
    }
}

/// Errors that reject a single callback.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Unauthorized(#[from] AuthorizationError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        warn!(status = %status, error = %self, "Rejecting callback");
        (status, self.to_string()).into_response()
    }
}

/// Form body of `/interaction`.
#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", post(challenge_handler))
        .route("/events", post(events_handler))
        .route("/interaction", post(interaction_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server.
pub async fn start_server(port: u16, state: Arc<ServerState>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, "Server listening");
    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}

// === Handlers ===

async fn challenge_handler(Json(challenge): Json<Challenge>) -> String {
    challenge.challenge
}

async fn events_handler(
    State(state): State<Arc<ServerState>>,
    Json(envelope): Json<EventEnvelope>,
) -> Result<Response, ApiError> {
    match envelope {
        EventEnvelope::UrlVerification { challenge } => Ok(challenge.into_response()),
        EventEnvelope::EventCallback { token, event } => {
            state.verify(&token)?;

            if event.bot_id.is_some() {
                return Ok(StatusCode::OK.into_response());
            }

            match parse_command(&event.text, state.settings.bot_id.as_deref()) {
                Some(Command::Find { query }) => {
                    info!(
                        user = ?event.user,
                        channel = %event.channel,
                        %query,
                        "Finding dashboards"
                    );
                    if let Err(e) = find_and_respond(&state, &event.channel, &query).await {
                        error!(channel = %event.channel, error = %e, "Failed to answer search");
                    }
                }
                None => debug!(kind = %event.kind, "Ignoring message without command"),
            }
            Ok(StatusCode::OK.into_response())
        }
        EventEnvelope::Other => Ok(StatusCode::OK.into_response()),
    }
}

/// Search the catalog and post either the picker or a "no results" message.
async fn find_and_respond(
    state: &ServerState,
    channel: &str,
    query: &str,
) -> Result<(), DeliveryError> {
    let limit = state.settings.limit;
    let result = state.tableau.search(query, limit).await;

    if result.is_empty() {
        return state.chat.post_message(channel, NO_RESULTS_TEXT).await;
    }

    let text = results_text(result.truncated, limit);
    state
        .chat
        .post_view_list(channel, &text, &result.matches)
        .await
}

async fn interaction_handler(
    State(state): State<Arc<ServerState>>,
    Form(form): Form<InteractionForm>,
) -> Result<StatusCode, ApiError> {
    let interaction: Interaction = serde_json::from_str(&form.payload)
        .map_err(|e| ApiError::BadRequest(format!("invalid interaction payload: {e}")))?;
    state.verify(&interaction.token)?;

    let action = interaction
        .actions
        .first()
        .ok_or_else(|| ApiError::BadRequest("interaction has no actions".to_string()))?;

    match action.name.as_str() {
        ACTION_SELECT => {
            let option = action.selected_options.first().ok_or_else(|| {
                ApiError::BadRequest("select action without option".to_string())
            })?;
            let sink = state.chat.response_sink(&interaction.response_url);

            info!(
                channel = %interaction.channel.name,
                user_id = ?interaction.user.as_ref().map(|u| u.id.as_str()),
                user_name = ?interaction.user.as_ref().map(|u| u.name.as_str()),
                render_key = %option.value,
                "Dashboard selected"
            );

            // Only keys offered from the catalog may reach the render URL.
            if !state.tableau.knows_view(&option.value).await {
                warn!(render_key = %option.value, "Rejecting selection of unknown view");
                if let Err(e) = sink.notify(Notice::UnknownView).await {
                    warn!(error = %e, "Failed to report unknown view");
                }
                return Ok(StatusCode::OK);
            }

            let request =
                SelectionRequest::new(option.value.clone(), interaction.channel.id.clone(), sink);
            match state.pool.submit(request).await {
                Ok(handle) => {
                    debug!(
                        request_id = handle.id,
                        free_slots = state.pool.available_slots(),
                        "Selection handed to pool"
                    );
                    tokio::spawn(async move {
                        match handle.wait().await {
                            Ok(outcome) => {
                                let elapsed_ms =
                                    (outcome.finished_at - outcome.accepted_at).num_milliseconds();
                                if outcome.success() {
                                    debug!(request_id = outcome.id, elapsed_ms, "Selection done");
                                } else {
                                    warn!(
                                        request_id = outcome.id,
                                        render_key = %outcome.render_key,
                                        stage = ?outcome.failed_stage,
                                        error = ?outcome.error,
                                        elapsed_ms,
                                        "Selection failed"
                                    );
                                }
                            }
                            Err(e) => error!(error = %e, "Lost track of selection"),
                        }
                    });
                }
                Err(e) => warn!(error = %e, "Selection rejected"),
            }
        }
        ACTION_CANCEL => {
            let sink = state.chat.response_sink(&interaction.response_url);
            if let Err(e) = sink.notify(Notice::Cancelled).await {
                warn!(error = %e, "Failed to acknowledge cancellation");
            }
        }
        other => debug!(action = other, "Ignoring unknown action"),
    }

    Ok(StatusCode::OK)
}
