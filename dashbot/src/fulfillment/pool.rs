//! Bounded pool for fulfilling selections.
//!
//! Each accepted selection runs as its own task. `max_concurrent` limits how
//! many fetch and deliver at once; the rest wait for a slot. `max_pending`
//! caps everything in flight (running plus waiting) and selections beyond it
//! are rejected.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{error, info, warn};

use crate::chat::{ChatTransport, Notice, ResponseSink};
use crate::error::AdmissionError;
use crate::models::{FulfillmentState, SelectionRequest};

use super::ViewRenderer;

/// Identifier assigned to each accepted selection.
pub type FulfillmentId = usize;

/// File name used for uploaded dashboard images.
pub const IMAGE_FILE_NAME: &str = "TableauDashboard.png";

/// Concurrency and admission bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    /// Selections fetching or delivering at the same time.
    pub max_concurrent: usize,
    /// Selections in flight, running or waiting, before new ones are rejected.
    pub max_pending: usize,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_pending: 32,
        }
    }
}

/// Terminal result of one selection.
#[derive(Debug, Clone)]
pub struct FulfillmentOutcome {
    pub id: FulfillmentId,
    pub render_key: String,
    /// `Completed` or `Failed`.
    pub state: FulfillmentState,
    /// Stage that failed, when `state` is `Failed`.
    pub failed_stage: Option<FulfillmentState>,
    pub error: Option<String>,
    pub accepted_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl FulfillmentOutcome {
    pub fn success(&self) -> bool {
        self.state == FulfillmentState::Completed
    }
}

/// Handle to an accepted selection.
#[derive(Debug)]
pub struct FulfillmentHandle {
    pub id: FulfillmentId,
    result_rx: oneshot::Receiver<FulfillmentOutcome>,
}

impl FulfillmentHandle {
    /// Wait for the selection to reach a terminal state.
    pub async fn wait(self) -> Result<FulfillmentOutcome> {
        self.result_rx
            .await
            .context("Fulfillment task was dropped before completion")
    }
}

/// State transitions published by the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentEvent {
    Accepted { id: FulfillmentId },
    Fetching { id: FulfillmentId },
    Delivering { id: FulfillmentId, bytes: usize },
    Completed { id: FulfillmentId },
    Failed {
        id: FulfillmentId,
        stage: FulfillmentState,
        error: String,
    },
}

/// Runs selections from acceptance to delivery.
pub struct FulfillmentPool {
    renderer: Arc<dyn ViewRenderer>,
    transport: Arc<dyn ChatTransport>,

    /// Slots for selections actively fetching or delivering.
    semaphore: Arc<Semaphore>,

    /// Slots for every selection in flight.
    admission: Arc<Semaphore>,

    limits: PoolLimits,

    next_id: AtomicUsize,

    event_tx: Option<mpsc::Sender<FulfillmentEvent>>,
}

impl FulfillmentPool {
    pub fn new(
        renderer: Arc<dyn ViewRenderer>,
        transport: Arc<dyn ChatTransport>,
        limits: PoolLimits,
    ) -> Self {
        Self {
            renderer,
            transport,
            semaphore: Arc::new(Semaphore::new(limits.max_concurrent)),
            admission: Arc::new(Semaphore::new(limits.max_pending)),
            limits,
            next_id: AtomicUsize::new(0),
            event_tx: None,
        }
    }

    /// Create a pool with an event channel for monitoring all selections.
    pub fn with_events(
        renderer: Arc<dyn ViewRenderer>,
        transport: Arc<dyn ChatTransport>,
        limits: PoolLimits,
    ) -> (Self, mpsc::Receiver<FulfillmentEvent>) {
        let (tx, rx) = mpsc::channel(1000);
        let mut pool = Self::new(renderer, transport, limits);
        pool.event_tx = Some(tx);
        (pool, rx)
    }

    /// Accept a selection and start fulfilling it in the background.
    ///
    /// The acknowledgment is sent before this returns. Rendering and upload
    /// happen in a spawned task whose outcome is available via the handle.
    pub async fn submit(
        &self,
        request: SelectionRequest,
    ) -> Result<FulfillmentHandle, AdmissionError> {
        let Ok(admission) = Arc::clone(&self.admission).try_acquire_owned() else {
            warn!(
                render_key = %request.render_key,
                limit = self.limits.max_pending,
                "Rejecting selection, fulfillment pool is full"
            );
            report(request.response_sink.as_ref(), Notice::Busy).await;
            return Err(AdmissionError::Busy {
                limit: self.limits.max_pending,
            });
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let accepted_at = Utc::now();
        info!(
            request_id = id,
            render_key = %request.render_key,
            channel = %request.delivery_target,
            "Selection accepted"
        );

        report(request.response_sink.as_ref(), Notice::Accepted).await;
        emit(self.event_tx.as_ref(), FulfillmentEvent::Accepted { id }).await;

        let (result_tx, result_rx) = oneshot::channel();
        let semaphore = Arc::clone(&self.semaphore);
        let job = Arc::new(Job {
            id,
            accepted_at,
            request,
            renderer: Arc::clone(&self.renderer),
            transport: Arc::clone(&self.transport),
            event_tx: self.event_tx.clone(),
            delivering: AtomicBool::new(false),
        });

        tokio::spawn(async move {
            // Waits if at capacity
            let permit = semaphore.acquire_owned().await;

            // A panicking renderer or transport must still end in a failure notice.
            let runner = Arc::clone(&job);
            let outcome = match tokio::spawn(async move { runner.run().await }).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let stage = job.stage();
                    error!(request_id = id, %stage, error = %e, "Fulfillment task aborted");
                    job.fail(stage, format!("fulfillment task aborted: {e}")).await
                }
            };

            debug_assert!(outcome.state.is_terminal());

            // Free both slots before anyone observes the outcome.
            drop(permit);
            drop(admission);
            let _ = result_tx.send(outcome);
        });

        Ok(FulfillmentHandle { id, result_rx })
    }

    /// Selections that can still be admitted.
    pub fn available_slots(&self) -> usize {
        self.admission.available_permits()
    }

    pub const fn limits(&self) -> PoolLimits {
        self.limits
    }
}

/// One accepted selection on its way to a terminal state.
struct Job {
    id: FulfillmentId,
    accepted_at: DateTime<Utc>,
    request: SelectionRequest,
    renderer: Arc<dyn ViewRenderer>,
    transport: Arc<dyn ChatTransport>,
    event_tx: Option<mpsc::Sender<FulfillmentEvent>>,
    /// Set once the image is fetched and the upload starts.
    delivering: AtomicBool,
}

impl Job {
    fn stage(&self) -> FulfillmentState {
        if self.delivering.load(Ordering::SeqCst) {
            FulfillmentState::Delivering
        } else {
            FulfillmentState::Fetching
        }
    }

    /// Fetch, deliver and report.
    async fn run(&self) -> FulfillmentOutcome {
        let id = self.id;
        let request = &self.request;

        emit(self.event_tx.as_ref(), FulfillmentEvent::Fetching { id }).await;
        let image = match self.renderer.render(&request.render_key).await {
            Ok(image) => image,
            Err(e) => {
                error!(
                    request_id = id,
                    render_key = %request.render_key,
                    error = %e,
                    "Failed to fetch rendered view"
                );
                return self.fail(FulfillmentState::Fetching, e.to_string()).await;
            }
        };

        self.delivering.store(true, Ordering::SeqCst);
        emit(
            self.event_tx.as_ref(),
            FulfillmentEvent::Delivering {
                id,
                bytes: image.len(),
            },
        )
        .await;
        if let Err(e) = self
            .transport
            .upload_file(&request.delivery_target, IMAGE_FILE_NAME, image)
            .await
        {
            error!(
                request_id = id,
                channel = %request.delivery_target,
                error = %e,
                "Failed to upload rendered view"
            );
            return self.fail(FulfillmentState::Delivering, e.to_string()).await;
        }

        report(request.response_sink.as_ref(), Notice::Completed).await;
        emit(self.event_tx.as_ref(), FulfillmentEvent::Completed { id }).await;

        let finished_at = Utc::now();
        info!(
            request_id = id,
            elapsed_ms = (finished_at - self.accepted_at).num_milliseconds(),
            "Selection fulfilled"
        );

        FulfillmentOutcome {
            id,
            render_key: request.render_key.clone(),
            state: FulfillmentState::Completed,
            failed_stage: None,
            error: None,
            accepted_at: self.accepted_at,
            finished_at,
        }
    }

    async fn fail(&self, stage: FulfillmentState, error: String) -> FulfillmentOutcome {
        let notice = if stage == FulfillmentState::Fetching {
            Notice::FetchFailed
        } else {
            Notice::DeliveryFailed
        };
        report(self.request.response_sink.as_ref(), notice).await;
        emit(
            self.event_tx.as_ref(),
            FulfillmentEvent::Failed {
                id: self.id,
                stage,
                error: error.clone(),
            },
        )
        .await;

        FulfillmentOutcome {
            id: self.id,
            render_key: self.request.render_key.clone(),
            state: FulfillmentState::Failed,
            failed_stage: Some(stage),
            error: Some(error),
            accepted_at: self.accepted_at,
            finished_at: Utc::now(),
        }
    }
}

/// Send a notice, logging rather than propagating failures.
async fn report(sink: &dyn ResponseSink, notice: Notice) {
    if let Err(e) = sink.notify(notice).await {
        warn!(?notice, error = %e, "Failed to send notice to response sink");
    }
}

async fn emit(event_tx: Option<&mpsc::Sender<FulfillmentEvent>>, event: FulfillmentEvent) {
    if let Some(tx) = event_tx {
        let _ = tx.send(event).await;
    }
}
