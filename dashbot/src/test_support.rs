//! In-memory fakes for the chat and rendering seams.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::chat::{ChatTransport, Notice, ResponseSink};
use crate::error::{DeliveryError, RenderFetchError, RequestFailure};
use crate::fulfillment::ViewRenderer;
use crate::models::CatalogEntry;

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Records every notice in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn notify(&self, notice: Notice) -> Result<(), DeliveryError> {
        self.notices.lock().unwrap().push(notice);
        Ok(())
    }
}

/// Records posts and uploads; hands out one `RecordingSink` per response URL.
#[derive(Debug, Default)]
pub struct FakeTransport {
    fail_uploads: bool,
    panic_uploads: bool,
    messages: Mutex<Vec<(String, String)>>,
    view_lists: Mutex<Vec<(String, String, Vec<CatalogEntry>)>>,
    uploads: Mutex<Vec<(String, String, usize)>>,
    sinks: Mutex<HashMap<String, Arc<RecordingSink>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_uploads() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub fn panicking_uploads() -> Self {
        Self {
            panic_uploads: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn view_lists(&self) -> Vec<(String, String, Vec<CatalogEntry>)> {
        self.view_lists.lock().unwrap().clone()
    }

    /// `(channel, file name, byte count)` per upload.
    pub fn uploads(&self) -> Vec<(String, String, usize)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn sink(&self, response_url: &str) -> Arc<RecordingSink> {
        Arc::clone(
            self.sinks
                .lock()
                .unwrap()
                .entry(response_url.to_string())
                .or_default(),
        )
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), DeliveryError> {
        self.messages
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }

    async fn post_view_list(
        &self,
        channel: &str,
        text: &str,
        entries: &[CatalogEntry],
    ) -> Result<(), DeliveryError> {
        self.view_lists
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string(), entries.to_vec()));
        Ok(())
    }

    async fn upload_file(
        &self,
        channel: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        assert!(!self.panic_uploads, "upload exploded");
        if self.fail_uploads {
            return Err(DeliveryError::Api("not_in_channel".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((channel.to_string(), file_name.to_string(), bytes.len()));
        Ok(())
    }

    fn response_sink(&self, response_url: &str) -> Arc<dyn ResponseSink> {
        self.sink(response_url)
    }
}

/// Renderer returning `b"png"`, optionally failing, panicking, delayed or gated.
#[derive(Debug)]
pub struct FakeRenderer {
    fail: bool,
    panic: bool,
    delay: Duration,
    gate: Semaphore,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRenderer {
    fn with_gate(fail: bool, permits: usize) -> Self {
        Self {
            fail,
            panic: false,
            delay: Duration::ZERO,
            gate: Semaphore::new(permits),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn ok() -> Self {
        Self::with_gate(false, 1)
    }

    pub fn failing() -> Self {
        Self::with_gate(true, 1)
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::with_gate(false, 1)
        }
    }

    /// Blocks every render until `open_gate` is called.
    pub fn gated() -> Self {
        Self::with_gate(false, 0)
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn open_gate(&self) {
        self.gate.add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ViewRenderer for FakeRenderer {
    async fn render(&self, render_key: &str) -> Result<Vec<u8>, RenderFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Permit goes back on drop, so an opened gate stays open.
        let _pass = self.gate.acquire().await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        assert!(!self.panic, "renderer exploded");
        if self.fail {
            return Err(RenderFetchError::Request {
                render_key: render_key.to_string(),
                cause: RequestFailure::Malformed("render failed".to_string()),
            });
        }
        Ok(b"png".to_vec())
    }
}
