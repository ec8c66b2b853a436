//! Slack Web API client and response URL sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::{DeliveryError, RequestFailure};
use crate::models::CatalogEntry;

use super::payload::{
    ActionOption, ApiResponse, Attachment, AttachmentAction, PostMessage, ResponseMessage,
};
use super::{ChatTransport, Notice, ResponseSink, ACTION_CANCEL, ACTION_SELECT};

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

const PICKER_COLOR: &str = "#f9a41b";
const PICKER_CALLBACK_ID: &str = "viewRequest";

/// Bot-token authenticated Slack Web API client.
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_url: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(api_url: &str, bot_token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_url)
    }

    /// Send a Web API call and check both HTTP status and the `ok` flag.
    async fn call(&self, request: reqwest::RequestBuilder) -> Result<(), DeliveryError> {
        let response = request.bearer_auth(&self.bot_token).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RequestFailure::Status { status, body }.into());
        }

        let parsed: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| RequestFailure::Malformed(e.to_string()))?;
        if !parsed.ok {
            return Err(DeliveryError::Api(
                parsed.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for SlackClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), DeliveryError> {
        let body = PostMessage {
            channel,
            text: Some(text),
            attachments: Vec::new(),
        };
        self.call(self.http.post(self.method_url("chat.postMessage")).json(&body))
            .await
    }

    async fn post_view_list(
        &self,
        channel: &str,
        text: &str,
        entries: &[CatalogEntry],
    ) -> Result<(), DeliveryError> {
        let options = entries
            .iter()
            .map(|entry| ActionOption {
                text: &entry.display_name,
                value: &entry.render_key,
            })
            .collect();

        let attachment = Attachment {
            text,
            color: PICKER_COLOR,
            callback_id: PICKER_CALLBACK_ID,
            actions: vec![
                AttachmentAction {
                    name: ACTION_SELECT,
                    kind: "select",
                    text: None,
                    style: None,
                    options,
                },
                AttachmentAction {
                    name: ACTION_CANCEL,
                    kind: "button",
                    text: Some("Cancel"),
                    style: Some("danger"),
                    options: Vec::new(),
                },
            ],
        };

        let body = PostMessage {
            channel,
            text: None,
            attachments: vec![attachment],
        };
        debug!(channel, options = entries.len(), "Posting dashboard picker");
        self.call(self.http.post(self.method_url("chat.postMessage")).json(&body))
            .await
    }

    async fn upload_file(
        &self,
        channel: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("image/png")?;
        let form = Form::new()
            .text("channels", channel.to_string())
            .text("filename", file_name.to_string())
            .part("file", part);

        debug!(channel, file_name, size, "Uploading file");
        self.call(self.http.post(self.method_url("files.upload")).multipart(form))
            .await
    }

    fn response_sink(&self, response_url: &str) -> Arc<dyn ResponseSink> {
        Arc::new(ResponseUrlSink::new(self.http.clone(), response_url))
    }
}

/// Posts notices to an interaction's `response_url`, replacing the original message.
#[derive(Debug, Clone)]
pub struct ResponseUrlSink {
    http: reqwest::Client,
    url: String,
}

impl ResponseUrlSink {
    pub fn new(http: reqwest::Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl ResponseSink for ResponseUrlSink {
    async fn notify(&self, notice: Notice) -> Result<(), DeliveryError> {
        let body = ResponseMessage {
            replace_original: true,
            text: notice.text(),
        };
        let response = self.http.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestFailure::Status { status, body }.into());
        }
        Ok(())
    }
}
