//! Slack request and message payloads.

use serde::{Deserialize, Serialize};

/// Body of `POST /` during endpoint verification.
#[derive(Debug, Deserialize)]
pub struct Challenge {
    pub challenge: String,
}

/// Events API envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        #[serde(default)]
        token: String,
        event: MessageEvent,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    pub user: Option<String>,
    #[serde(default)]
    pub channel: String,
    /// Set when the message was posted by a bot.
    pub bot_id: Option<String>,
}

/// Interactive message callback, delivered as the `payload` form field.
#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    pub channel: ChannelRef,
    pub user: Option<UserRef>,
    #[serde(default)]
    pub response_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

#[derive(Debug, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UserRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// `chat.postMessage` body.
#[derive(Debug, Serialize)]
pub(super) struct PostMessage<'a> {
    pub channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct Attachment<'a> {
    pub text: &'a str,
    pub color: &'a str,
    pub callback_id: &'a str,
    pub actions: Vec<AttachmentAction<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct AttachmentAction<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ActionOption<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct ActionOption<'a> {
    pub text: &'a str,
    pub value: &'a str,
}

/// Body posted to an interaction's `response_url`.
#[derive(Debug, Serialize)]
pub(super) struct ResponseMessage<'a> {
    pub replace_original: bool,
    pub text: &'a str,
}

/// Envelope of every Web API answer.
#[derive(Debug, Deserialize)]
pub(super) struct ApiResponse {
    pub ok: bool,
    pub error: Option<String>,
}
