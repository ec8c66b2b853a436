//! Chat transport seam: outbound traits, user-facing texts, command parsing.

mod payload;
mod slack;

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::error::DeliveryError;
use crate::models::CatalogEntry;

pub use payload::{Challenge, EventEnvelope, Interaction};
pub use slack::{SlackClient, DEFAULT_SLACK_API_URL};

/// Action name of the dashboard picker.
pub const ACTION_SELECT: &str = "select";
/// Action name of the cancel button.
pub const ACTION_CANCEL: &str = "cancel";

pub const NO_RESULTS_TEXT: &str = "Sorry, I didn't find any dashboard with those terms";

/// A leading `<@U123>` or `<@U123|name>` mention token.
static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<@([A-Z0-9]+)(?:\|[^>]*)?>$").expect("mention pattern is valid")
});

/// Outbound chat operations.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), DeliveryError>;

    /// Post a message offering one selectable option per entry.
    async fn post_view_list(
        &self,
        channel: &str,
        text: &str,
        entries: &[CatalogEntry],
    ) -> Result<(), DeliveryError>;

    async fn upload_file(
        &self,
        channel: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DeliveryError>;

    /// Sink for follow-up status messages addressed to `response_url`.
    fn response_sink(&self, response_url: &str) -> Arc<dyn ResponseSink>;
}

/// Destination for progress notices about one selection.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn notify(&self, notice: Notice) -> Result<(), DeliveryError>;
}

/// Status messages shown to the user while a selection is fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Accepted,
    Completed,
    FetchFailed,
    DeliveryFailed,
    Busy,
    Cancelled,
    UnknownView,
}

impl Notice {
    pub const fn text(self) -> &'static str {
        match self {
            Self::Accepted => "On it! Rendering the dashboard, this can take a minute...",
            Self::Completed => "Complete!",
            Self::FetchFailed => {
                "Sorry, I couldn't fetch that dashboard from Tableau. Please try again later."
            }
            Self::DeliveryFailed => "Sorry, I rendered the dashboard but couldn't upload it here.",
            Self::Busy => {
                "I'm rendering too many dashboards right now. Please try again in a moment."
            }
            Self::Cancelled => "Ok, cancelled.",
            Self::UnknownView => {
                "Sorry, that dashboard isn't in my catalog. Please search for it again."
            }
        }
    }
}

/// Header text for a non-empty result list.
pub fn results_text(truncated: bool, limit: usize) -> String {
    if truncated {
        format!(
            "I found too many dashboards and had to limit to {limit} results.\n\
             If the one you want is not in the list, try searching again with more words."
        )
    } else {
        "Here are the dashboards I found. The one you want should be in the list below".to_string()
    }
}

/// Commands understood in chat messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Find { query: String },
}

/// Parse `<@bot> find <query...>`.
///
/// The first token must be a mention, and when `bot_id` is known it must be
/// that bot. Anything else is ignored.
pub fn parse_command(text: &str, bot_id: Option<&str>) -> Option<Command> {
    let mut words = text.split_whitespace();
    let mention = MENTION.captures(words.next()?)?;
    if bot_id.is_some_and(|id| id != &mention[1]) {
        return None;
    }

    let verb = words.next()?;
    if !verb.eq_ignore_ascii_case("find") {
        return None;
    }

    let query = words.collect::<Vec<_>>().join(" ");
    if query.is_empty() {
        return None;
    }
    Some(Command::Find { query })
}
