//! Telegram Bot API notification channel.
//!
//! One `sendMessage` call per alert. Only HTTP 200 counts as delivered; any
//! other status, a timeout or a connection error is a delivery failure.
//!
//! # API Reference
//!
//! See: <https://core.telegram.org/bots/api#sendmessage>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use super::{MessageFormat, NotificationChannel, OutboundMessage};
use crate::error::{Error, Result};

/// Base URL for the Telegram Bot API.
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Upper bound on a single delivery attempt.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Request body for `sendMessage`.
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

/// Delivers messages to one Telegram chat through a bot.
#[derive(Clone)]
pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: String,
    timeout: Duration,
}

impl TelegramChannel {
    /// Create a channel for the bot `token` posting to `chat_id`.
    pub fn new(token: &str, chat_id: &str) -> Self {
        Self::with_base_url(TELEGRAM_API_BASE, token, chat_id)
    }

    /// Create a channel against a custom API base URL (for testing).
    pub fn with_base_url(base_url: &str, token: &str, chat_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn deliver(&self, message: &OutboundMessage) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: &message.text,
            parse_mode: match message.format {
                MessageFormat::Plain => None,
                MessageFormat::Markdown => Some("Markdown"),
            },
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::DeliveryFailure(e.without_url().to_string()))?;

        let status = response.status();
        debug!(%status, "Telegram sendMessage");
        if status != StatusCode::OK {
            return Err(Error::DeliveryFailure(format!("Telegram returned HTTP {status}")));
        }

        Ok(())
    }
}
