//! Emergency detection and duplicate-notification suppression.
//!
//! The notifier is level-triggered: while `alerts.status` is `EMERGENCY` it
//! sends one message per cooldown window, for as long as the condition lasts.
//! There is no stored "cooling down" mode. Whether a send is allowed is
//! recomputed from `now - last_sent_at` on every evaluation by
//! [`should_notify`].
//!
//! Delivery is best effort. The bookkeeping is updated after every attempt,
//! successful or not, so a failed send is never retried inside the window.

pub mod telegram;

pub use telegram::TelegramChannel;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{AlertStatus, Snapshot};

/// Minimum time between two emergency notifications.
pub const DEFAULT_COOLDOWN: TimeDelta = TimeDelta::seconds(10);

/// Text formatting of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    #[default]
    Plain,
    Markdown,
}

/// A message for the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub format: MessageFormat,
}

impl OutboundMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: MessageFormat::Plain,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: MessageFormat::Markdown,
        }
    }
}

/// Where emergency messages go.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Attempt a single delivery. Implementations must not retry.
    async fn deliver(&self, message: &OutboundMessage) -> Result<()>;
}

/// Channel used when no messaging bot is configured. Only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn deliver(&self, message: &OutboundMessage) -> Result<()> {
        info!(text = %message.text, "No notification channel configured, message logged only");
        Ok(())
    }
}

/// Process-lifetime bookkeeping of the last notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NotificationState {
    pub last_sent_at: Option<DateTime<Utc>>,
    pub last_status: Option<AlertStatus>,
}

/// Whether an emergency notification is due.
///
/// True when `status` is `EMERGENCY` and either nothing was ever sent or
/// strictly more than `cooldown` has elapsed since the last send.
pub fn should_notify(
    status: AlertStatus,
    last_sent_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: TimeDelta,
) -> bool {
    if status != AlertStatus::Emergency {
        return false;
    }
    match last_sent_at {
        None => true,
        Some(last) => now - last > cooldown,
    }
}

/// The message sent when the dashboard detects an emergency.
pub fn emergency_message(snapshot: &Snapshot) -> OutboundMessage {
    let location = &snapshot.location;
    OutboundMessage::plain(format!(
        "🚨 EMERGENCY ALERT!\n\
         \n\
         📍 Location: {lat}, {lon}\n\
         ⏰ Time: {time}\n\
         📏 Distance: {distance} cm\n\
         🔗 Track: {link}\n\
         \n\
         Immediate action required!",
        lat = location.latitude,
        lon = location.longitude,
        time = snapshot.alerts.timestamp,
        distance = snapshot.sensors.distance,
        link = location.map_link(),
    ))
}

/// What a single evaluation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotifyOutcome {
    /// Status is not `EMERGENCY`.
    Idle,
    /// Emergency, but the previous notification is too recent.
    Suppressed { remaining_ms: i64 },
    /// The message was accepted by the channel.
    Delivered,
    /// The channel failed. Not retried until the window expires.
    DeliveryFailed { reason: String },
}

/// Owns the notification state and decides when to send.
///
/// Exactly one task should own a notifier; it is the single writer of its
/// [`NotificationState`].
pub struct EmergencyNotifier {
    channel: Arc<dyn NotificationChannel>,
    cooldown: TimeDelta,
    state: NotificationState,
}

impl EmergencyNotifier {
    pub fn new(channel: Arc<dyn NotificationChannel>) -> Self {
        Self {
            channel,
            cooldown: DEFAULT_COOLDOWN,
            state: NotificationState::default(),
        }
    }

    pub fn with_cooldown(mut self, cooldown: TimeDelta) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Start from a known state instead of "never sent".
    pub fn with_state(mut self, state: NotificationState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> NotificationState {
        self.state
    }

    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    /// Inspect a snapshot and send at most one notification.
    pub async fn evaluate(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) -> NotifyOutcome {
        let status = snapshot.alerts.status;
        if status != AlertStatus::Emergency {
            return NotifyOutcome::Idle;
        }

        if !should_notify(status, self.state.last_sent_at, now, self.cooldown) {
            let remaining = self
                .state
                .last_sent_at
                .map_or(TimeDelta::zero(), |last| self.cooldown - (now - last));
            return NotifyOutcome::Suppressed {
                remaining_ms: remaining.num_milliseconds(),
            };
        }

        let message = emergency_message(snapshot);
        let outcome = match self.channel.deliver(&message).await {
            Ok(()) => {
                info!(
                    latitude = snapshot.location.latitude,
                    longitude = snapshot.location.longitude,
                    "Emergency notification sent"
                );
                NotifyOutcome::Delivered
            }
            Err(e) => {
                warn!(error = %e, "Emergency notification failed");
                NotifyOutcome::DeliveryFailed {
                    reason: e.to_string(),
                }
            }
        };

        self.state = NotificationState {
            last_sent_at: Some(now),
            last_status: Some(status),
        };

        outcome
    }
}
