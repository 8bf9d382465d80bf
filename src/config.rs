//! Runtime configuration, read once from the environment at startup.
//!
//! | variable | default |
//! |---|---|
//! | `BLINDSTICK_PORT` | `3000` |
//! | `BLINDSTICK_FIREBASE_URL` | unset (use SQLite) |
//! | `BLINDSTICK_FIREBASE_SECRET` | unset |
//! | `BLINDSTICK_DATABASE_URL` | `sqlite:blindstick.db?mode=rwc` |
//! | `BLINDSTICK_POLL_SECS` | `5` (at least `1`) |
//! | `BLINDSTICK_COOLDOWN_SECS` | `10` |
//! | `BLINDSTICK_HTTP_TIMEOUT_SECS` | `5` |
//! | `TELEGRAM_TOKEN`, `TELEGRAM_CHAT_ID` | unset (log only) |

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tracing::info;

use crate::error::Result;
use crate::monitor::MIN_POLL_INTERVAL;
use crate::notifier::{LogChannel, NotificationChannel, TelegramChannel};
use crate::store::{FirebaseStore, SqliteStore, Store};

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
pub const DEFAULT_DB_PATH: &str = "sqlite:blindstick.db?mode=rwc";

/// Which backend holds the device state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Firebase { url: String, secret: Option<String> },
    Sqlite { database_url: String },
}

/// Messaging bot credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"****")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub store: StoreConfig,
    pub telegram: Option<TelegramConfig>,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str, default: u64| {
            non_empty(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map_or(Duration::from_secs(default), Duration::from_secs)
        };

        let store = match non_empty("BLINDSTICK_FIREBASE_URL") {
            Some(url) => StoreConfig::Firebase {
                url,
                secret: non_empty("BLINDSTICK_FIREBASE_SECRET"),
            },
            None => StoreConfig::Sqlite {
                database_url: non_empty("BLINDSTICK_DATABASE_URL")
                    .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            },
        };

        let telegram = match (non_empty("TELEGRAM_TOKEN"), non_empty("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig { token, chat_id }),
            _ => None,
        };

        Self {
            port: non_empty("BLINDSTICK_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),
            store,
            telegram,
            poll_interval: secs("BLINDSTICK_POLL_SECS", 5).max(MIN_POLL_INTERVAL),
            cooldown: secs("BLINDSTICK_COOLDOWN_SECS", 10),
            http_timeout: secs("BLINDSTICK_HTTP_TIMEOUT_SECS", 5),
        }
    }

    /// Cooldown as a chrono duration for the notifier.
    pub fn cooldown_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.cooldown).unwrap_or(crate::notifier::DEFAULT_COOLDOWN)
    }

    /// Connect to the configured store.
    pub async fn build_store(&self) -> Result<Arc<dyn Store>> {
        match &self.store {
            StoreConfig::Firebase { url, secret } => {
                info!(url = %url, "Using Firebase store");
                Ok(Arc::new(
                    FirebaseStore::new(url, secret.clone()).with_timeout(self.http_timeout),
                ))
            }
            StoreConfig::Sqlite { database_url } => {
                info!(database_url = %database_url, "Using SQLite store");
                Ok(Arc::new(SqliteStore::new(database_url).await?))
            }
        }
    }

    /// The configured notification channel, or a log-only one.
    pub fn build_channel(&self) -> Arc<dyn NotificationChannel> {
        match &self.telegram {
            Some(telegram) => Arc::new(
                TelegramChannel::new(&telegram.token, &telegram.chat_id)
                    .with_timeout(self.http_timeout),
            ),
            None => {
                info!("Telegram not configured, notifications will only be logged");
                Arc::new(LogChannel)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(
            config.store,
            StoreConfig::Sqlite {
                database_url: DEFAULT_DB_PATH.to_string()
            }
        );
        assert!(config.telegram.is_none());
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.cooldown_delta(), TimeDelta::seconds(10));
    }

    #[test]
    fn test_firebase_and_telegram() {
        let config = config(&[
            ("BLINDSTICK_FIREBASE_URL", "https://db.example.app"),
            ("BLINDSTICK_FIREBASE_SECRET", "secret"),
            ("TELEGRAM_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "42"),
            ("BLINDSTICK_COOLDOWN_SECS", "30"),
            ("BLINDSTICK_PORT", "not-a-port"),
        ]);

        assert_eq!(
            config.store,
            StoreConfig::Firebase {
                url: "https://db.example.app".to_string(),
                secret: Some("secret".to_string()),
            }
        );
        assert_eq!(config.telegram.as_ref().unwrap().chat_id, "42");
        assert_eq!(config.cooldown, Duration::from_secs(30));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_zero_poll_interval_is_raised() {
        let config = config(&[("BLINDSTICK_POLL_SECS", "0")]);

        assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);
    }

    #[test]
    fn test_telegram_requires_both_values() {
        let config = config(&[("TELEGRAM_TOKEN", "123:abc")]);

        assert!(config.telegram.is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = config(&[("TELEGRAM_TOKEN", "123:abc"), ("TELEGRAM_CHAT_ID", "42")]);

        assert!(!format!("{config:?}").contains("123:abc"));
    }
}
