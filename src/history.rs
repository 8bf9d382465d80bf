//! Reduces the raw alert history map into the alert feed.
//!
//! History keys are normally epoch milliseconds written by the device or the
//! simulator, but nothing enforces that. Keys that do not parse sort as
//! timestamp 0, so they sink to the bottom instead of breaking the feed.

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, TimeZone};

use crate::model::{HistoryCategory, HistoryEntry};

/// Number of entries shown in the feed.
pub const FEED_LENGTH: usize = 5;

/// Message shown when there is no history at all.
pub const EMPTY_FEED_MESSAGE: &str = "System Online - Waiting for data...";

const TIME_FORMAT: &str = "%H:%M:%S";

/// Classify a history message. First match wins.
pub fn classify(message: &str) -> HistoryCategory {
    if message.contains("Emergency") || message.contains('🚨') {
        HistoryCategory::Emergency
    } else if message.contains('⚠') {
        HistoryCategory::Warning
    } else {
        HistoryCategory::Info
    }
}

/// Build the feed: most recent first, at most [`FEED_LENGTH`] entries, never empty.
///
/// Times are rendered in `now`'s timezone. Entries whose key is not a
/// timestamp show `now` as their time.
pub fn reduce_history<Tz>(history: &BTreeMap<String, String>, now: &DateTime<Tz>) -> Vec<HistoryEntry>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let now_label = now.format(TIME_FORMAT).to_string();

    let mut entries: Vec<HistoryEntry> = history
        .iter()
        .map(|(key, message)| {
            let parsed = key.trim().parse::<i64>().ok();
            let time = parsed
                .and_then(|ms| now.timezone().timestamp_millis_opt(ms).single())
                .map_or_else(|| now_label.clone(), |t| t.format(TIME_FORMAT).to_string());

            HistoryEntry {
                time,
                category: classify(message),
                message: message.clone(),
                sort_key: parsed.unwrap_or(0),
            }
        })
        .collect();

    entries.sort_by(|a, b| b.sort_key.cmp(&a.sort_key));
    entries.truncate(FEED_LENGTH);

    if entries.is_empty() {
        entries.push(HistoryEntry {
            time: now_label,
            category: HistoryCategory::Info,
            message: EMPTY_FEED_MESSAGE.to_string(),
            sort_key: 0,
        });
    }

    entries
}
