//! Access to the shared key-value store.
//!
//! The store is addressed by slash-separated paths (`"system"`,
//! `"alerts/history"`). Two backends are provided:
//!
//! - [`FirebaseStore`]: Firebase Realtime Database over its REST API
//! - [`SqliteStore`]: a local SQLite file, one row per top-level section
//!
//! Reads are done section by section so that one failing section never hides
//! the others. Only when every section fails does [`read_snapshot`] report
//! [`Error::StoreUnavailable`].

pub mod firebase;
pub mod sqlite;

pub use firebase::FirebaseStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{RawSections, Section};

/// A remote or local JSON tree addressed by slash-separated paths.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the value at `path`. Absent and `null` values are `None`.
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Overwrite the value at `path`.
    async fn put(&self, path: &str, value: &Value) -> Result<()>;

    /// Merge the keys of `value` (an object) into `path`. `null` values delete keys.
    async fn patch(&self, path: &str, value: &Value) -> Result<()>;
}

/// Fetch all four sections concurrently, each independently.
pub async fn read_snapshot(store: &dyn Store) -> Result<RawSections> {
    let (location, alerts, sensors, system) = tokio::join!(
        store.get(Section::Location.path()),
        store.get(Section::Alerts.path()),
        store.get(Section::Sensors.path()),
        store.get(Section::System.path()),
    );

    let mut raw = RawSections::default();
    let mut failures = Vec::new();

    for (section, result) in Section::ALL.into_iter().zip([location, alerts, sensors, system]) {
        match result {
            Ok(value) => {
                debug!(section = %section, present = value.is_some(), "Section fetched");
                raw.set(section, value);
            }
            Err(e) => {
                warn!(section = %section, error = %e, "Failed to fetch section");
                failures.push(e.to_string());
            }
        }
    }

    if failures.len() == Section::ALL.len() {
        return Err(Error::StoreUnavailable {
            reason: failures.join("; "),
        });
    }

    Ok(raw)
}

/// Split a store path into its non-empty segments.
pub(crate) fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Look up a nested value. `null` counts as absent.
pub(crate) fn lookup<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = node.as_object()?.get(*segment)?;
    }
    (!node.is_null()).then_some(node)
}

/// Mutable access to a nested value, creating intermediate objects as needed.
pub(crate) fn entry_mut<'a>(mut node: &'a mut Value, segments: &[&str]) -> &'a mut Value {
    for segment in segments {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            unreachable!("node was replaced with an object above");
        };
        node = map.entry((*segment).to_string()).or_insert(Value::Null);
    }
    node
}

/// Apply Firebase `PATCH` semantics: merge keys, `null` deletes.
pub(crate) fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(updates) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in updates {
            if value.is_null() {
                map.remove(key);
            } else {
                map.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// In-memory store where selected paths always fail.
    struct FlakyStore {
        data: HashMap<&'static str, Value>,
        failing: Vec<&'static str>,
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn get(&self, path: &str) -> Result<Option<Value>> {
            if self.failing.iter().any(|p| *p == path) {
                return Err(Error::store(path, "connection refused"));
            }
            Ok(self.data.get(path).cloned())
        }

        async fn put(&self, _path: &str, _value: &Value) -> Result<()> {
            Ok(())
        }

        async fn patch(&self, _path: &str, _value: &Value) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_read_snapshot_partial_failure() {
        let store = FlakyStore {
            data: HashMap::from([("system", json!({ "battery": 40 }))]),
            failing: vec!["location", "alerts"],
        };

        let raw = read_snapshot(&store).await.unwrap();

        assert!(raw.location.is_none());
        assert!(raw.alerts.is_none());
        assert!(raw.sensors.is_none());
        assert_eq!(raw.system, Some(json!({ "battery": 40 })));
    }

    #[tokio::test]
    async fn test_read_snapshot_total_failure() {
        let store = FlakyStore {
            data: HashMap::new(),
            failing: vec!["location", "alerts", "sensors", "system"],
        };

        let result = read_snapshot(&store).await;

        assert!(matches!(result, Err(Error::StoreUnavailable { .. })));
    }

    /// Store whose reads only complete once all four are in flight together.
    struct RendezvousStore {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl Store for RendezvousStore {
        async fn get(&self, _path: &str) -> Result<Option<Value>> {
            self.barrier.wait().await;
            Ok(Some(json!({})))
        }

        async fn put(&self, _path: &str, _value: &Value) -> Result<()> {
            Ok(())
        }

        async fn patch(&self, _path: &str, _value: &Value) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_read_snapshot_fetches_sections_concurrently() {
        let store = RendezvousStore {
            barrier: tokio::sync::Barrier::new(Section::ALL.len()),
        };

        let raw = tokio::time::timeout(std::time::Duration::from_secs(5), read_snapshot(&store))
            .await
            .expect("sections were fetched one at a time")
            .unwrap();

        assert!(Section::ALL.iter().all(|s| raw.get(*s).is_some()));
    }

    #[test]
    fn test_lookup_and_entry_mut() {
        let mut root = json!({ "alerts": { "status": "SAFE" } });

        *entry_mut(&mut root, &["alerts", "history", "1"]) = json!("hello");

        assert_eq!(lookup(&root, &["alerts", "status"]), Some(&json!("SAFE")));
        assert_eq!(
            lookup(&root, &["alerts", "history", "1"]),
            Some(&json!("hello"))
        );
        assert_eq!(lookup(&root, &["alerts", "missing"]), None);
        assert_eq!(lookup(&root, &["alerts", "status", "deeper"]), None);
    }

    #[test]
    fn test_merge_patch() {
        let mut target = json!({ "distance": 40, "alert_count": 7 });

        merge_patch(&mut target, &json!({ "distance": 15, "alert_count": null }));

        assert_eq!(target, json!({ "distance": 15 }));
    }

    #[test]
    fn test_segments_ignores_empty_parts() {
        assert_eq!(segments("/alerts//history/"), vec!["alerts", "history"]);
    }
}
