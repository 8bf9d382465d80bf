//! The polling loop behind the dashboard.
//!
//! One [`Monitor`] task owns the [`EmergencyNotifier`] and is the only writer
//! of its notification state. Each iteration: fetch every section, normalize,
//! evaluate the notifier, build the view, publish it. HTTP handlers read the
//! published view; a forced refresh is a message to this task, never a second
//! writer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::dashboard::{DashboardView, DataSource};
use crate::model::RawSections;
use crate::normalize::normalize;
use crate::notifier::EmergencyNotifier;
use crate::store::{Store, read_snapshot};

/// Latest view, shared with the HTTP handlers.
pub type SharedView = Arc<RwLock<DashboardView>>;

/// Default time between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Shortest accepted time between two polls.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Ask the monitor for an immediate refresh.
#[derive(Debug)]
pub struct RefreshRequest {
    reply: oneshot::Sender<DashboardView>,
}

/// Cloneable handle for requesting refreshes from a running monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    requests: mpsc::Sender<RefreshRequest>,
}

impl MonitorHandle {
    /// Force a poll now. `None` if the monitor task has stopped.
    pub async fn refresh(&self) -> Option<DashboardView> {
        let (reply, response) = oneshot::channel();
        self.requests.send(RefreshRequest { reply }).await.ok()?;
        response.await.ok()
    }
}

pub struct Monitor {
    store: Arc<dyn Store>,
    notifier: EmergencyNotifier,
    view: SharedView,
    poll_interval: Duration,
}

impl Monitor {
    pub fn new(store: Arc<dyn Store>, notifier: EmergencyNotifier, view: SharedView) -> Self {
        Self {
            store,
            notifier,
            view,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the time between polls, raised to [`MIN_POLL_INTERVAL`] if shorter.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn notifier(&self) -> &EmergencyNotifier {
        &self.notifier
    }

    /// Run one fetch → normalize → notify → publish cycle.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> DashboardView {
        let (raw, source) = match read_snapshot(self.store.as_ref()).await {
            Ok(raw) => (raw, DataSource::Live),
            Err(e) => {
                warn!(error = %e, "Store unavailable, showing default data");
                (RawSections::default(), DataSource::Fallback)
            }
        };

        let snapshot = normalize(&raw);
        let outcome = self.notifier.evaluate(&snapshot, now).await;
        debug!(?source, ?outcome, "Dashboard refreshed");

        let view = DashboardView::build(&snapshot, source, Some(outcome), now);
        *self.view.write().await = view.clone();
        view
    }

    /// Poll forever, also serving refresh requests.
    pub async fn run(mut self, mut requests: mpsc::Receiver<RefreshRequest>) {
        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh(Utc::now()).await;
                }
                Some(request) = requests.recv() => {
                    let view = self.refresh(Utc::now()).await;
                    // The requester may have given up waiting.
                    let _ = request.reply.send(view);
                }
            }
        }
    }

    /// Spawn the loop on the runtime.
    pub fn spawn(self) -> (MonitorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(self.run(rx));
        (MonitorHandle { requests: tx }, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::{LogChannel, NotifyOutcome, TelegramChannel};
    use crate::store::SqliteStore;
    use serde_json::json;

    async fn setup() -> (Arc<SqliteStore>, Monitor) {
        let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
        let view = Arc::new(RwLock::new(DashboardView::placeholder(Utc::now())));
        let notifier = EmergencyNotifier::new(Arc::new(LogChannel));
        let monitor = Monitor::new(store.clone(), notifier, view);
        (store, monitor)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_publishes_view() {
        let (store, mut monitor) = setup().await;
        store
            .put("sensors", &json!({ "distance": 22, "alert_count": 4 }))
            .await
            .unwrap();

        let view = monitor.refresh(at(0)).await;

        assert_eq!(view.source, DataSource::Live);
        assert_eq!(view.obstacle.distance_cm, 22);
        assert_eq!(view.alerts_today, 4);
        assert_eq!(view.notification, Some(NotifyOutcome::Idle));
        assert_eq!(monitor.view.read().await.obstacle.distance_cm, 22);
    }

    #[tokio::test]
    async fn test_emergency_notifies_once_per_window() {
        let (store, mut monitor) = setup().await;
        store
            .put("alerts", &json!({ "status": "EMERGENCY", "timestamp": "10:00:00" }))
            .await
            .unwrap();

        let first = monitor.refresh(at(0)).await;
        let second = monitor.refresh(at(5)).await;
        let third = monitor.refresh(at(11)).await;

        assert_eq!(first.notification, Some(NotifyOutcome::Delivered));
        assert!(matches!(
            second.notification,
            Some(NotifyOutcome::Suppressed { .. })
        ));
        assert_eq!(third.notification, Some(NotifyOutcome::Delivered));
        assert_eq!(monitor.notifier().state().last_sent_at, Some(at(11)));
    }

    #[tokio::test]
    async fn test_failed_delivery_view_hides_bot_token() {
        let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
        store
            .put("alerts", &json!({ "status": "EMERGENCY", "timestamp": "10:00:00" }))
            .await
            .unwrap();
        let channel =
            TelegramChannel::with_base_url("http://127.0.0.1:9", "123456:SECRET-TOKEN", "1");
        let view = Arc::new(RwLock::new(DashboardView::placeholder(Utc::now())));
        let mut monitor = Monitor::new(store, EmergencyNotifier::new(Arc::new(channel)), view);

        let view = monitor.refresh(at(0)).await;

        assert!(matches!(
            view.notification,
            Some(NotifyOutcome::DeliveryFailed { .. })
        ));
        let body = serde_json::to_string(&view).unwrap();
        assert!(!body.contains("SECRET-TOKEN"), "{body}");
    }

    #[tokio::test]
    async fn test_zero_poll_interval_keeps_monitor_alive() {
        let (_store, monitor) = setup().await;

        let monitor = monitor.with_poll_interval(Duration::ZERO);
        assert_eq!(monitor.poll_interval, MIN_POLL_INTERVAL);

        let (handle, task) = monitor.spawn();
        let view = handle.refresh().await;
        task.abort();

        assert!(view.is_some());
    }

    #[tokio::test]
    async fn test_handle_refresh_round_trip() {
        let (store, monitor) = setup().await;
        store
            .put("system", &json!({ "status": "EMERGENCY", "battery": 12 }))
            .await
            .unwrap();

        let (handle, task) = monitor.with_poll_interval(Duration::from_secs(3600)).spawn();
        let view = handle.refresh().await.unwrap();
        task.abort();

        assert_eq!(view.battery_percent, 12);
        assert_eq!(view.status_badge, crate::dashboard::StatusBadge::Emergency);
    }
}
