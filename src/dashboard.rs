//! The view handed to renderers.
//!
//! A [`DashboardView`] is everything a page needs to draw the dashboard:
//! status badge, metrics, map marker, obstacle gauge and alert feed. It is
//! rebuilt from a normalized [`Snapshot`] on every refresh and never stored.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::history::reduce_history;
use crate::model::{
    AlertStatus, DistanceBand, HistoryEntry, Location, Signal, Snapshot, SystemStatus,
    distance_progress,
};
use crate::notifier::NotifyOutcome;

/// Where the snapshot behind a view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Read from the store (possibly with some sections defaulted).
    Live,
    /// The store was unreachable; every field is a default.
    Fallback,
}

/// Top-left status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBadge {
    Live,
    Emergency,
}

impl StatusBadge {
    pub fn from_status(status: &SystemStatus) -> Self {
        match status {
            SystemStatus::Emergency => StatusBadge::Emergency,
            _ => StatusBadge::Live,
        }
    }
}

/// Obstacle distance gauge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObstacleGauge {
    pub distance_cm: u32,
    /// Gauge fill, 0 to 100.
    pub progress_percent: u8,
    pub band: DistanceBand,
    pub label: &'static str,
}

impl ObstacleGauge {
    pub fn new(distance_cm: u32) -> Self {
        let band = DistanceBand::classify(distance_cm);
        Self {
            distance_cm,
            progress_percent: distance_progress(distance_cm),
            band,
            label: band.label(),
        }
    }
}

/// Everything a renderer needs for one frame of the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    /// When this view was built.
    pub updated_at: DateTime<Utc>,

    pub source: DataSource,

    pub status_badge: StatusBadge,
    pub system_status: SystemStatus,
    pub battery_percent: u8,
    pub signal: Signal,

    pub location: Location,
    pub map_link: String,

    /// Whether an emergency is currently active.
    pub emergency_active: bool,
    /// Time shown next to the alert status.
    pub alert_time: String,

    pub obstacle: ObstacleGauge,
    pub alerts_today: u64,

    /// Most recent alerts first, never empty.
    pub history: Vec<HistoryEntry>,

    /// What the notifier did on the refresh that produced this view.
    pub notification: Option<NotifyOutcome>,
}

impl DashboardView {
    /// Build a view from a normalized snapshot.
    pub fn build(
        snapshot: &Snapshot,
        source: DataSource,
        notification: Option<NotifyOutcome>,
        now: DateTime<Utc>,
    ) -> Self {
        let local_now = now.with_timezone(&Local);
        let now_label = local_now.format("%H:%M:%S").to_string();

        Self {
            updated_at: now,
            source,
            status_badge: StatusBadge::from_status(&snapshot.system.status),
            system_status: snapshot.system.status.clone(),
            battery_percent: snapshot.system.battery,
            signal: snapshot.system.signal.clone(),
            location: snapshot.location.clone(),
            map_link: snapshot.location.map_link(),
            emergency_active: snapshot.alerts.status == AlertStatus::Emergency,
            alert_time: snapshot.alerts.display_time(&now_label),
            obstacle: ObstacleGauge::new(snapshot.sensors.distance),
            alerts_today: snapshot.sensors.alert_count,
            history: reduce_history(&snapshot.alerts.history, &local_now),
            notification,
        }
    }

    /// The view shown before the first poll completes.
    pub fn placeholder(now: DateTime<Utc>) -> Self {
        Self::build(&Snapshot::default(), DataSource::Fallback, None, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HistoryCategory;

    #[test]
    fn test_placeholder_is_fully_defaulted() {
        let view = DashboardView::placeholder(Utc::now());

        assert_eq!(view.source, DataSource::Fallback);
        assert_eq!(view.status_badge, StatusBadge::Live);
        assert_eq!(view.battery_percent, 85);
        assert!(!view.emergency_active);
        assert_eq!(view.obstacle.band, DistanceBand::Clear);
        assert_eq!(view.history.len(), 1);
        assert_eq!(view.history[0].category, HistoryCategory::Info);
        assert!(view.notification.is_none());
    }

    #[test]
    fn test_emergency_snapshot_view() {
        let mut snapshot = Snapshot::default();
        snapshot.system.status = SystemStatus::Emergency;
        snapshot.alerts.status = AlertStatus::Emergency;
        snapshot.alerts.timestamp = "09:41:00".to_string();
        snapshot.sensors.distance = 140;

        let view = DashboardView::build(
            &snapshot,
            DataSource::Live,
            Some(NotifyOutcome::Delivered),
            Utc::now(),
        );

        assert_eq!(view.status_badge, StatusBadge::Emergency);
        assert!(view.emergency_active);
        assert_eq!(view.alert_time, "09:41:00");
        assert_eq!(view.obstacle.progress_percent, 100);
        assert_eq!(view.obstacle.distance_cm, 140);
        assert_eq!(view.notification, Some(NotifyOutcome::Delivered));
    }

    #[test]
    fn test_obstacle_gauge_bands() {
        assert_eq!(ObstacleGauge::new(12).band, DistanceBand::Alert);
        assert_eq!(ObstacleGauge::new(45).label, "Caution zone");
        assert_eq!(ObstacleGauge::new(50).band, DistanceBand::Clear);
    }
}
