//! Synthetic device data for demos and testing.
//!
//! Two modes:
//!
//! - **populate**: overwrite all four sections with plausible random readings
//!   every few seconds, like a live stick would.
//! - **emergency**: write one complete emergency event (location, alert,
//!   history entry, system, sensors) and message the bot directly, without
//!   going through the dashboard's cooldown.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{
    AlertStatus, Alerts, DEFAULT_LATITUDE, DEFAULT_LONGITUDE, HISTORY_PATH, Location, Section,
    Sensors, Signal, Snapshot, SystemInfo, SystemStatus,
};
use crate::notifier::{NotificationChannel, OutboundMessage};
use crate::store::Store;

/// Default time between two populate writes.
pub const POPULATE_INTERVAL: Duration = Duration::from_secs(5);

/// Pause between alerts in repeat mode.
pub const REPEAT_GAP: Duration = Duration::from_secs(3);

/// Time between alerts in auto mode.
pub const AUTO_INTERVAL: Duration = Duration::from_secs(10);

/// Obstacle distance written with every simulated emergency.
pub const EMERGENCY_DISTANCE_CM: u32 = 15;

/// A named rectangle that emergency locations are drawn from.
#[derive(Debug, Clone, Copy)]
pub struct DemoArea {
    pub name: &'static str,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// Areas used for random emergency locations.
pub const DEMO_AREAS: [DemoArea; 10] = [
    DemoArea { name: "UiTM Melaka Jasin", lat_min: 2.0400, lat_max: 2.0500, lon_min: 102.5600, lon_max: 102.5750 },
    DemoArea { name: "KL City Centre", lat_min: 3.1390, lat_max: 3.1490, lon_min: 101.6869, lon_max: 101.6969 },
    DemoArea { name: "Penang Georgetown", lat_min: 5.4140, lat_max: 5.4240, lon_min: 100.3287, lon_max: 100.3387 },
    DemoArea { name: "Johor Bahru", lat_min: 1.4854, lat_max: 1.4954, lon_min: 103.7618, lon_max: 103.7718 },
    DemoArea { name: "Melaka Town", lat_min: 2.1896, lat_max: 2.1996, lon_min: 102.2501, lon_max: 102.2601 },
    DemoArea { name: "Shah Alam", lat_min: 3.0738, lat_max: 3.0838, lon_min: 101.5183, lon_max: 101.5283 },
    DemoArea { name: "Alor Setar", lat_min: 6.1248, lat_max: 6.1348, lon_min: 100.3673, lon_max: 100.3773 },
    DemoArea { name: "Ipoh", lat_min: 4.5975, lat_max: 4.6075, lon_min: 101.0901, lon_max: 101.1001 },
    DemoArea { name: "Kota Kinabalu", lat_min: 5.9788, lat_max: 5.9888, lon_min: 116.0753, lon_max: 116.0853 },
    DemoArea { name: "Kuching", lat_min: 1.5535, lat_max: 1.5635, lon_min: 110.3593, lon_max: 110.3693 },
];

/// Random but plausible device state. Status values are skewed 3:1 towards normal.
pub fn generate_snapshot<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Local>) -> Snapshot {
    let system_status = if rng.random_ratio(1, 4) {
        SystemStatus::Emergency
    } else {
        SystemStatus::Active
    };
    let alert_status = if rng.random_ratio(1, 4) {
        AlertStatus::Emergency
    } else {
        AlertStatus::Safe
    };
    let signal = [Signal::Strong, Signal::Medium, Signal::Weak]
        .choose(rng)
        .cloned()
        .unwrap_or_default();

    Snapshot {
        location: Location {
            latitude: DEFAULT_LATITUDE + rng.random_range(-0.001..=0.001),
            longitude: DEFAULT_LONGITUDE + rng.random_range(-0.001..=0.001),
            address: "UiTM Melaka - Live Demo".to_string(),
        },
        system: SystemInfo {
            status: system_status,
            battery: rng.random_range(75..=100),
            signal,
        },
        sensors: Sensors {
            distance: rng.random_range(10..=100),
            alert_count: rng.random_range(5..=20),
        },
        alerts: Alerts {
            status: alert_status,
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            history: Default::default(),
        },
    }
}

/// Overwrite all four sections with `snapshot`.
pub async fn publish_snapshot(store: &dyn Store, snapshot: &Snapshot) -> Result<()> {
    for section in Section::ALL {
        store.put(section.path(), &snapshot.section_value(section)?).await?;
    }
    Ok(())
}

/// Publish a fresh random snapshot every `period` until `shutdown` resolves.
///
/// Write failures are logged and the loop carries on.
pub async fn populate_loop<F>(store: &dyn Store, period: Duration, shutdown: F) -> u64
where
    F: Future<Output = ()>,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut published = 0;
    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!(published, "Populate loop stopped");
                return published;
            }
            _ = ticker.tick() => {
                let snapshot = generate_snapshot(&mut rand::rng(), Local::now());
                match publish_snapshot(store, &snapshot).await {
                    Ok(()) => {
                        published += 1;
                        info!(
                            alert = snapshot.alerts.status.as_str(),
                            system = %snapshot.system.status,
                            distance = snapshot.sensors.distance,
                            "Data updated"
                        );
                    }
                    Err(e) => warn!(error = %e, "Failed to publish snapshot"),
                }
            }
        }
    }
}

/// One fully formed emergency.
#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyEvent {
    pub location: Location,
    /// `HH:MM:SS` local time of the event.
    pub timestamp: String,
    /// Epoch milliseconds, used as the history key.
    pub history_key: String,
}

impl EmergencyEvent {
    /// A random emergency somewhere in one of the [`DEMO_AREAS`].
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Local>) -> Self {
        let area = DEMO_AREAS.choose(rng).copied().unwrap_or(DEMO_AREAS[0]);
        let latitude = round6(rng.random_range(area.lat_min..=area.lat_max));
        let longitude = round6(rng.random_range(area.lon_min..=area.lon_max));

        Self {
            location: Location {
                latitude,
                longitude,
                address: area.name.to_string(),
            },
            timestamp: now.format("%H:%M:%S").to_string(),
            history_key: now.timestamp_millis().to_string(),
        }
    }

    /// The history feed line for this event.
    pub fn history_message(&self) -> String {
        format!(
            "🚨 Emergency at {} - {}",
            self.timestamp, self.location.address
        )
    }

    /// The demo-mode bot message.
    pub fn demo_message(&self) -> OutboundMessage {
        let Location {
            latitude,
            longitude,
            address,
        } = &self.location;
        OutboundMessage::markdown(format!(
            "🚨 *EMERGENCY ALERT*\n\
             \n\
             🎲 *Demo Mode - Random Location*\n\
             \n\
             📍 *Coordinates:* {latitude}, {longitude}\n\
             🏢 *Area:* {address}\n\
             ⏰ *Time:* {time}\n\
             \n\
             🗺️ [Open in Google Maps]({link})\n\
             \n\
             _This is a demo with random location_",
            time = self.timestamp,
            link = self.location.map_link(),
        ))
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Which steps of a simulated emergency succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmergencyReport {
    pub location: bool,
    pub alerts: bool,
    pub history: bool,
    pub system: bool,
    pub sensors: bool,
    pub notified: bool,
}

impl EmergencyReport {
    pub fn all_ok(&self) -> bool {
        self.location && self.alerts && self.history && self.system && self.sensors && self.notified
    }
}

fn step(name: &'static str, result: Result<()>) -> bool {
    match result {
        Ok(()) => {
            info!(step = name, "ok");
            true
        }
        Err(e) => {
            warn!(step = name, error = %e, "failed");
            false
        }
    }
}

/// Write `event` to every section and message the bot. Each step is independent.
pub async fn trigger_emergency(
    store: &dyn Store,
    channel: &dyn NotificationChannel,
    event: &EmergencyEvent,
) -> EmergencyReport {
    info!(
        area = %event.location.address,
        latitude = event.location.latitude,
        longitude = event.location.longitude,
        time = %event.timestamp,
        "Simulating emergency"
    );

    let location = match serde_json::to_value(&event.location) {
        Ok(value) => store.put(Section::Location.path(), &value).await,
        Err(e) => Err(e.into()),
    };

    // Merge so the history map next to status/timestamp survives.
    let alerts = store
        .patch(
            Section::Alerts.path(),
            &json!({ "status": AlertStatus::Emergency.as_str(), "timestamp": event.timestamp }),
        )
        .await;

    let mut entry = Map::new();
    entry.insert(event.history_key.clone(), Value::String(event.history_message()));
    let history = store.patch(HISTORY_PATH, &Value::Object(entry)).await;

    let system = store
        .put(
            Section::System.path(),
            &json!({ "status": SystemStatus::Emergency.as_str(), "battery": 85, "signal": Signal::Strong.as_str() }),
        )
        .await;

    // alert_count belongs to the device, so only the distance is touched.
    let sensors = store
        .patch(
            Section::Sensors.path(),
            &json!({ "distance": EMERGENCY_DISTANCE_CM }),
        )
        .await;

    let notified = channel.deliver(&event.demo_message()).await;

    EmergencyReport {
        location: step("location", location),
        alerts: step("alerts", alerts),
        history: step("history", history),
        system: step("system", system),
        sensors: step("sensors", sensors),
        notified: step("telegram", notified),
    }
}

/// How many emergencies to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationMode {
    /// One emergency.
    Single,
    /// `count` emergencies, `gap` apart.
    Repeat { count: u32, gap: Duration },
    /// One emergency every `interval` until stopped.
    Auto { interval: Duration },
}

/// Run emergency simulations until the mode is exhausted or `shutdown` resolves.
pub async fn run_simulation<F>(
    store: &dyn Store,
    channel: &dyn NotificationChannel,
    mode: SimulationMode,
    shutdown: F,
) -> Vec<EmergencyReport>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut reports = Vec::new();

    let (limit, pause) = match mode {
        SimulationMode::Single => (Some(1), Duration::ZERO),
        SimulationMode::Repeat { count, gap } => (Some(count), gap),
        SimulationMode::Auto { interval } => (None, interval),
    };

    let mut fired: u32 = 0;
    loop {
        if let Some(count) = limit {
            info!(alert = fired + 1, of = count, "Emergency");
        }
        let event = EmergencyEvent::generate(&mut rand::rng(), Local::now());
        reports.push(trigger_emergency(store, channel, &event).await);
        fired += 1;

        if limit.is_some_and(|count| fired >= count) {
            break;
        }

        info!(seconds = pause.as_secs(), "Waiting before next alert");
        tokio::select! {
            () = &mut shutdown => {
                info!(fired, "Simulation stopped");
                break;
            }
            () = time::sleep(pause) => {}
        }
    }

    reports
}
