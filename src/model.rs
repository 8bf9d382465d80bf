//! Data models for Blindstick.
//!
//! The store holds four independently keyed sections (`location`, `alerts`,
//! `sensors`, `system`). [`RawSections`] is what comes back from the store,
//! untyped and possibly partial; [`Snapshot`] is the fully populated, typed
//! view every other component works with.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Latitude used when the store has no usable location.
pub const DEFAULT_LATITUDE: f64 = 2.0456;

/// Longitude used when the store has no usable location.
pub const DEFAULT_LONGITUDE: f64 = 102.5677;

/// Address used when the store has no usable location.
pub const DEFAULT_ADDRESS: &str = "UiTM Melaka";

/// Store path of the alert history map.
pub const HISTORY_PATH: &str = "alerts/history";

/// One of the four top-level sections of shared device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Location,
    Alerts,
    Sensors,
    System,
}

impl Section {
    /// All sections.
    pub const ALL: [Section; 4] = [
        Section::Location,
        Section::Alerts,
        Section::Sensors,
        Section::System,
    ];

    /// The store path (top-level key) of this section.
    pub fn path(self) -> &'static str {
        match self {
            Section::Location => "location",
            Section::Alerts => "alerts",
            Section::Sensors => "sensors",
            Section::System => "system",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Untyped section bodies as returned by the store.
///
/// `None` means the section was absent, empty or failed to load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSections {
    pub location: Option<Value>,
    pub alerts: Option<Value>,
    pub sensors: Option<Value>,
    pub system: Option<Value>,
}

impl RawSections {
    pub fn get(&self, section: Section) -> Option<&Value> {
        match section {
            Section::Location => self.location.as_ref(),
            Section::Alerts => self.alerts.as_ref(),
            Section::Sensors => self.sensors.as_ref(),
            Section::System => self.system.as_ref(),
        }
    }

    pub fn set(&mut self, section: Section, value: Option<Value>) {
        let slot = match section {
            Section::Location => &mut self.location,
            Section::Alerts => &mut self.alerts,
            Section::Sensors => &mut self.sensors,
            Section::System => &mut self.system,
        };
        *slot = value;
    }
}

/// Where the wearer is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            address: DEFAULT_ADDRESS.to_string(),
        }
    }
}

impl Location {
    /// Google Maps link pointing at this location.
    pub fn map_link(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Device status as reported by the stick. Unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SystemStatus {
    #[default]
    Active,
    Emergency,
    Other(String),
}

impl SystemStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SystemStatus::Active => "ACTIVE",
            SystemStatus::Emergency => "EMERGENCY",
            SystemStatus::Other(s) => s,
        }
    }
}

impl From<String> for SystemStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ACTIVE" => SystemStatus::Active,
            "EMERGENCY" => SystemStatus::Emergency,
            _ => SystemStatus::Other(s),
        }
    }
}

impl From<SystemStatus> for String {
    fn from(status: SystemStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cellular signal quality. Unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Signal {
    #[default]
    Strong,
    Medium,
    Weak,
    Other(String),
}

impl Signal {
    pub fn as_str(&self) -> &str {
        match self {
            Signal::Strong => "Strong",
            Signal::Medium => "Medium",
            Signal::Weak => "Weak",
            Signal::Other(s) => s,
        }
    }
}

impl From<String> for Signal {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Strong" => Signal::Strong,
            "Medium" => Signal::Medium,
            "Weak" => Signal::Weak,
            _ => Signal::Other(s),
        }
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        signal.as_str().to_string()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub status: SystemStatus,
    /// Battery charge in percent, 0 to 100.
    pub battery: u8,
    pub signal: Signal,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            status: SystemStatus::Active,
            battery: 85,
            signal: Signal::Strong,
        }
    }
}

/// Obstacle sensor readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensors {
    /// Distance to the nearest obstacle in centimeters.
    pub distance: u32,
    /// Alerts raised today. Maintained by the device, never by us.
    pub alert_count: u64,
}

impl Default for Sensors {
    fn default() -> Self {
        Self {
            distance: 50,
            alert_count: 0,
        }
    }
}

/// Whether the wearer has raised an emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    #[default]
    Safe,
    Emergency,
}

impl AlertStatus {
    /// Exact-match parse of the store representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SAFE" => Some(AlertStatus::Safe),
            "EMERGENCY" => Some(AlertStatus::Emergency),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Safe => "SAFE",
            AlertStatus::Emergency => "EMERGENCY",
        }
    }
}

/// Alert state plus the raw history feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alerts {
    pub status: AlertStatus,
    /// `HH:MM:SS` or a full `YYYY-MM-DD HH:MM:SS` datetime, as written by the device.
    pub timestamp: String,
    /// History messages keyed by (usually) epoch milliseconds.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub history: BTreeMap<String, String>,
}

impl Default for Alerts {
    fn default() -> Self {
        Self {
            status: AlertStatus::Safe,
            timestamp: "00:00:00".to_string(),
            history: BTreeMap::new(),
        }
    }
}

impl Alerts {
    /// The time to show next to the alert status.
    ///
    /// Placeholder timestamps (`N/A`, `00:00:00`, empty) are replaced by `now`.
    pub fn display_time(&self, now: &str) -> String {
        match self.timestamp.as_str() {
            "" | "N/A" | "00:00:00" => now.to_string(),
            ts => ts.to_string(),
        }
    }
}

/// A complete, typed view of the device state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub location: Location,
    pub alerts: Alerts,
    pub sensors: Sensors,
    pub system: SystemInfo,
}

impl Snapshot {
    /// Serialize one section the way it is laid out in the store.
    pub fn section_value(&self, section: Section) -> serde_json::Result<Value> {
        match section {
            Section::Location => serde_json::to_value(&self.location),
            Section::Alerts => serde_json::to_value(&self.alerts),
            Section::Sensors => serde_json::to_value(&self.sensors),
            Section::System => serde_json::to_value(&self.system),
        }
    }

    /// Turn the snapshot back into store-shaped raw sections.
    pub fn to_raw(&self) -> RawSections {
        let mut raw = RawSections::default();
        for section in Section::ALL {
            raw.set(section, self.section_value(section).ok());
        }
        raw
    }
}

/// Obstacle proximity band shown on the distance gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceBand {
    /// Closer than 30 cm.
    Alert,
    /// 30 cm up to (not including) 50 cm.
    Caution,
    /// 50 cm or more.
    Clear,
}

impl DistanceBand {
    pub fn classify(distance_cm: u32) -> Self {
        if distance_cm < 30 {
            DistanceBand::Alert
        } else if distance_cm < 50 {
            DistanceBand::Caution
        } else {
            DistanceBand::Clear
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DistanceBand::Alert => "Obstacle nearby!",
            DistanceBand::Caution => "Caution zone",
            DistanceBand::Clear => "Clear path",
        }
    }
}

/// Gauge fill in percent. Only the gauge clamps; alert decisions use the raw distance.
pub fn distance_progress(distance_cm: u32) -> u8 {
    u8::try_from(distance_cm.min(100)).unwrap_or(100)
}

/// How an alert feed entry should be highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryCategory {
    Emergency,
    Warning,
    Info,
}

/// One row of the alert feed, derived fresh on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// `HH:MM:SS` display time.
    pub time: String,
    pub category: HistoryCategory,
    pub message: String,
    /// Epoch milliseconds parsed from the history key, 0 if unparseable.
    pub sort_key: i64,
}
