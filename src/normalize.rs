//! Turns raw store sections into a complete [`Snapshot`].
//!
//! Defaulting is per field, never per section: a `system` section that is
//! missing only `battery` keeps its `status` and `signal`. Numbers may arrive
//! as JSON numbers or numeric strings. Anything that cannot be coerced falls
//! back to the field's default and is logged as a malformed field.
//!
//! `normalize(&normalize(raw).to_raw()) == normalize(raw)` for every input.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Error;
use crate::model::{
    AlertStatus, Alerts, Location, RawSections, Section, Sensors, Signal, Snapshot, SystemInfo,
    SystemStatus,
};

/// Build a fully populated snapshot from possibly partial raw sections.
pub fn normalize(raw: &RawSections) -> Snapshot {
    Snapshot {
        location: normalize_location(&Fields::new(Section::Location, raw.location.as_ref())),
        alerts: normalize_alerts(&Fields::new(Section::Alerts, raw.alerts.as_ref())),
        sensors: normalize_sensors(&Fields::new(Section::Sensors, raw.sensors.as_ref())),
        system: normalize_system(&Fields::new(Section::System, raw.system.as_ref())),
    }
}

fn normalize_location(fields: &Fields<'_>) -> Location {
    let defaults = Location::default();
    Location {
        latitude: fields.float_in("latitude", -90.0, 90.0, defaults.latitude),
        longitude: fields.float_in("longitude", -180.0, 180.0, defaults.longitude),
        address: fields.text("address").unwrap_or(defaults.address),
    }
}

fn normalize_alerts(fields: &Fields<'_>) -> Alerts {
    let defaults = Alerts::default();

    let status = match fields.text("status") {
        None => defaults.status,
        Some(s) => AlertStatus::parse(&s).unwrap_or_else(|| {
            fields.malformed("status");
            defaults.status
        }),
    };

    Alerts {
        status,
        timestamp: fields.text("timestamp").unwrap_or(defaults.timestamp),
        history: fields.history("history"),
    }
}

fn normalize_sensors(fields: &Fields<'_>) -> Sensors {
    let defaults = Sensors::default();
    Sensors {
        distance: fields.integer_in("distance", 0, u32::MAX.into(), defaults.distance.into()),
        alert_count: fields.integer_in("alert_count", 0, i64::MAX, 0),
    }
}

fn normalize_system(fields: &Fields<'_>) -> SystemInfo {
    let defaults = SystemInfo::default();
    SystemInfo {
        status: fields
            .text("status")
            .map(SystemStatus::from)
            .unwrap_or(defaults.status),
        battery: fields.integer_in("battery", 0, 100, defaults.battery.into()),
        signal: fields
            .text("signal")
            .map(Signal::from)
            .unwrap_or(defaults.signal),
    }
}

/// Field accessor over one raw section.
struct Fields<'a> {
    section: &'static str,
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    fn new(section: Section, value: Option<&'a Value>) -> Self {
        let map = match value {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                warn!(section = %section, "section is not an object, using defaults");
                None
            }
        };
        Self {
            section: section.path(),
            map,
        }
    }

    /// The field's value, treating explicit `null` as absent.
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map
            .and_then(|m| m.get(field))
            .filter(|v| !v.is_null())
    }

    fn malformed(&self, field: &'static str) {
        let error = Error::MalformedField {
            section: self.section,
            field,
        };
        warn!(error = %error, "Malformed field");
    }

    fn float_in(&self, field: &'static str, min: f64, max: f64, default: f64) -> f64 {
        let Some(value) = self.get(field) else {
            return default;
        };
        match as_f64(value) {
            Some(v) if (min..=max).contains(&v) => v,
            _ => {
                self.malformed(field);
                default
            }
        }
    }

    /// Integer field clamped to `[min, max]`.
    fn integer_in<T>(&self, field: &'static str, min: i64, max: i64, default: i64) -> T
    where
        T: TryFrom<i64> + Default,
    {
        let value = match self.get(field) {
            None => default,
            Some(value) => match as_i64(value) {
                Some(v) => v.clamp(min, max),
                None => {
                    self.malformed(field);
                    default
                }
            },
        };
        T::try_from(value).unwrap_or_default()
    }

    /// Non-empty text field. Numbers and booleans are stringified.
    fn text(&self, field: &'static str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => {
                self.malformed(field);
                None
            }
        }
    }

    fn history(&self, field: &'static str) -> BTreeMap<String, String> {
        let mut history = BTreeMap::new();
        match self.get(field) {
            None => {}
            Some(Value::Object(entries)) => {
                for (key, value) in entries {
                    if let Some(message) = history_message(value) {
                        history.insert(key.clone(), message);
                    }
                }
            }
            // Firebase returns sequential integer keys as an array.
            Some(Value::Array(entries)) => {
                for (index, value) in entries.iter().enumerate() {
                    if let Some(message) = history_message(value) {
                        history.insert(index.to_string(), message);
                    }
                }
            }
            Some(_) => self.malformed(field),
        }
        history
    }
}

fn history_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Integer coercion that truncates fractional values.
#[allow(clippy::cast_possible_truncation)]
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}
