use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A patient-published location broadcast.
///
/// Keyed by patient uid under `sos_alerts/{patient}` — publishing overwrites
/// any prior alert, so a patient has at most one active alert at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SosAlert {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

impl SosAlert {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            timestamp: Utc::now(),
        }
    }

    /// Parse an alert from an untyped store record. Returns `None` when the
    /// coordinates are missing — an alert without a location is useless to
    /// the viewer and is dropped rather than surfaced at (0, 0).
    pub fn from_store(value: &Value) -> Option<Self> {
        let lat = value.get("lat")?.as_f64()?;
        let lng = value.get("lng")?.as_f64()?;
        let timestamp = value
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        Some(Self { lat, lng, timestamp })
    }

    pub fn to_store(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
