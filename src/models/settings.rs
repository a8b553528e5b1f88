use serde::{Deserialize, Serialize};

use super::enums::{AlarmSound, Theme};

/// Device-local user preferences.
///
/// Persisted in the local SQLite database, never in the shared store — API
/// keys stay on the device. Absence of a saved record loads as the default
/// `{theme: dark, alarm: beep}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Settings {
    pub theme: Theme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    pub alarm: AlarmSound,
}
