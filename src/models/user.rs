use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::Role;

/// A user record from the realtime store (`users/{uid}`).
///
/// Role relations:
/// - patient → `doctor_id` (assigned doctor), `caregiver_id` (optional)
/// - doctor  → `patient_ids` (roster of managed patients)
/// - caregiver → discovered by reverse scan: the patient record points at
///   the caregiver, not the other way around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub name: String,
    /// `None` until the user picks a role after first sign-in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caregiver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patient_ids: Vec<String>,
}

impl UserProfile {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            role: None,
            doctor_id: None,
            caregiver_id: None,
            patient_ids: Vec::new(),
        }
    }

    /// Build a profile from an untyped store record. An unrecognized role
    /// string is treated as no role, never an error — the caller renders
    /// the no-role view in that case.
    pub fn from_store(uid: &str, value: &Value) -> Self {
        let role = value
            .get("role")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Role>().ok());
        let patient_ids = value
            .get("patientIds")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            uid: uid.to_string(),
            name: value
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            role,
            doctor_id: opt_str(value, "doctorId"),
            caregiver_id: opt_str(value, "caregiverId"),
            patient_ids,
        }
    }

    pub fn to_store(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Is this uid on the doctor's roster?
    pub fn manages_patient(&self, patient_uid: &str) -> bool {
        self.patient_ids.iter().any(|id| id == patient_uid)
    }
}

fn opt_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}
