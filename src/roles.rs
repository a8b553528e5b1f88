//! Role resolution and dashboard dispatch.
//!
//! The role is read once from the profile after sign-in; there is no live
//! role-change handling — a changed role needs a fresh resolve. The
//! dashboard is a single dispatch over {patient, doctor, caregiver, unset}.

use crate::gateway::{paths, RealtimeStore, StoreError};
use crate::models::{Role, UserProfile};

/// Which dashboard a session renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardKind {
    Patient,
    Doctor,
    Caregiver,
    /// No role picked yet, or an unrecognized role string in the store.
    NoRole,
}

impl DashboardKind {
    pub fn for_role(role: Option<Role>) -> Self {
        match role {
            Some(Role::Patient) => Self::Patient,
            Some(Role::Doctor) => Self::Doctor,
            Some(Role::Caregiver) => Self::Caregiver,
            None => Self::NoRole,
        }
    }
}

/// One-shot profile read. An absent record resolves to an empty profile
/// with no role (fresh accounts render the no-role view).
pub async fn resolve_profile(
    store: &dyn RealtimeStore,
    uid: &str,
) -> Result<UserProfile, StoreError> {
    let value = store.read(&paths::user(uid)).await?;
    Ok(UserProfile::from_store(uid, &value))
}

/// Resolve the profile and pick the dashboard in one step.
pub async fn resolve_dashboard(
    store: &dyn RealtimeStore,
    uid: &str,
) -> Result<(UserProfile, DashboardKind), StoreError> {
    let profile = resolve_profile(store, uid).await?;
    let dashboard = DashboardKind::for_role(profile.role);
    Ok((profile, dashboard))
}

/// Caregiver → patient discovery by reverse scan: the patient record points
/// at the caregiver, so the caregiver walks the user collection looking for
/// a record with `caregiverId == self`.
pub async fn find_assigned_patient(
    store: &dyn RealtimeStore,
    caregiver_uid: &str,
) -> Result<Option<String>, StoreError> {
    let users = store.read(&paths::users()).await?;
    let found = users.as_object().and_then(|map| {
        map.iter().find_map(|(uid, body)| {
            let profile = UserProfile::from_store(uid, body);
            (profile.caregiver_id.as_deref() == Some(caregiver_uid)).then(|| uid.clone())
        })
    });
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryStore;
    use serde_json::json;

    #[test]
    fn doctor_role_renders_doctor_view() {
        assert_eq!(
            DashboardKind::for_role(Some(Role::Doctor)),
            DashboardKind::Doctor
        );
    }

    #[test]
    fn missing_role_renders_no_role_view() {
        assert_eq!(DashboardKind::for_role(None), DashboardKind::NoRole);
    }

    #[tokio::test]
    async fn unrecognized_role_string_falls_back_to_no_role() {
        let store = MemoryStore::new();
        store
            .write(&paths::user("u1"), json!({ "role": "superuser" }))
            .await
            .unwrap();
        let (_, dashboard) = resolve_dashboard(&store, "u1").await.unwrap();
        assert_eq!(dashboard, DashboardKind::NoRole);
    }

    #[tokio::test]
    async fn absent_profile_resolves_to_no_role() {
        let store = MemoryStore::new();
        let (profile, dashboard) = resolve_dashboard(&store, "ghost").await.unwrap();
        assert_eq!(profile.uid, "ghost");
        assert_eq!(dashboard, DashboardKind::NoRole);
    }

    #[tokio::test]
    async fn role_change_needs_fresh_resolve() {
        let store = MemoryStore::new();
        store
            .write(&paths::user("u1"), json!({ "role": "patient" }))
            .await
            .unwrap();
        let (_, first) = resolve_dashboard(&store, "u1").await.unwrap();
        assert_eq!(first, DashboardKind::Patient);

        store
            .write(&paths::user("u1"), json!({ "role": "doctor" }))
            .await
            .unwrap();
        let (_, second) = resolve_dashboard(&store, "u1").await.unwrap();
        assert_eq!(second, DashboardKind::Doctor);
    }

    #[tokio::test]
    async fn reverse_scan_finds_assigned_patient() {
        let store = MemoryStore::new();
        store
            .write(
                &paths::users(),
                json!({
                    "p1": { "role": "patient", "caregiverId": "c1" },
                    "p2": { "role": "patient" },
                    "d1": { "role": "doctor" },
                }),
            )
            .await
            .unwrap();

        let found = find_assigned_patient(&store, "c1").await.unwrap();
        assert_eq!(found.as_deref(), Some("p1"));

        let none = find_assigned_patient(&store, "c9").await.unwrap();
        assert!(none.is_none());
    }
}
