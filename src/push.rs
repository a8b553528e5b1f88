//! Push subscription registry.
//!
//! The portal core only registers subscriptions; a separate delivery worker
//! reads them from the store to target a user when the app is not active.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::{paths, RealtimeStore, StoreError};

/// A web-push subscription as handed over by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Store a user's push subscription, replacing any previous one for the
/// same user (a device re-subscribe rotates the keys).
pub async fn register_subscription(
    store: &dyn RealtimeStore,
    uid: &str,
    subscription: &PushSubscription,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(subscription).unwrap_or(Value::Null);
    store.write(&paths::push_subscription(uid), value).await?;
    tracing::debug!(uid, "Push subscription registered");
    Ok(())
}

/// Drop a user's push subscription (sign-out or permission revoked).
pub async fn unregister_subscription(
    store: &dyn RealtimeStore,
    uid: &str,
) -> Result<(), StoreError> {
    store.remove(&paths::push_subscription(uid)).await
}
