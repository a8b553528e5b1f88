//! Realtime data gateway — the single source of truth for shared portal data.
//!
//! The managed backend is abstracted behind [`RealtimeStore`]: slash-separated
//! paths holding untyped JSON, eventually-consistent snapshot reads, and
//! subscriptions that re-fire the current value on every change until
//! disposed. Components hold read-through projections only, never
//! authoritative copies.
//!
//! [`MemoryStore`] is the in-process implementation (local mode and tests):
//! a JSON tree behind a mutex with per-subscription `watch` fan-out. A
//! network backend adapter implements the same trait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

/// Errors from gateway reads and writes.
///
/// Best-effort writes (alarm acknowledgement, calendar flags) log these at
/// warn and move on; user-initiated actions surface them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store path not found: {0}")]
    NotFound(String),
    #[error("Store write failed at {path}: {reason}")]
    WriteFailed { path: String, reason: String },
    #[error("Store backend unavailable: {0}")]
    Unavailable(String),
}

/// The external realtime store surface the portal consumes.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Snapshot read of the value at `path` (`Null` when absent).
    async fn read(&self, path: &str) -> Result<Value, StoreError>;

    /// Replace the value at `path`, creating intermediate nodes.
    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Merge `fields` into the object at `path` (partial update).
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Append `value` under `collection` with a store-assigned key.
    async fn push(&self, collection: &str, value: Value) -> Result<String, StoreError>;

    /// Delete the value at `path`. Deleting an absent path is a no-op.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Live subscription to `path`: current value immediately, re-fired on
    /// every change, until the returned subscription is dropped.
    fn subscribe(&self, path: &str) -> Subscription;
}

/// Well-known store paths.
pub mod paths {
    pub fn users() -> String {
        "users".to_string()
    }

    pub fn user(uid: &str) -> String {
        format!("users/{uid}")
    }

    pub fn tasks(patient_uid: &str) -> String {
        format!("users/{patient_uid}/tasks")
    }

    pub fn task(patient_uid: &str, task_id: &str) -> String {
        format!("users/{patient_uid}/tasks/{task_id}")
    }

    pub fn sos_alerts() -> String {
        "sos_alerts".to_string()
    }

    pub fn sos_alert(patient_uid: &str) -> String {
        format!("sos_alerts/{patient_uid}")
    }

    pub fn push_subscription(uid: &str) -> String {
        format!("push_subscriptions/{uid}")
    }
}

// ═══════════════════════════════════════════════════════════
// Subscription — cancellable change stream
// ═══════════════════════════════════════════════════════════

/// A live view of one store path.
///
/// Dropping the subscription disposes it exactly once — the store stops
/// fanning out changes to it. Leaked subscriptions are how a torn-down view
/// keeps firing, so every mount/unmount cycle must own one of these.
pub struct Subscription {
    rx: watch::Receiver<Value>,
    _disposer: Disposer,
}

impl Subscription {
    /// The most recently observed value (`Null` when the path is absent).
    pub fn current(&self) -> Value {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. Returns `false` once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

struct Disposer {
    id: u64,
    registry: Weak<Mutex<HashMap<u64, SubEntry>>>,
}

impl Drop for Disposer {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut subs) = registry.lock() {
                subs.remove(&self.id);
            }
        }
    }
}

struct SubEntry {
    path: String,
    tx: watch::Sender<Value>,
}

// ═══════════════════════════════════════════════════════════
// MemoryStore
// ═══════════════════════════════════════════════════════════

/// In-process store: a JSON tree plus subscription fan-out.
///
/// Every mutation recomputes each subscribed subtree and notifies only the
/// subscriptions whose view actually changed. Last write wins; there is no
/// conflict resolution, matching the managed backend it stands in for.
pub struct MemoryStore {
    root: Mutex<Value>,
    subs: Arc<Mutex<HashMap<u64, SubEntry>>>,
    next_sub: AtomicU64,
    next_key: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: Mutex::new(Value::Object(Map::new())),
            subs: Arc::new(Mutex::new(HashMap::new())),
            next_sub: AtomicU64::new(1),
            next_key: AtomicU64::new(1),
        }
    }

    /// Active subscription count (observability + leak tests).
    pub fn subscription_count(&self) -> usize {
        self.subs.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn fan_out(&self) {
        let root = match self.root.lock() {
            Ok(root) => root.clone(),
            Err(_) => return,
        };
        if let Ok(subs) = self.subs.lock() {
            for entry in subs.values() {
                let view = value_at(&root, &entry.path);
                entry.tx.send_if_modified(|current| {
                    if *current != view {
                        *current = view.clone();
                        true
                    } else {
                        false
                    }
                });
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Value, StoreError> {
        let root = self
            .root
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
        Ok(value_at(&root, path))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        {
            let mut root = self
                .root
                .lock()
                .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
            set_at(&mut root, path, value).map_err(|reason| StoreError::WriteFailed {
                path: path.to_string(),
                reason,
            })?;
        }
        self.fan_out();
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        {
            let mut root = self
                .root
                .lock()
                .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
            let mut merged = match value_at(&root, path) {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                _ => {
                    return Err(StoreError::WriteFailed {
                        path: path.to_string(),
                        reason: "update target is not an object".into(),
                    })
                }
            };
            for (key, value) in fields {
                merged.insert(key, value);
            }
            set_at(&mut root, path, Value::Object(merged)).map_err(|reason| {
                StoreError::WriteFailed {
                    path: path.to_string(),
                    reason,
                }
            })?;
        }
        self.fan_out();
        Ok(())
    }

    async fn push(&self, collection: &str, value: Value) -> Result<String, StoreError> {
        let key = format!("k{:08}", self.next_key.fetch_add(1, Ordering::Relaxed));
        self.write(&format!("{collection}/{key}"), value).await?;
        Ok(key)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        {
            let mut root = self
                .root
                .lock()
                .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
            remove_at(&mut root, path);
        }
        self.fan_out();
        Ok(())
    }

    fn subscribe(&self, path: &str) -> Subscription {
        let initial = self
            .root
            .lock()
            .map(|root| value_at(&root, path))
            .unwrap_or(Value::Null);
        let (tx, rx) = watch::channel(initial);
        let id = self.next_sub.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut subs) = self.subs.lock() {
            subs.insert(
                id,
                SubEntry {
                    path: path.to_string(),
                    tx,
                },
            );
        }
        Subscription {
            rx,
            _disposer: Disposer {
                id,
                registry: Arc::downgrade(&self.subs),
            },
        }
    }
}

// ── Path navigation ─────────────────────────────────────────

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn value_at(root: &Value, path: &str) -> Value {
    let mut current = root;
    for segment in segments(path) {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    current.clone()
}

fn set_at(root: &mut Value, path: &str, value: Value) -> Result<(), String> {
    let parts: Vec<&str> = segments(path).collect();
    if parts.is_empty() {
        return Err("empty path".into());
    }
    let mut current = root;
    for segment in &parts[..parts.len() - 1] {
        let map = match current.as_object_mut() {
            Some(map) => map,
            None => return Err(format!("segment '{segment}' is not an object")),
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    match current.as_object_mut() {
        Some(map) => {
            map.insert(parts[parts.len() - 1].to_string(), value);
            Ok(())
        }
        None => Err("parent is not an object".into()),
    }
}

fn remove_at(root: &mut Value, path: &str) {
    let parts: Vec<&str> = segments(path).collect();
    if parts.is_empty() {
        return;
    }
    let mut current = root;
    for segment in &parts[..parts.len() - 1] {
        match current.get_mut(*segment) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Some(map) = current.as_object_mut() {
        map.remove(parts[parts.len() - 1]);
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn read_absent_path_is_null() {
        let store = MemoryStore::new();
        assert_eq!(store.read("users/nobody").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = MemoryStore::new();
        store
            .write("users/p1", json!({ "name": "Ada" }))
            .await
            .unwrap();
        assert_eq!(
            store.read("users/p1/name").await.unwrap(),
            json!("Ada")
        );
    }

    #[tokio::test]
    async fn write_creates_intermediate_nodes() {
        let store = MemoryStore::new();
        store
            .write("users/p1/tasks/t1", json!({ "text": "walk" }))
            .await
            .unwrap();
        let tasks = store.read("users/p1/tasks").await.unwrap();
        assert!(tasks.get("t1").is_some());
    }

    #[tokio::test]
    async fn update_merges_fields_preserving_others() {
        let store = MemoryStore::new();
        store
            .write("users/p1/tasks/t1", json!({ "text": "walk", "completed": false }))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("completed".into(), json!(true));
        store.update("users/p1/tasks/t1", fields).await.unwrap();

        let task = store.read("users/p1/tasks/t1").await.unwrap();
        assert_eq!(task["text"], "walk");
        assert_eq!(task["completed"], true);
    }

    #[tokio::test]
    async fn update_on_absent_path_creates_object() {
        let store = MemoryStore::new();
        let mut fields = Map::new();
        fields.insert("theme".into(), json!("light"));
        store.update("users/p1", fields).await.unwrap();
        assert_eq!(store.read("users/p1/theme").await.unwrap(), json!("light"));
    }

    #[tokio::test]
    async fn push_assigns_distinct_keys() {
        let store = MemoryStore::new();
        let a = store.push("users/p1/tasks", json!({ "text": "a" })).await.unwrap();
        let b = store.push("users/p1/tasks", json!({ "text": "b" })).await.unwrap();
        assert_ne!(a, b);

        let tasks = store.read("users/p1/tasks").await.unwrap();
        assert_eq!(tasks.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn remove_deletes_subtree_and_tolerates_absent() {
        let store = MemoryStore::new();
        store.write("sos_alerts/p1", json!({ "lat": 1.0 })).await.unwrap();
        store.remove("sos_alerts/p1").await.unwrap();
        assert_eq!(store.read("sos_alerts/p1").await.unwrap(), Value::Null);
        // absent path: no-op
        store.remove("sos_alerts/p1").await.unwrap();
    }

    #[tokio::test]
    async fn subscribe_sees_initial_then_changes() {
        let store = MemoryStore::new();
        store.write("users/p1", json!({ "name": "Ada" })).await.unwrap();

        let mut sub = store.subscribe("users/p1");
        assert_eq!(sub.current()["name"], "Ada");

        store.write("users/p1/name", json!("Grace")).await.unwrap();
        assert!(sub.changed().await);
        assert_eq!(sub.current()["name"], "Grace");
    }

    #[tokio::test]
    async fn unrelated_write_does_not_fire_subscription() {
        let store = MemoryStore::new();
        let sub = store.subscribe("users/p1");
        store.write("users/p2", json!({ "name": "x" })).await.unwrap();
        // No change to the subscribed subtree
        assert_eq!(sub.current(), Value::Null);
    }

    #[tokio::test]
    async fn dropping_subscription_disposes_it() {
        let store = MemoryStore::new();
        let sub = store.subscribe("users/p1");
        assert_eq!(store.subscription_count(), 1);
        drop(sub);
        assert_eq!(store.subscription_count(), 0);
    }

    #[tokio::test]
    async fn second_subscriber_sees_same_data() {
        let store = MemoryStore::new();
        store.write("sos_alerts/p1", json!({ "lat": 1.0, "lng": 2.0 })).await.unwrap();

        let first = store.subscribe("sos_alerts");
        let second = store.subscribe("sos_alerts");
        assert_eq!(first.current(), second.current());
    }
}
