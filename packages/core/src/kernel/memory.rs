//! In-memory `BaseStore` implementation.
//!
//! Backs every test in this crate and doubles as a reference for what the
//! real backend binding must provide. Values live in a flat map keyed by
//! node path; reads assemble a node from its own value, any value embedded
//! in a stored ancestor, and all descendant keys, mirroring how a realtime
//! tree store lets you write at one granularity and read at another.
//!
//! Change fan-out is a topic-keyed broadcast hub: subscribing to a path
//! yields the current value plus every subsequent change at or beneath it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::store::{BaseStore, StoreError, StoreEvent, Subscription};

const CHANNEL_CAPACITY: usize = 64;

/// Thread-safe, cloneable in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tree: Arc<RwLock<BTreeMap<String, Value>>>,
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<StoreEvent>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn notify(&self, changes: &[(String, Value)]) {
        let mut channels = self.channels.write().await;
        // Dropping a Subscription drops its receiver; prune senders no one
        // is listening to so the topic map does not grow forever
        channels.retain(|_, tx| tx.receiver_count() > 0);
        for (path, value) in changes {
            for (topic, tx) in channels.iter() {
                if related(topic, path) {
                    let _ = tx.send(StoreEvent {
                        path: path.clone(),
                        value: if value.is_null() {
                            None
                        } else {
                            Some(value.clone())
                        },
                    });
                }
            }
        }
    }
}

#[async_trait]
impl BaseStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let tree = self.tree.read().await;
        Ok(read_tree(&tree, path))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        {
            let mut tree = self.tree.write().await;
            apply_write(&mut tree, path, value.clone());
        }
        self.notify(&[(path.to_string(), value)]).await;
        Ok(())
    }

    async fn update(&self, changes: Vec<(String, Value)>) -> Result<(), StoreError> {
        {
            // One lock across all paths: atomic within the call
            let mut tree = self.tree.write().await;
            for (path, value) in &changes {
                apply_write(&mut tree, path, value.clone());
            }
        }
        self.notify(&changes).await;
        Ok(())
    }

    async fn append(&self, collection: &str, value: Value) -> Result<String, StoreError> {
        // v7 keys are time-ordered, matching the backend's push-key behavior
        let key = Uuid::now_v7().to_string();
        let path = format!("{collection}/{key}");
        {
            let mut tree = self.tree.write().await;
            apply_write(&mut tree, &path, value.clone());
        }
        self.notify(&[(path, value)]).await;
        Ok(key)
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<Value>,
        new: Value,
    ) -> Result<bool, StoreError> {
        let swapped = {
            let mut tree = self.tree.write().await;
            if read_tree(&tree, path) != expected {
                false
            } else {
                apply_write(&mut tree, path, new.clone());
                true
            }
        };
        if swapped {
            self.notify(&[(path.to_string(), new)]).await;
        }
        Ok(swapped)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        {
            let mut tree = self.tree.write().await;
            apply_write(&mut tree, path, Value::Null);
        }
        self.notify(&[(path.to_string(), Value::Null)]).await;
        Ok(())
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        let events = {
            let mut channels = self.channels.write().await;
            channels
                .entry(path.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe()
        };
        let snapshot = {
            let tree = self.tree.read().await;
            read_tree(&tree, path)
        };
        Ok(Subscription { snapshot, events })
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A change at `path` is visible to a subscription on `topic` when either
/// is an ancestor of the other.
fn related(topic: &str, path: &str) -> bool {
    topic == path
        || path.starts_with(&format!("{topic}/"))
        || topic.starts_with(&format!("{path}/"))
}

/// Assemble the value at `path` from the exact key, the nearest stored
/// ancestor's embedded field, and all descendant keys.
fn read_tree(tree: &BTreeMap<String, Value>, path: &str) -> Option<Value> {
    let mut assembled = tree.get(path).cloned();

    if assembled.is_none() {
        let segments: Vec<&str> = path.split('/').collect();
        for cut in (1..segments.len()).rev() {
            let ancestor = segments[..cut].join("/");
            if let Some(value) = tree.get(&ancestor) {
                assembled = descend(value, &segments[cut..]);
                break;
            }
        }
    }

    let prefix = format!("{path}/");
    for (key, value) in tree.range(prefix.clone()..) {
        if !key.starts_with(&prefix) {
            break;
        }
        let rel: Vec<&str> = key[prefix.len()..].split('/').collect();
        let root = assembled.get_or_insert_with(|| Value::Object(Map::new()));
        insert_nested(root, &rel, value.clone());
    }

    assembled.filter(|value| !value.is_null())
}

/// Overwrite the node at `path`: descendant keys and any field embedded in
/// a stored ancestor go away, so a later read sees exactly `value`.
/// `Value::Null` is a removal.
fn apply_write(tree: &mut BTreeMap<String, Value>, path: &str, value: Value) {
    let prefix = format!("{path}/");
    let stale: Vec<String> = tree
        .range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .map(|(key, _)| key.clone())
        .collect();
    for key in stale {
        tree.remove(&key);
    }
    tree.remove(path);
    strip_from_ancestor(tree, path);
    if !value.is_null() {
        tree.insert(path.to_string(), value);
    }
}

fn strip_from_ancestor(tree: &mut BTreeMap<String, Value>, path: &str) {
    let segments: Vec<&str> = path.split('/').collect();
    for cut in (1..segments.len()).rev() {
        let ancestor = segments[..cut].join("/");
        if let Some(value) = tree.get_mut(&ancestor) {
            remove_nested(value, &segments[cut..]);
            return;
        }
    }
}

fn descend(value: &Value, segments: &[&str]) -> Option<Value> {
    let mut current = value;
    for segment in segments {
        current = current.get(segment)?;
    }
    Some(current.clone())
}

fn insert_nested(root: &mut Value, segments: &[&str], value: Value) {
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
        if segments.len() == 1 {
            map.insert(segments[0].to_string(), value);
        } else {
            let child = map
                .entry(segments[0].to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            insert_nested(child, &segments[1..], value);
        }
    }
}

fn remove_nested(root: &mut Value, segments: &[&str]) {
    let Value::Object(map) = root else { return };
    if segments.len() == 1 {
        map.remove(segments[0]);
    } else if let Some(child) = map.get_mut(segments[0]) {
        remove_nested(child, &segments[1..]);
    }
}
