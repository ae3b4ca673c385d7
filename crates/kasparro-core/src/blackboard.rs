//! Shared blackboard for agent collaboration
//!
//! A versioned key-value space agents post intermediate results to and read
//! their inputs from, without knowing who produced them. Every operation
//! goes through one blackboard-wide lock. Watchers run after the lock is
//! released, so a watcher may read or post again.

use crate::error::Result;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An entry on the shared blackboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackboardEntry {
    pub key: String,
    pub value: Value,
    /// Agent that last wrote this entry
    pub owner: String,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    /// Starts at 1, incremented by every post to the key
    pub version: u64,
    /// Union of every tag posted with the key
    pub tags: BTreeSet<String>,
}

/// Callback invoked with `(key, entry)` after the key changes
pub type Watcher = Arc<dyn Fn(&str, &BlackboardEntry) -> Result<()> + Send + Sync>;

/// Handle returned by [`Blackboard::watch`], used to unwatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

#[derive(Default)]
struct BoardState {
    entries: HashMap<String, BlackboardEntry>,
    watchers: HashMap<String, Vec<(WatcherId, Watcher)>>,
}

/// A shared knowledge space for multi-agent coordination
#[derive(Default)]
pub struct Blackboard {
    state: Mutex<BoardState>,
    next_watcher: AtomicU64,
}

impl Blackboard {
    /// Create an empty blackboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Post or update a value
    ///
    /// Updating an existing key bumps its version, refreshes `updated_at`,
    /// records `owner` as the latest writer and merges `tags`; `created_at`
    /// is kept. Watchers of the key are notified afterwards.
    pub fn post<I, S>(&self, key: &str, value: Value, owner: &str, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (entry, watchers) = {
            let mut state = self.state.lock();
            let now = Local::now();
            let entry = match state.entries.get_mut(key) {
                Some(entry) => {
                    entry.value = value;
                    entry.owner = owner.to_string();
                    entry.updated_at = now;
                    entry.version += 1;
                    entry.tags.extend(tags.into_iter().map(Into::into));
                    tracing::debug!(key, version = entry.version, owner, "Blackboard: updated");
                    entry.clone()
                }
                None => {
                    let entry = BlackboardEntry {
                        key: key.to_string(),
                        value,
                        owner: owner.to_string(),
                        created_at: now,
                        updated_at: now,
                        version: 1,
                        tags: tags.into_iter().map(Into::into).collect(),
                    };
                    state.entries.insert(key.to_string(), entry.clone());
                    tracing::debug!(key, owner, "Blackboard: posted");
                    entry
                }
            };
            let watchers: Vec<Watcher> = state
                .watchers
                .get(key)
                .map(|list| list.iter().map(|(_, w)| Arc::clone(w)).collect())
                .unwrap_or_default();
            (entry, watchers)
        };

        for watcher in &watchers {
            notify(watcher, key, &entry);
        }
    }

    /// Post a serializable value
    pub fn post_as<T, I, S>(&self, key: &str, value: &T, owner: &str, tags: I) -> Result<()>
    where
        T: Serialize,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let value = serde_json::to_value(value)?;
        self.post(key, value, owner, tags);
        Ok(())
    }

    /// Current value of a key
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.lock().entries.get(key).map(|e| e.value.clone())
    }

    /// Current value of a key, decoded into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Full entry, including metadata
    pub fn get_entry(&self, key: &str) -> Option<BlackboardEntry> {
        self.state.lock().entries.get(key).cloned()
    }

    /// All values carrying `tag`
    pub fn query_by_tag(&self, tag: &str) -> BTreeMap<String, Value> {
        self.state
            .lock()
            .entries
            .values()
            .filter(|e| e.tags.contains(tag))
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// All values last written by `owner`
    pub fn query_by_owner(&self, owner: &str) -> BTreeMap<String, Value> {
        self.state
            .lock()
            .entries
            .values()
            .filter(|e| e.owner == owner)
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// Check if a key exists
    pub fn exists(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Register a callback for changes to `key`
    pub fn watch(&self, key: &str, watcher: Watcher) -> WatcherId {
        let id = WatcherId(self.next_watcher.fetch_add(1, Ordering::SeqCst));
        self.state
            .lock()
            .watchers
            .entry(key.to_string())
            .or_default()
            .push((id, watcher));
        tracing::debug!(key, "Blackboard: watcher registered");
        id
    }

    /// Remove a watcher; returns whether it was registered for `key`
    pub fn unwatch(&self, key: &str, id: WatcherId) -> bool {
        let mut state = self.state.lock();
        let Some(list) = state.watchers.get_mut(key) else {
            return false;
        };
        let before = list.len();
        list.retain(|(wid, _)| *wid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            state.watchers.remove(key);
        }
        removed
    }

    /// Remove every entry; watchers stay registered
    pub fn clear(&self) {
        self.state.lock().entries.clear();
        tracing::debug!("Blackboard cleared");
    }

    /// All current values
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.state
            .lock()
            .entries
            .values()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Invoke one watcher, logging instead of propagating its failure
fn notify(watcher: &Watcher, key: &str, entry: &BlackboardEntry) {
    match panic::catch_unwind(AssertUnwindSafe(|| watcher(key, entry))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(key, "Blackboard watcher error: {}", e),
        Err(_) => tracing::error!(key, "Blackboard watcher panicked"),
    }
}
