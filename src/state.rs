//! Per-want key/value state with batched write cycles.
//!
//! Every want owns a [`WantState`]: a string-keyed map of JSON values behind
//! a mutex. The scheduler brackets each step invocation with
//! [`WantState::begin_cycle`] / [`WantState::flush_cycle`] so that all writes
//! staged during one step commit together under a single lock acquisition.
//! Reads overlay pending writes over committed values, so a step always sees
//! its own staged writes.
//!
//! The handle is cheaply cloneable and safe to share with monitoring tasks;
//! a write from outside a cycle commits immediately.
//!
//! # Examples
//!
//! ```rust
//! use wantgraph::state::WantState;
//! use serde_json::json;
//!
//! let state = WantState::new();
//! state.begin_cycle();
//! state.stage("processed", json!(3));
//! assert_eq!(state.get("processed"), Some(json!(3)));
//! state.flush_cycle();
//! assert_eq!(state.get("processed"), Some(json!(3)));
//! ```

use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct StateInner {
    committed: FxHashMap<String, Value>,
    pending: FxHashMap<String, Value>,
    in_cycle: bool,
}

/// Shared, lock-protected state map for one want.
#[derive(Clone, Default)]
pub struct WantState {
    inner: Arc<Mutex<StateInner>>,
}

impl WantState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a batch cycle. Writes staged until the matching
    /// [`flush_cycle`](Self::flush_cycle) are buffered.
    pub fn begin_cycle(&self) {
        let mut inner = self.lock();
        inner.in_cycle = true;
    }

    /// Commits all pending writes in one critical section and closes the
    /// cycle. A flush without staged writes is a no-op.
    pub fn flush_cycle(&self) {
        let mut inner = self.lock();
        inner.in_cycle = false;
        if inner.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut inner.pending);
        inner.committed.extend(pending);
    }

    /// Stages one write. Inside a cycle the write is buffered until flush;
    /// outside a cycle it commits immediately.
    pub fn stage(&self, key: impl Into<String>, value: Value) {
        let mut inner = self.lock();
        if inner.in_cycle {
            inner.pending.insert(key.into(), value);
        } else {
            inner.committed.insert(key.into(), value);
        }
    }

    /// Stages several writes at once.
    pub fn stage_many(&self, entries: impl IntoIterator<Item = (String, Value)>) {
        let mut inner = self.lock();
        if inner.in_cycle {
            inner.pending.extend(entries);
        } else {
            inner.committed.extend(entries);
        }
    }

    /// Reads a value, overlaying pending writes over committed ones.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let inner = self.lock();
        inner
            .pending
            .get(key)
            .or_else(|| inner.committed.get(key))
            .cloned()
    }

    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).as_ref().and_then(crate::utils::as_i64)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).as_ref().and_then(crate::utils::as_bool)
    }

    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .as_ref()
            .and_then(|v| v.as_str().map(str::to_owned))
    }

    /// Snapshot of the visible state: committed values with pending writes
    /// overlaid.
    #[must_use]
    pub fn snapshot(&self) -> FxHashMap<String, Value> {
        let inner = self.lock();
        let mut out = inner.committed.clone();
        out.extend(inner.pending.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        let inner = self.lock();
        inner.committed.is_empty() && inner.pending.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StateInner> {
        // A poisoned lock means a panic mid-write; the map itself is still
        // a consistent FxHashMap, so recover the guard.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for WantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WantState")
            .field("entries", &self.len())
            .finish()
    }
}
