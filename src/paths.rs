//! Channel endpoints and connectivity contracts.
//!
//! The builder turns resolved selector matches into bounded flume channels.
//! Each channel has exactly one [`InputPath`] on the consumer and one
//! [`OutputPath`] on the producer, both referring to the same underlying
//! channel. A want's endpoints live in a [`PathSet`] behind a shared lock so
//! the topology can grow while the want is running; wants snapshot the set
//! at the start of each step and therefore observe newly attached channels
//! on their next cycle.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::packet::Packet;

/// Input/output bounds a want type declares to the builder.
///
/// `None` maxima mean unbounded. `deferred_outputs` exempts the type from
/// minimum-output validation for topologies where downstream consumers are
/// attached after the build (source-like types).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ConnectivityContract {
    #[serde(default)]
    pub min_inputs: usize,
    #[serde(default)]
    pub max_inputs: Option<usize>,
    #[serde(default)]
    pub min_outputs: usize,
    #[serde(default)]
    pub max_outputs: Option<usize>,
    #[serde(default)]
    pub deferred_outputs: bool,
}

impl ConnectivityContract {
    /// No inputs, at least one output expected eventually but not at build
    /// time.
    #[must_use]
    pub fn source() -> Self {
        Self {
            min_inputs: 0,
            max_inputs: Some(0),
            min_outputs: 0,
            max_outputs: None,
            deferred_outputs: true,
        }
    }

    /// Exactly one input, any number of outputs.
    #[must_use]
    pub fn pipe() -> Self {
        Self {
            min_inputs: 1,
            max_inputs: Some(1),
            min_outputs: 0,
            max_outputs: None,
            deferred_outputs: true,
        }
    }

    /// Any number of inputs, no outputs required.
    #[must_use]
    pub fn fan_in() -> Self {
        Self {
            min_inputs: 0,
            max_inputs: None,
            min_outputs: 0,
            max_outputs: None,
            deferred_outputs: false,
        }
    }
}

/// Receiving end of one channel, tagged with the producer's name.
#[derive(Clone)]
pub struct InputPath {
    pub producer: String,
    pub rx: flume::Receiver<Packet>,
}

/// Sending end of one channel, tagged with the consumer's name.
#[derive(Clone)]
pub struct OutputPath {
    pub consumer: String,
    pub tx: flume::Sender<Packet>,
}

/// A want's channel endpoints at one moment in time.
#[derive(Clone, Default)]
pub struct Paths {
    pub inputs: Vec<InputPath>,
    pub outputs: Vec<OutputPath>,
}

impl Paths {
    /// Input channel indices keyed by producer name. Indices are stable:
    /// growth only appends.
    #[must_use]
    pub fn input_index(&self) -> FxHashMap<String, usize> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(i, p)| (p.producer.clone(), i))
            .collect()
    }
}

/// Shared, growable set of channel endpoints for one want.
#[derive(Clone, Default)]
pub struct PathSet {
    inner: Arc<RwLock<Paths>>,
}

impl PathSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clones the current endpoints. Taken once per step so a want sees a
    /// consistent view for the whole cycle.
    #[must_use]
    pub fn snapshot(&self) -> Paths {
        self.read().clone()
    }

    pub fn push_input(&self, path: InputPath) {
        self.write().inputs.push(path);
    }

    pub fn push_output(&self, path: OutputPath) {
        self.write().outputs.push(path);
    }

    #[must_use]
    pub fn input_count(&self) -> usize {
        self.read().inputs.len()
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.read().outputs.len()
    }

    /// Whether an input from `producer` already exists.
    #[must_use]
    pub fn has_input_from(&self, producer: &str) -> bool {
        self.read().inputs.iter().any(|p| p.producer == producer)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Paths> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Paths> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for PathSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let paths = self.read();
        f.debug_struct("PathSet")
            .field("inputs", &paths.inputs.len())
            .field("outputs", &paths.outputs.len())
            .finish()
    }
}
