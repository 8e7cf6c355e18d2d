//! Built want graphs: runtimes, external handles, and topology growth.
//!
//! A [`Graph`] is the output of [`builder::GraphBuilder::build`]: every
//! configured want instantiated, every selector resolved into a bounded
//! channel, every connectivity contract validated. The scheduler consumes
//! the graph; [`WantHandle`]s stay valid afterwards for inspection and live
//! param mutation.

pub mod builder;

use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{EngineConfig, WantMetadata};
use crate::packet::Packet;
use crate::paths::{ConnectivityContract, InputPath, OutputPath, PathSet};
use crate::state::WantState;
use crate::types::WantStatus;
use crate::want::{SharedParams, WantContext};

pub use builder::{BuildError, GraphBuilder};

/// Shared run-time record for one want: everything except the `Want`
/// instance itself, which the scheduler task owns exclusively.
pub(crate) struct WantRuntime {
    pub metadata: Arc<WantMetadata>,
    pub requires: Vec<String>,
    pub contract: ConnectivityContract,
    pub params: SharedParams,
    pub state: WantState,
    pub paths: PathSet,
    status: Mutex<WantStatus>,
    progress: AtomicU8,
}

impl WantRuntime {
    pub(crate) fn new(
        metadata: WantMetadata,
        requires: Vec<String>,
        contract: ConnectivityContract,
        params: FxHashMap<String, Value>,
    ) -> Self {
        Self {
            metadata: Arc::new(metadata),
            requires,
            contract,
            params: Arc::new(std::sync::RwLock::new(params)),
            state: WantState::new(),
            paths: PathSet::new(),
            status: Mutex::new(WantStatus::Idle),
            progress: AtomicU8::new(0),
        }
    }

    pub(crate) fn status(&self) -> WantStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Terminal statuses are one-way; a late transition attempt out of
    /// `Achieved` or `Failed` is ignored.
    pub(crate) fn set_status(&self, next: WantStatus) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        if !status.is_terminal() {
            *status = next;
        }
    }

    pub(crate) fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    pub(crate) fn set_progress(&self, pct: u8) {
        self.progress.store(pct.min(100), Ordering::Relaxed);
    }

    pub(crate) fn context(&self, engine: &EngineConfig) -> WantContext {
        WantContext::new(
            Arc::clone(&self.metadata),
            Arc::clone(&self.params),
            self.state.clone(),
            self.paths.clone(),
            engine.recv_timeout,
        )
    }
}

pub(crate) struct GraphNode {
    pub runtime: Arc<WantRuntime>,
    /// Taken by the scheduler when the run starts.
    pub want: Option<Box<dyn crate::want::Want + Send>>,
}

/// External view of one want: status, progress, state, live params.
///
/// Cheap to clone; remains valid after the run finishes.
#[derive(Clone)]
pub struct WantHandle {
    runtime: Arc<WantRuntime>,
}

impl WantHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.runtime.metadata.name
    }

    #[must_use]
    pub fn metadata(&self) -> &WantMetadata {
        &self.runtime.metadata
    }

    #[must_use]
    pub fn status(&self) -> WantStatus {
        self.runtime.status()
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.runtime.progress()
    }

    /// Shared state handle. Writes from here serialize with the want's own
    /// writes through the same lock.
    #[must_use]
    pub fn state(&self) -> WantState {
        self.runtime.state.clone()
    }

    #[must_use]
    pub fn state_snapshot(&self) -> FxHashMap<String, Value> {
        self.runtime.state.snapshot()
    }

    /// Producer names of this want's input channels, in channel order.
    #[must_use]
    pub fn input_producers(&self) -> Vec<String> {
        self.runtime
            .paths
            .snapshot()
            .inputs
            .iter()
            .map(|p| p.producer.clone())
            .collect()
    }

    /// Consumer names of this want's output channels, in channel order.
    #[must_use]
    pub fn output_consumers(&self) -> Vec<String> {
        self.runtime
            .paths
            .snapshot()
            .outputs
            .iter()
            .map(|p| p.consumer.clone())
            .collect()
    }

    /// Overwrites one param. The running want observes the new value on its
    /// next read.
    pub fn set_param(&self, key: impl Into<String>, value: Value) {
        self.runtime
            .params
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value);
    }

    #[must_use]
    pub fn params_snapshot(&self) -> FxHashMap<String, Value> {
        self.runtime
            .params
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl std::fmt::Debug for WantHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WantHandle")
            .field("want", &self.name())
            .field("status", &self.status())
            .finish()
    }
}

/// A validated, fully wired want graph, ready for the scheduler.
pub struct Graph {
    pub(crate) nodes: Vec<GraphNode>,
    pub(crate) by_name: FxHashMap<String, usize>,
    /// One channel per (producer, consumer) pair, kept for reuse on growth.
    pub(crate) channels: FxHashMap<(String, String), flume::Sender<Packet>>,
    pub(crate) engine: EngineConfig,
}

impl Graph {
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Want names in declaration order.
    #[must_use]
    pub fn want_names(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .map(|n| n.runtime.metadata.name.as_str())
            .collect()
    }

    #[must_use]
    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    #[must_use]
    pub fn handle(&self, name: &str) -> Option<WantHandle> {
        self.by_name.get(name).map(|&i| WantHandle {
            runtime: Arc::clone(&self.nodes[i].runtime),
        })
    }

    /// Connects `producer` to `consumer` with a new bounded channel. A
    /// channel that already exists for the pair is reused, making the call
    /// a no-op. The consumer observes the new input on its next step.
    pub fn attach_channel(&mut self, producer: &str, consumer: &str) -> Result<(), BuildError> {
        if self
            .channels
            .contains_key(&(producer.to_string(), consumer.to_string()))
        {
            return Ok(());
        }
        let producer_rt = Arc::clone(self.runtime(producer)?);
        let consumer_rt = Arc::clone(self.runtime(consumer)?);

        Self::check_input_headroom(&consumer_rt)?;
        if let Some(max) = producer_rt.contract.max_outputs
            && producer_rt.paths.output_count() + 1 > max
        {
            return Err(BuildError::TooManyOutputs {
                want: producer.to_string(),
                limit: max,
                connected: producer_rt.paths.output_count() + 1,
            });
        }

        let (tx, rx) = flume::bounded(self.engine.channel_capacity);
        producer_rt.paths.push_output(OutputPath {
            consumer: consumer.to_string(),
            tx: tx.clone(),
        });
        consumer_rt.paths.push_input(InputPath {
            producer: producer.to_string(),
            rx,
        });
        self.channels
            .insert((producer.to_string(), consumer.to_string()), tx);
        Ok(())
    }

    /// Attaches an input channel fed from outside the graph and returns its
    /// sending end. `producer_name` only labels the path; no want with that
    /// name needs to exist.
    pub fn attach_external_producer(
        &mut self,
        producer_name: &str,
        consumer: &str,
    ) -> Result<flume::Sender<Packet>, BuildError> {
        let consumer_rt = Arc::clone(self.runtime(consumer)?);
        Self::check_input_headroom(&consumer_rt)?;

        let (tx, rx) = flume::bounded(self.engine.channel_capacity);
        consumer_rt.paths.push_input(InputPath {
            producer: producer_name.to_string(),
            rx,
        });
        self.channels
            .insert((producer_name.to_string(), consumer.to_string()), tx.clone());
        Ok(tx)
    }

    fn check_input_headroom(runtime: &Arc<WantRuntime>) -> Result<(), BuildError> {
        if let Some(max) = runtime.contract.max_inputs
            && runtime.paths.input_count() + 1 > max
        {
            return Err(BuildError::TooManyInputs {
                want: runtime.metadata.name.clone(),
                limit: max,
                connected: runtime.paths.input_count() + 1,
            });
        }
        Ok(())
    }

    fn runtime(&self, name: &str) -> Result<&Arc<WantRuntime>, BuildError> {
        self.by_name
            .get(name)
            .map(|&i| &self.nodes[i].runtime)
            .ok_or_else(|| BuildError::UnknownWant {
                name: name.to_string(),
            })
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("wants", &self.want_names())
            .field("channels", &self.channels.len())
            .finish()
    }
}
