//! The [`Want`] trait and the per-want execution context.
//!
//! A want is a goal-seeking unit: the scheduler drives its [`Want::step`]
//! function in a loop until it reports [`StepOutcome::Done`], its
//! [`Want::is_achieved`] check turns true, or it returns an error. Each step
//! gets a [`WantContext`] giving access to the want's identity, live params,
//! state map, and channel endpoints.
//!
//! Steps are cooperative: a step does a bounded amount of work (typically one
//! bounded-timeout receive via [`WantContext::recv_any`]) and returns
//! `Pending`. Blocking on a single channel inside one step is legal for
//! single-input wants, but the polling style is what every built-in type
//! uses.
//!
//! # Implementing a want
//!
//! ```rust
//! use async_trait::async_trait;
//! use serde_json::json;
//! use wantgraph::types::StepOutcome;
//! use wantgraph::want::{Want, WantContext, WantError};
//!
//! struct Counter {
//!     emitted: i64,
//! }
//!
//! #[async_trait]
//! impl Want for Counter {
//!     async fn step(&mut self, ctx: &WantContext) -> Result<StepOutcome, WantError> {
//!         let target = ctx.param_i64("count").unwrap_or(3);
//!         if self.emitted >= target {
//!             ctx.send_end().await;
//!             return Ok(StepOutcome::Done);
//!         }
//!         ctx.send_all(wantgraph::packet::Packet::data(json!(self.emitted)))
//!             .await;
//!         self.emitted += 1;
//!         ctx.state().stage("emitted", json!(self.emitted));
//!         Ok(StepOutcome::Pending)
//!     }
//!
//!     fn is_achieved(&self, ctx: &WantContext) -> bool {
//!         ctx.state().get_i64("emitted").unwrap_or(0) >= ctx.param_i64("count").unwrap_or(3)
//!     }
//! }
//! ```

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use thiserror::Error;

use crate::config::WantMetadata;
use crate::packet::Packet;
use crate::paths::PathSet;
use crate::state::WantState;
use crate::types::StepOutcome;

/// Live parameter map, shared between the running want and external handles.
pub type SharedParams = Arc<RwLock<FxHashMap<String, Value>>>;

/// Error a step invocation can surface. Any error is unrecoverable for the
/// want: the scheduler marks it `Failed`, end-signals its outputs, and lets
/// the rest of the graph keep running.
#[derive(Debug, Error, Diagnostic)]
pub enum WantError {
    #[error("want failed: {message}")]
    #[diagnostic(
        code(wantgraph::want::fatal),
        help("inspect the want's state map for partial progress before the failure")
    )]
    Fatal { message: String },

    #[error("missing required param `{key}`")]
    #[diagnostic(
        code(wantgraph::want::missing_param),
        help("set the param in the want's spec or via WantHandle::set_param")
    )]
    MissingParam { key: String },

    #[error("malformed payload")]
    #[diagnostic(code(wantgraph::want::payload))]
    Payload(#[from] serde_json::Error),
}

impl WantError {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }
}

/// Outcome of one bounded receive attempt across a want's input channels.
#[derive(Debug)]
pub enum RecvOutcome {
    /// A packet arrived on the input channel at `channel` (positional index
    /// into the step's path snapshot). End markers are delivered like any
    /// other packet; the channel is not polled again afterwards.
    Received { channel: usize, packet: Packet },
    /// No packet arrived within the timeout.
    Idle,
    /// Every input channel has ended or disconnected.
    Closed,
}

/// Everything a want can touch during a step: identity, live params, state,
/// and channel endpoints.
///
/// Cheap to clone; clones share the same underlying params, state, and paths.
#[derive(Clone)]
pub struct WantContext {
    metadata: Arc<WantMetadata>,
    params: SharedParams,
    state: WantState,
    paths: PathSet,
    recv_timeout: Duration,
    ended_inputs: Arc<Mutex<FxHashSet<usize>>>,
}

impl WantContext {
    #[must_use]
    pub fn new(
        metadata: Arc<WantMetadata>,
        params: SharedParams,
        state: WantState,
        paths: PathSet,
        recv_timeout: Duration,
    ) -> Self {
        Self {
            metadata,
            params,
            state,
            paths,
            recv_timeout,
            ended_inputs: Arc::new(Mutex::new(FxHashSet::default())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub fn metadata(&self) -> &WantMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn state(&self) -> &WantState {
        &self.state
    }

    /// Params are read through the shared lock on every call, so external
    /// mutation via a handle takes effect on the want's next read.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<Value> {
        self.params
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    #[must_use]
    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.param(key).as_ref().and_then(crate::utils::as_i64)
    }

    #[must_use]
    pub fn param_bool(&self, key: &str) -> Option<bool> {
        self.param(key).as_ref().and_then(crate::utils::as_bool)
    }

    #[must_use]
    pub fn param_string(&self, key: &str) -> Option<String> {
        self.param(key)
            .as_ref()
            .and_then(|v| v.as_str().map(str::to_owned))
    }

    /// Number of input channels currently connected, including ones whose
    /// stream has already ended.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.paths.input_count()
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.paths.output_count()
    }

    /// Endpoints snapshot, for wants that need producer names or direct
    /// channel access.
    #[must_use]
    pub fn paths(&self) -> crate::paths::Paths {
        self.paths.snapshot()
    }

    /// Waits up to the engine's default receive timeout for a packet on any
    /// live input channel.
    pub async fn recv_any(&self) -> RecvOutcome {
        self.recv_any_timeout(self.recv_timeout).await
    }

    /// Waits up to `timeout` for a packet on any live input channel.
    ///
    /// Channels that delivered an end marker are skipped on later calls. A
    /// producer that drops its sender without sending an end marker is
    /// reported as a synthesized end packet on that channel.
    pub async fn recv_any_timeout(&self, timeout: Duration) -> RecvOutcome {
        let live: Vec<(usize, flume::Receiver<Packet>)> = {
            let snap = self.paths.snapshot();
            let ended = self.lock_ended();
            snap.inputs
                .iter()
                .enumerate()
                .filter(|(i, _)| !ended.contains(i))
                .map(|(i, p)| (i, p.rx.clone()))
                .collect()
        };
        if live.is_empty() {
            return if self.paths.input_count() == 0 {
                RecvOutcome::Idle
            } else {
                RecvOutcome::Closed
            };
        }

        let futures: Vec<_> = live
            .iter()
            .map(|(_, rx)| Box::pin(rx.recv_async()))
            .collect();
        match tokio::time::timeout(timeout, futures_util::future::select_all(futures)).await {
            Err(_) => RecvOutcome::Idle,
            Ok((Ok(packet), slot, _rest)) => {
                let channel = live[slot].0;
                if packet.is_end() {
                    self.lock_ended().insert(channel);
                }
                RecvOutcome::Received { channel, packet }
            }
            Ok((Err(_), slot, _rest)) => {
                let channel = live[slot].0;
                self.lock_ended().insert(channel);
                RecvOutcome::Received {
                    channel,
                    packet: Packet::end(),
                }
            }
        }
    }

    /// Sends `packet` to every output channel, tagging it with this want's
    /// name if it has no source yet. Blocks on full channels (bounded-channel
    /// backpressure). Returns how many consumers received it; disconnected
    /// consumers are skipped.
    pub async fn send_all(&self, packet: Packet) -> usize {
        let mut packet = packet;
        if packet.source.is_none() {
            packet = packet.with_source(self.name());
        }
        let outputs = self.paths.snapshot().outputs;
        let mut delivered = 0;
        for out in outputs {
            if out.tx.send_async(packet.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// End-signals every output channel.
    pub async fn send_end(&self) -> usize {
        self.send_all(Packet::end()).await
    }

    fn lock_ended(&self) -> std::sync::MutexGuard<'_, FxHashSet<usize>> {
        self.ended_inputs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for WantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WantContext")
            .field("want", &self.metadata.name)
            .field("type", &self.metadata.type_name)
            .field("paths", &self.paths)
            .finish()
    }
}

/// A goal-seeking unit of work.
///
/// Implementations hold their own in-memory working state; anything that
/// should be observable from outside goes through `ctx.state()`.
#[async_trait]
pub trait Want: Send {
    /// One-time hook before the first step. Default: nothing.
    fn init(&mut self, _ctx: &WantContext) {}

    /// One cycle of work. The scheduler brackets each call with a state
    /// batch cycle; all `ctx.state()` writes made here commit together when
    /// the call returns.
    async fn step(&mut self, ctx: &WantContext) -> Result<StepOutcome, WantError>;

    /// Goal predicate, checked by the scheduler around every step. Must be
    /// monotone: once true it stays true for the rest of the run.
    fn is_achieved(&self, ctx: &WantContext) -> bool;

    /// Coarse progress in percent for reporting. Default: 0 until achieved.
    fn progress(&self, ctx: &WantContext) -> u8 {
        if self.is_achieved(ctx) { 100 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::InputPath;
    use serde_json::json;

    fn test_context(paths: PathSet) -> WantContext {
        let metadata = Arc::new(WantMetadata {
            id: uuid::Uuid::new_v4(),
            name: "probe".into(),
            type_name: "test".into(),
            labels: FxHashMap::default(),
        });
        WantContext::new(
            metadata,
            Arc::new(RwLock::new(FxHashMap::default())),
            WantState::new(),
            paths,
            Duration::from_millis(20),
        )
    }

    #[tokio::test]
    async fn recv_reports_idle_with_no_inputs() {
        let ctx = test_context(PathSet::new());
        assert!(matches!(ctx.recv_any().await, RecvOutcome::Idle));
    }

    #[tokio::test]
    async fn ended_channel_is_not_polled_again() {
        let paths = PathSet::new();
        let (tx, rx) = flume::bounded(4);
        paths.push_input(InputPath {
            producer: "p".into(),
            rx,
        });
        let ctx = test_context(paths);

        tx.send(Packet::end()).unwrap();
        match ctx.recv_any().await {
            RecvOutcome::Received { channel, packet } => {
                assert_eq!(channel, 0);
                assert!(packet.is_end());
            }
            other => panic!("expected end packet, got {other:?}"),
        }
        assert!(matches!(ctx.recv_any().await, RecvOutcome::Closed));
    }

    #[tokio::test]
    async fn dropped_producer_synthesizes_end() {
        let paths = PathSet::new();
        let (tx, rx) = flume::bounded::<Packet>(4);
        paths.push_input(InputPath {
            producer: "p".into(),
            rx,
        });
        let ctx = test_context(paths);

        drop(tx);
        match ctx.recv_any().await {
            RecvOutcome::Received { packet, .. } => assert!(packet.is_end()),
            other => panic!("expected synthesized end, got {other:?}"),
        }
        assert!(matches!(ctx.recv_any().await, RecvOutcome::Closed));
    }

    #[tokio::test]
    async fn send_all_tags_source() {
        let paths = PathSet::new();
        let (tx, rx) = flume::bounded(4);
        paths.push_output(crate::paths::OutputPath {
            consumer: "c".into(),
            tx,
        });
        let ctx = test_context(paths);

        let delivered = ctx.send_all(Packet::data(json!(1))).await;
        assert_eq!(delivered, 1);
        let packet = rx.recv().unwrap();
        assert_eq!(packet.source.as_deref(), Some("probe"));
    }
}
