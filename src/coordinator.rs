//! Fan-in coordination with grace-window completion.
//!
//! A [`Coordinator`] is a want that aggregates packets from every input
//! channel through a pluggable [`DataHandler`] and declares completion once
//! each currently connected channel has contributed at least one packet and
//! no further packet has arrived within the configured grace window. End
//! markers count as a channel's contribution, so producers that finish
//! without data do not stall the coordinator.
//!
//! The coordinator keeps observable bookkeeping in its state map:
//!
//! - `data_by_channel`: last accepted payload per channel index
//! - `total_packets_received`: accepted packet count
//! - `last_packet_time`: unix millis of the last accepted packet
//! - `achieving_percentage`: heard channels over connected channels
//! - the handler's completion key (default `coordinator_completed`), set to
//!   `true` exactly once
//!
//! Finalization is one-way. Channels attached after finalization do not
//! reopen it. With zero connected channels the coordinator waits; channels
//! may still be attached while it runs.
//!
//! # Examples
//!
//! ```rust
//! use wantgraph::coordinator::{Coordinator, CollectLastHandler, CompletionPolicy};
//! use std::time::Duration;
//!
//! let coordinator = Coordinator::new(Box::new(CollectLastHandler::default()))
//!     .with_policy(CompletionPolicy::with_grace(Duration::from_millis(200)));
//! ```

use async_trait::async_trait;
use chrono::Utc;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::paths::ConnectivityContract;
use crate::types::StepOutcome;
use crate::want::{RecvOutcome, Want, WantContext, WantError};

/// Default state key set to `true` on finalization.
pub const DEFAULT_COMPLETION_KEY: &str = "coordinator_completed";

/// State key holding the last accepted payload per channel index.
pub const DATA_BY_CHANNEL_KEY: &str = "data_by_channel";
/// State key counting accepted packets.
pub const TOTAL_PACKETS_KEY: &str = "total_packets_received";
/// State key holding the unix-millis timestamp of the last accepted packet.
pub const LAST_PACKET_TIME_KEY: &str = "last_packet_time";
/// State key holding the heard/connected percentage.
pub const ACHIEVING_PERCENTAGE_KEY: &str = "achieving_percentage";

/// Domain-specific aggregation plugged into a [`Coordinator`].
///
/// `process` returning `false` rejects the packet: it is logged and dropped,
/// the channel does not count as heard for it, and the coordinator carries
/// on.
pub trait DataHandler: Send {
    fn process(&mut self, channel: usize, payload: &Value) -> bool;

    /// Extra state entries written at finalization.
    fn state_updates(&self) -> FxHashMap<String, Value> {
        FxHashMap::default()
    }

    fn completion_key(&self) -> &str {
        DEFAULT_COMPLETION_KEY
    }
}

/// Accepts every packet and remembers the latest payload per channel.
#[derive(Debug, Default)]
pub struct CollectLastHandler {
    latest: FxHashMap<usize, Value>,
}

impl DataHandler for CollectLastHandler {
    fn process(&mut self, channel: usize, payload: &Value) -> bool {
        self.latest.insert(channel, payload.clone());
        true
    }
}

/// When to declare completion after the all-heard condition holds.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompletionPolicy {
    /// Quiet window required after the last accepted packet. Zero finalizes
    /// on the same step that completes the heard set.
    pub grace: Duration,
}

impl CompletionPolicy {
    #[must_use]
    pub fn with_grace(grace: Duration) -> Self {
        Self { grace }
    }
}

/// Fan-in want aggregating all inputs through a [`DataHandler`].
pub struct Coordinator {
    handler: Box<dyn DataHandler>,
    policy: CompletionPolicy,
    heard: FxHashSet<usize>,
    data_by_channel: Map<String, Value>,
    total_received: u64,
    last_packet_at: Option<Instant>,
    all_heard_at: Option<Instant>,
    finalized: bool,
}

impl Coordinator {
    #[must_use]
    pub fn new(handler: Box<dyn DataHandler>) -> Self {
        Self {
            handler,
            policy: CompletionPolicy::default(),
            heard: FxHashSet::default(),
            data_by_channel: Map::new(),
            total_received: 0,
            last_packet_at: None,
            all_heard_at: None,
            finalized: false,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Contract for registering coordinator types: any number of inputs
    /// (zero included, so channels can attach later), outputs optional.
    #[must_use]
    pub fn contract() -> ConnectivityContract {
        ConnectivityContract::fan_in()
    }

    fn record_accepted(&mut self, channel: usize, payload: &Value, ctx: &WantContext) {
        self.heard.insert(channel);
        self.total_received += 1;
        self.last_packet_at = Some(Instant::now());
        self.data_by_channel
            .insert(channel.to_string(), payload.clone());
        ctx.state().stage(
            DATA_BY_CHANNEL_KEY,
            Value::Object(self.data_by_channel.clone()),
        );
        ctx.state()
            .stage(TOTAL_PACKETS_KEY, json!(self.total_received));
        ctx.state()
            .stage(LAST_PACKET_TIME_KEY, json!(Utc::now().timestamp_millis()));
    }

    async fn finalize(&mut self, ctx: &WantContext) {
        self.finalized = true;
        ctx.state().stage_many(self.handler.state_updates());
        ctx.state()
            .stage(self.handler.completion_key().to_string(), json!(true));
        ctx.state().stage(ACHIEVING_PERCENTAGE_KEY, json!(100));
        debug!(
            want = ctx.name(),
            packets = self.total_received,
            channels = self.heard.len(),
            "coordinator finalized"
        );
        ctx.send_end().await;
    }
}

#[async_trait]
impl Want for Coordinator {
    async fn step(&mut self, ctx: &WantContext) -> Result<StepOutcome, WantError> {
        if self.finalized {
            return Ok(StepOutcome::Done);
        }

        match ctx.recv_any().await {
            RecvOutcome::Received { channel, packet } => {
                if packet.is_end() {
                    self.heard.insert(channel);
                } else if self.handler.process(channel, &packet.payload) {
                    self.record_accepted(channel, &packet.payload, ctx);
                } else {
                    warn!(
                        want = ctx.name(),
                        channel,
                        source = packet.source.as_deref().unwrap_or(""),
                        "handler rejected packet, dropping"
                    );
                }
            }
            RecvOutcome::Idle | RecvOutcome::Closed => {}
        }

        let connected = ctx.input_count();
        let pct = if connected == 0 {
            0
        } else {
            ((self.heard.len() * 100 / connected).min(100)) as u8
        };
        ctx.state().stage(ACHIEVING_PERCENTAGE_KEY, json!(pct));

        // With nothing connected there is nothing to hear from yet; channels
        // may still be attached, so keep waiting.
        if connected == 0 {
            return Ok(StepOutcome::Pending);
        }

        if self.heard.len() >= connected {
            let now = Instant::now();
            let all_heard_at = *self.all_heard_at.get_or_insert(now);
            let baseline = match self.last_packet_at {
                Some(last) if last > all_heard_at => last,
                _ => all_heard_at,
            };
            if now.duration_since(baseline) >= self.policy.grace {
                self.finalize(ctx).await;
                return Ok(StepOutcome::Done);
            }
        } else {
            // a newly attached channel reopens the wait
            self.all_heard_at = None;
        }
        Ok(StepOutcome::Pending)
    }

    fn is_achieved(&self, ctx: &WantContext) -> bool {
        self.finalized || ctx.state().get_bool(self.handler.completion_key()) == Some(true)
    }

    fn progress(&self, ctx: &WantContext) -> u8 {
        if self.finalized {
            return 100;
        }
        let connected = ctx.input_count();
        if connected == 0 {
            0
        } else {
            ((self.heard.len() * 100 / connected).min(100)) as u8
        }
    }
}
