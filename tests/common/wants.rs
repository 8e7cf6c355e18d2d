//! Fixture want types shared by the integration tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use wantgraph::coordinator::{CollectLastHandler, CompletionPolicy, Coordinator};
use wantgraph::packet::Packet;
use wantgraph::paths::ConnectivityContract;
use wantgraph::registry::WantTypeRegistry;
use wantgraph::types::StepOutcome;
use wantgraph::want::{RecvOutcome, Want, WantContext, WantError};

/// Emits the integers `0..count` (param `count`, default 3), one per step,
/// then end-signals and finishes.
pub struct Sequence {
    emitted: i64,
}

impl Sequence {
    pub fn new() -> Self {
        Self { emitted: 0 }
    }
}

#[async_trait]
impl Want for Sequence {
    async fn step(&mut self, ctx: &WantContext) -> Result<StepOutcome, WantError> {
        let count = ctx.param_i64("count").unwrap_or(3);
        if self.emitted >= count {
            ctx.send_end().await;
            return Ok(StepOutcome::Done);
        }
        ctx.send_all(Packet::data(json!(self.emitted))).await;
        self.emitted += 1;
        ctx.state().stage("emitted", json!(self.emitted));
        Ok(StepOutcome::Pending)
    }

    fn is_achieved(&self, _ctx: &WantContext) -> bool {
        false
    }
}

/// Forwards data packets from its single input, adding param `add`
/// (default 0) to numeric payloads. Forwards the end marker before
/// finishing.
pub struct Relay;

#[async_trait]
impl Want for Relay {
    async fn step(&mut self, ctx: &WantContext) -> Result<StepOutcome, WantError> {
        match ctx.recv_any().await {
            RecvOutcome::Received { packet, .. } => {
                if packet.is_end() {
                    ctx.send_end().await;
                    return Ok(StepOutcome::Done);
                }
                let add = ctx.param_i64("add").unwrap_or(0);
                let payload = wantgraph::utils::as_i64(&packet.payload)
                    .map(|v| json!(v + add))
                    .unwrap_or(packet.payload);
                ctx.send_all(Packet::data(payload)).await;
                let forwarded = ctx.state().get_i64("forwarded").unwrap_or(0) + 1;
                ctx.state().stage("forwarded", json!(forwarded));
                Ok(StepOutcome::Pending)
            }
            RecvOutcome::Idle => Ok(StepOutcome::Pending),
            RecvOutcome::Closed => {
                ctx.send_end().await;
                Ok(StepOutcome::Done)
            }
        }
    }

    fn is_achieved(&self, _ctx: &WantContext) -> bool {
        false
    }
}

/// Appends every data payload to the `received` array in its state map and
/// finishes once all input streams have ended.
pub struct Sink;

#[async_trait]
impl Want for Sink {
    async fn step(&mut self, ctx: &WantContext) -> Result<StepOutcome, WantError> {
        match ctx.recv_any().await {
            RecvOutcome::Received { packet, .. } => {
                if !packet.is_end() {
                    let mut received = ctx
                        .state()
                        .get("received")
                        .and_then(|v| v.as_array().cloned())
                        .unwrap_or_default();
                    received.push(packet.payload);
                    ctx.state().stage("received", Value::Array(received));
                }
                Ok(StepOutcome::Pending)
            }
            RecvOutcome::Idle => Ok(StepOutcome::Pending),
            RecvOutcome::Closed => Ok(StepOutcome::Done),
        }
    }

    fn is_achieved(&self, _ctx: &WantContext) -> bool {
        false
    }
}

/// Emits packets until param `fail_after` (default 1) steps have run, then
/// fails.
pub struct Flaky {
    steps: i64,
}

impl Flaky {
    pub fn new() -> Self {
        Self { steps: 0 }
    }
}

#[async_trait]
impl Want for Flaky {
    async fn step(&mut self, ctx: &WantContext) -> Result<StepOutcome, WantError> {
        let fail_after = ctx.param_i64("fail_after").unwrap_or(1);
        if self.steps >= fail_after {
            return Err(WantError::fatal("synthetic failure"));
        }
        ctx.send_all(Packet::data(json!(self.steps))).await;
        self.steps += 1;
        Ok(StepOutcome::Pending)
    }

    fn is_achieved(&self, _ctx: &WantContext) -> bool {
        false
    }
}

/// Spins until param `release` turns true.
pub struct Gate;

#[async_trait]
impl Want for Gate {
    async fn step(&mut self, ctx: &WantContext) -> Result<StepOutcome, WantError> {
        if ctx.param_bool("release").unwrap_or(false) {
            Ok(StepOutcome::Done)
        } else {
            Ok(StepOutcome::Pending)
        }
    }

    fn is_achieved(&self, _ctx: &WantContext) -> bool {
        false
    }
}

/// Registry with every fixture type plus a coordinator whose grace window
/// comes from param `grace_ms`.
pub fn registry() -> WantTypeRegistry {
    let mut registry = WantTypeRegistry::new();
    registry.register("sequence", ConnectivityContract::source(), |_m, _s| {
        Box::new(Sequence::new())
    });
    registry.register("relay", ConnectivityContract::pipe(), |_m, _s| Box::new(Relay));
    registry.register("sink", ConnectivityContract::fan_in(), |_m, _s| Box::new(Sink));
    registry.register("flaky", ConnectivityContract::source(), |_m, _s| {
        Box::new(Flaky::new())
    });
    registry.register("gate", ConnectivityContract::default(), |_m, _s| Box::new(Gate));
    registry.register("coordinator", Coordinator::contract(), |_m, spec| {
        let grace_ms = spec
            .params
            .get("grace_ms")
            .and_then(wantgraph::utils::as_i64)
            .unwrap_or(0);
        Box::new(
            Coordinator::new(Box::new(CollectLastHandler::default())).with_policy(
                CompletionPolicy::with_grace(Duration::from_millis(grace_ms as u64)),
            ),
        )
    });
    registry
}
