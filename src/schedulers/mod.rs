//! Execution scheduler: one task per want, join-all, terminal accounting.
//!
//! [`Scheduler::run_to_completion`] spawns one tokio task per want in the
//! graph and drives each through the progression loop:
//!
//! 1. status to `Running`, one-time `init`
//! 2. required capabilities resolved through the capability boundary
//! 3. repeat: achieved check, state batch cycle around `step`, progress
//!    update, poll-interval sleep on `Pending`
//! 4. terminal transition (`Achieved` or `Failed`)
//!
//! A failing want does not abort the run: its outputs are end-signaled so
//! downstream consumers can finish, its siblings keep running, and the final
//! [`RunReport`] flags `any_failed`.

use chrono::Utc;
use miette::Diagnostic;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::capability::{self, CapabilityExecutor, NoopCapabilityExecutor};
use crate::config::EngineConfig;
use crate::graphs::{Graph, WantRuntime};
use crate::report::{RunReport, WantReport};
use crate::types::{StepOutcome, WantStatus};
use crate::want::Want;

/// State key recording the error message of a failed want.
pub const FAILURE_MESSAGE_KEY: &str = "failure_message";

#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    #[error("want task aborted")]
    #[diagnostic(
        code(wantgraph::scheduler::join),
        help("a want panicked; check logs for the panic message")
    )]
    Join(#[from] tokio::task::JoinError),
}

/// Drives a built [`Graph`] to completion.
pub struct Scheduler {
    capability: Arc<dyn CapabilityExecutor>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// A scheduler whose capability boundary rejects every capability name.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capability: Arc::new(NoopCapabilityExecutor),
        }
    }

    #[must_use]
    pub fn with_capability_executor(executor: Arc<dyn CapabilityExecutor>) -> Self {
        Self {
            capability: executor,
        }
    }

    /// Runs every want concurrently and waits for all of them.
    ///
    /// Returns once every want has reached a terminal status. The graph
    /// remains inspectable through its handles afterwards.
    #[instrument(skip_all, fields(wants = graph.len()))]
    pub async fn run_to_completion(&self, graph: &mut Graph) -> Result<RunReport, SchedulerError> {
        let started_at = Utc::now();
        let engine = graph.engine.clone();

        let mut tasks: JoinSet<()> = JoinSet::new();
        for node in &mut graph.nodes {
            let Some(want) = node.want.take() else {
                continue;
            };
            let runtime = Arc::clone(&node.runtime);
            let executor = Arc::clone(&self.capability);
            let engine = engine.clone();
            tasks.spawn(drive_want(runtime, want, executor, engine));
        }

        while let Some(joined) = tasks.join_next().await {
            joined?;
        }

        let wants: Vec<WantReport> = graph
            .nodes
            .iter()
            .map(|node| {
                let rt = &node.runtime;
                WantReport {
                    metadata: (*rt.metadata).clone(),
                    params: rt.params.read().unwrap_or_else(|e| e.into_inner()).clone(),
                    state: rt.state.snapshot(),
                    status: rt.status(),
                    progress: rt.progress(),
                }
            })
            .collect();
        let any_failed = wants.iter().any(|w| w.status == WantStatus::Failed);

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            any_failed,
            wants,
        })
    }
}

/// Progression loop for one want. Runs on its own task until terminal.
async fn drive_want(
    runtime: Arc<WantRuntime>,
    mut want: Box<dyn Want + Send>,
    executor: Arc<dyn CapabilityExecutor>,
    engine: EngineConfig,
) {
    let ctx = runtime.context(&engine);
    runtime.set_status(WantStatus::Running);
    want.init(&ctx);
    capability::execute_required(executor.as_ref(), &runtime.requires, &ctx).await;

    loop {
        if want.is_achieved(&ctx) {
            runtime.set_progress(100);
            runtime.set_status(WantStatus::Achieved);
            break;
        }

        runtime.state.begin_cycle();
        let outcome = want.step(&ctx).await;
        runtime.state.flush_cycle();
        runtime.set_progress(want.progress(&ctx));

        match outcome {
            Ok(StepOutcome::Done) => {
                runtime.set_progress(100);
                runtime.set_status(WantStatus::Achieved);
                break;
            }
            Ok(StepOutcome::Pending) => {
                if want.is_achieved(&ctx) {
                    runtime.set_progress(100);
                    runtime.set_status(WantStatus::Achieved);
                    break;
                }
                tokio::time::sleep(engine.poll_interval).await;
            }
            Err(err) => {
                warn!(want = ctx.name(), error = %err, "want failed");
                runtime
                    .state
                    .stage(FAILURE_MESSAGE_KEY, json!(err.to_string()));
                runtime.set_status(WantStatus::Failed);
                // downstream consumers still get a clean end-of-stream
                ctx.send_end().await;
                break;
            }
        }
    }

    debug!(
        want = ctx.name(),
        status = %runtime.status(),
        progress = runtime.progress(),
        "want finished"
    );
}
