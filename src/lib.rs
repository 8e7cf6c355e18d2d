//! Wantgraph: a declarative dataflow engine built around *wants*.
//!
//! A want is a goal-seeking unit of work described by serializable config
//! (identity, labels, params, input selectors) and implemented as a
//! [`want::Want`]. Wiring between wants is never declared point-to-point:
//! consumers declare label selectors, and the
//! [`graphs::GraphBuilder`] resolves them against producer labels into
//! bounded channels, deterministically and with full connectivity
//! validation up front.
//!
//! The [`schedulers::Scheduler`] then runs every want concurrently, driving
//! each through a progression loop of batched-state step invocations until
//! it is achieved or failed, and folds the results into a final
//! [`report::RunReport`].
//!
//! # Module guide
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`types`] | [`types::WantStatus`] lifecycle, [`types::StepOutcome`] |
//! | [`config`] | Declarative [`config::WantConfig`], label selectors, engine knobs |
//! | [`packet`] | [`packet::Packet`]: payload plus end-of-stream marker |
//! | [`paths`] | Channel endpoints, growable [`paths::PathSet`], connectivity contracts |
//! | [`state`] | Per-want state map with batched write cycles |
//! | [`want`] | The [`want::Want`] trait and [`want::WantContext`] |
//! | [`registry`] | Type name to factory/contract table |
//! | [`graphs`] | Built graphs, handles, topology growth, the builder |
//! | [`schedulers`] | One task per want, join-all, terminal accounting |
//! | [`coordinator`] | Fan-in aggregation with grace-window completion |
//! | [`capability`] | Capability resolution boundary |
//! | [`report`] | Serializable end-of-run reports |
//! | [`telemetry`] | Tracing subscriber setup |
//!
//! # Quick start
//!
//! A producer emitting two numbers into a coordinator that collects them:
//!
//! ```rust
//! use async_trait::async_trait;
//! use serde_json::json;
//! use wantgraph::config::WantConfig;
//! use wantgraph::coordinator::{CollectLastHandler, Coordinator};
//! use wantgraph::graphs::GraphBuilder;
//! use wantgraph::packet::Packet;
//! use wantgraph::paths::ConnectivityContract;
//! use wantgraph::registry::WantTypeRegistry;
//! use wantgraph::schedulers::Scheduler;
//! use wantgraph::types::StepOutcome;
//! use wantgraph::want::{Want, WantContext, WantError};
//!
//! struct Numbers {
//!     next: i64,
//! }
//!
//! #[async_trait]
//! impl Want for Numbers {
//!     async fn step(&mut self, ctx: &WantContext) -> Result<StepOutcome, WantError> {
//!         if self.next >= ctx.param_i64("count").unwrap_or(3) {
//!             ctx.send_end().await;
//!             return Ok(StepOutcome::Done);
//!         }
//!         ctx.send_all(Packet::data(json!(self.next))).await;
//!         self.next += 1;
//!         Ok(StepOutcome::Pending)
//!     }
//!
//!     fn is_achieved(&self, _ctx: &WantContext) -> bool {
//!         false
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = WantTypeRegistry::new();
//!     registry.register("numbers", ConnectivityContract::source(), |_m, _s| {
//!         Box::new(Numbers { next: 0 })
//!     });
//!     registry.register("collect", Coordinator::contract(), |_m, _s| {
//!         Box::new(Coordinator::new(Box::new(CollectLastHandler::default())))
//!     });
//!
//!     let mut graph = GraphBuilder::new(registry)
//!         .add_want(
//!             WantConfig::new("gen", "numbers")
//!                 .with_label("role", "source")
//!                 .with_param("count", json!(2)),
//!         )
//!         .add_want(WantConfig::new("sum", "collect").with_input([("role", "source")]))
//!         .build()?;
//!
//!     let report = tokio::runtime::Runtime::new()?
//!         .block_on(async { Scheduler::new().run_to_completion(&mut graph).await })?;
//!     assert!(report.all_achieved());
//!     Ok(())
//! }
//! ```

pub mod capability;
pub mod config;
pub mod coordinator;
pub mod graphs;
pub mod packet;
pub mod paths;
pub mod registry;
pub mod report;
pub mod schedulers;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod want;
