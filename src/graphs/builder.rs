//! Topology construction: selector resolution, channel creation, and
//! connectivity validation.
//!
//! The builder consumes declarative [`WantConfig`]s plus a
//! [`WantTypeRegistry`] and produces a fully wired [`Graph`]. Wiring is
//! derived, never declared: each consumer's input selectors are matched
//! against every other want's labels, and each (producer, consumer) pair
//! gets exactly one bounded channel regardless of how many selectors match
//! it.
//!
//! Resolution is deterministic: consumers are processed in declaration
//! order, selectors in their declared order, and matched producers in
//! lexicographic name order. The same configs always produce the same
//! topology with the same channel ordering.
//!
//! Any validation failure is fatal: the graph is not built and nothing runs.
//!
//! # Examples
//!
//! ```rust
//! use wantgraph::config::WantConfig;
//! use wantgraph::graphs::GraphBuilder;
//! use wantgraph::paths::ConnectivityContract;
//! use wantgraph::registry::WantTypeRegistry;
//! # use async_trait::async_trait;
//! # use wantgraph::types::StepOutcome;
//! # use wantgraph::want::{Want, WantContext, WantError};
//! # struct Nop;
//! # #[async_trait]
//! # impl Want for Nop {
//! #     async fn step(&mut self, ctx: &WantContext) -> Result<StepOutcome, WantError> {
//! #         ctx.send_end().await;
//! #         Ok(StepOutcome::Done)
//! #     }
//! #     fn is_achieved(&self, _ctx: &WantContext) -> bool { true }
//! # }
//!
//! let mut registry = WantTypeRegistry::new();
//! registry.register("source", ConnectivityContract::source(), |_m, _s| Box::new(Nop));
//! registry.register("sink", ConnectivityContract::fan_in(), |_m, _s| Box::new(Nop));
//!
//! let graph = GraphBuilder::new(registry)
//!     .add_want(WantConfig::new("gen", "source").with_label("role", "source"))
//!     .add_want(WantConfig::new("sum", "sink").with_input([("role", "source")]))
//!     .build()
//!     .unwrap();
//! assert_eq!(graph.want_names(), vec!["gen", "sum"]);
//! ```

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{EngineConfig, WantConfig};
use crate::paths::{InputPath, OutputPath};
use crate::registry::WantTypeRegistry;
use std::sync::Arc;

use super::{Graph, GraphNode, WantRuntime};

/// Fatal topology construction error. Always names the offending want.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("unknown want type `{type_name}` for want `{want}`")]
    #[diagnostic(
        code(wantgraph::build::unknown_type),
        help("register the type in the WantTypeRegistry before building")
    )]
    UnknownWantType { want: String, type_name: String },

    #[error("duplicate want name `{name}`")]
    #[diagnostic(code(wantgraph::build::duplicate_name))]
    DuplicateName { name: String },

    #[error("no want named `{name}` in the graph")]
    #[diagnostic(code(wantgraph::build::unknown_want))]
    UnknownWant { name: String },

    #[error("want `{want}` requires at least {required} input(s), resolved {connected}")]
    #[diagnostic(
        code(wantgraph::build::insufficient_inputs),
        help("check producer labels against the want's input selectors")
    )]
    InsufficientInputs {
        want: String,
        required: usize,
        connected: usize,
    },

    #[error("want `{want}` allows at most {limit} input(s), resolved {connected}")]
    #[diagnostic(code(wantgraph::build::too_many_inputs))]
    TooManyInputs {
        want: String,
        limit: usize,
        connected: usize,
    },

    #[error("want `{want}` requires at least {required} output(s), resolved {connected}")]
    #[diagnostic(
        code(wantgraph::build::insufficient_outputs),
        help("no consumer selector matched this want's labels")
    )]
    InsufficientOutputs {
        want: String,
        required: usize,
        connected: usize,
    },

    #[error("want `{want}` allows at most {limit} output(s), resolved {connected}")]
    #[diagnostic(code(wantgraph::build::too_many_outputs))]
    TooManyOutputs {
        want: String,
        limit: usize,
        connected: usize,
    },
}

/// Fluent builder for a [`Graph`].
pub struct GraphBuilder {
    registry: WantTypeRegistry,
    engine: EngineConfig,
    configs: Vec<WantConfig>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new(registry: WantTypeRegistry) -> Self {
        Self {
            registry,
            engine: EngineConfig::default(),
            configs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn add_want(mut self, config: WantConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Resolves, wires, and validates the topology.
    #[instrument(skip(self), fields(wants = self.configs.len()))]
    pub fn build(self) -> Result<Graph, BuildError> {
        let mut by_name: FxHashMap<String, usize> = FxHashMap::default();
        for (i, config) in self.configs.iter().enumerate() {
            if by_name.insert(config.metadata.name.clone(), i).is_some() {
                return Err(BuildError::DuplicateName {
                    name: config.metadata.name.clone(),
                });
            }
        }

        let mut runtimes: Vec<Arc<WantRuntime>> = Vec::with_capacity(self.configs.len());
        for config in &self.configs {
            let contract = self
                .registry
                .contract(&config.metadata.type_name)
                .ok_or_else(|| BuildError::UnknownWantType {
                    want: config.metadata.name.clone(),
                    type_name: config.metadata.type_name.clone(),
                })?;
            runtimes.push(Arc::new(WantRuntime::new(
                config.metadata.clone(),
                config.spec.requires.clone(),
                contract,
                config.spec.params.clone(),
            )));
        }

        let mut channels: FxHashMap<(String, String), flume::Sender<crate::packet::Packet>> =
            FxHashMap::default();
        for (ci, consumer) in self.configs.iter().enumerate() {
            for selector in &consumer.spec.inputs {
                if selector.is_empty() {
                    continue;
                }
                let mut matched: Vec<usize> = self
                    .configs
                    .iter()
                    .enumerate()
                    .filter(|(pi, producer)| {
                        *pi != ci && selector.matches(&producer.metadata.labels)
                    })
                    .map(|(pi, _)| pi)
                    .collect();
                matched.sort_by(|&a, &b| {
                    self.configs[a]
                        .metadata
                        .name
                        .cmp(&self.configs[b].metadata.name)
                });

                for pi in matched {
                    let producer_name = self.configs[pi].metadata.name.clone();
                    let consumer_name = consumer.metadata.name.clone();
                    let key = (producer_name.clone(), consumer_name.clone());
                    if channels.contains_key(&key) {
                        continue;
                    }
                    let (tx, rx) = flume::bounded(self.engine.channel_capacity);
                    runtimes[pi].paths.push_output(OutputPath {
                        consumer: consumer_name,
                        tx: tx.clone(),
                    });
                    runtimes[ci].paths.push_input(InputPath {
                        producer: producer_name,
                        rx,
                    });
                    channels.insert(key, tx);
                }
            }
        }

        for runtime in &runtimes {
            validate_connectivity(runtime)?;
        }

        let mut nodes = Vec::with_capacity(self.configs.len());
        for (config, runtime) in self.configs.iter().zip(runtimes) {
            debug!(
                want = config.metadata.name.as_str(),
                type_name = config.metadata.type_name.as_str(),
                inputs = runtime.paths.input_count(),
                outputs = runtime.paths.output_count(),
                "want wired"
            );
            // contract lookup above guarantees the type exists
            let want = self
                .registry
                .create(&config.metadata.type_name, &config.metadata, &config.spec)
                .ok_or_else(|| BuildError::UnknownWantType {
                    want: config.metadata.name.clone(),
                    type_name: config.metadata.type_name.clone(),
                })?;
            nodes.push(GraphNode {
                runtime,
                want: Some(want),
            });
        }

        Ok(Graph {
            nodes,
            by_name,
            channels,
            engine: self.engine,
        })
    }
}

fn validate_connectivity(runtime: &Arc<WantRuntime>) -> Result<(), BuildError> {
    let name = &runtime.metadata.name;
    let contract = runtime.contract;
    let inputs = runtime.paths.input_count();
    let outputs = runtime.paths.output_count();

    if inputs < contract.min_inputs {
        return Err(BuildError::InsufficientInputs {
            want: name.clone(),
            required: contract.min_inputs,
            connected: inputs,
        });
    }
    if let Some(max) = contract.max_inputs
        && inputs > max
    {
        return Err(BuildError::TooManyInputs {
            want: name.clone(),
            limit: max,
            connected: inputs,
        });
    }
    if !contract.deferred_outputs && outputs < contract.min_outputs {
        return Err(BuildError::InsufficientOutputs {
            want: name.clone(),
            required: contract.min_outputs,
            connected: outputs,
        });
    }
    if let Some(max) = contract.max_outputs
        && outputs > max
    {
        return Err(BuildError::TooManyOutputs {
            want: name.clone(),
            limit: max,
            connected: outputs,
        });
    }
    Ok(())
}
