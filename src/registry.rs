//! Registry mapping want type names to factories and connectivity contracts.
//!
//! A registry is built by the embedding application and handed to the
//! [`GraphBuilder`](crate::graphs::builder::GraphBuilder) per run; there is
//! no global registry. Each entry pairs the type's
//! [`ConnectivityContract`] (validated at build time) with a factory that
//! produces a fresh [`Want`] instance per configured want.
//!
//! # Examples
//!
//! ```rust
//! use wantgraph::paths::ConnectivityContract;
//! use wantgraph::registry::WantTypeRegistry;
//! # use async_trait::async_trait;
//! # use wantgraph::types::StepOutcome;
//! # use wantgraph::want::{Want, WantContext, WantError};
//! # struct Nop;
//! # #[async_trait]
//! # impl Want for Nop {
//! #     async fn step(&mut self, _ctx: &WantContext) -> Result<StepOutcome, WantError> {
//! #         Ok(StepOutcome::Done)
//! #     }
//! #     fn is_achieved(&self, _ctx: &WantContext) -> bool { true }
//! # }
//!
//! let mut registry = WantTypeRegistry::new();
//! registry.register("nop", ConnectivityContract::default(), |_meta, _spec| Box::new(Nop));
//! assert!(registry.contains("nop"));
//! ```

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::config::{WantMetadata, WantSpec};
use crate::paths::ConnectivityContract;
use crate::want::Want;

/// Factory producing one [`Want`] instance from its declarative config.
pub type WantFactory =
    Arc<dyn Fn(&WantMetadata, &WantSpec) -> Box<dyn Want + Send> + Send + Sync>;

struct WantTypeEntry {
    contract: ConnectivityContract,
    factory: WantFactory,
}

/// Type name to (contract, factory) table, injected into the builder.
#[derive(Default)]
pub struct WantTypeRegistry {
    entries: FxHashMap<String, WantTypeEntry>,
}

impl WantTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type. Re-registering a name replaces the previous entry.
    pub fn register<F>(
        &mut self,
        type_name: impl Into<String>,
        contract: ConnectivityContract,
        factory: F,
    ) -> &mut Self
    where
        F: Fn(&WantMetadata, &WantSpec) -> Box<dyn Want + Send> + Send + Sync + 'static,
    {
        self.entries.insert(
            type_name.into(),
            WantTypeEntry {
                contract,
                factory: Arc::new(factory),
            },
        );
        self
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    #[must_use]
    pub fn contract(&self, type_name: &str) -> Option<ConnectivityContract> {
        self.entries.get(type_name).map(|e| e.contract)
    }

    /// Instantiates a want of the given type, or `None` for unknown types.
    #[must_use]
    pub fn create(
        &self,
        type_name: &str,
        metadata: &WantMetadata,
        spec: &WantSpec,
    ) -> Option<Box<dyn Want + Send>> {
        self.entries
            .get(type_name)
            .map(|e| (e.factory)(metadata, spec))
    }

    #[must_use]
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for WantTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WantTypeRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
