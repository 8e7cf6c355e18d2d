//! Declarative want configuration and engine tuning knobs.
//!
//! A [`WantConfig`] is the serializable record a config front end hands the
//! builder: identity and labels in [`WantMetadata`], behavior in
//! [`WantSpec`]. Wiring between wants is never declared point-to-point;
//! consumers declare [`LabelSelector`]s and the builder resolves them against
//! producer labels.
//!
//! # Examples
//!
//! ```rust
//! use wantgraph::config::WantConfig;
//! use serde_json::json;
//!
//! let config = WantConfig::new("totals", "collector")
//!     .with_label("role", "sink")
//!     .with_param("window", json!(10))
//!     .with_input([("role", "source")]);
//!
//! assert_eq!(config.metadata.name, "totals");
//! assert_eq!(config.spec.inputs.len(), 1);
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Identity of a want: generated id, unique name, registered type, and the
/// labels other wants' selectors match against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WantMetadata {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub labels: FxHashMap<String, String>,
}

/// Behavioral parameters of a want.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WantSpec {
    /// Free-form parameters, re-read by the want on every step.
    #[serde(default)]
    pub params: FxHashMap<String, Value>,
    /// Input selectors. Each selector contributes one input channel per
    /// matched producer.
    #[serde(default)]
    pub inputs: Vec<LabelSelector>,
    /// Capability names resolved through the capability boundary before the
    /// progression loop starts.
    #[serde(default)]
    pub requires: Vec<String>,
}

/// One declarative want: metadata plus spec.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WantConfig {
    pub metadata: WantMetadata,
    pub spec: WantSpec,
}

impl WantConfig {
    /// Starts a config with a fresh id and empty labels, params, and inputs.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            metadata: WantMetadata {
                id: Uuid::new_v4(),
                name: name.into(),
                type_name: type_name.into(),
                labels: FxHashMap::default(),
            },
            spec: WantSpec::default(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.spec.params.insert(key.into(), value);
        self
    }

    /// Adds one input selector from `(key, value)` pairs.
    #[must_use]
    pub fn with_input<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.spec.inputs.push(LabelSelector::from_pairs(pairs));
        self
    }

    #[must_use]
    pub fn with_require(mut self, capability: impl Into<String>) -> Self {
        self.spec.requires.push(capability.into());
        self
    }
}

/// A conjunctive label selector: every `key=value` pair must be present
/// verbatim in a producer's labels for the selector to match.
///
/// An empty selector matches nothing; it is skipped during resolution rather
/// than matching the whole graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSelector {
    pairs: FxHashMap<String, String>,
}

impl LabelSelector {
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All-pairs-equal matching against a label map.
    #[must_use]
    pub fn matches(&self, labels: &FxHashMap<String, String>) -> bool {
        if self.pairs.is_empty() {
            return false;
        }
        self.pairs
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|have| have == v))
    }
}

/// Engine-wide tuning knobs applied by the builder and scheduler.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Capacity of every channel created by the builder.
    pub channel_capacity: usize,
    /// Sleep between step invocations when a step reports `Pending`.
    pub poll_interval: Duration,
    /// Default bound for a single receive attempt inside a step.
    pub recv_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 32,
            poll_interval: Duration::from_millis(10),
            recv_timeout: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> FxHashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn selector_requires_every_pair() {
        let sel = LabelSelector::from_pairs([("role", "source"), ("stage", "one")]);
        assert!(sel.matches(&labels(&[("role", "source"), ("stage", "one"), ("x", "y")])));
        assert!(!sel.matches(&labels(&[("role", "source")])));
        assert!(!sel.matches(&labels(&[("role", "sink"), ("stage", "one")])));
    }

    #[test]
    fn empty_selector_matches_nothing() {
        let sel = LabelSelector::default();
        assert!(!sel.matches(&labels(&[("role", "source")])));
        assert!(!sel.matches(&labels(&[])));
    }

    #[test]
    fn config_deserializes_without_id() {
        let json = r#"{
            "metadata": {"name": "gen", "type": "sequence", "labels": {"role": "source"}},
            "spec": {"params": {"count": 3}}
        }"#;
        let config: WantConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.metadata.type_name, "sequence");
        assert!(config.spec.inputs.is_empty());
        assert!(!config.metadata.id.is_nil());
    }
}
