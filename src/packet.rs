//! The unit of data carried on channels between wants.
//!
//! A [`Packet`] is either a data packet wrapping an arbitrary JSON payload,
//! or an end-of-stream marker. End markers are in-band: a producer that is
//! finished sends one end packet down each of its output channels, and a
//! consumer that sees one stops polling that channel.
//!
//! # Examples
//!
//! ```rust
//! use wantgraph::packet::Packet;
//! use serde_json::json;
//!
//! let data = Packet::data(json!({"value": 42}));
//! assert!(!data.is_end());
//!
//! let end = Packet::end();
//! assert!(end.is_end());
//! assert!(end.payload.is_null());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message on a channel: a JSON payload plus an end-of-stream flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Arbitrary payload. Null for end markers.
    pub payload: Value,
    /// Name of the producing want, when known. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, rename = "is_end")]
    end: bool,
}

impl Packet {
    /// A data packet carrying `payload`.
    #[must_use]
    pub fn data(payload: Value) -> Self {
        Self {
            payload,
            source: None,
            end: false,
        }
    }

    /// An end-of-stream marker.
    #[must_use]
    pub fn end() -> Self {
        Self {
            payload: Value::Null,
            source: None,
            end: true,
        }
    }

    /// Tags the packet with the producing want's name.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Whether this packet marks the end of its stream.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.end
    }
}
