#![allow(dead_code)]

pub mod wants;

use std::time::Duration;
use wantgraph::config::EngineConfig;

/// Tight timings so scenario tests finish quickly.
pub fn fast_engine() -> EngineConfig {
    EngineConfig {
        channel_capacity: 16,
        poll_interval: Duration::from_millis(2),
        recv_timeout: Duration::from_millis(10),
    }
}
