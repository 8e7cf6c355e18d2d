//! Tracing setup helpers.
//!
//! The engine emits structured `tracing` events throughout the builder,
//! scheduler, and coordinator. Embedding applications that already install
//! a subscriber can ignore this module; for binaries and tests,
//! [`init_tracing`] wires a sensible default.

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
