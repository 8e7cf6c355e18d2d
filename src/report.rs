//! Final run reports.
//!
//! After join-all, [`Scheduler::run_to_completion`] folds every want's
//! metadata, live params, state snapshot, terminal status, and progress into
//! a serializable [`RunReport`].
//!
//! [`Scheduler::run_to_completion`]: crate::schedulers::Scheduler::run_to_completion

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WantMetadata;
use crate::types::WantStatus;

/// Snapshot of one want at the end of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WantReport {
    pub metadata: WantMetadata,
    pub params: FxHashMap<String, Value>,
    pub state: FxHashMap<String, Value>,
    pub status: WantStatus,
    /// Coarse progress percentage, 0..=100.
    pub progress: u8,
}

/// Outcome of a whole run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when at least one want ended `Failed`. The run itself still
    /// completes; failure is per-want, not per-run.
    pub any_failed: bool,
    pub wants: Vec<WantReport>,
}

impl RunReport {
    #[must_use]
    pub fn want(&self, name: &str) -> Option<&WantReport> {
        self.wants.iter().find(|w| w.metadata.name == name)
    }

    #[must_use]
    pub fn all_achieved(&self) -> bool {
        self.wants.iter().all(|w| w.status == WantStatus::Achieved)
    }
}
