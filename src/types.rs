//! Core lifecycle vocabulary shared across the crate.
//!
//! # Examples
//!
//! ```rust
//! use wantgraph::types::WantStatus;
//!
//! assert!(WantStatus::Achieved.is_terminal());
//! assert!(!WantStatus::Running.is_terminal());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a want.
///
/// A want starts `Idle`, is moved to `Running` by the scheduler, and ends in
/// exactly one terminal state. Terminal states are one-way: the scheduler
/// never transitions a want out of `Achieved` or `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WantStatus {
    /// Created but not yet picked up by the scheduler.
    Idle,
    /// The scheduler is actively driving the want's step function.
    Running,
    /// The want reported completion; its step function will not run again.
    Achieved,
    /// The want's step function returned an unrecoverable error.
    Failed,
}

impl WantStatus {
    /// Returns `true` for `Achieved` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Achieved | Self::Failed)
    }
}

impl fmt::Display for WantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Achieved => write!(f, "achieved"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of a single step invocation.
///
/// `Pending` means the want made whatever progress it could this cycle
/// (possibly none, e.g. no input arrived within its receive timeout) and
/// should be re-invoked. `Done` means the want has reached its goal and the
/// scheduler should mark it `Achieved`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// More work remains; the scheduler will invoke `step` again.
    Pending,
    /// The want is finished.
    Done,
}

impl StepOutcome {
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}
