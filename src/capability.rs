//! Capability resolution boundary.
//!
//! Wants may declare required capability names in their spec. Before the
//! progression loop starts, the scheduler resolves each name through the
//! run's [`CapabilityExecutor`]. Resolution failures never fail the want:
//! they are recorded in the want's state map under `execution_status` /
//! `execution_error` and the loop proceeds, so the want (and its observers)
//! can react to the degraded start. The scheduler does not retry.

use async_trait::async_trait;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::want::WantContext;

/// State key recording the outcome of capability resolution.
pub const EXECUTION_STATUS_KEY: &str = "execution_status";
/// State key holding the first resolution error message, if any.
pub const EXECUTION_ERROR_KEY: &str = "execution_error";

#[derive(Debug, Error, Diagnostic)]
pub enum CapabilityError {
    #[error("no provider for capability `{capability}`")]
    #[diagnostic(
        code(wantgraph::capability::unresolved),
        help("register a CapabilityExecutor that knows this capability name")
    )]
    Unresolved { capability: String },

    #[error("capability `{capability}` failed: {message}")]
    #[diagnostic(code(wantgraph::capability::execution))]
    Execution { capability: String, message: String },
}

/// Resolves and executes named capabilities on behalf of a want.
#[async_trait]
pub trait CapabilityExecutor: Send + Sync {
    async fn execute(&self, capability: &str, ctx: &WantContext) -> Result<(), CapabilityError>;
}

/// Default executor: refuses every capability name.
#[derive(Debug, Default)]
pub struct NoopCapabilityExecutor;

#[async_trait]
impl CapabilityExecutor for NoopCapabilityExecutor {
    async fn execute(&self, capability: &str, _ctx: &WantContext) -> Result<(), CapabilityError> {
        Err(CapabilityError::Unresolved {
            capability: capability.to_string(),
        })
    }
}

/// Runs each required capability in declaration order, stopping at the first
/// failure. Writes the outcome into the want's state map.
pub(crate) async fn execute_required(
    executor: &dyn CapabilityExecutor,
    requires: &[String],
    ctx: &WantContext,
) {
    if requires.is_empty() {
        return;
    }
    for capability in requires {
        if let Err(err) = executor.execute(capability, ctx).await {
            warn!(
                want = ctx.name(),
                capability = capability.as_str(),
                error = %err,
                "capability resolution failed"
            );
            ctx.state().stage(EXECUTION_STATUS_KEY, json!("failed"));
            ctx.state().stage(EXECUTION_ERROR_KEY, json!(err.to_string()));
            return;
        }
    }
    ctx.state().stage(EXECUTION_STATUS_KEY, json!("completed"));
}
