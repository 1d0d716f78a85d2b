//! Resolution fallback for transports lacking a dedicated resolve action
//!
//! # Design
//!
//! ```text
//! resolve(id)
//!   ├─ dedicated action succeeds            → served_by: action
//!   ├─ action unsupported / 404 / 400       → partial update {resolved: true}
//!   │    └─ succeeds                        → served_by: partial_update, warning
//!   └─ any other failure                    → error surfaces
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::TrackerError;
use crate::escalation::engine::{EscalationEngine, EscalationPatch};
use crate::model::{Escalation, EscalationId, UserId};

/// Failure reported by a resolve transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// Action not supported (HTTP 405)
    #[error("resolve action not supported")]
    Unsupported,

    /// Route missing on the remote side (HTTP 404)
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// Request shape rejected (HTTP 400)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The tracker itself rejected the operation
    #[error(transparent)]
    Rejected(#[from] TrackerError),

    #[error("transport failure: {0}")]
    Io(String),
}

impl TransportError {
    /// Whether the generic partial update should be tried next
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            Self::Unsupported | Self::RouteNotFound(_) | Self::BadRequest(_)
        )
    }
}

/// Two ways to resolve an escalation over some transport
pub trait ResolveTransport {
    /// Dedicated resolve action
    fn resolve_action(
        &self,
        id: EscalationId,
        resolved_by: UserId,
    ) -> Result<Escalation, TransportError>;

    /// Generic partial update carrying `{resolved: true}`
    fn partial_update(
        &self,
        id: EscalationId,
        actor: UserId,
        patch: &EscalationPatch,
    ) -> Result<Escalation, TransportError>;
}

/// Which path served a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvePath {
    Action,
    PartialUpdate,
}

impl std::fmt::Display for ResolvePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action => write!(f, "action"),
            Self::PartialUpdate => write!(f, "partial_update"),
        }
    }
}

/// A resolution together with the path that served it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOutcome {
    pub escalation: Escalation,
    pub served_by: ResolvePath,
    pub warnings: Vec<String>,
}

impl ResolveOutcome {
    pub fn is_fallback(&self) -> bool {
        self.served_by == ResolvePath::PartialUpdate
    }
}

/// Resolver that tries the dedicated action, then the partial update
pub struct FallbackResolver<T> {
    transport: T,
}

impl<T: ResolveTransport> FallbackResolver<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn resolve(
        &self,
        id: EscalationId,
        resolved_by: UserId,
    ) -> Result<ResolveOutcome, TransportError> {
        match self.transport.resolve_action(id, resolved_by) {
            Ok(escalation) => Ok(ResolveOutcome {
                escalation,
                served_by: ResolvePath::Action,
                warnings: Vec::new(),
            }),
            Err(e) if e.triggers_fallback() => {
                let warning = format!("resolve action failed ({}), using partial update", e);
                tracing::warn!(escalation_id = id, error = %e, "Falling back to partial update");
                let escalation =
                    self.transport
                        .partial_update(id, resolved_by, &EscalationPatch::resolve())?;
                Ok(ResolveOutcome {
                    escalation,
                    served_by: ResolvePath::PartialUpdate,
                    warnings: vec![warning],
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// In-process transport backed by the engine
pub struct LocalTransport {
    engine: EscalationEngine,
    dedicated_action: bool,
}

impl LocalTransport {
    pub fn new(engine: EscalationEngine) -> Self {
        Self {
            engine,
            dedicated_action: true,
        }
    }

    /// Transport whose dedicated action reports as unsupported
    pub fn without_action(engine: EscalationEngine) -> Self {
        Self {
            engine,
            dedicated_action: false,
        }
    }
}

impl ResolveTransport for LocalTransport {
    fn resolve_action(
        &self,
        id: EscalationId,
        resolved_by: UserId,
    ) -> Result<Escalation, TransportError> {
        if !self.dedicated_action {
            return Err(TransportError::Unsupported);
        }
        Ok(self.engine.resolve(id, resolved_by, None)?)
    }

    fn partial_update(
        &self,
        id: EscalationId,
        actor: UserId,
        patch: &EscalationPatch,
    ) -> Result<Escalation, TransportError> {
        Ok(self.engine.update(id, actor, patch.clone())?)
    }
}
