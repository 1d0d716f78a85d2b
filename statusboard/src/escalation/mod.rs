//! Escalation workflow
//!
//! An escalation is opened explicitly against a responsibility and moves
//! `OPEN → RESOLVED` exactly once. Both the dedicated resolve action and the
//! generic partial update reach the same internal transition.
//!
//! - [`engine`]: trigger, bulk trigger, resolve, update, filtered listing
//! - [`state`]: the lifecycle state machine
//! - [`page`]: filters and cursor pagination
//! - [`fallback`]: client-side resolver that degrades to a partial update
//! - [`watch`]: tokio polling for newly opened escalations

pub mod engine;
pub mod fallback;
pub mod page;
pub mod state;
pub mod watch;

pub use engine::{BatchReport, EscalationEngine, EscalationPatch};
pub use fallback::{
    FallbackResolver, LocalTransport, ResolveOutcome, ResolvePath, ResolveTransport,
    TransportError,
};
pub use page::{Cursor, EscalationFilter, Page};
pub use state::{EscalationStatus, ResolutionRecord};
pub use watch::EscalationWatcher;
