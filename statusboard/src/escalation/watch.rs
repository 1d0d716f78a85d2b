//! Polling watcher for newly opened escalations

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::TrackerResult;
use crate::escalation::engine::EscalationEngine;
use crate::escalation::page::EscalationFilter;
use crate::model::{Escalation, EscalationId};

/// Re-fetches open escalations and reports the ones not seen before
pub struct EscalationWatcher {
    engine: EscalationEngine,
    filter: EscalationFilter,
    seen: HashSet<EscalationId>,
}

impl EscalationWatcher {
    pub fn new(engine: EscalationEngine) -> Self {
        Self::with_filter(engine, EscalationFilter::default())
    }

    /// Watch a subset; the `resolved` constraint is always forced to open
    pub fn with_filter(engine: EscalationEngine, mut filter: EscalationFilter) -> Self {
        filter.resolved = Some(false);
        filter.cursor = None;
        Self {
            engine,
            filter,
            seen: HashSet::new(),
        }
    }

    /// Open escalations first seen on this poll, oldest first.
    ///
    /// Only currently open ids are remembered; resolved ones are forgotten.
    pub fn poll_once(&mut self) -> TrackerResult<Vec<Escalation>> {
        let open: Vec<Escalation> = self
            .engine
            .scoped(&self.filter)?
            .into_iter()
            .map(|s| s.escalation)
            .collect();
        let seen = std::mem::replace(&mut self.seen, open.iter().map(|e| e.id).collect());
        let mut fresh: Vec<Escalation> =
            open.into_iter().filter(|e| !seen.contains(&e.id)).collect();
        fresh.reverse();
        Ok(fresh)
    }

    /// Number of open escalations currently remembered
    pub fn tracked(&self) -> usize {
        self.seen.len()
    }

    /// Poll every `period` until `shutdown` flips to true.
    ///
    /// Retryable store errors skip the tick; any other error stops the loop.
    /// Returns the number of escalations handed to `sink`.
    pub async fn run<F>(
        mut self,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
        mut sink: F,
    ) -> TrackerResult<usize>
    where
        F: FnMut(&Escalation),
    {
        let mut ticker = tokio::time::interval(period);
        let mut reported = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let fresh = match self.poll_once() {
                        Ok(fresh) => fresh,
                        Err(e) if e.is_retryable() => {
                            tracing::warn!(
                                error = %e,
                                "Escalation poll failed, retrying next tick"
                            );
                            continue;
                        }
                        Err(e) => return Err(e),
                    };
                    if !fresh.is_empty() {
                        tracing::info!(count = fresh.len(), "New open escalations");
                    }
                    for escalation in &fresh {
                        sink(escalation);
                    }
                    reported += fresh.len();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(reported, "Escalation watcher stopped");
        Ok(reported)
    }
}
