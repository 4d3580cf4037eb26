//! # Batch Runner Module
//!
//! One dispatch cycle: fetch a bounded batch of due events, deliver each in
//! sequence, and aggregate the outcomes into counters an operator or CLI
//! wrapper can act on.
//!
//! Per-event failures never escape this function — the dispatcher has
//! already recorded them. The only propagated error is a store failure
//! while fetching the batch itself, which the external scheduler treats as
//! "run failed, retry next tick".

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use paycrypt_webhook_core::{EventStore, StoreError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// ============================================================================
// Configuration
// ============================================================================

/// Settings for one dispatch run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum number of due events processed per run
    pub batch_limit: usize,

    /// Timeout for each delivery attempt
    pub timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_limit: 100,
            timeout: Duration::from_secs(10),
        }
    }
}

// ============================================================================
// Summary Counters
// ============================================================================

/// Aggregated outcomes of one dispatch run
///
/// `processed = delivered + failed + skipped`. `skipped` counts events that
/// ended with no recorded state transition — stale batch membership or a
/// concurrent run winning the race.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    /// Tally one dispatch outcome
    fn record(&mut self, outcome: DispatchOutcome) {
        self.processed += 1;
        match outcome {
            DispatchOutcome::Delivered => self.delivered += 1,
            DispatchOutcome::Failed => self.failed += 1,
            DispatchOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Check whether any attempt in the run failed
    ///
    /// Intended for the external wrapper's exit-code decision.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} delivered={} failed={} skipped={}",
            self.processed, self.delivered, self.failed, self.skipped
        )
    }
}

// ============================================================================
// Batch Runner
// ============================================================================

/// Runs one bounded dispatch cycle over the due events
pub struct BatchRunner {
    store: Arc<dyn EventStore>,
    dispatcher: Dispatcher,
}

impl BatchRunner {
    /// Create a runner over the given store and dispatcher
    ///
    /// The store must be the same instance the dispatcher records into,
    /// otherwise the eligibility re-check guards nothing.
    pub fn new(store: Arc<dyn EventStore>, dispatcher: Dispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Run one dispatch cycle with the given settings
    pub async fn run(&self, config: &RunnerConfig) -> Result<BatchSummary, StoreError> {
        self.run_once(config.batch_limit, config.timeout).await
    }

    /// Fetch up to `limit` due events and dispatch each in sequence
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only when the batch itself cannot be fetched;
    /// per-event failures are recorded by the dispatcher and tallied.
    pub async fn run_once(
        &self,
        limit: usize,
        timeout: Duration,
    ) -> Result<BatchSummary, StoreError> {
        let events = self.store.due_events(limit).await?;

        info!(batch_size = events.len(), limit, "Starting webhook dispatch run");

        let mut summary = BatchSummary::default();
        for event in &events {
            let outcome = self.dispatcher.dispatch(event, timeout).await;
            summary.record(outcome);
        }

        info!(
            processed = summary.processed,
            delivered = summary.delivered,
            failed = summary.failed,
            skipped = summary.skipped,
            "Webhook dispatch run complete"
        );

        Ok(summary)
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
