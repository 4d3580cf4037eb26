//! # Event Store Module
//!
//! Durable bookkeeping for webhook events: insertion (factory only), the
//! due-event query the batch runner polls, and the two guarded state
//! transitions the dispatcher records.
//!
//! ## Concurrency contract
//!
//! Overlapping dispatch runs can select the same due event. Both mark
//! operations are therefore conditional updates: they succeed only if the
//! stored row's `(status, attempts)` still match the snapshot the caller
//! selected, and fail with [`StoreError::Conflict`] otherwise. The run that
//! loses the race must treat the event as skipped, not failed. A SQL-backed
//! implementation maps this to `UPDATE ... WHERE status = ? AND attempts = ?`.

use crate::event::truncate_error;
use crate::{EventId, PaymentId, Timestamp, WebhookEvent, WebhookEventStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for event store operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Event {id} already exists")]
    DuplicateEvent { id: EventId },

    #[error("Event {id} not found")]
    NotFound { id: EventId },

    #[error("Event {id} was modified by a concurrent dispatch run")]
    Conflict { id: EventId },

    #[error("Event store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Check if the error is transient and the operation worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::DuplicateEvent { .. } => false,
            Self::NotFound { .. } => false,
            Self::Conflict { .. } => false,
        }
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Persistence seam for webhook events
///
/// The factory is the sole caller of [`insert`](EventStore::insert); the
/// dispatcher is the sole caller of the mark operations. Events are never
/// deleted through this interface — retention is an external concern.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a newly created event
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateEvent`] if an event with the same id
    /// is already stored.
    async fn insert(&self, event: WebhookEvent) -> Result<(), StoreError>;

    /// Fetch the current state of an event by id
    async fn get(&self, id: EventId) -> Result<Option<WebhookEvent>, StoreError>;

    /// Fetch up to `limit` events currently eligible for delivery
    ///
    /// Oldest `created_at` first, so a backlog drains in creation order and
    /// worst-case latency stays bounded.
    async fn due_events(&self, limit: usize) -> Result<Vec<WebhookEvent>, StoreError>;

    /// Fetch all events emitted for a payment, oldest first
    async fn find_by_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Vec<WebhookEvent>, StoreError>;

    /// Record a successful delivery
    ///
    /// Transitions the row to `Delivered`, stamps `delivered_at`, records
    /// the HTTP response code, and clears `last_error`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the stored row's
    /// `(status, attempts)` no longer match `event`'s.
    async fn mark_delivered(
        &self,
        event: &WebhookEvent,
        response_code: u16,
    ) -> Result<WebhookEvent, StoreError>;

    /// Record a failed delivery attempt
    ///
    /// Increments `attempts` and stores the truncated error message and
    /// response code. When the retry budget is exhausted the row becomes
    /// terminal (`Failed`, `next_attempt_at = None`); otherwise it stays
    /// `Pending` with the next attempt scheduled from the backoff table,
    /// keyed by the pre-increment `attempts` value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the stored row's
    /// `(status, attempts)` no longer match `event`'s.
    async fn mark_failed(
        &self,
        event: &WebhookEvent,
        error_message: &str,
        response_code: Option<u16>,
    ) -> Result<WebhookEvent, StoreError>;
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// Thread-safe in-memory [`EventStore`]
///
/// Reference implementation for tests, development, and single-process
/// deployments.
///
/// # Examples
///
/// ```rust
/// use paycrypt_webhook_core::store::InMemoryEventStore;
///
/// let store = InMemoryEventStore::new();
/// ```
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<EventId, WebhookEvent>>,
}

impl InMemoryEventStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn unavailable<E: std::fmt::Display>(error: E) -> StoreError {
        StoreError::Unavailable {
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: WebhookEvent) -> Result<(), StoreError> {
        let mut events = self.events.write().map_err(Self::unavailable)?;
        if events.contains_key(&event.id) {
            return Err(StoreError::DuplicateEvent { id: event.id });
        }
        events.insert(event.id, event);
        Ok(())
    }

    async fn get(&self, id: EventId) -> Result<Option<WebhookEvent>, StoreError> {
        let events = self.events.read().map_err(Self::unavailable)?;
        Ok(events.get(&id).cloned())
    }

    async fn due_events(&self, limit: usize) -> Result<Vec<WebhookEvent>, StoreError> {
        let events = self.events.read().map_err(Self::unavailable)?;
        let mut due: Vec<WebhookEvent> = events
            .values()
            .filter(|event| event.is_deliverable())
            .cloned()
            .collect();
        due.sort_by_key(|event| event.created_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn find_by_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Vec<WebhookEvent>, StoreError> {
        let events = self.events.read().map_err(Self::unavailable)?;
        let mut matching: Vec<WebhookEvent> = events
            .values()
            .filter(|event| event.payment_id == payment_id)
            .cloned()
            .collect();
        matching.sort_by_key(|event| event.created_at);
        Ok(matching)
    }

    async fn mark_delivered(
        &self,
        event: &WebhookEvent,
        response_code: u16,
    ) -> Result<WebhookEvent, StoreError> {
        let mut events = self.events.write().map_err(Self::unavailable)?;
        let row = events
            .get_mut(&event.id)
            .ok_or(StoreError::NotFound { id: event.id })?;

        if row.status != event.status || row.attempts != event.attempts {
            return Err(StoreError::Conflict { id: event.id });
        }

        let now = Timestamp::now();
        row.status = WebhookEventStatus::Delivered;
        row.delivered_at = Some(now);
        row.last_response_code = Some(response_code);
        row.last_error = None;
        row.updated_at = now;

        Ok(row.clone())
    }

    async fn mark_failed(
        &self,
        event: &WebhookEvent,
        error_message: &str,
        response_code: Option<u16>,
    ) -> Result<WebhookEvent, StoreError> {
        let mut events = self.events.write().map_err(Self::unavailable)?;
        let row = events
            .get_mut(&event.id)
            .ok_or(StoreError::NotFound { id: event.id })?;

        if row.status != event.status || row.attempts != event.attempts {
            return Err(StoreError::Conflict { id: event.id });
        }

        // Backoff is keyed by the attempt counter before it is incremented
        let next_attempt = row.calculate_next_attempt();

        row.attempts += 1;
        row.last_error = Some(truncate_error(error_message));
        row.last_response_code = response_code;
        row.updated_at = Timestamp::now();

        if row.attempts >= row.max_attempts {
            row.status = WebhookEventStatus::Failed;
            row.next_attempt_at = None;
        } else {
            row.next_attempt_at = Some(next_attempt);
        }

        Ok(row.clone())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
