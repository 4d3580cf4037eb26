//! # Webhook Event Model
//!
//! The durable unit of delivery: a [`WebhookEvent`] records one queued
//! notification, its frozen payload, and the bookkeeping the dispatcher
//! needs for bounded retries.
//!
//! Status is monotonic: `Pending -> Delivered` or `Pending -> Failed`, and
//! both end states are terminal. Retry spacing comes from a fixed
//! attempt-indexed table rather than a formula so the total retry window
//! stays auditable.

use crate::{ClientId, EventId, ParseError, PaymentId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Constants
// ============================================================================

/// Default delivery attempt budget per event
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Maximum stored length of `last_error`, in characters
pub const LAST_ERROR_MAX_LEN: usize = 500;

/// Retry delays in minutes, indexed by the `attempts` value at the moment a
/// failure is recorded (before the counter is incremented). Attempts past
/// the end of the table reuse the final entry.
pub const BACKOFF_SCHEDULE_MINUTES: [i64; 5] = [1, 5, 15, 60, 240];

// ============================================================================
// Event Type and Status Enumerations
// ============================================================================

/// Payment lifecycle events emitted to clients
///
/// The string values are the wire-format `event_type` tags; unknown tags are
/// rejected at the boundary rather than passed through.
///
/// # Examples
///
/// ```rust
/// use paycrypt_webhook_core::event::WebhookEventType;
///
/// let completed: WebhookEventType = "payment.completed".parse().unwrap();
/// assert_eq!(completed.as_str(), "payment.completed");
/// assert!("payment.unknown".parse::<WebhookEventType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEventType {
    #[serde(rename = "payment.created")]
    PaymentCreated,
    #[serde(rename = "payment.pending")]
    PaymentPending,
    #[serde(rename = "payment.approved")]
    PaymentApproved,
    #[serde(rename = "payment.completed")]
    PaymentCompleted,
    #[serde(rename = "payment.failed")]
    PaymentFailed,
    #[serde(rename = "payment.rejected")]
    PaymentRejected,
    #[serde(rename = "payment.cancelled")]
    PaymentCancelled,
}

impl WebhookEventType {
    /// Get the wire-format string value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentCreated => "payment.created",
            Self::PaymentPending => "payment.pending",
            Self::PaymentApproved => "payment.approved",
            Self::PaymentCompleted => "payment.completed",
            Self::PaymentFailed => "payment.failed",
            Self::PaymentRejected => "payment.rejected",
            Self::PaymentCancelled => "payment.cancelled",
        }
    }
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WebhookEventType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment.created" => Ok(Self::PaymentCreated),
            "payment.pending" => Ok(Self::PaymentPending),
            "payment.approved" => Ok(Self::PaymentApproved),
            "payment.completed" => Ok(Self::PaymentCompleted),
            "payment.failed" => Ok(Self::PaymentFailed),
            "payment.rejected" => Ok(Self::PaymentRejected),
            "payment.cancelled" => Ok(Self::PaymentCancelled),
            _ => Err(ParseError::InvalidFormat {
                expected: "payment.* event type".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

/// Delivery state of a webhook event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEventStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "delivered")]
    Delivered,
    #[serde(rename = "failed")]
    Failed,
}

impl WebhookEventStatus {
    /// Get the stored string value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    /// Check whether this state admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }
}

impl fmt::Display for WebhookEventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WebhookEventStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseError::InvalidFormat {
                expected: "pending, delivered, or failed".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// WebhookEvent
// ============================================================================

/// A queued intent to notify a client of a payment state change
///
/// The `payload` is a snapshot frozen at creation time; later changes to the
/// source payment produce new events rather than mutating this one. All
/// delivery bookkeeping (`status`, `attempts`, `next_attempt_at`, error
/// fields) is mutated exclusively through the event store's guarded mark
/// operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: EventId,
    pub client_id: ClientId,
    pub payment_id: PaymentId,
    pub event_type: WebhookEventType,
    pub status: WebhookEventStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub next_attempt_at: Option<Timestamp>,
    pub payload: serde_json::Value,
    pub last_error: Option<String>,
    pub last_response_code: Option<u16>,
    pub delivered_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WebhookEvent {
    /// Create a new pending event, eligible for immediate delivery
    ///
    /// # Arguments
    ///
    /// * `client_id` - Owning client, resolved for delivery configuration
    /// * `payment_id` - Payment the event was emitted for
    /// * `event_type` - Lifecycle tag (e.g. `payment.completed`)
    /// * `payload` - Frozen payload snapshot sent on every attempt
    pub fn new(
        client_id: ClientId,
        payment_id: PaymentId,
        event_type: WebhookEventType,
        payload: serde_json::Value,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: EventId::new(),
            client_id,
            payment_id,
            event_type,
            status: WebhookEventStatus::Pending,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            next_attempt_at: Some(now),
            payload,
            last_error: None,
            last_response_code: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether this event is currently eligible for a delivery attempt
    ///
    /// An event is deliverable iff it is still pending, has retry budget
    /// left, and its scheduled attempt time (if any) has passed.
    pub fn is_deliverable(&self) -> bool {
        if self.status != WebhookEventStatus::Pending {
            return false;
        }
        if self.attempts >= self.max_attempts {
            return false;
        }
        match self.next_attempt_at {
            Some(at) => at <= Timestamp::now(),
            None => true,
        }
    }

    /// Compute the scheduled time of the next delivery attempt
    ///
    /// Keyed by the current (pre-increment) `attempts` value against the
    /// fixed [`BACKOFF_SCHEDULE_MINUTES`] table, so the first failure is
    /// retried after 1 minute and the delays grow to 4 hours.
    pub fn calculate_next_attempt(&self) -> Timestamp {
        Timestamp::now().add_minutes(Self::backoff_delay_minutes(self.attempts))
    }

    /// Retry delay in minutes for a given attempt counter value
    pub fn backoff_delay_minutes(attempts: u32) -> i64 {
        let index = (attempts as usize).min(BACKOFF_SCHEDULE_MINUTES.len() - 1);
        BACKOFF_SCHEDULE_MINUTES[index]
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WebhookEvent {} | {} | {} | attempts={}",
            self.id, self.event_type, self.status, self.attempts
        )
    }
}

/// Truncate an error message to [`LAST_ERROR_MAX_LEN`] characters
///
/// Character-based so multi-byte input cannot split a UTF-8 sequence.
pub(crate) fn truncate_error(message: &str) -> String {
    message.chars().take(LAST_ERROR_MAX_LEN).collect()
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
