//! # Paycrypt Webhook Core
//!
//! Domain model and leaf components for the Paycrypt webhook delivery
//! subsystem.
//!
//! This crate contains everything the delivery engine needs that is not
//! HTTP: the durable [`event::WebhookEvent`] record with its retry
//! bookkeeping, the HMAC [`signer`], the [`factory::EventFactory`] that
//! turns payment state changes into queued events, and the
//! [`store::EventStore`] / [`client::ClientDirectory`] trait seams with
//! in-memory reference implementations.
//!
//! ## Architecture
//!
//! The core follows the same rules as the rest of the platform:
//! - Business logic depends only on trait abstractions
//! - Infrastructure implementations are injected at runtime
//! - Event payloads are frozen at creation and never re-read from the
//!   live payment
//!
//! ## Usage
//!
//! ```rust
//! use paycrypt_webhook_core::{ClientId, EventId, PaymentId, Timestamp};
//!
//! let event_id = EventId::new();
//! let client_id = ClientId::new(42);
//! let payment_id = PaymentId::new(7);
//! let now = Timestamp::now();
//! assert!(now <= Timestamp::now());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use uuid::Uuid;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Unique identifier for webhook events
///
/// Generated on the producer side (UUID v4) so an event id exists before the
/// row is persisted and can be used by receivers for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Generate a new unique event ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get string representation of event ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = s.parse::<Uuid>().map_err(|_| ParseError::InvalidFormat {
            expected: "UUID format".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self(uuid))
    }
}

/// Identifier of the client (merchant) that owns a payment and receives its
/// webhook events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(i64);

impl ClientId {
    /// Create new client ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get numeric value
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.parse::<i64>().map_err(|_| ParseError::InvalidFormat {
            expected: "integer".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self::new(id))
    }
}

/// Identifier of the payment a webhook event was emitted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(i64);

impl PaymentId {
    /// Create new payment ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get numeric value
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PaymentId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.parse::<i64>().map_err(|_| ParseError::InvalidFormat {
            expected: "integer".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self::new(id))
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// UTC timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse timestamp from RFC3339 string
    pub fn from_rfc3339(s: &str) -> Result<Self, ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|_| ParseError::InvalidFormat {
                expected: "RFC3339 datetime".to_string(),
                actual: s.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Add minutes to timestamp
    pub fn add_minutes(&self, minutes: i64) -> Self {
        Self(self.0 + chrono::Duration::minutes(minutes))
    }

    /// Add seconds to timestamp
    pub fn add_seconds(&self, seconds: i64) -> Self {
        Self(self.0 + chrono::Duration::seconds(seconds))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for string parsing failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Webhook event model, status lifecycle, and the retry backoff table
pub mod event;

/// HMAC-SHA256 payload signing and verification
pub mod signer;

/// Client webhook configuration lookup
pub mod client;

/// Read-only payment snapshot consumed from the domain layer
pub mod payment;

/// Durable event store trait and in-memory implementation
pub mod store;

/// Event factory: turns payment state changes into queued events
pub mod factory;

// Re-export key types for convenience
pub use client::{ClientDirectory, ClientWebhookConfig, DirectoryError, InMemoryClientDirectory};
pub use event::{WebhookEvent, WebhookEventStatus, WebhookEventType};
pub use factory::{EventFactory, FactoryError};
pub use payment::PaymentSnapshot;
pub use signer::SigningError;
pub use store::{EventStore, InMemoryEventStore, StoreError};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
