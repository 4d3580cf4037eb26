//! # Event Factory Module
//!
//! The single entry point through which payment state changes become queued
//! webhook events. Nothing else inserts into the event store.
//!
//! Creation is deliberately a two-outcome contract: `Ok(None)` means the
//! owning client has no usable webhook configuration and no event was
//! created — a valid no-op the triggering domain operation must not fail
//! on. Callers log factory errors and move on; they never propagate them
//! into the payment flow.

use crate::{
    ClientDirectory, DirectoryError, EventStore, PaymentSnapshot, StoreError, Timestamp,
    WebhookEvent, WebhookEventType,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// Error Types
// ============================================================================

/// Error type for event creation failures
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("Client lookup failed: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Event persistence failed: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// Event Factory
// ============================================================================

/// Creates webhook events for payment state changes
pub struct EventFactory {
    directory: Arc<dyn ClientDirectory>,
    store: Arc<dyn EventStore>,
}

impl EventFactory {
    /// Create a new factory over the given directory and store
    pub fn new(directory: Arc<dyn ClientDirectory>, store: Arc<dyn EventStore>) -> Self {
        Self { directory, store }
    }

    /// Create and persist a webhook event for a payment state change
    ///
    /// Preconditions are checked in order: the owning client must exist,
    /// have webhooks enabled, and have a non-empty delivery URL. Any miss
    /// returns `Ok(None)` without touching the store.
    ///
    /// On success the returned event is fully persisted, `Pending`, and
    /// eligible for immediate delivery. Its payload is a frozen snapshot of
    /// the payment; subsequent changes to the payment do not affect it.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError`] only when the directory or the store itself
    /// fails; an unconfigured client is not an error.
    pub async fn create_event(
        &self,
        payment: &PaymentSnapshot,
        event_type: WebhookEventType,
    ) -> Result<Option<WebhookEvent>, FactoryError> {
        let config = match self.directory.webhook_config(payment.client_id).await? {
            Some(config) => config,
            None => {
                debug!(
                    client_id = %payment.client_id,
                    event_type = %event_type,
                    "Skipping webhook event: client not found"
                );
                return Ok(None);
            }
        };

        if !config.webhook_enabled {
            debug!(
                client_id = %payment.client_id,
                event_type = %event_type,
                "Skipping webhook event: webhooks disabled"
            );
            return Ok(None);
        }

        if config.delivery_url().is_none() {
            debug!(
                client_id = %payment.client_id,
                event_type = %event_type,
                "Skipping webhook event: no delivery URL configured"
            );
            return Ok(None);
        }

        let emitted_at = Timestamp::now();
        let payload = build_payload(payment, event_type, &emitted_at);
        let event = WebhookEvent::new(payment.client_id, payment.id, event_type, payload);

        self.store.insert(event.clone()).await?;

        info!(
            event_id = %event.id,
            client_id = %event.client_id,
            payment_id = %event.payment_id,
            event_type = %event.event_type,
            "Webhook event created"
        );

        Ok(Some(event))
    }
}

/// Flatten a payment snapshot into the wire payload
fn build_payload(
    payment: &PaymentSnapshot,
    event_type: WebhookEventType,
    emitted_at: &Timestamp,
) -> serde_json::Value {
    json!({
        "event_type": event_type.as_str(),
        "payment": {
            "id": payment.id.as_i64(),
            "client_id": payment.client_id.as_i64(),
            "amount": payment.amount,
            "currency": payment.currency,
            "fiat_amount": payment.fiat_amount,
            "fiat_currency": payment.fiat_currency,
            "crypto_amount": payment.crypto_amount,
            "crypto_currency": payment.crypto_currency,
            "status": payment.status,
            "payment_method": payment.payment_method,
            "transaction_id": payment.transaction_id,
            "description": payment.description,
            "created_at": payment.created_at.map(|t| t.to_rfc3339()),
            "updated_at": payment.updated_at.map(|t| t.to_rfc3339()),
        },
        "timestamp": emitted_at.to_rfc3339(),
    })
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
