//! # Dispatcher Module
//!
//! Per-event delivery: re-check eligibility against the live row, resolve
//! the client's delivery settings, sign, POST, classify the outcome, and
//! record it through the store's guarded mark operations.
//!
//! Nothing here propagates: every fallible step inside a dispatch becomes a
//! recorded failed attempt or a skip, so one bad event can never abort a
//! batch. The only dispatch result is a [`DispatchOutcome`].

use crate::transport::{DeliveryHeaders, WebhookTransport};
use bytes::Bytes;
use paycrypt_webhook_core::{
    signer, ClientDirectory, EventStore, StoreError, Timestamp, WebhookEvent, WebhookEventStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Maximum stored length of a response-body or transport-error snippet
const ERROR_SNIPPET_MAX_LEN: usize = 200;

// ============================================================================
// Outcome Type
// ============================================================================

/// Result of one dispatch call
///
/// `Skipped` means no state transition was recorded: the event was no
/// longer eligible when re-checked, its row disappeared, or a concurrent
/// run won the conditional update. `Failed` always corresponds to a
/// recorded attempt (or an attempt the store refused for backend reasons,
/// which is logged).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 2xx response received and recorded
    Delivered,
    /// A failed attempt was recorded against the retry budget
    Failed,
    /// Nothing recorded; another run owns this event or it is not due
    Skipped,
}

impl DispatchOutcome {
    /// Check if this dispatch ended in a recorded delivery
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Delivers single webhook events and records the result
pub struct Dispatcher {
    store: Arc<dyn EventStore>,
    directory: Arc<dyn ClientDirectory>,
    transport: Arc<dyn WebhookTransport>,
}

impl Dispatcher {
    /// Create a dispatcher over the given store, directory, and transport
    pub fn new(
        store: Arc<dyn EventStore>,
        directory: Arc<dyn ClientDirectory>,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        Self {
            store,
            directory,
            transport,
        }
    }

    /// Attempt delivery of one event
    ///
    /// `event` is the snapshot selected for this batch; the dispatcher
    /// re-reads the row first and works from the fresh state, so a stale
    /// batch entry degrades to a skip instead of a duplicate attempt.
    ///
    /// A configuration problem (no URL, unusable signing secret) is a
    /// recorded failure: a persistently misconfigured client must burn
    /// down its retry budget and reach `Failed` rather than stay pending
    /// forever.
    pub async fn dispatch(&self, event: &WebhookEvent, timeout: Duration) -> DispatchOutcome {
        // 1. Re-check eligibility against the live row
        let current = match self.store.get(event.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                warn!(event_id = %event.id, "Skipping dispatch: event no longer in store");
                return DispatchOutcome::Skipped;
            }
            Err(store_error) => {
                error!(
                    event_id = %event.id,
                    error = %store_error,
                    "Skipping dispatch: could not re-read event"
                );
                return DispatchOutcome::Skipped;
            }
        };

        if !current.is_deliverable() {
            debug!(
                event_id = %current.id,
                status = %current.status,
                attempts = current.attempts,
                "Skipping dispatch: event not deliverable"
            );
            return DispatchOutcome::Skipped;
        }

        // 2. Resolve the client's delivery configuration
        let config = match self.directory.webhook_config(current.client_id).await {
            Ok(config) => config,
            Err(directory_error) => {
                return self
                    .record_failure(
                        &current,
                        format!("Client lookup failed: {}", directory_error),
                        None,
                    )
                    .await;
            }
        };

        let url = match config.as_ref().and_then(|c| c.delivery_url()) {
            Some(url) => url.to_string(),
            None => {
                return self
                    .record_failure(
                        &current,
                        "Client webhook URL not configured".to_string(),
                        None,
                    )
                    .await;
            }
        };

        if url::Url::parse(&url).is_err() {
            return self
                .record_failure(&current, format!("Invalid webhook URL: {}", url), None)
                .await;
        }

        // 3. Build headers; a configured secret must sign or the attempt fails
        let timestamp = Timestamp::now().to_rfc3339();
        let secret = config.as_ref().and_then(|c| c.webhook_secret.as_deref());
        let signature = match secret {
            Some(secret) => match signer::sign(secret, &timestamp, &current.payload) {
                Ok(signature) => Some(signature),
                Err(signing_error) => {
                    return self
                        .record_failure(
                            &current,
                            format!("Failed to sign payload: {}", signing_error),
                            None,
                        )
                        .await;
                }
            },
            None => None,
        };

        let body = match serde_json::to_vec(&current.payload) {
            Ok(body) => Bytes::from(body),
            Err(serialize_error) => {
                return self
                    .record_failure(
                        &current,
                        format!("Failed to encode payload: {}", serialize_error),
                        None,
                    )
                    .await;
            }
        };

        let headers = DeliveryHeaders {
            event_type: current.event_type.to_string(),
            timestamp,
            event_id: current.id.to_string(),
            signature,
        };

        // 4. Send and classify
        match self.transport.deliver(&url, &headers, body, timeout).await {
            Ok(response) if response.is_success() => {
                self.record_delivery(&current, response.status).await
            }
            Ok(response) => {
                let message = format!(
                    "HTTP {}: {}",
                    response.status,
                    truncate_snippet(&response.body)
                );
                self.record_failure(&current, message, Some(response.status))
                    .await
            }
            Err(transport_error) => {
                self.record_failure(&current, truncate_snippet(&transport_error.to_string()), None)
                    .await
            }
        }
    }

    /// Record a successful delivery, downgrading a lost race to a skip
    async fn record_delivery(&self, event: &WebhookEvent, status: u16) -> DispatchOutcome {
        match self.store.mark_delivered(event, status).await {
            Ok(updated) => {
                info!(
                    event_id = %updated.id,
                    client_id = %updated.client_id,
                    response_code = status,
                    "Webhook delivered"
                );
                DispatchOutcome::Delivered
            }
            Err(StoreError::Conflict { .. }) | Err(StoreError::NotFound { .. }) => {
                warn!(
                    event_id = %event.id,
                    "Concurrent run already recorded this event; skipping"
                );
                DispatchOutcome::Skipped
            }
            Err(store_error) => {
                error!(
                    event_id = %event.id,
                    error = %store_error,
                    "Delivered but could not record; next run will re-attempt"
                );
                DispatchOutcome::Failed
            }
        }
    }

    /// Record a failed attempt, downgrading a lost race to a skip
    async fn record_failure(
        &self,
        event: &WebhookEvent,
        message: String,
        response_code: Option<u16>,
    ) -> DispatchOutcome {
        match self.store.mark_failed(event, &message, response_code).await {
            Ok(updated) => {
                if updated.status == WebhookEventStatus::Failed {
                    warn!(
                        event_id = %updated.id,
                        client_id = %updated.client_id,
                        attempts = updated.attempts,
                        error = %message,
                        "Webhook delivery failed terminally; retry budget exhausted"
                    );
                } else {
                    info!(
                        event_id = %updated.id,
                        client_id = %updated.client_id,
                        attempts = updated.attempts,
                        error = %message,
                        "Webhook delivery failed; retry scheduled"
                    );
                }
                DispatchOutcome::Failed
            }
            Err(StoreError::Conflict { .. }) | Err(StoreError::NotFound { .. }) => {
                warn!(
                    event_id = %event.id,
                    "Concurrent run already recorded this event; skipping"
                );
                DispatchOutcome::Skipped
            }
            Err(store_error) => {
                error!(
                    event_id = %event.id,
                    error = %store_error,
                    "Could not record failed attempt"
                );
                DispatchOutcome::Failed
            }
        }
    }
}

/// Truncate a response body or transport message for storage
fn truncate_snippet(text: &str) -> String {
    text.chars().take(ERROR_SNIPPET_MAX_LEN).collect()
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
