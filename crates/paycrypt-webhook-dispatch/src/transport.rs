//! # Webhook Transport Module
//!
//! The HTTP leg of a delivery attempt: one signed POST to the client's
//! webhook URL, bounded by a timeout.
//!
//! The transport does not interpret response status — any response is an
//! `Ok` carrying the status and body for the dispatcher to classify. Only
//! transport-level failures (timeout, connection, protocol plumbing) are
//! errors, split into the categories the retry bookkeeping stores.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

// ============================================================================
// Wire Constants
// ============================================================================

/// Event-type header sent with every delivery
pub const HEADER_EVENT: &str = "X-Paycrypt-Event";

/// RFC3339 emission timestamp header; also the timestamp the signature covers
pub const HEADER_TIMESTAMP: &str = "X-Paycrypt-Timestamp";

/// Event-id header receivers use for deduplication
pub const HEADER_EVENT_ID: &str = "X-Paycrypt-Event-Id";

/// Hex HMAC-SHA256 signature header, present when the client has a secret
pub const HEADER_SIGNATURE: &str = "X-Paycrypt-Signature";

// ============================================================================
// Request / Response Types
// ============================================================================

/// The vendor headers attached to one delivery attempt
#[derive(Debug, Clone)]
pub struct DeliveryHeaders {
    pub event_type: String,
    pub timestamp: String,
    pub event_id: String,
    pub signature: Option<String>,
}

/// An HTTP response received from the client endpoint
#[derive(Debug, Clone)]
pub struct DeliveryResponse {
    pub status: u16,
    pub body: String,
}

impl DeliveryResponse {
    /// Any 2xx status counts as a successful delivery
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for transport-level delivery failures
///
/// All variants are retryable; the distinction exists so the stored
/// `last_error` tells an operator what actually went wrong.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Request error: {message}")]
    Request { message: String },
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Performs the signed HTTP POST for one delivery attempt
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// POST `body` to `url` with the vendor headers, waiting at most
    /// `timeout` for the full round trip
    async fn deliver(
        &self,
        url: &str,
        headers: &DeliveryHeaders,
        body: Bytes,
        timeout: Duration,
    ) -> Result<DeliveryResponse, TransportError>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// reqwest-backed [`WebhookTransport`]
///
/// One shared client, per-request timeouts. The client follows reqwest's
/// defaults otherwise; webhook endpoints are plain HTTPS receivers and need
/// no special connection handling.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport over a preconfigured client (proxies, TLS setup)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn deliver(
        &self,
        url: &str,
        headers: &DeliveryHeaders,
        body: Bytes,
        timeout: Duration,
    ) -> Result<DeliveryResponse, TransportError> {
        let mut request = self
            .client
            .post(url)
            .timeout(timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(HEADER_EVENT, &headers.event_type)
            .header(HEADER_TIMESTAMP, &headers.timestamp)
            .header(HEADER_EVENT_ID, &headers.event_id)
            .body(body);

        if let Some(signature) = &headers.signature {
            request = request.header(HEADER_SIGNATURE, signature);
        }

        let response = request
            .send()
            .await
            .map_err(|error| classify_error(error, timeout))?;

        let status = response.status().as_u16();
        // A body that cannot be read is still a classified response
        let body = response.text().await.unwrap_or_default();

        Ok(DeliveryResponse { status, body })
    }
}

fn classify_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            seconds: timeout.as_secs(),
        }
    } else if error.is_connect() {
        TransportError::Connection {
            message: error.to_string(),
        }
    } else {
        TransportError::Request {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
