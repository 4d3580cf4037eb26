//! # Paycrypt Webhook Dispatch
//!
//! The delivery engine for queued webhook events: a signed HTTP transport,
//! the per-event [`dispatcher::Dispatcher`] with its retry bookkeeping, and
//! the [`runner::BatchRunner`] an external scheduler invokes once per tick.
//!
//! ## Architecture
//!
//! The engine is glue over the trait seams `paycrypt-webhook-core`
//! defines: it selects due events from an
//! [`EventStore`](paycrypt_webhook_core::EventStore), resolves delivery
//! settings through a
//! [`ClientDirectory`](paycrypt_webhook_core::ClientDirectory), and POSTs
//! through a [`transport::WebhookTransport`]. Every per-event failure is
//! converted into a recorded attempt; only a store failure while fetching
//! the batch itself escapes to the caller.
//!
//! Delivery is at-least-once. Overlapping runs are resolved by the store's
//! conditional mark operations; the run that loses a race reports the event
//! as skipped and the winner's bookkeeping stands.

/// Signed HTTP POST transport with timeout and failure classification
pub mod transport;

/// Per-event delivery: eligibility re-check, signing, send, classify, mark
pub mod dispatcher;

/// One dispatch cycle over a bounded batch of due events
pub mod runner;

// Re-export key types for convenience
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use runner::{BatchRunner, BatchSummary, RunnerConfig};
pub use transport::{
    DeliveryHeaders, DeliveryResponse, HttpTransport, TransportError, WebhookTransport,
};
