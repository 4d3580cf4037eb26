//! # Payment Snapshot
//!
//! The read-only view of a payment that the domain layer hands to the event
//! factory. The factory flattens this into the webhook payload; nothing in
//! this subsystem ever reads the live payment again afterwards.

use crate::{ClientId, PaymentId, Timestamp};
use serde::{Deserialize, Serialize};

/// Immutable view of a payment at the moment an event is emitted
///
/// Amounts are carried in their JSON wire representation. `status` is the
/// payment domain's own status string; the webhook core does not interpret
/// it, only forwards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSnapshot {
    pub id: PaymentId,
    pub client_id: ClientId,
    /// Crypto-native amount and currency
    pub amount: Option<f64>,
    pub currency: Option<String>,
    /// Fiat-side amount and currency code (e.g. `TRY`, `USD`)
    pub fiat_amount: Option<f64>,
    pub fiat_currency: Option<String>,
    /// Calculated crypto settlement amount and currency
    pub crypto_amount: Option<f64>,
    pub crypto_currency: Option<String>,
    pub status: String,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}
