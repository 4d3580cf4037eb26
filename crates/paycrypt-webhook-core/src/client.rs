//! # Client Webhook Configuration
//!
//! Lookup of per-client delivery settings: whether webhooks are enabled,
//! where to POST, and the signing secret if one was provisioned.
//!
//! The payment domain owns the client records; this module only defines the
//! read side the factory and dispatcher need, behind a [`ClientDirectory`]
//! trait so production can back it with the client database while tests use
//! [`InMemoryClientDirectory`].

use crate::ClientId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

// ============================================================================
// Configuration Type
// ============================================================================

/// A client's webhook delivery settings
///
/// An empty URL string reads as unconfigured. A secret that is present but
/// empty still counts as configured: the dispatcher will attempt to sign,
/// fail, and consume retry budget rather than silently send unsigned.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientWebhookConfig {
    pub webhook_enabled: bool,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
}

impl ClientWebhookConfig {
    /// Delivery URL, if one is configured and non-empty
    pub fn delivery_url(&self) -> Option<&str> {
        self.webhook_url.as_deref().filter(|url| !url.is_empty())
    }
}

impl std::fmt::Debug for ClientWebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientWebhookConfig")
            .field("webhook_enabled", &self.webhook_enabled)
            .field("webhook_url", &self.webhook_url)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for directory lookup failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("Client directory unavailable: {message}")]
    Unavailable { message: String },
}

// ============================================================================
// Directory Trait
// ============================================================================

/// Read-only lookup from client id to webhook configuration
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Fetch the webhook configuration for a client
    ///
    /// Returns `Ok(None)` when the client does not exist; an `Err` means the
    /// backing store could not answer at all.
    async fn webhook_config(
        &self,
        client_id: ClientId,
    ) -> Result<Option<ClientWebhookConfig>, DirectoryError>;
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// Thread-safe in-memory [`ClientDirectory`] for tests and development
#[derive(Debug, Default)]
pub struct InMemoryClientDirectory {
    clients: RwLock<HashMap<ClientId, ClientWebhookConfig>>,
}

impl InMemoryClientDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a client's webhook configuration
    pub fn insert(&self, client_id: ClientId, config: ClientWebhookConfig) {
        self.clients.write().unwrap().insert(client_id, config);
    }
}

#[async_trait]
impl ClientDirectory for InMemoryClientDirectory {
    async fn webhook_config(
        &self,
        client_id: ClientId,
    ) -> Result<Option<ClientWebhookConfig>, DirectoryError> {
        let clients = self
            .clients
            .read()
            .map_err(|e| DirectoryError::Unavailable {
                message: e.to_string(),
            })?;
        Ok(clients.get(&client_id).cloned())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
