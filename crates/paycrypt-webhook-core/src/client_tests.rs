//! Tests for client webhook configuration and the in-memory directory.

use super::*;

fn full_config() -> ClientWebhookConfig {
    ClientWebhookConfig {
        webhook_enabled: true,
        webhook_url: Some("https://client.example/hooks".to_string()),
        webhook_secret: Some("top-secret".to_string()),
    }
}

// ============================================================================
// ClientWebhookConfig tests
// ============================================================================

mod config_tests {
    use super::*;

    /// A configured URL is returned as-is.
    #[test]
    fn test_delivery_url_present() {
        assert_eq!(
            full_config().delivery_url(),
            Some("https://client.example/hooks")
        );
    }

    /// Empty and absent URLs both read as unconfigured.
    #[test]
    fn test_empty_url_is_unconfigured() {
        let mut config = full_config();

        config.webhook_url = Some(String::new());
        assert_eq!(config.delivery_url(), None);

        config.webhook_url = None;
        assert_eq!(config.delivery_url(), None);
    }

    /// The Debug output must not reveal the secret.
    #[test]
    fn test_debug_redacts_secret() {
        let debug_str = format!("{:?}", full_config());
        assert!(
            !debug_str.contains("top-secret"),
            "secret must not appear in debug output; got: {}",
            debug_str
        );
        assert!(debug_str.contains("<REDACTED>"));
    }
}

// ============================================================================
// InMemoryClientDirectory tests
// ============================================================================

mod directory_tests {
    use super::*;

    /// Registered configurations are returned by lookup.
    #[tokio::test]
    async fn test_lookup_registered_client() {
        let directory = InMemoryClientDirectory::new();
        directory.insert(ClientId::new(1), full_config());

        let config = directory.webhook_config(ClientId::new(1)).await.unwrap();
        assert_eq!(config, Some(full_config()));
    }

    /// Unknown clients resolve to None, not an error.
    #[tokio::test]
    async fn test_unknown_client_is_none() {
        let directory = InMemoryClientDirectory::new();
        let config = directory.webhook_config(ClientId::new(404)).await.unwrap();
        assert!(config.is_none());
    }

    /// Re-inserting replaces the stored configuration.
    #[tokio::test]
    async fn test_insert_replaces_existing() {
        let directory = InMemoryClientDirectory::new();
        directory.insert(ClientId::new(1), full_config());

        let mut updated = full_config();
        updated.webhook_enabled = false;
        directory.insert(ClientId::new(1), updated.clone());

        let config = directory.webhook_config(ClientId::new(1)).await.unwrap();
        assert_eq!(config, Some(updated));
    }
}
