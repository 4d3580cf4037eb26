//! Tests for per-event dispatch: the happy path, failure classification and
//! retry bookkeeping, signing behaviour, and the concurrent-run contract.

use super::*;
use crate::transport::HttpTransport;
use paycrypt_webhook_core::{
    ClientId, ClientWebhookConfig, InMemoryClientDirectory, InMemoryEventStore, PaymentId,
    WebhookEventType,
};
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Helpers
// ============================================================================

struct Fixture {
    server: MockServer,
    store: Arc<InMemoryEventStore>,
    directory: Arc<InMemoryClientDirectory>,
    dispatcher: Dispatcher,
}

async fn fixture() -> Fixture {
    let server = MockServer::start().await;
    let store = Arc::new(InMemoryEventStore::new());
    let directory = Arc::new(InMemoryClientDirectory::new());
    let dispatcher = Dispatcher::new(
        store.clone(),
        directory.clone(),
        Arc::new(HttpTransport::new()),
    );
    Fixture {
        server,
        store,
        directory,
        dispatcher,
    }
}

impl Fixture {
    /// Register client 1 pointing at the mock server.
    fn configure_client(&self, secret: Option<&str>) {
        self.directory.insert(
            ClientId::new(1),
            ClientWebhookConfig {
                webhook_enabled: true,
                webhook_url: Some(format!("{}/hooks", self.server.uri())),
                webhook_secret: secret.map(String::from),
            },
        );
    }

    /// Create and persist a pending event for client 1.
    async fn persisted_event(&self) -> WebhookEvent {
        let event = WebhookEvent::new(
            ClientId::new(1),
            PaymentId::new(100),
            WebhookEventType::PaymentCompleted,
            json!({"event_type": "payment.completed", "payment": {"id": 100}}),
        );
        self.store.insert(event.clone()).await.unwrap();
        event
    }
}

// ============================================================================
// Successful delivery tests
// ============================================================================

mod delivery_tests {
    use super::*;

    /// A 2xx response records a terminal delivery.
    #[tokio::test]
    async fn test_2xx_marks_delivered() {
        let fx = fixture().await;
        fx.configure_client(None);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&fx.server)
            .await;

        let event = fx.persisted_event().await;
        let outcome = fx.dispatcher.dispatch(&event, TIMEOUT).await;
        assert!(outcome.is_delivered(), "expected delivery, got {:?}", outcome);

        let row = fx.store.get(event.id).await.unwrap().unwrap();
        assert_eq!(row.status, WebhookEventStatus::Delivered);
        assert_eq!(row.last_response_code, Some(200));
        assert!(row.delivered_at.is_some());
        assert!(row.last_error.is_none());
        assert_eq!(row.attempts, 0, "success does not consume retry budget");
    }

    /// When a secret is configured the request carries a signature the
    /// receiver can verify against the body and timestamp header.
    #[tokio::test]
    async fn test_signature_verifies_against_request() {
        let fx = fixture().await;
        fx.configure_client(Some("s3cret"));
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&fx.server)
            .await;

        let event = fx.persisted_event().await;
        let outcome = fx.dispatcher.dispatch(&event, TIMEOUT).await;
        assert_eq!(outcome, DispatchOutcome::Delivered);

        let requests = fx.server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];

        let timestamp = request
            .headers
            .get(crate::transport::HEADER_TIMESTAMP)
            .unwrap()
            .to_str()
            .unwrap();
        let signature = request
            .headers
            .get(crate::transport::HEADER_SIGNATURE)
            .unwrap()
            .to_str()
            .unwrap();
        let event_id = request
            .headers
            .get(crate::transport::HEADER_EVENT_ID)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(event_id, event.id.to_string());

        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body, event.payload, "every attempt re-sends the frozen payload");
        assert!(
            signer::verify("s3cret", timestamp, &body, signature),
            "receiver-side verification must accept the sent signature"
        );
    }
}

// ============================================================================
// Failure classification tests
// ============================================================================

mod failure_tests {
    use super::*;

    /// A non-2xx response records a failed attempt with the truncated body.
    #[tokio::test]
    async fn test_http_error_records_failure() {
        let fx = fixture().await;
        fx.configure_client(None);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&fx.server)
            .await;

        let event = fx.persisted_event().await;
        let outcome = fx.dispatcher.dispatch(&event, TIMEOUT).await;
        assert_eq!(outcome, DispatchOutcome::Failed);

        let row = fx.store.get(event.id).await.unwrap().unwrap();
        assert_eq!(row.status, WebhookEventStatus::Pending);
        assert_eq!(row.attempts, 1);
        assert_eq!(row.last_response_code, Some(500));
        assert_eq!(
            row.last_error.as_deref(),
            Some("HTTP 500: upstream exploded")
        );
        assert!(
            row.next_attempt_at.unwrap() > Timestamp::now(),
            "a retry must be scheduled in the future"
        );
    }

    /// Long response bodies are truncated to 200 characters in the message.
    #[tokio::test]
    async fn test_response_body_truncated() {
        let fx = fixture().await;
        fx.configure_client(None);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("x".repeat(1000)))
            .mount(&fx.server)
            .await;

        let event = fx.persisted_event().await;
        fx.dispatcher.dispatch(&event, TIMEOUT).await;

        let row = fx.store.get(event.id).await.unwrap().unwrap();
        let message = row.last_error.unwrap();
        assert_eq!(message.len(), "HTTP 502: ".len() + 200);
    }

    /// A missing client configuration consumes retry budget so the event
    /// eventually reaches Failed instead of retrying forever.
    #[tokio::test]
    async fn test_missing_configuration_consumes_budget() {
        let fx = fixture().await;
        // No client registered, no mock mounted

        let event = fx.persisted_event().await;
        let outcome = fx.dispatcher.dispatch(&event, TIMEOUT).await;
        assert_eq!(outcome, DispatchOutcome::Failed);

        let row = fx.store.get(event.id).await.unwrap().unwrap();
        assert_eq!(row.attempts, 1);
        assert_eq!(
            row.last_error.as_deref(),
            Some("Client webhook URL not configured")
        );
        assert!(
            fx.server.received_requests().await.unwrap().is_empty(),
            "no HTTP call may be made without a URL"
        );
    }

    /// An unparseable delivery URL is a recorded configuration failure.
    #[tokio::test]
    async fn test_invalid_url_records_failure() {
        let fx = fixture().await;
        fx.directory.insert(
            ClientId::new(1),
            ClientWebhookConfig {
                webhook_enabled: true,
                webhook_url: Some("not a url".to_string()),
                webhook_secret: None,
            },
        );

        let event = fx.persisted_event().await;
        let outcome = fx.dispatcher.dispatch(&event, TIMEOUT).await;
        assert_eq!(outcome, DispatchOutcome::Failed);

        let row = fx.store.get(event.id).await.unwrap().unwrap();
        assert!(row.last_error.unwrap().starts_with("Invalid webhook URL"));
    }

    /// A configured-but-unusable secret fails the attempt before any HTTP
    /// call is issued.
    #[tokio::test]
    async fn test_signing_failure_prevents_send() {
        let fx = fixture().await;
        fx.configure_client(Some(""));
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&fx.server)
            .await;

        let event = fx.persisted_event().await;
        let outcome = fx.dispatcher.dispatch(&event, TIMEOUT).await;
        assert_eq!(outcome, DispatchOutcome::Failed);

        let row = fx.store.get(event.id).await.unwrap().unwrap();
        assert_eq!(row.attempts, 1);
        assert!(
            row.last_error.as_deref().unwrap().contains("sign"),
            "the stored error must reference signing"
        );
        assert!(fx.server.received_requests().await.unwrap().is_empty());
    }

    /// A transport failure records a descriptive retryable error.
    #[tokio::test]
    async fn test_connection_failure_records_failure() {
        let fx = fixture().await;
        fx.directory.insert(
            ClientId::new(1),
            ClientWebhookConfig {
                webhook_enabled: true,
                // Discard port; nothing listens there
                webhook_url: Some("http://127.0.0.1:9/hooks".to_string()),
                webhook_secret: None,
            },
        );

        let event = fx.persisted_event().await;
        let outcome = fx.dispatcher.dispatch(&event, TIMEOUT).await;
        assert_eq!(outcome, DispatchOutcome::Failed);

        let row = fx.store.get(event.id).await.unwrap().unwrap();
        assert_eq!(row.attempts, 1);
        assert!(row.last_error.unwrap().starts_with("Connection error"));
        assert!(row.last_response_code.is_none());
    }

    /// With the budget one failure from exhaustion, an HTTP 500 lands the
    /// event in terminal Failed.
    #[tokio::test]
    async fn test_final_attempt_failure_is_terminal() {
        let fx = fixture().await;
        fx.configure_client(None);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&fx.server)
            .await;

        let mut event = WebhookEvent::new(
            ClientId::new(1),
            PaymentId::new(100),
            WebhookEventType::PaymentFailed,
            json!({"event_type": "payment.failed"}),
        );
        event.attempts = 4;
        fx.store.insert(event.clone()).await.unwrap();

        let outcome = fx.dispatcher.dispatch(&event, TIMEOUT).await;
        assert_eq!(outcome, DispatchOutcome::Failed);

        let row = fx.store.get(event.id).await.unwrap().unwrap();
        assert_eq!(row.attempts, 5);
        assert_eq!(row.status, WebhookEventStatus::Failed);
        assert!(row.next_attempt_at.is_none());
    }
}

// ============================================================================
// Skip and concurrency tests
// ============================================================================

mod skip_tests {
    use super::*;

    /// An event that went terminal between selection and dispatch is
    /// skipped without side effects.
    #[tokio::test]
    async fn test_stale_batch_entry_skipped() {
        let fx = fixture().await;
        fx.configure_client(None);

        let event = fx.persisted_event().await;
        let row = fx.store.get(event.id).await.unwrap().unwrap();
        fx.store.mark_delivered(&row, 200).await.unwrap();

        let outcome = fx.dispatcher.dispatch(&event, TIMEOUT).await;
        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert!(fx.server.received_requests().await.unwrap().is_empty());
    }

    /// A batch entry whose row has disappeared is skipped.
    #[tokio::test]
    async fn test_missing_row_skipped() {
        let fx = fixture().await;
        fx.configure_client(None);

        let event = WebhookEvent::new(
            ClientId::new(1),
            PaymentId::new(100),
            WebhookEventType::PaymentCreated,
            json!({}),
        );
        let outcome = fx.dispatcher.dispatch(&event, TIMEOUT).await;
        assert_eq!(outcome, DispatchOutcome::Skipped);
    }

    /// Two runs racing on the same event record exactly one delivery; the
    /// loser observes the conflict and skips. (A duplicate POST inside the
    /// race window is the documented at-least-once risk.)
    #[tokio::test]
    async fn test_concurrent_dispatch_records_once() {
        let fx = fixture().await;
        fx.configure_client(None);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&fx.server)
            .await;

        let event = fx.persisted_event().await;
        let (first, second) = tokio::join!(
            fx.dispatcher.dispatch(&event, TIMEOUT),
            fx.dispatcher.dispatch(&event, TIMEOUT),
        );

        let outcomes = [first, second];
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == DispatchOutcome::Delivered)
                .count(),
            1,
            "exactly one run may record the delivery, got {:?}",
            outcomes
        );
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == DispatchOutcome::Skipped)
                .count(),
            1,
            "the losing run must skip, got {:?}",
            outcomes
        );

        let row = fx.store.get(event.id).await.unwrap().unwrap();
        assert_eq!(row.status, WebhookEventStatus::Delivered);
    }
}
