//! # Payload Signing Module
//!
//! HMAC-SHA256 signing of webhook payloads so clients can authenticate the
//! sender.
//!
//! The signature covers the canonical string `"{timestamp}.{canonical
//! JSON}"`. Canonical JSON sorts object keys lexicographically at every
//! depth and uses compact separators, so sender and receiver compute the
//! same digest regardless of how the payload map was built or re-parsed.
//!
//! [`verify`] never errors and never distinguishes failure reasons; a
//! receiver observing `false` learns nothing about which input was wrong.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for signing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("Webhook secret is required for signing")]
    MissingSecret,

    #[error("Secret cannot be used as an HMAC key")]
    InvalidSecret,
}

// ============================================================================
// Canonical JSON
// ============================================================================

/// Serialize a JSON value deterministically
///
/// Object keys are sorted lexicographically at every nesting depth and the
/// output carries no whitespace. Array order is preserved; scalars use
/// `serde_json`'s compact forms.
///
/// # Examples
///
/// ```rust
/// use paycrypt_webhook_core::signer::canonical_json;
/// use serde_json::json;
///
/// let value = json!({"b": 1, "a": {"d": true, "c": [1, 2]}});
/// assert_eq!(canonical_json(&value), r#"{"a":{"c":[1,2],"d":true},"b":1}"#);
/// ```
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (index, key) in keys.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                // Value::String carries serde_json's escaping rules
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(child) = map.get(key) {
                    write_canonical(child, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// ============================================================================
// Sign / Verify
// ============================================================================

/// Generate the hex HMAC-SHA256 signature for a webhook payload
///
/// # Arguments
///
/// * `secret` - The client's webhook signing secret
/// * `timestamp` - The RFC3339 timestamp sent in the timestamp header
/// * `payload` - The payload sent as the request body
///
/// # Errors
///
/// Returns [`SigningError::MissingSecret`] when `secret` is empty.
///
/// # Examples
///
/// ```rust
/// use paycrypt_webhook_core::signer::{sign, verify};
/// use serde_json::json;
///
/// let payload = json!({"event_type": "payment.completed"});
/// let signature = sign("secret", "2026-01-01T00:00:00+00:00", &payload).unwrap();
/// assert_eq!(signature.len(), 64);
/// assert!(verify("secret", "2026-01-01T00:00:00+00:00", &payload, &signature));
/// ```
pub fn sign(secret: &str, timestamp: &str, payload: &Value) -> Result<String, SigningError> {
    if secret.is_empty() {
        return Err(SigningError::MissingSecret);
    }

    let signing_string = format!("{}.{}", timestamp, canonical_json(payload));

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SigningError::InvalidSecret)?;
    mac.update(signing_string.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a signature received alongside a webhook payload
///
/// Recomputes the expected signature and compares in constant time. Returns
/// `false` on any failure — missing secret, missing signature, or signing
/// error — without distinguishing the reason.
pub fn verify(secret: &str, timestamp: &str, payload: &Value, provided_signature: &str) -> bool {
    if secret.is_empty() || provided_signature.is_empty() {
        return false;
    }

    let expected = match sign(secret, timestamp, payload) {
        Ok(signature) => signature,
        Err(_) => return false,
    };

    expected
        .as_bytes()
        .ct_eq(provided_signature.as_bytes())
        .into()
}

#[cfg(test)]
#[path = "signer_tests.rs"]
mod tests;
