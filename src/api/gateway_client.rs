// src/api/gateway_client.rs
//
// Minimal client for the payment gateway's Orders API.
// Auth: HTTP Basic with key id / key secret.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway api error status={status} body={body}")]
    Api { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
pub struct CreateOrderRequest {
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 in lowercase hex.
pub fn sign_hmac_sha256_hex(secret: &str, data: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature.
pub fn verify_hmac_sha256_hex(secret: &str, data: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
}

impl GatewayClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Public key id, handed to the checkout widget.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub async fn create_order(&self, req: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let resp = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<GatewayOrder>(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("{e}; body={body}")))
    }

    /// Checkout callback signature: HMAC of `"{order_id}|{payment_id}"`.
    pub fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let payload = format!("{order_id}|{payment_id}");
        verify_hmac_sha256_hex(&self.key_secret, payload.as_bytes(), signature)
    }

    /// Webhook signature: HMAC of the raw request body.
    pub fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        verify_hmac_sha256_hex(&self.webhook_secret, body, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GatewayClient {
        GatewayClient::new(reqwest::Client::new(), "http://localhost/", "key_id", "key_secret", "hook_secret")
    }

    #[test]
    fn known_hmac_vector() {
        // RFC 4231 test case 2
        let sig = sign_hmac_sha256_hex("Jefe", b"what do ya want for nothing?");
        assert_eq!(sig, "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843");
    }

    #[test]
    fn payment_signature_round_trip() {
        let c = client();
        let sig = sign_hmac_sha256_hex("key_secret", b"order_1|pay_1");
        assert!(c.verify_payment_signature("order_1", "pay_1", &sig));
        assert!(!c.verify_payment_signature("order_1", "pay_2", &sig));
    }

    #[test]
    fn webhook_signature_uses_webhook_secret() {
        let c = client();
        let body = br#"{"event":"payment.captured"}"#;
        let good = sign_hmac_sha256_hex("hook_secret", body);
        let wrong_secret = sign_hmac_sha256_hex("key_secret", body);
        assert!(c.verify_webhook_signature(body, &good));
        assert!(!c.verify_webhook_signature(body, &wrong_secret));
        assert!(!c.verify_webhook_signature(body, "not-hex"));
    }

    #[test]
    fn api_error_message_keeps_status_and_body() {
        let err = GatewayError::Api {
            status: 502,
            body: "bad upstream".into(),
        };
        assert_eq!(err.to_string(), "gateway api error status=502 body=bad upstream");
    }

    #[test]
    fn base_url_is_trimmed() {
        assert_eq!(client().base_url, "http://localhost");
    }
}
