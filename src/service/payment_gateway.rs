// service/payment_gateway.rs
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::Config;

const SANDBOX_SNAP_URL: &str = "https://app.sandbox.midtrans.com/snap/v1/transactions";
const PRODUCTION_SNAP_URL: &str = "https://app.midtrans.com/snap/v1/transactions";
const SANDBOX_API_URL: &str = "https://api.sandbox.midtrans.com/v2";
const PRODUCTION_API_URL: &str = "https://api.midtrans.com/v2";

/// Gateway statuses after which a checkout can never succeed.
const TERMINAL_FAILURE_STATUSES: [&str; 4] = ["deny", "cancel", "expire", "failure"];

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request to payment gateway failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment gateway rejected the request: {0}")]
    Upstream(String),

    #[error("unexpected payment gateway response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSession {
    pub session_token: String,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionStatus {
    pub transaction_status: String,
    pub fraud_status: Option<String>,
}

/// Inbound payment notification. Every field is optional so a malformed
/// payload still deserializes and is rejected by signature verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub order_id: Option<String>,
    pub transaction_status: Option<String>,
    pub fraud_status: Option<String>,
    pub status_code: Option<String>,
    pub gross_amount: Option<String>,
    pub signature_key: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    async fn create_transaction(
        &self,
        order_id: &str,
        amount: i64,
        payer_email: &str,
        description: &str,
    ) -> Result<TransactionSession, GatewayError>;

    async fn get_transaction_status(&self, order_id: &str) -> Result<TransactionStatus, GatewayError>;

    fn verify_signature(&self, notification: &PaymentNotification) -> bool;
}

pub fn is_payment_success(transaction_status: &str, fraud_status: Option<&str>) -> bool {
    (transaction_status == "capture" && fraud_status == Some("accept"))
        || transaction_status == "settlement"
}

pub fn is_payment_expired_or_cancelled(transaction_status: &str) -> bool {
    TERMINAL_FAILURE_STATUSES.contains(&transaction_status)
}

/// Lowercase hex SHA-512 over `order_id ‖ status_code ‖ gross_amount ‖ server_key`.
pub fn compute_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a notification's `signature_key` against the digest computed with `server_key`.
pub fn verify_notification_signature(notification: &PaymentNotification, server_key: &str) -> bool {
    let (Some(order_id), Some(status_code), Some(gross_amount), Some(signature)) = (
        notification.order_id.as_deref(),
        notification.status_code.as_deref(),
        notification.gross_amount.as_deref(),
        notification.signature_key.as_deref(),
    ) else {
        return false;
    };

    let expected = compute_signature(order_id, status_code, gross_amount, server_key);
    signature.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[derive(Debug, Clone)]
pub struct MidtransGateway {
    client: reqwest::Client,
    server_key: String,
    snap_url: &'static str,
    api_url: &'static str,
}

impl MidtransGateway {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gateway_timeout_secs))
            .build()?;

        let (snap_url, api_url) = if config.midtrans_is_production {
            (PRODUCTION_SNAP_URL, PRODUCTION_API_URL)
        } else {
            (SANDBOX_SNAP_URL, SANDBOX_API_URL)
        };

        Ok(Self {
            client,
            server_key: config.midtrans_server_key.clone(),
            snap_url,
            api_url,
        })
    }

    fn authorization(&self) -> String {
        format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:", self.server_key))
        )
    }
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    async fn create_transaction(
        &self,
        order_id: &str,
        amount: i64,
        payer_email: &str,
        description: &str,
    ) -> Result<TransactionSession, GatewayError> {
        let payload = serde_json::json!({
            "transaction_details": {
                "order_id": order_id,
                "gross_amount": amount,
            },
            "customer_details": {
                "email": payer_email,
            },
            "item_details": [{
                "id": order_id,
                "price": amount,
                "quantity": 1,
                "name": truncate(description, 50),
            }],
        });

        let response = self
            .client
            .post(self.snap_url)
            .header("Authorization", self.authorization())
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let response_body: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let message = response_body["error_messages"]
                .as_array()
                .and_then(|errors| errors.first())
                .and_then(|e| e.as_str())
                .unwrap_or("Transaction creation failed");
            return Err(GatewayError::Upstream(format!("{} ({})", message, status)));
        }

        let session_token = response_body["token"]
            .as_str()
            .ok_or_else(|| GatewayError::InvalidResponse("missing token".to_string()))?
            .to_string();

        Ok(TransactionSession {
            session_token,
            redirect_url: response_body["redirect_url"].as_str().map(str::to_string),
        })
    }

    async fn get_transaction_status(&self, order_id: &str) -> Result<TransactionStatus, GatewayError> {
        let url = format!("{}/{}/status", self.api_url, order_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.authorization())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let response_body: serde_json::Value = response.json().await?;

        if !status.is_success() {
            return Err(GatewayError::Upstream(format!(
                "{} ({})",
                response_body["status_message"].as_str().unwrap_or("Status check failed"),
                status
            )));
        }

        // Unknown orders come back as 200 with a 404 status_code in the body.
        if response_body["status_code"].as_str() == Some("404") {
            return Ok(TransactionStatus {
                transaction_status: "pending".to_string(),
                fraud_status: None,
            });
        }

        let transaction_status = response_body["transaction_status"]
            .as_str()
            .ok_or_else(|| GatewayError::InvalidResponse("missing transaction_status".to_string()))?
            .to_string();

        Ok(TransactionStatus {
            transaction_status,
            fraud_status: response_body["fraud_status"].as_str().map(str::to_string),
        })
    }

    fn verify_signature(&self, notification: &PaymentNotification) -> bool {
        verify_notification_signature(notification, &self.server_key)
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_KEY: &str = "SB-Mid-server-test-key";

    fn signed_notification(status_code: &str, gross_amount: &str) -> PaymentNotification {
        let order_id = "esc-a1b2c3d4e5f6-1718000000000";
        PaymentNotification {
            order_id: Some(order_id.to_string()),
            transaction_status: Some("settlement".to_string()),
            fraud_status: Some("accept".to_string()),
            status_code: Some(status_code.to_string()),
            gross_amount: Some(gross_amount.to_string()),
            signature_key: Some(compute_signature(order_id, status_code, gross_amount, SERVER_KEY)),
        }
    }

    #[test]
    fn test_signature_is_sha512_hex() {
        let signature = compute_signature("order-1", "200", "150000.00", SERVER_KEY);
        assert_eq!(signature.len(), 128);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(signature, compute_signature("order-1", "200", "150000.00", SERVER_KEY));
        assert_ne!(signature, compute_signature("order-1", "200", "150001.00", SERVER_KEY));
    }

    #[test]
    fn test_valid_signature_is_accepted() {
        let notification = signed_notification("200", "150000.00");
        assert!(verify_notification_signature(&notification, SERVER_KEY));
    }

    #[test]
    fn test_tampered_notification_is_rejected() {
        let mut notification = signed_notification("200", "150000.00");
        notification.gross_amount = Some("1.00".to_string());
        assert!(!verify_notification_signature(&notification, SERVER_KEY));

        let notification = signed_notification("200", "150000.00");
        assert!(!verify_notification_signature(&notification, "another-key"));
    }

    #[test]
    fn test_missing_fields_fail_verification() {
        let mut notification = signed_notification("200", "150000.00");
        notification.status_code = None;
        assert!(!verify_notification_signature(&notification, SERVER_KEY));

        let mut notification = signed_notification("200", "150000.00");
        notification.signature_key = None;
        assert!(!verify_notification_signature(&notification, SERVER_KEY));

        assert!(!verify_notification_signature(&PaymentNotification::default(), SERVER_KEY));
    }

    #[test]
    fn test_payment_success_rules() {
        assert!(is_payment_success("settlement", None));
        assert!(is_payment_success("settlement", Some("challenge")));
        assert!(is_payment_success("capture", Some("accept")));
        assert!(!is_payment_success("capture", Some("challenge")));
        assert!(!is_payment_success("capture", None));
        assert!(!is_payment_success("pending", Some("accept")));
    }

    #[test]
    fn test_terminal_failure_statuses() {
        for status in ["deny", "cancel", "expire", "failure"] {
            assert!(is_payment_expired_or_cancelled(status), "{}", status);
        }
        for status in ["pending", "settlement", "capture", "refund"] {
            assert!(!is_payment_expired_or_cancelled(status), "{}", status);
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("Desain logo", 50), "Desain logo");
        assert_eq!(truncate("ééééé", 3), "ééé");
    }
}
