//! Receipt verification against the backend.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::{Platform, Purchase, VerifyError};

/// Server-side receipt verification.
#[async_trait]
pub trait ReceiptVerifier: Send + Sync {
    /// Verify one purchase with the given bearer credential. On success the
    /// server's response body is returned verbatim.
    async fn verify(&self, purchase: &Purchase, bearer: &str) -> Result<Value, VerifyError>;
}

/// Receipt payload posted to the verification endpoint.
///
/// Field names match what the backend expects: a common block plus
/// platform-specific receipt material.
pub fn receipt_payload(purchase: &Purchase, bundle_id: &str) -> Value {
    let mut payload = json!({
        "productId": purchase.product_id,
        "quantity": purchase.quantity,
        "transactionId": purchase.transaction_id,
        "transactionDate": purchase.transaction_date,
        "platform": purchase.platform,
    });
    let body = payload.as_object_mut().expect("payload is an object");
    match purchase.platform {
        Platform::Ios => {
            if let Some(ios) = &purchase.ios {
                body.insert(
                    "transactionReceipt".into(),
                    json!(ios.transaction_receipt),
                );
                body.insert(
                    "originalTransactionId".into(),
                    json!(ios.original_transaction_id),
                );
                body.insert("bundleId".into(), json!(bundle_id));
            }
        }
        Platform::Android => {
            if let Some(android) = &purchase.android {
                body.insert("purchaseToken".into(), json!(android.purchase_token));
                body.insert("packageName".into(), json!(android.package_name));
                body.insert("orderId".into(), json!(purchase.transaction_id));
                body.insert("dataAndroid".into(), json!(android.data));
                body.insert("signatureAndroid".into(), json!(android.signature));
            }
        }
    }
    payload
}

/// [`ReceiptVerifier`] over HTTP.
pub struct HttpVerifier {
    http: reqwest::Client,
    verify_url: String,
    bundle_id: String,
}

impl HttpVerifier {
    pub fn new(verify_url: impl Into<String>, bundle_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            verify_url: verify_url.into(),
            bundle_id: bundle_id.into(),
        }
    }
}

#[async_trait]
impl ReceiptVerifier for HttpVerifier {
    async fn verify(&self, purchase: &Purchase, bearer: &str) -> Result<Value, VerifyError> {
        let payload = receipt_payload(purchase, &self.bundle_id);
        debug!(
            transaction_id = %purchase.transaction_id,
            product_id = %purchase.product_id,
            "posting receipt for verification"
        );
        let response = self
            .http
            .post(&self.verify_url)
            .bearer_auth(bearer)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(VerifyError::Unauthorized);
        }
        let body: Value = response.json().await.unwrap_or_else(|_| json!({}));
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("server verification failed")
            .to_string();
        Err(VerifyError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
