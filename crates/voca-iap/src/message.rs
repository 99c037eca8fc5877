//! Outbound purchase messages for the embedded content.

use serde::Serialize;
use serde_json::Value;

use crate::Platform;

/// Error codes carried in `iap_purchase_error` messages.
pub mod codes {
    /// No bearer credential in the cookie store; verification never started.
    pub const NO_ACCESS_TOKEN: &str = "NO_ACCESS_TOKEN";
    /// The auth retry was exhausted (two consecutive 401s).
    pub const AUTH_REQUIRED: &str = "AUTH_REQUIRED";
    /// The backend rejected the receipt, or the request could not be made.
    pub const SERVER_VERIFICATION_FAILED: &str = "SERVER_VERIFICATION_FAILED";
    /// Finalize failed after successful verification; entitlement is already
    /// recorded server-side.
    pub const PURCHASE_PROCESSING_FAILED: &str = "PURCHASE_PROCESSING_FAILED";
    /// Initiating the purchase with the platform store failed.
    pub const PURCHASE_FAILED: &str = "PURCHASE_FAILED";
    /// Fallback for platform error events without a code.
    pub const PURCHASE_ERROR: &str = "PURCHASE_ERROR";
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedData {
    #[serde(rename = "itemId")]
    pub item_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessData {
    pub platform: Platform,
    pub product_id: String,
    pub quantity: u32,
    pub transaction_id: String,
    pub transaction_date: i64,
    pub server_verified: bool,
    /// Verification response body, verbatim.
    pub server_response: Value,
    pub gems_awarded: i64,
    pub user_gems: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorData {
    pub error: String,
    pub message: String,
}

/// Wire envelopes, `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum IapMessage {
    #[serde(rename = "iap_purchase_started")]
    Started { data: StartedData },
    #[serde(rename = "iap_purchase_success")]
    Success { data: Box<SuccessData> },
    #[serde(rename = "iap_purchase_error")]
    Error { data: ErrorData },
}

impl IapMessage {
    pub fn started(item_id: impl Into<String>) -> Self {
        Self::Started {
            data: StartedData {
                item_id: item_id.into(),
            },
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            data: ErrorData {
                error: code.to_string(),
                message: message.into(),
            },
        }
    }
}
