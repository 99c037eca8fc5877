use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

/// iOS receipt material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IosReceipt {
    pub transaction_receipt: String,
    pub original_transaction_id: Option<String>,
}

/// Android receipt material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndroidReceipt {
    pub purchase_token: String,
    pub package_name: String,
    /// Raw purchase data blob the signature covers.
    pub data: Option<String>,
    pub signature: Option<String>,
}

/// One in-flight platform transaction, as delivered by the purchase store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub product_id: String,
    pub quantity: u32,
    pub transaction_id: String,
    /// Millisecond epoch.
    pub transaction_date: i64,
    pub platform: Platform,
    pub ios: Option<IosReceipt>,
    pub android: Option<AndroidReceipt>,
}

/// Events emitted by the platform purchase store.
#[derive(Debug, Clone)]
pub enum PurchaseEvent {
    Updated(Purchase),
    Failed { code: Option<String>, message: String },
}

/// Where a given transaction id sits in the verification flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseState {
    Idle,
    Initiated,
    AwaitingPlatformResult,
    Verifying,
    TokenRefreshRetry,
    Verified,
    Finalizing,
    Completed,
    VerifyFailed,
    FinalizeFailed,
}
