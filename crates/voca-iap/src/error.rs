use thiserror::Error;

/// Failure from the platform purchase store (connection init or purchase
/// request), or delivered on its error event stream.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PurchaseStoreError {
    /// Platform error code such as `E_USER_CANCELLED`, when available.
    pub code: Option<String>,
    pub message: String,
}

impl PurchaseStoreError {
    pub fn new(code: impl Into<Option<String>>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Receipt verification failure.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The backend rejected the bearer credential (HTTP 401).
    #[error("verification endpoint rejected the bearer credential")]
    Unauthorized,

    /// Any other non-2xx response; `message` is the server's `error` string
    /// or a generic fallback.
    #[error("verification rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Acknowledging an already-verified purchase failed.
///
/// The server has recorded the entitlement at this point, so this is local
/// bookkeeping trouble, distinct from a failed purchase.
#[derive(Debug, Error)]
#[error("transaction finalize failed: {0}")]
pub struct FinalizeError(pub String);
