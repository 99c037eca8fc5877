//! In-app purchase verification.
//!
//! The platform purchase store is a capability that emits purchase events;
//! this crate owns everything that happens after one arrives: assembling the
//! receipt, verifying it against the backend with the user's bearer token,
//! retrying once through a web-side session refresh on 401, acknowledging
//! the transaction, and reporting the outcome back to the embedded content.
//!
//! A purchase is never finalized before server verification succeeds.

mod error;
mod flow;
mod message;
mod store;
mod types;
mod verify;

pub use error::{FinalizeError, PurchaseStoreError, VerifyError};
pub use flow::{PurchaseFlow, REFRESH_SCRIPT};
pub use message::{codes, IapMessage};
pub use store::PurchaseStore;
pub use types::{AndroidReceipt, IosReceipt, Platform, Purchase, PurchaseEvent, PurchaseState};
pub use verify::{receipt_payload, HttpVerifier, ReceiptVerifier};
