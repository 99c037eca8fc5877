use async_trait::async_trait;

use crate::{FinalizeError, Purchase, PurchaseStoreError};

/// The platform purchase store capability.
///
/// Purchase outcomes are not returned from `request_purchase`; they arrive
/// asynchronously as [`crate::PurchaseEvent`]s on the channel the host wires
/// into [`crate::PurchaseFlow::run`].
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Connect and register event listeners. Idempotent: calling again when
    /// already connected is a successful no-op.
    async fn init_connection(&self) -> Result<(), PurchaseStoreError>;

    /// Start a purchase for the given SKU.
    async fn request_purchase(&self, sku: &str) -> Result<(), PurchaseStoreError>;

    /// Acknowledge a delivered purchase, consuming it if `consumable`.
    async fn finish_transaction(
        &self,
        purchase: &Purchase,
        consumable: bool,
    ) -> Result<(), FinalizeError>;
}
