use async_trait::async_trait;

use crate::domain::entities::billing_result::BillingResult;
use crate::domain::entities::inventory::Inventory;
use crate::domain::entities::item_type::ItemType;
use crate::domain::entities::purchase::Purchase;
use crate::errors::BillingError;

/// Outcome of an inventory query. `result` is OK when every returned record
/// verified; a verification-failed result still carries the full inventory so
/// the caller can inspect what the vendor reported.
#[derive(Debug)]
pub struct InventoryOutcome {
    pub result: BillingResult,
    pub inventory: Inventory,
}

/// Outcome of a flat purchase listing, with the same verification semantics
/// as [`InventoryOutcome`].
#[derive(Debug)]
pub struct PurchaseListing {
    pub result: BillingResult,
    pub purchases: Vec<Purchase>,
}

/// Uniform store-agnostic billing surface. One adapter exists per configured
/// store; all of them hold to the same lifecycle:
///
/// 1. [`start_setup`](BillingAdapter::start_setup) exactly once;
/// 2. any number of operations, one at a time;
/// 3. [`dispose`](BillingAdapter::dispose), after which every call fails.
///
/// Adapters run one asynchronous operation at a time. Starting a second while
/// one is in flight fails with [`BillingError::ConcurrentOperation`].
#[async_trait]
pub trait BillingAdapter: Send + Sync {
    /// Connects to the store's billing service and probes what it supports.
    async fn start_setup(&self) -> Result<BillingResult, BillingError>;

    /// Runs the full purchase flow for one SKU, including the store's own UI,
    /// and resolves once the user has completed or abandoned it.
    async fn launch_purchase_flow(
        &self,
        sku: &str,
        item_type: ItemType,
        developer_payload: &str,
    ) -> Result<Purchase, BillingError>;

    /// Consumes a purchase so its SKU can be bought again. Only valid for
    /// [`ItemType::InApp`] purchases.
    async fn consume(&self, purchase: &Purchase) -> Result<Purchase, BillingError>;

    /// Queries owned purchases plus listing details for the owned SKUs and
    /// any additionally requested ones.
    async fn query_inventory(&self, skus: &[String]) -> Result<InventoryOutcome, BillingError>;

    /// Queries owned one-time purchases.
    async fn query_purchases(&self) -> Result<PurchaseListing, BillingError>;

    /// Whether the store reported subscription support during setup.
    fn subscriptions_supported(&self) -> bool;

    /// Releases the service binding. Idempotent.
    fn dispose(&self);
}
