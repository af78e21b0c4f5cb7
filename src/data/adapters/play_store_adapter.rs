use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::BillingConfig;
use crate::data::adapters::lifecycle::AdapterLifecycle;
use crate::domain::adapters::billing_adapter::{BillingAdapter, InventoryOutcome, PurchaseListing};
use crate::domain::entities::billing_result::{
    BillingResult, BILLING_RESPONSE_RESULT_OK, IABHELPER_VERIFICATION_FAILED,
};
use crate::domain::entities::inventory::Inventory;
use crate::domain::entities::item_type::ItemType;
use crate::domain::entities::purchase::Purchase;
use crate::domain::entities::sku_details::SkuDetails;
use crate::domain::services::play_billing_service::{
    response_code_or_ok, ActivityResult, PlayBillingService, BILLING_API_VERSION,
};
use crate::errors::BillingError;
use crate::security;

/// Billing adapter backed by the Play in-app billing service (API v3).
///
/// Generic over the service binding so the purchase flows can be exercised
/// against a scripted double.
pub struct PlayStoreAdapter<S: PlayBillingService> {
    service: S,
    config: BillingConfig,
    lifecycle: AdapterLifecycle,
    subscriptions_supported: AtomicBool,
}

impl<S: PlayBillingService> PlayStoreAdapter<S> {
    pub fn new(service: S, config: BillingConfig) -> Self {
        Self {
            service,
            config,
            lifecycle: AdapterLifecycle::new(),
            subscriptions_supported: AtomicBool::new(false),
        }
    }

    fn verify(&self, sku: &str, payload: &str, signature: &str) -> bool {
        if self.config.verification_skipped() {
            warn!(sku, "skipping purchase signature verification (debug opt-out)");
            return true;
        }
        let key = self.config.play_store_public_key.as_deref().unwrap_or("");
        security::verify_purchase(key, payload, signature)
    }

    /// Queries all owned purchases of one item type, following continuation
    /// tokens until the listing is exhausted. Every purchase the vendor
    /// reports ends up in `inventory`; SKUs whose signature did not verify
    /// are additionally collected into `failed_skus`.
    async fn query_owned_purchases(
        &self,
        item_type: ItemType,
        inventory: &mut Inventory,
        failed_skus: &mut Vec<String>,
    ) -> Result<(), BillingError> {
        let mut continuation_token: Option<String> = None;
        loop {
            let bundle = self
                .service
                .get_purchases(
                    BILLING_API_VERSION,
                    &self.config.package_name,
                    item_type.value(),
                    continuation_token.as_deref(),
                )
                .await?;

            let response = response_code_or_ok(bundle.response_code);
            if response != BILLING_RESPONSE_RESULT_OK {
                return Err(BillingError::from_vendor_code(
                    response,
                    "Error refreshing inventory (querying owned items).",
                ));
            }
            let (owned_skus, purchase_data, signatures) =
                match (bundle.owned_skus, bundle.purchase_data, bundle.signatures) {
                    (Some(skus), Some(data), Some(sigs)) => (skus, data, sigs),
                    _ => {
                        return Err(BillingError::BadResponse {
                            message: "Bundle returned from getPurchases() doesn't contain required fields.".to_string(),
                        })
                    }
                };
            if owned_skus.len() != purchase_data.len() || purchase_data.len() != signatures.len() {
                return Err(BillingError::BadResponse {
                    message: "Bundle returned from getPurchases() has mismatched list lengths."
                        .to_string(),
                });
            }

            for (index, payload) in purchase_data.iter().enumerate() {
                let signature = signatures.get(index).map(String::as_str).unwrap_or("");
                let sku = owned_skus.get(index).map(String::as_str).unwrap_or("");
                if !self.verify(sku, payload, signature) {
                    warn!(sku, "purchase signature verification failed");
                    failed_skus.push(sku.to_string());
                }
                let purchase =
                    Purchase::from_play_store(item_type, signature.to_string(), payload)?;
                if !purchase.has_token() {
                    warn!(sku = %purchase.sku, "in-app billing warning: purchase is missing its token");
                }
                inventory.add_purchase(purchase);
            }

            continuation_token = bundle.continuation_token.filter(|t| !t.is_empty());
            if continuation_token.is_none() {
                return Ok(());
            }
            debug!(item_type = %item_type, "continuation token present, fetching next page");
        }
    }

    /// Fetches listing details for the owned SKUs of `item_type` plus any
    /// extra requested SKUs not already owned.
    async fn query_sku_details(
        &self,
        item_type: ItemType,
        inventory: &mut Inventory,
        requested_skus: &[String],
    ) -> Result<(), BillingError> {
        let mut skus = inventory.all_owned_skus(item_type);
        for sku in requested_skus {
            if !skus.contains(sku) {
                skus.push(sku.clone());
            }
        }
        if skus.is_empty() {
            return Ok(());
        }

        let bundle = self
            .service
            .get_sku_details(
                BILLING_API_VERSION,
                &self.config.package_name,
                item_type.value(),
                &skus,
            )
            .await?;

        let response = response_code_or_ok(bundle.response_code);
        if response != BILLING_RESPONSE_RESULT_OK {
            return Err(BillingError::from_vendor_code(
                response,
                "Error refreshing inventory (querying prices of items).",
            ));
        }
        let details = bundle.details.ok_or_else(|| BillingError::BadResponse {
            message: "getSkuDetails() returned a bundle with neither an error nor a detail list."
                .to_string(),
        })?;
        for payload in &details {
            inventory.add_sku_details(SkuDetails::from_play_store(item_type, payload)?);
        }
        Ok(())
    }

    async fn query_inventory_inner(
        &self,
        skus: &[String],
    ) -> Result<(Inventory, Vec<String>), BillingError> {
        let mut inventory = Inventory::new();
        let mut failed_skus = Vec::new();

        self.query_owned_purchases(ItemType::InApp, &mut inventory, &mut failed_skus)
            .await?;
        self.query_sku_details(ItemType::InApp, &mut inventory, skus)
            .await?;

        if self.subscriptions_supported.load(Ordering::Acquire) {
            self.query_owned_purchases(ItemType::Subscription, &mut inventory, &mut failed_skus)
                .await?;
            self.query_sku_details(ItemType::Subscription, &mut inventory, skus)
                .await?;
        }

        Ok((inventory, failed_skus))
    }

    /// A query returning any unverifiable purchases still succeeds; the
    /// aggregate result is downgraded so the caller can decide what to trust.
    fn aggregate_result(failed_skus: &[String]) -> BillingResult {
        if failed_skus.is_empty() {
            BillingResult::ok("Inventory refresh successful.")
        } else {
            BillingResult::new(
                IABHELPER_VERIFICATION_FAILED,
                &format!(
                    "Signature verification failed for sku(s): {}",
                    failed_skus.join(", ")
                ),
            )
        }
    }
}

#[async_trait]
impl<S: PlayBillingService> BillingAdapter for PlayStoreAdapter<S> {
    async fn start_setup(&self) -> Result<BillingResult, BillingError> {
        self.lifecycle.begin_setup()?;
        let outcome = async {
            self.service.connect().await?;

            let response = self
                .service
                .is_billing_supported(
                    BILLING_API_VERSION,
                    &self.config.package_name,
                    ItemType::InApp.value(),
                )
                .await?;
            if response != BILLING_RESPONSE_RESULT_OK {
                return Err(BillingError::from_vendor_code(
                    response,
                    "Error checking for billing v3 support.",
                ));
            }

            let subs_response = self
                .service
                .is_billing_supported(
                    BILLING_API_VERSION,
                    &self.config.package_name,
                    ItemType::Subscription.value(),
                )
                .await?;
            let subs = subs_response == BILLING_RESPONSE_RESULT_OK;
            self.subscriptions_supported.store(subs, Ordering::Release);
            if subs {
                info!("subscriptions are available");
            } else {
                info!(response = subs_response, "subscriptions are NOT available");
            }

            Ok(BillingResult::ok("Setup successful."))
        }
        .await;
        self.lifecycle.finish_setup(outcome.is_ok());
        outcome
    }

    async fn launch_purchase_flow(
        &self,
        sku: &str,
        item_type: ItemType,
        developer_payload: &str,
    ) -> Result<Purchase, BillingError> {
        let _guard = self.lifecycle.begin_operation("launchPurchaseFlow")?;

        if item_type == ItemType::Subscription
            && !self.subscriptions_supported.load(Ordering::Acquire)
        {
            return Err(BillingError::SubscriptionsUnavailable);
        }

        debug!(sku, item_type = %item_type, "constructing buy intent");
        let bundle = self
            .service
            .get_buy_intent(
                BILLING_API_VERSION,
                &self.config.package_name,
                sku,
                item_type.value(),
                developer_payload,
            )
            .await?;

        let response = response_code_or_ok(bundle.response_code);
        if response != BILLING_RESPONSE_RESULT_OK {
            return Err(BillingError::from_vendor_code(response, "Unable to buy item"));
        }
        let flow = bundle.flow.ok_or_else(|| BillingError::SendFlowFailed {
            message: format!("Failed to launch purchase flow for sku {sku}"),
        })?;

        let outcome = flow.resolve().await.ok_or_else(|| BillingError::BadResponse {
            message: "Null data in IAB activity result.".to_string(),
        })?;

        let response = response_code_or_ok(outcome.response_code);
        match (outcome.activity_result, response) {
            (ActivityResult::Ok, BILLING_RESPONSE_RESULT_OK) => {
                let (payload, signature) = match (outcome.purchase_data, outcome.signature) {
                    (Some(payload), Some(signature)) => (payload, signature),
                    _ => {
                        return Err(BillingError::Unknown {
                            message: "IAB returned null purchaseData or dataSignature".to_string(),
                        })
                    }
                };
                let purchase = Purchase::from_play_store(item_type, signature.clone(), &payload)?;
                if !self.verify(&purchase.sku, &payload, &signature) {
                    return Err(BillingError::VerificationFailed {
                        sku: purchase.sku.clone(),
                        purchase: Some(Box::new(purchase)),
                    });
                }
                debug!(sku = %purchase.sku, "purchase successful");
                Ok(purchase)
            }
            (ActivityResult::Ok, code) => Err(BillingError::from_vendor_code(
                code,
                "Problem purchasing item.",
            )),
            (ActivityResult::Canceled, _) => {
                debug!(sku, "purchase canceled");
                Err(BillingError::UserCancelled)
            }
            (ActivityResult::Other(result), _) => {
                warn!(result, response, "purchase failed with unknown activity result");
                Err(BillingError::UnknownPurchaseResponse)
            }
        }
    }

    async fn consume(&self, purchase: &Purchase) -> Result<Purchase, BillingError> {
        let _guard = self.lifecycle.begin_operation("consume")?;

        if purchase.item_type != ItemType::InApp {
            return Err(BillingError::InvalidConsumption {
                item_type: purchase.item_type,
            });
        }
        let token = purchase
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BillingError::MissingToken {
                sku: purchase.sku.clone(),
            })?;

        debug!(sku = %purchase.sku, "consuming purchase");
        let response = self
            .service
            .consume_purchase(BILLING_API_VERSION, &self.config.package_name, token)
            .await?;
        if response != BILLING_RESPONSE_RESULT_OK {
            return Err(BillingError::from_vendor_code(
                response,
                &format!("Error consuming sku {}", purchase.sku),
            ));
        }
        info!(sku = %purchase.sku, "successfully consumed");
        Ok(purchase.clone())
    }

    async fn query_inventory(&self, skus: &[String]) -> Result<InventoryOutcome, BillingError> {
        let _guard = self.lifecycle.begin_operation("queryInventory")?;
        let (inventory, failed_skus) = self.query_inventory_inner(skus).await?;
        Ok(InventoryOutcome {
            result: Self::aggregate_result(&failed_skus),
            inventory,
        })
    }

    async fn query_purchases(&self) -> Result<PurchaseListing, BillingError> {
        let _guard = self.lifecycle.begin_operation("queryPurchases")?;
        let mut inventory = Inventory::new();
        let mut failed_skus = Vec::new();
        self.query_owned_purchases(ItemType::InApp, &mut inventory, &mut failed_skus)
            .await?;
        Ok(PurchaseListing {
            result: Self::aggregate_result(&failed_skus),
            purchases: inventory.all_purchases().into_iter().cloned().collect(),
        })
    }

    fn subscriptions_supported(&self) -> bool {
        self.subscriptions_supported.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        if !self.lifecycle.is_disposed() {
            debug!("disposing of Play Store billing adapter");
            self.lifecycle.dispose();
        }
    }
}
