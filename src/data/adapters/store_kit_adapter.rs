use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::BillingConfig;
use crate::data::adapters::lifecycle::AdapterLifecycle;
use crate::domain::adapters::billing_adapter::{BillingAdapter, InventoryOutcome, PurchaseListing};
use crate::domain::entities::billing_result::BillingResult;
use crate::domain::entities::inventory::Inventory;
use crate::domain::entities::item_type::ItemType;
use crate::domain::entities::purchase::{Purchase, PURCHASE_STATE_PURCHASED};
use crate::domain::entities::sku_details::SkuDetails;
use crate::domain::services::store_kit_service::{
    PaymentOutcome, StoreKitProduct, StoreKitService, StoreKitTransaction,
};
use crate::errors::BillingError;

/// `SKErrorPaymentCancelled`.
const SK_ERROR_PAYMENT_CANCELLED: i32 = 2;

/// Billing adapter backed by StoreKit's payment queue.
///
/// One-time products settle non-atomically: the transaction stays open on the
/// queue and in `pending` until the purchase is consumed, which finishes it.
/// Subscriptions settle atomically since there is nothing to consume.
pub struct StoreKitAdapter<S: StoreKitService> {
    service: S,
    config: BillingConfig,
    lifecycle: AdapterLifecycle,
    subscriptions_supported: AtomicBool,
    pending: Mutex<HashMap<String, StoreKitTransaction>>,
}

impl<S: StoreKitService> StoreKitAdapter<S> {
    pub fn new(service: S, config: BillingConfig) -> Self {
        Self {
            service,
            config,
            lifecycle: AdapterLifecycle::new(),
            subscriptions_supported: AtomicBool::new(false),
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending_lock(&self) -> MutexGuard<'_, HashMap<String, StoreKitTransaction>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn into_purchase(&self, item_type: ItemType, tx: &StoreKitTransaction) -> Purchase {
        let receipt = tx.receipt.clone().or_else(|| self.service.app_store_receipt());
        let raw_payload = serde_json::json!({
            "transactionId": tx.transaction_id,
            "productId": tx.product_id,
            "transactionDate": tx.transaction_date,
            "receipt": receipt,
        })
        .to_string();
        Purchase {
            item_type,
            signature: String::new(),
            order_id: tx.transaction_id.clone(),
            package_name: self.config.package_name.clone(),
            sku: tx.product_id.clone(),
            purchase_time: tx.transaction_date,
            purchase_state: PURCHASE_STATE_PURCHASED,
            developer_payload: String::new(),
            token: Some(tx.transaction_id.clone()),
            raw_payload,
        }
    }

    fn into_sku_details(product: StoreKitProduct) -> SkuDetails {
        SkuDetails {
            item_type: ItemType::InApp,
            sku: product.product_id,
            type_name: ItemType::InApp.value().to_string(),
            price_as_decimal: Some(product.price),
            price: product.formatted_price,
            price_currency: product.currency_code,
            title: product.localized_title,
            description: product.localized_description,
            raw_payload: None,
        }
    }

    async fn restored_purchases(&self) -> Result<Vec<Purchase>, BillingError> {
        let transactions = self.service.restore_purchases().await?;
        Ok(transactions
            .iter()
            .map(|tx| self.into_purchase(ItemType::InApp, tx))
            .collect())
    }
}

#[async_trait]
impl<S: StoreKitService> BillingAdapter for StoreKitAdapter<S> {
    async fn start_setup(&self) -> Result<BillingResult, BillingError> {
        self.lifecycle.begin_setup()?;
        let outcome = if self.service.can_make_payments() {
            self.subscriptions_supported.store(true, Ordering::Release);
            info!("StoreKit payments available");
            Ok(BillingResult::ok("Setup successful."))
        } else {
            Err(BillingError::ServiceUnavailable {
                message: "In-app purchases are disallowed on this device.".to_string(),
            })
        };
        self.lifecycle.finish_setup(outcome.is_ok());
        outcome
    }

    async fn launch_purchase_flow(
        &self,
        sku: &str,
        item_type: ItemType,
        _developer_payload: &str,
    ) -> Result<Purchase, BillingError> {
        let _guard = self.lifecycle.begin_operation("launchPurchaseFlow")?;

        // Nothing to consume on a subscription, so its transaction can be
        // finished as soon as it settles.
        let atomic = item_type == ItemType::Subscription;
        debug!(sku, atomic, "adding payment to the queue");
        match self.service.purchase(sku, 1, atomic).await? {
            PaymentOutcome::Purchased(tx) => {
                let purchase = self.into_purchase(item_type, &tx);
                if !atomic {
                    self.pending_lock().insert(tx.transaction_id.clone(), tx);
                }
                debug!(sku = %purchase.sku, "purchase successful");
                Ok(purchase)
            }
            PaymentOutcome::Cancelled => Err(BillingError::UserCancelled),
            PaymentOutcome::Failed { code, message } if code == SK_ERROR_PAYMENT_CANCELLED => {
                debug!(sku, message, "payment cancelled");
                Err(BillingError::UserCancelled)
            }
            PaymentOutcome::Failed { code, message } => {
                Err(BillingError::Vendor { code, message })
            }
            PaymentOutcome::Deferred => Err(BillingError::Vendor {
                code: 6,
                message: "Purchase was deferred pending approval.".to_string(),
            }),
        }
    }

    async fn consume(&self, purchase: &Purchase) -> Result<Purchase, BillingError> {
        let _guard = self.lifecycle.begin_operation("consume")?;

        if purchase.item_type != ItemType::InApp {
            return Err(BillingError::InvalidConsumption {
                item_type: purchase.item_type,
            });
        }
        let transaction_id = purchase
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BillingError::MissingToken {
                sku: purchase.sku.clone(),
            })?;

        let tx = self
            .pending_lock()
            .remove(transaction_id)
            .ok_or(BillingError::ItemNotOwned)?;
        if let Err(err) = self.service.finish_transaction(&tx.transaction_id).await {
            // Put the record back so the consume can be retried.
            self.pending_lock().insert(tx.transaction_id.clone(), tx);
            return Err(err.into());
        }
        info!(sku = %purchase.sku, "transaction finished");
        Ok(purchase.clone())
    }

    async fn query_inventory(&self, skus: &[String]) -> Result<InventoryOutcome, BillingError> {
        let _guard = self.lifecycle.begin_operation("queryInventory")?;
        let mut inventory = Inventory::new();
        for purchase in self.restored_purchases().await? {
            inventory.add_purchase(purchase);
        }

        let mut wanted: Vec<String> = inventory.all_owned_skus(ItemType::InApp);
        for sku in skus {
            if !wanted.contains(sku) {
                wanted.push(sku.clone());
            }
        }
        if !wanted.is_empty() {
            let response = self.service.retrieve_products(&wanted).await?;
            if !response.invalid_product_ids.is_empty() {
                warn!(invalid = ?response.invalid_product_ids, "store rejected some product ids");
            }
            for product in response.products {
                inventory.add_sku_details(Self::into_sku_details(product));
            }
        }
        Ok(InventoryOutcome {
            result: BillingResult::ok("Inventory refresh successful."),
            inventory,
        })
    }

    async fn query_purchases(&self) -> Result<PurchaseListing, BillingError> {
        let _guard = self.lifecycle.begin_operation("queryPurchases")?;
        Ok(PurchaseListing {
            result: BillingResult::ok("Inventory refresh successful."),
            purchases: self.restored_purchases().await?,
        })
    }

    fn subscriptions_supported(&self) -> bool {
        self.subscriptions_supported.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        if !self.lifecycle.is_disposed() {
            debug!("disposing of StoreKit billing adapter");
            self.pending_lock().clear();
            self.lifecycle.dispose();
        }
    }
}
