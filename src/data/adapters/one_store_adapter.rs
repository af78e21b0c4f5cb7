use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::BillingConfig;
use crate::data::adapters::lifecycle::AdapterLifecycle;
use crate::data::models::one_store::purchase_data_model::PurchaseDataPayloadModel;
use crate::domain::adapters::billing_adapter::{BillingAdapter, InventoryOutcome, PurchaseListing};
use crate::domain::entities::billing_result::BillingResult;
use crate::domain::entities::inventory::Inventory;
use crate::domain::entities::item_type::ItemType;
use crate::domain::entities::purchase::{Purchase, PURCHASE_STATE_PURCHASED};
use crate::domain::entities::sku_details::SkuDetails;
use crate::domain::services::one_store_service::{
    OneStoreOutcome, OneStoreProductDetail, OneStoreProductType, OneStorePurchaseData,
    OneStoreService, ONE_STORE_API_VERSION, ONE_STORE_RESULT_USER_CANCELED,
};
use crate::errors::BillingError;

/// Billing adapter backed by the OneStore purchase client (API v5).
///
/// OneStore signs and verifies purchase payloads inside its own client
/// library, so verification failures surface as a distinct listener outcome
/// rather than a local signature check.
pub struct OneStoreAdapter<S: OneStoreService> {
    service: S,
    config: BillingConfig,
    lifecycle: AdapterLifecycle,
    subscriptions_supported: AtomicBool,
}

impl<S: OneStoreService> OneStoreAdapter<S> {
    pub fn new(service: S, config: BillingConfig) -> Self {
        Self {
            service,
            config,
            lifecycle: AdapterLifecycle::new(),
            subscriptions_supported: AtomicBool::new(false),
        }
    }

    fn product_type(item_type: ItemType) -> OneStoreProductType {
        match item_type {
            ItemType::InApp => OneStoreProductType::InApp,
            ItemType::Subscription => OneStoreProductType::Auto,
        }
    }

    fn unfold<T>(outcome: OneStoreOutcome<T>, context: &str) -> Result<T, BillingError> {
        match outcome {
            OneStoreOutcome::Success(value) => Ok(value),
            OneStoreOutcome::Error(result) if result.code == ONE_STORE_RESULT_USER_CANCELED => {
                Err(BillingError::UserCancelled)
            }
            OneStoreOutcome::Error(result) => Err(BillingError::Vendor {
                code: result.code,
                message: format!("{context}: {}", result.description),
            }),
            OneStoreOutcome::RemoteError => Err(BillingError::Remote {
                message: format!("{context}: remote error talking to OneStore service"),
            }),
            OneStoreOutcome::SecurityError => Err(BillingError::VerificationFailed {
                sku: String::new(),
                purchase: None,
            }),
            OneStoreOutcome::NeedUpdate => Err(BillingError::Remote {
                message: "OneStore service requires an update.".to_string(),
            }),
        }
    }

    fn into_purchase(item_type: ItemType, data: OneStorePurchaseData) -> Purchase {
        Purchase {
            item_type,
            signature: data.signature,
            order_id: data.order_id,
            package_name: data.package_name,
            sku: data.product_id,
            purchase_time: data.purchase_time,
            purchase_state: PURCHASE_STATE_PURCHASED,
            developer_payload: data.developer_payload,
            token: Some(data.purchase_id),
            raw_payload: data.raw,
        }
    }

    fn into_sku_details(item_type: ItemType, detail: OneStoreProductDetail) -> SkuDetails {
        let price_as_decimal = detail.price.parse::<f64>().ok();
        SkuDetails {
            item_type,
            sku: detail.product_id,
            type_name: detail.product_type.as_str().to_string(),
            price_as_decimal,
            price: price_as_decimal
                .map(format_krw)
                .unwrap_or_else(|| detail.price.clone()),
            price_currency: "KRW".to_string(),
            title: detail.title,
            description: String::new(),
            raw_payload: None,
        }
    }

    async fn query_owned(
        &self,
        item_type: ItemType,
        inventory: &mut Inventory,
    ) -> Result<(), BillingError> {
        let outcome = self
            .service
            .query_purchases(ONE_STORE_API_VERSION, Self::product_type(item_type))
            .await;
        let records = Self::unfold(outcome, "Error querying owned items")?;
        for record in records {
            inventory.add_purchase(Self::into_purchase(item_type, record));
        }
        Ok(())
    }

    async fn query_details(
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
        let outcome = self
            .service
            .query_products(ONE_STORE_API_VERSION, &skus, Self::product_type(item_type))
            .await;
        let details = Self::unfold(outcome, "Error querying product details")?;
        for detail in details {
            inventory.add_sku_details(Self::into_sku_details(item_type, detail));
        }
        Ok(())
    }
}

/// Formats a whole-won amount the way OneStore listings show it, with
/// thousands separators and the won sign.
fn format_krw(amount: f64) -> String {
    let whole = amount.trunc() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if whole < 0 {
        format!("-\u{20a9}{grouped}")
    } else {
        format!("\u{20a9}{grouped}")
    }
}

#[async_trait]
impl<S: OneStoreService> BillingAdapter for OneStoreAdapter<S> {
    async fn start_setup(&self) -> Result<BillingResult, BillingError> {
        self.lifecycle.begin_setup()?;
        let outcome = async {
            Self::unfold(self.service.connect().await, "Error connecting to OneStore")?;
            Self::unfold(
                self.service.is_billing_supported(ONE_STORE_API_VERSION).await,
                "Error checking for OneStore billing support",
            )?;
            // Auto-renewing ("auto") products ride the same API version.
            self.subscriptions_supported.store(true, Ordering::Release);
            info!(key_configured = self.config.one_store_key.is_some(), "OneStore setup complete");
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
        debug!(sku, item_type = %item_type, "launching OneStore purchase flow");
        let outcome = self
            .service
            .launch_purchase_flow(
                ONE_STORE_API_VERSION,
                sku,
                Self::product_type(item_type),
                developer_payload,
            )
            .await;
        let data = match Self::unfold(outcome, "Problem purchasing item") {
            Ok(data) => data,
            Err(BillingError::VerificationFailed { .. }) => {
                return Err(BillingError::VerificationFailed {
                    sku: sku.to_string(),
                    purchase: None,
                })
            }
            Err(err) => return Err(err),
        };
        debug!(sku = %data.product_id, "purchase successful");
        Ok(Self::into_purchase(item_type, data))
    }

    async fn consume(&self, purchase: &Purchase) -> Result<Purchase, BillingError> {
        let _guard = self.lifecycle.begin_operation("consume")?;

        if purchase.item_type != ItemType::InApp {
            return Err(BillingError::InvalidConsumption {
                item_type: purchase.item_type,
            });
        }
        // The vendor record is reconstructed from the preserved raw payload
        // so the consume call carries exactly what the service issued.
        let model: PurchaseDataPayloadModel = serde_json::from_str(&purchase.raw_payload)?;
        if model.purchase_id.is_empty() {
            return Err(BillingError::MissingToken {
                sku: purchase.sku.clone(),
            });
        }
        let data = OneStorePurchaseData {
            order_id: model.order_id,
            package_name: model.package_name,
            product_id: model.product_id,
            purchase_time: model.purchase_time,
            purchase_id: model.purchase_id,
            developer_payload: model.developer_payload,
            signature: purchase.signature.clone(),
            raw: purchase.raw_payload.clone(),
        };
        Self::unfold(
            self.service.consume(ONE_STORE_API_VERSION, &data).await,
            &format!("Error consuming sku {}", purchase.sku),
        )?;
        info!(sku = %purchase.sku, "successfully consumed");
        Ok(purchase.clone())
    }

    async fn query_inventory(&self, skus: &[String]) -> Result<InventoryOutcome, BillingError> {
        let _guard = self.lifecycle.begin_operation("queryInventory")?;
        let mut inventory = Inventory::new();
        self.query_owned(ItemType::InApp, &mut inventory).await?;
        self.query_details(ItemType::InApp, &mut inventory, skus).await?;
        if self.subscriptions_supported.load(Ordering::Acquire) {
            self.query_owned(ItemType::Subscription, &mut inventory).await?;
            self.query_details(ItemType::Subscription, &mut inventory, skus)
                .await?;
        }
        Ok(InventoryOutcome {
            result: BillingResult::ok("Inventory refresh successful."),
            inventory,
        })
    }

    async fn query_purchases(&self) -> Result<PurchaseListing, BillingError> {
        let _guard = self.lifecycle.begin_operation("queryPurchases")?;
        let mut inventory = Inventory::new();
        self.query_owned(ItemType::InApp, &mut inventory).await?;
        Ok(PurchaseListing {
            result: BillingResult::ok("Inventory refresh successful."),
            purchases: inventory.all_purchases().into_iter().cloned().collect(),
        })
    }

    fn subscriptions_supported(&self) -> bool {
        self.subscriptions_supported.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        if !self.lifecycle.is_disposed() {
            debug!("disposing of OneStore billing adapter");
            self.lifecycle.dispose();
        } else {
            warn!("adapter already disposed");
        }
    }
}
