use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::domain::adapters::billing_adapter::BillingAdapter;
use crate::domain::entities::billing_result::{
    describe_response, BILLING_RESPONSE_RESULT_ITEM_ALREADY_OWNED,
    BILLING_RESPONSE_RESULT_ITEM_NOT_OWNED, IABHELPER_BAD_RESPONSE, IABHELPER_UNKNOWN_ERROR,
    IABHELPER_USER_CANCELLED, IABHELPER_VERIFICATION_FAILED,
};
use crate::domain::entities::item_type::ItemType;
use crate::domain::entities::purchase::Purchase;
use crate::domain::entities::sku_details::SkuDetails;
use crate::domain::entities::store::Store;
use crate::errors::BillingError;

/// Error codes delivered to the scripting side of the bridge.
pub const BRIDGE_OK: i32 = 0;
pub const BRIDGE_INVALID_ARGUMENTS: i32 = -1;
pub const BRIDGE_UNABLE_TO_INITIALIZE: i32 = -2;
pub const BRIDGE_BILLING_NOT_INITIALIZED: i32 = -3;
pub const BRIDGE_UNKNOWN_ERROR: i32 = -4;
pub const BRIDGE_USER_CANCELLED: i32 = -5;
pub const BRIDGE_BAD_RESPONSE_FROM_SERVER: i32 = -6;
pub const BRIDGE_VERIFICATION_FAILED: i32 = -7;
pub const BRIDGE_ITEM_UNAVAILABLE: i32 = -8;
pub const BRIDGE_ITEM_ALREADY_OWNED: i32 = -9;
pub const BRIDGE_ITEM_NOT_OWNED: i32 = -10;
pub const BRIDGE_CONSUME_FAILED: i32 = -11;

/// Builds the adapter for a given store. The host wires concrete service
/// bindings in here; `None` means the store has no adapter on this platform.
pub trait AdapterFactory: Send + Sync {
    fn create(&self, store: Store) -> Option<Arc<dyn BillingAdapter>>;
}

/// Failure of a bridge action, shaped for the scripting side.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),
    #[error("{message}")]
    Call {
        code: i32,
        message: String,
        /// Human-readable description of `response`.
        text: String,
        /// The underlying billing response code, when one exists.
        response: i32,
    },
}

impl BridgeError {
    fn simple(code: i32, message: impl Into<String>) -> Self {
        BridgeError::Call {
            code,
            message: message.into(),
            text: String::new(),
            response: BRIDGE_OK,
        }
    }

    fn invalid_arguments(action: &str) -> Self {
        Self::simple(
            BRIDGE_INVALID_ARGUMENTS,
            format!("Invalid arguments for action {action}"),
        )
    }

    fn not_initialized() -> Self {
        Self::simple(BRIDGE_BILLING_NOT_INITIALIZED, "Billing is not initialized")
    }

    /// JSON form delivered to the error callback.
    pub fn payload(&self) -> Value {
        match self {
            BridgeError::UnsupportedAction(action) => json!({
                "code": BRIDGE_INVALID_ARGUMENTS,
                "message": format!("Unsupported action: {action}"),
                "text": "",
                "response": BRIDGE_OK,
            }),
            BridgeError::Call {
                code,
                message,
                text,
                response,
            } => json!({
                "code": code,
                "message": message,
                "text": text,
                "response": response,
            }),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseResponseModel<'a> {
    order_id: &'a str,
    package_name: &'a str,
    product_id: &'a str,
    purchase_time: i64,
    purchase_state: i32,
    purchase_token: &'a str,
    signature: &'a str,
    #[serde(rename = "type")]
    item_type: &'a str,
    receipt: &'a str,
}

impl<'a> PurchaseResponseModel<'a> {
    fn from_purchase(purchase: &'a Purchase) -> Self {
        Self {
            order_id: &purchase.order_id,
            package_name: &purchase.package_name,
            product_id: &purchase.sku,
            purchase_time: purchase.purchase_time,
            purchase_state: purchase.purchase_state,
            purchase_token: purchase.token.as_deref().unwrap_or(""),
            signature: &purchase.signature,
            item_type: purchase.item_type.value(),
            receipt: &purchase.raw_payload,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConsumeResponseModel<'a> {
    transaction_id: &'a str,
    product_id: &'a str,
    token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SkuDetailsResponseModel<'a> {
    product_id: &'a str,
    title: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_as_decimal: Option<f64>,
    price: &'a str,
    #[serde(rename = "type")]
    item_type: &'a str,
    currency: &'a str,
}

impl<'a> SkuDetailsResponseModel<'a> {
    fn from_details(details: &'a SkuDetails) -> Self {
        Self {
            product_id: &details.sku,
            title: &details.title,
            description: &details.description,
            price_as_decimal: details.price_as_decimal,
            price: &details.price,
            item_type: details.item_type.value(),
            currency: &details.price_currency,
        }
    }
}

/// Uniform action dispatcher bridging the scripting layer to whichever
/// billing adapter matches the current store.
///
/// The bridge owns store selection: by default the store is detected from the
/// installer package, and `setStore` overrides it (discarding any initialized
/// adapter so the next `init` binds the new store).
pub struct BillingBridge {
    factory: Box<dyn AdapterFactory>,
    detected_store: Store,
    store_override: Mutex<Option<Store>>,
    adapter: Mutex<Option<Arc<dyn BillingAdapter>>>,
    initialized: AtomicBool,
}

impl BillingBridge {
    /// Sideloaded builds have no recognizable installer; they are treated as
    /// Play Store installs.
    pub fn new(factory: Box<dyn AdapterFactory>, installer_package: Option<&str>) -> Self {
        let detected_store =
            Store::from_installer_package(installer_package).unwrap_or(Store::Google);
        info!(store = detected_store.as_str(), "billing bridge created");
        Self {
            factory,
            detected_store,
            store_override: Mutex::new(None),
            adapter: Mutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    fn override_lock(&self) -> MutexGuard<'_, Option<Store>> {
        self.store_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn adapter_lock(&self) -> MutexGuard<'_, Option<Arc<dyn BillingAdapter>>> {
        self.adapter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The store actions are routed to: the override if one was set, else the
    /// store detected from the installer package.
    pub fn selected_store(&self) -> Store {
        self.override_lock().unwrap_or(self.detected_store)
    }

    fn current_adapter(&self) -> Result<Arc<dyn BillingAdapter>, BridgeError> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(BridgeError::not_initialized());
        }
        self.adapter_lock()
            .as_ref()
            .cloned()
            .ok_or_else(BridgeError::not_initialized)
    }

    /// Dispatches one bridge action. `args` are the positional arguments from
    /// the scripting side.
    pub async fn execute(&self, action: &str, args: &[Value]) -> Result<Value, BridgeError> {
        debug!(action, "bridge action");
        match action {
            "init" => self.init().await,
            "buy" => self.buy(args, ItemType::InApp).await,
            "subscribe" => self.buy(args, ItemType::Subscription).await,
            "consumePurchase" => self.consume_purchase(args).await,
            "getSkuDetails" => self.get_sku_details(args).await,
            "restorePurchases" => self.restore_purchases().await,
            "store" => Ok(Value::String(self.selected_store().as_str().to_string())),
            "nativeStore" => Ok(Value::String(self.detected_store.as_str().to_string())),
            "setStore" => self.set_store(args),
            other => Err(BridgeError::UnsupportedAction(other.to_string())),
        }
    }

    async fn init(&self) -> Result<Value, BridgeError> {
        if self.initialized.load(Ordering::Acquire) {
            debug!("billing already initialized");
            return Ok(Value::Null);
        }
        let store = self.selected_store();
        let adapter = self.factory.create(store).ok_or_else(|| {
            BridgeError::simple(BRIDGE_UNABLE_TO_INITIALIZE, "Billing cannot be initialized")
        })?;
        adapter.start_setup().await.map_err(|err| BridgeError::Call {
            code: BRIDGE_UNABLE_TO_INITIALIZE,
            message: format!("Unable to initialize billing: {err}"),
            text: describe_response(err.response_code()),
            response: err.response_code(),
        })?;
        // Another init may have completed while setup was in flight; the
        // first adapter to land wins and the extra connection is released.
        let mut slot = self.adapter_lock();
        if slot.is_some() {
            drop(slot);
            debug!("billing initialized concurrently, discarding extra adapter");
            adapter.dispose();
            return Ok(Value::Null);
        }
        *slot = Some(adapter);
        self.initialized.store(true, Ordering::Release);
        drop(slot);
        info!(store = store.as_str(), "billing initialized");
        Ok(Value::Null)
    }

    async fn buy(&self, args: &[Value], item_type: ItemType) -> Result<Value, BridgeError> {
        let sku = args
            .first()
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BridgeError::invalid_arguments("buy"))?;
        let developer_payload = args.get(1).and_then(Value::as_str).unwrap_or("");
        let adapter = self.current_adapter()?;

        let purchase = adapter
            .launch_purchase_flow(sku, item_type, developer_payload)
            .await
            .map_err(|err| {
                let response = err.response_code();
                // Item-unavailable deliberately falls through to the generic
                // code; consumers distinguish it by the `response` field.
                let code = match response {
                    IABHELPER_BAD_RESPONSE
                    | IABHELPER_UNKNOWN_ERROR
                    | IABHELPER_VERIFICATION_FAILED => BRIDGE_BAD_RESPONSE_FROM_SERVER,
                    IABHELPER_USER_CANCELLED => BRIDGE_USER_CANCELLED,
                    BILLING_RESPONSE_RESULT_ITEM_ALREADY_OWNED => BRIDGE_ITEM_ALREADY_OWNED,
                    _ => BRIDGE_UNKNOWN_ERROR,
                };
                BridgeError::Call {
                    code,
                    message: err.to_string(),
                    text: describe_response(response),
                    response,
                }
            })?;
        to_value(&PurchaseResponseModel::from_purchase(&purchase))
    }

    /// Arguments are `(type, receipt, signature)`: the purchase is rebuilt
    /// from the receipt the buy action returned, not looked up by SKU.
    async fn consume_purchase(&self, args: &[Value]) -> Result<Value, BridgeError> {
        let parse_failure =
            || BridgeError::simple(BRIDGE_INVALID_ARGUMENTS, "Unable to parse purchase token");
        let item_type = args
            .first()
            .and_then(Value::as_str)
            .and_then(ItemType::from_name)
            .ok_or_else(parse_failure)?;
        let receipt = args.get(1).and_then(Value::as_str).ok_or_else(parse_failure)?;
        let signature = args.get(2).and_then(Value::as_str).unwrap_or("");

        let mut purchase = Purchase::from_play_store(item_type, signature.to_string(), receipt)
            .map_err(|_| parse_failure())?;
        if purchase.token.is_none() {
            // StoreKit receipts carry a transaction id instead of a token.
            purchase.token = serde_json::from_str::<Value>(receipt)
                .ok()
                .and_then(|v| v["transactionId"].as_str().map(str::to_string));
        }
        let adapter = self.current_adapter()?;

        let consumed = adapter.consume(&purchase).await.map_err(|err| {
            let response = err.response_code();
            let code = if response == BILLING_RESPONSE_RESULT_ITEM_NOT_OWNED {
                BRIDGE_ITEM_NOT_OWNED
            } else {
                BRIDGE_CONSUME_FAILED
            };
            BridgeError::Call {
                code,
                message: err.to_string(),
                text: describe_response(response),
                response,
            }
        })?;
        to_value(&ConsumeResponseModel {
            transaction_id: &consumed.order_id,
            product_id: &consumed.sku,
            token: consumed.token.as_deref().unwrap_or(""),
        })
    }

    async fn get_sku_details(&self, args: &[Value]) -> Result<Value, BridgeError> {
        let mut skus = Vec::new();
        for arg in args {
            match arg {
                Value::String(sku) => skus.push(sku.clone()),
                Value::Array(list) => {
                    for entry in list {
                        match entry.as_str() {
                            Some(sku) => skus.push(sku.to_string()),
                            None => return Err(BridgeError::invalid_arguments("getSkuDetails")),
                        }
                    }
                }
                _ => return Err(BridgeError::invalid_arguments("getSkuDetails")),
            }
        }
        let adapter = self.current_adapter()?;

        let outcome = adapter.query_inventory(&skus).await.map_err(|err| {
            BridgeError::Call {
                code: BRIDGE_UNKNOWN_ERROR,
                message: "Error retrieving SKU details".to_string(),
                text: describe_response(err.response_code()),
                response: err.response_code(),
            }
        })?;
        if outcome.result.is_failure() {
            warn!(result = %outcome.result, "inventory query flagged failures");
        }
        let details: Vec<_> = skus
            .iter()
            .filter_map(|sku| outcome.inventory.sku_details(sku))
            .map(SkuDetailsResponseModel::from_details)
            .collect();
        to_value(&details)
    }

    async fn restore_purchases(&self) -> Result<Value, BridgeError> {
        let adapter = self.current_adapter()?;
        let listing = adapter.query_purchases().await.map_err(|err| {
            BridgeError::Call {
                code: BRIDGE_UNKNOWN_ERROR,
                message: "Error retrieving purchase details".to_string(),
                text: describe_response(err.response_code()),
                response: err.response_code(),
            }
        })?;
        if listing.result.is_failure() {
            warn!(result = %listing.result, "purchase listing flagged failures");
        }
        let purchases: Vec<_> = listing
            .purchases
            .iter()
            .map(PurchaseResponseModel::from_purchase)
            .collect();
        to_value(&purchases)
    }

    fn set_store(&self, args: &[Value]) -> Result<Value, BridgeError> {
        let store = args
            .first()
            .and_then(Value::as_str)
            .and_then(Store::from_name)
            .ok_or_else(|| BridgeError::invalid_arguments("setStore"))?;
        info!(store = store.as_str(), "store override set");
        *self.override_lock() = Some(store);
        if let Some(adapter) = self.adapter_lock().take() {
            adapter.dispose();
        }
        self.initialized.store(false, Ordering::Release);
        Ok(Value::Null)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, BridgeError> {
    serde_json::to_value(value).map_err(|err| {
        BridgeError::simple(BRIDGE_UNKNOWN_ERROR, format!("Failed to encode response: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_error_payload_carries_all_fields() {
        let err = BridgeError::Call {
            code: BRIDGE_USER_CANCELLED,
            message: "user canceled".to_string(),
            text: "-1005:User cancelled".to_string(),
            response: -1005,
        };
        let payload = err.payload();
        assert_eq!(payload["code"], BRIDGE_USER_CANCELLED);
        assert_eq!(payload["message"], "user canceled");
        assert_eq!(payload["text"], "-1005:User cancelled");
        assert_eq!(payload["response"], -1005);
    }

    #[test]
    fn unsupported_action_payload_uses_invalid_arguments_code() {
        let err = BridgeError::UnsupportedAction("frobnicate".to_string());
        assert_eq!(err.payload()["code"], BRIDGE_INVALID_ARGUMENTS);
    }
}
