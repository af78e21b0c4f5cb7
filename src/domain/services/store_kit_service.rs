use async_trait::async_trait;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::ServiceError;

/// `SKPaymentTransactionState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum TransactionState {
    Purchasing = 0,
    Purchased = 1,
    Failed = 2,
    Restored = 3,
    Deferred = 4,
}

#[derive(Debug, Clone)]
pub struct StoreKitProduct {
    pub product_id: String,
    pub localized_title: String,
    pub localized_description: String,
    /// Decimal price in the store locale's currency.
    pub price: f64,
    pub currency_code: String,
    pub formatted_price: String,
}

#[derive(Debug, Clone)]
pub struct ProductsResponse {
    pub products: Vec<StoreKitProduct>,
    pub invalid_product_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StoreKitTransaction {
    pub transaction_id: String,
    pub product_id: String,
    /// Milliseconds since the Unix epoch.
    pub transaction_date: i64,
    pub state: TransactionState,
    /// Base64-encoded app receipt at the time the transaction settled.
    pub receipt: Option<String>,
}

#[derive(Debug)]
pub enum PaymentOutcome {
    Purchased(StoreKitTransaction),
    Cancelled,
    Failed { code: i32, message: String },
    /// Awaiting approval (e.g. Ask to Buy); the transaction will settle later.
    Deferred,
}

/// Host-side binding to StoreKit's payment queue.
#[async_trait]
pub trait StoreKitService: Send + Sync {
    fn can_make_payments(&self) -> bool;

    async fn retrieve_products(
        &self,
        product_ids: &[String],
    ) -> Result<ProductsResponse, ServiceError>;

    /// Adds a payment to the queue and waits for it to settle. When `atomic`
    /// is set the transaction is finished before returning; otherwise it is
    /// left open for a later explicit finish.
    async fn purchase(
        &self,
        product_id: &str,
        quantity: u32,
        atomic: bool,
    ) -> Result<PaymentOutcome, ServiceError>;

    /// Replays completed transactions from the user's purchase history.
    async fn restore_purchases(&self) -> Result<Vec<StoreKitTransaction>, ServiceError>;

    async fn finish_transaction(&self, transaction_id: &str) -> Result<(), ServiceError>;

    /// Current base64-encoded app receipt, if one is on disk.
    fn app_store_receipt(&self) -> Option<String>;
}
