use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use iap_bridge::config::BillingConfig;
use iap_bridge::data::adapters::store_kit_adapter::StoreKitAdapter;
use iap_bridge::domain::adapters::billing_adapter::BillingAdapter;
use iap_bridge::domain::entities::item_type::ItemType;
use iap_bridge::domain::services::store_kit_service::{
    PaymentOutcome, ProductsResponse, StoreKitProduct, StoreKitService, StoreKitTransaction,
    TransactionState,
};
use iap_bridge::errors::{BillingError, ServiceError};

#[derive(Default)]
struct SkState {
    payments_disallowed: bool,
    products: Vec<StoreKitProduct>,
    invalid_product_ids: Vec<String>,
    payment_outcomes: Mutex<VecDeque<PaymentOutcome>>,
    payment_calls: Mutex<Vec<(String, bool)>>,
    restored: Vec<StoreKitTransaction>,
    finished: Mutex<Vec<String>>,
    finish_fails: AtomicBool,
    receipt: Option<String>,
}

#[derive(Default, Clone)]
struct MockStoreKit {
    state: Arc<SkState>,
}

#[async_trait]
impl StoreKitService for MockStoreKit {
    fn can_make_payments(&self) -> bool {
        !self.state.payments_disallowed
    }

    async fn retrieve_products(
        &self,
        product_ids: &[String],
    ) -> Result<ProductsResponse, ServiceError> {
        Ok(ProductsResponse {
            products: self
                .state
                .products
                .iter()
                .filter(|p| product_ids.contains(&p.product_id))
                .cloned()
                .collect(),
            invalid_product_ids: self.state.invalid_product_ids.clone(),
        })
    }

    async fn purchase(
        &self,
        product_id: &str,
        _quantity: u32,
        atomic: bool,
    ) -> Result<PaymentOutcome, ServiceError> {
        self.state
            .payment_calls
            .lock()
            .unwrap()
            .push((product_id.to_string(), atomic));
        Ok(self
            .state
            .payment_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted payment"))
    }

    async fn restore_purchases(&self) -> Result<Vec<StoreKitTransaction>, ServiceError> {
        Ok(self.state.restored.clone())
    }

    async fn finish_transaction(&self, transaction_id: &str) -> Result<(), ServiceError> {
        if self.state.finish_fails.load(Ordering::Acquire) {
            return Err(ServiceError::Remote("queue unavailable".to_string()));
        }
        self.state
            .finished
            .lock()
            .unwrap()
            .push(transaction_id.to_string());
        Ok(())
    }

    fn app_store_receipt(&self) -> Option<String> {
        self.state.receipt.clone()
    }
}

fn transaction(id: &str, sku: &str) -> StoreKitTransaction {
    StoreKitTransaction {
        transaction_id: id.to_string(),
        product_id: sku.to_string(),
        transaction_date: 1717171717000,
        state: TransactionState::Purchased,
        receipt: Some("cmVjZWlwdA==".to_string()),
    }
}

fn product(sku: &str, price: f64) -> StoreKitProduct {
    StoreKitProduct {
        product_id: sku.to_string(),
        localized_title: format!("Title of {sku}"),
        localized_description: String::new(),
        price,
        currency_code: "USD".to_string(),
        formatted_price: format!("${price}"),
    }
}

async fn ready_adapter(state: Arc<SkState>) -> StoreKitAdapter<MockStoreKit> {
    let adapter = StoreKitAdapter::new(
        MockStoreKit { state },
        BillingConfig::new("com.example.app"),
    );
    adapter.start_setup().await.unwrap();
    adapter
}

#[tokio::test]
async fn setup_fails_when_payments_are_disallowed() {
    let state = Arc::new(SkState {
        payments_disallowed: true,
        ..SkState::default()
    });
    let adapter = StoreKitAdapter::new(
        MockStoreKit { state },
        BillingConfig::new("com.example.app"),
    );
    let err = adapter.start_setup().await.unwrap_err();
    assert!(matches!(err, BillingError::ServiceUnavailable { .. }));
}

#[tokio::test]
async fn one_time_purchases_stay_open_until_consumed() {
    let state = Arc::new(SkState::default());
    state
        .payment_outcomes
        .lock()
        .unwrap()
        .push_back(PaymentOutcome::Purchased(transaction("txn-1", "coin_100")));
    let adapter = ready_adapter(Arc::clone(&state)).await;

    let purchase = adapter
        .launch_purchase_flow("coin_100", ItemType::InApp, "")
        .await
        .unwrap();
    assert_eq!(purchase.sku, "coin_100");
    assert_eq!(purchase.token.as_deref(), Some("txn-1"));
    assert_eq!(purchase.order_id, "txn-1");
    // One-time items settle non-atomically.
    assert_eq!(
        *state.payment_calls.lock().unwrap(),
        vec![("coin_100".to_string(), false)]
    );
    assert!(state.finished.lock().unwrap().is_empty());
    assert!(purchase.raw_payload.contains("\"transactionId\":\"txn-1\""));

    let consumed = adapter.consume(&purchase).await.unwrap();
    assert_eq!(consumed.sku, "coin_100");
    assert_eq!(*state.finished.lock().unwrap(), vec!["txn-1"]);

    // The transaction is gone now.
    let err = adapter.consume(&purchase).await.unwrap_err();
    assert!(matches!(err, BillingError::ItemNotOwned));
}

#[tokio::test]
async fn subscriptions_settle_atomically_and_cannot_be_consumed() {
    let state = Arc::new(SkState::default());
    state
        .payment_outcomes
        .lock()
        .unwrap()
        .push_back(PaymentOutcome::Purchased(transaction("txn-2", "premium")));
    let adapter = ready_adapter(Arc::clone(&state)).await;

    let purchase = adapter
        .launch_purchase_flow("premium", ItemType::Subscription, "")
        .await
        .unwrap();
    assert_eq!(
        *state.payment_calls.lock().unwrap(),
        vec![("premium".to_string(), true)]
    );

    let err = adapter.consume(&purchase).await.unwrap_err();
    assert!(matches!(err, BillingError::InvalidConsumption { .. }));
}

#[tokio::test]
async fn failed_and_deferred_payments_map_to_errors() {
    let state = Arc::new(SkState::default());
    {
        let mut outcomes = state.payment_outcomes.lock().unwrap();
        outcomes.push_back(PaymentOutcome::Cancelled);
        outcomes.push_back(PaymentOutcome::Failed {
            code: 2,
            message: "Payment cancelled".to_string(),
        });
        outcomes.push_back(PaymentOutcome::Deferred);
        outcomes.push_back(PaymentOutcome::Failed {
            code: 0,
            message: "Unknown error".to_string(),
        });
    }
    let adapter = ready_adapter(state).await;

    let err = adapter
        .launch_purchase_flow("coin_100", ItemType::InApp, "")
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::UserCancelled));

    let err = adapter
        .launch_purchase_flow("coin_100", ItemType::InApp, "")
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::UserCancelled));

    let err = adapter
        .launch_purchase_flow("coin_100", ItemType::InApp, "")
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Vendor { code: 6, .. }));

    let err = adapter
        .launch_purchase_flow("coin_100", ItemType::InApp, "")
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Vendor { code: 0, .. }));
}

#[tokio::test]
async fn failed_finish_keeps_the_transaction_consumable() {
    let state = Arc::new(SkState::default());
    state
        .payment_outcomes
        .lock()
        .unwrap()
        .push_back(PaymentOutcome::Purchased(transaction("txn-1", "coin_100")));
    let adapter = ready_adapter(Arc::clone(&state)).await;

    let purchase = adapter
        .launch_purchase_flow("coin_100", ItemType::InApp, "")
        .await
        .unwrap();

    state.finish_fails.store(true, Ordering::Release);
    let err = adapter.consume(&purchase).await.unwrap_err();
    assert!(matches!(err, BillingError::Remote { .. }));

    state.finish_fails.store(false, Ordering::Release);
    adapter.consume(&purchase).await.unwrap();
    assert_eq!(*state.finished.lock().unwrap(), vec!["txn-1"]);
}

#[tokio::test]
async fn inventory_combines_restored_transactions_and_listings() {
    let state = Arc::new(SkState {
        products: vec![product("coin_100", 0.99), product("coin_500", 3.99)],
        restored: vec![transaction("txn-1", "coin_100")],
        ..SkState::default()
    });
    let adapter = ready_adapter(state).await;

    let outcome = adapter
        .query_inventory(&["coin_500".to_string()])
        .await
        .unwrap();
    assert!(outcome.result.is_success());
    assert!(outcome.inventory.has_purchase("coin_100"));
    let details = outcome.inventory.sku_details("coin_500").unwrap();
    assert_eq!(details.price_as_decimal, Some(3.99));
    assert_eq!(details.price_currency, "USD");
}

#[tokio::test]
async fn restored_transactions_fall_back_to_the_app_receipt() {
    let mut restored = transaction("txn-1", "coin_100");
    restored.receipt = None;
    let state = Arc::new(SkState {
        restored: vec![restored],
        receipt: Some("YXBwLXJlY2VpcHQ=".to_string()),
        ..SkState::default()
    });
    let adapter = ready_adapter(state).await;

    let listing = adapter.query_purchases().await.unwrap();
    assert_eq!(listing.purchases.len(), 1);
    assert!(listing.purchases[0]
        .raw_payload
        .contains("YXBwLXJlY2VpcHQ="));
}
