use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::domain::entities::billing_result::BILLING_RESPONSE_RESULT_OK;
use crate::errors::ServiceError;

/// Billing API version spoken with the Play billing service.
pub const BILLING_API_VERSION: i32 = 3;

/// Host-side binding to the Play in-app billing service.
///
/// Implementations wrap whatever IPC the platform offers (an AIDL binding on
/// device, a test double elsewhere). Response codes are `Option<i32>` because
/// the service occasionally omits the `RESPONSE_CODE` key from an otherwise
/// successful bundle; [`response_code_or_ok`] applies the documented reading.
#[async_trait]
pub trait PlayBillingService: Send + Sync {
    /// Establishes the service binding.
    async fn connect(&self) -> Result<(), ServiceError>;

    /// `isBillingSupported`: returns the vendor response code for the given
    /// item type under the given API version.
    async fn is_billing_supported(
        &self,
        api_version: i32,
        package_name: &str,
        item_type: &str,
    ) -> Result<i32, ServiceError>;

    async fn get_sku_details(
        &self,
        api_version: i32,
        package_name: &str,
        item_type: &str,
        skus: &[String],
    ) -> Result<SkuDetailsBundle, ServiceError>;

    async fn get_buy_intent(
        &self,
        api_version: i32,
        package_name: &str,
        sku: &str,
        item_type: &str,
        developer_payload: &str,
    ) -> Result<BuyIntentBundle, ServiceError>;

    async fn get_purchases(
        &self,
        api_version: i32,
        package_name: &str,
        item_type: &str,
        continuation_token: Option<&str>,
    ) -> Result<PurchasesBundle, ServiceError>;

    async fn consume_purchase(
        &self,
        api_version: i32,
        package_name: &str,
        purchase_token: &str,
    ) -> Result<i32, ServiceError>;
}

/// A missing `RESPONSE_CODE` in a bundle means OK (known service behavior on
/// some devices), so `None` reads as success.
pub fn response_code_or_ok(code: Option<i32>) -> i32 {
    code.unwrap_or(BILLING_RESPONSE_RESULT_OK)
}

#[derive(Debug)]
pub struct SkuDetailsBundle {
    pub response_code: Option<i32>,
    /// JSON strings, one per SKU (`DETAILS_LIST`).
    pub details: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct BuyIntentBundle {
    pub response_code: Option<i32>,
    /// The pending purchase UI round trip; absent when the vendor refused to
    /// produce one.
    pub flow: Option<PurchaseFlow>,
}

#[derive(Debug)]
pub struct PurchasesBundle {
    pub response_code: Option<i32>,
    pub owned_skus: Option<Vec<String>>,
    pub purchase_data: Option<Vec<String>>,
    pub signatures: Option<Vec<String>>,
    /// Present when more pages of owned items remain.
    pub continuation_token: Option<String>,
}

/// Result of the purchase UI round trip, as delivered back by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityResult {
    Ok,
    Canceled,
    Other(i32),
}

#[derive(Debug)]
pub struct FlowOutcome {
    pub activity_result: ActivityResult,
    pub response_code: Option<i32>,
    pub purchase_data: Option<String>,
    pub signature: Option<String>,
}

/// One half of a purchase UI round trip. The billing side awaits
/// [`PurchaseFlow::resolve`]; the host completes it with the activity result
/// via the paired [`FlowCompleter`].
#[derive(Debug)]
pub struct PurchaseFlow {
    receiver: oneshot::Receiver<FlowOutcome>,
}

#[derive(Debug)]
pub struct FlowCompleter {
    sender: oneshot::Sender<FlowOutcome>,
}

impl PurchaseFlow {
    pub fn channel() -> (PurchaseFlow, FlowCompleter) {
        let (sender, receiver) = oneshot::channel();
        (PurchaseFlow { receiver }, FlowCompleter { sender })
    }

    /// Waits for the host to deliver the activity result. `None` means the
    /// completer was dropped without ever reporting back.
    pub async fn resolve(self) -> Option<FlowOutcome> {
        self.receiver.await.ok()
    }
}

impl FlowCompleter {
    pub fn complete(self, outcome: FlowOutcome) {
        // The billing side may already have given up; nothing to do then.
        let _ = self.sender.send(outcome);
    }
}
