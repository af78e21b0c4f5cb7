use async_trait::async_trait;

/// OneStore in-app purchase API version spoken with the service client.
pub const ONE_STORE_API_VERSION: i32 = 5;

/// OneStore purchase flows report through listener callbacks that can end in
/// one of several distinct channels; this folds them into a single value.
#[derive(Debug)]
pub enum OneStoreOutcome<T> {
    Success(T),
    /// The vendor delivered an IAP result with a non-success code.
    Error(OneStoreIapResult),
    /// The service process died or the binding broke.
    RemoteError,
    /// The client library rejected the signed data.
    SecurityError,
    /// The installed OneStore service is too old for this API version.
    NeedUpdate,
}

#[derive(Debug, Clone)]
pub struct OneStoreIapResult {
    pub code: i32,
    pub description: String,
}

/// `PURCHASE_CANCELED` in the OneStore IAP result code table.
pub const ONE_STORE_RESULT_USER_CANCELED: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneStoreProductType {
    InApp,
    Auto,
}

impl OneStoreProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OneStoreProductType::InApp => "inapp",
            OneStoreProductType::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OneStorePurchaseData {
    pub order_id: String,
    pub package_name: String,
    pub product_id: String,
    pub purchase_time: i64,
    pub purchase_id: String,
    pub developer_payload: String,
    pub signature: String,
    /// Raw JSON form of the record, as received.
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct OneStoreProductDetail {
    pub product_id: String,
    pub product_type: OneStoreProductType,
    pub title: String,
    /// Price in whole KRW, as a decimal string.
    pub price: String,
}

/// Host-side binding to the OneStore purchase client.
#[async_trait]
pub trait OneStoreService: Send + Sync {
    async fn connect(&self) -> OneStoreOutcome<()>;

    async fn is_billing_supported(&self, api_version: i32) -> OneStoreOutcome<()>;

    async fn launch_purchase_flow(
        &self,
        api_version: i32,
        product_id: &str,
        product_type: OneStoreProductType,
        developer_payload: &str,
    ) -> OneStoreOutcome<OneStorePurchaseData>;

    async fn consume(
        &self,
        api_version: i32,
        purchase_data: &OneStorePurchaseData,
    ) -> OneStoreOutcome<()>;

    async fn query_products(
        &self,
        api_version: i32,
        product_ids: &[String],
        product_type: OneStoreProductType,
    ) -> OneStoreOutcome<Vec<OneStoreProductDetail>>;

    async fn query_purchases(
        &self,
        api_version: i32,
        product_type: OneStoreProductType,
    ) -> OneStoreOutcome<Vec<OneStorePurchaseData>>;
}
