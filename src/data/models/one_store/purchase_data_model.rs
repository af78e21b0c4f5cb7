use serde::Deserialize;

/// OneStore purchase record as embedded in the raw `purchaseData` JSON.
/// Consumption rebuilds the vendor-side record from this payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PurchaseDataPayloadModel {
    #[serde(default)]
    pub(crate) order_id: String,
    #[serde(default)]
    pub(crate) package_name: String,
    #[serde(default)]
    pub(crate) product_id: String,
    #[serde(default)]
    pub(crate) purchase_time: i64,
    #[serde(default)]
    pub(crate) developer_payload: String,
    #[serde(default)]
    pub(crate) purchase_id: String,
}
