use serde::Deserialize;

/// Purchase payload delivered by the Play billing service alongside its
/// signature (`INAPP_PURCHASE_DATA`).
///
/// Fields are lenient: absent keys default so that payloads from older
/// service versions still parse. `token` vs `purchaseToken` varies by
/// version; both are captured and reconciled by the caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PurchasePayloadModel {
    #[serde(default)]
    pub(crate) order_id: String,
    #[serde(default)]
    pub(crate) package_name: String,
    #[serde(default)]
    pub(crate) product_id: String,
    #[serde(default)]
    pub(crate) purchase_time: i64,
    #[serde(default)]
    pub(crate) purchase_state: i32,
    #[serde(default)]
    pub(crate) developer_payload: String,
    pub(crate) token: Option<String>,
    pub(crate) purchase_token: Option<String>,
}
