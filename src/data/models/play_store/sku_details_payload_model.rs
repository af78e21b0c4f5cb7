use serde::Deserialize;

/// SKU details payload returned in the `DETAILS_LIST` of a `getSkuDetails`
/// response. Note the mixed key casing; it is part of the wire contract.
#[derive(Debug, Deserialize)]
pub(crate) struct SkuDetailsPayloadModel {
    #[serde(rename = "productId", default)]
    pub(crate) product_id: String,
    #[serde(rename = "type", default)]
    pub(crate) product_type: String,
    #[serde(default)]
    pub(crate) price: String,
    /// A number in recent service versions, a numeric string in older ones.
    #[serde(rename = "price_amount_micros", default)]
    pub(crate) price_amount_micros: Option<MicrosValue>,
    #[serde(rename = "price_currency_code", default)]
    pub(crate) price_currency_code: String,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MicrosValue {
    Number(f64),
    Text(String),
}

impl MicrosValue {
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            MicrosValue::Number(n) => Some(*n),
            MicrosValue::Text(s) => s.parse().ok(),
        }
    }
}
