use std::fmt;

use crate::data::models::play_store::sku_details_payload_model::SkuDetailsPayloadModel;
use crate::domain::entities::item_type::ItemType;

/// An in-app product's listing details.
#[derive(Debug, Clone)]
pub struct SkuDetails {
    pub item_type: ItemType,
    pub sku: String,
    pub type_name: String,
    pub price_as_decimal: Option<f64>,
    pub price: String,
    pub price_currency: String,
    pub title: String,
    pub description: String,
    pub raw_payload: Option<String>,
}

impl SkuDetails {
    /// Parses a Play Store SKU details payload. `price_amount_micros` arrives
    /// as either a number or a numeric string depending on service version.
    pub fn from_play_store(item_type: ItemType, payload: &str) -> Result<Self, serde_json::Error> {
        let model: SkuDetailsPayloadModel = serde_json::from_str(payload)?;
        Ok(Self {
            item_type,
            sku: model.product_id,
            type_name: model.product_type,
            price_as_decimal: model
                .price_amount_micros
                .and_then(|m| m.as_f64())
                .map(|micros| micros / 1_000_000.0),
            price: model.price,
            price_currency: model.price_currency_code,
            title: model.title,
            description: model.description,
            raw_payload: Some(payload.to_string()),
        })
    }
}

impl fmt::Display for SkuDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SkuDetails:{}", self.raw_payload.as_deref().unwrap_or(""))
    }
}
