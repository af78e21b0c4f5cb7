use std::fmt;

use chrono::{DateTime, Utc};

use crate::data::models::play_store::purchase_payload_model::PurchasePayloadModel;
use crate::domain::entities::item_type::ItemType;

/// Purchase state values carried in vendor payloads.
pub const PURCHASE_STATE_PURCHASED: i32 = 0;
pub const PURCHASE_STATE_CANCELLED: i32 = 1;
pub const PURCHASE_STATE_REFUNDED: i32 = 2;

/// An in-app billing purchase, parsed once from the vendor payload and never
/// mutated afterwards. `raw_payload` preserves the vendor JSON byte-for-byte
/// so the signature stays verifiable downstream.
#[derive(Debug, Clone)]
pub struct Purchase {
    pub item_type: ItemType,
    pub signature: String,
    pub order_id: String,
    pub package_name: String,
    pub sku: String,
    pub purchase_time: i64,
    pub purchase_state: i32,
    pub developer_payload: String,
    pub token: Option<String>,
    pub raw_payload: String,
}

impl Purchase {
    /// Parses a Play Store purchase payload. The token falls back to the
    /// `purchaseToken` key used by some service versions.
    pub fn from_play_store(
        item_type: ItemType,
        signature: String,
        payload: &str,
    ) -> Result<Self, serde_json::Error> {
        let model: PurchasePayloadModel = serde_json::from_str(payload)?;
        Ok(Self {
            item_type,
            signature,
            order_id: model.order_id,
            package_name: model.package_name,
            sku: model.product_id,
            purchase_time: model.purchase_time,
            purchase_state: model.purchase_state,
            developer_payload: model.developer_payload,
            token: model.token.or(model.purchase_token),
            raw_payload: payload.to_string(),
        })
    }

    pub fn purchase_time_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.purchase_time)
    }

    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Display for Purchase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PurchaseInfo(type:{}):{}", self.item_type, self.raw_payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{"orderId":"GPA.1234","packageName":"com.example.app","productId":"coin_100","purchaseTime":1717171717000,"purchaseState":0,"developerPayload":"payload","purchaseToken":"tok-abc"}"#;

    #[test]
    fn parses_play_store_payload() {
        let purchase =
            Purchase::from_play_store(ItemType::InApp, "sig".to_string(), PAYLOAD).unwrap();
        assert_eq!(purchase.order_id, "GPA.1234");
        assert_eq!(purchase.package_name, "com.example.app");
        assert_eq!(purchase.sku, "coin_100");
        assert_eq!(purchase.purchase_time, 1717171717000);
        assert_eq!(purchase.purchase_state, PURCHASE_STATE_PURCHASED);
        assert_eq!(purchase.developer_payload, "payload");
        assert_eq!(purchase.token.as_deref(), Some("tok-abc"));
        assert!(purchase.has_token());
    }

    #[test]
    fn token_key_takes_precedence_over_purchase_token() {
        let payload = r#"{"productId":"coin_100","token":"tok-1","purchaseToken":"tok-2"}"#;
        let purchase =
            Purchase::from_play_store(ItemType::InApp, String::new(), payload).unwrap();
        assert_eq!(purchase.token.as_deref(), Some("tok-1"));
    }

    #[test]
    fn raw_payload_round_trips() {
        let purchase =
            Purchase::from_play_store(ItemType::InApp, "sig".to_string(), PAYLOAD).unwrap();
        assert_eq!(purchase.raw_payload.as_bytes(), PAYLOAD.as_bytes());
    }

    #[test]
    fn missing_fields_default() {
        let purchase =
            Purchase::from_play_store(ItemType::Subscription, String::new(), "{}").unwrap();
        assert_eq!(purchase.sku, "");
        assert_eq!(purchase.purchase_time, 0);
        assert!(purchase.token.is_none());
        assert!(!purchase.has_token());
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(Purchase::from_play_store(ItemType::InApp, String::new(), "not json").is_err());
    }

    #[test]
    fn purchase_time_converts_to_utc() {
        let purchase =
            Purchase::from_play_store(ItemType::InApp, String::new(), PAYLOAD).unwrap();
        let time = purchase.purchase_time_utc().unwrap();
        assert_eq!(time.timestamp_millis(), 1717171717000);
    }
}
