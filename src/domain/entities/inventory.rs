use std::collections::HashMap;

use crate::domain::entities::item_type::ItemType;
use crate::domain::entities::purchase::Purchase;
use crate::domain::entities::sku_details::SkuDetails;

/// In-memory listing of owned purchases and known SKU details, keyed by SKU.
/// Built fresh for every query cycle; never cached across queries.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    purchases: HashMap<String, Purchase>,
    sku_details: HashMap<String, SkuDetails>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_purchase(&mut self, purchase: Purchase) {
        self.purchases.insert(purchase.sku.clone(), purchase);
    }

    pub fn add_sku_details(&mut self, details: SkuDetails) {
        self.sku_details.insert(details.sku.clone(), details);
    }

    pub fn purchase(&self, sku: &str) -> Option<&Purchase> {
        self.purchases.get(sku)
    }

    pub fn sku_details(&self, sku: &str) -> Option<&SkuDetails> {
        self.sku_details.get(sku)
    }

    pub fn has_purchase(&self, sku: &str) -> bool {
        self.purchases.contains_key(sku)
    }

    pub fn erase_purchase(&mut self, sku: &str) -> Option<Purchase> {
        self.purchases.remove(sku)
    }

    pub fn all_purchases(&self) -> Vec<&Purchase> {
        self.purchases.values().collect()
    }

    pub fn all_owned_skus(&self, item_type: ItemType) -> Vec<String> {
        self.purchases
            .values()
            .filter(|p| p.item_type == item_type)
            .map(|p| p.sku.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.purchases.is_empty() && self.sku_details.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purchase(sku: &str, item_type: ItemType) -> Purchase {
        Purchase {
            item_type,
            signature: String::new(),
            order_id: format!("order-{sku}"),
            package_name: "com.example.app".to_string(),
            sku: sku.to_string(),
            purchase_time: 0,
            purchase_state: 0,
            developer_payload: String::new(),
            token: Some(format!("tok-{sku}")),
            raw_payload: "{}".to_string(),
        }
    }

    #[test]
    fn starts_empty() {
        let inventory = Inventory::new();
        assert!(inventory.is_empty());
        assert!(inventory.all_purchases().is_empty());
        assert!(inventory.purchase("coin_100").is_none());
    }

    #[test]
    fn tracks_purchases_by_sku() {
        let mut inventory = Inventory::new();
        inventory.add_purchase(purchase("coin_100", ItemType::InApp));
        inventory.add_purchase(purchase("premium", ItemType::Subscription));

        assert!(inventory.has_purchase("coin_100"));
        assert_eq!(inventory.purchase("coin_100").unwrap().order_id, "order-coin_100");
        assert_eq!(inventory.all_owned_skus(ItemType::InApp), vec!["coin_100"]);
        assert_eq!(inventory.all_owned_skus(ItemType::Subscription), vec!["premium"]);

        let erased = inventory.erase_purchase("coin_100").unwrap();
        assert_eq!(erased.sku, "coin_100");
        assert!(!inventory.has_purchase("coin_100"));
    }
}
