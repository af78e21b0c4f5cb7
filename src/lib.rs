pub mod data {
    pub mod adapters {
        pub(crate) mod lifecycle;
        pub mod one_store_adapter;
        pub mod play_store_adapter;
        pub mod store_kit_adapter;
    }
    pub(crate) mod models {
        pub(crate) mod one_store {
            pub(crate) mod purchase_data_model;
        }
        pub(crate) mod play_store {
            pub(crate) mod purchase_payload_model;
            pub(crate) mod sku_details_payload_model;
        }
    }
}

pub mod domain {
    pub mod adapters {
        pub mod billing_adapter;
    }
    pub mod entities {
        pub mod billing_result;
        pub mod inventory;
        pub mod item_type;
        pub mod purchase;
        pub mod sku_details;
        pub mod store;
    }
    pub mod services {
        pub mod one_store_service;
        pub mod play_billing_service;
        pub mod store_kit_service;
    }
}

pub mod bridge;
pub mod config;
pub mod errors;
pub mod security;
