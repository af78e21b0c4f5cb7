use crate::domain::entities::billing_result::{
    self as codes, BillingResult, IABHELPER_BAD_RESPONSE, IABHELPER_INVALID_CONSUMPTION,
    IABHELPER_MISSING_TOKEN, IABHELPER_REMOTE_EXCEPTION, IABHELPER_SEND_INTENT_FAILED,
    IABHELPER_SUBSCRIPTIONS_NOT_AVAILABLE, IABHELPER_UNKNOWN_ERROR,
    IABHELPER_UNKNOWN_PURCHASE_RESPONSE, IABHELPER_USER_CANCELLED, IABHELPER_VERIFICATION_FAILED,
};
use crate::domain::entities::item_type::ItemType;
use crate::domain::entities::purchase::Purchase;

/// Transport-level failure reported by a vendor billing service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("billing service unavailable on device")]
    Unavailable,
    #[error("remote error talking to billing service: {0}")]
    Remote(String),
}

/// Failure of a billing adapter operation.
///
/// `Disposed` and `ConcurrentOperation` are programmer-error conditions; they
/// are surfaced as errors rather than panics but must never be swallowed.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("adapter is not set up")]
    NotInitialized,
    #[error("adapter is already set up")]
    AlreadyInitialized,
    #[error("adapter was disposed of, so it cannot be used")]
    Disposed,
    #[error("cannot start async operation ({requested}) because another async operation ({running}) is in progress")]
    ConcurrentOperation {
        requested: &'static str,
        running: &'static str,
    },
    #[error("{message}")]
    ServiceUnavailable { message: String },
    #[error("{message}")]
    Remote { message: String },
    #[error("{message}")]
    BadResponse { message: String },
    #[error("{message}")]
    SendFlowFailed { message: String },
    #[error("signature verification failed for sku {sku}")]
    VerificationFailed {
        sku: String,
        /// Deliberately returned alongside the failure for diagnostics.
        purchase: Option<Box<Purchase>>,
    },
    #[error("user canceled")]
    UserCancelled,
    #[error("unknown purchase response")]
    UnknownPurchaseResponse,
    #[error("subscriptions are not available")]
    SubscriptionsUnavailable,
    #[error("purchase is missing token for sku: {sku}")]
    MissingToken { sku: String },
    #[error("items of type '{item_type}' can't be consumed")]
    InvalidConsumption { item_type: ItemType },
    #[error("item unavailable")]
    ItemUnavailable,
    #[error("item already owned")]
    ItemAlreadyOwned,
    #[error("item not owned")]
    ItemNotOwned,
    #[error("{message}")]
    Unknown { message: String },
    #[error("{message}")]
    Vendor { code: i32, message: String },
    #[error("failed to parse vendor payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl BillingError {
    /// Builds the error matching a non-OK vendor response code.
    pub fn from_vendor_code(code: i32, context: &str) -> Self {
        match code {
            codes::BILLING_RESPONSE_RESULT_USER_CANCELED | IABHELPER_USER_CANCELLED => {
                BillingError::UserCancelled
            }
            codes::BILLING_RESPONSE_RESULT_BILLING_UNAVAILABLE => BillingError::ServiceUnavailable {
                message: context.to_string(),
            },
            codes::BILLING_RESPONSE_RESULT_ITEM_UNAVAILABLE => BillingError::ItemUnavailable,
            codes::BILLING_RESPONSE_RESULT_ITEM_ALREADY_OWNED => BillingError::ItemAlreadyOwned,
            codes::BILLING_RESPONSE_RESULT_ITEM_NOT_OWNED => BillingError::ItemNotOwned,
            _ => BillingError::Vendor {
                code,
                message: context.to_string(),
            },
        }
    }

    /// Maps the error onto the fixed response-code table.
    pub fn response_code(&self) -> i32 {
        match self {
            BillingError::NotInitialized
            | BillingError::AlreadyInitialized
            | BillingError::Disposed
            | BillingError::ConcurrentOperation { .. }
            | BillingError::Unknown { .. } => IABHELPER_UNKNOWN_ERROR,
            BillingError::ServiceUnavailable { .. } => {
                codes::BILLING_RESPONSE_RESULT_BILLING_UNAVAILABLE
            }
            BillingError::Remote { .. } => IABHELPER_REMOTE_EXCEPTION,
            BillingError::BadResponse { .. } | BillingError::Payload(_) => IABHELPER_BAD_RESPONSE,
            BillingError::SendFlowFailed { .. } => IABHELPER_SEND_INTENT_FAILED,
            BillingError::VerificationFailed { .. } => IABHELPER_VERIFICATION_FAILED,
            BillingError::UserCancelled => IABHELPER_USER_CANCELLED,
            BillingError::UnknownPurchaseResponse => IABHELPER_UNKNOWN_PURCHASE_RESPONSE,
            BillingError::SubscriptionsUnavailable => IABHELPER_SUBSCRIPTIONS_NOT_AVAILABLE,
            BillingError::MissingToken { .. } => IABHELPER_MISSING_TOKEN,
            BillingError::InvalidConsumption { .. } => IABHELPER_INVALID_CONSUMPTION,
            BillingError::ItemUnavailable => codes::BILLING_RESPONSE_RESULT_ITEM_UNAVAILABLE,
            BillingError::ItemAlreadyOwned => codes::BILLING_RESPONSE_RESULT_ITEM_ALREADY_OWNED,
            BillingError::ItemNotOwned => codes::BILLING_RESPONSE_RESULT_ITEM_NOT_OWNED,
            BillingError::Vendor { code, .. } => *code,
        }
    }
}

impl From<ServiceError> for BillingError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable => BillingError::ServiceUnavailable {
                message: "Billing service unavailable on device.".to_string(),
            },
            ServiceError::Remote(message) => BillingError::Remote { message },
        }
    }
}

impl From<&BillingError> for BillingResult {
    fn from(err: &BillingError) -> Self {
        BillingResult::new(err.response_code(), &err.to_string())
    }
}
