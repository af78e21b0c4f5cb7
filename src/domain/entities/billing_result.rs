use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

// Billing response codes, as defined by the vendor wire contract.
pub const BILLING_RESPONSE_RESULT_OK: i32 = 0;
pub const BILLING_RESPONSE_RESULT_USER_CANCELED: i32 = 1;
pub const BILLING_RESPONSE_RESULT_BILLING_UNAVAILABLE: i32 = 3;
pub const BILLING_RESPONSE_RESULT_ITEM_UNAVAILABLE: i32 = 4;
pub const BILLING_RESPONSE_RESULT_DEVELOPER_ERROR: i32 = 5;
pub const BILLING_RESPONSE_RESULT_ERROR: i32 = 6;
pub const BILLING_RESPONSE_RESULT_ITEM_ALREADY_OWNED: i32 = 7;
pub const BILLING_RESPONSE_RESULT_ITEM_NOT_OWNED: i32 = 8;

// Helper error codes, distinct from the vendor code space.
pub const IABHELPER_ERROR_BASE: i32 = -1000;
pub const IABHELPER_REMOTE_EXCEPTION: i32 = -1001;
pub const IABHELPER_BAD_RESPONSE: i32 = -1002;
pub const IABHELPER_VERIFICATION_FAILED: i32 = -1003;
pub const IABHELPER_SEND_INTENT_FAILED: i32 = -1004;
pub const IABHELPER_USER_CANCELLED: i32 = -1005;
pub const IABHELPER_UNKNOWN_PURCHASE_RESPONSE: i32 = -1006;
pub const IABHELPER_MISSING_TOKEN: i32 = -1007;
pub const IABHELPER_UNKNOWN_ERROR: i32 = -1008;
pub const IABHELPER_SUBSCRIPTIONS_NOT_AVAILABLE: i32 = -1009;
pub const IABHELPER_INVALID_CONSUMPTION: i32 = -1010;

static VENDOR_DESCRIPTIONS: Lazy<HashMap<i32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (0, "0:OK"),
        (1, "1:User Canceled"),
        (2, "2:Unknown"),
        (3, "3:Billing Unavailable"),
        (4, "4:Item unavailable"),
        (5, "5:Developer Error"),
        (6, "6:Error"),
        (7, "7:Item Already Owned"),
        (8, "8:Item not owned"),
    ])
});

static HELPER_DESCRIPTIONS: Lazy<HashMap<i32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (IABHELPER_REMOTE_EXCEPTION, "-1001:Remote exception during initialization"),
        (IABHELPER_BAD_RESPONSE, "-1002:Bad response received"),
        (
            IABHELPER_VERIFICATION_FAILED,
            "-1003:Purchase signature verification failed",
        ),
        (IABHELPER_SEND_INTENT_FAILED, "-1004:Send intent failed"),
        (IABHELPER_USER_CANCELLED, "-1005:User cancelled"),
        (
            IABHELPER_UNKNOWN_PURCHASE_RESPONSE,
            "-1006:Unknown purchase response",
        ),
        (IABHELPER_MISSING_TOKEN, "-1007:Missing token"),
        (IABHELPER_UNKNOWN_ERROR, "-1008:Unknown error"),
        (
            IABHELPER_SUBSCRIPTIONS_NOT_AVAILABLE,
            "-1009:Subscriptions not available",
        ),
        (
            IABHELPER_INVALID_CONSUMPTION,
            "-1010:Invalid consumption attempt",
        ),
    ])
});

/// Returns a human-readable description for the given response code. The
/// returned string is stable, always non-empty, and includes the numeric code.
pub fn describe_response(code: i32) -> String {
    if code <= IABHELPER_ERROR_BASE {
        HELPER_DESCRIPTIONS
            .get(&code)
            .map(|d| d.to_string())
            .unwrap_or_else(|| format!("{code}:Unknown IAB Helper Error"))
    } else {
        VENDOR_DESCRIPTIONS
            .get(&code)
            .map(|d| d.to_string())
            .unwrap_or_else(|| format!("{code}:Unknown"))
    }
}

/// Result of an in-app billing operation: a response code plus a
/// human-readable message. The message is never empty; a blank input falls
/// back to the code's description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingResult {
    pub response: i32,
    pub message: String,
}

impl BillingResult {
    pub fn new(response: i32, message: &str) -> Self {
        let message = if message.trim().is_empty() {
            describe_response(response)
        } else {
            format!("{message} (response: {})", describe_response(response))
        };
        Self { response, message }
    }

    pub fn ok(message: &str) -> Self {
        Self::new(BILLING_RESPONSE_RESULT_OK, message)
    }

    pub fn is_success(&self) -> bool {
        self.response == BILLING_RESPONSE_RESULT_OK
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }
}

impl fmt::Display for BillingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
