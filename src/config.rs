use std::env;

/// Static configuration for the billing stack, normally sourced from the host
/// application's metadata.
#[derive(Debug, Clone, Default)]
pub struct BillingConfig {
    /// Package / bundle identifier of the host application.
    pub package_name: String,
    /// Base64-encoded public key used to verify Play Store purchase
    /// signatures.
    pub play_store_public_key: Option<String>,
    /// OneStore application license key.
    pub one_store_key: Option<String>,
    /// Operator opt-out of purchase verification. Only honored for debuggable
    /// builds; see [`BillingConfig::verification_skipped`].
    pub skip_purchase_verification: bool,
    /// Whether the host application is marked debuggable.
    pub debuggable: bool,
}

impl BillingConfig {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            ..Self::default()
        }
    }

    pub fn with_play_store_public_key(mut self, key: impl Into<String>) -> Self {
        self.play_store_public_key = Some(key.into());
        self
    }

    pub fn with_one_store_key(mut self, key: impl Into<String>) -> Self {
        self.one_store_key = Some(key.into());
        self
    }

    /// Reads configuration from the environment: `IAP_PACKAGE_NAME`,
    /// `PLAY_STORE_KEY`, `ONE_STORE_KEY`, `IAP_SKIP_VERIFICATION`.
    pub fn from_env() -> Self {
        Self {
            package_name: env::var("IAP_PACKAGE_NAME").unwrap_or_default(),
            play_store_public_key: env::var("PLAY_STORE_KEY").ok(),
            one_store_key: env::var("ONE_STORE_KEY").ok(),
            skip_purchase_verification: env::var("IAP_SKIP_VERIFICATION")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            debuggable: false,
        }
    }

    /// Whether purchase verification may be skipped. The opt-out is only
    /// reachable when the app is debuggable and the crate is compiled with
    /// debug assertions; release builds always verify.
    pub fn verification_skipped(&self) -> bool {
        cfg!(debug_assertions) && self.debuggable && self.skip_purchase_verification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_requires_both_flags() {
        let config = BillingConfig::new("com.example.app");
        assert!(!config.verification_skipped());

        let config = BillingConfig {
            skip_purchase_verification: true,
            debuggable: false,
            ..BillingConfig::new("com.example.app")
        };
        assert!(!config.verification_skipped());

        let config = BillingConfig {
            skip_purchase_verification: false,
            debuggable: true,
            ..BillingConfig::new("com.example.app")
        };
        assert!(!config.verification_skipped());
    }

    // Single test owning every variable from_env reads, so parallel test
    // threads never race on the process environment.
    #[test]
    fn from_env_reads_billing_settings() {
        env::set_var("IAP_PACKAGE_NAME", "com.example.app");
        env::set_var("PLAY_STORE_KEY", "play-key");
        env::set_var("ONE_STORE_KEY", "one-key");
        env::set_var("IAP_SKIP_VERIFICATION", "1");

        let config = BillingConfig::from_env();
        assert_eq!(config.package_name, "com.example.app");
        assert_eq!(config.play_store_public_key.as_deref(), Some("play-key"));
        assert_eq!(config.one_store_key.as_deref(), Some("one-key"));
        assert!(config.skip_purchase_verification);
        assert!(!config.debuggable);

        env::set_var("IAP_SKIP_VERIFICATION", "TRUE");
        assert!(BillingConfig::from_env().skip_purchase_verification);

        env::set_var("IAP_SKIP_VERIFICATION", "no");
        assert!(!BillingConfig::from_env().skip_purchase_verification);

        env::remove_var("IAP_SKIP_VERIFICATION");
        assert!(!BillingConfig::from_env().skip_purchase_verification);

        env::remove_var("IAP_PACKAGE_NAME");
        env::remove_var("PLAY_STORE_KEY");
        env::remove_var("ONE_STORE_KEY");
        let config = BillingConfig::from_env();
        assert_eq!(config.package_name, "");
        assert!(config.play_store_public_key.is_none());
        assert!(config.one_store_key.is_none());
    }

    #[test]
    fn builder_sets_keys() {
        let config = BillingConfig::new("com.example.app")
            .with_play_store_public_key("play-key")
            .with_one_store_key("one-key");
        assert_eq!(config.package_name, "com.example.app");
        assert_eq!(config.play_store_public_key.as_deref(), Some("play-key"));
        assert_eq!(config.one_store_key.as_deref(), Some("one-key"));
    }
}
