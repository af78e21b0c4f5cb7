/// Installer package names registered by the OneStore carrier builds
/// (SKT, KT, LG U+).
const ONE_STORE_INSTALLERS: &[&str] = &[
    "com.skt.skaf.A000Z00040",
    "com.skt.skaf.Z0000TSEED",
    "com.kt.om.ktpackageinstaller",
    "com.android.ktpackageinstaller",
    "com.kt.olleh.storefront",
    "com.kt.olleh.istore",
    "android.lgt.appstore",
    "com.lguplus.appstore",
    "com.lguplus.installer",
];

const PLAY_STORE_INSTALLER: &str = "com.android.vending";

/// Marketplace whose billing service the bridge talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {
    Google,
    OneStore,
    AppStore,
}

impl Store {
    /// Lowercase identifier reported over the bridge.
    pub fn as_str(&self) -> &'static str {
        match self {
            Store::Google => "google",
            Store::OneStore => "onestore",
            Store::AppStore => "appstore",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "google" => Some(Store::Google),
            "onestore" => Some(Store::OneStore),
            "appstore" => Some(Store::AppStore),
            _ => None,
        }
    }

    /// Detects the marketplace from the package name of whatever installed
    /// the application.
    pub fn from_installer_package(package_name: Option<&str>) -> Option<Self> {
        let package_name = package_name.unwrap_or_default();
        if package_name == PLAY_STORE_INSTALLER {
            Some(Store::Google)
        } else if ONE_STORE_INSTALLERS.contains(&package_name) {
            Some(Store::OneStore)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_marketplace_by_installer() {
        assert_eq!(
            Store::from_installer_package(Some("com.android.vending")),
            Some(Store::Google)
        );
        assert_eq!(
            Store::from_installer_package(Some("com.skt.skaf.A000Z00040")),
            Some(Store::OneStore)
        );
        assert_eq!(
            Store::from_installer_package(Some("com.lguplus.appstore")),
            Some(Store::OneStore)
        );
        assert_eq!(Store::from_installer_package(Some("org.sideload")), None);
        assert_eq!(Store::from_installer_package(None), None);
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(Store::from_name("GOOGLE"), Some(Store::Google));
        assert_eq!(Store::from_name("onestore"), Some(Store::OneStore));
        assert_eq!(Store::from_name("AppStore"), Some(Store::AppStore));
        assert_eq!(Store::from_name("amazon"), None);
    }
}
