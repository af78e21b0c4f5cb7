use std::fmt;

/// Whether a product is a one-time item or an auto-renewing subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    InApp,
    Subscription,
}

impl ItemType {
    /// The vendor wire value ("inapp" / "subs").
    pub fn value(&self) -> &'static str {
        match self {
            ItemType::InApp => "inapp",
            ItemType::Subscription => "subs",
        }
    }

    /// Parses both the wire values and the legacy uppercase enum names sent by
    /// older bridge consumers.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "inapp" => Some(ItemType::InApp),
            "subs" | "subscription" => Some(ItemType::Subscription),
            _ => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_values_and_legacy_names() {
        assert_eq!(ItemType::from_name("inapp"), Some(ItemType::InApp));
        assert_eq!(ItemType::from_name("INAPP"), Some(ItemType::InApp));
        assert_eq!(ItemType::from_name("subs"), Some(ItemType::Subscription));
        assert_eq!(
            ItemType::from_name("SUBSCRIPTION"),
            Some(ItemType::Subscription)
        );
        assert_eq!(ItemType::from_name("gems"), None);
    }

    #[test]
    fn wire_values_are_stable() {
        assert_eq!(ItemType::InApp.value(), "inapp");
        assert_eq!(ItemType::Subscription.value(), "subs");
    }
}
