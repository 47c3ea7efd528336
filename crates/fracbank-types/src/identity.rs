//! Identity types for FracBank
//!
//! Accounts are strongly typed UUID wrappers. Asset classes are named by
//! free-form strings chosen by the administrator, and listings are numbered
//! by a monotonic counter.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse from a string (with or without prefix)
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Short form used in log lines
            pub fn short(&self) -> String {
                let full = self.0.simple().to_string();
                format!("{}_{}", $prefix, &full[..8])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id_type!(
    AccountId,
    "acct",
    "Identity of a participant: holders, sellers, buyers, the administrator and the ledger and marketplace accounts themselves"
);

/// Name of an asset class (a pool of fractional shares)
///
/// The empty id is reserved: it is what a tombstoned listing carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AssetClassId(pub String);

impl AssetClassId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The tombstone marker
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AssetClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetClassId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AssetClassId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Marketplace listing id, assigned from a monotonic counter starting at 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl ItemId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_roundtrip() {
        let id = AccountId::new();
        let parsed = AccountId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(id.short().starts_with("acct_"));
    }

    #[test]
    fn test_asset_class_tombstone() {
        assert!(AssetClassId::empty().is_empty());
        assert!(!AssetClassId::from("testNFT").is_empty());
    }

    #[test]
    fn test_item_id_display() {
        assert_eq!(ItemId::new(7).to_string(), "item_7");
    }
}
