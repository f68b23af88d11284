//! Identity types for MarketPay
//!
//! All identity types are strongly typed wrappers around UUIDs to prevent
//! accidental mixing of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from a string (with or without prefix)
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Get the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
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

define_id_type!(OrderId, "order", "Unique identifier for a marketplace order");
define_id_type!(EscrowId, "escrow", "Unique identifier for an escrow record");
define_id_type!(DisputeId, "dispute", "Unique identifier for a dispute");
define_id_type!(UserId, "user", "Unique identifier for a buyer, vendor or admin");
define_id_type!(PaymentId, "pay", "Unique identifier for a vendor payout");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_prefix() {
        let id = OrderId::new();
        assert!(id.to_string().starts_with("order_"));
    }

    #[test]
    fn parse_accepts_prefixed_and_bare() {
        let id = EscrowId::new();
        assert_eq!(EscrowId::parse(&id.to_string()).unwrap(), id);
        assert_eq!(EscrowId::parse(&id.as_uuid().to_string()).unwrap(), id);
    }

    #[test]
    fn ids_with_same_uuid_are_equal() {
        let uuid = Uuid::new_v4();
        assert_eq!(UserId::from_uuid(uuid), UserId::from_uuid(uuid));
    }
}
