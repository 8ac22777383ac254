//! Typed identifiers
//!
//! Each record kind gets its own UUID newtype so a `JobId` can never be
//! passed where an `InvoiceId` is expected. Ids display with a short tag
//! (`JOB-0190…`) in logs; the tag is optional when parsing and never stored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Common surface of the typed ids
pub trait EntityId: Copy + fmt::Display + Send + Sync + 'static {
    /// Record kind named in not-found errors
    const ENTITY: &'static str;

    fn as_uuid(&self) -> &Uuid;
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal, $tag:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Time-ordered id; rows created later sort later
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl EntityId for $name {
            const ENTITY: &'static str = $entity;

            fn as_uuid(&self) -> &Uuid {
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
                write!(f, "{}-{}", $tag, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($tag, "-")).unwrap_or(s);
                Uuid::parse_str(raw).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

entity_id!(CustomerId, "Customer", "CUS");
entity_id!(
    /// Quotes live only until they are turned into a job
    QuoteId,
    "Quote",
    "QTE"
);
entity_id!(JobId, "Job", "JOB");
entity_id!(InvoiceId, "Invoice", "INV");
entity_id!(PaymentId, "Payment", "PAY");
