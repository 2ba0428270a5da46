//! Domain identifier types with proper encapsulation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the strategy name hash that prefixes every customer order reference.
pub const STRATEGY_NAME_HASH_LENGTH: usize = 13;

/// Maximum length of a customer order reference accepted by the exchange.
pub const CUSTOMER_ORDER_REF_MAX_LENGTH: usize = 32;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "` from a string.")]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[doc = concat!("Get the `", stringify!($name), "` as a string slice.")]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Exchange market identifier, e.g. `1.23`.
    MarketId
);

string_id!(
    /// Exchange-assigned bet identifier.
    ///
    /// Assigned asynchronously after placement and distinct from [`OrderId`].
    BetId
);

string_id!(
    /// Identifier of an execution client.
    ClientId
);

string_id!(
    /// Unique strategy name.
    StrategyName
);

impl StrategyName {
    /// Short hash of the name used to prefix customer order references.
    ///
    /// The first 13 hex characters of the SHA-256 digest.
    #[must_use]
    pub fn name_hash(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            hex.push_str(&format!("{byte:02x}"));
        }
        hex.truncate(STRATEGY_NAME_HASH_LENGTH);
        hex
    }
}

/// Process-unique order identifier.
///
/// Generated ids are decimal strings seeded from the wall clock and
/// incremented per order, so `{hash}{sep}{id}` fits in a customer order
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

static ORDER_ID_SEED: OnceLock<u64> = OnceLock::new();
static ORDER_ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

impl OrderId {
    /// Create an order id from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new process-unique order id.
    #[must_use]
    pub fn generate() -> Self {
        let seed = *ORDER_ID_SEED.get_or_init(|| {
            u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or_default()
        });
        let sequence = ORDER_ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(seed.wrapping_add(sequence).to_string())
    }

    /// Parse the order id out of a customer order reference.
    ///
    /// References are `{strategy hash}{separator}{order id}`.
    #[must_use]
    pub fn from_customer_ref(reference: &str) -> Option<Self> {
        reference
            .get(STRATEGY_NAME_HASH_LENGTH + 1..)
            .filter(|id| !id.is_empty())
            .map(Self::new)
    }

    /// Get the order ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Unique identifier for a trade.
///
/// Generated as UUID v4 for new trades.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(String);

impl TradeId {
    /// Create a new `TradeId` with a generated UUID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the trade ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TradeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A selection within a market, qualified by handicap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionKey {
    pub selection_id: u64,
    pub handicap: Decimal,
}

impl SelectionKey {
    /// Create a key with zero handicap.
    #[must_use]
    pub fn new(selection_id: u64) -> Self {
        Self {
            selection_id,
            handicap: Decimal::ZERO,
        }
    }

    /// Create a key with a handicap.
    #[must_use]
    pub fn with_handicap(selection_id: u64, handicap: Decimal) -> Self {
        Self {
            selection_id,
            handicap: handicap.normalize(),
        }
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.handicap.is_zero() {
            write!(f, "{}", self.selection_id)
        } else {
            write!(f, "{}:{}", self.selection_id, self.handicap)
        }
    }
}
