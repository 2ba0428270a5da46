//! Order-update resources reported by the exchange.
//!
//! Current orders drive the order state machine; cleared orders and
//! cleared markets only carry settlement data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{BetId, MarketId, OrderId, SelectionKey};

/// Order status as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrentOrderStatus {
    Pending,
    Executable,
    ExecutionComplete,
    Expired,
}

impl CurrentOrderStatus {
    /// Whether the exchange considers the order finished.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ExecutionComplete | Self::Expired)
    }
}

/// Exchange view of a single order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentOrder {
    pub bet_id: BetId,
    pub market_id: MarketId,
    pub selection_id: u64,
    #[serde(default)]
    pub handicap: Decimal,
    /// `{strategy hash}{separator}{order id}`.
    #[serde(default)]
    pub customer_order_ref: Option<String>,
    pub status: CurrentOrderStatus,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub size: Decimal,
    #[serde(default)]
    pub size_matched: Decimal,
    #[serde(default)]
    pub size_remaining: Decimal,
    #[serde(default)]
    pub average_price_matched: Decimal,
    #[serde(default)]
    pub size_cancelled: Decimal,
    #[serde(default)]
    pub size_lapsed: Decimal,
    #[serde(default)]
    pub size_voided: Decimal,
    #[serde(default)]
    pub placed_date: Option<DateTime<Utc>>,
}

impl CurrentOrder {
    /// Local order id encoded in the customer order reference.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.customer_order_ref
            .as_deref()
            .and_then(OrderId::from_customer_ref)
    }

    #[must_use]
    pub fn selection(&self) -> SelectionKey {
        SelectionKey::with_handicap(self.selection_id, self.handicap)
    }
}

/// A page of current orders for one client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentOrders {
    #[serde(rename = "currentOrders", default)]
    pub orders: Vec<CurrentOrder>,
    #[serde(default)]
    pub more_available: bool,
}

/// Settled order returned after a market clears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedOrder {
    pub bet_id: BetId,
    pub market_id: MarketId,
    pub selection_id: u64,
    #[serde(default)]
    pub handicap: Decimal,
    #[serde(default)]
    pub customer_order_ref: Option<String>,
    #[serde(default)]
    pub bet_outcome: String,
    #[serde(default)]
    pub price_matched: Decimal,
    #[serde(default)]
    pub size_settled: Decimal,
    #[serde(default)]
    pub profit: Decimal,
    #[serde(default)]
    pub settled_date: Option<DateTime<Utc>>,
}

impl ClearedOrder {
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.customer_order_ref
            .as_deref()
            .and_then(OrderId::from_customer_ref)
    }
}

/// Cleared orders for one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedOrders {
    pub market_id: MarketId,
    #[serde(rename = "clearedOrders", default)]
    pub orders: Vec<ClearedOrder>,
    #[serde(default)]
    pub more_available: bool,
}

/// Market-level settlement summary for one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedMarket {
    pub market_id: MarketId,
    pub profit: Decimal,
    pub bet_count: u32,
    #[serde(default)]
    pub commission: Decimal,
}

/// A page of cleared markets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedMarkets {
    #[serde(rename = "clearedMarkets", default)]
    pub orders: Vec<ClearedMarket>,
    #[serde(default)]
    pub more_available: bool,
}
