//! Order type variants and their parameters.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::{Price, Size};

/// Price ladder the market trades on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceLadder {
    #[default]
    Classic,
    Finest,
    /// Line markets, where every bet is struck at 2.0.
    LineRange,
}

/// What happens to unmatched size when the market turns in-play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistenceType {
    #[default]
    Lapse,
    Persist,
    MarketOnClose,
}

impl fmt::Display for PersistenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lapse => "LAPSE",
            Self::Persist => "PERSIST",
            Self::MarketOnClose => "MARKET_ON_CLOSE",
        };
        write!(f, "{s}")
    }
}

/// Fixed price order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrder {
    pub price: Price,
    pub size: Size,
    #[serde(default)]
    pub bet_target_size: Option<Size>,
    #[serde(default)]
    pub persistence_type: PersistenceType,
    #[serde(default)]
    pub price_ladder: PriceLadder,
}

impl LimitOrder {
    /// Create a classic-ladder order that lapses in-play.
    #[must_use]
    pub fn new(price: Price, size: Size) -> Self {
        Self {
            price,
            size,
            bet_target_size: None,
            persistence_type: PersistenceType::Lapse,
            price_ladder: PriceLadder::Classic,
        }
    }

    #[must_use]
    pub fn with_persistence(mut self, persistence_type: PersistenceType) -> Self {
        self.persistence_type = persistence_type;
        self
    }

    #[must_use]
    pub fn with_price_ladder(mut self, price_ladder: PriceLadder) -> Self {
        self.price_ladder = price_ladder;
        self
    }

    /// Size the order by target profit/payout instead of stake.
    #[must_use]
    pub fn with_bet_target_size(mut self, bet_target_size: Size) -> Self {
        self.size = Decimal::ZERO;
        self.bet_target_size = Some(bet_target_size);
        self
    }

    /// Requested stake, falling back to the bet target size.
    #[must_use]
    pub fn stake(&self) -> Size {
        if self.size.is_zero() {
            self.bet_target_size.unwrap_or_default()
        } else {
            self.size
        }
    }
}

/// Starting price order with a price limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOnCloseOrder {
    pub liability: Size,
    pub price: Price,
}

/// Starting price order taking any price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOnCloseOrder {
    pub liability: Size,
}

/// The three supported order types, each carrying its own parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "orderType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit(LimitOrder),
    LimitOnClose(LimitOnCloseOrder),
    MarketOnClose(MarketOnCloseOrder),
}

impl OrderType {
    /// Exchange name of the order type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Limit(_) => "LIMIT",
            Self::LimitOnClose(_) => "LIMIT_ON_CLOSE",
            Self::MarketOnClose(_) => "MARKET_ON_CLOSE",
        }
    }

    /// Whether the order is settled at starting price.
    #[must_use]
    pub fn is_starting_price(&self) -> bool {
        !matches!(self, Self::Limit(_))
    }

    #[must_use]
    pub fn as_limit(&self) -> Option<&LimitOrder> {
        match self {
            Self::Limit(limit) => Some(limit),
            _ => None,
        }
    }

    /// Requested price, if the order type has one.
    #[must_use]
    pub fn price(&self) -> Option<Price> {
        match self {
            Self::Limit(limit) => Some(limit.price),
            Self::LimitOnClose(loc) => Some(loc.price),
            Self::MarketOnClose(_) => None,
        }
    }

    /// Liability of a starting price order.
    #[must_use]
    pub fn liability(&self) -> Option<Size> {
        match self {
            Self::Limit(_) => None,
            Self::LimitOnClose(loc) => Some(loc.liability),
            Self::MarketOnClose(moc) => Some(moc.liability),
        }
    }

    #[must_use]
    pub fn price_ladder(&self) -> Option<PriceLadder> {
        self.as_limit().map(|limit| limit.price_ladder)
    }

    #[must_use]
    pub fn is_line_range(&self) -> bool {
        self.price_ladder() == Some(PriceLadder::LineRange)
    }
}

impl From<LimitOrder> for OrderType {
    fn from(order: LimitOrder) -> Self {
        Self::Limit(order)
    }
}

impl From<LimitOnCloseOrder> for OrderType {
    fn from(order: LimitOnCloseOrder) -> Self {
        Self::LimitOnClose(order)
    }
}

impl From<MarketOnCloseOrder> for OrderType {
    fn from(order: MarketOnCloseOrder) -> Self {
        Self::MarketOnClose(order)
    }
}
