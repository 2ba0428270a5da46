//! Builders for domain primitives used across tests.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::{
    BetId, CurrentOrder, CurrentOrderStatus, LimitOrder, MarketBook, MarketDefinition, MarketId,
    MarketStatus, Order, OrderType, Price, RunnerBook, RunnerStatus, SelectionKey, Side, Size,
    StrategyName, Trade,
};

/// Name used for orders built without an explicit strategy.
pub const TEST_STRATEGY: &str = "test";

/// A classic-ladder limit order with lapse persistence.
pub fn limit_order(price: Price, size: Size) -> OrderType {
    OrderType::Limit(LimitOrder::new(price, size))
}

/// A pending order on a throwaway trade for the `test` strategy.
///
/// The trade is not registered anywhere; use [`trade_for`] when the order
/// has to go through a transaction.
pub fn order_for(market_id: &str, selection_id: u64, side: Side, order_type: OrderType) -> Order {
    let mut trade = trade_for(market_id, selection_id, TEST_STRATEGY);
    trade.create_order(side, order_type)
}

/// A new trade for `strategy` on one selection.
pub fn trade_for(market_id: &str, selection_id: u64, strategy: &str) -> Trade {
    Trade::new(
        MarketId::from(market_id),
        SelectionKey::new(selection_id),
        StrategyName::from(strategy),
    )
}

/// The exchange view of `order` under `bet_id`, nothing matched yet.
pub fn current_order_for(order: &Order, bet_id: &str, status: CurrentOrderStatus) -> CurrentOrder {
    let selection = order.selection();
    let size = order
        .order_type()
        .as_limit()
        .map(LimitOrder::stake)
        .or_else(|| order.order_type().liability())
        .unwrap_or_default();
    CurrentOrder {
        bet_id: BetId::from(bet_id),
        market_id: order.market_id().clone(),
        selection_id: selection.selection_id,
        handicap: selection.handicap,
        customer_order_ref: Some(order.customer_order_ref()),
        status,
        price: order.order_type().price().unwrap_or_default(),
        size,
        size_matched: Decimal::ZERO,
        size_remaining: size,
        average_price_matched: Decimal::ZERO,
        size_cancelled: Decimal::ZERO,
        size_lapsed: Decimal::ZERO,
        size_voided: Decimal::ZERO,
        placed_date: Some(Utc::now()),
    }
}

/// An open market book published now, with a WIN definition.
pub fn market_book(market_id: &str, runners: Vec<RunnerBook>) -> MarketBook {
    MarketBook {
        market_id: MarketId::from(market_id),
        status: MarketStatus::Open,
        publish_time: Utc::now(),
        streaming_unique_id: None,
        streaming_snap: false,
        version: None,
        bet_delay: 0,
        market_definition: MarketDefinition::default(),
        runners,
    }
}

/// The same book marked CLOSED.
pub fn closed_book(market_id: &str, runners: Vec<RunnerBook>) -> MarketBook {
    MarketBook {
        status: MarketStatus::Closed,
        ..market_book(market_id, runners)
    }
}

pub fn runner(selection_id: u64, status: RunnerStatus) -> RunnerBook {
    RunnerBook {
        selection_id,
        handicap: Decimal::ZERO,
        status,
        last_price_traded: None,
        adjustment_factor: None,
    }
}
