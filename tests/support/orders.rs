//! Order helpers shared by transaction and reconciliation tests.

use betflow::domain::{
    CurrentOrder, CurrentOrderStatus, CurrentOrders, MarketId, Order, OrderId, Price, SelectionKey,
    Side, Size, StrategyName, Trade,
};
use betflow::engine::{Engine, Event};
use betflow::error::StrategyError;
use betflow::execution::{PlaceOutcome, Transaction};
use betflow::testkit::domain::{current_order_for, limit_order};

/// Register a new trade and place one back limit order on it.
///
/// Returns the order id and the placement outcome.
pub fn place_back(
    tx: &mut Transaction<'_>,
    strategy: &str,
    selection_id: u64,
    price: Price,
    size: Size,
    market_version: Option<u64>,
    force: bool,
) -> Result<(OrderId, PlaceOutcome), StrategyError> {
    let trade = Trade::new(
        tx.market().market_id().clone(),
        SelectionKey::new(selection_id),
        StrategyName::from(strategy),
    );
    let order = tx
        .add_trade(trade)
        .create_order(Side::Back, limit_order(price, size));
    let order_id = order.id().clone();
    let outcome = tx.place_order(order, market_version, force)?;
    Ok((order_id, outcome))
}

pub fn order<'a>(engine: &'a Engine, market_id: &str, order_id: &OrderId) -> &'a Order {
    engine
        .markets()
        .get_order(&MarketId::from(market_id), order_id)
        .expect("order in blotter")
}

pub fn in_blotter(engine: &Engine, market_id: &str, order_id: &OrderId) -> bool {
    engine
        .markets()
        .get_order(&MarketId::from(market_id), order_id)
        .is_some()
}

/// A current-orders event reporting `order` under `bet_id`.
pub fn report(
    order: &Order,
    bet_id: &str,
    status: CurrentOrderStatus,
    size_matched: Size,
) -> Event {
    let mut current = current_order_for(order, bet_id, status);
    current.size_matched = size_matched;
    current.size_remaining = current.size - size_matched;
    if !size_matched.is_zero() {
        current.average_price_matched = current.price;
    }
    current_orders(vec![current])
}

pub fn current_orders(orders: Vec<CurrentOrder>) -> Event {
    Event::CurrentOrders(vec![CurrentOrders {
        orders,
        more_available: false,
    }])
}
