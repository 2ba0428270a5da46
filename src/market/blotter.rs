//! Per-market order ledger.
//!
//! The blotter owns every order and trade for one market. Secondary
//! indices hold order ids only, so the primary map is the single owner.
//! Orders are never removed; completing an order only drops it from the
//! live list.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{
    calculate_matched_exposure, calculate_unmatched_exposure, BetId, ClearedOrders, ClientId,
    Exposures, MarketBook, MarketId, Order, OrderId, OrderStatus, OrderType, SelectionKey,
    Settlement, Side, StrategyName, Trade, TradeId, TradeStatus,
};
use crate::error::OrderError;

/// Context key holding the settled line for line range markets.
pub const LINE_RANGE_RESULT_KEY: &str = "line_range_result";

/// Statuses that do not count towards exposure yet.
const NON_EXPOSED_STATUS: [OrderStatus; 3] = [
    OrderStatus::Pending,
    OrderStatus::Violation,
    OrderStatus::Expired,
];

/// Every order and trade for one market, with lookup indices.
#[derive(Debug)]
pub struct Blotter {
    market_id: MarketId,
    active: bool,
    orders: HashMap<OrderId, Order>,
    sequence: Vec<OrderId>,
    trades: HashMap<TradeId, Trade>,
    trade_orders: HashMap<TradeId, Vec<OrderId>>,
    bet_ids: HashMap<BetId, OrderId>,
    live_orders: Vec<OrderId>,
    strategy_orders: HashMap<StrategyName, Vec<OrderId>>,
    strategy_selection_orders: HashMap<(StrategyName, SelectionKey), Vec<OrderId>>,
    client_orders: HashMap<ClientId, Vec<OrderId>>,
}

impl Blotter {
    #[must_use]
    pub fn new(market_id: MarketId) -> Self {
        Self {
            market_id,
            active: false,
            orders: HashMap::new(),
            sequence: Vec::new(),
            trades: HashMap::new(),
            trade_orders: HashMap::new(),
            bet_ids: HashMap::new(),
            live_orders: Vec::new(),
            strategy_orders: HashMap::new(),
            strategy_selection_orders: HashMap::new(),
            client_orders: HashMap::new(),
        }
    }

    #[must_use]
    pub fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    /// True once any order has been inserted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[must_use]
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.orders.contains_key(order_id)
    }

    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub(crate) fn get_mut(&mut self, order_id: &OrderId) -> Option<&mut Order> {
        self.orders.get_mut(order_id)
    }

    #[must_use]
    pub fn get_order_by_bet_id(&self, bet_id: &BetId) -> Option<&Order> {
        self.bet_ids.get(bet_id).and_then(|id| self.orders.get(id))
    }

    /// All orders in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.sequence.iter().filter_map(|id| self.orders.get(id))
    }

    /// Register a trade so orders can be created against it.
    ///
    /// Returns the stored trade; an existing trade with the same id is kept.
    pub fn add_trade(&mut self, trade: Trade) -> &mut Trade {
        self.trades.entry(trade.id().clone()).or_insert(trade)
    }

    #[must_use]
    pub fn trade(&self, trade_id: &TradeId) -> Option<&Trade> {
        self.trades.get(trade_id)
    }

    pub fn trade_mut(&mut self, trade_id: &TradeId) -> Option<&mut Trade> {
        self.trades.get_mut(trade_id)
    }

    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.values()
    }

    /// Insert a new order and index it.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::DuplicateOrder`] if the id is already present.
    pub fn insert(&mut self, order: Order) -> Result<(), OrderError> {
        if self.orders.contains_key(order.id()) {
            return Err(OrderError::DuplicateOrder {
                order_id: order.id().to_string(),
                market_id: self.market_id.to_string(),
            });
        }
        self.active = true;
        let id = order.id().clone();
        if let Some(bet_id) = order.bet_id() {
            self.bet_ids.insert(bet_id.clone(), id.clone());
        }
        if !order.is_complete() {
            self.live_orders.push(id.clone());
        }
        self.trade_orders
            .entry(order.trade_id().clone())
            .or_default()
            .push(id.clone());
        self.strategy_orders
            .entry(order.strategy().clone())
            .or_default()
            .push(id.clone());
        self.strategy_selection_orders
            .entry((order.strategy().clone(), order.selection()))
            .or_default()
            .push(id.clone());
        if let Some(client_id) = order.client_id() {
            self.client_orders
                .entry(client_id.clone())
                .or_default()
                .push(id.clone());
        }
        self.sequence.push(id.clone());
        self.orders.insert(id, order);
        Ok(())
    }

    /// Record the exchange bet id for an order.
    pub(crate) fn set_bet_id(&mut self, order_id: &OrderId, bet_id: BetId) {
        if let Some(order) = self.orders.get_mut(order_id) {
            order.set_bet_id(bet_id.clone());
            self.bet_ids.insert(bet_id, order_id.clone());
        }
    }

    /// Drop a completed order from the live list.
    ///
    /// Idempotent: returns false if the order was not live.
    pub fn complete_order(&mut self, order_id: &OrderId) -> bool {
        match self.live_orders.iter().position(|id| id == order_id) {
            Some(index) => {
                self.live_orders.remove(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_live(&self, order_id: &OrderId) -> bool {
        self.live_orders.contains(order_id)
    }

    pub fn live_orders(&self) -> impl Iterator<Item = &Order> {
        self.live_orders.iter().filter_map(|id| self.orders.get(id))
    }

    #[must_use]
    pub fn live_order_ids(&self) -> &[OrderId] {
        &self.live_orders
    }

    #[must_use]
    pub fn has_live_orders(&self) -> bool {
        !self.live_orders.is_empty()
    }

    /// Orders placed by a strategy, optionally filtered by status and fill.
    #[must_use]
    pub fn strategy_orders(
        &self,
        strategy: &StrategyName,
        order_status: Option<&[OrderStatus]>,
        matched_only: bool,
    ) -> Vec<&Order> {
        self.filter(self.strategy_orders.get(strategy), order_status, matched_only)
    }

    /// Live order ids for a strategy.
    #[must_use]
    pub fn strategy_live_order_ids(&self, strategy: &StrategyName) -> Vec<OrderId> {
        self.live_orders
            .iter()
            .filter(|id| {
                self.orders
                    .get(*id)
                    .is_some_and(|order| order.strategy() == strategy)
            })
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn strategy_selection_orders(
        &self,
        strategy: &StrategyName,
        selection: SelectionKey,
        order_status: Option<&[OrderStatus]>,
        matched_only: bool,
    ) -> Vec<&Order> {
        self.filter(
            self.strategy_selection_orders
                .get(&(strategy.clone(), selection)),
            order_status,
            matched_only,
        )
    }

    #[must_use]
    pub fn client_orders(
        &self,
        client_id: &ClientId,
        order_status: Option<&[OrderStatus]>,
        matched_only: bool,
    ) -> Vec<&Order> {
        self.filter(self.client_orders.get(client_id), order_status, matched_only)
    }

    #[must_use]
    pub fn trade_orders(&self, trade_id: &TradeId) -> Vec<&Order> {
        self.filter(self.trade_orders.get(trade_id), None, false)
    }

    fn filter(
        &self,
        ids: Option<&Vec<OrderId>>,
        order_status: Option<&[OrderStatus]>,
        matched_only: bool,
    ) -> Vec<&Order> {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.orders.get(id))
            .filter(|o| order_status.map_or(true, |statuses| statuses.contains(&o.status())))
            .filter(|o| !matched_only || o.size_matched() > Decimal::ZERO)
            .collect()
    }

    /// Exposure of one strategy on one selection.
    ///
    /// Pending, violated and expired orders are ignored, as is `exclusion`
    /// (the order being replaced). Line range orders are valued at 2.0.
    #[must_use]
    pub fn get_exposures(
        &self,
        strategy: &StrategyName,
        selection: SelectionKey,
        exclusion: Option<&OrderId>,
    ) -> Exposures {
        let two = Decimal::TWO;
        let (mut matched_backs, mut matched_lays) = (Vec::new(), Vec::new());
        let (mut unmatched_backs, mut unmatched_lays) = (Vec::new(), Vec::new());
        let mut sp_win_liability = Decimal::ZERO;
        let mut sp_lose_liability = Decimal::ZERO;

        let key = (strategy.clone(), selection);
        for id in self.strategy_selection_orders.get(&key).into_iter().flatten() {
            if exclusion == Some(id) {
                continue;
            }
            let Some(order) = self.orders.get(id) else {
                continue;
            };
            if NON_EXPOSED_STATUS.contains(&order.status()) {
                continue;
            }
            match order.order_type() {
                OrderType::Limit(limit) => {
                    let line_range = order.order_type().is_line_range();
                    let size_matched = order.size_matched();
                    if !size_matched.is_zero() {
                        let price = if line_range {
                            two
                        } else {
                            order.average_price_matched()
                        };
                        match order.side() {
                            Side::Back => matched_backs.push((price, size_matched)),
                            Side::Lay => matched_lays.push((price, size_matched)),
                        }
                    }
                    if !order.is_complete() {
                        let size_remaining = order.size_remaining();
                        let price = if line_range { two } else { limit.price };
                        if !price.is_zero() && !size_remaining.is_zero() {
                            match order.side() {
                                Side::Back => unmatched_backs.push((price, size_remaining)),
                                Side::Lay => unmatched_lays.push((price, size_remaining)),
                            }
                        }
                    }
                }
                OrderType::LimitOnClose(_) | OrderType::MarketOnClose(_) => {
                    let liability = order.order_type().liability().unwrap_or_default();
                    match order.side() {
                        Side::Back => sp_lose_liability -= liability,
                        Side::Lay => sp_win_liability -= liability,
                    }
                }
            }
        }

        Exposures::new(
            calculate_matched_exposure(&matched_backs, &matched_lays),
            calculate_unmatched_exposure(&unmatched_backs, &unmatched_lays),
            sp_win_liability,
            sp_lose_liability,
        )
    }

    /// Complete the trade if it is live and every order is complete.
    ///
    /// Returns true when the trade transitioned to complete.
    pub(crate) fn check_trade_complete(&mut self, trade_id: &TradeId) -> bool {
        let Some(trade) = self.trades.get(trade_id) else {
            return false;
        };
        if trade.status() != TradeStatus::Live {
            return false;
        }
        let all_complete = trade
            .all_orders()
            .all(|id| self.orders.get(id).is_some_and(Order::is_complete));
        if !all_complete {
            return false;
        }
        self.trades
            .get_mut(trade_id)
            .is_some_and(Trade::complete_trade)
    }

    /// Attach settlement data to every order once the market has closed.
    pub fn process_closed_market(&mut self, market_book: &MarketBook, context: &Map<String, Value>) {
        let number_of_winners = market_book.number_of_winners();
        let winner_count = market_book.winner_count();
        let line_range_result = context.get(LINE_RANGE_RESULT_KEY).and_then(decimal_from_value);

        for order in self.orders.values_mut() {
            let Some(runner) = market_book
                .runners
                .iter()
                .find(|r| r.selection_id == order.selection().selection_id)
            else {
                continue;
            };
            let mut settlement = Settlement {
                runner_status: Some(runner.status),
                market_type: Some(market_book.market_definition.market_type.clone()),
                each_way_divisor: market_book.market_definition.each_way_divisor,
                number_of_winners,
                dead_heat_winners: (winner_count > number_of_winners).then_some(winner_count),
                line_range_result: None,
            };
            if order.order_type().is_line_range() {
                match line_range_result {
                    Some(result) => settlement.line_range_result = Some(result),
                    None if order.simulated() => warn!(
                        market_id = %self.market_id,
                        order_id = %order.id(),
                        "line_range_result unavailable, set market context line_range_result for simulated settlement"
                    ),
                    None => {}
                }
            }
            order.settle(settlement);
        }
    }

    /// Attach cleared orders to their local orders.
    ///
    /// Returns the number of orders in the blotter.
    pub fn process_cleared_orders(&mut self, cleared_orders: &ClearedOrders) -> usize {
        for cleared_order in &cleared_orders.orders {
            let Some(order_id) = cleared_order.order_id() else {
                debug!(bet_id = %cleared_order.bet_id, "Cleared order without customer reference");
                continue;
            };
            if let Some(order) = self.orders.get_mut(&order_id) {
                order.set_cleared_order(cleared_order.clone());
            }
        }
        self.orders.len()
    }
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurrentOrderStatus, MarketOnCloseOrder, PriceLadder, RunnerStatus};
    use crate::testkit::domain::{
        current_order_for, limit_order, market_book, order_for, runner,
    };
    use rust_decimal_macros::dec;

    fn strategy() -> StrategyName {
        StrategyName::from("test")
    }

    fn blotter_with(orders: Vec<Order>) -> Blotter {
        let mut blotter = Blotter::new(MarketId::from("1.23"));
        for order in orders {
            blotter.insert(order).unwrap();
        }
        blotter
    }

    fn executable(mut order: Order) -> Order {
        order.executable();
        order
    }

    #[test]
    fn insert_indexes_order_and_activates() {
        let order = order_for("1.23", 123, Side::Back, limit_order(dec!(2.0), dec!(2)));
        let id = order.id().clone();
        let mut blotter = Blotter::new(MarketId::from("1.23"));
        assert!(!blotter.is_active());
        blotter.insert(order).unwrap();

        assert!(blotter.is_active());
        assert!(blotter.contains(&id));
        assert_eq!(blotter.len(), 1);
        assert_eq!(blotter.live_order_ids(), &[id.clone()]);
        assert_eq!(blotter.strategy_orders(&strategy(), None, false).len(), 1);
        assert_eq!(
            blotter
                .strategy_selection_orders(&strategy(), SelectionKey::new(123), None, false)
                .len(),
            1
        );
        assert!(blotter
            .strategy_selection_orders(&strategy(), SelectionKey::new(999), None, false)
            .is_empty());
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let order = order_for("1.23", 123, Side::Back, limit_order(dec!(2.0), dec!(2)));
        let mut blotter = blotter_with(vec![order.clone()]);
        let err = blotter.insert(order).unwrap_err();
        assert!(matches!(err, OrderError::DuplicateOrder { .. }));
        assert_eq!(blotter.len(), 1);
    }

    #[test]
    fn complete_order_is_idempotent() {
        let order = order_for("1.23", 123, Side::Back, limit_order(dec!(2.0), dec!(2)));
        let id = order.id().clone();
        let mut blotter = blotter_with(vec![order]);

        assert!(blotter.complete_order(&id));
        assert_eq!(blotter.live_order_ids().len(), 0);
        assert!(!blotter.complete_order(&id));
        assert_eq!(blotter.live_order_ids().len(), 0);
        assert!(blotter.contains(&id));
        assert!(blotter.is_active());
    }

    #[test]
    fn status_and_matched_filters() {
        let pending = order_for("1.23", 123, Side::Back, limit_order(dec!(2.0), dec!(2)));
        let mut matched = executable(order_for("1.23", 123, Side::Back, limit_order(dec!(2.0), dec!(2))));
        let mut current = current_order_for(&matched, "2", CurrentOrderStatus::Executable);
        current.size_matched = dec!(1);
        matched.update_current_order(current);
        let blotter = blotter_with(vec![pending, matched]);

        let executable_only =
            blotter.strategy_orders(&strategy(), Some(&[OrderStatus::Executable]), false);
        assert_eq!(executable_only.len(), 1);
        assert_eq!(blotter.strategy_orders(&strategy(), None, true).len(), 1);
    }

    #[test]
    fn bet_id_lookup() {
        let order = order_for("1.23", 123, Side::Back, limit_order(dec!(2.0), dec!(2)));
        let id = order.id().clone();
        let mut blotter = blotter_with(vec![order]);
        assert!(blotter.get_order_by_bet_id(&BetId::from("1")).is_none());
        blotter.set_bet_id(&id, BetId::from("1"));
        assert_eq!(blotter.get_order_by_bet_id(&BetId::from("1")).unwrap().id(), &id);
    }

    #[test]
    fn unmatched_back_exposure() {
        let order = executable(order_for("1.23", 123, Side::Back, limit_order(dec!(2.0), dec!(9.0))));
        let blotter = blotter_with(vec![order]);
        let exposures = blotter.get_exposures(&strategy(), SelectionKey::new(123), None);
        assert_eq!(exposures.worst_possible_profit_on_lose, dec!(-9.00));
        assert_eq!(exposures.worst_possible_profit_on_win, dec!(0));
        assert_eq!(exposures.matched_profit_if_win, dec!(0));
    }

    #[test]
    fn pending_orders_carry_no_exposure() {
        let order = order_for("1.23", 123, Side::Back, limit_order(dec!(2.0), dec!(9.0)));
        let blotter = blotter_with(vec![order]);
        let exposures = blotter.get_exposures(&strategy(), SelectionKey::new(123), None);
        assert_eq!(exposures, Exposures::default());
    }

    #[test]
    fn exclusion_skips_order() {
        let order = executable(order_for("1.23", 123, Side::Lay, limit_order(dec!(3.0), dec!(4))));
        let id = order.id().clone();
        let blotter = blotter_with(vec![order]);
        let with = blotter.get_exposures(&strategy(), SelectionKey::new(123), None);
        assert_eq!(with.worst_possible_profit_on_win, dec!(-8.00));
        let without = blotter.get_exposures(&strategy(), SelectionKey::new(123), Some(&id));
        assert_eq!(without.worst_possible_profit_on_win, dec!(0));
    }

    #[test]
    fn matched_and_unmatched_exposure() {
        let mut order = executable(order_for("1.23", 123, Side::Back, limit_order(dec!(3.0), dec!(10))));
        let mut current = current_order_for(&order, "1", CurrentOrderStatus::Executable);
        current.size_matched = dec!(4);
        current.size_remaining = dec!(6);
        current.average_price_matched = dec!(3.0);
        order.update_current_order(current);
        let blotter = blotter_with(vec![order]);

        let exposures = blotter.get_exposures(&strategy(), SelectionKey::new(123), None);
        assert_eq!(exposures.matched_profit_if_win, dec!(8.00));
        assert_eq!(exposures.matched_profit_if_lose, dec!(-4.00));
        assert_eq!(exposures.worst_potential_unmatched_profit_if_lose, dec!(-6.00));
        assert_eq!(exposures.worst_possible_profit_on_lose, dec!(-10.00));
        assert_eq!(exposures.worst_possible_profit_on_win, dec!(8.00));
    }

    #[test]
    fn line_range_valued_at_two() {
        let order_type = OrderType::Limit(
            crate::domain::LimitOrder::new(dec!(150.5), dec!(5)).with_price_ladder(PriceLadder::LineRange),
        );
        let order = executable(order_for("1.23", 123, Side::Lay, order_type));
        let blotter = blotter_with(vec![order]);
        let exposures = blotter.get_exposures(&strategy(), SelectionKey::new(123), None);
        assert_eq!(exposures.worst_possible_profit_on_win, dec!(-5.00));
    }

    #[test]
    fn sp_liability_reduces_profit() {
        let back = executable(order_for(
            "1.23",
            123,
            Side::Back,
            OrderType::from(MarketOnCloseOrder { liability: dec!(5) }),
        ));
        let lay = executable(order_for(
            "1.23",
            123,
            Side::Lay,
            OrderType::from(MarketOnCloseOrder { liability: dec!(7) }),
        ));
        let blotter = blotter_with(vec![back, lay]);
        let exposures = blotter.get_exposures(&strategy(), SelectionKey::new(123), None);
        assert_eq!(exposures.worst_possible_profit_on_lose, dec!(-5));
        assert_eq!(exposures.worst_possible_profit_on_win, dec!(-7));
    }

    #[test]
    fn closed_market_attaches_settlement() {
        let order = order_for("1.23", 1, Side::Back, limit_order(dec!(2.0), dec!(2)));
        let id = order.id().clone();
        let mut blotter = blotter_with(vec![order]);
        let mut book = market_book("1.23", vec![runner(1, RunnerStatus::Winner), runner(2, RunnerStatus::Winner)]);
        book.market_definition.market_type = "PLACE".into();

        blotter.process_closed_market(&book, &Map::new());

        let settlement = blotter.get(&id).unwrap().settlement();
        assert_eq!(settlement.runner_status, Some(RunnerStatus::Winner));
        assert_eq!(settlement.market_type.as_deref(), Some("PLACE"));
        assert_eq!(settlement.dead_heat_winners, Some(2));
    }

    #[test]
    fn closed_market_reads_line_range_result() {
        let order_type = OrderType::Limit(
            crate::domain::LimitOrder::new(dec!(150.5), dec!(5)).with_price_ladder(PriceLadder::LineRange),
        );
        let order = order_for("1.23", 1, Side::Back, order_type);
        let id = order.id().clone();
        let mut blotter = blotter_with(vec![order]);
        let book = market_book("1.23", vec![runner(1, RunnerStatus::Winner)]);
        let mut context = Map::new();
        context.insert(LINE_RANGE_RESULT_KEY.into(), Value::from("148.5"));

        blotter.process_closed_market(&book, &context);

        let settlement = blotter.get(&id).unwrap().settlement();
        assert_eq!(settlement.line_range_result, Some(dec!(148.5)));
        assert_eq!(settlement.dead_heat_winners, None);
    }
}
