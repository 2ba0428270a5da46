//! Markets and their order ledgers.
//!
//! - [`Market`] - latest book, catalogue, blotter and runner contexts for one market
//! - [`Blotter`] - per-market order ledger with exposure accounting
//! - [`Markets`] - registry of every market the engine has seen

mod blotter;
mod registry;

pub use blotter::{Blotter, LINE_RANGE_RESULT_KEY};
pub use registry::Markets;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::domain::{
    ClearedMarket, ClientId, MarketBook, MarketCatalogue, MarketId, RunnerContext, SelectionKey,
    StrategyName,
};

/// One exchange market and everything the engine tracks about it.
#[derive(Debug)]
pub struct Market {
    market_id: MarketId,
    market_book: MarketBook,
    market_catalogue: Option<MarketCatalogue>,
    closed: bool,
    date_time_closed: Option<DateTime<Utc>>,
    date_time_created: DateTime<Utc>,
    blotter: Blotter,
    context: Map<String, Value>,
    runner_contexts: HashMap<(StrategyName, SelectionKey), RunnerContext>,
}

impl Market {
    /// Create a market from its first book.
    #[must_use]
    pub fn new(market_book: MarketBook) -> Self {
        let market_id = market_book.market_id.clone();
        Self {
            blotter: Blotter::new(market_id.clone()),
            market_id,
            market_book,
            market_catalogue: None,
            closed: false,
            date_time_closed: None,
            date_time_created: Utc::now(),
            context: Map::new(),
            runner_contexts: HashMap::new(),
        }
    }

    #[must_use]
    pub fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    #[must_use]
    pub fn market_book(&self) -> &MarketBook {
        &self.market_book
    }

    #[must_use]
    pub fn market_catalogue(&self) -> Option<&MarketCatalogue> {
        self.market_catalogue.as_ref()
    }

    #[must_use]
    pub fn closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn date_time_closed(&self) -> Option<DateTime<Utc>> {
        self.date_time_closed
    }

    #[must_use]
    pub fn date_time_created(&self) -> DateTime<Utc> {
        self.date_time_created
    }

    #[must_use]
    pub fn blotter(&self) -> &Blotter {
        &self.blotter
    }

    pub fn blotter_mut(&mut self) -> &mut Blotter {
        &mut self.blotter
    }

    /// Side-channel data supplied by strategies, e.g. settlement overrides.
    #[must_use]
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.context
    }

    /// Apply a new book snapshot.
    pub fn apply_book(&mut self, market_book: MarketBook) {
        self.market_book = market_book;
    }

    pub fn set_market_catalogue(&mut self, market_catalogue: MarketCatalogue) {
        let created = self.market_catalogue.is_none();
        self.market_catalogue = Some(market_catalogue);
        if created {
            debug!(market_id = %self.market_id, "Created marketCatalogue");
        } else {
            debug!(market_id = %self.market_id, "Updated marketCatalogue");
        }
    }

    /// Mark the market closed now.
    pub fn close_market(&mut self) {
        self.close_market_at(Utc::now());
    }

    /// Mark the market closed at `at`.
    pub fn close_market_at(&mut self, at: DateTime<Utc>) {
        self.closed = true;
        self.date_time_closed = Some(at);
        info!(market_id = %self.market_id, "Market closed");
    }

    /// Re-open a market that reappeared after closing.
    pub fn open_market(&mut self) {
        self.closed = false;
        self.date_time_closed = None;
        info!(market_id = %self.market_id, "Market re-opened");
    }

    /// Seconds since the market closed.
    #[must_use]
    pub fn elapsed_seconds_closed(&self) -> Option<f64> {
        self.date_time_closed
            .map(|closed| (Utc::now() - closed).num_milliseconds() as f64 / 1000.0)
    }

    /// Attach settlement data from the final book to every order.
    pub fn process_closed_market(&mut self, market_book: &MarketBook) {
        self.blotter.process_closed_market(market_book, &self.context);
    }

    #[must_use]
    pub fn runner_context(
        &self,
        strategy: &StrategyName,
        selection: SelectionKey,
    ) -> Option<&RunnerContext> {
        self.runner_contexts.get(&(strategy.clone(), selection))
    }

    /// Runner context for a strategy selection, created on first use.
    pub fn runner_context_mut(
        &mut self,
        strategy: &StrategyName,
        selection: SelectionKey,
    ) -> &mut RunnerContext {
        self.runner_contexts
            .entry((strategy.clone(), selection))
            .or_insert_with(|| RunnerContext::new(selection))
    }

    /// Drop every runner context held for this market.
    pub fn clear_runner_contexts(&mut self) {
        self.runner_contexts.clear();
    }

    /// Settlement summary for one client, used for simulated clearing.
    #[must_use]
    pub fn cleared(&self, client_id: &ClientId) -> ClearedMarket {
        let orders = self.blotter.client_orders(client_id, None, true);
        let profit: Decimal = orders.iter().map(|o| o.profit()).sum();
        ClearedMarket {
            market_id: self.market_id.clone(),
            profit,
            bet_count: orders.len() as u32,
            commission: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::domain::{CurrentOrderStatus, RunnerStatus, Side, TradeId};
    use crate::testkit::domain::{current_order_for, limit_order, market_book, order_for, runner};
    use rust_decimal_macros::dec;

    #[test]
    fn new_market_is_open() {
        let market = Market::new(market_book("1.23", vec![runner(1, RunnerStatus::Active)]));
        assert_eq!(market.market_id().as_str(), "1.23");
        assert!(!market.closed());
        assert!(market.elapsed_seconds_closed().is_none());
        assert!(!market.blotter().is_active());
    }

    #[test]
    fn close_and_reopen() {
        let mut market = Market::new(market_book("1.23", vec![]));
        market.close_market_at(Utc::now() - Duration::seconds(25));
        assert!(market.closed());
        let elapsed = market.elapsed_seconds_closed().unwrap();
        assert!((24.0..=26.0).contains(&elapsed));

        market.open_market();
        assert!(!market.closed());
        assert!(market.date_time_closed().is_none());
    }

    #[test]
    fn runner_context_created_on_demand() {
        let mut market = Market::new(market_book("1.23", vec![]));
        let strategy = StrategyName::from("test");
        assert!(market.runner_context(&strategy, SelectionKey::new(1)).is_none());
        market
            .runner_context_mut(&strategy, SelectionKey::new(1))
            .place(&TradeId::new());
        assert_eq!(
            market
                .runner_context(&strategy, SelectionKey::new(1))
                .unwrap()
                .live_trade_count(),
            1
        );
        market.clear_runner_contexts();
        assert!(market.runner_context(&strategy, SelectionKey::new(1)).is_none());
    }

    #[test]
    fn cleared_sums_client_profit() {
        let mut market = Market::new(market_book("1.23", vec![runner(1, RunnerStatus::Winner)]));
        let client = ClientId::from("sim");
        let mut order = order_for("1.23", 1, Side::Back, limit_order(dec!(3.0), dec!(2)));
        order.set_client(client.clone(), true);
        let mut current = current_order_for(&order, "1", CurrentOrderStatus::ExecutionComplete);
        current.size_matched = dec!(2);
        current.average_price_matched = dec!(3.0);
        order.update_current_order(current);
        market.blotter_mut().insert(order).unwrap();

        let book = market.market_book().clone();
        market.process_closed_market(&book);
        let cleared = market.cleared(&client);
        assert_eq!(cleared.profit, dec!(4.00));
        assert_eq!(cleared.bet_count, 1);
        assert_eq!(market.cleared(&ClientId::from("other")).bet_count, 0);
    }
}
