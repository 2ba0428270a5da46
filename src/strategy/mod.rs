//! Strategy abstraction and dispatch.
//!
//! Each strategy implements the [`Strategy`] trait, which defines the fixed
//! callback set the engine drives:
//! - `start()` / `finish()` - run once around the event loop
//! - `process_new_market()` - first sighting of a market
//! - `check_market_book()` - gate for `process_market_book()`
//! - `process_market_book()` - react to a book update
//! - `process_orders()` - react to reconciled order state
//! - `process_closed_market()` - final book of a closed market
//! - `validate_order()` - cool-down checks run by the exposure control
//!
//! Callbacks run inline on the dispatcher and must not block. Errors and
//! panics are isolated per callback by the engine.
//!
//! The [`Strategies`] registry holds every registered strategy.

mod context;
pub(crate) mod dispatch;

pub use context::StrategyContext;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{MarketBook, Order, OrderId, RunnerContext, StrategyName, Trade};
use crate::error::{Error, Result, StrategyError};
use crate::market::Market;

/// Risk and subscription settings shared by every strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySettings {
    pub name: StrategyName,
    /// Streams the strategy listens to. Empty means every stream.
    pub stream_ids: Vec<u64>,
    pub max_selection_exposure: Decimal,
    pub max_order_exposure: Decimal,
    /// Live trades allowed per runner context.
    pub max_live_trade_count: usize,
    /// Allow further orders on a trade that is already live.
    pub multi_order_trades: bool,
}

impl StrategySettings {
    /// Settings with default limits: 100 per selection, 10 per order, one live trade.
    pub fn new(name: impl Into<StrategyName>) -> Self {
        Self {
            name: name.into(),
            stream_ids: Vec::new(),
            max_selection_exposure: dec!(100),
            max_order_exposure: dec!(10),
            max_live_trade_count: 1,
            multi_order_trades: false,
        }
    }

    #[must_use]
    pub fn with_stream_ids(mut self, stream_ids: Vec<u64>) -> Self {
        self.stream_ids = stream_ids;
        self
    }

    #[must_use]
    pub fn with_max_selection_exposure(mut self, limit: Decimal) -> Self {
        self.max_selection_exposure = limit;
        self
    }

    #[must_use]
    pub fn with_max_order_exposure(mut self, limit: Decimal) -> Self {
        self.max_order_exposure = limit;
        self
    }

    #[must_use]
    pub fn with_max_live_trade_count(mut self, count: usize) -> Self {
        self.max_live_trade_count = count;
        self
    }

    #[must_use]
    pub fn with_multi_order_trades(mut self, enabled: bool) -> Self {
        self.multi_order_trades = enabled;
        self
    }

    /// Whether a book from `stream_id` should reach this strategy.
    #[must_use]
    pub fn subscribed(&self, stream_id: Option<u64>) -> bool {
        self.stream_ids.is_empty() || stream_id.is_some_and(|id| self.stream_ids.contains(&id))
    }
}

/// A trading strategy driven by the engine.
///
/// Strategies are shared with the engine for the whole run, so callbacks take
/// `&self`; keep mutable state behind a lock or atomics.
pub trait Strategy: Send + Sync {
    fn settings(&self) -> &StrategySettings;

    fn name(&self) -> &StrategyName {
        &self.settings().name
    }

    fn start(&self) -> std::result::Result<(), StrategyError> {
        Ok(())
    }

    /// Called once, the first time a subscribed market is seen.
    fn process_new_market(
        &self,
        _ctx: &mut StrategyContext<'_>,
        _market_book: &MarketBook,
    ) -> std::result::Result<(), StrategyError> {
        Ok(())
    }

    /// Return true to have `process_market_book` called for this update.
    fn check_market_book(
        &self,
        _market: &Market,
        _market_book: &MarketBook,
    ) -> std::result::Result<bool, StrategyError> {
        Ok(false)
    }

    fn process_market_book(
        &self,
        _ctx: &mut StrategyContext<'_>,
        _market_book: &MarketBook,
    ) -> std::result::Result<(), StrategyError> {
        Ok(())
    }

    /// Called after reconciliation with the strategy's live orders in the market.
    fn process_orders(
        &self,
        _ctx: &mut StrategyContext<'_>,
        _orders: &[OrderId],
    ) -> std::result::Result<(), StrategyError> {
        Ok(())
    }

    fn process_closed_market(
        &self,
        _market: &Market,
        _market_book: &MarketBook,
    ) -> std::result::Result<(), StrategyError> {
        Ok(())
    }

    /// Accept or reject a new order; `Err` carries the violation message.
    fn validate_order(
        &self,
        runner_context: &RunnerContext,
        order: &Order,
        trade: &Trade,
    ) -> std::result::Result<(), String> {
        validate_runner_context(self.settings(), runner_context, order, trade)
    }

    fn finish(&self) -> std::result::Result<(), StrategyError> {
        Ok(())
    }
}

/// Default order validation against the runner context.
///
/// An order for a trade that is already live passes when multi-order trades
/// are enabled. Otherwise the reset and placement cool-downs and the live
/// trade count are checked.
pub fn validate_runner_context(
    settings: &StrategySettings,
    runner_context: &RunnerContext,
    order: &Order,
    trade: &Trade,
) -> std::result::Result<(), String> {
    if settings.multi_order_trades && runner_context.live_trades().contains(order.trade_id()) {
        return Ok(());
    }
    if let Some(elapsed) = runner_context.reset_elapsed_seconds() {
        if elapsed < trade.reset_seconds() {
            return Err(format!(
                "strategy.validate_order failed: reset_elapsed_seconds ({elapsed}) < reset_seconds ({})",
                trade.reset_seconds()
            ));
        }
    }
    if let Some(elapsed) = runner_context.placed_elapsed_seconds() {
        if elapsed < trade.place_reset_seconds() {
            return Err(format!(
                "strategy.validate_order failed: placed_elapsed_seconds ({elapsed}) < place_reset_seconds ({})",
                trade.place_reset_seconds()
            ));
        }
    }
    if runner_context.live_trade_count() >= settings.max_live_trade_count {
        return Err(format!(
            "strategy.validate_order failed: live_trade_count ({}) >= max_live_trade_count ({})",
            runner_context.live_trade_count(),
            settings.max_live_trade_count
        ));
    }
    Ok(())
}

/// Registry of strategies, run in registration order.
#[derive(Default)]
pub struct Strategies {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Strategies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateStrategy`] if the name is taken.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) -> Result<()> {
        if self.get(strategy.name()).is_some() {
            return Err(Error::DuplicateStrategy {
                name: strategy.name().to_string(),
            });
        }
        tracing::info!(strategy = %strategy.name(), "Adding strategy");
        self.strategies.push(strategy);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &StrategyName) -> Option<&dyn Strategy> {
        self.strategies
            .iter()
            .find(|s| s.name() == name)
            .map(|s| &**s)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Strategy> {
        self.strategies.iter().map(|s| &**s)
    }

    /// Strategies subscribed to `stream_id`.
    pub fn subscribed(&self, stream_id: Option<u64>) -> impl Iterator<Item = &dyn Strategy> {
        self.iter()
            .filter(move |s| s.settings().subscribed(stream_id))
    }

    /// Name hash to strategy name, for decoding customer order references.
    #[must_use]
    pub fn hashes(&self) -> Vec<(String, StrategyName)> {
        self.strategies
            .iter()
            .map(|s| (s.name().name_hash(), s.name().clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketId, SelectionKey, Side, TradeId};
    use crate::testkit::domain::limit_order;
    use rust_decimal_macros::dec;

    struct MockStrategy {
        settings: StrategySettings,
    }

    impl MockStrategy {
        fn new(name: &str) -> Self {
            Self {
                settings: StrategySettings::new(name),
            }
        }
    }

    impl Strategy for MockStrategy {
        fn settings(&self) -> &StrategySettings {
            &self.settings
        }
    }

    fn trade(reset_seconds: f64, place_reset_seconds: f64) -> Trade {
        Trade::new(MarketId::from("1.23"), SelectionKey::new(1), StrategyName::from("test"))
            .with_reset_seconds(reset_seconds)
            .with_place_reset_seconds(place_reset_seconds)
    }

    #[test]
    fn settings_defaults() {
        let settings = StrategySettings::new("test");
        assert_eq!(settings.max_selection_exposure, dec!(100));
        assert_eq!(settings.max_order_exposure, dec!(10));
        assert!(!settings.multi_order_trades);
        assert!(settings.subscribed(None));
        assert!(settings.subscribed(Some(4)));
    }

    #[test]
    fn subscription_by_stream_id() {
        let settings = StrategySettings::new("test").with_stream_ids(vec![1, 2]);
        assert!(settings.subscribed(Some(2)));
        assert!(!settings.subscribed(Some(3)));
        assert!(!settings.subscribed(None));
    }

    #[test]
    fn registry_rejects_duplicate_names() {
        let mut strategies = Strategies::new();
        assert!(strategies.is_empty());
        strategies.register(Box::new(MockStrategy::new("a"))).unwrap();
        strategies.register(Box::new(MockStrategy::new("b"))).unwrap();
        let err = strategies.register(Box::new(MockStrategy::new("a"))).unwrap_err();
        assert!(matches!(err, Error::DuplicateStrategy { .. }));
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies.hashes().len(), 2);
    }

    #[test]
    fn default_validate_order_accepts_fresh_context() {
        let strategy = MockStrategy::new("test");
        let mut trade = trade(0.0, 0.0);
        let order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(2)));
        let context = RunnerContext::new(SelectionKey::new(1));
        assert!(strategy.validate_order(&context, &order, &trade).is_ok());
    }

    #[test]
    fn default_validate_order_checks_reset_cool_down() {
        let strategy = MockStrategy::new("test");
        let mut trade = trade(60.0, 0.0);
        let order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(2)));
        let mut context = RunnerContext::new(SelectionKey::new(1));
        let previous = TradeId::new();
        context.place(&previous);
        context.reset(&previous);

        let message = strategy.validate_order(&context, &order, &trade).unwrap_err();
        assert!(message.starts_with("strategy.validate_order failed: reset_elapsed_seconds ("));
        assert!(message.ends_with("< reset_seconds (60)"));
    }

    #[test]
    fn default_validate_order_checks_place_cool_down() {
        let strategy = MockStrategy::new("test");
        let mut trade = trade(0.0, 30.0);
        let order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(2)));
        let mut context = RunnerContext::new(SelectionKey::new(1));
        let previous = TradeId::new();
        context.place(&previous);
        context.reset(&previous);

        let message = strategy.validate_order(&context, &order, &trade).unwrap_err();
        assert!(message.contains("placed_elapsed_seconds"));
        assert!(message.ends_with("< place_reset_seconds (30)"));
    }

    #[test]
    fn default_validate_order_limits_live_trades() {
        let strategy = MockStrategy::new("test");
        let mut trade = trade(0.0, 0.0);
        let order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(2)));
        let mut context = RunnerContext::new(SelectionKey::new(1));
        context.place(&TradeId::new());

        let message = strategy.validate_order(&context, &order, &trade).unwrap_err();
        assert_eq!(
            message,
            "strategy.validate_order failed: live_trade_count (1) >= max_live_trade_count (1)"
        );
    }

    #[test]
    fn multi_order_trades_accept_live_trade() {
        let strategy = MockStrategy {
            settings: StrategySettings::new("test").with_multi_order_trades(true),
        };
        let mut trade = trade(60.0, 60.0);
        let order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(2)));
        let mut context = RunnerContext::new(SelectionKey::new(1));
        context.place(trade.id());

        assert!(strategy.validate_order(&context, &order, &trade).is_ok());
    }
}
