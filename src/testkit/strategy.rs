//! Strategy that records how often each callback ran.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::domain::{MarketBook, OrderId};
use crate::error::StrategyError;
use crate::market::Market;
use crate::strategy::{Strategy, StrategyContext, StrategySettings};

type BookAction =
    Box<dyn Fn(&mut StrategyContext<'_>, &MarketBook) -> Result<(), StrategyError> + Send + Sync>;
type OrdersAction =
    Box<dyn Fn(&mut StrategyContext<'_>, &[OrderId]) -> Result<(), StrategyError> + Send + Sync>;

/// Callback counters, readable after the strategy moves into the engine.
#[derive(Debug, Default)]
pub struct CallCounts {
    start: AtomicUsize,
    new_market: AtomicUsize,
    check_market_book: AtomicUsize,
    market_book: AtomicUsize,
    orders: AtomicUsize,
    closed_market: AtomicUsize,
    finish: AtomicUsize,
}

impl CallCounts {
    pub fn start(&self) -> usize {
        self.start.load(Ordering::SeqCst)
    }

    pub fn new_market(&self) -> usize {
        self.new_market.load(Ordering::SeqCst)
    }

    pub fn check_market_book(&self) -> usize {
        self.check_market_book.load(Ordering::SeqCst)
    }

    pub fn market_book(&self) -> usize {
        self.market_book.load(Ordering::SeqCst)
    }

    pub fn orders(&self) -> usize {
        self.orders.load(Ordering::SeqCst)
    }

    pub fn closed_market(&self) -> usize {
        self.closed_market.load(Ordering::SeqCst)
    }

    pub fn finish(&self) -> usize {
        self.finish.load(Ordering::SeqCst)
    }
}

/// A strategy whose `check_market_book` returns a fixed answer and whose
/// trading callbacks run optional closures.
pub struct RecordingStrategy {
    settings: StrategySettings,
    calls: Arc<CallCounts>,
    check: bool,
    on_market_book: Option<BookAction>,
    on_orders: Option<OrdersAction>,
}

impl RecordingStrategy {
    /// A strategy that accepts every book.
    pub fn new(name: &str) -> Self {
        Self {
            settings: StrategySettings::new(name),
            calls: Arc::new(CallCounts::default()),
            check: true,
            on_market_book: None,
            on_orders: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: StrategySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Fix the answer of `check_market_book`.
    #[must_use]
    pub fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    #[must_use]
    pub fn on_market_book(
        mut self,
        action: impl Fn(&mut StrategyContext<'_>, &MarketBook) -> Result<(), StrategyError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.on_market_book = Some(Box::new(action));
        self
    }

    #[must_use]
    pub fn on_orders(
        mut self,
        action: impl Fn(&mut StrategyContext<'_>, &[OrderId]) -> Result<(), StrategyError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.on_orders = Some(Box::new(action));
        self
    }

    /// Shared handle to the counters.
    pub fn calls(&self) -> Arc<CallCounts> {
        Arc::clone(&self.calls)
    }
}

impl Strategy for RecordingStrategy {
    fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    fn start(&self) -> Result<(), StrategyError> {
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn process_new_market(
        &self,
        _ctx: &mut StrategyContext<'_>,
        _market_book: &MarketBook,
    ) -> Result<(), StrategyError> {
        self.calls.new_market.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn check_market_book(
        &self,
        _market: &Market,
        _market_book: &MarketBook,
    ) -> Result<bool, StrategyError> {
        self.calls.check_market_book.fetch_add(1, Ordering::SeqCst);
        Ok(self.check)
    }

    fn process_market_book(
        &self,
        ctx: &mut StrategyContext<'_>,
        market_book: &MarketBook,
    ) -> Result<(), StrategyError> {
        self.calls.market_book.fetch_add(1, Ordering::SeqCst);
        match &self.on_market_book {
            Some(action) => action(ctx, market_book),
            None => Ok(()),
        }
    }

    fn process_orders(
        &self,
        ctx: &mut StrategyContext<'_>,
        orders: &[OrderId],
    ) -> Result<(), StrategyError> {
        self.calls.orders.fetch_add(1, Ordering::SeqCst);
        match &self.on_orders {
            Some(action) => action(ctx, orders),
            None => Ok(()),
        }
    }

    fn process_closed_market(
        &self,
        _market: &Market,
        _market_book: &MarketBook,
    ) -> Result<(), StrategyError> {
        self.calls.closed_market.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn finish(&self) -> Result<(), StrategyError> {
        self.calls.finish.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
