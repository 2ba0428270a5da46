//! The event loop.
//!
//! The [`Engine`] owns every market, strategy and client and is the single
//! consumer of the event queue. Events are handled one at a time, in queue
//! order:
//!
//! - `MARKET_BOOK` - create or update markets, run middleware and strategies
//! - `MARKET_CATALOGUE` - attach catalogue metadata to known markets
//! - `CURRENT_ORDERS` - reconcile orders, then run `process_orders`
//! - `CLOSE_MARKET` - settle and close a market
//! - `CLEARED_ORDERS` / `CLEARED_MARKETS` - attach settlement results
//! - `TERMINATOR` - stop

pub mod event;
mod handler;
mod middleware;
mod process;

pub use event::{channel, Event, EventReceiver, EventSender, QueuedEvent};
pub use middleware::Middleware;

use tracing::{debug, error, info};

use crate::config::{Config, EngineConfig, ExecutionConfig};
use crate::control::{StrategyExposure, TradingControl};
use crate::error::{ExecutionError, Result};
use crate::execution::{Client, Clients};
use crate::market::Markets;
use crate::strategy::dispatch::call_strategy;
use crate::strategy::{Strategies, Strategy};
use handler::Dispatcher;

/// Single-threaded event dispatcher.
pub struct Engine {
    config: EngineConfig,
    execution: ExecutionConfig,
    markets: Markets,
    strategies: Strategies,
    clients: Clients,
    controls: Vec<Box<dyn TradingControl>>,
    middleware: Vec<Box<dyn Middleware>>,
    sender: EventSender,
    receiver: EventReceiver,
}

impl Engine {
    /// Create an engine with the default [`StrategyExposure`] control.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let (sender, receiver) = channel(config.engine.queue_capacity);
        Self {
            config: config.engine.clone(),
            execution: config.execution.clone(),
            markets: Markets::new(),
            strategies: Strategies::new(),
            clients: Clients::new(),
            controls: vec![Box::new(StrategyExposure::new())],
            middleware: Vec::new(),
            sender,
            receiver,
        }
    }

    /// A handle for producers to enqueue events.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Register a client. The first client is the default for transactions.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::DuplicateClient`] if the id is taken.
    pub fn add_client(&mut self, client: Client) -> Result<()> {
        self.clients.add_client(client)?;
        Ok(())
    }

    /// Register a strategy.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::DuplicateStrategy`] if the name is taken.
    pub fn add_strategy(&mut self, strategy: Box<dyn Strategy>) -> Result<()> {
        self.strategies.register(strategy)
    }

    /// Add a control run for every client.
    pub fn add_control(&mut self, control: Box<dyn TradingControl>) {
        info!(control = control.name(), "Adding trading control");
        self.controls.push(control);
    }

    pub fn add_middleware(&mut self, middleware: Box<dyn Middleware>) {
        info!(middleware = middleware.name(), "Adding market middleware");
        self.middleware.push(middleware);
    }

    #[must_use]
    pub fn markets(&self) -> &Markets {
        &self.markets
    }

    pub fn markets_mut(&mut self) -> &mut Markets {
        &mut self.markets
    }

    #[must_use]
    pub fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    #[must_use]
    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// True if the engine config or any client is simulated.
    #[must_use]
    pub fn simulated(&self) -> bool {
        self.config.simulated || self.clients.simulated()
    }

    /// Drain the queue until a terminator arrives.
    ///
    /// Strategies are started first and finished last.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::NoClients`] if no client is registered, or
    /// the first unexpected callback failure when `raise_errors` is set.
    pub async fn run(&mut self) -> Result<()> {
        if self.clients.is_empty() {
            return Err(ExecutionError::NoClients.into());
        }
        info!(
            strategies = self.strategies.len(),
            clients = self.clients.len(),
            simulated = self.simulated(),
            "Starting engine"
        );
        self.start()?;

        while let Some(queued) = self.receiver.recv().await {
            debug!(event = %queued.event, waited_ms = queued.elapsed().as_millis() as u64, "Event received");
            if !self.process(queued.event)? {
                break;
            }
        }

        self.finish()?;
        info!(
            markets = self.markets.len(),
            open_markets = self.markets.open_market_ids().len(),
            "Engine stopped"
        );
        Ok(())
    }

    /// Handle events already in the queue without waiting.
    ///
    /// Returns the number handled, stopping at a terminator.
    ///
    /// # Errors
    ///
    /// Returns the first unexpected callback failure when `raise_errors` is set.
    pub fn process_pending(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Some(queued) = self.receiver.try_recv() {
            handled += 1;
            if !self.process(queued.event)? {
                break;
            }
        }
        Ok(handled)
    }

    /// Handle one event. Returns false for the terminator.
    ///
    /// # Errors
    ///
    /// Returns the first unexpected callback failure when `raise_errors` is set.
    pub fn process(&mut self, event: Event) -> Result<bool> {
        let dispatcher = Dispatcher {
            strategies: &self.strategies,
            clients: &self.clients,
            controls: &self.controls,
            execution: &self.execution,
            raise_errors: self.config.raise_errors,
        };
        match event {
            Event::MarketBook(market_books) => {
                let inline_closes = handler::handle_market_books(
                    market_books,
                    &mut self.markets,
                    &dispatcher,
                    &self.middleware,
                    &self.config,
                    &self.sender,
                )?;
                for market_book in inline_closes {
                    handler::handle_close_market(
                        market_book,
                        &mut self.markets,
                        &dispatcher,
                        &self.config,
                    )?;
                }
            }
            Event::MarketCatalogue(catalogues) => {
                handler::handle_market_catalogues(catalogues, &mut self.markets);
            }
            Event::CurrentOrders(batches) => {
                process::handle_current_orders(batches, &mut self.markets, &dispatcher)?;
            }
            Event::CloseMarket(market_book) => {
                handler::handle_close_market(
                    market_book,
                    &mut self.markets,
                    &dispatcher,
                    &self.config,
                )?;
            }
            Event::ClearedOrders(cleared_orders) => {
                handler::handle_cleared_orders(&cleared_orders, &mut self.markets);
            }
            Event::ClearedMarkets(cleared_markets) => {
                handler::handle_cleared_markets(&cleared_markets);
            }
            Event::RawData(_) => {
                error!(event = "RAW_DATA", "Unknown item in handler queue");
            }
            Event::Terminator => return Ok(false),
        }
        Ok(true)
    }

    /// Remove markets closed for longer than the retention window.
    ///
    /// Returns the number of markets removed.
    pub fn evict_closed_markets(&mut self) -> usize {
        handler::evict_closed_markets(&mut self.markets, self.config.closed_market_retention_secs)
    }

    fn start(&self) -> Result<()> {
        for strategy in self.strategies.iter() {
            call_strategy("start", strategy.name().as_str(), "", self.config.raise_errors, || {
                strategy.start()
            })?;
        }
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        for strategy in self.strategies.iter() {
            call_strategy("finish", strategy.name().as_str(), "", self.config.raise_errors, || {
                strategy.finish()
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("markets", &self.markets.len())
            .field("strategies", &self.strategies.len())
            .field("clients", &self.clients)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn run_requires_a_client() {
        let mut engine = Engine::new(&Config::default());
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, Error::Execution(ExecutionError::NoClients)));
    }

    #[test]
    fn raw_data_is_ignored() {
        let mut engine = Engine::new(&Config::default());
        assert!(engine.process(Event::RawData(serde_json::Value::Null)).unwrap());
        assert!(!engine.process(Event::Terminator).unwrap());
    }
}
