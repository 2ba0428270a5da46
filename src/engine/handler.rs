//! Event handlers for market data, market lifecycle and settlement.

use chrono::Utc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use super::event::{Event, EventSender};
use super::middleware::Middleware;
use crate::config::{EngineConfig, ExecutionConfig};
use crate::control::TradingControl;
use crate::domain::{ClearedMarkets, ClearedOrders, MarketBook, MarketCatalogue};
use crate::error::{Result, StrategyError};
use crate::execution::Clients;
use crate::market::{Market, Markets};
use crate::strategy::dispatch::call_strategy;
use crate::strategy::{Strategies, Strategy, StrategyContext};

/// Shared handles for running strategy callbacks.
pub(crate) struct Dispatcher<'a> {
    pub strategies: &'a Strategies,
    pub clients: &'a Clients,
    pub controls: &'a [Box<dyn TradingControl>],
    pub execution: &'a ExecutionConfig,
    pub raise_errors: bool,
}

impl Dispatcher<'_> {
    /// Run a trading callback with a context over `market`.
    pub fn call_with_context(
        &self,
        callback: &'static str,
        strategy: &dyn Strategy,
        market: &mut Market,
        f: impl FnOnce(&mut StrategyContext<'_>) -> std::result::Result<(), StrategyError>,
    ) -> Result<()> {
        let market_id = market.market_id().to_string();
        let mut ctx =
            StrategyContext::new(market, strategy, self.clients, self.controls, self.execution);
        call_strategy(
            callback,
            strategy.name().as_str(),
            &market_id,
            self.raise_errors,
            || f(&mut ctx),
        )?;
        Ok(())
    }

    /// Run a read-only callback.
    pub fn call<T>(
        &self,
        callback: &'static str,
        strategy: &dyn Strategy,
        market: &Market,
        f: impl FnOnce() -> std::result::Result<T, StrategyError>,
    ) -> Result<Option<T>> {
        call_strategy(
            callback,
            strategy.name().as_str(),
            market.market_id().as_str(),
            self.raise_errors,
            f,
        )
    }
}

/// Handle a batch of market books.
///
/// CLOSED books are re-routed as close-market events. Returns the closed
/// books that could not be enqueued, to be closed inline by the caller.
pub(crate) fn handle_market_books(
    market_books: Vec<MarketBook>,
    markets: &mut Markets,
    dispatcher: &Dispatcher<'_>,
    middleware: &[Box<dyn Middleware>],
    config: &EngineConfig,
    sender: &EventSender,
) -> Result<Vec<MarketBook>> {
    let mut inline_closes = Vec::new();

    for market_book in market_books {
        let market_id = market_book.market_id.clone();

        if !market_book.streaming_snap {
            let latency =
                (Utc::now() - market_book.publish_time).num_milliseconds() as f64 / 1000.0;
            if latency > config.max_publish_latency_secs {
                warn!(
                    market_id = %market_id,
                    latency,
                    publish_time = %market_book.publish_time,
                    "High latency between current time and market book publish time"
                );
            }
        }

        let market_is_new = !markets.contains(&market_id);
        if market_is_new {
            markets.add_market(Market::new(market_book.clone()));
        }
        let Some(market) = markets.get_mut(&market_id) else {
            continue;
        };
        if market.closed() && !market_book.is_closed() {
            market.open_market();
        }

        if market_book.is_closed() {
            match sender.try_send(Event::CloseMarket(market_book)) {
                Ok(()) => {}
                Err(TrySendError::Full(Event::CloseMarket(book)))
                | Err(TrySendError::Closed(Event::CloseMarket(book))) => {
                    debug!(market_id = %market_id, "Event queue unavailable, closing market inline");
                    inline_closes.push(book);
                }
                Err(_) => {}
            }
            continue;
        }

        market.apply_book(market_book.clone());

        for m in middleware {
            call_strategy("middleware", m.name(), market_id.as_str(), dispatcher.raise_errors, || {
                m.process(market)
            })?;
        }

        for strategy in dispatcher
            .strategies
            .subscribed(market_book.streaming_unique_id)
        {
            if market_is_new {
                dispatcher.call_with_context("process_new_market", strategy, market, |ctx| {
                    strategy.process_new_market(ctx, &market_book)
                })?;
            }
            let check = dispatcher.call("check_market_book", strategy, market, || {
                strategy.check_market_book(market, &market_book)
            })?;
            if check == Some(true) {
                dispatcher.call_with_context("process_market_book", strategy, market, |ctx| {
                    strategy.process_market_book(ctx, &market_book)
                })?;
            }
        }
    }
    Ok(inline_closes)
}

/// Close a market: settle its blotter, notify strategies, synthesize
/// settlement when simulated and evict stale markets.
pub(crate) fn handle_close_market(
    market_book: MarketBook,
    markets: &mut Markets,
    dispatcher: &Dispatcher<'_>,
    config: &EngineConfig,
) -> Result<()> {
    let market_id = market_book.market_id.clone();
    let simulated = config.simulated || dispatcher.clients.simulated();
    let Some(market) = markets.get_mut(&market_id) else {
        warn!(market_id = %market_id, "Close market event for unknown market");
        return Ok(());
    };

    if !market.closed() {
        market.close_market();
    }
    market.apply_book(market_book.clone());
    market.process_closed_market(&market_book);

    for strategy in dispatcher
        .strategies
        .subscribed(market_book.streaming_unique_id)
    {
        dispatcher.call("process_closed_market", strategy, market, || {
            strategy.process_closed_market(market, &market_book)
        })?;
    }

    if simulated {
        let cleared_orders = ClearedOrders {
            market_id: market_id.clone(),
            orders: Vec::new(),
            more_available: false,
        };
        handle_cleared_orders(&cleared_orders, markets);
        if let Some(market) = markets.get(&market_id) {
            for client in dispatcher.clients.iter() {
                let cleared_markets = ClearedMarkets {
                    orders: vec![market.cleared(client.id())],
                    more_available: false,
                };
                handle_cleared_markets(&cleared_markets);
            }
        }
    }
    info!(market_id = %market_id, markets = markets.len(), "Market closed");

    if simulated {
        if let Some(market) = markets.get_mut(&market_id) {
            market.clear_runner_contexts();
        }
    } else {
        evict_closed_markets(markets, config.closed_market_retention_secs);
    }
    Ok(())
}

/// Remove markets closed for longer than `retention_secs`.
///
/// Returns the number of markets removed.
pub(crate) fn evict_closed_markets(markets: &mut Markets, retention_secs: u64) -> usize {
    let retention = retention_secs as f64;
    let stale: Vec<_> = markets
        .iter()
        .filter(|m| m.closed())
        .filter(|m| m.elapsed_seconds_closed().is_some_and(|s| s > retention))
        .map(|m| m.market_id().clone())
        .collect();
    for market_id in &stale {
        markets.remove_market(market_id);
    }
    stale.len()
}

pub(crate) fn handle_market_catalogues(catalogues: Vec<MarketCatalogue>, markets: &mut Markets) {
    for catalogue in catalogues {
        match markets.get_mut(&catalogue.market_id) {
            Some(market) => market.set_market_catalogue(catalogue),
            None => debug!(market_id = %catalogue.market_id, "Catalogue for unknown market"),
        }
    }
}

pub(crate) fn handle_cleared_orders(cleared_orders: &ClearedOrders, markets: &mut Markets) {
    let Some(market) = markets.get_mut(&cleared_orders.market_id) else {
        warn!(market_id = %cleared_orders.market_id, "Cleared orders for unknown market");
        return;
    };
    let order_count = market.blotter_mut().process_cleared_orders(cleared_orders);
    debug!(
        market_id = %cleared_orders.market_id,
        order_count,
        "Market cleared"
    );
}

pub(crate) fn handle_cleared_markets(cleared_markets: &ClearedMarkets) {
    for cleared_market in &cleared_markets.orders {
        info!(
            market_id = %cleared_market.market_id,
            profit = %cleared_market.profit,
            bet_count = cleared_market.bet_count,
            commission = %cleared_market.commission,
            "Market level cleared"
        );
    }
}
