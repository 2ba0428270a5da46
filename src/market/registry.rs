//! Registry of markets.

use std::collections::HashMap;

use tracing::debug;

use super::Market;
use crate::domain::{BetId, MarketId, Order, OrderId};

/// Every market the engine has seen, keyed by market id.
#[derive(Debug, Default)]
pub struct Markets {
    markets: HashMap<MarketId, Market>,
}

impl Markets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a market, or re-open the registered one if it was closed.
    pub fn add_market(&mut self, market: Market) -> &mut Market {
        let market_id = market.market_id().clone();
        let entry = self.markets.entry(market_id.clone());
        let market = entry.or_insert_with(|| {
            debug!(market_id = %market_id, "Adding market");
            market
        });
        if market.closed() {
            market.open_market();
        }
        market
    }

    /// Remove a market entirely, dropping its blotter.
    pub fn remove_market(&mut self, market_id: &MarketId) -> Option<Market> {
        let removed = self.markets.remove(market_id);
        if removed.is_some() {
            debug!(market_id = %market_id, "Removed market");
        }
        removed
    }

    #[must_use]
    pub fn get(&self, market_id: &MarketId) -> Option<&Market> {
        self.markets.get(market_id)
    }

    pub fn get_mut(&mut self, market_id: &MarketId) -> Option<&mut Market> {
        self.markets.get_mut(market_id)
    }

    #[must_use]
    pub fn contains(&self, market_id: &MarketId) -> bool {
        self.markets.contains_key(market_id)
    }

    /// Ids of markets that are not closed.
    #[must_use]
    pub fn open_market_ids(&self) -> Vec<MarketId> {
        self.markets
            .values()
            .filter(|m| !m.closed())
            .map(|m| m.market_id().clone())
            .collect()
    }

    #[must_use]
    pub fn get_order(&self, market_id: &MarketId, order_id: &OrderId) -> Option<&Order> {
        self.markets
            .get(market_id)
            .and_then(|m| m.blotter().get(order_id))
    }

    /// Find an order by bet id across every market.
    #[must_use]
    pub fn get_order_from_bet_id(&self, bet_id: &BetId) -> Option<&Order> {
        self.markets
            .values()
            .find_map(|m| m.blotter().get_order_by_bet_id(bet_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Market> {
        self.markets.values_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}
