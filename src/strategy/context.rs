//! What a strategy callback can reach.

use crate::config::ExecutionConfig;
use crate::control::TradingControl;
use crate::domain::ClientId;
use crate::error::ExecutionError;
use crate::execution::{Clients, Transaction};
use crate::market::Market;

use super::Strategy;

/// Handle passed to strategy callbacks that may trade.
///
/// Gives mutable access to the market and opens transactions against it.
pub struct StrategyContext<'a> {
    market: &'a mut Market,
    strategy: &'a dyn Strategy,
    clients: &'a Clients,
    controls: &'a [Box<dyn TradingControl>],
    execution: &'a ExecutionConfig,
}

impl<'a> StrategyContext<'a> {
    pub(crate) fn new(
        market: &'a mut Market,
        strategy: &'a dyn Strategy,
        clients: &'a Clients,
        controls: &'a [Box<dyn TradingControl>],
        execution: &'a ExecutionConfig,
    ) -> Self {
        Self {
            market,
            strategy,
            clients,
            controls,
            execution,
        }
    }

    #[must_use]
    pub fn market(&self) -> &Market {
        &*self.market
    }

    pub fn market_mut(&mut self) -> &mut Market {
        &mut *self.market
    }

    #[must_use]
    pub fn clients(&self) -> &Clients {
        self.clients
    }

    /// Transaction on the default client that sends each mutation immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::NoClients`] if no client is registered.
    pub fn transaction(&mut self) -> Result<Transaction<'_>, ExecutionError> {
        let client = self.clients.default_client()?.id().clone();
        self.transaction_for(&client, false)
    }

    /// Transaction on the default client that holds mutations until
    /// `execute()` or drop.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::NoClients`] if no client is registered.
    pub fn batched_transaction(&mut self) -> Result<Transaction<'_>, ExecutionError> {
        let client = self.clients.default_client()?.id().clone();
        self.transaction_for(&client, true)
    }

    /// Transaction on a named client.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::UnknownClient`] if the client is not registered.
    pub fn transaction_for(
        &mut self,
        client_id: &ClientId,
        batched: bool,
    ) -> Result<Transaction<'_>, ExecutionError> {
        let clients: &'a Clients = self.clients;
        let client = clients
            .get(client_id)
            .ok_or_else(|| ExecutionError::UnknownClient {
                client_id: client_id.to_string(),
            })?;
        Ok(Transaction::new(
            &mut *self.market,
            client,
            self.controls,
            self.strategy,
            self.execution,
            batched,
        ))
    }
}
