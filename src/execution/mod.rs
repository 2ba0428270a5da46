//! Order execution.
//!
//! A [`Transaction`] batches order mutations for one market and one client
//! and hands the resulting [`OrderPackage`]s to the client's
//! [`OrderExecutor`]. Executors never answer synchronously: the outcome
//! comes back later as current-order updates on the event queue.
//!
//! - [`SimulatedExecutor`] - answers packages with synthetic order updates
//! - [`PooledExecutor`] - bounded worker pool in front of a [`PackageSubmitter`]

mod pool;
mod simulated;
mod transaction;

pub use pool::{PackageSubmitter, PooledExecutor};
pub use simulated::SimulatedExecutor;
pub use transaction::{PlaceOutcome, Transaction};

use std::sync::Arc;

use tracing::info;

use crate::control::TradingControl;
use crate::domain::{ClientId, OrderPackage};
use crate::error::ExecutionError;

/// Submits order packages to an exchange or simulator.
pub trait OrderExecutor: Send + Sync {
    /// Accept a package for submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the package cannot be accepted, e.g. a full queue.
    fn execute(&self, package: OrderPackage) -> Result<(), ExecutionError>;
}

/// How a client's orders are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    Live,
    Paper,
    Simulated,
}

/// A trading account with its executor and client-level controls.
pub struct Client {
    id: ClientId,
    mode: ExecutionMode,
    executor: Arc<dyn OrderExecutor>,
    controls: Vec<Box<dyn TradingControl>>,
}

impl Client {
    pub fn new(id: impl Into<ClientId>, mode: ExecutionMode, executor: Arc<dyn OrderExecutor>) -> Self {
        Self {
            id: id.into(),
            mode,
            executor,
            controls: Vec::new(),
        }
    }

    /// Add a control run for every order this client places or replaces.
    #[must_use]
    pub fn with_control(mut self, control: Box<dyn TradingControl>) -> Self {
        self.controls.push(control);
        self
    }

    #[must_use]
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Paper and simulated clients never reach an exchange.
    #[must_use]
    pub fn simulated(&self) -> bool {
        matches!(self.mode, ExecutionMode::Paper | ExecutionMode::Simulated)
    }

    #[must_use]
    pub fn executor(&self) -> &Arc<dyn OrderExecutor> {
        &self.executor
    }

    #[must_use]
    pub fn controls(&self) -> &[Box<dyn TradingControl>] {
        &self.controls
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("controls", &self.controls.len())
            .finish_non_exhaustive()
    }
}

/// Registered clients. The first one added is the default.
#[derive(Debug, Default)]
pub struct Clients {
    clients: Vec<Client>,
}

impl Clients {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::DuplicateClient`] if the id is taken.
    pub fn add_client(&mut self, client: Client) -> Result<(), ExecutionError> {
        if self.get(client.id()).is_some() {
            return Err(ExecutionError::DuplicateClient {
                client_id: client.id().to_string(),
            });
        }
        info!(client_id = %client.id(), mode = ?client.mode(), "Adding client");
        self.clients.push(client);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, client_id: &ClientId) -> Option<&Client> {
        self.clients.iter().find(|c| c.id() == client_id)
    }

    /// The client used when a strategy does not name one.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::NoClients`] if none are registered.
    pub fn default_client(&self) -> Result<&Client, ExecutionError> {
        self.clients.first().ok_or(ExecutionError::NoClients)
    }

    /// True if any client is paper or simulated.
    #[must_use]
    pub fn simulated(&self) -> bool {
        self.clients.iter().any(Client::simulated)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
