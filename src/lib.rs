//! Betflow - event-driven order processing for exchange betting markets.
//!
//! A single dispatcher drains a queue of market-book, order-update and
//! settlement events, keeps an in-memory view of every market and its
//! orders, and drives user strategies through a fixed callback set.
//!
//! # Architecture
//!
//! - **`engine`** - Event queue and dispatcher
//!   - Market books create markets, run middleware and strategies
//!   - Current orders reconcile local orders with exchange state
//!   - Close events settle orders and retire markets
//!
//! - **`execution`** - Clients, transactions and order executors
//!   - `Transaction` batches place/cancel/update/replace into packages
//!   - `SimulatedExecutor` answers packages on the inbound queue
//!   - `PooledExecutor` feeds packages to async workers
//!
//! - **`control`** - Pre-trade checks run before any order leaves a transaction
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`domain`] - Exchange-agnostic types: books, orders, trades, exposure
//! - [`market`] - Markets, their blotters and the market registry
//! - [`strategy`] - Strategy trait, settings and the strategy registry
//! - [`control`] - Trading controls and the strategy exposure check
//! - [`execution`] - Clients, transactions and executors
//! - [`engine`] - The event dispatcher
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `testkit` - Expose test builders to integration tests
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use betflow::config::Config;
//! use betflow::engine::Engine;
//! use betflow::execution::{Client, ExecutionMode, SimulatedExecutor};
//!
//! # async fn run() -> betflow::error::Result<()> {
//! let config = Config::default();
//! let mut engine = Engine::new(&config);
//! let executor = SimulatedExecutor::new(engine.sender());
//! engine.add_client(Client::new("sim", ExecutionMode::Simulated, Arc::new(executor)))?;
//! engine.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod control;
pub mod domain;
pub mod engine;
pub mod error;
pub mod execution;
pub mod market;
pub mod strategy;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
