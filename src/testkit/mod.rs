//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Builders for books, runners, orders and current orders.
//! - [`strategy`] - `RecordingStrategy`, which counts its callbacks.
//! - [`executor`] - `RecordingExecutor`, which captures submitted packages.

pub mod domain;
pub mod executor;
pub mod strategy;
