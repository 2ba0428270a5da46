//! Per-market middleware.

use crate::error::StrategyError;
use crate::market::Market;

/// Runs on every market book update, after the book is applied and before
/// strategies see it.
///
/// Middleware can enrich the market, e.g. writing settlement data into its
/// context. Failures are isolated like strategy callbacks.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    /// Process the market.
    ///
    /// # Errors
    ///
    /// Returns a [`StrategyError`]; the engine logs it and carries on.
    fn process(&self, market: &mut Market) -> Result<(), StrategyError>;
}
