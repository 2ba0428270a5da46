//! Pre-trade controls.
//!
//! Every control is consulted before an order is placed or replaced. A
//! rejection marks a new order as a violation and hands it back to the
//! caller without touching the blotter; no package is sent.

mod exposure;

pub use exposure::StrategyExposure;

use crate::domain::{Order, OrderId, OrderPackageType};
use crate::error::ControlError;
use crate::market::Market;
use crate::strategy::Strategy;

/// Everything a control sees about a pending mutation.
#[derive(Clone, Copy)]
pub struct ControlRequest<'a> {
    pub order: &'a Order,
    pub market: &'a Market,
    pub strategy: &'a dyn Strategy,
    pub package_type: OrderPackageType,
}

impl ControlRequest<'_> {
    /// The blotter entry left out of exposure: the order being replaced.
    #[must_use]
    pub fn exclusion(&self) -> Option<&OrderId> {
        match self.package_type {
            OrderPackageType::Replace => {
                Some(self.order.replacement_of().unwrap_or_else(|| self.order.id()))
            }
            _ => None,
        }
    }
}

/// A pure pre-trade check.
pub trait TradingControl: Send + Sync {
    fn name(&self) -> &'static str;

    /// Validate a mutation.
    ///
    /// # Errors
    ///
    /// Returns the violation that rejects the mutation.
    fn validate(&self, request: &ControlRequest<'_>) -> Result<(), ControlError>;
}

/// Run `controls` in order, stopping at the first violation.
///
/// The error carries the name of the control that rejected the request.
pub(crate) fn validate_all<'c>(
    controls: impl IntoIterator<Item = &'c Box<dyn TradingControl>>,
    request: &ControlRequest<'_>,
) -> Result<(), (&'static str, ControlError)> {
    for control in controls {
        control
            .validate(request)
            .map_err(|err| (control.name(), err))?;
    }
    Ok(())
}
