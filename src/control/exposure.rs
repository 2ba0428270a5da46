//! Strategy exposure limits.

use rust_decimal::Decimal;
use tracing::debug;

use super::{ControlRequest, TradingControl};
use crate::domain::{OrderPackageType, OrderType, PriceLadder, RunnerContext, Side};
use crate::error::ControlError;

/// Enforces the strategy's order and selection exposure limits.
///
/// New orders are first passed through the strategy's own `validate_order`.
/// Only place and replace requests are checked.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrategyExposure;

impl StrategyExposure {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Worst-case loss of a single order.
    #[must_use]
    pub fn order_exposure(order_type: &OrderType, side: Side) -> Decimal {
        match order_type {
            OrderType::Limit(limit) => match limit.price_ladder {
                PriceLadder::Classic | PriceLadder::Finest => match side {
                    Side::Back => limit.stake(),
                    Side::Lay => (limit.price - Decimal::ONE) * limit.stake(),
                },
                PriceLadder::LineRange => limit.stake(),
            },
            OrderType::LimitOnClose(order) => order.liability,
            OrderType::MarketOnClose(order) => order.liability,
        }
    }

    fn validate_strategy(&self, request: &ControlRequest<'_>) -> Result<(), ControlError> {
        let order = request.order;
        let Some(trade) = request.market.blotter().trade(order.trade_id()) else {
            debug!(order_id = %order.id(), "No trade registered, skipping strategy validation");
            return Ok(());
        };
        let empty;
        let runner_context = match request
            .market
            .runner_context(order.strategy(), order.selection())
        {
            Some(context) => context,
            None => {
                empty = RunnerContext::new(order.selection());
                &empty
            }
        };
        request
            .strategy
            .validate_order(runner_context, order, trade)
            .map_err(|message| ControlError::StrategyValidation { message })
    }
}

impl TradingControl for StrategyExposure {
    fn name(&self) -> &'static str {
        "STRATEGY_EXPOSURE"
    }

    fn validate(&self, request: &ControlRequest<'_>) -> Result<(), ControlError> {
        if request.package_type == OrderPackageType::Place {
            self.validate_strategy(request)?;
        }
        if !matches!(
            request.package_type,
            OrderPackageType::Place | OrderPackageType::Replace
        ) {
            return Ok(());
        }

        let order = request.order;
        let settings = request.strategy.settings();
        let order_exposure = Self::order_exposure(order.order_type(), order.side());
        if order_exposure > settings.max_order_exposure {
            return Err(ControlError::OrderExposure {
                exposure: order_exposure,
                limit: settings.max_order_exposure,
            });
        }

        let exposures = request.market.blotter().get_exposures(
            order.strategy(),
            order.selection(),
            request.exclusion(),
        );
        let current = match order.side() {
            Side::Back => -exposures.worst_possible_profit_on_lose,
            Side::Lay => -exposures.worst_possible_profit_on_win,
        };
        let potential = current + order_exposure;
        if potential > settings.max_selection_exposure {
            return Err(ControlError::SelectionExposure {
                exposure: potential,
                limit: settings.max_selection_exposure,
            });
        }
        Ok(())
    }
}
