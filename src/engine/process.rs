//! Reconciliation of local orders against exchange current orders.
//!
//! Local order state only moves on confirmed exchange state. Updates that
//! cannot be matched to a local order are logged and skipped.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::handler::Dispatcher;
use crate::domain::{CurrentOrder, CurrentOrderStatus, CurrentOrders, OrderId, OrderStatus};
use crate::error::Result;
use crate::market::{Market, Markets};

/// Apply a batch of current orders, then hand every strategy its live orders
/// in each open, active market.
pub(crate) fn handle_current_orders(
    batches: Vec<CurrentOrders>,
    markets: &mut Markets,
    dispatcher: &Dispatcher<'_>,
) -> Result<()> {
    for current_orders in batches {
        for current_order in current_orders.orders {
            process_current_order(markets, current_order);
        }
    }

    for market in markets.iter_mut() {
        if market.closed() || !market.blotter().is_active() {
            continue;
        }
        for strategy in dispatcher.strategies.iter() {
            let order_ids = market.blotter().strategy_live_order_ids(strategy.name());
            if order_ids.is_empty() {
                continue;
            }
            dispatcher.call_with_context("process_orders", strategy, market, |ctx| {
                strategy.process_orders(ctx, &order_ids)
            })?;
        }
    }
    Ok(())
}

/// Reconcile one exchange order with its local order.
pub(crate) fn process_current_order(markets: &mut Markets, current_order: CurrentOrder) {
    let Some(order_id) = current_order.order_id() else {
        debug!(bet_id = %current_order.bet_id, "Current order without customer reference");
        return;
    };
    let Some(market) = markets.get_mut(&current_order.market_id) else {
        warn!(
            market_id = %current_order.market_id,
            order_id = %order_id,
            "Current order for unknown market"
        );
        return;
    };
    let Some(target) = resolve_order(market, &order_id, &current_order) else {
        return;
    };

    let blotter = market.blotter_mut();
    let adopts_bet_id = blotter
        .get(&target)
        .is_some_and(|order| order.bet_id().is_none());
    if adopts_bet_id {
        blotter.set_bet_id(&target, current_order.bet_id.clone());
    }
    let Some(order) = blotter.get_mut(&target) else {
        return;
    };
    if adopts_bet_id {
        order.placed();
    }

    let reported = current_order.status;
    let nothing_matched = current_order.size_matched == Decimal::ZERO;
    order.update_current_order(current_order);
    match (order.status(), reported) {
        (OrderStatus::Pending, CurrentOrderStatus::Executable) => order.executable(),
        (
            OrderStatus::Pending
            | OrderStatus::Executable
            | OrderStatus::Cancelling
            | OrderStatus::Updating
            | OrderStatus::Replacing,
            CurrentOrderStatus::ExecutionComplete,
        ) => order.execution_complete(),
        (
            OrderStatus::Pending
            | OrderStatus::Executable
            | OrderStatus::Cancelling
            | OrderStatus::Updating
            | OrderStatus::Replacing,
            CurrentOrderStatus::Expired,
        ) => {
            if nothing_matched {
                order.expired();
            } else {
                order.execution_complete();
            }
        }
        (
            OrderStatus::Cancelling | OrderStatus::Updating | OrderStatus::Replacing,
            CurrentOrderStatus::Executable,
        ) => order.executable(),
        _ => {}
    }

    if !order.is_complete() {
        return;
    }
    let trade_id = order.trade_id().clone();
    let strategy = order.strategy().clone();
    let selection = order.selection();
    blotter.complete_order(&target);
    if blotter.check_trade_complete(&trade_id) {
        market.runner_context_mut(&strategy, selection).reset(&trade_id);
    }
}

/// Find the local order a current order refers to.
///
/// A replace keeps the customer reference but assigns a new bet id, so a
/// bet id mismatch is resolved through the bet id index, falling back to a
/// replacement that has not been assigned a bet id yet.
fn resolve_order(
    market: &Market,
    order_id: &OrderId,
    current_order: &CurrentOrder,
) -> Option<OrderId> {
    let blotter = market.blotter();
    let Some(order) = blotter.get(order_id) else {
        warn!(
            market_id = %market.market_id(),
            order_id = %order_id,
            bet_id = %current_order.bet_id,
            "Current order not found in blotter"
        );
        return None;
    };
    match order.bet_id() {
        Some(bet_id) if *bet_id != current_order.bet_id => {}
        _ => return Some(order_id.clone()),
    }

    if let Some(found) = blotter.get_order_by_bet_id(&current_order.bet_id) {
        return Some(found.id().clone());
    }
    let pending_replacement = order
        .replaced_by()
        .filter(|id| blotter.get(id).is_some_and(|o| o.bet_id().is_none()));
    if let Some(replacement) = pending_replacement {
        return Some(replacement.clone());
    }
    warn!(
        market_id = %market.market_id(),
        order_id = %order_id,
        bet_id = %current_order.bet_id,
        "Unable to resolve order from bet id, skipping update"
    );
    None
}
