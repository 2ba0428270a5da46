//! Simulated order execution.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use super::OrderExecutor;
use crate::domain::{
    BetId, CurrentOrder, CurrentOrderStatus, CurrentOrders, Order, OrderPackage,
    OrderPackageType, OrderType, OrderUpdate,
};
use crate::engine::event::{Event, EventSender};
use crate::error::ExecutionError;

/// Answers every package with current-order updates on the event queue,
/// exactly as an exchange order stream would.
///
/// Placed limit orders rest unmatched unless `match_on_place` is set, in
/// which case they fill in full at their limit price.
#[derive(Debug)]
pub struct SimulatedExecutor {
    sender: EventSender,
    match_on_place: bool,
    next_bet_id: AtomicU64,
}

impl SimulatedExecutor {
    #[must_use]
    pub fn new(sender: EventSender) -> Self {
        Self {
            sender,
            match_on_place: false,
            next_bet_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn with_match_on_place(mut self, match_on_place: bool) -> Self {
        self.match_on_place = match_on_place;
        self
    }

    fn bet_id(&self) -> BetId {
        BetId::new(self.next_bet_id.fetch_add(1, Ordering::Relaxed).to_string())
    }

    fn place(&self, order: &Order) -> CurrentOrder {
        let bet_id = order.bet_id().cloned().unwrap_or_else(|| self.bet_id());
        let mut current = snapshot(order, bet_id);
        let fills = self.match_on_place && matches!(order.order_type(), OrderType::Limit(_));
        if fills {
            current.size_matched = current.size;
            current.size_remaining = Decimal::ZERO;
            current.average_price_matched = current.price;
            current.status = CurrentOrderStatus::ExecutionComplete;
        }
        current
    }

    fn replace(&self, order: &Order) -> Vec<CurrentOrder> {
        let Some(bet_id) = order.bet_id().cloned() else {
            return Vec::new();
        };
        let mut cancelled = snapshot(order, bet_id);
        let remaining = cancelled.size_remaining;
        cancelled.size_cancelled += remaining;
        cancelled.size_remaining = Decimal::ZERO;
        cancelled.status = CurrentOrderStatus::ExecutionComplete;

        let Some(OrderUpdate::Replace { new_price, .. }) = order.pending_update() else {
            return vec![cancelled];
        };
        let mut replacement = snapshot(order, self.bet_id());
        replacement.price = *new_price;
        replacement.size = remaining;
        replacement.size_matched = Decimal::ZERO;
        replacement.size_remaining = remaining;
        replacement.average_price_matched = Decimal::ZERO;
        replacement.size_cancelled = Decimal::ZERO;
        replacement.status = CurrentOrderStatus::Executable;
        vec![cancelled, replacement]
    }
}

impl OrderExecutor for SimulatedExecutor {
    fn execute(&self, package: OrderPackage) -> Result<(), ExecutionError> {
        let mut updates = Vec::with_capacity(package.len());
        for order in package.orders() {
            match package.package_type() {
                OrderPackageType::Place => updates.push(self.place(order)),
                OrderPackageType::Cancel => updates.extend(cancel(order)),
                OrderPackageType::Update => {
                    updates.extend(order.bet_id().cloned().map(|bet_id| snapshot(order, bet_id)));
                }
                OrderPackageType::Replace => updates.extend(self.replace(order)),
            }
        }
        if updates.len() < package.len() {
            warn!(
                package_id = %package.id(),
                "Simulated execution skipped orders without a bet id"
            );
        }
        debug!(
            package_id = %package.id(),
            package_type = %package.package_type(),
            updates = updates.len(),
            "Simulated package executed"
        );

        let event = Event::CurrentOrders(vec![CurrentOrders {
            orders: updates,
            more_available: false,
        }]);
        self.sender.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => ExecutionError::QueueFull {
                package_id: package.id().to_string(),
            },
            TrySendError::Closed(_) => ExecutionError::QueueClosed,
        })
    }
}

fn cancel(order: &Order) -> Option<CurrentOrder> {
    let bet_id = order.bet_id().cloned()?;
    let mut current = snapshot(order, bet_id);
    let reduction = match order.pending_update() {
        Some(OrderUpdate::Cancel {
            size_reduction: Some(size),
        }) => (*size).min(current.size_remaining),
        _ => current.size_remaining,
    };
    current.size_remaining -= reduction;
    current.size_cancelled += reduction;
    current.status = if current.size_remaining.is_zero() {
        CurrentOrderStatus::ExecutionComplete
    } else {
        CurrentOrderStatus::Executable
    };
    Some(current)
}

/// The exchange view of `order` as it stands, executable under `bet_id`.
fn snapshot(order: &Order, bet_id: BetId) -> CurrentOrder {
    if let Some(current) = order.current_order() {
        return CurrentOrder {
            bet_id,
            status: CurrentOrderStatus::Executable,
            ..current.clone()
        };
    }
    let selection = order.selection();
    let size = match order.order_type() {
        OrderType::Limit(limit) => limit.stake(),
        other => other.liability().unwrap_or_default(),
    };
    CurrentOrder {
        bet_id,
        market_id: order.market_id().clone(),
        selection_id: selection.selection_id,
        handicap: selection.handicap,
        customer_order_ref: Some(order.customer_order_ref()),
        status: CurrentOrderStatus::Executable,
        price: order.order_type().price().unwrap_or_default(),
        size,
        size_matched: Decimal::ZERO,
        size_remaining: size,
        average_price_matched: Decimal::ZERO,
        size_cancelled: Decimal::ZERO,
        size_lapsed: Decimal::ZERO,
        size_voided: Decimal::ZERO,
        placed_date: Some(Utc::now()),
    }
}
