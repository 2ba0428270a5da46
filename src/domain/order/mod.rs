//! Order and trade state machines.
//!
//! An [`Order`] moves `Pending -> Executable -> ExecutionComplete | Expired`,
//! driven by exchange reconciliation. `Violation` is only reachable from
//! `Pending` when a trading control rejects the order before it is sent.
//! `Cancelling`, `Updating` and `Replacing` are local in-flight states set
//! by a mutation and resolved by the next exchange update.

mod order_type;
mod package;
mod trade;

pub use order_type::{
    LimitOnCloseOrder, LimitOrder, MarketOnCloseOrder, OrderType, PersistenceType, PriceLadder,
};
pub use package::{OrderPackage, OrderPackageType};
pub use trade::{Trade, TradeStatus};

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::book::RunnerStatus;
use crate::domain::current_order::{ClearedOrder, CurrentOrder};
use crate::domain::id::{BetId, ClientId, MarketId, OrderId, SelectionKey, StrategyName, TradeId};
use crate::domain::money::{round_money, Price, Size};
use crate::error::OrderError;

/// Default separator between strategy hash and order id in a customer reference.
pub const DEFAULT_ORDER_SEPARATOR: char = '-';

/// Bet direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Back,
    Lay,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Back => write!(f, "BACK"),
            Self::Lay => write!(f, "LAY"),
        }
    }
}

/// Local order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Executable,
    ExecutionComplete,
    Expired,
    Violation,
    Cancelling,
    Updating,
    Replacing,
}

impl OrderStatus {
    /// Whether the status is terminal.
    #[must_use]
    pub fn is_complete(self) -> bool {
        matches!(
            self,
            Self::ExecutionComplete | Self::Expired | Self::Violation
        )
    }

    /// Whether a mutation request is in flight.
    #[must_use]
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Cancelling | Self::Updating | Self::Replacing)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Executable => "EXECUTABLE",
            Self::ExecutionComplete => "EXECUTION_COMPLETE",
            Self::Expired => "EXPIRED",
            Self::Violation => "VIOLATION",
            Self::Cancelling => "CANCELLING",
            Self::Updating => "UPDATING",
            Self::Replacing => "REPLACING",
        };
        write!(f, "{s}")
    }
}

/// Parameters of a mutation awaiting exchange confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderUpdate {
    Cancel { size_reduction: Option<Size> },
    Update { persistence_type: PersistenceType },
    Replace { new_price: Price, replacement: OrderId },
}

/// Settlement data attached when the market closes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settlement {
    pub runner_status: Option<RunnerStatus>,
    pub market_type: Option<String>,
    pub each_way_divisor: Option<Decimal>,
    pub number_of_winners: u32,
    /// Set when more runners won than the market allows.
    pub dead_heat_winners: Option<u32>,
    pub line_range_result: Option<Decimal>,
}

/// A single order against one selection.
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    bet_id: Option<BetId>,
    trade_id: TradeId,
    strategy: StrategyName,
    market_id: MarketId,
    selection: SelectionKey,
    side: Side,
    order_type: OrderType,
    status: OrderStatus,
    status_log: Vec<OrderStatus>,
    client_id: Option<ClientId>,
    simulated: bool,
    async_place: bool,
    separator: char,
    market_version: Option<u64>,
    publish_time: Option<DateTime<Utc>>,
    date_time_created: DateTime<Utc>,
    date_time_placed: Option<DateTime<Utc>>,
    date_time_placed_confirmed: Option<DateTime<Utc>>,
    date_time_execution_complete: Option<DateTime<Utc>>,
    current_order: Option<CurrentOrder>,
    violation_msg: Option<String>,
    pending_update: Option<OrderUpdate>,
    replacement_of: Option<OrderId>,
    replaced_by: Option<OrderId>,
    context: Map<String, Value>,
    notes: Vec<String>,
    settlement: Settlement,
    cleared_order: Option<ClearedOrder>,
}

impl Order {
    pub(crate) fn new(trade: &Trade, side: Side, order_type: OrderType) -> Self {
        Self {
            id: OrderId::generate(),
            bet_id: None,
            trade_id: trade.id().clone(),
            strategy: trade.strategy().clone(),
            market_id: trade.market_id().clone(),
            selection: trade.selection(),
            side,
            order_type,
            status: OrderStatus::Pending,
            status_log: Vec::new(),
            client_id: None,
            simulated: false,
            async_place: false,
            separator: DEFAULT_ORDER_SEPARATOR,
            market_version: None,
            publish_time: None,
            date_time_created: Utc::now(),
            date_time_placed: None,
            date_time_placed_confirmed: None,
            date_time_execution_complete: None,
            current_order: None,
            violation_msg: None,
            pending_update: None,
            replacement_of: None,
            replaced_by: None,
            context: Map::new(),
            notes: Vec::new(),
            settlement: Settlement::default(),
            cleared_order: None,
        }
    }

    /// Attach a context value, carried over to any replacement order.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attach a free-form note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    #[must_use]
    pub fn bet_id(&self) -> Option<&BetId> {
        self.bet_id.as_ref()
    }

    #[must_use]
    pub fn trade_id(&self) -> &TradeId {
        &self.trade_id
    }

    #[must_use]
    pub fn strategy(&self) -> &StrategyName {
        &self.strategy
    }

    #[must_use]
    pub fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    #[must_use]
    pub fn selection(&self) -> SelectionKey {
        self.selection
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn order_type(&self) -> &OrderType {
        &self.order_type
    }

    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    #[must_use]
    pub fn status_log(&self) -> &[OrderStatus] {
        &self.status_log
    }

    #[must_use]
    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    #[must_use]
    pub fn simulated(&self) -> bool {
        self.simulated
    }

    #[must_use]
    pub fn async_place(&self) -> bool {
        self.async_place
    }

    #[must_use]
    pub fn market_version(&self) -> Option<u64> {
        self.market_version
    }

    #[must_use]
    pub fn publish_time(&self) -> Option<DateTime<Utc>> {
        self.publish_time
    }

    #[must_use]
    pub fn date_time_created(&self) -> DateTime<Utc> {
        self.date_time_created
    }

    #[must_use]
    pub fn date_time_placed(&self) -> Option<DateTime<Utc>> {
        self.date_time_placed
    }

    /// When the exchange first reported a bet id for the order.
    #[must_use]
    pub fn date_time_placed_confirmed(&self) -> Option<DateTime<Utc>> {
        self.date_time_placed_confirmed
    }

    #[must_use]
    pub fn date_time_execution_complete(&self) -> Option<DateTime<Utc>> {
        self.date_time_execution_complete
    }

    #[must_use]
    pub fn current_order(&self) -> Option<&CurrentOrder> {
        self.current_order.as_ref()
    }

    #[must_use]
    pub fn violation_msg(&self) -> Option<&str> {
        self.violation_msg.as_deref()
    }

    #[must_use]
    pub fn pending_update(&self) -> Option<&OrderUpdate> {
        self.pending_update.as_ref()
    }

    /// The order this one replaced, if any.
    #[must_use]
    pub fn replacement_of(&self) -> Option<&OrderId> {
        self.replacement_of.as_ref()
    }

    /// The order that replaced this one, if any.
    #[must_use]
    pub fn replaced_by(&self) -> Option<&OrderId> {
        self.replaced_by.as_ref()
    }

    #[must_use]
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    #[must_use]
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    #[must_use]
    pub fn settlement(&self) -> &Settlement {
        &self.settlement
    }

    #[must_use]
    pub fn cleared_order(&self) -> Option<&ClearedOrder> {
        self.cleared_order.as_ref()
    }

    /// `{strategy hash}{separator}{order id}`.
    #[must_use]
    pub fn customer_order_ref(&self) -> String {
        format!("{}{}{}", self.strategy.name_hash(), self.separator, self.id)
    }

    /// Runner context / exposure lookup key.
    #[must_use]
    pub fn lookup(&self) -> (&MarketId, SelectionKey) {
        (&self.market_id, self.selection)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    #[must_use]
    pub fn size_matched(&self) -> Size {
        self.current_order
            .as_ref()
            .map_or(Decimal::ZERO, |co| co.size_matched)
    }

    /// Unmatched size, from the exchange when known.
    #[must_use]
    pub fn size_remaining(&self) -> Size {
        if let Some(co) = &self.current_order {
            return co.size_remaining;
        }
        match &self.order_type {
            OrderType::Limit(limit) => limit.stake(),
            _ => Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn average_price_matched(&self) -> Price {
        self.current_order
            .as_ref()
            .map_or(Decimal::ZERO, |co| co.average_price_matched)
    }

    #[must_use]
    pub fn size_cancelled(&self) -> Size {
        self.current_order
            .as_ref()
            .map_or(Decimal::ZERO, |co| co.size_cancelled)
    }

    #[must_use]
    pub fn size_lapsed(&self) -> Size {
        self.current_order
            .as_ref()
            .map_or(Decimal::ZERO, |co| co.size_lapsed)
    }

    #[must_use]
    pub fn size_voided(&self) -> Size {
        self.current_order
            .as_ref()
            .map_or(Decimal::ZERO, |co| co.size_voided)
    }

    /// Seconds since the order was placed.
    #[must_use]
    pub fn elapsed_seconds(&self) -> Option<f64> {
        self.date_time_placed
            .map(|placed| (Utc::now() - placed).num_milliseconds() as f64 / 1000.0)
    }

    /// Settled profit for simulated clearing.
    ///
    /// Zero until runner status is known. Dead heats reduce the winning
    /// stake by `number_of_winners / dead_heat_winners`.
    #[must_use]
    pub fn profit(&self) -> Decimal {
        let size = self.size_matched();
        if size.is_zero() {
            return Decimal::ZERO;
        }
        let back_profit = if self.order_type.is_line_range() {
            let (Some(result), Some(line)) =
                (self.settlement.line_range_result, self.order_type.price())
            else {
                return Decimal::ZERO;
            };
            // back is the under
            if result < line {
                size
            } else {
                -size
            }
        } else {
            let Some(runner_status) = self.settlement.runner_status else {
                return Decimal::ZERO;
            };
            let price = self.average_price_matched();
            match runner_status {
                RunnerStatus::Winner | RunnerStatus::Placed => {
                    let won = match self.settlement.dead_heat_winners {
                        Some(n) if n > 0 => {
                            size * Decimal::from(self.settlement.number_of_winners.max(1))
                                / Decimal::from(n)
                        }
                        _ => size,
                    };
                    won * (price - Decimal::ONE) - (size - won)
                }
                RunnerStatus::Loser => -size,
                RunnerStatus::Active
                | RunnerStatus::Removed
                | RunnerStatus::RemovedVacant
                | RunnerStatus::Hidden => Decimal::ZERO,
            }
        };
        match self.side {
            Side::Back => round_money(back_profit),
            Side::Lay => round_money(-back_profit),
        }
    }

    fn update_status(&mut self, status: OrderStatus) {
        self.status_log.push(status);
        self.status = status;
        debug!(
            order_id = %self.id,
            market_id = %self.market_id,
            bet_id = ?self.bet_id,
            status = %status,
            "Order status update"
        );
    }

    pub(crate) fn set_client(&mut self, client_id: ClientId, simulated: bool) {
        self.client_id = Some(client_id);
        self.simulated = simulated;
    }

    pub(crate) fn place(
        &mut self,
        publish_time: DateTime<Utc>,
        market_version: Option<u64>,
        async_place: bool,
        separator: char,
    ) {
        self.publish_time = Some(publish_time);
        self.market_version = market_version;
        self.async_place = async_place;
        self.separator = separator;
        self.date_time_placed = Some(Utc::now());
        self.update_status(OrderStatus::Pending);
    }

    pub(crate) fn executable(&mut self) {
        self.pending_update = None;
        self.update_status(OrderStatus::Executable);
    }

    pub(crate) fn execution_complete(&mut self) {
        self.pending_update = None;
        self.date_time_execution_complete = Some(Utc::now());
        self.update_status(OrderStatus::ExecutionComplete);
    }

    pub(crate) fn expired(&mut self) {
        self.pending_update = None;
        self.date_time_execution_complete = Some(Utc::now());
        self.update_status(OrderStatus::Expired);
    }

    /// Reject the order before it reaches the exchange.
    pub(crate) fn violation(&mut self, message: impl Into<String>) {
        self.violation_msg = Some(message.into());
        self.update_status(OrderStatus::Violation);
    }

    /// Record a rejected mutation without leaving the current status.
    pub(crate) fn set_violation_msg(&mut self, message: impl Into<String>) {
        self.violation_msg = Some(message.into());
    }

    pub(crate) fn cancel(&mut self, size_reduction: Option<Size>) -> Result<(), OrderError> {
        self.require_executable("cancel")?;
        self.pending_update = Some(OrderUpdate::Cancel { size_reduction });
        self.update_status(OrderStatus::Cancelling);
        Ok(())
    }

    pub(crate) fn update(&mut self, persistence_type: PersistenceType) -> Result<(), OrderError> {
        self.require_limit("update")?;
        self.require_executable("update")?;
        let OrderType::Limit(limit) = &mut self.order_type else {
            return Ok(());
        };
        if limit.persistence_type == persistence_type {
            return Err(OrderError::UnchangedPersistence {
                order_id: self.id.to_string(),
                persistence_type: persistence_type.to_string(),
            });
        }
        limit.persistence_type = persistence_type;
        self.pending_update = Some(OrderUpdate::Update { persistence_type });
        self.update_status(OrderStatus::Updating);
        Ok(())
    }

    /// Check that a replace is legal without changing state.
    pub(crate) fn check_replace(&self) -> Result<(), OrderError> {
        self.require_limit("replace")?;
        self.require_executable("replace")
    }

    pub(crate) fn replace(&mut self, new_price: Price, replacement: OrderId) -> Result<(), OrderError> {
        self.check_replace()?;
        self.replaced_by = Some(replacement.clone());
        self.pending_update = Some(OrderUpdate::Replace {
            new_price,
            replacement,
        });
        self.update_status(OrderStatus::Replacing);
        Ok(())
    }

    fn require_executable(&self, action: &'static str) -> Result<(), OrderError> {
        if self.status == OrderStatus::Executable {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                order_id: self.id.to_string(),
                action,
                status: self.status.to_string(),
            })
        }
    }

    fn require_limit(&self, action: &'static str) -> Result<(), OrderError> {
        if self.order_type.as_limit().is_some() {
            Ok(())
        } else {
            Err(OrderError::UnsupportedOrderType {
                order_id: self.id.to_string(),
                action,
                order_type: self.order_type.name(),
            })
        }
    }

    pub(crate) fn update_current_order(&mut self, current_order: CurrentOrder) {
        self.current_order = Some(current_order);
    }

    pub(crate) fn set_bet_id(&mut self, bet_id: BetId) {
        self.bet_id = Some(bet_id);
    }

    /// Record the placement response for an order placed asynchronously.
    ///
    /// Only the first call has any effect.
    pub(crate) fn placed(&mut self) {
        if self.date_time_placed_confirmed.is_some() {
            return;
        }
        self.date_time_placed_confirmed = Some(Utc::now());
        debug!(
            order_id = %self.id,
            bet_id = ?self.bet_id,
            "Order placement confirmed"
        );
    }

    pub(crate) fn set_replacement_of(&mut self, original: OrderId) {
        self.replacement_of = Some(original);
    }

    pub(crate) fn set_context(&mut self, context: Map<String, Value>, notes: Vec<String>) {
        self.context = context;
        self.notes = notes;
    }

    pub(crate) fn settle(&mut self, settlement: Settlement) {
        self.settlement = settlement;
    }

    pub(crate) fn set_cleared_order(&mut self, cleared_order: ClearedOrder) {
        self.cleared_order = Some(cleared_order);
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Order {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::current_order::CurrentOrderStatus;
    use crate::testkit::domain::{current_order_for, limit_order};
    use rust_decimal_macros::dec;

    fn trade() -> Trade {
        Trade::new(MarketId::from("1.23"), SelectionKey::new(123), StrategyName::from("test"))
    }

    #[test]
    fn new_order_is_pending_without_bet_id() {
        let mut trade = trade();
        let order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(9)));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.bet_id().is_none());
        assert!(!order.is_complete());
        assert_eq!(order.size_remaining(), dec!(9));
        assert_eq!(order.trade_id(), trade.id());
    }

    #[test]
    fn customer_order_ref_round_trips_to_order_id() {
        let mut trade = trade();
        let order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(9)));
        let reference = order.customer_order_ref();
        assert_eq!(OrderId::from_customer_ref(&reference).as_ref(), Some(order.id()));
    }

    #[test]
    fn complete_statuses() {
        assert!(OrderStatus::ExecutionComplete.is_complete());
        assert!(OrderStatus::Expired.is_complete());
        assert!(OrderStatus::Violation.is_complete());
        assert!(!OrderStatus::Executable.is_complete());
        assert!(!OrderStatus::Replacing.is_complete());
    }

    #[test]
    fn cancel_requires_executable() {
        let mut trade = trade();
        let mut order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(9)));
        let err = order.cancel(None).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { action: "cancel", .. }));

        order.executable();
        order.cancel(Some(dec!(1))).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelling);
        assert_eq!(
            order.pending_update(),
            Some(&OrderUpdate::Cancel {
                size_reduction: Some(dec!(1))
            })
        );
    }

    #[test]
    fn update_rejects_unchanged_persistence() {
        let mut trade = trade();
        let mut order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(9)));
        order.executable();
        let err = order.update(PersistenceType::Lapse).unwrap_err();
        assert!(matches!(err, OrderError::UnchangedPersistence { .. }));

        order.update(PersistenceType::Persist).unwrap();
        assert_eq!(order.status(), OrderStatus::Updating);
    }

    #[test]
    fn replace_only_for_limit_orders() {
        let mut trade = trade();
        let mut order = trade.create_order(
            Side::Back,
            OrderType::from(MarketOnCloseOrder { liability: dec!(5) }),
        );
        order.executable();
        let err = order.replace(dec!(3), OrderId::from("2")).unwrap_err();
        assert!(matches!(err, OrderError::UnsupportedOrderType { action: "replace", .. }));
    }

    #[test]
    fn sizes_follow_current_order() {
        let mut trade = trade();
        let mut order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(9)));
        let mut current = current_order_for(&order, "1", CurrentOrderStatus::Executable);
        current.size_matched = dec!(4);
        current.size_remaining = dec!(5);
        current.average_price_matched = dec!(2.02);
        order.update_current_order(current);
        assert_eq!(order.size_matched(), dec!(4));
        assert_eq!(order.size_remaining(), dec!(5));
        assert_eq!(order.average_price_matched(), dec!(2.02));
    }

    #[test]
    fn profit_winner_and_loser() {
        let mut trade = trade();
        let mut order = trade.create_order(Side::Back, limit_order(dec!(3.0), dec!(2)));
        let mut current = current_order_for(&order, "1", CurrentOrderStatus::ExecutionComplete);
        current.size_matched = dec!(2);
        current.average_price_matched = dec!(3.0);
        order.update_current_order(current);

        assert_eq!(order.profit(), dec!(0));

        order.settle(Settlement {
            runner_status: Some(RunnerStatus::Winner),
            number_of_winners: 1,
            ..Settlement::default()
        });
        assert_eq!(order.profit(), dec!(4.00));

        order.settle(Settlement {
            runner_status: Some(RunnerStatus::Loser),
            number_of_winners: 1,
            ..Settlement::default()
        });
        assert_eq!(order.profit(), dec!(-2.00));
    }

    #[test]
    fn profit_dead_heat_halves_winning_stake() {
        let mut trade = trade();
        let mut order = trade.create_order(Side::Lay, limit_order(dec!(3.0), dec!(2)));
        let mut current = current_order_for(&order, "1", CurrentOrderStatus::ExecutionComplete);
        current.size_matched = dec!(2);
        current.average_price_matched = dec!(3.0);
        order.update_current_order(current);
        order.settle(Settlement {
            runner_status: Some(RunnerStatus::Winner),
            number_of_winners: 1,
            dead_heat_winners: Some(2),
            ..Settlement::default()
        });
        // back side: 1 * 2 - 1 = 1, laid so -1
        assert_eq!(order.profit(), dec!(-1.00));
    }

    #[test]
    fn placement_is_confirmed_once() {
        let mut trade = trade();
        let mut order = trade.create_order(Side::Back, limit_order(dec!(2.0), dec!(2)));
        assert!(order.date_time_placed_confirmed().is_none());

        order.placed();
        let first = order.date_time_placed_confirmed();
        assert!(first.is_some());
        order.placed();
        assert_eq!(order.date_time_placed_confirmed(), first);
    }
}
