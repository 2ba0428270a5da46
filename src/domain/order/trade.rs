//! Trades group related orders against one selection.

use chrono::{DateTime, Utc};
use tracing::info;

use super::{Order, OrderType, Side};
use crate::domain::id::{MarketId, OrderId, SelectionKey, StrategyName, TradeId};
use crate::domain::money::Price;

/// Trade status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    /// Created, nothing placed yet.
    Pending,
    Live,
    Complete,
}

/// A group of orders placed by one strategy against one selection.
///
/// Child orders are owned by the market's blotter; the trade keeps their ids.
#[derive(Debug, Clone)]
pub struct Trade {
    id: TradeId,
    market_id: MarketId,
    selection: SelectionKey,
    strategy: StrategyName,
    notes: Vec<String>,
    place_reset_seconds: f64,
    reset_seconds: f64,
    orders: Vec<OrderId>,
    offset_orders: Vec<OrderId>,
    status: TradeStatus,
    status_log: Vec<TradeStatus>,
    date_time_created: DateTime<Utc>,
    date_time_complete: Option<DateTime<Utc>>,
}

impl Trade {
    pub fn new(market_id: MarketId, selection: SelectionKey, strategy: StrategyName) -> Self {
        Self {
            id: TradeId::new(),
            market_id,
            selection,
            strategy,
            notes: Vec::new(),
            place_reset_seconds: 0.0,
            reset_seconds: 0.0,
            orders: Vec::new(),
            offset_orders: Vec::new(),
            status: TradeStatus::Pending,
            status_log: Vec::new(),
            date_time_created: Utc::now(),
            date_time_complete: None,
        }
    }

    /// Seconds to wait after the last placement before allowing another order.
    #[must_use]
    pub fn with_place_reset_seconds(mut self, seconds: f64) -> Self {
        self.place_reset_seconds = seconds;
        self
    }

    /// Seconds to wait after the last trade reset before allowing another order.
    #[must_use]
    pub fn with_reset_seconds(mut self, seconds: f64) -> Self {
        self.reset_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Create an order linked to this trade.
    pub fn create_order(&mut self, side: Side, order_type: OrderType) -> Order {
        let order = Order::new(self, side, order_type);
        self.orders.push(order.id().clone());
        order
    }

    /// Create an offset order, placed once the initial order has matched.
    pub fn create_offset_order(&mut self, side: Side, order_type: OrderType) -> Order {
        let order = Order::new(self, side, order_type);
        self.offset_orders.push(order.id().clone());
        order
    }

    /// Create the new order produced by replacing `original` at `new_price`.
    ///
    /// The replacement keeps the original's side, persistence, client, context and notes.
    pub(crate) fn create_order_replacement(&mut self, original: &Order, new_price: Price) -> Order {
        let persistence_type = original
            .order_type()
            .as_limit()
            .map(|limit| limit.persistence_type)
            .unwrap_or_default();
        let order_type = OrderType::Limit(
            super::LimitOrder::new(new_price, original.size_remaining())
                .with_persistence(persistence_type),
        );
        let mut replacement = Order::new(self, original.side(), order_type);
        replacement.set_context(original.context().clone(), original.notes().to_vec());
        replacement.set_replacement_of(original.id().clone());
        if let Some(client_id) = original.client_id() {
            replacement.set_client(client_id.clone(), original.simulated());
        }
        self.orders.push(replacement.id().clone());
        replacement
    }

    #[must_use]
    pub fn id(&self) -> &TradeId {
        &self.id
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
    pub fn strategy(&self) -> &StrategyName {
        &self.strategy
    }

    #[must_use]
    pub fn place_reset_seconds(&self) -> f64 {
        self.place_reset_seconds
    }

    #[must_use]
    pub fn reset_seconds(&self) -> f64 {
        self.reset_seconds
    }

    #[must_use]
    pub fn orders(&self) -> &[OrderId] {
        &self.orders
    }

    #[must_use]
    pub fn offset_orders(&self) -> &[OrderId] {
        &self.offset_orders
    }

    /// Every child and offset order id.
    pub fn all_orders(&self) -> impl Iterator<Item = &OrderId> {
        self.orders.iter().chain(self.offset_orders.iter())
    }

    #[must_use]
    pub fn status(&self) -> TradeStatus {
        self.status
    }

    #[must_use]
    pub fn status_log(&self) -> &[TradeStatus] {
        &self.status_log
    }

    #[must_use]
    pub fn date_time_created(&self) -> DateTime<Utc> {
        self.date_time_created
    }

    #[must_use]
    pub fn date_time_complete(&self) -> Option<DateTime<Utc>> {
        self.date_time_complete
    }

    #[must_use]
    pub fn notes_str(&self) -> String {
        self.notes.join(",")
    }

    fn update_status(&mut self, status: TradeStatus) {
        self.status_log.push(status);
        self.status = status;
        info!(
            trade_id = %self.id,
            market_id = %self.market_id,
            selection = %self.selection,
            strategy = %self.strategy,
            notes = %self.notes_str(),
            status = ?status,
            "Trade status update"
        );
    }

    /// Mark the trade live once its first order is placed.
    pub(crate) fn mark_live(&mut self) {
        if self.status == TradeStatus::Pending {
            self.update_status(TradeStatus::Live);
        }
    }

    /// Forget an order that never reached the blotter.
    pub(crate) fn discard_order(&mut self, order_id: &OrderId) {
        self.orders.retain(|id| id != order_id);
        self.offset_orders.retain(|id| id != order_id);
    }

    /// Complete the trade. Returns false if it was already complete.
    pub(crate) fn complete_trade(&mut self) -> bool {
        if self.status == TradeStatus::Complete {
            return false;
        }
        self.date_time_complete = Some(Utc::now());
        self.update_status(TradeStatus::Complete);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::PersistenceType;
    use crate::testkit::domain::limit_order;
    use rust_decimal_macros::dec;

    fn trade() -> Trade {
        Trade::new(MarketId::from("1.23"), SelectionKey::new(123), StrategyName::from("test"))
    }

    #[test]
    fn new_trade_is_pending() {
        let trade = trade().with_reset_seconds(60.0).with_note("trigger");
        assert_eq!(trade.status(), TradeStatus::Pending);
        assert_eq!(trade.reset_seconds(), 60.0);
        assert_eq!(trade.notes_str(), "trigger");
        assert!(trade.date_time_complete().is_none());
    }

    #[test]
    fn create_order_links_trade() {
        let mut trade = trade();
        let order = trade.create_order(Side::Lay, limit_order(dec!(3.0), dec!(2)));
        let offset = trade.create_offset_order(Side::Back, limit_order(dec!(2.5), dec!(2)));
        assert_eq!(trade.orders(), &[order.id().clone()]);
        assert_eq!(trade.offset_orders(), &[offset.id().clone()]);
        assert_eq!(trade.all_orders().count(), 2);
        assert_eq!(order.selection(), SelectionKey::new(123));
    }

    #[test]
    fn replacement_keeps_context() {
        let mut trade = trade();
        let original = trade
            .create_order(
                Side::Back,
                OrderType::Limit(
                    crate::domain::order::LimitOrder::new(dec!(2.0), dec!(4))
                        .with_persistence(PersistenceType::Persist),
                ),
            )
            .with_note("entry")
            .with_context("signal", 7);
        let replacement = trade.create_order_replacement(&original, dec!(2.2));
        assert_eq!(replacement.replacement_of(), Some(original.id()));
        assert_eq!(replacement.notes(), original.notes());
        assert_eq!(replacement.context(), original.context());
        let limit = replacement.order_type().as_limit().unwrap();
        assert_eq!(limit.price, dec!(2.2));
        assert_eq!(limit.size, dec!(4));
        assert_eq!(limit.persistence_type, PersistenceType::Persist);
        assert_eq!(trade.orders().len(), 2);
    }

    #[test]
    fn complete_trade_is_one_way() {
        let mut trade = trade();
        trade.mark_live();
        assert_eq!(trade.status(), TradeStatus::Live);
        assert!(trade.complete_trade());
        assert!(!trade.complete_trade());
        assert_eq!(trade.status(), TradeStatus::Complete);
        trade.mark_live();
        assert_eq!(trade.status(), TradeStatus::Complete);
    }
}
