//! Per-selection throttle state for a strategy.

use chrono::{DateTime, Utc};

use super::id::{SelectionKey, TradeId};

/// Tracks placements and resets for one strategy on one selection.
///
/// Used only for throttling, never for exposure.
#[derive(Debug, Clone)]
pub struct RunnerContext {
    selection: SelectionKey,
    trades: Vec<TradeId>,
    live_trades: Vec<TradeId>,
    date_time_last_placed: Option<DateTime<Utc>>,
    date_time_last_reset: Option<DateTime<Utc>>,
}

impl RunnerContext {
    #[must_use]
    pub fn new(selection: SelectionKey) -> Self {
        Self {
            selection,
            trades: Vec::new(),
            live_trades: Vec::new(),
            date_time_last_placed: None,
            date_time_last_reset: None,
        }
    }

    /// Record a placement for `trade_id`.
    pub fn place(&mut self, trade_id: &TradeId) {
        self.place_at(trade_id, Utc::now());
    }

    pub fn place_at(&mut self, trade_id: &TradeId, at: DateTime<Utc>) {
        self.date_time_last_placed = Some(at);
        if !self.trades.contains(trade_id) {
            self.trades.push(trade_id.clone());
        }
        if !self.live_trades.contains(trade_id) {
            self.live_trades.push(trade_id.clone());
        }
    }

    /// Record that `trade_id` completed.
    pub fn reset(&mut self, trade_id: &TradeId) {
        self.reset_at(trade_id, Utc::now());
    }

    pub fn reset_at(&mut self, trade_id: &TradeId, at: DateTime<Utc>) {
        self.date_time_last_reset = Some(at);
        self.live_trades.retain(|id| id != trade_id);
    }

    #[must_use]
    pub fn selection(&self) -> SelectionKey {
        self.selection
    }

    /// Whether any trade on this selection is live.
    #[must_use]
    pub fn executable_orders(&self) -> bool {
        !self.live_trades.is_empty()
    }

    #[must_use]
    pub fn trades(&self) -> &[TradeId] {
        &self.trades
    }

    #[must_use]
    pub fn live_trades(&self) -> &[TradeId] {
        &self.live_trades
    }

    #[must_use]
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    #[must_use]
    pub fn live_trade_count(&self) -> usize {
        self.live_trades.len()
    }

    #[must_use]
    pub fn placed_elapsed_seconds(&self) -> Option<f64> {
        self.date_time_last_placed.map(elapsed_seconds)
    }

    #[must_use]
    pub fn reset_elapsed_seconds(&self) -> Option<f64> {
        self.date_time_last_reset.map(elapsed_seconds)
    }
}

fn elapsed_seconds(since: DateTime<Utc>) -> f64 {
    (Utc::now() - since).num_milliseconds() as f64 / 1000.0
}
