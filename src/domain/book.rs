//! Market data resources produced by the market-data stream.
//!
//! These mirror the exchange payloads (camelCase JSON) and are treated as
//! immutable snapshots by the engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{MarketId, SelectionKey};

/// Market status as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    Inactive,
    Open,
    Suspended,
    Closed,
}

/// Runner status as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunnerStatus {
    Active,
    Winner,
    Loser,
    Placed,
    RemovedVacant,
    Removed,
    Hidden,
}

/// Static market metadata carried on every book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDefinition {
    #[serde(default)]
    pub market_type: String,
    #[serde(default)]
    pub each_way_divisor: Option<Decimal>,
    #[serde(default = "default_number_of_winners")]
    pub number_of_winners: u32,
    #[serde(default)]
    pub in_play: bool,
}

fn default_number_of_winners() -> u32 {
    1
}

impl Default for MarketDefinition {
    fn default() -> Self {
        Self {
            market_type: "WIN".into(),
            each_way_divisor: None,
            number_of_winners: 1,
            in_play: false,
        }
    }
}

/// A single runner (selection) within a market book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerBook {
    pub selection_id: u64,
    #[serde(default)]
    pub handicap: Decimal,
    pub status: RunnerStatus,
    #[serde(default)]
    pub last_price_traded: Option<Decimal>,
    #[serde(default)]
    pub adjustment_factor: Option<Decimal>,
}

impl RunnerBook {
    /// Selection key of this runner.
    #[must_use]
    pub fn key(&self) -> SelectionKey {
        SelectionKey::with_handicap(self.selection_id, self.handicap)
    }
}

/// Snapshot of a market's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketBook {
    pub market_id: MarketId,
    pub status: MarketStatus,
    pub publish_time: DateTime<Utc>,
    /// Identifier of the stream that produced this book.
    #[serde(default)]
    pub streaming_unique_id: Option<u64>,
    /// True when the book came from an initial image rather than an update.
    #[serde(default)]
    pub streaming_snap: bool,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub bet_delay: u32,
    #[serde(default)]
    pub market_definition: MarketDefinition,
    #[serde(default)]
    pub runners: Vec<RunnerBook>,
}

impl MarketBook {
    /// Number of winners defined for the market.
    #[must_use]
    pub fn number_of_winners(&self) -> u32 {
        self.market_definition.number_of_winners
    }

    /// Runners reported as winners.
    #[must_use]
    pub fn winner_count(&self) -> u32 {
        self.runners
            .iter()
            .filter(|r| r.status == RunnerStatus::Winner)
            .count() as u32
    }

    #[must_use]
    pub fn runner(&self, selection: &SelectionKey) -> Option<&RunnerBook> {
        self.runners.iter().find(|r| &r.key() == selection)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == MarketStatus::Closed
    }
}

/// Descriptive market metadata, fetched separately from the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCatalogue {
    pub market_id: MarketId,
    #[serde(default)]
    pub market_name: String,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub market_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_matched: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_book_parses_from_camel_case() {
        let json = r#"{
            "marketId": "1.23",
            "status": "OPEN",
            "publishTime": "2024-01-01T12:00:00Z",
            "streamingUniqueId": 1,
            "marketDefinition": {"marketType": "WIN", "numberOfWinners": 1, "inPlay": false},
            "runners": [{"selectionId": 123, "status": "ACTIVE"}]
        }"#;
        let book: MarketBook = serde_json::from_str(json).unwrap();
        assert_eq!(book.market_id.as_str(), "1.23");
        assert_eq!(book.status, MarketStatus::Open);
        assert_eq!(book.streaming_unique_id, Some(1));
        assert_eq!(book.runners[0].key(), SelectionKey::new(123));
        assert!(!book.streaming_snap);
    }

    #[test]
    fn winner_count_counts_winners() {
        let json = r#"{
            "marketId": "1.23",
            "status": "CLOSED",
            "publishTime": "2024-01-01T12:00:00Z",
            "runners": [
                {"selectionId": 1, "status": "WINNER"},
                {"selectionId": 2, "status": "WINNER"},
                {"selectionId": 3, "status": "LOSER"}
            ]
        }"#;
        let book: MarketBook = serde_json::from_str(json).unwrap();
        assert!(book.is_closed());
        assert_eq!(book.winner_count(), 2);
        assert_eq!(book.number_of_winners(), 1);
    }
}
