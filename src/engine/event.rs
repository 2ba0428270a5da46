//! Inbound events and the bounded queue that carries them.
//!
//! Producers (market and order streams, simulated execution, replay) push
//! events; the engine is the single consumer.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::{ClearedMarkets, ClearedOrders, CurrentOrders, MarketBook, MarketCatalogue};
use crate::error::{Error, Result};

/// An event for the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    MarketBook(Vec<MarketBook>),
    MarketCatalogue(Vec<MarketCatalogue>),
    /// Unparsed stream data. Not handled by the dispatcher.
    RawData(Value),
    CurrentOrders(Vec<CurrentOrders>),
    ClearedMarkets(ClearedMarkets),
    ClearedOrders(ClearedOrders),
    CloseMarket(MarketBook),
    /// Stops the event loop.
    Terminator,
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MarketBook(_) => "MARKET_BOOK",
            Self::MarketCatalogue(_) => "MARKET_CATALOGUE",
            Self::RawData(_) => "RAW_DATA",
            Self::CurrentOrders(_) => "CURRENT_ORDERS",
            Self::ClearedMarkets(_) => "CLEARED_MARKETS",
            Self::ClearedOrders(_) => "CLEARED_ORDERS",
            Self::CloseMarket(_) => "CLOSE_MARKET",
            Self::Terminator => "TERMINATOR",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// An event stamped with the time it entered the queue.
#[derive(Debug)]
pub struct QueuedEvent {
    pub event: Event,
    pub created_at: Instant,
}

impl QueuedEvent {
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self {
            event,
            created_at: Instant::now(),
        }
    }

    /// Time spent waiting in the queue.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Create a bounded event queue.
#[must_use]
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { tx }, EventReceiver { rx })
}

/// Producer half of the event queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<QueuedEvent>,
}

impl EventSender {
    /// Enqueue an event, waiting for capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if the engine has stopped.
    pub async fn send(&self, event: Event) -> Result<()> {
        self.tx
            .send(QueuedEvent::new(event))
            .await
            .map_err(|_| Error::QueueClosed)
    }

    /// Enqueue an event without waiting.
    ///
    /// # Errors
    ///
    /// Hands the event back if the queue is full or closed.
    pub fn try_send(&self, event: Event) -> std::result::Result<(), TrySendError<Event>> {
        self.tx
            .try_send(QueuedEvent::new(event))
            .map_err(|err| match err {
                TrySendError::Full(queued) => TrySendError::Full(queued.event),
                TrySendError::Closed(queued) => TrySendError::Closed(queued.event),
            })
    }

    /// Enqueue from a thread outside the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if the engine has stopped.
    pub fn blocking_send(&self, event: Event) -> Result<()> {
        self.tx
            .blocking_send(QueuedEvent::new(event))
            .map_err(|_| Error::QueueClosed)
    }

    /// Free slots in the queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// Consumer half of the event queue, owned by the engine.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<QueuedEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<QueuedEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is ready.
    pub fn try_recv(&mut self) -> Option<QueuedEvent> {
        self.rx.try_recv().ok()
    }
}
