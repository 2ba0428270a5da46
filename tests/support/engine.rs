//! Engine builders for integration tests.

use std::sync::Arc;

use betflow::config::Config;
use betflow::engine::{Engine, Event};
use betflow::execution::{Client, ExecutionMode, SimulatedExecutor};
use betflow::testkit::domain::{market_book, runner};
use betflow::testkit::executor::RecordingExecutor;
use betflow::domain::{MarketBook, RunnerStatus};

pub const LIVE_CLIENT: &str = "live";
pub const SIM_CLIENT: &str = "sim";

/// An engine with one live client whose packages are recorded.
pub fn recording_engine(config: &Config) -> (Engine, RecordingExecutor) {
    let executor = RecordingExecutor::new();
    let mut engine = Engine::new(config);
    engine
        .add_client(Client::new(
            LIVE_CLIENT,
            ExecutionMode::Live,
            Arc::new(executor.clone()),
        ))
        .unwrap();
    (engine, executor)
}

/// An engine with one simulated client answering on the engine's own queue.
pub fn simulated_engine(config: &Config, match_on_place: bool) -> Engine {
    let mut engine = Engine::new(config);
    let executor = SimulatedExecutor::new(engine.sender()).with_match_on_place(match_on_place);
    engine
        .add_client(Client::new(SIM_CLIENT, ExecutionMode::Simulated, Arc::new(executor)))
        .unwrap();
    engine
}

/// An open book with active runners for `selection_ids`.
pub fn open_book(market_id: &str, selection_ids: &[u64]) -> MarketBook {
    market_book(
        market_id,
        selection_ids
            .iter()
            .map(|id| runner(*id, RunnerStatus::Active))
            .collect(),
    )
}

pub fn book_event(market_id: &str, selection_ids: &[u64]) -> Event {
    Event::MarketBook(vec![open_book(market_id, selection_ids)])
}

/// Feed one event and drain everything it enqueued.
pub fn process_all(engine: &mut Engine, event: Event) {
    assert!(engine.process(event).unwrap());
    engine.process_pending().unwrap();
}
