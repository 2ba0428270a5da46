//! Integration tests for replaying recorded events.

use std::io::Write;

use betflow::cli::replay;
use betflow::cli::ReplayArgs;
use betflow::config::Config;
use betflow::domain::RunnerStatus;
use betflow::engine::Event;
use betflow::testkit::domain::{closed_book, market_book, runner};
use tempfile::NamedTempFile;

fn write_events(events: &[Event]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for event in events {
        writeln!(file, "{}", serde_json::to_string(event).unwrap()).unwrap();
    }
    file
}

fn args(file: &NamedTempFile) -> ReplayArgs {
    ReplayArgs {
        events: file.path().to_path_buf(),
        match_orders: true,
        json_logs: false,
    }
}

#[tokio::test]
async fn replays_a_market_to_close() {
    let file = write_events(&[
        Event::MarketBook(vec![market_book("1.23", vec![runner(1, RunnerStatus::Active)])]),
        Event::MarketBook(vec![closed_book("1.23", vec![runner(1, RunnerStatus::Winner)])]),
    ]);

    replay::execute(&Config::default(), &args(&file)).await.unwrap();
}

#[tokio::test]
async fn malformed_event_fails_the_replay() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{\"type\":\"MARKET_BOOK\",\"data\":42}}").unwrap();

    let result = replay::execute(&Config::default(), &args(&file)).await;
    assert!(result.is_err());
}
