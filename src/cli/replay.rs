//! Handler for the `replay` command.
//!
//! Replays a recorded event file through the engine. A producer task reads
//! the file line by line and enqueues each event; the engine drains the
//! queue on the current task until the producer sends the terminator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::cli::ReplayArgs;
use crate::config::Config;
use crate::engine::{Engine, Event, EventSender};
use crate::error::Result;
use crate::execution::{Client, ExecutionMode, SimulatedExecutor};

/// Client id used for the replay's simulated client.
pub const REPLAY_CLIENT_ID: &str = "replay";

/// Execute the replay command.
pub async fn execute(config: &Config, args: &ReplayArgs) -> Result<()> {
    let mut engine = Engine::new(config);
    let executor =
        SimulatedExecutor::new(engine.sender()).with_match_on_place(args.match_orders);
    engine.add_client(Client::new(
        REPLAY_CLIENT_ID,
        ExecutionMode::Simulated,
        Arc::new(executor),
    ))?;

    info!(path = %args.events.display(), "Starting replay");
    let producer = tokio::spawn(produce(args.events.clone(), engine.sender()));

    engine.run().await?;

    match producer.await {
        Ok(Ok(count)) => info!(
            events = count,
            markets = engine.markets().len(),
            "Replay complete"
        ),
        Ok(Err(e)) => return Err(e),
        Err(e) => error!(error = %e, "Replay producer task failed"),
    }
    Ok(())
}

/// Enqueue every event in `path`, then the terminator.
///
/// The terminator is sent even when reading fails so the engine stops.
async fn produce(path: PathBuf, sender: EventSender) -> Result<usize> {
    let result = read_events(&path, &sender).await;
    if let Err(e) = &result {
        error!(path = %path.display(), error = %e, "Failed to read replay file");
    }
    sender.send(Event::Terminator).await?;
    result
}

async fn read_events(path: &Path, sender: &EventSender) -> Result<usize> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut count = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: Event = serde_json::from_str(line)?;
        sender.send(event).await?;
        count += 1;
    }
    Ok(count)
}
