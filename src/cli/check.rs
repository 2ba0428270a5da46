//! Handler for the `check` command.

use std::path::Path;

use crate::config::Config;
use crate::error::Result;

/// Validate a configuration file without starting the engine.
pub fn execute<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());
    println!();

    let config = Config::load(path)?;

    println!("✓ Configuration file is valid");
    println!();
    println!("Summary:");
    println!("  Log level: {} ({})", config.logging.level, config.logging.format);
    println!("  Simulated: {}", config.engine.simulated);
    println!("  Raise errors: {}", config.engine.raise_errors);
    println!("  Queue capacity: {}", config.engine.queue_capacity);
    println!(
        "  Closed market retention: {}s",
        config.engine.closed_market_retention_secs
    );
    println!("  Async placement: {}", config.execution.async_place_orders);
    println!("  Workers: {}", config.execution.workers);
    let limits = &config.execution.package_limits;
    println!(
        "  Package limits: place {} / cancel {} / update {} / replace {}",
        limits.place, limits.cancel, limits.update, limits.replace
    );
    println!();
    println!("Configuration is ready to use.");
    Ok(())
}
