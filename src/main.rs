mod buffer;
mod collector;
mod config;
mod error;
mod sensor;
mod storage;

use crate::collector::Collector;
use crate::config::Config;
use crate::storage::RemovableStorage;
use anyhow::Result;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,temp_logger=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing()?;

    let sensors = sensor::discover(&config)?;
    tracing::info!(
        count = sensors.len(),
        fixture = config.use_fixture_sensors,
        "discovered temperature sensors"
    );

    let source = sensor::build_source(&config);
    let storage = RemovableStorage::new(config.storage_device.clone(), config.mount_point.clone());
    let mut collector = Collector::new(&config, sensors, source, storage);

    tracing::info!(
        device = %config.storage_device,
        read_interval_seconds = config.read_interval_seconds,
        write_interval_minutes = config.write_interval_minutes,
        "temp-logger starting"
    );

    tokio::select! {
        res = collector.run() => {
            // The loop only exits on a read failure past the retry budget.
            res?;
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
    }
}
