use anyhow::Context;
use reelflow_lib::{log_info, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let engine = reelflow_lib::start(&config)
        .await
        .context("failed to start engine")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    log_info!("Shutdown signal received");
    engine.shutdown().await;
    Ok(())
}
