pub mod modules;
pub mod shared;

use std::sync::Arc;

pub use modules::engine::{EngineDiagnostics, EngineService};
pub use shared::{AppError, AppResult, EngineConfig};

use shared::notifications::LogNotificationSink;
use shared::utils::init_logger;

/// Build the engine from configuration and restore the persisted jobs.
/// Notifications go to the log; embedders wanting them elsewhere build
/// `EngineService` themselves.
pub async fn start(config: &EngineConfig) -> AppResult<Arc<EngineService>> {
    init_logger();

    log_info!(
        "Starting reelflow engine (backend {}, platforms {})",
        config.backend_base_url,
        config.platform_base_url
    );

    let engine = EngineService::from_config(config, Arc::new(LogNotificationSink)).await?;
    let restored = engine.restore().await?;
    log_info!("Engine ready with {} restored job(s)", restored);

    Ok(Arc::new(engine))
}
