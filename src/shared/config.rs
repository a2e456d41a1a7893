use std::path::PathBuf;
use std::time::Duration;

use crate::shared::errors::{AppError, AppResult};

pub const DEFAULT_NAMESPACE: &str = "reelflow.jobs";
pub const DEFAULT_POLL_LADDER_MS: [u64; 4] = [5_000, 10_000, 15_000, 30_000];
const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);
/// Completions older than a week before the oldest in-flight job are never queried
pub const MAX_SAFETY_MARGIN: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const DEFAULT_PROJECTION_DELAY: Duration = Duration::from_millis(250);

/// Runtime configuration for the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub backend_base_url: String,
    pub platform_base_url: String,
    pub state_dir: PathBuf,
    /// File stem of the persisted job snapshot
    pub namespace: String,
    pub poll_ladder: Vec<Duration>,
    /// Subtracted from the oldest in-flight job when querying completions
    pub safety_margin: Duration,
    pub poll_jitter: Duration,
    pub projection_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend_base_url: "http://localhost:8080/api".to_string(),
            platform_base_url: "http://localhost:8081".to_string(),
            state_dir: PathBuf::from(".reelflow"),
            namespace: DEFAULT_NAMESPACE.to_string(),
            poll_ladder: DEFAULT_POLL_LADDER_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            safety_margin: DEFAULT_SAFETY_MARGIN,
            poll_jitter: Duration::ZERO,
            projection_delay: DEFAULT_PROJECTION_DELAY,
        }
    }
}

impl EngineConfig {
    /// Build configuration from process environment variables.
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("REELFLOW_BACKEND_URL") {
            config.backend_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("REELFLOW_PLATFORM_URL") {
            config.platform_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = lookup("REELFLOW_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        if let Some(namespace) = lookup("REELFLOW_NAMESPACE") {
            if namespace.trim().is_empty() {
                return Err(AppError::ConfigError(
                    "REELFLOW_NAMESPACE cannot be empty".to_string(),
                ));
            }
            config.namespace = namespace.trim().to_string();
        }
        if let Some(ladder) = lookup("REELFLOW_POLL_LADDER_MS") {
            config.poll_ladder = parse_ladder(&ladder)?;
        }
        if let Some(secs) = lookup("REELFLOW_SAFETY_MARGIN_SECS") {
            let margin = Duration::from_secs(secs.trim().parse()?);
            if margin > MAX_SAFETY_MARGIN {
                return Err(AppError::ConfigError(format!(
                    "REELFLOW_SAFETY_MARGIN_SECS must be at most {}",
                    MAX_SAFETY_MARGIN.as_secs()
                )));
            }
            config.safety_margin = margin;
        }
        if let Some(ms) = lookup("REELFLOW_POLL_JITTER_MS") {
            config.poll_jitter = Duration::from_millis(ms.trim().parse()?);
        }
        if let Some(ms) = lookup("REELFLOW_PROJECTION_DELAY_MS") {
            config.projection_delay = Duration::from_millis(ms.trim().parse()?);
        }

        Ok(config)
    }
}

fn parse_ladder(raw: &str) -> AppResult<Vec<Duration>> {
    let rungs = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().map(Duration::from_millis))
        .collect::<Result<Vec<_>, _>>()?;

    if rungs.is_empty() {
        return Err(AppError::ConfigError(
            "REELFLOW_POLL_LADDER_MS needs at least one interval".to_string(),
        ));
    }
    Ok(rungs)
}
