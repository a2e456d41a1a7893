/// Test data factories
///
/// Provides convenient methods to create test data with sensible defaults
use chrono::{DateTime, TimeZone, Utc};
use reelflow_lib::modules::jobs::JobMetadata;
use reelflow_lib::modules::publish::{PlatformFields, PublishRequest};
use reelflow_lib::shared::domain::value_objects::Platform;
use reelflow_lib::EngineConfig;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

pub fn metadata(title: &str) -> JobMetadata {
    JobMetadata::new(title, format!("a short clip about {}", title.to_lowercase()))
}

/// A fixed instant for tests that do not go through `Utc::now()`
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap()
}

/// Defaults with a short projection delay
pub fn config() -> EngineConfig {
    EngineConfig {
        projection_delay: Duration::from_millis(10),
        ..EngineConfig::default()
    }
}

/// A configuration whose snapshot lives in a fresh temporary directory
pub fn config_with_state_dir() -> EngineConfig {
    EngineConfig {
        state_dir: temp_state_dir(),
        ..config()
    }
}

pub fn temp_state_dir() -> PathBuf {
    std::env::temp_dir().join(format!("reelflow-test-{}", Uuid::new_v4()))
}

pub struct PublishRequestFactory {
    platforms: Vec<PlatformFields>,
}

impl PublishRequestFactory {
    pub fn new() -> Self {
        Self {
            platforms: Vec::new(),
        }
    }

    pub fn youtube(mut self, title: &str) -> Self {
        self.platforms
            .push(PlatformFields::new(Platform::YouTube).with("title", title));
        self
    }

    pub fn reddit(mut self, subreddit: Option<&str>, title: &str) -> Self {
        let mut fields = PlatformFields::new(Platform::Reddit).with("title", title);
        if let Some(subreddit) = subreddit {
            fields = fields.with("subreddit", subreddit);
        }
        self.platforms.push(fields);
        self
    }

    pub fn tiktok(mut self, caption: &str) -> Self {
        self.platforms
            .push(PlatformFields::new(Platform::TikTok).with("caption", caption));
        self
    }

    pub fn instagram(mut self, caption: &str) -> Self {
        self.platforms
            .push(PlatformFields::new(Platform::Instagram).with("caption", caption));
        self
    }

    pub fn build(self) -> PublishRequest {
        PublishRequest::new(self.platforms)
    }
}
