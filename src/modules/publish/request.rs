//! Publish request and result shapes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::domain::value_objects::Platform;
use crate::shared::errors::{AppError, AppResult};

/// Free-form fields for one platform (title, caption, subreddit, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformFields {
    pub platform: Platform,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

impl PlatformFields {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            fields: HashMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Required fields that are absent or blank
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.platform
            .required_fields()
            .iter()
            .copied()
            .filter(|key| {
                self.fields
                    .get(*key)
                    .map_or(true, |value| value.trim().is_empty())
            })
            .collect()
    }

    pub fn validate(&self) -> AppResult<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            return Ok(());
        }
        Err(AppError::ValidationError(format!(
            "{} requires {}",
            self.platform,
            missing.join(", ")
        )))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub platforms: Vec<PlatformFields>,
}

impl PublishRequest {
    pub fn new(platforms: Vec<PlatformFields>) -> Self {
        Self { platforms }
    }
}

/// Settled result of one platform call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformResult {
    pub platform: Platform,
    pub outcome: Result<Value, AppError>,
}

impl PlatformResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishOutcome {
    /// At least one platform accepted the upload
    pub overall_ok: bool,
    pub succeeded: Vec<Platform>,
    pub failed: Vec<Platform>,
    pub results: Vec<PlatformResult>,
}

impl PublishOutcome {
    pub fn from_results(results: Vec<PlatformResult>) -> Self {
        let (succeeded, failed): (Vec<&PlatformResult>, Vec<&PlatformResult>) =
            results.iter().partition(|result| result.is_success());
        let succeeded: Vec<Platform> = succeeded.iter().map(|r| r.platform).collect();
        let failed: Vec<Platform> = failed.iter().map(|r| r.platform).collect();

        Self {
            overall_ok: !succeeded.is_empty(),
            succeeded,
            failed,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_fields_per_platform() {
        let reddit = PlatformFields::new(Platform::Reddit).with("title", "Sunset");
        assert_eq!(reddit.missing_required(), vec!["subreddit"]);
        assert!(matches!(
            reddit.validate(),
            Err(AppError::ValidationError(msg)) if msg == "reddit requires subreddit"
        ));

        let tiktok = PlatformFields::new(Platform::TikTok).with("caption", "   ");
        assert_eq!(tiktok.missing_required(), vec!["caption"]);

        let youtube = PlatformFields::new(Platform::YouTube).with("title", "Sunset");
        assert!(youtube.validate().is_ok());
    }

    #[test]
    fn test_outcome_partitions_results() {
        let outcome = PublishOutcome::from_results(vec![
            PlatformResult {
                platform: Platform::YouTube,
                outcome: Ok(json!({"id": "yt-1"})),
            },
            PlatformResult {
                platform: Platform::Reddit,
                outcome: Err(AppError::ValidationError("missing".to_string())),
            },
        ]);

        assert!(outcome.overall_ok);
        assert_eq!(outcome.succeeded, vec![Platform::YouTube]);
        assert_eq!(outcome.failed, vec![Platform::Reddit]);

        let none = PublishOutcome::from_results(vec![]);
        assert!(!none.overall_ok);
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let request: PublishRequest = serde_json::from_value(json!({
            "platforms": [
                {"platform": "instagram", "fields": {"caption": "hi"}},
                {"platform": "youtube"}
            ]
        }))
        .unwrap();

        assert_eq!(request.platforms.len(), 2);
        assert!(request.platforms[0].validate().is_ok());
        assert_eq!(request.platforms[1].missing_required(), vec!["title"]);
    }
}
