use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::errors::AppError;

/// Publish destinations a generated job can be sent to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    /// YouTube (Shorts and regular uploads) - Default target
    #[serde(rename = "youtube")]
    YouTube,
    #[serde(rename = "reddit")]
    Reddit,
    #[serde(rename = "tiktok")]
    TikTok,
    #[serde(rename = "instagram")]
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::YouTube,
        Platform::Reddit,
        Platform::TikTok,
        Platform::Instagram,
    ];

    /// Fields that must be present and non-blank before an upload is attempted
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Platform::YouTube => &["title"],
            Platform::Reddit => &["subreddit", "title"],
            Platform::TikTok => &["caption"],
            Platform::Instagram => &["caption"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Reddit => "reddit",
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::YouTube
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "youtube" => Ok(Platform::YouTube),
            "reddit" => Ok(Platform::Reddit),
            "tiktok" => Ok(Platform::TikTok),
            "instagram" => Ok(Platform::Instagram),
            _ => Err(AppError::ValidationError(format!("Unknown platform: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trips_through_text() {
        for platform in Platform::ALL {
            assert_eq!(platform.to_string().parse::<Platform>().unwrap(), platform);
        }
        assert_eq!("YouTube".parse::<Platform>().unwrap(), Platform::YouTube);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_reddit_requires_subreddit_and_title() {
        assert_eq!(Platform::Reddit.required_fields(), &["subreddit", "title"]);
        assert_eq!(Platform::default(), Platform::YouTube);
    }
}
