use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use crate::modules::jobs::domain::entities::{Job, UploadRef};
use crate::shared::domain::value_objects::Platform;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::HttpHandler;

/// What an uploader needs to know about the job being published
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadTarget {
    pub platform: Platform,
    pub client_id: String,
    pub backend_id: Option<String>,
    pub upload_ref: Option<UploadRef>,
    pub title: String,
    pub prompt: String,
}

impl UploadTarget {
    pub fn for_job(job: &Job, platform: Platform) -> Self {
        Self {
            platform,
            client_id: job.client_id.clone(),
            backend_id: job.backend_id.clone(),
            upload_ref: job.upload_ref.clone(),
            title: job.metadata.title.clone(),
            prompt: job.metadata.prompt.clone(),
        }
    }
}

#[async_trait]
pub trait PlatformUploader: Send + Sync {
    /// Upload the finished media; returns the platform's response body
    async fn upload(&self, target: &UploadTarget, fields: &HashMap<String, String>)
        -> AppResult<Value>;
}

/// Uploaders keyed by platform
#[derive(Default)]
pub struct PlatformRegistry {
    uploaders: DashMap<Platform, Arc<dyn PlatformUploader>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One HTTP uploader shared by every platform
    pub fn with_http(base_url: impl Into<String>) -> AppResult<Self> {
        let uploader: Arc<dyn PlatformUploader> = Arc::new(HttpPlatformUploader::new(base_url)?);
        let registry = Self::new();
        for platform in Platform::ALL {
            registry.register(platform, uploader.clone());
        }
        Ok(registry)
    }

    /// Register or replace the uploader for a platform
    pub fn register(&self, platform: Platform, uploader: Arc<dyn PlatformUploader>) {
        self.uploaders.insert(platform, uploader);
    }

    pub fn unregister(&self, platform: Platform) -> bool {
        self.uploaders.remove(&platform).is_some()
    }

    pub fn get(&self, platform: Platform) -> AppResult<Arc<dyn PlatformUploader>> {
        self.uploaders
            .get(&platform)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                AppError::ValidationError(format!("No uploader registered for {}", platform))
            })
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.uploaders.iter().map(|e| *e.key()).collect();
        platforms.sort();
        platforms
    }
}

/// Posts `{ job, fields }` to `{base_url}/{platform}/upload`
pub struct HttpPlatformUploader {
    client: Client,
    base_url: String,
}

impl HttpPlatformUploader {
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            client: HttpHandler::create_http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn upload_url(&self, platform: Platform) -> String {
        format!("{}/{}/upload", self.base_url, platform)
    }
}

#[async_trait]
impl PlatformUploader for HttpPlatformUploader {
    async fn upload(
        &self,
        target: &UploadTarget,
        fields: &HashMap<String, String>,
    ) -> AppResult<Value> {
        let response = self
            .client
            .post(self.upload_url(target.platform))
            .json(&json!({ "job": target, "fields": fields }))
            .send()
            .await?;
        let response =
            HttpHandler::ensure_success(response, target.platform.as_str(), "upload").await?;

        // Some platforms answer 204 with no body
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl PlatformUploader for Echo {
        async fn upload(
            &self,
            target: &UploadTarget,
            _fields: &HashMap<String, String>,
        ) -> AppResult<Value> {
            Ok(json!({ "platform": target.platform }))
        }
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let registry = PlatformRegistry::new();
        registry.register(Platform::TikTok, Arc::new(Echo));

        let job = Job::new(
            crate::modules::jobs::domain::entities::JobMetadata::new("clip", "p"),
            Platform::TikTok,
        );
        let uploader = registry.get(Platform::TikTok).unwrap();
        let response = uploader
            .upload(&UploadTarget::for_job(&job, Platform::TikTok), &HashMap::new())
            .await
            .unwrap();
        assert_eq!(response, json!({ "platform": "tiktok" }));

        assert!(matches!(
            registry.get(Platform::Reddit),
            Err(AppError::ValidationError(_))
        ));
        assert!(registry.unregister(Platform::TikTok));
        assert!(registry.platforms().is_empty());
    }

    #[test]
    fn test_http_registry_covers_every_platform() {
        let registry = PlatformRegistry::with_http("http://localhost:8081/").unwrap();
        assert_eq!(registry.platforms(), Platform::ALL.to_vec());

        let uploader = HttpPlatformUploader::new("http://localhost:8081/").unwrap();
        assert_eq!(
            uploader.upload_url(Platform::Instagram),
            "http://localhost:8081/instagram/upload"
        );
    }
}
