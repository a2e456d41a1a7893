use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;

use super::api::BackendJobApi;
use super::dto::{RawCompletionRecord, SubmitJobRequest, SubmitJobResponse};
use crate::log_debug;
use crate::modules::jobs::domain::entities::{Job, UploadRef};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::HttpHandler;

/// JSON-over-HTTP client for the generation backend
///
/// - `POST {base}/jobs` submits a job
/// - `GET {base}/jobs/completions?after=<rfc3339>` lists unconsumed completions
/// - `POST {base}/jobs/{client_id}/completed` acknowledges a local match
pub struct HttpBackendClient {
    client: Client,
    base_url: String,
}

impl HttpBackendClient {
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            client: HttpHandler::create_http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/jobs/completions", self.base_url)
    }
}

#[async_trait]
impl BackendJobApi for HttpBackendClient {
    async fn submit_job(&self, job: &Job) -> AppResult<UploadRef> {
        let url = format!("{}/jobs", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SubmitJobRequest::from(job))
            .send()
            .await?;
        let response = HttpHandler::ensure_success(response, "Backend", "submit job").await?;

        let body = response.json::<SubmitJobResponse>().await.map_err(|e| {
            AppError::SerializationError(format!("Failed to parse submit response: {}", e))
        })?;
        Ok(body.into())
    }

    async fn query_completions_after(
        &self,
        after: DateTime<Utc>,
    ) -> AppResult<Vec<RawCompletionRecord>> {
        let after = after.to_rfc3339_opts(SecondsFormat::Millis, true);
        log_debug!("Querying completions after {}", after);

        let response = self
            .client
            .get(self.completions_url())
            .query(&[("after", after.as_str())])
            .send()
            .await?;
        let response =
            HttpHandler::ensure_success(response, "Backend", "query completions").await?;

        response
            .json::<Vec<RawCompletionRecord>>()
            .await
            .map_err(|e| {
                AppError::SerializationError(format!("Failed to parse completions: {}", e))
            })
    }

    async fn notify_job_completed(&self, client_id: &str) -> AppResult<()> {
        let url = format!("{}/jobs/{}/completed", self.base_url, client_id);
        let response = self.client.post(&url).send().await?;
        HttpHandler::ensure_success(response, "Backend", "acknowledge completion").await?;
        Ok(())
    }
}
