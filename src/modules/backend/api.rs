use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::dto::RawCompletionRecord;
use crate::modules::jobs::domain::entities::{Job, UploadRef};
use crate::shared::errors::AppResult;

/// The generation backend as the engine sees it
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendJobApi: Send + Sync {
    /// Submit a freshly created job; returns the identifiers the backend assigned
    async fn submit_job(&self, job: &Job) -> AppResult<UploadRef>;

    /// Completions the backend has not seen consumed, finished after `after`
    async fn query_completions_after(
        &self,
        after: DateTime<Utc>,
    ) -> AppResult<Vec<RawCompletionRecord>>;

    /// Best-effort acknowledgement that a job was matched locally
    async fn notify_job_completed(&self, client_id: &str) -> AppResult<()>;
}
