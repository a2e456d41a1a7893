//! Wire shapes exchanged with the generation backend.
//!
//! Completion payloads arrive loosely typed; they are validated into
//! `CompletionRecord` here and malformed entries are dropped with a warning
//! instead of leaking missing fields into the store.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::log_warn;
use crate::modules::jobs::domain::entities::{CompletionRecord, Job, UploadRef};
use crate::shared::errors::{AppError, AppResult};

/// A completion payload exactly as the backend sent it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCompletionRecord {
    #[serde(default, alias = "backendId", alias = "id")]
    pub backend_id: Option<Value>,
    /// RFC 3339 text or epoch milliseconds
    #[serde(default, alias = "completedAt")]
    pub completed_at: Option<Value>,
    #[serde(default, alias = "uploadRef", alias = "storageKey")]
    pub upload_ref: Option<Value>,
}

impl RawCompletionRecord {
    pub fn new(backend_id: impl Into<Value>, completed_at: DateTime<Utc>) -> Self {
        Self {
            backend_id: Some(backend_id.into()),
            completed_at: Some(Value::String(completed_at.to_rfc3339())),
            upload_ref: None,
        }
    }

    pub fn with_upload_ref(mut self, upload_ref: impl Into<String>) -> Self {
        self.upload_ref = Some(Value::String(upload_ref.into()));
        self
    }
}

fn parse_backend_id(value: Option<&Value>) -> AppResult<String> {
    let id = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(AppError::ValidationError(format!(
                "backend_id must be a string or number, got {}",
                other
            )))
        }
        None => String::new(),
    };

    if id.is_empty() {
        return Err(AppError::ValidationError(
            "completion is missing backend_id".to_string(),
        ));
    }
    Ok(id)
}

fn parse_completed_at(value: Option<&Value>) -> AppResult<DateTime<Utc>> {
    match value {
        Some(Value::String(s)) => Ok(DateTime::parse_from_rfc3339(s.trim())?.with_timezone(&Utc)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| {
                AppError::ValidationError(format!("completed_at {} is out of range", n))
            }),
        Some(other) => Err(AppError::ValidationError(format!(
            "completed_at must be RFC 3339 text or epoch millis, got {}",
            other
        ))),
        None => Err(AppError::ValidationError(
            "completion is missing completed_at".to_string(),
        )),
    }
}

impl TryFrom<RawCompletionRecord> for CompletionRecord {
    type Error = AppError;

    fn try_from(raw: RawCompletionRecord) -> Result<Self, Self::Error> {
        let backend_id = parse_backend_id(raw.backend_id.as_ref())?;
        let completed_at = parse_completed_at(raw.completed_at.as_ref())?;
        let upload_ref = match raw.upload_ref {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Ok(CompletionRecord {
            backend_id,
            completed_at,
            upload_ref,
        })
    }
}

/// Validate a batch, keeping well-formed records and logging the rest
pub fn validate_completions(raw: Vec<RawCompletionRecord>) -> (Vec<CompletionRecord>, usize) {
    let mut rejected = 0;
    let records = raw
        .into_iter()
        .filter_map(|record| match CompletionRecord::try_from(record.clone()) {
            Ok(valid) => Some(valid),
            Err(e) => {
                rejected += 1;
                log_warn!("Rejecting malformed completion {:?}: {}", record, e);
                None
            }
        })
        .collect();
    (records, rejected)
}

/// Body of the job submission call
#[derive(Debug, Clone, Serialize)]
pub struct SubmitJobRequest<'a> {
    pub client_id: &'a str,
    pub title: &'a str,
    pub prompt: &'a str,
    pub location: Option<&'a str>,
    pub platform: String,
}

impl<'a> From<&'a Job> for SubmitJobRequest<'a> {
    fn from(job: &'a Job) -> Self {
        Self {
            client_id: &job.client_id,
            title: &job.metadata.title,
            prompt: &job.metadata.prompt,
            location: job.metadata.location.as_deref(),
            platform: job.platform_target.to_string(),
        }
    }
}

/// Identifiers the backend assigns when it accepts a job
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitJobResponse {
    #[serde(default, alias = "jobId", alias = "job_id")]
    pub job_handle: Option<String>,
    #[serde(default, alias = "storageKey")]
    pub storage_key: Option<String>,
}

impl From<SubmitJobResponse> for UploadRef {
    fn from(response: SubmitJobResponse) -> Self {
        UploadRef {
            job_handle: response.job_handle,
            storage_key: response.storage_key,
        }
    }
}
