/// Domain entities for the job lifecycle
///
/// A job is one creative-generation request produced by an external backend
/// and, once ready, published to one or more platforms.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{JobOrigin, JobState};
use crate::shared::domain::value_objects::Platform;

/// Descriptive data carried by a job; the engine never interprets it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub title: String,
    pub prompt: String,
    pub location: Option<String>,
}

impl JobMetadata {
    pub fn new(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Backend identifiers attached after creation, independent of job state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRef {
    /// Backend handle of the generation job
    pub job_handle: Option<String>,
    /// Storage key of the produced asset
    pub storage_key: Option<String>,
}

impl UploadRef {
    pub fn handle(job_handle: impl Into<String>) -> Self {
        Self {
            job_handle: Some(job_handle.into()),
            storage_key: None,
        }
    }

    pub fn storage(storage_key: impl Into<String>) -> Self {
        Self {
            job_handle: None,
            storage_key: Some(storage_key.into()),
        }
    }

    /// Fields present in `other` win; absent ones keep the current value
    pub fn merge(&self, other: &UploadRef) -> UploadRef {
        UploadRef {
            job_handle: other.job_handle.clone().or_else(|| self.job_handle.clone()),
            storage_key: other.storage_key.clone().or_else(|| self.storage_key.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.job_handle.is_none() && self.storage_key.is_none()
    }
}

/// A validated signal that the backend finished one unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub backend_id: String,
    pub completed_at: DateTime<Utc>,
    pub upload_ref: Option<String>,
}

impl CompletionRecord {
    pub fn new(backend_id: impl Into<String>, completed_at: DateTime<Utc>) -> Self {
        Self {
            backend_id: backend_id.into(),
            completed_at,
            upload_ref: None,
        }
    }

    pub fn with_upload_ref(mut self, upload_ref: impl Into<String>) -> Self {
        self.upload_ref = Some(upload_ref.into());
        self
    }
}

/// A tracked unit of generation/publication work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub client_id: String,
    pub backend_id: Option<String>,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub platform_target: Platform,
    pub metadata: JobMetadata,
    pub upload_ref: Option<UploadRef>,
    #[serde(default)]
    pub origin: JobOrigin,
}

impl Job {
    /// Create a new in-flight job with a fresh client id
    pub fn new(metadata: JobMetadata, platform_target: Platform) -> Self {
        Self::processing_at(metadata, platform_target, Utc::now())
    }

    /// Create a new in-flight job with an explicit creation time
    pub fn processing_at(
        metadata: JobMetadata,
        platform_target: Platform,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client_id: Uuid::new_v4().to_string(),
            backend_id: None,
            state: JobState::Processing,
            created_at,
            completed_at: None,
            failed_at: None,
            platform_target,
            metadata,
            upload_ref: None,
            origin: JobOrigin::Client,
        }
    }

    /// Materialize a completion nobody was waiting for as a ready job.
    /// It is dated by its completion so the view files it where it happened.
    pub fn orphan(record: &CompletionRecord) -> Self {
        Self {
            client_id: Uuid::new_v4().to_string(),
            backend_id: Some(record.backend_id.clone()),
            state: JobState::Ready,
            created_at: record.completed_at.min(Utc::now()),
            completed_at: Some(record.completed_at),
            failed_at: None,
            platform_target: Platform::default(),
            metadata: JobMetadata::default(),
            upload_ref: record.upload_ref.as_ref().map(UploadRef::storage),
            origin: JobOrigin::Orphan,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.state == JobState::Processing
    }

    pub fn is_publishable(&self) -> bool {
        matches!(self.state, JobState::Ready | JobState::Uploaded)
    }
}

/// Store statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStatistics {
    pub processing_count: usize,
    pub ready_count: usize,
    pub uploaded_count: usize,
    pub failed_count: usize,
    pub orphan_count: usize,
    pub total_count: usize,
}

impl JobStatistics {
    pub fn from_jobs(jobs: &[Job]) -> Self {
        jobs.iter().fold(Self::default(), |mut stats, job| {
            match job.state {
                JobState::Processing => stats.processing_count += 1,
                JobState::Ready => stats.ready_count += 1,
                JobState::Uploaded => stats.uploaded_count += 1,
                JobState::Failed => stats.failed_count += 1,
            }
            if job.origin == JobOrigin::Orphan {
                stats.orphan_count += 1;
            }
            stats.total_count += 1;
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_processing_with_unique_id() {
        let a = Job::new(JobMetadata::new("Sunset", "a sunset"), Platform::YouTube);
        let b = Job::new(JobMetadata::new("Sunset", "a sunset"), Platform::YouTube);

        assert_eq!(a.state, JobState::Processing);
        assert_ne!(a.client_id, b.client_id);
        assert!(a.backend_id.is_none());
        assert!(Uuid::parse_str(&a.client_id).is_ok());
    }

    #[test]
    fn test_orphan_is_ready_with_backend_identity() {
        let record = CompletionRecord::new("77", Utc::now()).with_upload_ref("videos/77.mp4");
        let job = Job::orphan(&record);

        assert_eq!(job.state, JobState::Ready);
        assert_eq!(job.origin, JobOrigin::Orphan);
        assert_eq!(job.backend_id.as_deref(), Some("77"));
        assert_eq!(job.completed_at, Some(record.completed_at));
        assert_eq!(
            job.upload_ref.unwrap().storage_key.as_deref(),
            Some("videos/77.mp4")
        );
    }

    #[test]
    fn test_orphan_is_dated_by_its_completion() {
        let three_days_ago = Utc::now() - chrono::Duration::days(3);
        let stale = Job::orphan(&CompletionRecord::new("1", three_days_ago));
        assert_eq!(stale.created_at, three_days_ago);

        // A backend clock running ahead never dates a job in the future
        let ahead = Utc::now() + chrono::Duration::hours(1);
        let early = Job::orphan(&CompletionRecord::new("2", ahead));
        assert!(early.created_at < ahead);
        assert!(early.created_at <= Utc::now());
    }

    #[test]
    fn test_upload_ref_merge_keeps_existing_fields() {
        let current = UploadRef::handle("gen-1");
        let merged = current.merge(&UploadRef::storage("assets/1.mp4"));

        assert_eq!(merged.job_handle.as_deref(), Some("gen-1"));
        assert_eq!(merged.storage_key.as_deref(), Some("assets/1.mp4"));
        assert!(!merged.is_empty());
    }

    #[test]
    fn test_job_without_origin_deserializes_as_client() {
        let job = Job::new(JobMetadata::default(), Platform::Reddit);
        let mut value = serde_json::to_value(&job).unwrap();
        value.as_object_mut().unwrap().remove("origin");

        let restored: Job = serde_json::from_value(value).unwrap();
        assert_eq!(restored.origin, JobOrigin::Client);
    }

    #[test]
    fn test_statistics_count_each_state() {
        let mut ready = Job::new(JobMetadata::default(), Platform::YouTube);
        ready.state = JobState::Ready;
        let orphan = Job::orphan(&CompletionRecord::new("1", Utc::now()));
        let processing = Job::new(JobMetadata::default(), Platform::YouTube);

        let stats = JobStatistics::from_jobs(&[ready, orphan, processing]);
        assert_eq!(stats.ready_count, 2);
        assert_eq!(stats.processing_count, 1);
        assert_eq!(stats.orphan_count, 1);
        assert_eq!(stats.total_count, 3);
    }
}
