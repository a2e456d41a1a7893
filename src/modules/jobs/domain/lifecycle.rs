//! Pure lifecycle transforms.
//!
//! Each function takes the current job and returns the next version of it,
//! or a typed error when the transition table forbids the move. The store
//! applies them through its single mutation gateway.

use chrono::{DateTime, Utc};

use super::entities::{CompletionRecord, Job, UploadRef};
use super::value_objects::JobState;
use crate::shared::errors::{AppError, AppResult};

fn ensure_transition(job: &Job, to: JobState) -> AppResult<()> {
    if job.state.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            client_id: job.client_id.clone(),
            from: job.state,
            to,
        })
    }
}

/// PROCESSING -> READY, taking the backend identity of the completion
pub fn mark_ready(job: &Job, record: &CompletionRecord) -> AppResult<Job> {
    ensure_transition(job, JobState::Ready)?;

    let upload_ref = match (&job.upload_ref, &record.upload_ref) {
        (Some(current), Some(key)) => Some(current.merge(&UploadRef::storage(key))),
        (None, Some(key)) => Some(UploadRef::storage(key)),
        (current, None) => current.clone(),
    };

    Ok(Job {
        backend_id: Some(record.backend_id.clone()),
        state: JobState::Ready,
        completed_at: Some(record.completed_at),
        upload_ref,
        ..job.clone()
    })
}

/// READY -> UPLOADED. A job that is already uploaded stays as it is, which
/// is what a re-publish needs.
pub fn mark_uploaded(job: &Job) -> AppResult<Job> {
    if job.state == JobState::Uploaded {
        return Ok(job.clone());
    }
    ensure_transition(job, JobState::Uploaded)?;

    Ok(Job {
        state: JobState::Uploaded,
        ..job.clone()
    })
}

/// Any non-terminal state -> FAILED; terminal jobs are returned unchanged
pub fn mark_failed(job: &Job, at: DateTime<Utc>) -> AppResult<Job> {
    if job.state.is_terminal() {
        return Ok(job.clone());
    }
    ensure_transition(job, JobState::Failed)?;

    Ok(Job {
        state: JobState::Failed,
        failed_at: Some(at),
        ..job.clone()
    })
}

/// Merge backend identifiers without touching the lifecycle state
pub fn attach_upload_ref(job: &Job, upload_ref: &UploadRef) -> Job {
    let merged = match &job.upload_ref {
        Some(current) => current.merge(upload_ref),
        None => upload_ref.clone(),
    };

    Job {
        upload_ref: Some(merged),
        ..job.clone()
    }
}
