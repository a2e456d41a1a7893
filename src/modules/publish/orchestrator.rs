/// Publish orchestrator
///
/// Fans one job out to every requested platform at once and waits for all of
/// them to settle. One failing platform never stops the others; the job is
/// promoted to UPLOADED as soon as a single platform accepted it.
use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tracing::Instrument;

use super::request::{PlatformFields, PlatformResult, PublishOutcome, PublishRequest};
use super::uploader::{PlatformRegistry, UploadTarget};
use crate::modules::jobs::domain::entities::Job;
use crate::modules::jobs::domain::value_objects::JobState;
use crate::modules::jobs::store::JobStore;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::notifications::{Notification, NotificationSink};
use crate::shared::utils::{LogContext, TimedOperation};
use crate::{log_info, log_warn};

pub struct PublishOrchestrator {
    store: Arc<JobStore>,
    registry: Arc<PlatformRegistry>,
    notifier: Arc<dyn NotificationSink>,
}

impl PublishOrchestrator {
    pub fn new(
        store: Arc<JobStore>,
        registry: Arc<PlatformRegistry>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            registry,
            notifier,
        }
    }

    /// Publish a READY (or already UPLOADED) job.
    ///
    /// Errors are only returned for the job itself (unknown, not publishable,
    /// nothing requested); per-platform failures are part of the outcome.
    pub async fn publish(&self, client_id: &str, request: PublishRequest) -> AppResult<PublishOutcome> {
        let job = self.store.get(client_id).await?;
        if !job.is_publishable() {
            return Err(AppError::InvalidTransition {
                client_id: job.client_id,
                from: job.state,
                to: JobState::Uploaded,
            });
        }
        if request.platforms.is_empty() {
            return Err(AppError::ValidationError(
                "Publish request names no platforms".to_string(),
            ));
        }

        let timer = TimedOperation::new("publish fan-out");
        log_info!(
            "Publishing job {} to {} platform(s)",
            job.client_id,
            request.platforms.len()
        );

        let calls = request
            .platforms
            .into_iter()
            .map(|entry| self.dispatch(&job, entry));
        let results = join_all(calls).await;

        for result in &results {
            self.report(&job, result);
        }

        let outcome = PublishOutcome::from_results(results);
        if outcome.overall_ok {
            // The job may have been reset away while uploads were in flight
            match self.store.transition_to_uploaded(&job.client_id).await {
                Ok(_) => {}
                Err(e) if e.is_state_error() => {
                    log_warn!("Publish of {} succeeded but job was not promoted: {}", job.client_id, e)
                }
                Err(e) => LogContext::error_with_context(
                    &e,
                    &format!("Failed to promote {} after publish", job.client_id),
                ),
            }
        }

        timer.finish_with_info(&format!(
            "{} succeeded, {} failed",
            outcome.succeeded.len(),
            outcome.failed.len()
        ));
        Ok(outcome)
    }

    /// One platform call. Missing fields or a missing uploader settle as a
    /// failure without touching the network.
    async fn dispatch(&self, job: &Job, entry: PlatformFields) -> PlatformResult {
        let platform = entry.platform;
        let span = tracing::info_span!(
            "platform_upload",
            platform = %platform,
            client_id = %job.client_id
        );

        let outcome = async {
            entry.validate()?;
            let uploader = self.registry.get(platform)?;
            let target = UploadTarget::for_job(job, platform);
            uploader.upload(&target, &entry.fields).await
        }
        .instrument(span)
        .await;

        PlatformResult { platform, outcome }
    }

    fn report(&self, job: &Job, result: &PlatformResult) {
        match &result.outcome {
            Ok(response) => {
                LogContext::publish_result(result.platform.as_str(), &job.client_id, None);
                self.notifier.notify(Notification::success(
                    format!("Published to {}", result.platform),
                    Some(json!({
                        "client_id": job.client_id,
                        "platform": result.platform,
                        "response": response,
                    })),
                ));
            }
            Err(e) => {
                let error = e.to_string();
                LogContext::publish_result(result.platform.as_str(), &job.client_id, Some(&error));
                self.notifier.notify(Notification::error(
                    format!("Publishing to {} failed: {}", result.platform, error),
                    Some(json!({
                        "client_id": job.client_id,
                        "platform": result.platform,
                        "error": e,
                    })),
                ));
            }
        }
    }
}
