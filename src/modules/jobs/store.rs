/// In-memory job record store
///
/// The store owns the authoritative job collection. Every mutation goes
/// through one write lock, is persisted through the snapshot repository and
/// bumps a revision counter that derived views subscribe to.
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};

use crate::modules::jobs::domain::entities::{
    CompletionRecord, Job, JobMetadata, JobStatistics, UploadRef,
};
use crate::modules::jobs::domain::lifecycle;
use crate::modules::jobs::domain::repository::JobSnapshotRepository;
use crate::shared::domain::value_objects::Platform;
use crate::shared::errors::{AppError, AppResult};
use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Default)]
struct StoreInner {
    jobs: Vec<Job>,
    selected: Option<String>,
}

impl StoreInner {
    fn position(&self, client_id: &str) -> Option<usize> {
        self.jobs.iter().position(|job| job.client_id == client_id)
    }

    fn processing_indices_oldest_first(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| job.is_processing())
            .map(|(i, _)| i)
            .collect();
        // Stable: equal timestamps keep insertion order
        indices.sort_by_key(|i| self.jobs[*i].created_at);
        indices
    }

    fn processing_count(&self) -> usize {
        self.jobs.iter().filter(|job| job.is_processing()).count()
    }
}

/// Result of `preemptive_replace`
#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    pub job: Job,
    pub removed: Vec<Job>,
}

/// Result of applying a batch of completion records
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    /// Records whose backend id was not yet known to the store
    pub new_records: usize,
    /// Records already attached to a job, or repeated within the batch
    pub duplicates: usize,
    /// Jobs promoted PROCESSING -> READY, in pairing order
    pub matched: Vec<Job>,
    /// Jobs adopted directly in READY from unmatched records
    pub adopted: Vec<Job>,
    pub processing_left: usize,
}

impl ApplyOutcome {
    pub fn made_progress(&self) -> bool {
        self.new_records > 0
    }
}

pub struct JobStore {
    inner: RwLock<StoreInner>,
    repository: Option<Arc<dyn JobSnapshotRepository>>,
    revision: watch::Sender<u64>,
}

impl JobStore {
    /// Create an empty store; with a repository every mutation is persisted
    pub fn new(repository: Option<Arc<dyn JobSnapshotRepository>>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: RwLock::new(StoreInner::default()),
            repository,
            revision,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Replace the in-memory collection with the persisted snapshot
    pub async fn restore(&self) -> AppResult<usize> {
        let Some(repository) = &self.repository else {
            return Ok(0);
        };

        let jobs = repository.load().await?;
        let count = jobs.len();
        {
            let mut inner = self.inner.write().await;
            inner.jobs = jobs;
            inner.selected = None;
        }
        self.bump_revision();

        log_info!("Restored {} job(s) from snapshot", count);
        Ok(count)
    }

    /// Watch the mutation revision; it increases after every committed change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // Reads

    pub async fn get(&self, client_id: &str) -> AppResult<Job> {
        let inner = self.inner.read().await;
        inner
            .position(client_id)
            .map(|i| inner.jobs[i].clone())
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", client_id)))
    }

    pub async fn list(&self) -> Vec<Job> {
        self.inner.read().await.jobs.clone()
    }

    /// PROCESSING jobs, oldest first
    pub async fn processing(&self) -> Vec<Job> {
        let inner = self.inner.read().await;
        inner
            .processing_indices_oldest_first()
            .into_iter()
            .map(|i| inner.jobs[i].clone())
            .collect()
    }

    pub async fn processing_count(&self) -> usize {
        self.inner.read().await.processing_count()
    }

    pub async fn oldest_processing_created_at(&self) -> Option<DateTime<Utc>> {
        let inner = self.inner.read().await;
        inner
            .jobs
            .iter()
            .filter(|job| job.is_processing())
            .map(|job| job.created_at)
            .min()
    }

    pub async fn statistics(&self) -> JobStatistics {
        JobStatistics::from_jobs(&self.inner.read().await.jobs)
    }

    // Creation

    /// Create a PROCESSING job with a fresh client id
    pub async fn create_job(&self, metadata: JobMetadata, platform_target: Platform) -> Job {
        let job = Job::new(metadata, platform_target);
        let mut inner = self.inner.write().await;
        inner.jobs.push(job.clone());
        self.commit(&inner).await;

        log_debug!("Created job {} ({})", job.client_id, job.platform_target);
        job
    }

    /// Insert a fully formed job. Client ids are never reused.
    pub async fn insert(&self, job: Job) -> AppResult<Job> {
        let mut inner = self.inner.write().await;
        if inner.position(&job.client_id).is_some() {
            return Err(AppError::ValidationError(format!(
                "Client id {} is already in use",
                job.client_id
            )));
        }
        inner.jobs.push(job.clone());
        self.commit(&inner).await;
        Ok(job)
    }

    /// Atomically drop every PROCESSING job and start a new one in their place.
    /// The backend is not told; late completions for dropped jobs come back
    /// as orphans.
    pub async fn preemptive_replace(
        &self,
        metadata: JobMetadata,
        platform_target: Platform,
    ) -> ReplaceOutcome {
        let job = Job::new(metadata, platform_target);
        let mut inner = self.inner.write().await;

        let (removed, kept): (Vec<Job>, Vec<Job>) = std::mem::take(&mut inner.jobs)
            .into_iter()
            .partition(|j| j.is_processing());
        inner.jobs = kept;
        inner.jobs.push(job.clone());

        if let Some(selected) = &inner.selected {
            if removed.iter().any(|j| &j.client_id == selected) {
                inner.selected = None;
            }
        }
        self.commit(&inner).await;

        log_info!(
            "Replaced {} processing job(s) with {}",
            removed.len(),
            job.client_id
        );
        ReplaceOutcome { job, removed }
    }

    // Mutation gateway

    /// Apply a pure transform to one job. Unknown ids and rejected transforms
    /// leave the store untouched.
    pub async fn mutate<F>(&self, client_id: &str, transform: F) -> AppResult<Job>
    where
        F: FnOnce(&Job) -> AppResult<Job>,
    {
        let mut inner = self.inner.write().await;
        let index = inner
            .position(client_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", client_id)))?;

        let next = transform(&inner.jobs[index])?;
        if next.client_id != client_id {
            return Err(AppError::InternalError(format!(
                "Transform changed client id {} -> {}",
                client_id, next.client_id
            )));
        }
        if next == inner.jobs[index] {
            return Ok(next);
        }

        inner.jobs[index] = next.clone();
        self.commit(&inner).await;
        Ok(next)
    }

    pub async fn attach_upload_ref(&self, client_id: &str, upload_ref: UploadRef) -> AppResult<Job> {
        let result = self
            .mutate(client_id, |job| Ok(lifecycle::attach_upload_ref(job, &upload_ref)))
            .await;
        if let Err(e) = &result {
            log_warn!("Ignoring upload ref for {}: {}", client_id, e);
        }
        result
    }

    pub async fn transition_to_ready(
        &self,
        client_id: &str,
        completion: &CompletionRecord,
    ) -> AppResult<Job> {
        self.mutate(client_id, |job| lifecycle::mark_ready(job, completion))
            .await
    }

    pub async fn transition_to_uploaded(&self, client_id: &str) -> AppResult<Job> {
        self.mutate(client_id, lifecycle::mark_uploaded).await
    }

    pub async fn transition_to_failed(&self, client_id: &str) -> AppResult<Job> {
        let now = Utc::now();
        self.mutate(client_id, |job| lifecycle::mark_failed(job, now))
            .await
    }

    /// Match completion records against in-flight jobs in one atomic step.
    ///
    /// Records already attached to a job are ignored. The oldest PROCESSING
    /// job receives the earliest new completion, and so on; completions left
    /// over become READY orphan jobs, jobs left over stay PROCESSING.
    pub async fn apply_completions(&self, records: Vec<CompletionRecord>) -> ApplyOutcome {
        let mut inner = self.inner.write().await;

        let mut seen: HashSet<String> = inner
            .jobs
            .iter()
            .filter_map(|job| job.backend_id.clone())
            .collect();

        let total = records.len();
        let mut fresh: Vec<CompletionRecord> = records
            .into_iter()
            .filter(|record| seen.insert(record.backend_id.clone()))
            .collect();

        let mut outcome = ApplyOutcome {
            new_records: fresh.len(),
            duplicates: total - fresh.len(),
            ..ApplyOutcome::default()
        };

        if fresh.is_empty() {
            outcome.processing_left = inner.processing_count();
            return outcome;
        }

        fresh.sort_by_key(|record| record.completed_at);
        let waiting = inner.processing_indices_oldest_first();

        let mut records = fresh.into_iter();
        for index in waiting {
            let Some(record) = records.next() else {
                break;
            };
            match lifecycle::mark_ready(&inner.jobs[index], &record) {
                Ok(ready) => {
                    inner.jobs[index] = ready.clone();
                    outcome.matched.push(ready);
                }
                Err(e) => {
                    // Unreachable while the index list only holds PROCESSING jobs
                    log_error!("Failed to promote job: {}", e);
                    outcome.adopted.push(Job::orphan(&record));
                }
            }
        }

        for record in records {
            outcome.adopted.push(Job::orphan(&record));
        }
        for orphan in &outcome.adopted {
            inner.jobs.push(orphan.clone());
        }

        outcome.processing_left = inner.processing_count();
        self.commit(&inner).await;
        outcome
    }

    // Selection (UI pointer, not part of the lifecycle)

    /// Select a job; selecting the already-selected job clears the selection
    pub async fn select(&self, client_id: &str) -> AppResult<Option<String>> {
        let mut inner = self.inner.write().await;
        if inner.position(client_id).is_none() {
            return Err(AppError::NotFound(format!("Job {} not found", client_id)));
        }

        inner.selected = if inner.selected.as_deref() == Some(client_id) {
            None
        } else {
            Some(client_id.to_string())
        };
        Ok(inner.selected.clone())
    }

    pub async fn clear_selection(&self) {
        self.inner.write().await.selected = None;
    }

    pub async fn selected(&self) -> Option<String> {
        self.inner.read().await.selected.clone()
    }

    /// Remove every job. Returns how many were dropped.
    pub async fn reset_all(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.jobs.len();
        inner.jobs.clear();
        inner.selected = None;

        if let Some(repository) = &self.repository {
            if let Err(e) = repository.clear().await {
                log_error!("Failed to clear job snapshot: {}", e);
            }
        }
        drop(inner);
        self.bump_revision();

        log_info!("Bulk reset removed {} job(s)", removed);
        removed
    }

    async fn commit(&self, inner: &StoreInner) {
        if let Some(repository) = &self.repository {
            if let Err(e) = repository.save(&inner.jobs).await {
                log_error!("Failed to persist job snapshot: {}", e);
            }
        }
        self.bump_revision();
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}
