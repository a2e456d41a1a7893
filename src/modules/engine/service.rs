use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;

use crate::modules::backend::{BackendJobApi, HttpBackendClient, RawCompletionRecord};
use crate::modules::jobs::domain::entities::{Job, JobMetadata, JobStatistics};
use crate::modules::jobs::domain::repository::JobSnapshotRepository;
use crate::modules::jobs::infrastructure::FileSnapshotRepository;
use crate::modules::jobs::projection::{DateGroup, ProjectionWorker};
use crate::modules::jobs::store::{JobStore, ReplaceOutcome};
use crate::modules::publish::{PlatformRegistry, PublishOrchestrator, PublishOutcome, PublishRequest};
use crate::modules::reconciliation::{PassOutcome, PassSummary, Reconciler, ReconcilerDiagnostics};
use crate::shared::config::EngineConfig;
use crate::shared::domain::value_objects::Platform;
use crate::shared::errors::AppResult;
use crate::shared::notifications::{Notification, NotificationSink};
use crate::shared::utils::LogContext;
use crate::{log_debug, log_info, log_warn};

/// Everything the engine reports for operational inspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineDiagnostics {
    pub reconciler: ReconcilerDiagnostics,
    pub jobs: JobStatistics,
    pub selected: Option<String>,
    pub pending_side_effects: usize,
}

/// The post-creation side effect: ask the backend for identifiers and attach
/// them. Owns its handles so it can run on its own task.
#[derive(Clone)]
struct BackendAttach {
    store: Arc<JobStore>,
    backend: Arc<dyn BackendJobApi>,
    notifier: Arc<dyn NotificationSink>,
    reconciler: Arc<Reconciler>,
}

impl BackendAttach {
    async fn run(&self, job: &Job) -> AppResult<Job> {
        match self.backend.submit_job(job).await {
            Ok(upload_ref) => self.store.attach_upload_ref(&job.client_id, upload_ref).await,
            Err(e) => {
                LogContext::error_with_context(
                    &e,
                    &format!("Backend rejected job {}", job.client_id),
                );
                self.notifier.notify(Notification::error(
                    format!("Could not start job \"{}\": {}", job.metadata.title, e),
                    Some(json!({ "client_id": job.client_id, "error": e })),
                ));

                match self.store.transition_to_failed(&job.client_id).await {
                    // A failed job may have been the last one in flight
                    Ok(_) => self.reconciler.deactivate_if_idle().await,
                    Err(fail_err) if fail_err.is_state_error() => {
                        log_debug!("Job {} gone before it could fail: {}", job.client_id, fail_err)
                    }
                    Err(fail_err) => {
                        log_warn!("Could not mark {} as failed: {}", job.client_id, fail_err)
                    }
                }
                Err(e)
            }
        }
    }
}

/// Facade wiring store, reconciler, publisher and projection together
pub struct EngineService {
    store: Arc<JobStore>,
    reconciler: Arc<Reconciler>,
    orchestrator: PublishOrchestrator,
    attach: BackendAttach,
    side_effects: Mutex<JoinSet<()>>,
    view: watch::Receiver<Vec<DateGroup>>,
    projection: Mutex<Option<ProjectionWorker>>,
}

impl EngineService {
    pub async fn new(
        config: &EngineConfig,
        store: Arc<JobStore>,
        backend: Arc<dyn BackendJobApi>,
        registry: Arc<PlatformRegistry>,
        notifier: Arc<dyn NotificationSink>,
    ) -> AppResult<Self> {
        let reconciler = Arc::new(Reconciler::from_config(
            store.clone(),
            backend.clone(),
            notifier.clone(),
            config,
        )?);
        let orchestrator = PublishOrchestrator::new(store.clone(), registry, notifier.clone());
        let projection = ProjectionWorker::spawn(store.clone(), config.projection_delay).await;

        Ok(Self {
            attach: BackendAttach {
                store: store.clone(),
                backend,
                notifier,
                reconciler: reconciler.clone(),
            },
            store,
            reconciler,
            orchestrator,
            side_effects: Mutex::new(JoinSet::new()),
            view: projection.view(),
            projection: Mutex::new(Some(projection)),
        })
    }

    /// Wire the HTTP collaborators and the file snapshot from configuration
    pub async fn from_config(
        config: &EngineConfig,
        notifier: Arc<dyn NotificationSink>,
    ) -> AppResult<Self> {
        let repository: Arc<dyn JobSnapshotRepository> = Arc::new(FileSnapshotRepository::new(
            &config.state_dir,
            &config.namespace,
        ));
        let store = Arc::new(JobStore::new(Some(repository)));
        let backend = Arc::new(HttpBackendClient::new(config.backend_base_url.clone())?);
        let registry = Arc::new(PlatformRegistry::with_http(config.platform_base_url.clone())?);

        Self::new(config, store, backend, registry, notifier).await
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Load the persisted snapshot and resume polling for in-flight jobs
    pub async fn restore(&self) -> AppResult<usize> {
        let restored = self.store.restore().await?;
        if self.store.processing_count().await > 0 {
            self.reconciler.ensure_active().await;
        }
        Ok(restored)
    }

    // Job lifecycle

    /// Create a PROCESSING job, start polling and submit it to the backend
    /// in the background
    pub async fn create_job(&self, metadata: JobMetadata, platform_target: Platform) -> Job {
        let job = self.store.create_job(metadata, platform_target).await;
        self.reconciler.ensure_active().await;
        self.spawn_attach(job.clone()).await;
        job
    }

    /// Drop every in-flight job and start a new one. Polling keeps its
    /// current interval; superseded work comes back later as orphans.
    pub async fn preemptive_replace(
        &self,
        metadata: JobMetadata,
        platform_target: Platform,
    ) -> ReplaceOutcome {
        let outcome = self.store.preemptive_replace(metadata, platform_target).await;
        self.reconciler.ensure_active().await;
        self.spawn_attach(outcome.job.clone()).await;
        outcome
    }

    async fn spawn_attach(&self, job: Job) {
        let attach = self.attach.clone();
        self.side_effects.lock().await.spawn(async move {
            if let Ok(updated) = attach.run(&job).await {
                log_debug!("Attached backend refs to {}", updated.client_id);
            }
        });
    }

    /// Wait for every background attach step started so far
    pub async fn settle_side_effects(&self) {
        let mut pending = std::mem::take(&mut *self.side_effects.lock().await);
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                log_warn!("Attach task ended abnormally: {}", e);
            }
        }
    }

    // Reconciliation triggers

    pub async fn on_push_signal(&self) -> PassOutcome {
        self.reconciler.on_push_signal().await
    }

    pub async fn ingest_pushed(&self, records: Vec<RawCompletionRecord>) -> PassSummary {
        self.reconciler.ingest_pushed(records).await
    }

    pub async fn reconcile_now(&self) -> PassOutcome {
        self.reconciler.reconcile_now().await
    }

    // Publishing

    pub async fn publish(&self, client_id: &str, request: PublishRequest) -> AppResult<PublishOutcome> {
        self.orchestrator.publish(client_id, request).await
    }

    // Reads and selection

    pub async fn jobs(&self) -> Vec<Job> {
        self.store.list().await
    }

    pub async fn get(&self, client_id: &str) -> AppResult<Job> {
        self.store.get(client_id).await
    }

    pub async fn select(&self, client_id: &str) -> AppResult<Option<String>> {
        self.store.select(client_id).await
    }

    pub async fn clear_selection(&self) {
        self.store.clear_selection().await
    }

    pub async fn selected(&self) -> Option<String> {
        self.store.selected().await
    }

    /// Date-grouped view, kept current by the projection worker
    pub fn view(&self) -> watch::Receiver<Vec<DateGroup>> {
        self.view.clone()
    }

    pub fn current_view(&self) -> Vec<DateGroup> {
        self.view.borrow().clone()
    }

    pub async fn diagnostics(&self) -> EngineDiagnostics {
        EngineDiagnostics {
            reconciler: self.reconciler.diagnostics().await,
            jobs: self.store.statistics().await,
            selected: self.store.selected().await,
            pending_side_effects: self.side_effects.lock().await.len(),
        }
    }

    // Teardown

    /// Remove every job and return the reconciler to its cold state
    pub async fn reset_all(&self) -> usize {
        self.reconciler.reset().await;
        self.store.reset_all().await
    }

    pub async fn shutdown(&self) {
        log_info!("Shutting down engine");
        self.reconciler.shutdown().await;
        self.settle_side_effects().await;

        if let Some(projection) = self.projection.lock().await.take() {
            projection.stop().await;
        }
    }
}
