/// Completion reconciler
///
/// Matches backend completion records to in-flight jobs. Passes are triggered
/// by push signals or by a cancellable poll task whose interval follows the
/// backoff ladder. Only one pass runs at a time; a pass requested while
/// another is in flight is dropped.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::backoff::BackoffLadder;
use crate::modules::backend::{validate_completions, BackendJobApi, RawCompletionRecord};
use crate::modules::jobs::domain::entities::Job;
use crate::modules::jobs::store::{ApplyOutcome, JobStore};
use crate::shared::config::{EngineConfig, MAX_SAFETY_MARGIN};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::notifications::{Notification, NotificationSink};
use crate::shared::utils::{LogContext, TimedOperation};
use crate::{log_debug, log_info, log_warn};

/// What a single reconciliation pass did
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// Another pass was already in flight
    Skipped,
    /// Nothing is processing; no query was issued
    Idle,
    /// The completion query failed; counted as a pass without progress
    Failed(AppError),
    Completed(PassSummary),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassSummary {
    pub received: usize,
    pub rejected: usize,
    pub new_records: usize,
    pub duplicates: usize,
    pub matched: Vec<Job>,
    pub adopted: Vec<Job>,
    pub processing_left: usize,
    pub next_interval: Duration,
}

/// Snapshot of the reconciliation state for operational inspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcilerDiagnostics {
    pub active: bool,
    pub polling: bool,
    pub in_flight: bool,
    pub interval_ms: u64,
    pub attempt_count: u32,
    pub last_error: Option<String>,
    pub last_pass_at: Option<DateTime<Utc>>,
    pub passes: u64,
    pub matched_total: u64,
    pub adopted_total: u64,
}

#[derive(Debug)]
struct PollTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct ReconcileState {
    active: bool,
    interval: Duration,
    attempt_count: u32,
    last_error: Option<String>,
    last_pass_at: Option<DateTime<Utc>>,
    passes: u64,
    matched_total: u64,
    adopted_total: u64,
    poll: Option<PollTask>,
}

impl ReconcileState {
    fn cold(ladder: &BackoffLadder) -> Self {
        Self {
            active: false,
            interval: ladder.base(),
            attempt_count: 0,
            last_error: None,
            last_pass_at: None,
            passes: 0,
            matched_total: 0,
            adopted_total: 0,
            poll: None,
        }
    }

    fn reset_backoff(&mut self, ladder: &BackoffLadder) {
        self.attempt_count = 0;
        self.interval = ladder.base();
    }

    fn advance_backoff(&mut self, ladder: &BackoffLadder) {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.interval = ladder.interval_for(self.attempt_count);
    }

    fn record_pass(&mut self) {
        self.passes += 1;
        self.last_pass_at = Some(Utc::now());
    }

    /// Cancel the poll task without waiting for it. Safe from inside the task.
    fn cancel_poll(&mut self) -> Option<JoinHandle<()>> {
        self.poll.take().map(|poll| {
            poll.token.cancel();
            poll.handle
        })
    }
}

/// Clears the single-flight flag when a pass ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Reconciler {
    store: Arc<JobStore>,
    backend: Arc<dyn BackendJobApi>,
    notifier: Arc<dyn NotificationSink>,
    ladder: BackoffLadder,
    safety_margin: chrono::Duration,
    in_flight: AtomicBool,
    state: Mutex<ReconcileState>,
}

impl Reconciler {
    pub fn new(
        store: Arc<JobStore>,
        backend: Arc<dyn BackendJobApi>,
        notifier: Arc<dyn NotificationSink>,
        ladder: BackoffLadder,
        safety_margin: Duration,
    ) -> AppResult<Self> {
        if safety_margin > MAX_SAFETY_MARGIN {
            return Err(AppError::ConfigError(format!(
                "Safety margin {:?} exceeds the {:?} maximum",
                safety_margin, MAX_SAFETY_MARGIN
            )));
        }
        let safety_margin = chrono::Duration::from_std(safety_margin)
            .map_err(|e| AppError::ConfigError(format!("Safety margin out of range: {}", e)))?;

        Ok(Self {
            store,
            backend,
            notifier,
            state: Mutex::new(ReconcileState::cold(&ladder)),
            ladder,
            safety_margin,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn from_config(
        store: Arc<JobStore>,
        backend: Arc<dyn BackendJobApi>,
        notifier: Arc<dyn NotificationSink>,
        config: &EngineConfig,
    ) -> AppResult<Self> {
        let ladder = BackoffLadder::new(config.poll_ladder.clone())?.with_jitter(config.poll_jitter);
        Self::new(store, backend, notifier, ladder, config.safety_margin)
    }

    /// Start polling if it is not running. Activating from cold starts at
    /// the base interval; calling it while active changes nothing.
    pub async fn ensure_active(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        if state.active && state.poll.is_some() {
            return;
        }

        if !state.active {
            state.active = true;
            state.reset_backoff(&self.ladder);
            log_info!(
                "Reconciliation polling started ({:?} interval)",
                state.interval
            );
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).poll_loop(token.clone()));
        state.poll = Some(PollTask { token, handle });
    }

    async fn poll_loop(self: Arc<Self>, token: CancellationToken) {
        log_debug!("Reconciliation poll task started");

        loop {
            let delay = {
                let state = self.state.lock().await;
                self.ladder.sleep_duration(state.interval)
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            if let PassOutcome::Skipped = self.reconcile_now().await {
                log_debug!("Scheduled pass overlapped a running pass");
            }
        }

        log_debug!("Reconciliation poll task stopped");
    }

    /// Event-driven trigger: run a pass right away
    pub async fn on_push_signal(&self) -> PassOutcome {
        log_debug!("Push signal received");
        self.reconcile_now().await
    }

    /// Run one pass. Errors never escape; they end up in the diagnostics.
    pub async fn reconcile_now(&self) -> PassOutcome {
        let Some(_flight) = InFlight::acquire(&self.in_flight) else {
            log_debug!("Reconciliation pass already in flight, skipping");
            return PassOutcome::Skipped;
        };
        let timer = TimedOperation::new("reconciliation pass");

        let Some(oldest) = self.store.oldest_processing_created_at().await else {
            self.deactivate_if_idle().await;
            timer.finish_with_info("idle");
            return PassOutcome::Idle;
        };

        let after = oldest
            .checked_sub_signed(self.safety_margin)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let raw = match self.backend.query_completions_after(after).await {
            Ok(raw) => raw,
            Err(e) => {
                LogContext::error_with_context(&e, "Completion query failed");
                let mut state = self.state.lock().await;
                state.record_pass();
                state.last_error = Some(e.to_string());
                state.advance_backoff(&self.ladder);
                drop(state);

                timer.finish_with_info("query failed");
                return PassOutcome::Failed(e);
            }
        };

        let summary = self.apply(raw, true).await;
        timer.finish_with_info(&format!(
            "{} new, {} matched",
            summary.new_records,
            summary.matched.len()
        ));
        PassOutcome::Completed(summary)
    }

    /// Apply completion records delivered inside a push payload.
    ///
    /// This bypasses single-flight so a payload is never dropped; the store
    /// applies each batch atomically, so a concurrent pass cannot consume a
    /// record twice. Pushed batches reset the backoff on progress but never
    /// climb it.
    pub async fn ingest_pushed(&self, raw: Vec<RawCompletionRecord>) -> PassSummary {
        log_debug!("Ingesting {} pushed completion(s)", raw.len());
        self.apply(raw, false).await
    }

    async fn apply(&self, raw: Vec<RawCompletionRecord>, polled: bool) -> PassSummary {
        let received = raw.len();
        let (records, rejected) = validate_completions(raw);
        let outcome = self.store.apply_completions(records).await;
        LogContext::reconciliation_pass(
            outcome.matched.len(),
            outcome.adopted.len(),
            outcome.processing_left,
        );

        let next_interval = {
            let mut state = self.state.lock().await;
            if polled {
                state.record_pass();
                state.last_error = None;
            }
            state.matched_total += outcome.matched.len() as u64;
            state.adopted_total += outcome.adopted.len() as u64;

            if outcome.made_progress() {
                state.reset_backoff(&self.ladder);
            } else if polled {
                state.advance_backoff(&self.ladder);
            }
            state.interval
        };

        self.deactivate_if_idle().await;
        self.announce(&outcome).await;

        PassSummary {
            received,
            rejected,
            new_records: outcome.new_records,
            duplicates: outcome.duplicates,
            matched: outcome.matched,
            adopted: outcome.adopted,
            processing_left: outcome.processing_left,
            next_interval,
        }
    }

    async fn announce(&self, outcome: &ApplyOutcome) {
        for job in outcome.matched.iter().chain(outcome.adopted.iter()) {
            self.notifier.notify(Notification::info(
                format!("Job {} is ready to publish", display_name(job)),
                Some(json!({
                    "client_id": job.client_id,
                    "backend_id": job.backend_id,
                    "origin": job.origin,
                })),
            ));
        }

        // Orphans carry ids the backend never issued, so only matches are acknowledged
        let acks = outcome.matched.iter().map(|job| async move {
            if let Err(e) = self.backend.notify_job_completed(&job.client_id).await {
                log_warn!("Failed to acknowledge completion of {}: {}", job.client_id, e);
            }
        });
        join_all(acks).await;
    }

    /// Stop polling once nothing is processing. Checked against the store
    /// under the state lock so a job created concurrently keeps polling alive.
    pub(crate) async fn deactivate_if_idle(&self) {
        let mut state = self.state.lock().await;
        if !state.active && state.poll.is_none() {
            return;
        }
        if self.store.processing_count().await > 0 {
            return;
        }

        state.active = false;
        state.cancel_poll();
        log_info!("No jobs in flight, reconciliation polling stopped");
    }

    /// Return to the cold state: no polling, base interval, counters cleared
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.cancel_poll();
        *state = ReconcileState::cold(&self.ladder);
        log_debug!("Reconciliation state reset");
    }

    /// Cancel the poll task and wait for it to finish
    pub async fn shutdown(&self) {
        let handle = {
            let mut state = self.state.lock().await;
            state.active = false;
            state.cancel_poll()
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log_warn!("Reconciliation poll task ended abnormally: {}", e);
            }
        }
        log_info!("Reconciler shut down");
    }

    pub async fn diagnostics(&self) -> ReconcilerDiagnostics {
        let state = self.state.lock().await;
        ReconcilerDiagnostics {
            active: state.active,
            polling: state
                .poll
                .as_ref()
                .is_some_and(|poll| !poll.handle.is_finished()),
            in_flight: self.in_flight.load(Ordering::Acquire),
            interval_ms: u64::try_from(state.interval.as_millis()).unwrap_or(u64::MAX),
            attempt_count: state.attempt_count,
            last_error: state.last_error.clone(),
            last_pass_at: state.last_pass_at,
            passes: state.passes,
            matched_total: state.matched_total,
            adopted_total: state.adopted_total,
        }
    }
}

fn display_name(job: &Job) -> String {
    if job.metadata.title.trim().is_empty() {
        job.backend_id
            .as_deref()
            .map(|id| format!("#{}", id))
            .unwrap_or_else(|| job.client_id.clone())
    } else {
        format!("\"{}\"", job.metadata.title)
    }
}
