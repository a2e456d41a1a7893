/// In-process stand-ins for the engine's external collaborators
///
/// - `ScriptedBackend`: completions are published by the test and served
///   back from the query endpoint; failures and a query gate are scriptable
/// - `ScriptedUploader`: succeeds or fails on demand and counts calls
/// - `CollectingSink`: keeps every notification for later assertions
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reelflow_lib::modules::backend::{BackendJobApi, RawCompletionRecord};
use reelflow_lib::modules::jobs::{Job, UploadRef};
use reelflow_lib::modules::publish::{PlatformUploader, UploadTarget};
use reelflow_lib::shared::notifications::{Notification, NotificationKind, NotificationSink};
use reelflow_lib::{AppError, AppResult};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
pub struct ScriptedBackend {
    completions: Mutex<Vec<(DateTime<Utc>, RawCompletionRecord)>>,
    submitted: Mutex<Vec<String>>,
    acknowledged: Mutex<Vec<String>>,
    queries: AtomicUsize,
    failing_queries: AtomicUsize,
    reject_submissions: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make a completion visible to subsequent queries
    pub fn complete(&self, backend_id: impl Into<Value>, completed_at: DateTime<Utc>) -> RawCompletionRecord {
        let record = RawCompletionRecord::new(backend_id, completed_at);
        self.completions
            .lock()
            .unwrap()
            .push((completed_at, record.clone()));
        record
    }

    pub fn published(&self) -> Vec<RawCompletionRecord> {
        self.completions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub fn fail_next_queries(&self, count: usize) {
        self.failing_queries.store(count, Ordering::SeqCst);
    }

    pub fn reject_submissions(&self, reject: bool) {
        self.reject_submissions.store(reject, Ordering::SeqCst);
    }

    /// Hold every query until the returned handle is notified
    pub fn gate_queries(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn open_gate(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendJobApi for ScriptedBackend {
    async fn submit_job(&self, job: &Job) -> AppResult<UploadRef> {
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(AppError::NetworkError("backend refused the job".to_string()));
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(job.client_id.clone());
        Ok(UploadRef::handle(format!("gen-{}", submitted.len())))
    }

    async fn query_completions_after(
        &self,
        after: DateTime<Utc>,
    ) -> AppResult<Vec<RawCompletionRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let failing = self.failing_queries.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_queries.store(failing - 1, Ordering::SeqCst);
            return Err(AppError::NetworkError("completion query timed out".to_string()));
        }

        Ok(self
            .completions
            .lock()
            .unwrap()
            .iter()
            .filter(|(completed_at, _)| *completed_at > after)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn notify_job_completed(&self, client_id: &str) -> AppResult<()> {
        self.acknowledged
            .lock()
            .unwrap()
            .push(client_id.to_string());
        Ok(())
    }
}

pub struct ScriptedUploader {
    fail: bool,
    calls: AtomicUsize,
    fields_seen: Mutex<Vec<HashMap<String, String>>>,
}

impl ScriptedUploader {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
            fields_seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
            fields_seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fields_seen(&self) -> Vec<HashMap<String, String>> {
        self.fields_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformUploader for ScriptedUploader {
    async fn upload(
        &self,
        target: &UploadTarget,
        fields: &HashMap<String, String>,
    ) -> AppResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fields_seen.lock().unwrap().push(fields.clone());
        tokio::task::yield_now().await;

        if self.fail {
            return Err(AppError::NetworkError(format!(
                "{} upload rejected",
                target.platform
            )));
        }
        Ok(json!({ "post_id": format!("{}-{}", target.platform, target.client_id) }))
    }
}

#[derive(Default)]
pub struct CollectingSink {
    received: Mutex<Vec<Notification>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Notification> {
        self.received.lock().unwrap().clone()
    }

    pub fn of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.all().into_iter().filter(|n| n.kind == kind).collect()
    }

    pub fn clear(&self) {
        self.received.lock().unwrap().clear();
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, notification: Notification) {
        self.received.lock().unwrap().push(notification);
    }
}
