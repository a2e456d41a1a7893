//! Date-grouped view over the job store.
//!
//! `project` is pure. `ProjectionWorker` recomputes it whenever the store
//! revision moves: once immediately and once more after a short delay so a
//! burst of mutations ends in a single settled view.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::log_debug;
use crate::modules::jobs::domain::entities::Job;
use crate::modules::jobs::store::JobStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub jobs: Vec<Job>,
}

/// Group jobs by UTC creation date, newest date first and newest job first
pub fn project(jobs: &[Job]) -> Vec<DateGroup> {
    let mut sorted: Vec<&Job> = jobs.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut groups: Vec<DateGroup> = Vec::new();
    for job in sorted {
        let date = job.created_at.date_naive();
        match groups.last_mut() {
            Some(group) if group.date == date => group.jobs.push(job.clone()),
            _ => groups.push(DateGroup {
                date,
                jobs: vec![job.clone()],
            }),
        }
    }
    groups
}

pub struct ProjectionWorker {
    handle: JoinHandle<()>,
    view: watch::Receiver<Vec<DateGroup>>,
    shutdown: CancellationToken,
}

impl ProjectionWorker {
    /// Spawn the worker; the first view is computed before this returns
    pub async fn spawn(store: Arc<JobStore>, settle_delay: Duration) -> Self {
        let (tx, view) = watch::channel(project(&store.list().await));
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let mut revisions = store.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = revisions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                tx.send_replace(project(&store.list().await));

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(settle_delay) => {}
                }
                tx.send_replace(project(&store.list().await));
            }
            log_debug!("Projection worker stopped");
        });

        Self {
            handle,
            view,
            shutdown,
        }
    }

    pub fn view(&self) -> watch::Receiver<Vec<DateGroup>> {
        self.view.clone()
    }

    pub fn current(&self) -> Vec<DateGroup> {
        self.view.borrow().clone()
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.handle.await;
    }
}
