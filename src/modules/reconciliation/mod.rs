/// Completion reconciliation module
///
/// Keeps the job store consistent with completions reported by the backend:
/// - Backoff: the poll interval ladder
/// - Reconciler: single-flight passes, push ingestion and the poll task
pub mod backoff;
pub mod reconciler;

pub use backoff::BackoffLadder;
pub use reconciler::{PassOutcome, PassSummary, Reconciler, ReconcilerDiagnostics};
