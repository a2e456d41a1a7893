/// Job record module
///
/// Owns the authoritative in-memory job collection, the lifecycle state
/// machine applied to it, its persisted snapshot and the date-grouped view
/// derived from it.
///
/// Architecture:
/// - Domain: entities, lifecycle transforms and the snapshot repository trait
/// - Infrastructure: JSON file snapshot repository
/// - Store: the single mutation gateway over the collection
/// - Projection: pure grouping plus the worker that keeps it current
pub mod domain;
pub mod infrastructure;
pub mod projection;
pub mod store;

// Re-exports for easy access
pub use domain::{
    entities::{CompletionRecord, Job, JobMetadata, JobStatistics, UploadRef},
    repository::JobSnapshotRepository,
    value_objects::{JobOrigin, JobState},
};
pub use infrastructure::FileSnapshotRepository;
pub use projection::{project, DateGroup, ProjectionWorker};
pub use store::{ApplyOutcome, JobStore, ReplaceOutcome};
