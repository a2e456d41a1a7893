pub mod entities;
pub mod lifecycle;
pub mod repository;
pub mod value_objects;

pub use entities::{CompletionRecord, Job, JobMetadata, JobStatistics, UploadRef};
pub use repository::JobSnapshotRepository;
pub use value_objects::{JobOrigin, JobState};
