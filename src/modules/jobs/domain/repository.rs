/// Repository trait for the persisted job snapshot
///
/// The whole job collection is written verbatim after every mutation and
/// read back once on start. There is no schema version and no migration.
use crate::modules::jobs::domain::entities::Job;
use crate::shared::errors::AppResult;
use async_trait::async_trait;

#[async_trait]
pub trait JobSnapshotRepository: Send + Sync {
    /// Load the last persisted collection; an absent snapshot is an empty one
    async fn load(&self) -> AppResult<Vec<Job>>;

    /// Replace the persisted collection
    async fn save(&self, jobs: &[Job]) -> AppResult<()>;

    /// Remove the persisted snapshot entirely
    async fn clear(&self) -> AppResult<()>;
}
