/// JSON file implementation of JobSnapshotRepository
///
/// The snapshot lives at `<state_dir>/<namespace>.json`. Writes go to a
/// sibling temp file first and are renamed over the snapshot, so a crash
/// mid-write leaves the previous snapshot intact.
use crate::modules::jobs::domain::entities::Job;
use crate::modules::jobs::domain::repository::JobSnapshotRepository;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct FileSnapshotRepository {
    path: PathBuf,
    temp_path: PathBuf,
}

impl FileSnapshotRepository {
    pub fn new(state_dir: impl AsRef<Path>, namespace: &str) -> Self {
        let dir = state_dir.as_ref();
        Self {
            path: dir.join(format!("{}.json", namespace)),
            temp_path: dir.join(format!("{}.json.tmp", namespace)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::StorageError(format!(
                        "Failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl JobSnapshotRepository for FileSnapshotRepository {
    async fn load(&self) -> AppResult<Vec<Job>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::StorageError(format!(
                    "Failed to read snapshot {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, jobs: &[Job]) -> AppResult<()> {
        self.ensure_parent().await?;
        let bytes = serde_json::to_vec(jobs)?;

        tokio::fs::write(&self.temp_path, bytes).await?;
        tokio::fs::rename(&self.temp_path, &self.path)
            .await
            .map_err(|e| {
                AppError::StorageError(format!(
                    "Failed to replace snapshot {}: {}",
                    self.path.display(),
                    e
                ))
            })
    }

    async fn clear(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::jobs::domain::entities::JobMetadata;
    use crate::shared::domain::value_objects::Platform;

    fn temp_state_dir() -> PathBuf {
        std::env::temp_dir().join(format!("reelflow-repo-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_snapshot_loads_empty() {
        let repo = FileSnapshotRepository::new(temp_state_dir(), "jobs");
        assert!(repo.load().await.unwrap().is_empty());
        repo.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_is_restored_verbatim() {
        let dir = temp_state_dir();
        let repo = FileSnapshotRepository::new(&dir, "reelflow.jobs");
        let jobs = vec![
            Job::new(JobMetadata::new("One", "first"), Platform::YouTube),
            Job::new(
                JobMetadata::new("Two", "second").with_location("Lisbon"),
                Platform::TikTok,
            ),
        ];

        repo.save(&jobs).await.unwrap();
        assert!(repo.path().ends_with("reelflow.jobs.json"));
        assert_eq!(repo.load().await.unwrap(), jobs);

        repo.clear().await.unwrap();
        assert!(repo.load().await.unwrap().is_empty());

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = temp_state_dir();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("jobs.json"), b"{not json")
            .await
            .unwrap();

        let repo = FileSnapshotRepository::new(&dir, "jobs");
        assert!(matches!(
            repo.load().await,
            Err(AppError::SerializationError(_))
        ));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
