/// Value objects for jobs domain
use serde::{Deserialize, Serialize};

/// Lifecycle state of a tracked job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Processing,
    Ready,
    Uploaded,
    Failed,
}

impl JobState {
    /// `Uploaded` and `Failed` accept no further engine-driven transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Uploaded | JobState::Failed)
    }

    /// Transition table:
    ///
    /// ```text
    /// PROCESSING -> READY      reconciler match
    /// PROCESSING -> FAILED     metadata-attach failure
    /// READY      -> UPLOADED   publish with at least one platform success
    /// *          -> FAILED     explicit failure (no-op once terminal)
    /// ```
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Processing, JobState::Ready)
                | (JobState::Processing, JobState::Failed)
                | (JobState::Ready, JobState::Uploaded)
                | (JobState::Ready, JobState::Failed)
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Processing => write!(f, "processing"),
            JobState::Ready => write!(f, "ready"),
            JobState::Uploaded => write!(f, "uploaded"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(JobState::Processing),
            "ready" => Ok(JobState::Ready),
            "uploaded" => Ok(JobState::Uploaded),
            "failed" => Ok(JobState::Failed),
            _ => Err(format!("Invalid job state: {}", s)),
        }
    }
}

/// How a job entered the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOrigin {
    /// Created by a client action
    #[default]
    Client,
    /// Materialized from a completion record nobody was waiting for
    Orphan,
}
