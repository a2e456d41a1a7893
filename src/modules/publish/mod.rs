/// Multi-platform publishing
///
/// - Request: per-platform fields and the settled results
/// - Uploader: the platform upload trait, its registry and the HTTP uploader
/// - Orchestrator: concurrent fan-out with partial-success semantics
pub mod orchestrator;
pub mod request;
pub mod uploader;

pub use orchestrator::PublishOrchestrator;
pub use request::{PlatformFields, PlatformResult, PublishOutcome, PublishRequest};
pub use uploader::{HttpPlatformUploader, PlatformRegistry, PlatformUploader, UploadTarget};
