// Shared Kernel
// Cross-cutting types used by every engine module

pub mod config; // Environment-driven engine configuration
pub mod domain; // Shared value objects (platforms)
pub mod errors; // Shared error types
pub mod notifications; // User-facing notification sink
pub mod utils; // Logging helpers

// Re-exports for convenience
pub use config::EngineConfig;
pub use errors::{AppError, AppResult};
pub use notifications::{Notification, NotificationKind, NotificationSink};
