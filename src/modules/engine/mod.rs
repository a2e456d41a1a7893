/// Engine facade
///
/// The single owned entry point an application embeds: creates and replaces
/// jobs, triggers reconciliation, publishes, and exposes the derived view and
/// diagnostics.
pub mod service;

pub use service::{EngineDiagnostics, EngineService};
