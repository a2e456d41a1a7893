pub mod backend;
pub mod engine;
pub mod jobs;
pub mod publish;
pub mod reconciliation;
