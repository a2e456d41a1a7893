/// Generation backend boundary
///
/// The trait the engine depends on, the wire shapes it exchanges, and the
/// HTTP implementation used by the binary.
pub mod api;
pub mod dto;
pub mod http_client;

pub use api::BackendJobApi;
pub use dto::{validate_completions, RawCompletionRecord};
pub use http_client::HttpBackendClient;

#[cfg(test)]
pub use api::MockBackendJobApi;
