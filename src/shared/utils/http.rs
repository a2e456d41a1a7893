use reqwest::{Client, Response, StatusCode};

use crate::shared::errors::{AppError, AppResult};

const USER_AGENT: &str = concat!("reelflow/", env!("CARGO_PKG_VERSION"));

/// Shared plumbing for the JSON-over-HTTP collaborators
pub struct HttpHandler;

impl HttpHandler {
    /// Build a client with transport-default timeouts
    pub fn create_http_client() -> AppResult<Client> {
        Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::NetworkError(format!("Failed to build HTTP client: {}", e)))
    }

    /// Turn a non-2xx response into a `NetworkError` carrying the body text
    pub async fn ensure_success(
        response: Response,
        service: &str,
        operation: &str,
    ) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::status_error(status, service, operation, &body))
    }

    fn status_error(status: StatusCode, service: &str, operation: &str, body: &str) -> AppError {
        let detail = body.trim();
        if detail.is_empty() {
            AppError::NetworkError(format!("{} {} failed with HTTP {}", service, operation, status))
        } else {
            AppError::NetworkError(format!(
                "{} {} failed with HTTP {}: {}",
                service, operation, status, detail
            ))
        }
    }
}
