//! HTTP utilities for ZPA REST API calls

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Errors raised by the ZPA transport
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered 404 for the requested resource
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("API request failed: {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull a readable message out of a ZPA error body.
/// ZPA answers `{"id": "resource.not.found", "reason": "..."}` on failures.
fn error_message(body: &str, fallback: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.get("reason")
                .or_else(|| v.get("message"))
                .or_else(|| v.get("id"))
        })
        .and_then(|v| v.as_str())
        .map(sanitize_for_log)
        .unwrap_or_else(|| fallback.to_string())
}

/// HTTP client wrapper for ZPA API calls
#[derive(Clone, Debug)]
pub struct ZpaHttpClient {
    client: Client,
}

impl ZpaHttpClient {
    /// Create a new HTTP client
    pub fn new(user_agent: &str) -> Result<Self, ApiError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Make a GET request to a ZPA API
    pub async fn get(
        &self,
        url: &str,
        token: &str,
        query: &[(String, String)],
    ) -> Result<Value, ApiError> {
        tracing::debug!(url = %url, query = ?query, "GET");

        let request = self.client.get(url).bearer_auth(token).query(query);
        self.send(url, request).await
    }

    /// Make a form-encoded POST request (used for sign-in)
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Value, ApiError> {
        tracing::debug!(url = %url, "POST");

        let request = self.client.post(url).form(form);
        self.send(url, request).await
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() == 404 {
            tracing::debug!("API returned 404 for {}", url);
            return Err(ApiError::NotFound(error_message(&body, url)));
        }

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason().unwrap_or("unknown")),
            });
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }
}
