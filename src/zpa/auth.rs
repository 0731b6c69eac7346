//! ZPA Authentication
//!
//! Exchanges API client credentials for a bearer token via `POST /signin`
//! and keeps the token until shortly before it expires.

use super::http::{ApiError, ZpaHttpClient};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL when the sign-in response carries no `expires_in`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// ZPA credentials holder
#[derive(Clone)]
pub struct ZpaCredentials {
    client_id: String,
    client_secret: String,
    signin_url: String,
    http: ZpaHttpClient,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl fmt::Debug for ZpaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZpaCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("signin_url", &self.signin_url)
            .finish()
    }
}

impl ZpaCredentials {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        base_url: &str,
        http: ZpaHttpClient,
    ) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            signin_url: format!("{}/signin", base_url.trim_end_matches('/')),
            http,
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for API calls, signing in when needed
    pub async fn get_token(&self) -> Result<String, ApiError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, signing in again");
            }
        }

        tracing::debug!(client_id = %self.client_id, "Signing in to ZPA");

        let response = self
            .http
            .post_form(
                &self.signin_url,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                ],
            )
            .await
            .map_err(|e| match e {
                ApiError::Status { status, message } => {
                    ApiError::Auth(format!("sign-in returned {}: {}", status, message))
                }
                ApiError::NotFound(_) => ApiError::Auth("sign-in endpoint not found".to_string()),
                other => other,
            })?;

        let (token, ttl) = parse_signin_response(&response)?;
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token)
    }
}

/// Extract the access token and its lifetime from a sign-in response.
/// `expires_in` arrives either as a number or as a numeric string.
fn parse_signin_response(response: &Value) -> Result<(String, Duration), ApiError> {
    let token = response
        .get("access_token")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Auth("sign-in response carried no access_token".to_string()))?;

    let ttl = response
        .get("expires_in")
        .and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TOKEN_TTL);

    Ok((token.to_string(), ttl))
}
