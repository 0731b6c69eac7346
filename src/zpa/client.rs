//! ZPA Client
//!
//! Main client for the ZPA management API, combining authentication,
//! HTTP transport and tenant scoping.

use super::auth::ZpaCredentials;
use super::http::{ApiError, ZpaHttpClient};
use crate::config::ResolvedConfig;
use serde::Deserialize;
use serde_json::Value;

/// Page size requested from listing endpoints
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Query parameter carrying the microtenant scope
pub const MICROTENANT_PARAM: &str = "microtenantId";

/// API family an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFamily {
    MgmtconfigV1,
    MgmtconfigV2,
    UserconfigV1,
    Cbiconfig,
}

/// Main ZPA client
#[derive(Clone, Debug)]
pub struct ZpaClient {
    credentials: ZpaCredentials,
    http: ZpaHttpClient,
    base_url: String,
    customer_id: String,
    microtenant_id: Option<String>,
}

impl ZpaClient {
    /// Create a new ZPA client. No request is sent until the first read.
    pub fn new(config: &ResolvedConfig, user_agent: &str) -> Result<Self, ApiError> {
        let http = ZpaHttpClient::new(user_agent)?;
        let credentials = ZpaCredentials::new(
            &config.client_id,
            &config.client_secret,
            &config.base_url,
            http.clone(),
        );

        Ok(Self {
            credentials,
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            customer_id: config.customer_id.clone(),
            microtenant_id: config.microtenant_id.clone(),
        })
    }

    /// Copy of this client whose every request is scoped to `microtenant_id`
    pub fn with_microtenant(&self, microtenant_id: &str) -> Self {
        let mut scoped = self.clone();
        let trimmed = microtenant_id.trim();
        if !trimmed.is_empty() {
            scoped.microtenant_id = Some(trimmed.to_string());
        }
        scoped
    }

    pub fn microtenant_id(&self) -> Option<&str> {
        self.microtenant_id.as_deref()
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build the URL of `path` within an API family
    pub fn api_url(&self, api: ApiFamily, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match api {
            ApiFamily::MgmtconfigV1 => format!(
                "{}/mgmtconfig/v1/admin/customers/{}/{}",
                self.base_url, self.customer_id, path
            ),
            ApiFamily::MgmtconfigV2 => format!(
                "{}/mgmtconfig/v2/admin/customers/{}/{}",
                self.base_url, self.customer_id, path
            ),
            ApiFamily::UserconfigV1 => format!(
                "{}/userconfig/v1/customers/{}/{}",
                self.base_url, self.customer_id, path
            ),
            ApiFamily::Cbiconfig => format!(
                "{}/cbiconfig/cbi/api/customers/{}/{}",
                self.base_url, self.customer_id, path
            ),
        }
    }

    // =========================================================================
    // Requests
    // =========================================================================

    fn scoped_query(&self, query: &[(String, String)]) -> Vec<(String, String)> {
        let mut params = query.to_vec();
        if let Some(microtenant_id) = &self.microtenant_id {
            params.push((MICROTENANT_PARAM.to_string(), microtenant_id.clone()));
        }
        params
    }

    /// Make a GET request to a ZPA API
    pub async fn get(&self, url: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        let token = self.credentials.get_token().await?;
        self.http.get(url, &token, &self.scoped_query(query)).await
    }

    /// Fetch every page of a listing endpoint
    pub async fn get_all_pages(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<Vec<Value>, ApiError> {
        let mut all_items = Vec::new();
        let mut page: usize = 1;

        loop {
            let mut params = query.to_vec();
            params.push(("page".to_string(), page.to_string()));
            params.push(("pagesize".to_string(), DEFAULT_PAGE_SIZE.to_string()));

            let response = self.get(url, &params).await?;
            let (items, total_pages) = extract_page(response);
            let fetched = items.len();
            all_items.extend(items);

            if fetched == 0 || page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("Fetched {} items from {}", all_items.len(), url);
        Ok(all_items)
    }
}

/// Split a listing response into its items and the total page count.
/// Listings arrive as `{"totalPages": "2", "list": [...]}`; a bare array
/// counts as a single page.
fn extract_page(response: Value) -> (Vec<Value>, usize) {
    match response {
        Value::Array(items) => (items, 1),
        Value::Object(mut map) => {
            let total_pages = map
                .get("totalPages")
                .and_then(|v| match v {
                    Value::Number(n) => n.as_u64().map(|n| n as usize),
                    Value::String(s) => s.parse().ok(),
                    _ => None,
                })
                .unwrap_or(1);
            let items = match map.remove("list") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            (items, total_pages)
        }
        _ => (Vec::new(), 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> ZpaClient {
        let config = ResolvedConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            customer_id: "42".into(),
            base_url: "https://config.private.zscaler.com/".into(),
            microtenant_id: None,
        };
        ZpaClient::new(&config, "zpa-lookup-test").unwrap()
    }

    #[test]
    fn test_api_urls() {
        let c = client();
        assert_eq!(
            c.api_url(ApiFamily::MgmtconfigV1, "segmentGroup"),
            "https://config.private.zscaler.com/mgmtconfig/v1/admin/customers/42/segmentGroup"
        );
        assert_eq!(
            c.api_url(ApiFamily::MgmtconfigV2, "/idp"),
            "https://config.private.zscaler.com/mgmtconfig/v2/admin/customers/42/idp"
        );
        assert_eq!(
            c.api_url(ApiFamily::UserconfigV1, "scimgroup"),
            "https://config.private.zscaler.com/userconfig/v1/customers/42/scimgroup"
        );
        assert_eq!(
            c.api_url(ApiFamily::Cbiconfig, "regions"),
            "https://config.private.zscaler.com/cbiconfig/cbi/api/customers/42/regions"
        );
    }

    #[test]
    fn test_with_microtenant_scopes_queries() {
        let c = client();
        assert!(c.scoped_query(&[]).is_empty());

        let scoped = c.with_microtenant(" mt-1 ");
        assert_eq!(scoped.microtenant_id(), Some("mt-1"));
        assert_eq!(
            scoped.scoped_query(&[("search".into(), "x".into())]),
            vec![
                ("search".to_string(), "x".to_string()),
                (MICROTENANT_PARAM.to_string(), "mt-1".to_string()),
            ]
        );

        // blank scope leaves the client untouched
        assert_eq!(c.with_microtenant("  ").microtenant_id(), None);
    }

    #[test]
    fn test_extract_page_shapes() {
        let (items, total) = extract_page(json!({"totalPages": "3", "list": [{"id": "1"}]}));
        assert_eq!(items.len(), 1);
        assert_eq!(total, 3);

        let (items, total) = extract_page(json!([{"id": "1"}, {"id": "2"}]));
        assert_eq!(items.len(), 2);
        assert_eq!(total, 1);

        let (items, _) = extract_page(json!({"totalPages": 0}));
        assert!(items.is_empty());
    }
}
