//! Configuration Management
//!
//! Resolves provider settings from explicit values, environment variables
//! and the `~/.zpa/credentials.json` file, in that order.

use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

pub const ENV_CLIENT_ID: &str = "ZPA_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ZPA_CLIENT_SECRET";
pub const ENV_CUSTOMER_ID: &str = "ZPA_CUSTOMER_ID";
pub const ENV_CLOUD: &str = "ZPA_CLOUD";
pub const ENV_MICROTENANT_ID: &str = "ZPA_MICROTENANT_ID";
pub const ENV_BASE_URL: &str = "ZPA_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing {field}: set it in the provider configuration, the {env} environment variable or ~/.zpa/credentials.json")]
    MissingCredential {
        field: &'static str,
        env: &'static str,
    },

    #[error("unknown ZPA cloud '{0}', expected one of PRODUCTION, BETA, GOV, GOVUS, PREVIEW, ZPATWO")]
    UnknownCloud(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// ZPA cloud a tenant lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cloud {
    #[default]
    Production,
    Beta,
    Gov,
    GovUs,
    Preview,
    ZpaTwo,
}

impl Cloud {
    pub const ALL: [&'static str; 6] = ["PRODUCTION", "BETA", "GOV", "GOVUS", "PREVIEW", "ZPATWO"];

    /// Management API host for this cloud
    pub fn base_url(&self) -> &'static str {
        match self {
            Cloud::Production => "https://config.private.zscaler.com",
            Cloud::Beta => "https://config.zpabeta.net",
            Cloud::Gov => "https://config.zpagov.net",
            Cloud::GovUs => "https://config.zpagov.us",
            Cloud::Preview => "https://config.zpapreview.net",
            Cloud::ZpaTwo => "https://config.zpatwo.net",
        }
    }
}

impl FromStr for Cloud {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "PRODUCTION" => Ok(Cloud::Production),
            "BETA" => Ok(Cloud::Beta),
            "GOV" => Ok(Cloud::Gov),
            "GOVUS" => Ok(Cloud::GovUs),
            "PREVIEW" => Ok(Cloud::Preview),
            "ZPATWO" => Ok(Cloud::ZpaTwo),
            _ => Err(ConfigError::UnknownCloud(s.to_string())),
        }
    }
}

/// Contents of `~/.zpa/credentials.json`
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsFile {
    #[serde(default)]
    pub zpa_client_id: Option<String>,
    #[serde(default)]
    pub zpa_client_secret: Option<String>,
    #[serde(default)]
    pub zpa_customer_id: Option<String>,
    #[serde(default)]
    pub zpa_cloud: Option<String>,
}

impl CredentialsFile {
    /// Get the credentials file path
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".zpa").join("credentials.json"))
    }

    /// Load the credentials file; a missing or unreadable file yields defaults
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        tracing::info!("Loading credentials file at {:?}", path);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::warn!("Failed to read credentials file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed credentials file: {}", e);
            Self::default()
        })
    }
}

/// Provider configuration as supplied by the caller; every field optional
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub customer_id: Option<String>,
    pub cloud: Option<String>,
    pub microtenant_id: Option<String>,
    /// Overrides the cloud's host (proxies, tests)
    pub base_url: Option<String>,
}

/// Fully resolved settings used to build a client
#[derive(Clone)]
pub struct ResolvedConfig {
    pub client_id: String,
    pub client_secret: String,
    pub customer_id: String,
    pub base_url: String,
    pub microtenant_id: Option<String>,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("customer_id", &self.customer_id)
            .field("base_url", &self.base_url)
            .field("microtenant_id", &self.microtenant_id)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_var(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

impl ProviderConfig {
    /// Fill unset fields from the environment
    pub fn with_env(self) -> Self {
        Self {
            client_id: non_empty(self.client_id).or_else(|| env_var(ENV_CLIENT_ID)),
            client_secret: non_empty(self.client_secret).or_else(|| env_var(ENV_CLIENT_SECRET)),
            customer_id: non_empty(self.customer_id).or_else(|| env_var(ENV_CUSTOMER_ID)),
            cloud: non_empty(self.cloud).or_else(|| env_var(ENV_CLOUD)),
            microtenant_id: non_empty(self.microtenant_id).or_else(|| env_var(ENV_MICROTENANT_ID)),
            base_url: non_empty(self.base_url).or_else(|| env_var(ENV_BASE_URL)),
        }
    }

    /// Fill unset fields from a credentials file
    pub fn with_file(self, file: &CredentialsFile) -> Self {
        Self {
            client_id: non_empty(self.client_id).or_else(|| non_empty(file.zpa_client_id.clone())),
            client_secret: non_empty(self.client_secret)
                .or_else(|| non_empty(file.zpa_client_secret.clone())),
            customer_id: non_empty(self.customer_id)
                .or_else(|| non_empty(file.zpa_customer_id.clone())),
            cloud: non_empty(self.cloud).or_else(|| non_empty(file.zpa_cloud.clone())),
            ..self
        }
    }

    /// Resolve with precedence explicit > environment > credentials file
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let config = self.with_env();
        let config = if config.has_credentials() {
            config
        } else {
            config.with_file(&CredentialsFile::load())
        };
        config.finish()
    }

    fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.customer_id.is_some()
    }

    /// Validate without consulting environment or files
    pub fn finish(self) -> Result<ResolvedConfig, ConfigError> {
        let client_id = non_empty(self.client_id).ok_or(ConfigError::MissingCredential {
            field: "client_id",
            env: ENV_CLIENT_ID,
        })?;
        let client_secret = non_empty(self.client_secret).ok_or(ConfigError::MissingCredential {
            field: "client_secret",
            env: ENV_CLIENT_SECRET,
        })?;
        let customer_id = non_empty(self.customer_id).ok_or(ConfigError::MissingCredential {
            field: "customer_id",
            env: ENV_CUSTOMER_ID,
        })?;

        let base_url = match non_empty(self.base_url) {
            Some(url) => {
                Url::parse(&url).map_err(|e| ConfigError::InvalidBaseUrl {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
                url.trim_end_matches('/').to_string()
            }
            None => {
                let cloud: Cloud = self.cloud.as_deref().unwrap_or("").parse()?;
                cloud.base_url().to_string()
            }
        };

        Ok(ResolvedConfig {
            client_id,
            client_secret,
            customer_id,
            base_url,
            microtenant_id: non_empty(self.microtenant_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explicit() -> ProviderConfig {
        ProviderConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            customer_id: Some("216196257331281920".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_cloud_parse_is_case_insensitive() {
        assert_eq!("beta".parse::<Cloud>().unwrap(), Cloud::Beta);
        assert_eq!("GovUs".parse::<Cloud>().unwrap(), Cloud::GovUs);
        assert_eq!("".parse::<Cloud>().unwrap(), Cloud::Production);
        assert!("mars".parse::<Cloud>().is_err());
    }

    #[test]
    fn test_finish_defaults_to_production_host() {
        let resolved = explicit().finish().unwrap();
        assert_eq!(resolved.base_url, "https://config.private.zscaler.com");
        assert_eq!(resolved.microtenant_id, None);
    }

    #[test]
    fn test_finish_uses_base_url_override() {
        let config = ProviderConfig {
            base_url: Some("http://127.0.0.1:8080/".into()),
            cloud: Some("BETA".into()),
            ..explicit()
        };
        assert_eq!(config.finish().unwrap().base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_finish_reports_missing_secret() {
        let config = ProviderConfig {
            client_secret: Some("  ".into()),
            ..explicit()
        };
        let err = config.finish().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential {
                field: "client_secret",
                ..
            }
        ));
    }

    #[test]
    fn test_file_only_fills_unset_fields() {
        let file = CredentialsFile::parse(
            r#"{"zpa_client_id":"file-id","zpa_client_secret":"file-secret","zpa_customer_id":"1","zpa_cloud":"GOV"}"#,
        );
        let config = ProviderConfig {
            client_id: Some("explicit-id".into()),
            ..Default::default()
        }
        .with_file(&file)
        .finish()
        .unwrap();

        assert_eq!(config.client_id, "explicit-id");
        assert_eq!(config.client_secret, "file-secret");
        assert_eq!(config.base_url, Cloud::Gov.base_url());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let resolved = ProviderConfig {
            client_secret: Some("hunter2".into()),
            ..explicit()
        }
        .finish()
        .unwrap();
        assert!(!format!("{:?}", resolved).contains("hunter2"));
    }
}
