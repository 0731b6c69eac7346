//! Data-source lookups for Zscaler Private Access
//!
//! Resolves one ZPA entity by id or name, or reads one singleton document,
//! and flattens it into a typed output record.
//!
//! ```ignore
//! use zpa_lookup::config::ProviderConfig;
//! use zpa_lookup::datasource::{AttrValue, ConfigValues};
//! use zpa_lookup::provider::ZpaProvider;
//!
//! async fn example() {
//!     let mut provider = ZpaProvider::new(zpa_lookup::VERSION);
//!     provider.configure(ProviderConfig::default());
//!
//!     let mut config = ConfigValues::new();
//!     config.insert("name".into(), AttrValue::string("web servers"));
//!     let state = provider.read("zpa_server_group", &config).await;
//! }
//! ```

pub mod config;
pub mod datasource;
pub mod provider;
pub mod zpa;

/// Version injected at compile time via ZPA_LOOKUP_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("ZPA_LOOKUP_VERSION") {
    Some(v) => v,
    None => "dev",
};
