//! Provider
//!
//! Owns the configured ZPA client and hands it to data sources explicitly.

use crate::config::{Cloud, ProviderConfig};
use crate::datasource::registry::{self, TYPE_PREFIX};
use crate::datasource::schema::{AttrKind, Attribute, Validator};
use crate::datasource::{
    Category, ConfigValues, DataSource, Diagnostics, GenericDataSource, OutputRecord, Presence,
    Schema,
};
use crate::zpa::ZpaClient;

#[derive(Debug, Clone)]
pub struct ZpaProvider {
    version: String,
    client: Option<ZpaClient>,
}

impl ZpaProvider {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            client: None,
        }
    }

    pub fn user_agent(&self) -> String {
        format!("zpa-lookup/{}", self.version)
    }

    /// Schema of the provider block
    pub fn schema() -> Schema {
        Schema::new("Zscaler Private Access data source provider")
            .with_attribute(
                "client_id",
                Attribute::optional(AttrKind::String)
                    .with_description("API client ID (ZPA_CLIENT_ID)"),
            )
            .with_attribute(
                "client_secret",
                Attribute::optional(AttrKind::String)
                    .with_description("API client secret (ZPA_CLIENT_SECRET)")
                    .sensitive(),
            )
            .with_attribute(
                "customer_id",
                Attribute::optional(AttrKind::String)
                    .with_description("Tenant customer ID (ZPA_CUSTOMER_ID)"),
            )
            .with_attribute(
                "cloud",
                Attribute::optional(AttrKind::String)
                    .with_description("ZPA cloud (ZPA_CLOUD); defaults to PRODUCTION")
                    .with_validator(Validator::OneOf {
                        values: Cloud::ALL.iter().map(|c| c.to_string()).collect(),
                    }),
            )
            .with_attribute(
                "microtenant_id",
                Attribute::optional(AttrKind::String)
                    .with_description("Default microtenant scope (ZPA_MICROTENANT_ID)"),
            )
            .with_attribute(
                "base_url",
                Attribute::optional(AttrKind::String)
                    .with_description("Override of the cloud's API host (ZPA_BASE_URL)"),
            )
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Resolve settings and build the client. On error the provider stays
    /// unconfigured and data source reads report it.
    pub fn configure(&mut self, config: ProviderConfig) -> Diagnostics {
        let mut diags = Diagnostics::new();

        let resolved = match config.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                diags.add_error(Category::ValidationError, e.to_string());
                return diags;
            }
        };

        match ZpaClient::new(&resolved, &self.user_agent()) {
            Ok(client) => {
                tracing::info!(
                    "Configured ZPA provider for customer {} at {}",
                    resolved.customer_id,
                    resolved.base_url
                );
                self.client = Some(client);
            }
            Err(e) => diags.add_error(Category::ClientError, e.to_string()),
        }

        diags
    }

    /// Configure from a provider block
    pub fn configure_values(&mut self, values: &ConfigValues) -> Diagnostics {
        let diags = Self::schema().validate(values);
        if diags.has_error() {
            return diags;
        }

        let text = |key: &str| Presence::from_attr(values.get(key)).into_option();
        self.configure(ProviderConfig {
            client_id: text("client_id"),
            client_secret: text("client_secret"),
            customer_id: text("customer_id"),
            cloud: text("cloud"),
            microtenant_id: text("microtenant_id"),
            base_url: text("base_url"),
        })
    }

    /// Type names of every data source, sorted
    pub fn data_source_names() -> Vec<String> {
        registry::get_all_data_source_keys()
            .into_iter()
            .map(|key| format!("{}{}", TYPE_PREFIX, key))
            .collect()
    }

    /// A data source wired to this provider's client
    pub fn data_source(&self, type_name: &str) -> Option<GenericDataSource> {
        let key = registry::key_for_type_name(type_name)?;
        let mut source = GenericDataSource::new(key)?;
        source.configure(self.client.clone());
        Some(source)
    }

    /// Read one data source
    pub async fn read(
        &self,
        type_name: &str,
        config: &ConfigValues,
    ) -> Result<OutputRecord, Diagnostics> {
        let Some(source) = self.data_source(type_name) else {
            let mut diags = Diagnostics::new();
            diags.add_error(
                Category::ValidationError,
                format!(
                    "The data source type \"{}\" is not supported by this provider.",
                    type_name
                ),
            );
            return Err(diags);
        };

        tracing::debug!("Reading data source {}", type_name);
        source.read(config).await
    }
}
