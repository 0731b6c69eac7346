//! Data sources
//!
//! Every ZPA data source follows the same shape: declare a schema, accept a
//! configured client, read one entity and flatten it into state. The shape is
//! implemented once by [`GenericDataSource`] and parameterised by the
//! definitions in [`registry`].
//!
//! # Module Structure
//!
//! - [`value`] - Three-state inputs and typed output values
//! - [`schema`] - Attribute declarations and config validation
//! - [`diagnostics`] - User-facing error and warning records
//! - [`error`] - Lookup errors and their categories
//! - [`resolver`] - Generic id / name / list-scan entity resolution
//! - [`flatten`] - Entity to output record projection
//! - [`registry`] - Embedded data source definitions
//! - [`source`] - REST-backed entity source

pub mod diagnostics;
pub mod error;
pub mod flatten;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod source;
pub mod value;

pub use diagnostics::{Category, Diagnostic, Diagnostics, Severity};
pub use error::LookupError;
pub use registry::{DataSourceDef, ParentDef, RequiredFor};
pub use resolver::{resolve, Capabilities, EntitySource, LookupRequest};
pub use schema::Schema;
pub use value::{AttrValue, ConfigValues, OutputRecord, Presence};

use crate::zpa::ZpaClient;
use async_trait::async_trait;
use flatten::extract_json_value;
use registry::LookupMode;
use resolver::{key_text, require_identifier};
use serde_json::Value;
use source::RestEntitySource;
use std::collections::BTreeMap;

/// Attribute carrying the microtenant scope of a lookup
pub const MICROTENANT_ATTRIBUTE: &str = "microtenant_id";

/// Lifecycle of a data source as driven by the provider
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Type name, e.g. `zpa_segment_group`
    fn metadata(&self) -> String;

    fn schema(&self) -> Schema;

    /// Hand over the provider's client; `None` leaves the source unconfigured
    fn configure(&mut self, client: Option<ZpaClient>);

    /// Resolve and flatten one entity. Any error aborts the read and no
    /// partial state is returned.
    async fn read(&self, config: &ConfigValues) -> Result<OutputRecord, Diagnostics>;
}

/// Parent entity resolved ahead of the target
#[derive(Debug, Clone)]
struct ParentRef {
    id: String,
    name: Option<String>,
}

/// A data source described by a registry definition
#[derive(Debug, Clone)]
pub struct GenericDataSource {
    key: String,
    def: &'static DataSourceDef,
    client: Option<ZpaClient>,
}

impl GenericDataSource {
    /// Look up a definition by key (`segment_group`)
    pub fn new(key: &str) -> Option<Self> {
        registry::get_data_source(key).map(|def| Self::from_def(key, def))
    }

    pub fn from_def(key: &str, def: &'static DataSourceDef) -> Self {
        Self {
            key: key.to_string(),
            def,
            client: None,
        }
    }

    fn string_input(config: &ConfigValues, name: &str) -> Presence<String> {
        Presence::from_attr(config.get(name))
    }

    async fn resolve_parent(
        &self,
        parent: &ParentDef,
        client: &ZpaClient,
        config: &ConfigValues,
        scope: &Presence<String>,
    ) -> Result<ParentRef, LookupError> {
        let parent_def = registry::get_data_source(&parent.source).ok_or_else(|| {
            LookupError::Validation(format!(
                "Unknown parent data source \"{}\" for {}.",
                parent.source, self.def.label
            ))
        })?;

        let request = LookupRequest {
            id: parent
                .id_attribute
                .as_deref()
                .map(|attribute| Self::string_input(config, attribute))
                .unwrap_or_default(),
            name: Self::string_input(config, &parent.name_attribute),
            scope: scope.clone(),
        };
        if !request.has_identifier() {
            let wanted = match &parent.id_attribute {
                Some(id_attribute) => format!(
                    "Either '{}' or '{}'",
                    id_attribute, parent.name_attribute
                ),
                None => format!("'{}'", parent.name_attribute),
            };
            return Err(LookupError::MissingIdentifier(format!(
                "{} must be provided to read a {}.",
                wanted, self.def.label
            )));
        }

        let source = RestEntitySource::new(parent_def, client.clone());
        let entity = resolve(&source, &request).await?;

        let id = extract_json_value(&entity, &parent_def.id_field)
            .and_then(key_text)
            .ok_or_else(|| {
                LookupError::not_found(
                    &parent_def.label,
                    request.id.as_deref(),
                    request.name.as_deref(),
                )
            })?;
        let name = extract_json_value(&entity, &parent_def.name_field)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        tracing::debug!(parent = %parent_def.label, id = %id, "Resolved parent");
        Ok(ParentRef { id, name })
    }

    async fn fetch_singleton(
        &self,
        source: &RestEntitySource<'_>,
        scope: Option<&str>,
    ) -> Result<Value, LookupError> {
        match source.fetch_one(scope).await {
            Ok(entity) if !entity.is_null() => Ok(entity),
            Ok(_) => Err(LookupError::not_found(&self.def.label, None, None)),
            Err(e) if e.is_not_found() => Err(LookupError::not_found(&self.def.label, None, None)),
            Err(e) => Err(LookupError::client(&self.def.label, e)),
        }
    }

    /// Every listed entity as one array document; an empty listing is not
    /// an error
    async fn fetch_collection(
        &self,
        source: &RestEntitySource<'_>,
        scope: Option<&str>,
    ) -> Result<Value, LookupError> {
        let items = source
            .list_all(scope)
            .await
            .map_err(|e| LookupError::client(&self.def.label, e))?;
        tracing::debug!("Listed {} {} entries", items.len(), self.def.label);
        Ok(Value::Array(items))
    }

    async fn read_validated(
        &self,
        client: &ZpaClient,
        config: &ConfigValues,
    ) -> Result<OutputRecord, LookupError> {
        let def = self.def;

        let scope = if def.scoped {
            Self::string_input(config, MICROTENANT_ATTRIBUTE)
        } else {
            Presence::Unset
        };

        let request = LookupRequest {
            id: Self::string_input(config, "id"),
            name: Self::string_input(config, "name"),
            scope: scope.clone(),
        };
        let by_id = request.id.is_present();

        // no request at all, not even for the parent, without an identifier
        if def.takes_identifier() {
            require_identifier(&request, &def.label)?;
        }

        let mut inputs: BTreeMap<String, String> = BTreeMap::new();
        let mut source = RestEntitySource::new(def, client.clone());
        for input in &def.inputs {
            let value = Self::string_input(config, &input.name)
                .into_option()
                .or_else(|| input.default.clone());
            let Some(value) = value else {
                match input.required_for {
                    Some(RequiredFor::NameLookup) if !by_id => {
                        return Err(LookupError::Validation(format!(
                            "When 'name' is specified, '{}' must also be provided.",
                            input.name
                        )));
                    }
                    Some(RequiredFor::Always) => {
                        return Err(LookupError::Validation(format!(
                            "'{}' must be provided to read a {}.",
                            input.name, def.label
                        )));
                    }
                    _ => continue,
                }
            };

            source = source.with_path_value(&input.name, &value);
            if let Some(param) = &input.query_param {
                source = source.with_query(param, &value);
            }
            if let Some(field) = &input.match_field {
                source = source.with_match(field, &value);
            }
            inputs.insert(input.name.clone(), value);
        }

        let mut parent = None;
        let entity = match def.lookup.mode {
            LookupMode::Singleton => self.fetch_singleton(&source, scope.as_deref()).await?,
            LookupMode::Collection => self.fetch_collection(&source, scope.as_deref()).await?,
            LookupMode::Entity => {
                if let Some(parent_def) =
                    def.parent.as_ref().filter(|p| p.required_for.applies(by_id))
                {
                    let resolved = self
                        .resolve_parent(parent_def, client, config, &scope)
                        .await?;
                    source = source.with_path_value(registry::PARENT_PLACEHOLDER, &resolved.id);
                    parent = Some((parent_def, resolved));
                }

                resolve(&source, &request).await?
            }
        };

        let mut record = flatten::flatten(&entity, &def.fields);

        let entity_id = extract_json_value(&entity, &def.id_field).and_then(key_text);
        let id = if def.takes_identifier() {
            entity_id.unwrap_or_default()
        } else {
            def.fixed_id(&inputs)
                .or(entity_id)
                .unwrap_or_else(|| self.key.clone())
        };
        record.insert("id".to_string(), AttrValue::String(id.clone()));

        if def.takes_identifier() {
            let name = extract_json_value(&entity, &def.name_field).and_then(|v| v.as_str());
            fill_if_null(&mut record, "name", name.map(AttrValue::string));
        }

        for input in &def.inputs {
            if let Some(value) = inputs.get(&input.name) {
                fill_if_null(&mut record, &input.name, Some(input.state_value(value)));
            }
        }

        if let Some((parent_def, resolved)) = parent {
            if let Some(id_attribute) = &parent_def.id_attribute {
                fill_if_null(&mut record, id_attribute, Some(AttrValue::String(resolved.id)));
            }
            fill_if_null(
                &mut record,
                &parent_def.name_attribute,
                resolved.name.map(AttrValue::String),
            );
        }

        if def.scoped {
            let microtenant = entity
                .get("microtenantId")
                .and_then(key_text)
                .or_else(|| scope.into_option());
            fill_if_null(&mut record, MICROTENANT_ATTRIBUTE, microtenant.map(AttrValue::String));
        }

        // every declared attribute appears in state
        for name in def.schema().attributes.keys() {
            record.entry(name.clone()).or_insert(AttrValue::Null);
        }

        tracing::info!("Read {} {}", def.label, id);
        Ok(record)
    }
}

/// Set `key` unless it already holds a value; blank strings count as unset
fn fill_if_null(record: &mut OutputRecord, key: &str, value: Option<AttrValue>) {
    let Some(value) = value.filter(|v| !v.is_null() && v.as_str() != Some("")) else {
        return;
    };
    let slot = record.entry(key.to_string()).or_insert(AttrValue::Null);
    if slot.is_null() {
        *slot = value;
    }
}

#[async_trait]
impl DataSource for GenericDataSource {
    fn metadata(&self) -> String {
        format!("{}{}", registry::TYPE_PREFIX, self.key)
    }

    fn schema(&self) -> Schema {
        self.def.schema()
    }

    fn configure(&mut self, client: Option<ZpaClient>) {
        self.client = client;
    }

    async fn read(&self, config: &ConfigValues) -> Result<OutputRecord, Diagnostics> {
        let Some(client) = &self.client else {
            return Err(LookupError::Unconfigured.into());
        };

        let diags = self.schema().validate(config);
        if diags.has_error() {
            return Err(diags);
        }

        self.read_validated(client, config).await.map_err(|e| {
            tracing::debug!("Reading {} failed: {}", self.metadata(), e);
            Diagnostics::from(e)
        })
    }
}
