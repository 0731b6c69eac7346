//! Data Source Registry - Load data source definitions from JSON
//!
//! This module loads every ZPA data source definition from embedded JSON
//! files and provides lookup functions for the provider.

use super::flatten::FieldDef;
use super::schema::{AttrKind, Attribute, Schema, Validator};
use super::value::AttrValue;
use crate::zpa::ApiFamily;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Embedded definition files (compiled into the binary)
const DEFINITION_FILES: &[&str] = &[
    include_str!("../resources/connectors.json"),
    include_str!("../resources/applications.json"),
    include_str!("../resources/identity.json"),
    include_str!("../resources/policy.json"),
    include_str!("../resources/inspection.json"),
    include_str!("../resources/isolation.json"),
    include_str!("../resources/portals.json"),
    include_str!("../resources/locations.json"),
];

/// Prefix of every data source type name
pub const TYPE_PREFIX: &str = "zpa_";

/// Where a collection lives
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointDef {
    pub api: ApiFamily,
    /// Collection path; may contain `{attribute}` placeholders
    pub path: String,
    /// Path for get-by-id when it differs from the collection path
    #[serde(default)]
    pub get_path: Option<String>,
    /// Entities are nested under this field of each listed item
    #[serde(default)]
    pub list_path: Option<String>,
}

impl EndpointDef {
    pub fn item_path(&self) -> &str {
        self.get_path.as_deref().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LookupMode {
    /// One entity picked by id or name
    #[default]
    Entity,
    /// One document, no identifier
    Singleton,
    /// Every listed entity, read as one document
    Collection,
}

/// How the API supports finding an entity by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NameLookup {
    /// `search=<name>` on the listing, then an exact match on the client
    Search,
    /// Only by scanning the full listing
    #[default]
    List,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupDef {
    #[serde(default)]
    pub mode: LookupMode,
    #[serde(default = "default_true")]
    pub get_by_id: bool,
    #[serde(default)]
    pub get_by_name: NameLookup,
    /// State id of a document read; `{input}` placeholders are filled in
    #[serde(default)]
    pub fixed_id: Option<String>,
}

impl Default for LookupDef {
    fn default() -> Self {
        Self {
            mode: LookupMode::Entity,
            get_by_id: true,
            get_by_name: NameLookup::List,
            fixed_id: None,
        }
    }
}

/// Which lookups need a parent or an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequiredFor {
    #[default]
    Always,
    /// Only when the target is looked up by name (no `id`)
    NameLookup,
}

impl RequiredFor {
    pub fn applies(self, by_id: bool) -> bool {
        match self {
            RequiredFor::Always => true,
            RequiredFor::NameLookup => !by_id,
        }
    }
}

/// Placeholder in an endpoint path that receives the resolved parent id
pub const PARENT_PLACEHOLDER: &str = "parent_id";

/// Entity that must be resolved before the target (e.g. the IdP of a SCIM group)
#[derive(Debug, Clone, Deserialize)]
pub struct ParentDef {
    /// Data source key of the parent
    pub source: String,
    /// Absent when the parent can only be named
    #[serde(default)]
    pub id_attribute: Option<String>,
    pub name_attribute: String,
    #[serde(default)]
    pub required_for: RequiredFor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    String,
    Bool,
}

/// Extra caller-supplied argument
#[derive(Debug, Clone, Deserialize)]
pub struct InputDef {
    pub name: String,
    #[serde(default)]
    pub kind: InputKind,
    #[serde(default)]
    pub description: Option<String>,
    /// Unset means the input is optional
    #[serde(default)]
    pub required_for: Option<RequiredFor>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub one_of: Vec<String>,
    /// Sent as this query parameter on listings
    #[serde(default)]
    pub query_param: Option<String>,
    /// Listed entities must carry the input's value in this field
    #[serde(default)]
    pub match_field: Option<String>,
}

impl InputDef {
    /// Required by the schema itself, whatever the lookup
    pub fn always_required(&self) -> bool {
        self.required_for == Some(RequiredFor::Always)
    }

    pub fn attr_kind(&self) -> AttrKind {
        match self.kind {
            InputKind::String => AttrKind::String,
            InputKind::Bool => AttrKind::Bool,
        }
    }

    /// Echo an input back into state with its declared type
    pub fn state_value(&self, text: &str) -> AttrValue {
        match self.kind {
            InputKind::Bool => match text {
                "true" => AttrValue::Bool(true),
                "false" => AttrValue::Bool(false),
                _ => AttrValue::Null,
            },
            InputKind::String => AttrValue::string(text),
        }
    }
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_name_field() -> String {
    "name".to_string()
}

/// Data source definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceDef {
    pub description: String,
    /// Entity name used in messages, e.g. "segment group"
    pub label: String,
    pub endpoint: EndpointDef,
    #[serde(default)]
    pub lookup: LookupDef,
    /// Accepts a microtenant scope
    #[serde(default)]
    pub scoped: bool,
    #[serde(default)]
    pub parent: Option<ParentDef>,
    #[serde(default)]
    pub inputs: Vec<InputDef>,
    pub fields: Vec<FieldDef>,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_name_field")]
    pub name_field: String,
}

impl DataSourceDef {
    /// Entity lookups take an `id` or `name`; documents take neither
    pub fn takes_identifier(&self) -> bool {
        self.lookup.mode == LookupMode::Entity
    }

    /// State id of a document read: `fixed_id` with `{input}` placeholders
    /// filled in
    pub fn fixed_id(&self, inputs: &BTreeMap<String, String>) -> Option<String> {
        let mut id = self.lookup.fixed_id.clone()?;
        for (name, value) in inputs {
            id = id.replace(&format!("{{{}}}", name), value);
        }
        Some(id)
    }

    /// Build the schema: identifiers and inputs first, then computed fields
    pub fn schema(&self) -> Schema {
        let mut schema = Schema::new(self.description.clone());

        if !self.takes_identifier() {
            schema = schema.with_attribute("id", Attribute::computed(AttrKind::String));
        } else {
            schema = schema
                .with_attribute(
                    "id",
                    Attribute::optional_computed(AttrKind::String)
                        .with_description(format!("ID of the {}", self.label)),
                )
                .with_attribute(
                    "name",
                    Attribute::optional_computed(AttrKind::String)
                        .with_description(format!("Name of the {}", self.label)),
                );
        }

        if self.scoped {
            schema = schema.with_attribute(
                "microtenant_id",
                Attribute::optional_computed(AttrKind::String)
                    .with_description("Microtenant the lookup is scoped to"),
            );
        }

        if let Some(parent) = &self.parent {
            if let Some(id_attribute) = &parent.id_attribute {
                schema = schema.with_attribute(
                    id_attribute,
                    Attribute::optional_computed(AttrKind::String),
                );
            }
            // a name-only parent must be named whatever the lookup
            let name_attribute = if parent.id_attribute.is_none() {
                Attribute::required(AttrKind::String)
            } else {
                Attribute::optional_computed(AttrKind::String)
            };
            schema = schema.with_attribute(&parent.name_attribute, name_attribute);
        }

        for input in &self.inputs {
            let mut attribute = if input.always_required() {
                Attribute::required(input.attr_kind())
            } else {
                Attribute::optional_computed(input.attr_kind())
            };
            if let Some(description) = &input.description {
                attribute = attribute.with_description(description.clone());
            }
            if !input.one_of.is_empty() {
                attribute = attribute.with_validator(Validator::OneOf {
                    values: input.one_of.clone(),
                });
            }
            schema = schema.with_attribute(&input.name, attribute);
        }

        for field in &self.fields {
            let mut attribute = Attribute::computed(field.attr_kind());
            if let Some(description) = &field.description {
                attribute = attribute.with_description(description.clone());
            }
            schema = schema.with_default_attribute(&field.name, attribute);
        }

        schema
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub data_sources: HashMap<String, DataSourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<RegistryConfig> = OnceLock::new();

/// Get the registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static RegistryConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = RegistryConfig {
            data_sources: HashMap::new(),
        };

        for content in DEFINITION_FILES {
            let partial: RegistryConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded data source JSON: {}", e));
            final_config.data_sources.extend(partial.data_sources);
        }

        final_config
    })
}

/// Get a definition by key (without the `zpa_` prefix)
pub fn get_data_source(key: &str) -> Option<&'static DataSourceDef> {
    get_registry().data_sources.get(key)
}

/// Get all definition keys, sorted
pub fn get_all_data_source_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = get_registry()
        .data_sources
        .keys()
        .map(|s| s.as_str())
        .collect();
    keys.sort_unstable();
    keys
}

/// `zpa_segment_group` -> `segment_group`
pub fn key_for_type_name(type_name: &str) -> Option<&str> {
    type_name.strip_prefix(TYPE_PREFIX)
}

/// Substitute `{attribute}` placeholders in an endpoint path.
/// Values are percent-encoded; unknown placeholders are left as is.
pub fn fill_path(template: &str, values: &HashMap<String, String>) -> String {
    let mut path = template.to_string();
    for (key, value) in values {
        let placeholder = format!("{{{}}}", key);
        if path.contains(&placeholder) {
            path = path.replace(&placeholder, &urlencoding::encode(value));
        }
    }
    path
}
