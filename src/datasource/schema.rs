//! Schema declarations
//!
//! Static description of the attributes a data source accepts and returns,
//! and validation of a caller's configuration against it.

use super::diagnostics::{Category, Diagnostics};
use super::value::{AttrValue, ConfigValues};
use serde::Serialize;
use std::collections::BTreeMap;

/// Attribute type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttrKind {
    String,
    Bool,
    Int64,
    StringList,
    StringMap,
    ObjectList { attributes: BTreeMap<String, AttrKind> },
}

impl AttrKind {
    pub fn name(&self) -> &'static str {
        match self {
            AttrKind::String => "string",
            AttrKind::Bool => "bool",
            AttrKind::Int64 => "number",
            AttrKind::StringList => "list of string",
            AttrKind::StringMap => "map of string",
            AttrKind::ObjectList { .. } => "list of object",
        }
    }

    /// Whether a configured value fits this type.
    /// Numbers are accepted for strings since ids are often written unquoted.
    fn accepts(&self, value: &AttrValue) -> bool {
        match (self, value) {
            (_, AttrValue::Null) => true,
            (AttrKind::String, AttrValue::String(_) | AttrValue::Int(_)) => true,
            (AttrKind::Bool, AttrValue::Bool(_)) => true,
            (AttrKind::Int64, AttrValue::Int(_)) => true,
            (AttrKind::StringList, AttrValue::List(items)) => items
                .iter()
                .all(|i| matches!(i, AttrValue::String(_) | AttrValue::Int(_))),
            (AttrKind::StringMap, AttrValue::Object(map)) => {
                map.values().all(|v| matches!(v, AttrValue::String(_)))
            }
            (AttrKind::ObjectList { .. }, AttrValue::List(items)) => {
                items.iter().all(|i| matches!(i, AttrValue::Object(_)))
            }
            _ => false,
        }
    }
}

/// Who supplies an attribute's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrMode {
    Required,
    Optional,
    Computed,
    OptionalComputed,
}

impl AttrMode {
    pub fn accepts_input(&self) -> bool {
        !matches!(self, AttrMode::Computed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "validator", rename_all = "snake_case")]
pub enum Validator {
    OneOf { values: Vec<String> },
}

impl Validator {
    fn check(&self, name: &str, value: &AttrValue) -> Option<String> {
        match self {
            Validator::OneOf { values } => {
                let actual = value.as_str()?;
                if values.iter().any(|v| v == actual) {
                    None
                } else {
                    Some(format!(
                        "Attribute \"{}\" value must be one of: {:?}, got: {:?}",
                        name, values, actual
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    #[serde(flatten)]
    pub kind: AttrKind,
    pub mode: AttrMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl Attribute {
    pub fn new(kind: AttrKind, mode: AttrMode) -> Self {
        Self {
            kind,
            mode,
            description: None,
            sensitive: false,
            validators: Vec::new(),
        }
    }

    pub fn required(kind: AttrKind) -> Self {
        Self::new(kind, AttrMode::Required)
    }

    pub fn optional(kind: AttrKind) -> Self {
        Self::new(kind, AttrMode::Optional)
    }

    pub fn computed(kind: AttrKind) -> Self {
        Self::new(kind, AttrMode::Computed)
    }

    pub fn optional_computed(kind: AttrKind) -> Self {
        Self::new(kind, AttrMode::OptionalComputed)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Schema of a data source (or of the provider block)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    /// Insert unless an attribute of that name is already declared
    pub fn with_default_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.entry(name.to_string()).or_insert(attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Check a configuration; every violation becomes a Validation Error
    pub fn validate(&self, config: &ConfigValues) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for (name, value) in config {
            let Some(attribute) = self.attributes.get(name) else {
                diags.add_error(
                    Category::ValidationError,
                    format!("An argument named \"{}\" is not expected here.", name),
                );
                continue;
            };

            if value.is_null() {
                continue;
            }

            if !attribute.mode.accepts_input() {
                diags.add_error(
                    Category::ValidationError,
                    format!("Attribute \"{}\" is computed and cannot be set.", name),
                );
                continue;
            }

            if !attribute.kind.accepts(value) {
                diags.add_error(
                    Category::ValidationError,
                    format!(
                        "Attribute \"{}\" expects {}, got {}.",
                        name,
                        attribute.kind.name(),
                        value.type_name()
                    ),
                );
                continue;
            }

            for validator in &attribute.validators {
                if let Some(message) = validator.check(name, value) {
                    diags.add_error(Category::ValidationError, message);
                }
            }
        }

        for (name, attribute) in &self.attributes {
            if attribute.mode != AttrMode::Required {
                continue;
            }
            let missing = match config.get(name) {
                None | Some(AttrValue::Null) => true,
                Some(AttrValue::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if missing {
                diags.add_error(
                    Category::ValidationError,
                    format!(
                        "The argument \"{}\" is required, but no definition was found.",
                        name
                    ),
                );
            }
        }

        diags
    }
}
