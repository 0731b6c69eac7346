//! Flattener
//!
//! Projects a remote entity onto the output attributes declared by a
//! definition's field table. Unset strings and empty collections become
//! [`AttrValue::Null`]; child collections keep their source order.

use super::schema::AttrKind;
use super::value::{AttrValue, OutputRecord};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Output type of a mapped field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    String,
    Bool,
    Int64,
    StringList,
    StringMap,
    ObjectList,
}

/// One row of a field-mapping table
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    /// Output attribute name
    pub name: String,
    /// Dot path into the entity; defaults to `name`
    #[serde(default)]
    pub json_path: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
    /// Child table for `object_list` fields
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FieldDef {
    pub fn new(name: &str, json_path: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            json_path: Some(json_path.to_string()),
            kind,
            fields: Vec::new(),
            description: None,
        }
    }

    pub fn object_list(name: &str, json_path: &str, fields: Vec<FieldDef>) -> Self {
        Self {
            fields,
            ..Self::new(name, json_path, FieldKind::ObjectList)
        }
    }

    pub fn path(&self) -> &str {
        self.json_path.as_deref().unwrap_or(&self.name)
    }

    /// Schema type of the output attribute
    pub fn attr_kind(&self) -> AttrKind {
        match self.kind {
            FieldKind::String => AttrKind::String,
            FieldKind::Bool => AttrKind::Bool,
            FieldKind::Int64 => AttrKind::Int64,
            FieldKind::StringList => AttrKind::StringList,
            FieldKind::StringMap => AttrKind::StringMap,
            FieldKind::ObjectList => AttrKind::ObjectList {
                attributes: self
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.attr_kind()))
                    .collect(),
            },
        }
    }
}

/// Extract a value from JSON using a dot-notation path; the empty path is
/// the whole document
pub fn extract_json_value<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = item;
    if path.is_empty() {
        return Some(current);
    }

    for part in path.split('.') {
        current = match part.parse::<usize>() {
            Ok(idx) if current.is_array() => current.get(idx)?,
            _ => current.get(part)?,
        };
    }

    Some(current)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn flatten_string(value: Option<&Value>) -> AttrValue {
    match value {
        None | Some(Value::Null) => AttrValue::Null,
        Some(v @ (Value::Array(_) | Value::Object(_))) => {
            let empty = v.as_array().map(|a| a.is_empty()).unwrap_or(false)
                || v.as_object().map(|o| o.is_empty()).unwrap_or(false);
            if empty {
                AttrValue::Null
            } else {
                AttrValue::String(v.to_string())
            }
        }
        Some(v) => scalar_text(v).map(AttrValue::String).unwrap_or(AttrValue::Null),
    }
}

fn flatten_bool(value: Option<&Value>) -> AttrValue {
    match value {
        Some(Value::Bool(b)) => AttrValue::Bool(*b),
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => AttrValue::Bool(true),
            "false" => AttrValue::Bool(false),
            _ => AttrValue::Null,
        },
        _ => AttrValue::Null,
    }
}

fn flatten_int(value: Option<&Value>) -> AttrValue {
    match value {
        Some(Value::Number(n)) => n.as_i64().map(AttrValue::Int).unwrap_or(AttrValue::Null),
        Some(Value::String(s)) => s.trim().parse().map(AttrValue::Int).unwrap_or(AttrValue::Null),
        _ => AttrValue::Null,
    }
}

fn flatten_string_list(value: Option<&Value>) -> AttrValue {
    let items: Vec<AttrValue> = match value {
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(scalar_text)
            .map(AttrValue::String)
            .collect(),
        Some(v) => scalar_text(v).map(AttrValue::String).into_iter().collect(),
        None => Vec::new(),
    };

    if items.is_empty() {
        AttrValue::Null
    } else {
        AttrValue::List(items)
    }
}

fn flatten_string_map(value: Option<&Value>) -> AttrValue {
    let entries: BTreeMap<String, AttrValue> = match value {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| scalar_text(v).map(|text| (k.clone(), AttrValue::String(text))))
            .collect(),
        _ => BTreeMap::new(),
    };

    if entries.is_empty() {
        AttrValue::Null
    } else {
        AttrValue::Object(entries)
    }
}

fn flatten_object_list(value: Option<&Value>, fields: &[FieldDef]) -> AttrValue {
    let items: Vec<AttrValue> = match value {
        Some(Value::Array(arr)) => arr
            .iter()
            .filter(|v| v.is_object())
            .map(|v| AttrValue::Object(flatten(v, fields)))
            .collect(),
        Some(v) if v.as_object().map(|m| !m.is_empty()).unwrap_or(false) => {
            vec![AttrValue::Object(flatten(v, fields))]
        }
        _ => Vec::new(),
    };

    if items.is_empty() {
        AttrValue::Null
    } else {
        AttrValue::List(items)
    }
}

/// Flatten one field of an entity
pub fn flatten_field(entity: &Value, field: &FieldDef) -> AttrValue {
    let value = extract_json_value(entity, field.path());
    match field.kind {
        FieldKind::String => flatten_string(value),
        FieldKind::Bool => flatten_bool(value),
        FieldKind::Int64 => flatten_int(value),
        FieldKind::StringList => flatten_string_list(value),
        FieldKind::StringMap => flatten_string_map(value),
        FieldKind::ObjectList => flatten_object_list(value, &field.fields),
    }
}

/// Flatten an entity through a field table
pub fn flatten(entity: &Value, fields: &[FieldDef]) -> OutputRecord {
    let mut record = BTreeMap::new();
    for field in fields {
        record.insert(field.name.clone(), flatten_field(entity, field));
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server_group_fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("id", "id", FieldKind::String),
            FieldDef::new("name", "name", FieldKind::String),
            FieldDef::new("description", "description", FieldKind::String),
            FieldDef::new("enabled", "enabled", FieldKind::Bool),
            FieldDef::new("creation_time", "creationTime", FieldKind::Int64),
            FieldDef::object_list(
                "app_connector_groups",
                "appConnectorGroups",
                vec![
                    FieldDef::new("id", "id", FieldKind::String),
                    FieldDef::new("name", "name", FieldKind::String),
                ],
            ),
            FieldDef::new("domain_names", "domainNames", FieldKind::StringList),
        ]
    }

    #[test]
    fn test_flatten_maps_and_renames_fields() {
        let entity = json!({
            "id": "72058304855015574",
            "name": "web",
            "description": "",
            "enabled": true,
            "creationTime": "1650000000",
            "appConnectorGroups": [
                {"id": "1", "name": "a"},
                {"id": "2", "name": "b"}
            ],
            "domainNames": ["a.example.com"]
        });

        let record = flatten(&entity, &server_group_fields());

        assert_eq!(record["id"], AttrValue::string("72058304855015574"));
        assert_eq!(record["description"], AttrValue::Null);
        assert_eq!(record["enabled"], AttrValue::Bool(true));
        assert_eq!(record["creation_time"], AttrValue::Int(1650000000));
        let groups = record["app_connector_groups"].as_list().unwrap();
        assert_eq!(groups.len(), 2);
        match &groups[1] {
            AttrValue::Object(obj) => assert_eq!(obj["name"], AttrValue::string("b")),
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_collections_flatten_to_null() {
        let entity = json!({"id": "1", "appConnectorGroups": [], "domainNames": []});
        let record = flatten(&entity, &server_group_fields());
        assert_eq!(record["app_connector_groups"], AttrValue::Null);
        assert_eq!(record["domain_names"], AttrValue::Null);
        // absent fields are null too
        assert_eq!(record["name"], AttrValue::Null);
        assert_eq!(record["enabled"], AttrValue::Null);
    }

    #[test]
    fn test_extract_json_value_paths() {
        let entity = json!({"a": {"b": [{"c": "x"}]}});
        assert_eq!(extract_json_value(&entity, "a.b.0.c"), Some(&json!("x")));
        assert_eq!(extract_json_value(&entity, "a.z"), None);
        assert_eq!(extract_json_value(&entity, ""), Some(&entity));
    }

    #[test]
    fn test_whole_document_field() {
        let field = FieldDef::new("values", "", FieldKind::StringList);
        let record = flatten(&json!(["UNKNOWN", "LOW", "HIGH"]), &[field.clone()]);
        assert_eq!(record["values"].as_list().map(|l| l.len()), Some(3));
        assert_eq!(flatten_field(&json!([]), &field), AttrValue::Null);
    }

    #[test]
    fn test_numbers_render_as_strings() {
        let field = FieldDef::new("id", "id", FieldKind::String);
        assert_eq!(flatten_field(&json!({"id": 42}), &field), AttrValue::string("42"));
    }

    #[test]
    fn test_string_map_keeps_scalar_entries() {
        let field = FieldDef::new("zpn_trans_log", "zpnTransLog", FieldKind::StringMap);
        let entity = json!({"zpnTransLog": {"BRK_MT_SETUP_FAIL": "Broker setup failed", "X": 1}});
        match flatten_field(&entity, &field) {
            AttrValue::Object(map) => {
                assert_eq!(map.len(), 2);
                assert_eq!(map["X"], AttrValue::string("1"));
            }
            other => panic!("expected map, got {:?}", other),
        }
        assert_eq!(flatten_field(&json!({"zpnTransLog": {}}), &field), AttrValue::Null);
    }

    #[test]
    fn test_attr_kind_of_object_list() {
        let kind = server_group_fields()[5].attr_kind();
        match kind {
            AttrKind::ObjectList { attributes } => {
                assert_eq!(attributes.len(), 2);
                assert_eq!(attributes["id"], AttrKind::String);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
