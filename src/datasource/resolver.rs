//! Entity Resolver
//!
//! Resolves exactly one remote entity from an id and/or name through
//! whatever lookups the remote API offers:
//!
//! 1. id given and the source can get by id: direct get
//! 2. name given (no id) and the source can get by name: name lookup
//! 3. otherwise list the whole collection and scan it, id match first,
//!    then case-insensitive name match
//!
//! Nothing is fetched when neither identifier is present. The request's
//! scope is handed to every call the resolver makes.

use super::error::LookupError;
use super::flatten::extract_json_value;
use super::value::Presence;
use crate::zpa::ApiError;
use async_trait::async_trait;
use serde_json::Value;

/// Lookups a remote collection supports besides listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub get_by_id: bool,
    pub get_by_name: bool,
}

impl Capabilities {
    pub const LIST_ONLY: Capabilities = Capabilities {
        get_by_id: false,
        get_by_name: false,
    };

    pub const ALL: Capabilities = Capabilities {
        get_by_id: true,
        get_by_name: true,
    };
}

/// A remote collection of entities
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Human readable entity name for messages, e.g. "segment group"
    fn label(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Field holding the entity id
    fn id_field(&self) -> &str {
        "id"
    }

    /// Field holding the entity name
    fn name_field(&self) -> &str {
        "name"
    }

    /// `Ok(None)` when the entity does not exist
    async fn get_by_id(&self, id: &str, scope: Option<&str>) -> Result<Option<Value>, ApiError>;

    /// `Ok(None)` when no entity carries the name (case-insensitive)
    async fn get_by_name(&self, name: &str, scope: Option<&str>)
        -> Result<Option<Value>, ApiError>;

    async fn list_all(&self, scope: Option<&str>) -> Result<Vec<Value>, ApiError>;
}

/// Identifiers of one lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupRequest {
    pub id: Presence<String>,
    pub name: Presence<String>,
    /// Microtenant qualifier passed to every source call
    pub scope: Presence<String>,
}

impl LookupRequest {
    pub fn new(id: Option<&str>, name: Option<&str>) -> Self {
        Self {
            id: Presence::from_option(id),
            name: Presence::from_option(name),
            scope: Presence::Unset,
        }
    }

    pub fn by_id(id: &str) -> Self {
        Self::new(Some(id), None)
    }

    pub fn by_name(name: &str) -> Self {
        Self::new(None, Some(name))
    }

    pub fn with_scope(mut self, scope: Option<&str>) -> Self {
        self.scope = Presence::from_option(scope);
        self
    }

    pub fn has_identifier(&self) -> bool {
        self.id.is_present() || self.name.is_present()
    }
}

/// Render an id or name field for comparison; ids arrive as strings or numbers
pub fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Position of the first entry matching by id (case-sensitive), else the
/// first matching by name (case-insensitive)
pub fn find_position(
    items: &[Value],
    id: Option<&str>,
    name: Option<&str>,
    id_field: &str,
    name_field: &str,
) -> Option<usize> {
    if let Some(id) = id {
        let found = items
            .iter()
            .position(|item| extract_json_value(item, id_field).and_then(key_text).as_deref() == Some(id));
        if found.is_some() {
            return found;
        }
    }

    let wanted = name?.to_lowercase();
    let mut matches = items.iter().enumerate().filter(|(_, item)| {
        extract_json_value(item, name_field)
            .and_then(|v| v.as_str())
            .map(|candidate| candidate.to_lowercase() == wanted)
            .unwrap_or(false)
    });

    let (first, _) = matches.next()?;
    let duplicates = matches.count();
    if duplicates > 0 {
        tracing::warn!(
            "{} entries share the name {:?}; using the first one returned by the API",
            duplicates + 1,
            wanted
        );
    }
    Some(first)
}

/// Take the matching entry out of a listing
pub fn find_in_list(
    items: Vec<Value>,
    id: Option<&str>,
    name: Option<&str>,
    id_field: &str,
    name_field: &str,
) -> Option<Value> {
    let position = find_position(&items, id, name, id_field, name_field)?;
    items.into_iter().nth(position)
}

/// Treat a 404 as absence; everything else is a client error
fn absent_on_404(
    result: Result<Option<Value>, ApiError>,
    label: &str,
) -> Result<Option<Value>, LookupError> {
    match result {
        Ok(found) => Ok(found),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(LookupError::client(label, e)),
    }
}

/// Fail with `MissingIdentifier` unless an id or a name is present
pub fn require_identifier(request: &LookupRequest, label: &str) -> Result<(), LookupError> {
    if request.has_identifier() {
        Ok(())
    } else {
        Err(LookupError::MissingIdentifier(format!(
            "Either 'id' or 'name' must be provided to read a {}.",
            label
        )))
    }
}

/// Resolve exactly one entity or fail
pub async fn resolve<S>(source: &S, request: &LookupRequest) -> Result<Value, LookupError>
where
    S: EntitySource + ?Sized,
{
    let label = source.label();
    require_identifier(request, label)?;

    let id = request.id.as_deref();
    let name = request.name.as_deref();
    let scope = request.scope.as_deref();

    let caps = source.capabilities();

    let found = match (id, name) {
        (Some(id), _) if caps.get_by_id => {
            tracing::debug!(id = %id, scope = ?scope, "Retrieving {} by ID", label);
            absent_on_404(source.get_by_id(id, scope).await, label)?
        }
        (None, Some(name)) if caps.get_by_name => {
            tracing::debug!(name = %name, scope = ?scope, "Retrieving {} by name", label);
            absent_on_404(source.get_by_name(name, scope).await, label)?
        }
        _ => {
            tracing::debug!(id = ?id, name = ?name, scope = ?scope, "Scanning {} listing", label);
            let items = source
                .list_all(scope)
                .await
                .map_err(|e| LookupError::client(label, e))?;
            find_in_list(items, id, name, source.id_field(), source.name_field())
        }
    };

    match found {
        Some(entity) if !entity.is_null() => Ok(entity),
        _ => Err(LookupError::not_found(label, id, name)),
    }
}
