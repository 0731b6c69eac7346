//! Lookup errors and their diagnostic categories

use super::diagnostics::{Category, Diagnostic, Diagnostics};
use crate::zpa::ApiError;
use thiserror::Error;

/// Errors that abort a data source read
#[derive(Debug, Error)]
pub enum LookupError {
    /// Read attempted before the provider handed over a client
    #[error("The ZPA provider was not configured. Configure the provider before using this data source.")]
    Unconfigured,

    #[error("{0}")]
    MissingIdentifier(String),

    #[error("{0}")]
    Validation(String),

    /// Transport, HTTP status or decoding failure
    #[error("Unable to read {entity}, got error: {source}")]
    Client { entity: String, source: ApiError },

    #[error("{entity} with id {id:?} or name {name:?} was not found.")]
    NotFound {
        entity: String,
        id: String,
        name: String,
    },
}

impl LookupError {
    pub fn client(entity: &str, source: ApiError) -> Self {
        LookupError::Client {
            entity: entity.to_string(),
            source,
        }
    }

    pub fn not_found(entity: &str, id: Option<&str>, name: Option<&str>) -> Self {
        LookupError::NotFound {
            entity: entity.to_string(),
            id: id.unwrap_or_default().to_string(),
            name: name.unwrap_or_default().to_string(),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            LookupError::Unconfigured => Category::UnconfiguredProvider,
            LookupError::MissingIdentifier(_) => Category::MissingIdentifier,
            LookupError::Validation(_) => Category::ValidationError,
            LookupError::Client { .. } => Category::ClientError,
            LookupError::NotFound { .. } => Category::NotFound,
        }
    }
}

impl From<LookupError> for Diagnostic {
    fn from(err: LookupError) -> Self {
        Diagnostic::error(err.category(), err.to_string())
    }
}

impl From<LookupError> for Diagnostics {
    fn from(err: LookupError) -> Self {
        Diagnostics::from(Diagnostic::from(err))
    }
}
