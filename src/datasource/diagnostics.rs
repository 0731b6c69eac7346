//! Diagnostics
//!
//! Categorized, human-readable errors returned to the user of a data source.

use serde::Serialize;
use std::fmt;

/// Diagnostic category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    MissingIdentifier,
    NotFound,
    ClientError,
    UnconfiguredProvider,
    ValidationError,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::MissingIdentifier => "Missing Identifier",
            Category::NotFound => "Not Found",
            Category::ClientError => "Client Error",
            Category::UnconfiguredProvider => "Unconfigured Provider",
            Category::ValidationError => "Validation Error",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(category: Category, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            detail: detail.into(),
        }
    }

    pub fn warning(category: Category, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        write!(f, "{}: {}: {}", level, self.category, self.detail)
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn add_error(&mut self, category: Category, detail: impl Into<String>) {
        self.push(Diagnostic::error(category, detail));
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Category of the first error, if any
    pub fn first_error_category(&self) -> Option<Category> {
        self.0
            .iter()
            .find(|d| d.severity == Severity::Error)
            .map(|d| d.category)
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_strings() {
        assert_eq!(Category::MissingIdentifier.as_str(), "Missing Identifier");
        assert_eq!(Category::UnconfiguredProvider.as_str(), "Unconfigured Provider");
    }

    #[test]
    fn test_warnings_do_not_count_as_errors() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning(Category::NotFound, "maybe"));
        assert!(!diags.has_error());

        diags.add_error(Category::ClientError, "boom");
        assert!(diags.has_error());
        assert_eq!(diags.first_error_category(), Some(Category::ClientError));
        assert_eq!(diags.to_string(), "Warning: Not Found: maybe\nError: Client Error: boom");
    }
}
