//! Declaration-time error types

use std::fmt;

/// Errors raised while a query definition is being declared.
///
/// Both variants surface from the builder call that declared the offending
/// feature, never from a later `call()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    /// No filter is registered under `kind` for this definition or its ancestors
    UnknownFilterKind { query: String, kind: String },
    /// The filter rejected its options
    InvalidFilterOptions {
        query: String,
        feature: String,
        kind: String,
        reason: String,
    },
}

impl fmt::Display for DeclarationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationError::UnknownFilterKind { query, kind } => {
                write!(f, "{}: unknown filter kind '{}'", query, kind)
            }
            DeclarationError::InvalidFilterOptions {
                query,
                feature,
                kind,
                reason,
            } => write!(
                f,
                "{}: invalid options for '{}' filter on feature '{}': {}",
                query, kind, feature, reason
            ),
        }
    }
}

impl std::error::Error for DeclarationError {}

/// Rejection reason returned by a filter constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptionsError(pub String);

impl FilterOptionsError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl fmt::Display for FilterOptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for FilterOptionsError {}

impl From<serde_json::Error> for FilterOptionsError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}
