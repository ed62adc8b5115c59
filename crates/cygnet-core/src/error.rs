//! Error types for Cygnet
//!
//! Every translation failure is terminal: the engine never hands back a
//! partial program, so each variant carries enough context (offending name,
//! clause or flavor) to be reported without re-parsing the query.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The kind of identifier rejected by a flavor's reserved-word check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierKind {
    /// A `$name` parameter
    Parameter,
    /// An output name of WITH/RETURN
    Projection,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Parameter => write!(f, "parameter"),
            IdentifierKind::Projection => write!(f, "projection"),
        }
    }
}

/// The main error type for Cygnet operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ========== Front-end Errors ==========
    #[error("Invalid input: {0}")]
    QueryParse(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // ========== Translation Errors ==========
    #[error("Unsupported construct in {clause}: {construct}")]
    UnsupportedConstruct { clause: String, construct: String },

    #[error("Variable `{name}` not defined in {clause}")]
    UnboundVariable { name: String, clause: String },

    #[error("Multiple result columns with the same name `{name}` in {clause}")]
    AmbiguousProjection { name: String, clause: String },

    #[error("Invalid parameter name: {0}")]
    InvalidParameterName(String),

    #[error("Invalid {kind} name: {name} (reserved word in the {flavor} flavor)")]
    ReservedIdentifier {
        kind: IdentifierKind,
        name: String,
        flavor: String,
    },

    #[error("`{construct}` is not supported by the {flavor} flavor")]
    UnsupportedInFlavor { construct: String, flavor: String },

    #[error("Translation flavor `{name}` is not supported. Supported values: `{supported}` (case insensitive)")]
    UnsupportedFlavor { name: String, supported: String },

    #[error("Invalid {clause} value: {reason}")]
    InvalidRange { clause: String, reason: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    // ========== Execution Errors ==========
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ========== Serialization Errors ==========
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Cygnet operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an `UnsupportedConstruct` error
    pub fn unsupported(clause: impl Into<String>, construct: impl Into<String>) -> Self {
        Error::UnsupportedConstruct {
            clause: clause.into(),
            construct: construct.into(),
        }
    }

    /// Shorthand for an `UnboundVariable` error
    pub fn unbound(name: impl Into<String>, clause: impl Into<String>) -> Self {
        Error::UnboundVariable {
            name: name.into(),
            clause: clause.into(),
        }
    }

    /// Returns true if the error was raised while translating a query
    pub fn is_translation_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedConstruct { .. }
                | Error::UnboundVariable { .. }
                | Error::AmbiguousProjection { .. }
                | Error::InvalidParameterName(_)
                | Error::ReservedIdentifier { .. }
                | Error::UnsupportedInFlavor { .. }
                | Error::UnsupportedFlavor { .. }
                | Error::InvalidRange { .. }
                | Error::TypeMismatch { .. }
                | Error::InvalidQuery(_)
        )
    }

    /// Returns true if the error comes from flavor selection or emission
    pub fn is_flavor_error(&self) -> bool {
        matches!(
            self,
            Error::ReservedIdentifier { .. }
                | Error::UnsupportedInFlavor { .. }
                | Error::UnsupportedFlavor { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidParameterName("🐼".to_string());
        assert_eq!(err.to_string(), "Invalid parameter name: 🐼");

        let err = Error::unbound("p", "RETURN");
        assert_eq!(err.to_string(), "Variable `p` not defined in RETURN");
    }

    #[test]
    fn test_reserved_identifier_mentions_parameter_name() {
        let err = Error::ReservedIdentifier {
            kind: IdentifierKind::Parameter,
            name: "goto".to_string(),
            flavor: "gremlin".to_string(),
        };
        assert!(err.to_string().contains("Invalid parameter name: goto"));
    }

    #[test]
    fn test_unsupported_flavor_lists_values() {
        let err = Error::UnsupportedFlavor {
            name: "neo".to_string(),
            supported: "gremlin, native, cosmosdb".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("`neo`"));
        assert!(message.contains("gremlin, native, cosmosdb"));
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::unsupported("MATCH", "OPTIONAL MATCH").is_translation_error());
        assert!(!Error::Execution("boom".to_string()).is_translation_error());
        assert!(
            Error::UnsupportedInFlavor {
                construct: "startsWith".to_string(),
                flavor: "cosmosdb".to_string()
            }
            .is_flavor_error()
        );
        assert!(!Error::unbound("x", "WITH").is_flavor_error());
    }
}
