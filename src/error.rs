//! Error types for adflint
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while linting a template
#[derive(Debug, Error)]
pub enum LintError {
    /// The template is structurally unusable and the run cannot continue
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A check id was requested that is not in the registry
    #[error("Unknown check: {0}")]
    UnknownCheck(String),

    /// A single rule failed while evaluating a subject
    #[error("Rule '{rule}' failed: {message}")]
    RuleExecution { rule: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LintError {
    /// Build a malformed-document error from anything printable
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }

    /// Build a rule execution error for the given rule id
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleExecution {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for adflint operations
pub type Result<T> = std::result::Result<T, LintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_document_error() {
        let err = LintError::malformed("missing 'resources' array");
        assert_eq!(err.to_string(), "Malformed document: missing 'resources' array");
    }

    #[test]
    fn test_unknown_check_error() {
        let err = LintError::UnknownCheck("no-such-check".to_string());
        assert_eq!(err.to_string(), "Unknown check: no-such-check");
    }

    #[test]
    fn test_rule_execution_error() {
        let err = LintError::rule("pipeline-description", "payload is not an object");
        assert_eq!(
            err.to_string(),
            "Rule 'pipeline-description' failed: payload is not an object"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LintError = io_err.into();
        assert!(matches!(err, LintError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: LintError = json_err.into();
        assert!(matches!(err, LintError::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(LintError::malformed("test"))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
