//! Error types.
//!
//! `AppError` is what the binary sees: a message plus the process exit code.
//! `EstimateError` is the typed failure produced by the estimate service and the
//! artifact/table loaders, so callers can react to the kind of failure
//! (and render it as a structured response) before it is flattened into an
//! `AppError`.
//!
//! Exit codes:
//! - 2: invalid input, configuration, or unreadable input files
//! - 3: insufficient data after filtering
//! - 4: internal/model failures
//! - 5: estimate request rejected

use crate::domain::Column;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failures of the estimate pipeline and of the data assets it depends on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimateError {
    /// One or more required request fields were absent or blank.
    #[error("missing required field(s): {}", fields.join(", "))]
    MissingInput { fields: Vec<&'static str> },

    /// A normalized value has no code in the current encoder set.
    #[error("{column} '{label}' was not seen during training")]
    UnknownCategory { column: Column, label: String },

    /// No trained model/encoder pair is available.
    #[error("model is not trained yet ({reason}); run `repest train` first")]
    ModelUnavailable { reason: String },

    /// The lookup tables violate an integrity rule.
    #[error("lookup table integrity error: {0}")]
    TableIntegrity(String),

    /// A persisted artifact could not be read or written.
    #[error("artifact error: {0}")]
    Artifact(String),
}

impl EstimateError {
    /// Request field that caused the failure, if the failure is field-specific.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            EstimateError::MissingInput { fields } => fields.first().copied(),
            EstimateError::UnknownCategory { column, .. } => Some(column.request_field()),
            _ => None,
        }
    }
}

impl From<EstimateError> for AppError {
    fn from(err: EstimateError) -> Self {
        let code = match &err {
            EstimateError::MissingInput { .. }
            | EstimateError::UnknownCategory { .. }
            | EstimateError::ModelUnavailable { .. } => 5,
            EstimateError::TableIntegrity(_) => 2,
            EstimateError::Artifact(_) => 4,
        };
        AppError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_category_names_the_request_field() {
        let err = EstimateError::UnknownCategory {
            column: Column::Damage,
            label: "totally novel failure mode xyz".to_string(),
        };
        assert_eq!(err.field(), Some("damage"));
        assert!(err.to_string().contains("totally novel failure mode xyz"));
        assert_eq!(AppError::from(err).exit_code(), 5);
    }

    #[test]
    fn table_integrity_is_a_configuration_error() {
        let err = EstimateError::TableIntegrity("dup".to_string());
        assert_eq!(err.field(), None);
        assert_eq!(AppError::from(err).exit_code(), 2);
    }
}
