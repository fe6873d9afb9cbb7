//! Errors surfaced while constructing or validating core primitives.

use thiserror::Error;

/// Result type for operations in this crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors from channels, detectors and dendritic modes.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A detector or channel parameter fell outside its documented range.
    #[error("invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name.
        parameter: String,
        /// Invalid value, stringified.
        value: String,
        /// Constraint description.
        constraint: String,
    },

    /// `update_config` was called with a config of the wrong concrete type.
    #[error("config type mismatch: expected {expected}, got {got}")]
    ConfigTypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Type name actually supplied.
        got: &'static str,
    },
}

impl CoreError {
    /// Build an invalid-parameter error.
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Build a config-type-mismatch error.
    pub fn config_type_mismatch(expected: &'static str, got: &'static str) -> Self {
        Self::ConfigTypeMismatch { expected, got }
    }
}
