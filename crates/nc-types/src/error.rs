//! Error types shared by the lowest-level kernel types.

use thiserror::Error;

/// Result type for operations in this crate.
pub type Result<T> = std::result::Result<T, TypesError>;

/// Errors surfaced while constructing or validating shared types.
#[derive(Error, Debug)]
pub enum TypesError {
    /// A value fell outside its documented valid range.
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name.
        parameter: String,
        /// Invalid value.
        value: String,
        /// Constraint description.
        constraint: String,
    },
}

impl TypesError {
    /// Create an invalid parameter error.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TypesError::invalid_parameter("gain", "-1.0", ">= 0.0");
        let msg = format!("{err}");
        assert!(msg.contains("gain"));
    }
}
