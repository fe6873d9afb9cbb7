//! Error types for the neuron runtime.
//!
//! Only construction-time failures are represented as `Result` errors.
//! Everything else in §7 of the design (capacity drops, refractory drops,
//! delivery-target panics, numerical edge cases) is handled locally and
//! surfaced through counters or defensive clamping, never by returning `Err`
//! from a hot path.

use thiserror::Error;

/// Result type for runtime construction operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors surfaced while constructing a neuron or one of its subsystems.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A required collaborator callback was missing for an enabled feature.
    #[error("missing required callback `{callback}` for enabled feature `{feature}`")]
    MissingCallback {
        /// Callback slot name (e.g. `create_synapse`).
        callback: &'static str,
        /// Feature that required it (e.g. `enable_stdp_feedback`).
        feature: &'static str,
    },

    /// A detector configuration rejected by the owning detector's `validate()`.
    #[error("invalid detector configuration: {reason}")]
    InvalidDetectorConfig {
        /// Explanation from the detector's validation.
        reason: String,
    },

    /// A dendritic mode was misconfigured (out-of-range parameter, bad channel set).
    #[error("invalid dendritic mode: {reason}")]
    InvalidDendriticMode {
        /// Explanation.
        reason: String,
    },

    /// A `NeuronConfig` parameter fell outside its documented range.
    #[error("invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name.
        parameter: String,
        /// Invalid value, stringified.
        value: String,
        /// Constraint description.
        constraint: String,
    },

    /// Lower-level type construction failure (ids, time, signals).
    #[error("type error: {source}")]
    Types {
        /// Underlying error.
        #[from]
        source: nc_types::TypesError,
    },

    /// Lower-level core primitive construction failure (channels, detectors, dendritic modes).
    #[error("core error: {source}")]
    Core {
        /// Underlying error.
        #[from]
        source: nc_core::CoreError,
    },
}

impl RuntimeError {
    /// Build a missing-callback error.
    pub fn missing_callback(callback: &'static str, feature: &'static str) -> Self {
        Self::MissingCallback { callback, feature }
    }

    /// Build an invalid-detector-config error.
    pub fn invalid_detector_config(reason: impl Into<String>) -> Self {
        Self::InvalidDetectorConfig {
            reason: reason.into(),
        }
    }

    /// Build an invalid-dendritic-mode error.
    pub fn invalid_dendritic_mode(reason: impl Into<String>) -> Self {
        Self::InvalidDendriticMode {
            reason: reason.into(),
        }
    }

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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RuntimeError::missing_callback("create_synapse", "enable_stdp_feedback");
        assert!(matches!(err, RuntimeError::MissingCallback { .. }));

        let err = RuntimeError::invalid_parameter("decay_rate", "1.5", "in (0, 1]");
        assert!(matches!(err, RuntimeError::InvalidParameter { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = RuntimeError::missing_callback("apply_plasticity", "enable_stdp_feedback");
        let msg = format!("{err}");
        assert!(msg.contains("apply_plasticity"));
        assert!(msg.contains("enable_stdp_feedback"));
    }
}
