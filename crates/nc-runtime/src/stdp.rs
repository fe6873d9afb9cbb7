//! Spike-timing-dependent plasticity as a pure function of `(Δt, config)`.
//!
//! Full synaptic weight storage and application is delegated to synapses,
//! which live outside this crate's scope; what remains here is the library
//! contract a synapse calls into: given the time between a pre- and
//! post-synaptic spike and a configuration, what weight delta results.

use nc_types::Time;

use crate::error::{Result, RuntimeError};

/// Configuration for the STDP weight-delta function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StdpConfig {
    /// Base learning rate applied to potentiation.
    pub learning_rate: f64,
    /// Exponential decay time constant, milliseconds.
    pub tau_ms: f64,
    /// Half-width of the window outside of which `Δt` has no effect, milliseconds.
    pub window_ms: f64,
    /// Multiplier applied to the learning rate on the depression side.
    pub asymmetry: f64,
}

impl Default for StdpConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            tau_ms: 20.0,
            window_ms: 50.0,
            asymmetry: 1.0,
        }
    }
}

impl StdpConfig {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.learning_rate <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "learning_rate",
                self.learning_rate.to_string(),
                "> 0.0",
            ));
        }
        if self.tau_ms <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "tau_ms",
                self.tau_ms.to_string(),
                "> 0.0",
            ));
        }
        if self.window_ms <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "window_ms",
                self.window_ms.to_string(),
                "> 0.0",
            ));
        }
        if self.asymmetry <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "asymmetry",
                self.asymmetry.to_string(),
                "> 0.0",
            ));
        }
        Ok(())
    }
}

/// Weight delta for a pre/post spike pair separated by `dt_ms = post - pre`.
///
/// `dt_ms < 0` (pre fired before post) potentiates; `dt_ms >= 0` (post at or
/// before pre) depresses. Outside `[-window_ms, window_ms]` (inclusive) the
/// pair is considered uncorrelated and the delta is exactly `0.0`.
pub fn calculate_stdp_weight_change(dt_ms: f64, config: &StdpConfig) -> f64 {
    if !dt_ms.is_finite() || dt_ms.abs() >= config.window_ms {
        return 0.0;
    }
    let decay = (-dt_ms.abs() / config.tau_ms).exp();
    if dt_ms < 0.0 {
        config.learning_rate * decay
    } else {
        -config.learning_rate * config.asymmetry * decay
    }
}

/// Convenience wrapper computing `Δt` from two absolute spike timestamps.
pub fn stdp_weight_change_for_spikes(
    pre_spike_time: Time,
    post_spike_time: Time,
    config: &StdpConfig,
) -> f64 {
    let dt_ms = post_spike_time.as_nanos() as f64 / 1_000_000.0
        - pre_spike_time.as_nanos() as f64 / 1_000_000.0;
    calculate_stdp_weight_change(dt_ms, config)
}
