//! Read-only membrane projections and the output of a dendritic process step.

use std::collections::HashMap;

use nc_types::{NeuralSignal, SourceId, Time};

/// Read-only projection of neuron state handed to dendritic modes and detectors.
///
/// Dendritic modes and coincidence detectors never mutate neuron state directly;
/// they consume a snapshot and return a result that the neuron core folds back in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MembraneSnapshot {
    /// Current membrane potential proxy.
    pub accumulator: f64,
    /// Current firing threshold (after homeostatic adjustment).
    pub current_threshold: f64,
    /// Resting potential, used as a reference by cable-equation modes.
    pub resting_potential: f64,
    /// Running intracellular calcium level.
    pub intracellular_calcium: f64,
    /// Timestamp of the most recent fire, if any.
    pub last_spike_time: Option<Time>,
    /// Number of spikes in the homeostatic firing-rate window.
    pub recent_spike_count: u32,
    /// True within 5 ms of the last spike; gates NMDA-like detectors.
    pub back_propagating_spike: bool,
}

impl MembraneSnapshot {
    /// Duration in milliseconds since the window, used by detectors and biological modes.
    pub const BACK_PROPAGATION_WINDOW_MS: f64 = 5.0;

    /// Build a snapshot, deriving `back_propagating_spike` from `last_spike_time` and `now`.
    pub fn new(
        accumulator: f64,
        current_threshold: f64,
        resting_potential: f64,
        intracellular_calcium: f64,
        last_spike_time: Option<Time>,
        recent_spike_count: u32,
        now: Time,
    ) -> Self {
        let back_propagating_spike = last_spike_time
            .map(|t| now.millis_since(t) <= Self::BACK_PROPAGATION_WINDOW_MS)
            .unwrap_or(false);
        Self {
            accumulator,
            current_threshold,
            resting_potential,
            intracellular_calcium,
            last_spike_time,
            recent_spike_count,
            back_propagating_spike,
        }
    }
}

/// Output of a dendritic integration step, produced per `process` tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntegratedPotential {
    /// Net current to fold into the membrane accumulator.
    pub net_current: f64,
    /// True if the mode itself determined a dendritic (non-somatic) spike occurred.
    pub dendritic_spike: bool,
    /// Calcium current contributed this step (e.g. from coincidence detection or Cav channels).
    pub calcium_current: f64,
    /// Multiplicative amplification applied by a coincidence detector, if any (else 1.0).
    pub nonlinear_amplification: f64,
    /// Per-channel current contribution, keyed by channel name.
    pub channel_contributions: HashMap<String, f64>,
}

impl IntegratedPotential {
    /// A zero-effect potential: no current, no spike, unity amplification.
    pub fn zero() -> Self {
        Self {
            nonlinear_amplification: 1.0,
            ..Default::default()
        }
    }

    /// Build from a plain net current with no channel or detector involvement.
    pub fn from_current(net_current: f64) -> Self {
        Self {
            net_current,
            nonlinear_amplification: 1.0,
            ..Default::default()
        }
    }
}

/// Entry in a per-source sliding activity window, used by scaling and detectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputActivity {
    /// Signal value after gain has been applied.
    pub effective_value: f64,
    /// When the input arrived.
    pub timestamp: Time,
}

impl InputActivity {
    /// Build an activity entry.
    pub fn new(effective_value: f64, timestamp: Time) -> Self {
        Self {
            effective_value,
            timestamp,
        }
    }
}

/// Buffered input inside a temporal dendritic mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedInput {
    /// The signal as received.
    pub signal: NeuralSignal,
    /// Arrival time (redundant with `signal.timestamp` for modes that reuse the field,
    /// but kept distinct so buffering and cable-delay arithmetic never alias it).
    pub arrival_time: Time,
    /// Spatial decay factor in `[0, 1]`, applied multiplicatively on integration.
    pub decay_factor: f64,
}

impl TimestampedInput {
    /// Build a buffered input with a decay factor of 1.0 (no spatial attenuation).
    pub fn new(signal: NeuralSignal, arrival_time: Time) -> Self {
        Self {
            signal,
            arrival_time,
            decay_factor: 1.0,
        }
    }

    /// Override the spatial decay factor, clamped to `[0, 1]`.
    pub fn with_decay_factor(mut self, decay_factor: f64) -> Self {
        self.decay_factor = decay_factor.clamp(0.0, 1.0);
        self
    }

    /// Signed value after spatial decay has been applied.
    pub fn decayed_value(&self) -> f64 {
        self.signal.value * self.decay_factor
    }

    /// Source id this input arrived from, used for proximal/distal classification.
    pub fn source_id(&self) -> &SourceId {
        &self.signal.source_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_propagating_spike_window() {
        let snap = MembraneSnapshot::new(
            0.0,
            1.0,
            -70.0,
            0.0,
            Some(Time::from_millis(10)),
            1,
            Time::from_millis(13),
        );
        assert!(snap.back_propagating_spike);

        let snap = MembraneSnapshot::new(
            0.0,
            1.0,
            -70.0,
            0.0,
            Some(Time::from_millis(10)),
            1,
            Time::from_millis(20),
        );
        assert!(!snap.back_propagating_spike);
    }

    #[test]
    fn test_timestamped_input_decay() {
        let sig = NeuralSignal::new(2.0, Time::ZERO);
        let input = TimestampedInput::new(sig, Time::ZERO).with_decay_factor(0.5);
        assert!((input.decayed_value() - 1.0).abs() < 1e-12);
    }
}
