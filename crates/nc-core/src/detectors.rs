//! Coincidence detectors: typed strategies over a recent-input trace.

use crate::error::{CoreError, Result};
use crate::signal_state::{MembraneSnapshot, TimestampedInput};

/// Result of a single `detect` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionResult {
    /// Whether coincidence was detected this call.
    pub detected: bool,
    /// Multiplicative amplification to apply to net current (1.0 if not detected).
    pub amplification_factor: f64,
    /// Additional current to add on top of the amplified sum.
    pub additional_current: f64,
    /// Calcium influx associated with detection.
    pub associated_calcium_influx: f64,
    /// Human-readable detail, useful for tests and diagnostics.
    pub debug_info: String,
}

impl DetectionResult {
    fn none() -> Self {
        Self {
            detected: false,
            amplification_factor: 1.0,
            additional_current: 0.0,
            associated_calcium_influx: 0.0,
            debug_info: "no coincidence".to_string(),
        }
    }
}

/// Configuration for the NMDA-like detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NmdaConfig {
    /// Minimum number of excitatory inputs within the window to consider detection.
    pub min_inputs_required: usize,
    /// Temporal window, milliseconds; contract range `[1, 20]`.
    pub temporal_window_ms: f64,
    /// Minimum summed (decayed) current of qualifying inputs, in the same units as signal values.
    pub current_threshold: f64,
    /// Voltage (accumulator) threshold, mV; contract range `[-80, -20]`.
    pub voltage_threshold: f64,
    /// Amplification applied to net current on detection.
    pub amplification_factor: f64,
    /// Flat current added on detection.
    pub additional_current: f64,
    /// Calcium influx reported on detection.
    pub calcium_boost: f64,
}

impl Default for NmdaConfig {
    fn default() -> Self {
        Self {
            min_inputs_required: 3,
            temporal_window_ms: 10.0,
            current_threshold: 1.0,
            voltage_threshold: -45.0,
            amplification_factor: 1.2,
            additional_current: 1.0,
            calcium_boost: 0.5,
        }
    }
}

impl NmdaConfig {
    /// Reset every field to its documented default.
    pub fn set_defaults(&mut self) {
        *self = Self::default();
    }

    /// Enforce biological parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(1..=20).contains(&(self.temporal_window_ms.round() as i64)) {
            return Err(CoreError::invalid_parameter(
                "temporal_window_ms",
                self.temporal_window_ms.to_string(),
                "in [1, 20] ms",
            ));
        }
        if !(-80.0..=-20.0).contains(&self.voltage_threshold) {
            return Err(CoreError::invalid_parameter(
                "voltage_threshold",
                self.voltage_threshold.to_string(),
                "in [-80, -20] mV",
            ));
        }
        if self.min_inputs_required == 0 {
            return Err(CoreError::invalid_parameter(
                "min_inputs_required",
                self.min_inputs_required.to_string(),
                "> 0",
            ));
        }
        if self.current_threshold < 0.0 {
            return Err(CoreError::invalid_parameter(
                "current_threshold",
                self.current_threshold.to_string(),
                ">= 0",
            ));
        }
        Ok(())
    }
}

/// Configuration for the simple temporal detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleTemporalConfig {
    /// Minimum number of inputs within the window.
    pub min_inputs_required: usize,
    /// Temporal window, milliseconds; contract range `[1, 20]`.
    pub temporal_window_ms: f64,
    /// Minimum sum of positive (decayed) values within the window.
    pub minimum_summed_value: f64,
}

impl Default for SimpleTemporalConfig {
    fn default() -> Self {
        Self {
            min_inputs_required: 2,
            temporal_window_ms: 10.0,
            minimum_summed_value: 1.0,
        }
    }
}

impl SimpleTemporalConfig {
    /// Reset every field to its documented default.
    pub fn set_defaults(&mut self) {
        *self = Self::default();
    }

    /// Enforce biological parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(1..=20).contains(&(self.temporal_window_ms.round() as i64)) {
            return Err(CoreError::invalid_parameter(
                "temporal_window_ms",
                self.temporal_window_ms.to_string(),
                "in [1, 20] ms",
            ));
        }
        if self.min_inputs_required == 0 {
            return Err(CoreError::invalid_parameter(
                "min_inputs_required",
                self.min_inputs_required.to_string(),
                "> 0",
            ));
        }
        if self.minimum_summed_value < 0.0 {
            return Err(CoreError::invalid_parameter(
                "minimum_summed_value",
                self.minimum_summed_value.to_string(),
                ">= 0",
            ));
        }
        Ok(())
    }
}

/// Typed configuration carried by a detector; `update_config` rejects the
/// wrong variant rather than silently reinterpreting it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorConfig {
    /// NMDA-like configuration.
    Nmda(NmdaConfig),
    /// Simple temporal configuration.
    SimpleTemporal(SimpleTemporalConfig),
}

/// Inputs within `window_ms` of the most recent timestamp in `inputs`, restricted
/// to excitatory (positive decayed value) entries.
fn excitatory_inputs_in_window(
    inputs: &[TimestampedInput],
    window_ms: f64,
) -> (usize, f64) {
    let Some(reference) = inputs.iter().map(|i| i.arrival_time).max() else {
        return (0, 0.0);
    };
    let mut count = 0usize;
    let mut sum = 0.0;
    for input in inputs {
        let decayed = input.decayed_value();
        if decayed <= 0.0 {
            continue;
        }
        if reference.millis_since(input.arrival_time) <= window_ms {
            count += 1;
            sum += decayed;
        }
    }
    (count, sum)
}

/// NMDA-like coincidence detector: requires voltage (or a recent back-propagating
/// spike) in addition to a temporally coincident excitatory burst.
#[derive(Debug, Clone, PartialEq)]
pub struct NmdaLikeDetector {
    config: NmdaConfig,
}

impl NmdaLikeDetector {
    /// Build a detector with the given configuration.
    pub fn new(config: NmdaConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &NmdaConfig {
        &self.config
    }

    fn detect(&self, recent_inputs: &[TimestampedInput], state: &MembraneSnapshot) -> DetectionResult {
        let (count, sum) = excitatory_inputs_in_window(recent_inputs, self.config.temporal_window_ms);
        let voltage_gate = state.accumulator >= self.config.voltage_threshold || state.back_propagating_spike;

        if count >= self.config.min_inputs_required && sum >= self.config.current_threshold && voltage_gate {
            DetectionResult {
                detected: true,
                amplification_factor: self.config.amplification_factor,
                additional_current: self.config.additional_current,
                associated_calcium_influx: self.config.calcium_boost,
                debug_info: format!(
                    "nmda coincidence: {count} inputs, sum={sum:.4}, voltage_gate={voltage_gate}"
                ),
            }
        } else {
            let mut result = DetectionResult::none();
            result.debug_info = format!(
                "nmda no coincidence: {count}/{} inputs, sum={sum:.4}, voltage_gate={voltage_gate}",
                self.config.min_inputs_required
            );
            result
        }
    }
}

/// Simple temporal detector: ignores voltage, only requires a coincident positive sum.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTemporalDetector {
    config: SimpleTemporalConfig,
}

impl SimpleTemporalDetector {
    /// Build a detector with the given configuration.
    pub fn new(config: SimpleTemporalConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &SimpleTemporalConfig {
        &self.config
    }

    fn detect(&self, recent_inputs: &[TimestampedInput], _state: &MembraneSnapshot) -> DetectionResult {
        let (count, sum) = excitatory_inputs_in_window(recent_inputs, self.config.temporal_window_ms);
        if count >= self.config.min_inputs_required && sum >= self.config.minimum_summed_value {
            DetectionResult {
                detected: true,
                amplification_factor: 1.0,
                additional_current: 0.0,
                associated_calcium_influx: 0.0,
                debug_info: format!("temporal coincidence: {count} inputs, sum={sum:.4}"),
            }
        } else {
            let mut result = DetectionResult::none();
            result.debug_info = format!(
                "temporal no coincidence: {count}/{} inputs, sum={sum:.4}",
                self.config.min_inputs_required
            );
            result
        }
    }
}

/// Closed sum type over the required detector variants.
#[derive(Debug, Clone, PartialEq)]
pub enum CoincidenceDetector {
    /// NMDA-like detector.
    Nmda(NmdaLikeDetector),
    /// Simple temporal detector.
    SimpleTemporal(SimpleTemporalDetector),
}

impl CoincidenceDetector {
    /// Build the NMDA-like variant with the given config.
    pub fn nmda(config: NmdaConfig) -> Self {
        Self::Nmda(NmdaLikeDetector::new(config))
    }

    /// Build the simple-temporal variant with the given config.
    pub fn simple_temporal(config: SimpleTemporalConfig) -> Self {
        Self::SimpleTemporal(SimpleTemporalDetector::new(config))
    }

    /// Evaluate coincidence over the recent input trace and current membrane snapshot.
    pub fn detect(
        &self,
        recent_inputs: &[TimestampedInput],
        state: &MembraneSnapshot,
    ) -> DetectionResult {
        match self {
            Self::Nmda(d) => d.detect(recent_inputs, state),
            Self::SimpleTemporal(d) => d.detect(recent_inputs, state),
        }
    }

    /// Current typed configuration.
    pub fn config(&self) -> DetectorConfig {
        match self {
            Self::Nmda(d) => DetectorConfig::Nmda(*d.config()),
            Self::SimpleTemporal(d) => DetectorConfig::SimpleTemporal(*d.config()),
        }
    }

    /// Replace configuration; rejects a config of the wrong variant.
    pub fn update_config(&mut self, new: DetectorConfig) -> Result<()> {
        match (self, new) {
            (Self::Nmda(d), DetectorConfig::Nmda(cfg)) => {
                cfg.validate()?;
                d.config = cfg;
                Ok(())
            }
            (Self::SimpleTemporal(d), DetectorConfig::SimpleTemporal(cfg)) => {
                cfg.validate()?;
                d.config = cfg;
                Ok(())
            }
            (Self::Nmda(_), DetectorConfig::SimpleTemporal(_)) => Err(
                CoreError::config_type_mismatch("NmdaConfig", "SimpleTemporalConfig"),
            ),
            (Self::SimpleTemporal(_), DetectorConfig::Nmda(_)) => Err(
                CoreError::config_type_mismatch("SimpleTemporalConfig", "NmdaConfig"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_types::{NeuralSignal, NeurotransmitterKind, Time};

    fn glutamate_input(value: f64, ms: u64) -> TimestampedInput {
        let sig = NeuralSignal::new(value, Time::from_millis(ms))
            .with_neurotransmitter(NeurotransmitterKind::Glutamate);
        TimestampedInput::new(sig, Time::from_millis(ms))
    }

    #[test]
    fn test_nmda_coincidence_scenario() {
        let config = NmdaConfig {
            current_threshold: 1.8,
            voltage_threshold: -45.0,
            amplification_factor: 1.2,
            additional_current: 1.0,
            ..NmdaConfig::default()
        };
        let detector = CoincidenceDetector::nmda(config);
        let inputs = vec![
            glutamate_input(1.0, 0),
            glutamate_input(1.0, 1),
            glutamate_input(1.0, 2),
        ];
        let state = MembraneSnapshot::new(0.0, 1.0, -70.0, 0.0, None, 0, Time::from_millis(2));
        // Voltage threshold refers to the accumulator; push it above -45mV.
        let state = MembraneSnapshot { accumulator: -20.0, ..state };
        let result = detector.detect(&inputs, &state);
        assert!(result.detected);
        assert!((result.amplification_factor - 1.2).abs() < 1e-9);
        assert!((result.associated_calcium_influx - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_nmda_requires_voltage_or_bap() {
        let detector = CoincidenceDetector::nmda(NmdaConfig {
            current_threshold: 0.5,
            ..NmdaConfig::default()
        });
        let inputs = vec![
            glutamate_input(1.0, 0),
            glutamate_input(1.0, 1),
            glutamate_input(1.0, 2),
        ];
        let quiet_state =
            MembraneSnapshot::new(-80.0, 1.0, -70.0, 0.0, None, 0, Time::from_millis(2));
        assert!(!detector.detect(&inputs, &quiet_state).detected);

        let bap_state = MembraneSnapshot::new(
            -80.0,
            1.0,
            -70.0,
            0.0,
            Some(Time::from_millis(0)),
            1,
            Time::from_millis(2),
        );
        assert!(detector.detect(&inputs, &bap_state).detected);
    }

    #[test]
    fn test_simple_temporal_ignores_voltage() {
        let detector = CoincidenceDetector::simple_temporal(SimpleTemporalConfig {
            min_inputs_required: 2,
            minimum_summed_value: 1.5,
            ..SimpleTemporalConfig::default()
        });
        let inputs = vec![glutamate_input(1.0, 0), glutamate_input(1.0, 1)];
        let state = MembraneSnapshot::new(-90.0, 1.0, -70.0, 0.0, None, 0, Time::from_millis(1));
        assert!(detector.detect(&inputs, &state).detected);
    }

    #[test]
    fn test_update_config_rejects_wrong_variant() {
        let mut detector = CoincidenceDetector::nmda(NmdaConfig::default());
        let err = detector
            .update_config(DetectorConfig::SimpleTemporal(SimpleTemporalConfig::default()))
            .unwrap_err();
        assert!(matches!(err, CoreError::ConfigTypeMismatch { .. }));
    }

    #[test]
    fn test_window_boundary_is_exact() {
        let detector = CoincidenceDetector::simple_temporal(SimpleTemporalConfig {
            min_inputs_required: 2,
            temporal_window_ms: 5.0,
            minimum_summed_value: 1.0,
        });
        let inputs = vec![glutamate_input(1.0, 0), glutamate_input(1.0, 5)];
        let state = MembraneSnapshot::new(0.0, 1.0, -70.0, 0.0, None, 0, Time::from_millis(5));
        // Exactly at the window boundary (5ms apart, window = 5ms) both inputs count.
        assert!(detector.detect(&inputs, &state).detected);
    }
}
