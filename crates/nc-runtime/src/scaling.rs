//! Synaptic scaling: per-source receptor gain tracking and activity-gated
//! proportional homeostatic scaling.
//!
//! Gains and per-source activity are guarded by separate reader-preferring
//! locks (`parking_lot::RwLock`), matching the fixed lock-acquisition order
//! used throughout the neuron core: state, then outputs, then gains, then
//! activity. This module only ever takes the latter two.

use std::collections::HashMap;

use parking_lot::RwLock;

use nc_core::InputActivity;
use nc_types::{NeuralSignal, SourceId, Time};

/// Configuration for the scaling engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingConfig {
    /// Master enable switch; `apply_post_synaptic_gain` is a no-op pass-through when false.
    pub enabled: bool,
    /// Target per-source mean effective strength.
    pub target_input_strength: f64,
    /// Fraction of the strength error folded into the scaling factor per step.
    pub scaling_rate: f64,
    /// Minimum time between performed scaling checks, milliseconds.
    pub scaling_interval_ms: f64,
    /// Minimum calcium level required to consider scaling (activity gate).
    pub min_activity_for_scaling: f64,
    /// Minimum firing rate required to consider scaling, Hz.
    pub min_firing_rate_hz: f64,
    /// Sliding window over which per-source activity is sampled, milliseconds.
    pub activity_window_ms: f64,
    /// Lower clamp on any single source's gain.
    pub min_gain: f64,
    /// Upper clamp on any single source's gain.
    pub max_gain: f64,
    /// Lower clamp on the per-step scaling factor.
    pub min_factor: f64,
    /// Upper clamp on the per-step scaling factor.
    pub max_factor: f64,
    /// Minimum relative deviation from target considered biologically significant.
    pub significance_threshold: f64,
    /// Minimum deviation of the proposed factor from 1.0 to bother applying it.
    pub factor_epsilon: f64,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_input_strength: 1.0,
            scaling_rate: 0.1,
            scaling_interval_ms: 1_000.0,
            min_activity_for_scaling: 0.3,
            min_firing_rate_hz: 0.1,
            activity_window_ms: 7_500.0,
            min_gain: 0.01,
            max_gain: 10.0,
            min_factor: 0.9,
            max_factor: 1.1,
            significance_threshold: 0.1,
            factor_epsilon: 1e-4,
        }
    }
}

/// Why `perform_scaling` declined to scale, or confirmation that it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingSkipReason {
    /// Scaling is disabled.
    Disabled,
    /// `scaling_interval_ms` has not elapsed since the last check.
    IntervalNotElapsed,
    /// Calcium or firing rate below the activity gate.
    InsufficientActivity,
    /// No source has recent activity in the sampling window.
    NoActiveSources,
    /// Deviation from target is below the significance threshold.
    BelowSignificanceThreshold,
    /// Proposed factor is too close to 1.0 to bother applying.
    NegligibleFactor,
}

impl ScalingSkipReason {
    /// Snake-case name matching the reason strings neuron-core callers expect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::IntervalNotElapsed => "interval_not_elapsed",
            Self::InsufficientActivity => "insufficient_activity",
            Self::NoActiveSources => "no_active_sources",
            Self::BelowSignificanceThreshold => "below_significance_threshold",
            Self::NegligibleFactor => "negligible_factor",
        }
    }
}

/// Outcome of a single `perform_scaling` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingResult {
    /// Whether gains were actually adjusted this call.
    pub scaling_performed: bool,
    /// Reason scaling was skipped; `None` when `scaling_performed` is true.
    pub reason: Option<ScalingSkipReason>,
    /// The applied (or, if skipped after computation, proposed) factor.
    pub factor: Option<f64>,
}

/// One entry in the bounded scaling history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingEvent {
    /// Factor applied to every active source's gain.
    pub factor: f64,
    /// When the step was performed.
    pub timestamp: Time,
}

const MAX_HISTORY: usize = 100;

struct ScalingState {
    config: ScalingConfig,
    last_checked: Option<Time>,
    history: Vec<ScalingEvent>,
}

/// Per-source receptor gain tracker and proportional homeostatic scaler.
pub struct SynapticScalingEngine {
    state: RwLock<ScalingState>,
    gains: RwLock<HashMap<SourceId, f64>>,
    activity: RwLock<HashMap<SourceId, Vec<InputActivity>>>,
}

impl SynapticScalingEngine {
    /// Build the engine with the given configuration.
    pub fn new(config: ScalingConfig) -> Self {
        Self {
            state: RwLock::new(ScalingState {
                config,
                last_checked: None,
                history: Vec::new(),
            }),
            gains: RwLock::new(HashMap::new()),
            activity: RwLock::new(HashMap::new()),
        }
    }

    /// Enable scaling with new target/rate/interval, matching the external
    /// `enable_synaptic_scaling` configuration surface.
    pub fn enable(&self, target_input_strength: f64, scaling_rate: f64, scaling_interval_ms: f64) {
        let mut state = self.state.write();
        state.config.enabled = true;
        state.config.target_input_strength = target_input_strength;
        state.config.scaling_rate = scaling_rate;
        state.config.scaling_interval_ms = scaling_interval_ms;
    }

    /// Disable scaling; existing gains are left untouched.
    pub fn disable(&self) {
        self.state.write().config.enabled = false;
    }

    /// Apply the source's current receptor gain to a signal's value.
    ///
    /// Passes `signal.value` through unchanged when scaling is disabled or
    /// the signal carries no source attribution. Otherwise registers the
    /// source at gain 1.0 on first sight.
    pub fn apply_post_synaptic_gain(&self, signal: &NeuralSignal) -> f64 {
        let enabled = self.state.read().config.enabled;
        if !enabled || signal.source_id.is_empty() {
            return signal.value;
        }
        let mut gains = self.gains.write();
        let gain = *gains.entry(signal.source_id.clone()).or_insert(1.0);
        signal.value * gain
    }

    /// Record a post-gain activity sample for a source, pruning entries that
    /// have aged out of the sampling window.
    pub fn record_input_activity(&self, source_id: &SourceId, effective_value: f64, now: Time) {
        let window_ms = self.state.read().config.activity_window_ms;
        let mut activity = self.activity.write();
        let entries = activity.entry(source_id.clone()).or_default();
        entries.push(InputActivity::new(effective_value, now));
        entries.retain(|entry| now.millis_since(entry.timestamp) <= window_ms);
    }

    /// Override a source's gain directly, clamped to `[min_gain, max_gain]`.
    pub fn set_input_gain(&self, source_id: SourceId, gain: f64) {
        let (min_gain, max_gain) = {
            let state = self.state.read();
            (state.config.min_gain, state.config.max_gain)
        };
        self.gains.write().insert(source_id, gain.clamp(min_gain, max_gain));
    }

    /// Copy of every tracked source's current gain.
    pub fn get_input_gains(&self) -> HashMap<SourceId, f64> {
        self.gains.read().clone()
    }

    /// Copy of the bounded scaling history (most recent last).
    pub fn get_scaling_history(&self) -> Vec<ScalingEvent> {
        self.state.read().history.clone()
    }

    /// Attempt one scaling step. See module docs for the gating policy order.
    pub fn perform_scaling(&self, now: Time, calcium: f64, firing_rate: f64) -> ScalingResult {
        let config = self.state.read().config;

        if !config.enabled {
            return ScalingResult {
                scaling_performed: false,
                reason: Some(ScalingSkipReason::Disabled),
                factor: None,
            };
        }

        {
            let state = self.state.read();
            if let Some(last) = state.last_checked {
                if now.millis_since(last) < config.scaling_interval_ms {
                    return ScalingResult {
                        scaling_performed: false,
                        reason: Some(ScalingSkipReason::IntervalNotElapsed),
                        factor: None,
                    };
                }
            }
        }
        // The interval has elapsed; restart its clock regardless of the outcome below.
        self.state.write().last_checked = Some(now);

        if calcium < config.min_activity_for_scaling || firing_rate < config.min_firing_rate_hz {
            return ScalingResult {
                scaling_performed: false,
                reason: Some(ScalingSkipReason::InsufficientActivity),
                factor: None,
            };
        }

        let activity = self.activity.read();
        let mut per_source_means = Vec::new();
        for (source_id, entries) in activity.iter() {
            let recent: Vec<f64> = entries
                .iter()
                .filter(|e| now.millis_since(e.timestamp) <= config.activity_window_ms)
                .map(|e| e.effective_value.abs())
                .collect();
            if !recent.is_empty() {
                let mean = recent.iter().sum::<f64>() / recent.len() as f64;
                per_source_means.push((source_id.clone(), mean));
            }
        }
        drop(activity);

        if per_source_means.is_empty() {
            return ScalingResult {
                scaling_performed: false,
                reason: Some(ScalingSkipReason::NoActiveSources),
                factor: None,
            };
        }

        let mean_strength: f64 =
            per_source_means.iter().map(|(_, m)| *m).sum::<f64>() / per_source_means.len() as f64;

        let target = config.target_input_strength;
        let relative_deviation = if target.abs() > f64::EPSILON {
            (mean_strength - target).abs() / target.abs()
        } else {
            0.0
        };
        if relative_deviation < config.significance_threshold {
            return ScalingResult {
                scaling_performed: false,
                reason: Some(ScalingSkipReason::BelowSignificanceThreshold),
                factor: None,
            };
        }

        let raw_factor = 1.0 + (target - mean_strength) * config.scaling_rate;
        let factor = raw_factor.clamp(config.min_factor, config.max_factor);

        if (factor - 1.0).abs() < config.factor_epsilon {
            return ScalingResult {
                scaling_performed: false,
                reason: Some(ScalingSkipReason::NegligibleFactor),
                factor: Some(factor),
            };
        }

        let mut gains = self.gains.write();
        for (source_id, _) in &per_source_means {
            if let Some(gain) = gains.get_mut(source_id) {
                *gain = (*gain * factor).clamp(config.min_gain, config.max_gain);
            }
        }
        drop(gains);

        let mut state = self.state.write();
        state.history.push(ScalingEvent { factor, timestamp: now });
        if state.history.len() > MAX_HISTORY {
            let overflow = state.history.len() - MAX_HISTORY;
            state.history.drain(0..overflow);
        }

        ScalingResult {
            scaling_performed: true,
            reason: None,
            factor: Some(factor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_defaults_to_one_on_first_sight() {
        let engine = SynapticScalingEngine::new(ScalingConfig::default());
        let sig = NeuralSignal::new(2.0, Time::ZERO).with_source("src-a");
        let effective = engine.apply_post_synaptic_gain(&sig);
        assert!((effective - 2.0).abs() < 1e-12);
        assert_eq!(*engine.get_input_gains().get(&SourceId::from("src-a")).unwrap(), 1.0);
    }

    #[test]
    fn test_empty_source_bypasses_gain() {
        let engine = SynapticScalingEngine::new(ScalingConfig::default());
        let sig = NeuralSignal::new(3.0, Time::ZERO);
        assert!((engine.apply_post_synaptic_gain(&sig) - 3.0).abs() < 1e-12);
        assert!(engine.get_input_gains().is_empty());
    }

    #[test]
    fn test_calcium_gating_of_scaling() {
        let config = ScalingConfig {
            scaling_interval_ms: 0.0,
            ..ScalingConfig::default()
        };
        let engine = SynapticScalingEngine::new(config);
        let source = SourceId::from("src-a");
        for ms in 0..5 {
            engine.record_input_activity(&source, 3.0, Time::from_millis(ms));
        }

        let low_calcium = engine.perform_scaling(Time::from_millis(10), 0.0, 1.0);
        assert!(!low_calcium.scaling_performed);
        assert_eq!(low_calcium.reason, Some(ScalingSkipReason::InsufficientActivity));

        let result = engine.perform_scaling(Time::from_millis(1_010), 1.0, 1.0);
        assert!(result.scaling_performed);
        let factor = result.factor.unwrap();
        assert!((factor - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_proportional_scaling_preserves_gain_ratio() {
        let config = ScalingConfig {
            scaling_interval_ms: 0.0,
            target_input_strength: 1.0,
            ..ScalingConfig::default()
        };
        let engine = SynapticScalingEngine::new(config);
        engine.set_input_gain(SourceId::from("a"), 2.0);
        engine.set_input_gain(SourceId::from("b"), 4.0);
        engine.record_input_activity(&SourceId::from("a"), 5.0, Time::ZERO);
        engine.record_input_activity(&SourceId::from("b"), 5.0, Time::ZERO);

        let result = engine.perform_scaling(Time::from_millis(10), 1.0, 1.0);
        assert!(result.scaling_performed);
        let gains = engine.get_input_gains();
        let ratio = gains[&SourceId::from("a")] / gains[&SourceId::from("b")];
        assert!((ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_enable_disable_enable_preserves_gains() {
        let engine = SynapticScalingEngine::new(ScalingConfig::default());
        engine.set_input_gain(SourceId::from("a"), 3.0);
        engine.disable();
        assert!(!engine.state.read().config.enabled);
        engine.enable(1.0, 0.1, 1_000.0);
        assert_eq!(*engine.get_input_gains().get(&SourceId::from("a")).unwrap(), 3.0);
    }
}
