//! Calcium dynamics, firing-rate tracking and threshold homeostasis.
//!
//! All three live behind one lock: calcium and the firing-rate window are
//! updated together on every fire and every maintenance tick, and the
//! threshold adjustment reads both, so splitting them across locks would
//! just move the race into the caller.

use std::collections::VecDeque;

use parking_lot::Mutex;

use nc_types::Time;

/// Configuration for the homeostatic regulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomeostasisConfig {
    /// Target steady-state firing rate, Hz. Zero (with `strength == 0.0`) disables adjustment.
    pub target_firing_rate_hz: f64,
    /// How strongly error feeds back into the threshold scale factor.
    pub strength: f64,
    /// Minimum time between threshold adjustments, milliseconds.
    pub homeostatic_interval_ms: f64,
    /// Per-millisecond calcium decay multiplier.
    pub calcium_decay_rate: f64,
    /// Calcium added on every fire.
    pub calcium_increment: f64,
    /// Calcium floor below which adjustment is skipped while still firing.
    pub min_activity_for_adjustment: f64,
    /// Width of the firing-rate sliding window, milliseconds.
    pub firing_window_ms: f64,
    /// Lower clamp for `threshold`, as a multiple of `base_threshold`.
    pub min_threshold_factor: f64,
    /// Upper clamp for `threshold`, as a multiple of `base_threshold`.
    pub max_threshold_factor: f64,
}

impl Default for HomeostasisConfig {
    fn default() -> Self {
        Self {
            target_firing_rate_hz: 5.0,
            strength: 1.0,
            homeostatic_interval_ms: 100.0,
            calcium_decay_rate: 0.9995,
            calcium_increment: 1.0,
            min_activity_for_adjustment: 1e-6,
            firing_window_ms: 5_000.0,
            min_threshold_factor: 0.1,
            max_threshold_factor: 5.0,
        }
    }
}

impl HomeostasisConfig {
    /// Homeostasis is disabled when either the target rate or the feedback strength is zero.
    pub fn is_disabled(&self) -> bool {
        self.target_firing_rate_hz == 0.0 || self.strength == 0.0
    }
}

/// Externally-observable homeostatic state, for the query surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomeostaticInfo {
    /// Current calcium level.
    pub calcium_level: f64,
    /// Fires-per-second over the current window.
    pub current_firing_rate_hz: f64,
    /// Last time the threshold was adjusted, if ever.
    pub last_adjustment: Option<Time>,
}

struct RegulatorState {
    config: HomeostasisConfig,
    calcium: f64,
    fire_times: VecDeque<Time>,
    last_adjustment: Option<Time>,
    last_maintenance: Option<Time>,
}

/// Calcium dynamics, firing-rate window and threshold feedback.
pub struct HomeostaticRegulator {
    state: Mutex<RegulatorState>,
}

impl HomeostaticRegulator {
    /// Build a regulator with the given configuration.
    pub fn new(config: HomeostasisConfig) -> Self {
        Self {
            state: Mutex::new(RegulatorState {
                config,
                calcium: 0.0,
                fire_times: VecDeque::new(),
                last_adjustment: None,
                last_maintenance: None,
            }),
        }
    }

    /// Apply calcium decay for the elapsed time since the last maintenance tick.
    pub fn on_maintenance_tick(&self, now: Time) {
        let mut state = self.state.lock();
        let elapsed_ms = match state.last_maintenance {
            Some(last) => now.millis_since(last),
            None => 0.0,
        };
        state.last_maintenance = Some(now);
        if elapsed_ms <= 0.0 {
            return;
        }
        let decay = state.config.calcium_decay_rate.powf(elapsed_ms);
        state.calcium *= decay;
        if state.calcium < 1e-10 {
            state.calcium = 0.0;
        }
        prune_firing_window(&mut state.fire_times, now, state.config.firing_window_ms);
    }

    /// Record a fire event: bump calcium and append to the firing history.
    pub fn on_fire(&self, now: Time) {
        let mut state = self.state.lock();
        state.calcium += state.config.calcium_increment;
        state.fire_times.push_back(now);
        let window_ms = state.config.firing_window_ms;
        prune_firing_window(&mut state.fire_times, now, window_ms);
    }

    /// Current calcium level.
    pub fn calcium_level(&self) -> f64 {
        self.state.lock().calcium
    }

    /// Fires-per-second over the configured window, as of `now`.
    pub fn current_firing_rate(&self, now: Time) -> f64 {
        let mut state = self.state.lock();
        let window_ms = state.config.firing_window_ms;
        prune_firing_window(&mut state.fire_times, now, window_ms);
        state.fire_times.len() as f64 / (window_ms / 1_000.0)
    }

    /// Snapshot of calcium, firing rate and last adjustment time.
    pub fn info(&self, now: Time) -> HomeostaticInfo {
        HomeostaticInfo {
            calcium_level: self.calcium_level(),
            current_firing_rate_hz: self.current_firing_rate(now),
            last_adjustment: self.state.lock().last_adjustment,
        }
    }

    /// Update target rate / strength, matching `set_homeostatic_parameters`.
    pub fn set_parameters(&self, target_rate_hz: f64, strength: f64) {
        let mut state = self.state.lock();
        state.config.target_firing_rate_hz = target_rate_hz;
        state.config.strength = strength;
    }

    /// Attempt a threshold adjustment. Returns the new threshold, or `None`
    /// if disabled, the interval hasn't elapsed, or the quiet-cell gate skipped it.
    ///
    /// `base_threshold` anchors the min/max clamp; `current_threshold` is the
    /// value being adjusted.
    pub fn maybe_adjust_threshold(
        &self,
        now: Time,
        current_threshold: f64,
        base_threshold: f64,
    ) -> Option<f64> {
        let mut state = self.state.lock();

        if state.config.is_disabled() {
            state.last_adjustment = None;
            return Some(base_threshold);
        }

        if let Some(last) = state.last_adjustment {
            if now.millis_since(last) < state.config.homeostatic_interval_ms {
                return None;
            }
        }

        let window_ms = state.config.firing_window_ms;
        prune_firing_window(&mut state.fire_times, now, window_ms);
        let current_rate = state.fire_times.len() as f64 / (window_ms / 1_000.0);

        if state.calcium < state.config.min_activity_for_adjustment && current_rate > 0.0 {
            return None;
        }

        let error = current_rate - state.config.target_firing_rate_hz;
        let scale = (1.0 + error * state.config.strength * 0.005).clamp(0.95, 1.05);
        let min_threshold = base_threshold * state.config.min_threshold_factor;
        let max_threshold = base_threshold * state.config.max_threshold_factor;
        let new_threshold = (current_threshold * scale).clamp(min_threshold, max_threshold);

        state.last_adjustment = Some(now);
        Some(new_threshold)
    }
}

fn prune_firing_window(fire_times: &mut VecDeque<Time>, now: Time, window_ms: f64) {
    while let Some(&oldest) = fire_times.front() {
        if now.millis_since(oldest) > window_ms {
            fire_times.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calcium_decays_and_clamps_near_zero() {
        let regulator = HomeostaticRegulator::new(HomeostasisConfig::default());
        regulator.on_fire(Time::from_millis(0));
        assert!((regulator.calcium_level() - 1.0).abs() < 1e-12);

        regulator.on_maintenance_tick(Time::from_millis(0));
        regulator.on_maintenance_tick(Time::from_millis(10_000));
        assert!(regulator.calcium_level() < 1.0);
    }

    #[test]
    fn test_calcium_floor_clamp() {
        let config = HomeostasisConfig {
            calcium_decay_rate: 0.9,
            ..HomeostasisConfig::default()
        };
        let regulator = HomeostaticRegulator::new(config);
        regulator.on_fire(Time::from_millis(0));
        regulator.on_maintenance_tick(Time::from_millis(0));
        regulator.on_maintenance_tick(Time::from_millis(1_000_000));
        assert_eq!(regulator.calcium_level(), 0.0);
    }

    #[test]
    fn test_firing_rate_window() {
        let regulator = HomeostaticRegulator::new(HomeostasisConfig::default());
        for ms in [0u64, 1_000, 2_000, 3_000] {
            regulator.on_fire(Time::from_millis(ms));
        }
        let rate = regulator.current_firing_rate(Time::from_millis(3_000));
        assert!((rate - 0.8).abs() < 1e-9, "got {rate}");
    }

    #[test]
    fn test_disabled_resets_to_base() {
        let config = HomeostasisConfig {
            target_firing_rate_hz: 0.0,
            strength: 0.0,
            ..HomeostasisConfig::default()
        };
        let regulator = HomeostaticRegulator::new(config);
        let result = regulator.maybe_adjust_threshold(Time::from_millis(100), 2.5, 1.0);
        assert_eq!(result, Some(1.0));
    }

    #[test]
    fn test_quiet_but_not_silent_skips_adjustment() {
        let config = HomeostasisConfig {
            homeostatic_interval_ms: 0.0,
            min_activity_for_adjustment: 0.5,
            ..HomeostasisConfig::default()
        };
        let regulator = HomeostaticRegulator::new(config);
        regulator.on_fire(Time::from_millis(0));
        regulator.on_maintenance_tick(Time::from_millis(0));
        regulator.on_maintenance_tick(Time::from_millis(4_000));
        assert!(regulator.calcium_level() < 0.5);
        assert!(regulator.current_firing_rate(Time::from_millis(4_000)) > 0.0);
        let result = regulator.maybe_adjust_threshold(Time::from_millis(4_000), 1.0, 1.0);
        assert_eq!(result, None);
    }

    #[test]
    fn test_threshold_adjustment_respects_interval() {
        let config = HomeostasisConfig {
            homeostatic_interval_ms: 100.0,
            ..HomeostasisConfig::default()
        };
        let regulator = HomeostaticRegulator::new(config);
        let first = regulator.maybe_adjust_threshold(Time::from_millis(0), 1.0, 1.0);
        assert!(first.is_some());
        let second = regulator.maybe_adjust_threshold(Time::from_millis(50), 1.0, 1.0);
        assert_eq!(second, None);
        let third = regulator.maybe_adjust_threshold(Time::from_millis(150), 1.0, 1.0);
        assert!(third.is_some());
    }
}
