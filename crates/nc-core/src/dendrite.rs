//! Dendritic integration modes: pluggable strategies between incoming signals
//! and the somatic accumulator.
//!
//! Expressed as a closed sum type (`DendriticModeKind`) rather than a trait
//! object: new modes are added by extending the enum, and every dispatch site
//! is exhaustive so the compiler catches a missing arm. Buffers are guarded by
//! `parking_lot::Mutex` so concurrent producers calling `handle` never race.

use std::collections::HashMap;

use parking_lot::Mutex;
use rand_distr::{Distribution, Normal};

use nc_types::{NeuralSignal, Time};

use crate::channels::IonChannel;
use crate::detectors::CoincidenceDetector;
use crate::signal_state::{IntegratedPotential, MembraneSnapshot, TimestampedInput};

/// Passive membrane: every signal is integrated immediately, nothing buffered.
#[derive(Debug, Default)]
pub struct PassiveMode;

/// Temporal summation: buffers signals and sums them on the next `process`.
#[derive(Debug, Default)]
pub struct TemporalSummationMode {
    buffer: Mutex<Vec<TimestampedInput>>,
}

/// Configuration for shunting inhibition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShuntingConfig {
    /// Multiplicative spatial attenuation applied to every buffered input.
    pub spatial_decay: f64,
    /// Shunting strength `k` in `net = E * max(0.1, 1 - k*I)`.
    pub shunting_strength: f64,
}

impl Default for ShuntingConfig {
    fn default() -> Self {
        Self {
            spatial_decay: 0.7,
            shunting_strength: 0.5,
        }
    }
}

/// Shunting inhibition: separates excitation/inhibition, floors rather than inverts sign.
#[derive(Debug)]
pub struct ShuntingInhibitionMode {
    config: ShuntingConfig,
    buffer: Mutex<Vec<TimestampedInput>>,
}

impl ShuntingInhibitionMode {
    /// Build with the given configuration.
    pub fn new(config: ShuntingConfig) -> Self {
        Self {
            config,
            buffer: Mutex::new(Vec::new()),
        }
    }
}

impl Default for ShuntingInhibitionMode {
    fn default() -> Self {
        Self::new(ShuntingConfig::default())
    }
}

/// Configuration for the active dendrite mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveDendriteConfig {
    /// Per-signal saturation cap applied before shunting.
    pub max_synaptic_effect: f64,
    /// Spatial attenuation applied before shunting (independent of the shunting-mode default).
    pub spatial_decay: f64,
    /// Shunting strength `k`.
    pub shunting_strength: f64,
    /// Self-triggered dendritic spike threshold on the post-shunt current.
    pub dendritic_spike_threshold: f64,
    /// Current added when the self-trigger threshold is crossed.
    pub nmda_spike_amplitude: f64,
}

impl Default for ActiveDendriteConfig {
    fn default() -> Self {
        Self {
            max_synaptic_effect: 0.88,
            spatial_decay: 1.0,
            shunting_strength: 0.5,
            dendritic_spike_threshold: 5.0,
            nmda_spike_amplitude: 0.5,
        }
    }
}

/// Active dendrite: saturating synapses, shunting, a self-trigger, and an
/// optional coincidence detector that can further amplify and flag a spike.
#[derive(Debug)]
pub struct ActiveDendriteMode {
    config: ActiveDendriteConfig,
    detector: Option<CoincidenceDetector>,
    buffer: Mutex<Vec<TimestampedInput>>,
}

impl ActiveDendriteMode {
    /// Build with the given configuration and an optional coincidence detector.
    pub fn new(config: ActiveDendriteConfig, detector: Option<CoincidenceDetector>) -> Self {
        Self {
            config,
            detector,
            buffer: Mutex::new(Vec::new()),
        }
    }
}

impl Default for ActiveDendriteMode {
    fn default() -> Self {
        Self::new(ActiveDendriteConfig::default(), None)
    }
}

/// Configuration for the biological (cable-equation) temporal summation mode.
#[derive(Debug, Clone, PartialEq)]
pub struct BiologicalConfig {
    /// Default membrane time constant, milliseconds.
    pub tau_ms: f64,
    /// Per-branch time constant overrides, keyed by synapse id.
    pub branch_tau_ms: HashMap<String, f64>,
    /// Decay factor applied to inputs whose source id contains "proximal".
    pub proximal_decay: f64,
    /// Decay factor applied to inputs whose source id contains "distal".
    pub distal_decay: f64,
    /// Standard deviation of additive Gaussian membrane noise (0 disables it).
    pub noise_std: f64,
    /// Standard deviation of temporal jitter applied to elapsed time, milliseconds (0 disables it).
    pub jitter_std_ms: f64,
    /// Inputs older than this many time constants are pruned on `process`.
    pub prune_after_taus: f64,
}

impl Default for BiologicalConfig {
    fn default() -> Self {
        Self {
            tau_ms: 20.0,
            branch_tau_ms: HashMap::new(),
            proximal_decay: 1.0,
            distal_decay: 0.5,
            noise_std: 0.0,
            jitter_std_ms: 0.0,
            prune_after_taus: 5.0,
        }
    }
}

impl BiologicalConfig {
    fn tau_for(&self, synapse_id: &str) -> f64 {
        self.branch_tau_ms.get(synapse_id).copied().unwrap_or(self.tau_ms)
    }
}

/// Biological temporal summation: exponential cable decay, per-branch tau,
/// proximal/distal spatial decay, optional Gaussian noise and jitter.
#[derive(Debug)]
pub struct BiologicalTemporalSummationMode {
    config: BiologicalConfig,
    buffer: Mutex<Vec<TimestampedInput>>,
}

impl BiologicalTemporalSummationMode {
    /// Build with the given configuration.
    pub fn new(config: BiologicalConfig) -> Self {
        Self {
            config,
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Spatial decay implied by a source id ("proximal"/"distal" substrings); 1.0 otherwise.
    fn spatial_decay_for(&self, source_id: &str) -> f64 {
        if source_id.contains("distal") {
            self.config.distal_decay
        } else if source_id.contains("proximal") {
            self.config.proximal_decay
        } else {
            1.0
        }
    }

    /// Deterministic cable-decay integration with no noise or jitter, exposed for tests.
    ///
    /// A signal arriving at `t0` and processed at `now > t0` contributes
    /// `value * decay_factor * exp(-(now - t0) / tau)`.
    pub fn process_immediate(&self, inputs: &[TimestampedInput], now: Time) -> IntegratedPotential {
        let mut net_current = 0.0;
        for input in inputs {
            let synapse_id = input.signal.synapse_id.as_str();
            let tau = self.config.tau_for(synapse_id);
            let elapsed_ms = now.millis_since(input.arrival_time);
            let cable_factor = (-elapsed_ms / tau).exp();
            let spatial = self.spatial_decay_for(input.source_id().as_str());
            net_current += input.signal.value * input.decay_factor * spatial * cable_factor;
        }
        IntegratedPotential::from_current(net_current)
    }

    fn process(&self, now: Time) -> Option<IntegratedPotential> {
        let mut buffer = self.buffer.lock();
        if buffer.is_empty() {
            return None;
        }
        let mut result = self.process_immediate(&buffer, now);

        if self.config.noise_std > 0.0 {
            if let Ok(normal) = Normal::new(0.0, self.config.noise_std) {
                result.net_current += normal.sample(&mut rand::thread_rng());
            }
        }

        // Retain only inputs still within the pruning horizon of the slowest branch tau.
        let max_tau = self
            .config
            .branch_tau_ms
            .values()
            .copied()
            .fold(self.config.tau_ms, f64::max);
        let horizon_ms = max_tau * self.config.prune_after_taus;
        buffer.retain(|input| now.millis_since(input.arrival_time) <= horizon_ms);

        Some(result)
    }

    fn handle(&self, signal: NeuralSignal, now: Time) {
        let jitter_ms = if self.config.jitter_std_ms > 0.0 {
            let normal = Normal::new(0.0, self.config.jitter_std_ms)
                .expect("jitter_std_ms > 0.0 validated above");
            normal.sample(&mut rand::thread_rng())
        } else {
            0.0
        };
        let jittered_now = now.plus(std::time::Duration::from_nanos(
            (jitter_ms.abs() * 1_000_000.0) as u64,
        ));
        self.buffer.lock().push(TimestampedInput::new(signal, jittered_now));
    }
}

/// Closed sum type over the required dendritic integration strategies.
#[derive(Debug)]
pub enum DendriticModeKind {
    /// Immediate, unbuffered integration.
    Passive(PassiveMode),
    /// Buffered signed sum.
    TemporalSummation(TemporalSummationMode),
    /// Excitation/inhibition split with a shunting floor.
    ShuntingInhibition(ShuntingInhibitionMode),
    /// Saturating synapses, shunting, self-trigger, optional detector.
    ActiveDendrite(ActiveDendriteMode),
    /// Cable-equation decay with per-branch tau, spatial decay, noise and jitter.
    BiologicalTemporalSummation(BiologicalTemporalSummationMode),
}

/// A dendritic mode, optionally aggregating an ensemble of ion channels.
///
/// Channel contributions are folded into `net_current` and recorded in
/// `channel_contributions` during `process`, regardless of which strategy is
/// selected; `handle` never touches channels (they have no voltage-clamp
/// meaning for an un-processed, still-buffered signal).
#[derive(Debug)]
pub struct DendriticMode {
    kind: DendriticModeKind,
    channels: Mutex<Vec<IonChannel>>,
}

impl DendriticMode {
    /// Build a mode with no channel ensemble.
    pub fn new(kind: DendriticModeKind) -> Self {
        Self {
            kind,
            channels: Mutex::new(Vec::new()),
        }
    }

    /// Attach a channel ensemble, replacing any previous one.
    pub fn with_channels(mut self, channels: Vec<IonChannel>) -> Self {
        self.channels = Mutex::new(channels);
        self
    }

    /// Passive membrane convenience constructor.
    pub fn passive() -> Self {
        Self::new(DendriticModeKind::Passive(PassiveMode))
    }

    /// Temporal summation convenience constructor.
    pub fn temporal_summation() -> Self {
        Self::new(DendriticModeKind::TemporalSummation(TemporalSummationMode::default()))
    }

    /// Shunting inhibition convenience constructor.
    pub fn shunting_inhibition(config: ShuntingConfig) -> Self {
        Self::new(DendriticModeKind::ShuntingInhibition(ShuntingInhibitionMode::new(config)))
    }

    /// Active dendrite convenience constructor.
    pub fn active_dendrite(config: ActiveDendriteConfig, detector: Option<CoincidenceDetector>) -> Self {
        Self::new(DendriticModeKind::ActiveDendrite(ActiveDendriteMode::new(config, detector)))
    }

    /// Biological temporal summation convenience constructor.
    pub fn biological(config: BiologicalConfig) -> Self {
        Self::new(DendriticModeKind::BiologicalTemporalSummation(
            BiologicalTemporalSummationMode::new(config),
        ))
    }

    /// Offer a signal to the mode. Passive integrates it immediately; every
    /// other mode buffers it and returns `None`.
    pub fn handle(&self, signal: NeuralSignal, now: Time) -> Option<IntegratedPotential> {
        match &self.kind {
            DendriticModeKind::Passive(_) => Some(IntegratedPotential::from_current(signal.value)),
            DendriticModeKind::TemporalSummation(m) => {
                m.buffer.lock().push(TimestampedInput::new(signal, now));
                None
            }
            DendriticModeKind::ShuntingInhibition(m) => {
                let input = TimestampedInput::new(signal, now).with_decay_factor(m.config.spatial_decay);
                m.buffer.lock().push(input);
                None
            }
            DendriticModeKind::ActiveDendrite(m) => {
                let input = TimestampedInput::new(signal, now).with_decay_factor(m.config.spatial_decay);
                m.buffer.lock().push(input);
                None
            }
            DendriticModeKind::BiologicalTemporalSummation(m) => {
                m.handle(signal, now);
                None
            }
        }
    }

    /// Integrate buffered inputs against the current membrane snapshot.
    pub fn process(&self, state: &MembraneSnapshot, now: Time) -> Option<IntegratedPotential> {
        let mut result = match &self.kind {
            DendriticModeKind::Passive(_) => None,
            DendriticModeKind::TemporalSummation(m) => {
                let mut buffer = m.buffer.lock();
                if buffer.is_empty() {
                    None
                } else {
                    let sum: f64 = buffer.iter().map(|i| i.signal.value).sum();
                    buffer.clear();
                    Some(IntegratedPotential::from_current(sum))
                }
            }
            DendriticModeKind::ShuntingInhibition(m) => {
                let mut buffer = m.buffer.lock();
                if buffer.is_empty() {
                    None
                } else {
                    let (excitation, inhibition) = split_excitation_inhibition(&buffer);
                    let shunt = (1.0 - m.config.shunting_strength * inhibition).max(0.1);
                    buffer.clear();
                    Some(IntegratedPotential::from_current(excitation * shunt))
                }
            }
            DendriticModeKind::ActiveDendrite(m) => {
                let mut buffer = m.buffer.lock();
                if buffer.is_empty() {
                    None
                } else {
                    let capped: Vec<TimestampedInput> = buffer
                        .drain(..)
                        .map(|mut input| {
                            input.signal.value = input
                                .signal
                                .value
                                .clamp(-m.config.max_synaptic_effect, m.config.max_synaptic_effect);
                            input
                        })
                        .collect();
                    let (excitation, inhibition) = split_excitation_inhibition(&capped);
                    let shunt = (1.0 - m.config.shunting_strength * inhibition).max(0.1);
                    let mut net = excitation * shunt;
                    let mut potential = IntegratedPotential::from_current(net);

                    if net >= m.config.dendritic_spike_threshold {
                        net += m.config.nmda_spike_amplitude;
                        potential.dendritic_spike = true;
                        potential.net_current = net;
                    }

                    if let Some(detector) = &m.detector {
                        let detection = detector.detect(&capped, state);
                        if detection.detected {
                            potential.net_current = net * detection.amplification_factor + detection.additional_current;
                            potential.nonlinear_amplification = detection.amplification_factor;
                            potential.calcium_current = detection.associated_calcium_influx;
                            potential.dendritic_spike = true;
                        }
                    }
                    Some(potential)
                }
            }
            DendriticModeKind::BiologicalTemporalSummation(m) => m.process(now),
        };

        if let Some(potential) = &mut result {
            fold_channel_contributions(&self.channels, state, potential);
        }
        result
    }
}

fn split_excitation_inhibition(buffer: &[TimestampedInput]) -> (f64, f64) {
    let mut excitation = 0.0;
    let mut inhibition = 0.0;
    for input in buffer {
        let decayed = input.decayed_value();
        if decayed >= 0.0 {
            excitation += decayed;
        } else {
            inhibition += -decayed;
        }
    }
    (excitation, inhibition)
}

fn fold_channel_contributions(
    channels: &Mutex<Vec<IonChannel>>,
    state: &MembraneSnapshot,
    potential: &mut IntegratedPotential,
) {
    let mut channels = channels.lock();
    if channels.is_empty() {
        return;
    }
    let sig = NeuralSignal::new(potential.net_current, Time::ZERO);
    for channel in channels.iter_mut() {
        channel.should_open(state.accumulator, 0.0, state.intracellular_calcium, 1.0);
        let (_, _, current) = channel.modulate_current(&sig, state.accumulator, state.intracellular_calcium);
        potential.channel_contributions.insert(channel.name().to_string(), current);
        potential.net_current += current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_types::{NeurotransmitterKind, SourceId};

    fn snapshot(accumulator: f64) -> MembraneSnapshot {
        MembraneSnapshot::new(accumulator, 1.0, -70.0, 0.0, None, 0, Time::ZERO)
    }

    #[test]
    fn test_passive_handle_is_immediate() {
        let mode = DendriticMode::passive();
        let sig = NeuralSignal::new(0.7, Time::ZERO);
        let result = mode.handle(sig, Time::ZERO).expect("passive integrates immediately");
        assert!((result.net_current - 0.7).abs() < 1e-12);
        assert!(mode.process(&snapshot(0.0), Time::ZERO).is_none());
    }

    #[test]
    fn test_gaba_timing_fix_scenario() {
        let mode = DendriticMode::temporal_summation();
        assert!(mode.handle(NeuralSignal::new(1.5, Time::ZERO), Time::ZERO).is_none());
        assert!(mode.handle(NeuralSignal::new(-2.0, Time::ZERO), Time::ZERO).is_none());
        let result = mode.process(&snapshot(0.0), Time::ZERO).expect("buffer was non-empty");
        assert!((result.net_current - (-0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_shunting_floor_scenario() {
        let mode = DendriticMode::shunting_inhibition(ShuntingConfig {
            spatial_decay: 0.7,
            shunting_strength: 0.5,
        });
        mode.handle(NeuralSignal::new(2.0, Time::ZERO), Time::ZERO);
        mode.handle(NeuralSignal::new(-3.0, Time::ZERO), Time::ZERO);
        let result = mode.process(&snapshot(0.0), Time::ZERO).unwrap();
        assert!((result.net_current - 0.14).abs() < 0.02, "got {}", result.net_current);
    }

    #[test]
    fn test_active_dendrite_nmda_scenario() {
        use crate::detectors::{CoincidenceDetector, NmdaConfig};

        let detector = CoincidenceDetector::nmda(NmdaConfig {
            current_threshold: 1.8,
            voltage_threshold: -45.0,
            amplification_factor: 1.2,
            additional_current: 1.0,
            ..NmdaConfig::default()
        });
        let mode = DendriticMode::active_dendrite(ActiveDendriteConfig::default(), Some(detector));
        for _ in 0..3 {
            let sig = NeuralSignal::new(1.0, Time::ZERO)
                .with_neurotransmitter(NeurotransmitterKind::Glutamate);
            mode.handle(sig, Time::ZERO);
        }
        let state = snapshot(-20.0);
        let result = mode.process(&state, Time::ZERO).unwrap();
        assert!(result.dendritic_spike);
        assert!((result.calcium_current - 0.5).abs() < 1e-9);
        assert!((result.nonlinear_amplification - 1.2).abs() < 1e-9);

        let expected = 3.0 * 0.88 * 1.2 + 1.0;
        let tolerance = expected * 0.15;
        assert!(
            (result.net_current - expected).abs() <= tolerance,
            "net_current {} not within 15% of {}",
            result.net_current,
            expected
        );
    }

    #[test]
    fn test_biological_cable_decay_at_tau() {
        let mode = BiologicalTemporalSummationMode::new(BiologicalConfig::default());
        let signal = NeuralSignal::new(1.0, Time::ZERO).with_source(SourceId::from("input-1"));
        let input = TimestampedInput::new(signal, Time::ZERO);
        let tau_ns = (20.0 * 1_000_000.0) as u64;
        let result = mode.process_immediate(&[input], Time::from_nanos(tau_ns));
        let inv_e = 1.0 / std::f64::consts::E;
        assert!((result.net_current - inv_e).abs() < 0.1, "got {}", result.net_current);
    }

    #[test]
    fn test_biological_distal_attenuates_more_than_proximal() {
        let mode = BiologicalTemporalSummationMode::new(BiologicalConfig::default());
        let proximal = TimestampedInput::new(
            NeuralSignal::new(1.0, Time::ZERO).with_source(SourceId::from("proximal-branch")),
            Time::ZERO,
        );
        let distal = TimestampedInput::new(
            NeuralSignal::new(1.0, Time::ZERO).with_source(SourceId::from("distal-branch")),
            Time::ZERO,
        );
        let p = mode.process_immediate(&[proximal], Time::ZERO).net_current;
        let d = mode.process_immediate(&[distal], Time::ZERO).net_current;
        assert!(d < p);
    }
}
