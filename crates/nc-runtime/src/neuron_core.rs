//! The neuron state machine: integrates dendritic integration, scaling and
//! homeostasis (C2-C6) against a firing state machine, and delivers fired
//! output through the scheduler/axon surface (C1/C7).
//!
//! Locking discipline matches the fixed order used throughout this crate:
//! state, then outputs, then gains, then activity. `scaling` and
//! `homeostasis` own the latter two internally, so a call site here only
//! ever holds `state` and `outputs` at once, state first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};

use nc_core::DendriticMode;
use nc_types::{NeuralSignal, NeuronId, NeurotransmitterKind, SourceId, SynapseId, Time};

use crate::axon::{AxonConfig, AxonStats, AxonalDeliveryWorker};
use crate::error::{Result, RuntimeError};
use crate::homeostasis::{HomeostaticInfo, HomeostasisConfig, HomeostaticRegulator};
use crate::scaling::{ScalingConfig, ScalingEvent, SynapticScalingEngine};
use crate::scheduler::SignalTarget;
use crate::stdp::StdpConfig;

/// Firing state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiringState {
    /// Below threshold, not currently counting down a refractory period.
    Resting,
    /// Accumulating input toward threshold.
    Integrating,
    /// Just fired; input is dropped until `refractory_period` elapses.
    Refractory,
}

/// Reference-counted function callbacks the core consumes from its owning matrix.
///
/// Each is `required iff` the corresponding `NeuronConfig` feature flag is
/// set; completeness is validated in [`NeuronCore::new`].
#[derive(Default, Clone)]
pub struct CallbackBundle {
    /// Create a synapse `(id, target, initial_weight)`.
    pub create_synapse: Option<Arc<dyn Fn(SynapseId, NeuronId, f64) -> Result<()> + Send + Sync>>,
    /// Delete a synapse by id.
    pub delete_synapse: Option<Arc<dyn Fn(SynapseId) -> Result<()> + Send + Sync>>,
    /// Look up a synapse's current weight.
    pub get_synapse: Option<Arc<dyn Fn(SynapseId) -> Option<f64> + Send + Sync>>,
    /// List every synapse this neuron owns.
    pub list_synapses: Option<Arc<dyn Fn() -> Vec<SynapseId> + Send + Sync>>,
    /// Overwrite a synapse's weight.
    pub set_synapse_weight: Option<Arc<dyn Fn(SynapseId, f64) -> Result<()> + Send + Sync>>,
    /// Apply a computed STDP weight delta to a synapse.
    pub apply_plasticity: Option<Arc<dyn Fn(SynapseId, f64) + Send + Sync>>,
    /// Release a chemical ligand into the surrounding matrix.
    pub release_chemical: Option<Arc<dyn Fn(NeurotransmitterKind, f64) -> Result<()> + Send + Sync>>,
}

/// Construction-time configuration. Factories (`excitatory`, `inhibitory`, ...)
/// pre-populate sensible defaults; fields otherwise mirror the query/config surface.
pub struct NeuronConfig {
    /// Spatial position; opaque to this crate, consumed by external spatial services.
    pub position: (f64, f64, f64),
    /// Initial and base firing threshold.
    pub threshold: f64,
    /// Per-maintenance-tick multiplicative membrane decay.
    pub decay_rate: f64,
    /// Minimum time between fires, milliseconds.
    pub refractory_period_ms: f64,
    /// Multiplier applied to the accumulator when emitting a fired value.
    pub fire_factor: f64,
    /// Target steady-state firing rate for homeostasis, Hz.
    pub target_firing_rate: f64,
    /// Homeostatic feedback strength.
    pub homeostasis_strength: f64,
    /// Ligands this neuron's receptors respond to (informational).
    pub receptors: Vec<NeurotransmitterKind>,
    /// Ligands this neuron releases on firing (informational).
    pub released_ligands: Vec<NeurotransmitterKind>,
    /// Enable synaptic scaling at construction.
    pub enable_synaptic_scaling: bool,
    /// Target per-source input strength for scaling.
    pub target_input_strength: f64,
    /// Scaling step rate.
    pub scaling_rate: f64,
    /// Minimum time between scaling checks, milliseconds.
    pub scaling_interval_ms: f64,
    /// The dendritic integration strategy this neuron uses.
    pub dendritic_mode: DendriticMode,
    /// Enable STDP feedback (requires `apply_plasticity`).
    pub enable_stdp_feedback: bool,
    /// Delay before STDP feedback is applied, milliseconds.
    pub stdp_feedback_delay_ms: f64,
    /// Learning rate fed into the STDP configuration.
    pub stdp_learning_rate: f64,
    /// Enable periodic automatic scaling checks (vs. only on explicit call).
    pub enable_auto_scaling: bool,
    /// Interval between automatic scaling checks, milliseconds.
    pub scaling_check_interval_ms: f64,
    /// Enable periodic automatic synapse pruning (out of scope here; flag retained for callback validation).
    pub enable_auto_pruning: bool,
    /// Interval between automatic pruning checks, milliseconds.
    pub pruning_check_interval_ms: f64,
    /// Bounded input buffer capacity.
    pub input_buffer_capacity: usize,
    /// Opaque metadata bag.
    pub metadata: HashMap<String, String>,
}

impl Default for NeuronConfig {
    fn default() -> Self {
        Self {
            position: (0.0, 0.0, 0.0),
            threshold: 1.0,
            decay_rate: 0.95,
            refractory_period_ms: 2.0,
            fire_factor: 1.0,
            target_firing_rate: 5.0,
            homeostasis_strength: 1.0,
            receptors: vec![NeurotransmitterKind::Glutamate],
            released_ligands: vec![NeurotransmitterKind::Glutamate],
            enable_synaptic_scaling: true,
            target_input_strength: 1.0,
            scaling_rate: 0.1,
            scaling_interval_ms: 1_000.0,
            dendritic_mode: DendriticMode::passive(),
            enable_stdp_feedback: false,
            stdp_feedback_delay_ms: 10.0,
            stdp_learning_rate: 0.01,
            enable_auto_scaling: true,
            scaling_check_interval_ms: 1_000.0,
            enable_auto_pruning: false,
            pruning_check_interval_ms: 60_000.0,
            input_buffer_capacity: 10,
            metadata: HashMap::new(),
        }
    }
}

impl NeuronConfig {
    /// A fast-decaying, positive-output neuron for feedforward excitatory circuits.
    pub fn excitatory() -> Self {
        Self {
            fire_factor: 1.0,
            released_ligands: vec![NeurotransmitterKind::Glutamate],
            ..Self::default()
        }
    }

    /// A negative-output neuron releasing GABA, for local inhibitory circuits.
    pub fn inhibitory() -> Self {
        Self {
            fire_factor: -1.0,
            released_ligands: vec![NeurotransmitterKind::Gaba],
            homeostasis_strength: 0.5,
            ..Self::default()
        }
    }

    /// STDP feedback enabled, slower decay to widen the coincidence window.
    pub fn learning() -> Self {
        Self {
            enable_stdp_feedback: true,
            decay_rate: 0.98,
            dendritic_mode: DendriticMode::temporal_summation(),
            ..Self::default()
        }
    }

    /// Tighter scaling and homeostasis bounds, for circuits that should change slowly.
    pub fn conservative() -> Self {
        Self {
            scaling_rate: 0.02,
            homeostasis_strength: 0.3,
            scaling_interval_ms: 5_000.0,
            ..Self::default()
        }
    }

    /// Biological cable-equation dendrite with a longer refractory period, modeling a
    /// layer-5 pyramidal cell.
    pub fn cortical_pyramidal() -> Self {
        Self {
            refractory_period_ms: 3.0,
            decay_rate: 0.97,
            dendritic_mode: DendriticMode::biological(nc_core::BiologicalConfig::default()),
            target_firing_rate: 2.0,
            ..Self::default()
        }
    }
}

struct CoreState {
    firing_state: FiringState,
    threshold: f64,
    accumulator: f64,
    last_fire_time: Option<Time>,
    recent_spike_count: u32,
}

/// Snapshot returned by `neuron_state()` for external inspection/debugging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronStateSnapshot {
    /// Current firing state.
    pub firing_state: FiringState,
    /// Current threshold.
    pub threshold: f64,
    /// Current accumulator value.
    pub accumulator: f64,
    /// Timestamp of the most recent fire.
    pub last_fire_time: Option<Time>,
}

/// Coarse health/perf counters for the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceMetrics {
    /// Total signals accepted into the input buffer.
    pub inputs_received_total: u64,
    /// Total signals dropped for arriving during `Refractory`.
    pub inputs_dropped_refractory_total: u64,
    /// Total signals dropped for input-buffer overflow.
    pub inputs_dropped_overflow_total: u64,
    /// Total times this neuron has fired.
    pub fires_total: u64,
}

/// Coarse subsystem health snapshot, for the `subsystem_health` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsystemHealth {
    /// Current firing state.
    pub firing_state: FiringState,
    /// Axonal delivery worker counters.
    pub axon: AxonStats,
    /// Bounded input buffer capacity.
    pub input_buffer_capacity: usize,
}

struct Counters {
    inputs_received_total: u64,
    inputs_dropped_refractory_total: u64,
    inputs_dropped_overflow_total: u64,
    fires_total: u64,
}

const BASE_THRESHOLD_MIN_FACTOR: f64 = 0.1;
const BASE_THRESHOLD_MAX_FACTOR: f64 = 5.0;

/// A single neuron: firing state machine, dendritic integration, scaling and homeostasis.
pub struct NeuronCore {
    id: NeuronId,
    base_threshold: f64,
    decay_rate: f64,
    refractory_period_ms: f64,
    fire_factor: f64,
    input_buffer_capacity: usize,

    state: Mutex<CoreState>,
    dendritic_mode: RwLock<DendriticMode>,
    scaling: SynapticScalingEngine,
    homeostasis: HomeostaticRegulator,
    axon: AxonalDeliveryWorker,
    stdp_config: StdpConfig,
    enable_stdp_feedback: bool,
    released_ligands: Vec<NeurotransmitterKind>,

    outputs: RwLock<Vec<Arc<dyn SignalTarget>>>,
    fire_event_sink: RwLock<Option<Arc<dyn Fn(NeuronId, f64, Time) + Send + Sync>>>,
    callbacks: CallbackBundle,
    coincidence_window_ms: RwLock<Option<f64>>,

    inbox_tx: Sender<NeuralSignal>,
    inbox_rx: Receiver<NeuralSignal>,
    counters: Mutex<Counters>,
    cancelled: AtomicBool,
}

impl NeuronCore {
    /// Construct a neuron. Fails if a feature flag is enabled without its
    /// required callback.
    pub fn new(id: NeuronId, config: NeuronConfig, callbacks: CallbackBundle) -> Result<Self> {
        if config.enable_stdp_feedback && callbacks.apply_plasticity.is_none() {
            return Err(RuntimeError::missing_callback("apply_plasticity", "enable_stdp_feedback"));
        }

        let (inbox_tx, inbox_rx) = bounded(config.input_buffer_capacity);

        let scaling_config = ScalingConfig {
            enabled: config.enable_synaptic_scaling,
            target_input_strength: config.target_input_strength,
            scaling_rate: config.scaling_rate,
            scaling_interval_ms: config.scaling_interval_ms,
            ..ScalingConfig::default()
        };
        let homeostasis_config = HomeostasisConfig {
            target_firing_rate_hz: config.target_firing_rate,
            strength: config.homeostasis_strength,
            ..HomeostasisConfig::default()
        };
        let stdp_config = StdpConfig {
            learning_rate: config.stdp_learning_rate,
            ..StdpConfig::default()
        };

        Ok(Self {
            id,
            base_threshold: config.threshold,
            decay_rate: config.decay_rate,
            refractory_period_ms: config.refractory_period_ms,
            fire_factor: config.fire_factor,
            input_buffer_capacity: config.input_buffer_capacity,
            state: Mutex::new(CoreState {
                firing_state: FiringState::Resting,
                threshold: config.threshold,
                accumulator: 0.0,
                last_fire_time: None,
                recent_spike_count: 0,
            }),
            dendritic_mode: RwLock::new(config.dendritic_mode),
            scaling: SynapticScalingEngine::new(scaling_config),
            homeostasis: HomeostaticRegulator::new(homeostasis_config),
            axon: AxonalDeliveryWorker::new(AxonConfig::default()),
            stdp_config,
            enable_stdp_feedback: config.enable_stdp_feedback,
            released_ligands: config.released_ligands,
            outputs: RwLock::new(Vec::new()),
            fire_event_sink: RwLock::new(None),
            callbacks,
            coincidence_window_ms: RwLock::new(None),
            inbox_tx,
            inbox_rx,
            counters: Mutex::new(Counters {
                inputs_received_total: 0,
                inputs_dropped_refractory_total: 0,
                inputs_dropped_overflow_total: 0,
                fires_total: 0,
            }),
            cancelled: AtomicBool::new(false),
        })
    }

    /// This neuron's id.
    pub fn id(&self) -> NeuronId {
        self.id
    }

    /// Register a downstream output target.
    pub fn add_output_target(&self, target: Arc<dyn SignalTarget>) {
        self.outputs.write().push(target);
    }

    /// Accept a signal. Dropped silently if currently refractory or if the
    /// input buffer is full.
    pub fn receive(&self, signal: NeuralSignal) {
        if self.cancelled.load(AtomicOrdering::Acquire) {
            return;
        }
        if self.state.lock().firing_state == FiringState::Refractory {
            self.counters.lock().inputs_dropped_refractory_total += 1;
            return;
        }
        match self.inbox_tx.try_send(signal) {
            Ok(()) => self.counters.lock().inputs_received_total += 1,
            Err(TrySendError::Full(_)) => self.counters.lock().inputs_dropped_overflow_total += 1,
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Drain buffered inputs, apply the dendritic `handle` pipeline, and run
    /// the periodic maintenance step (dendritic `process`, decay, calcium,
    /// homeostatic adjustment, refractory recovery, fire check).
    pub fn maintenance_tick(&self, now: Time) {
        if self.cancelled.load(AtomicOrdering::Acquire) {
            return;
        }

        while let Ok(signal) = self.inbox_rx.try_recv() {
            if self.state.lock().firing_state == FiringState::Refractory {
                self.counters.lock().inputs_dropped_refractory_total += 1;
                continue;
            }
            let effective_value = self.scaling.apply_post_synaptic_gain(&signal);
            if !signal.source_id.is_empty() {
                self.scaling.record_input_activity(&signal.source_id, effective_value, now);
            }
            let gain_adjusted = NeuralSignal {
                value: effective_value,
                ..signal
            };
            if let Some(potential) = self.dendritic_mode.read().handle(gain_adjusted, now) {
                self.fold_and_maybe_fire(potential, now);
            }
        }

        let snapshot = self.snapshot(now);
        if let Some(potential) = self.dendritic_mode.read().process(&snapshot, now) {
            self.fold_and_maybe_fire(potential, now);
        }

        {
            let mut state = self.state.lock();
            state.accumulator *= self.decay_rate;
            if state.accumulator.abs() < 1e-10 {
                state.accumulator = 0.0;
            }
        }

        self.homeostasis.on_maintenance_tick(now);

        {
            let mut state = self.state.lock();
            if state.firing_state == FiringState::Refractory {
                if let Some(last) = state.last_fire_time {
                    if now.millis_since(last) >= self.refractory_period_ms {
                        state.firing_state = FiringState::Integrating;
                    }
                }
            }
        }

        let (current_threshold, base_threshold) = {
            let state = self.state.lock();
            (state.threshold, self.base_threshold)
        };
        if let Some(new_threshold) = self.homeostasis.maybe_adjust_threshold(now, current_threshold, base_threshold) {
            self.state.lock().threshold = new_threshold.clamp(
                base_threshold * BASE_THRESHOLD_MIN_FACTOR,
                base_threshold * BASE_THRESHOLD_MAX_FACTOR,
            );
        }

        self.maybe_fire(now);
        self.axon.tick(now);
    }

    fn fold_and_maybe_fire(&self, potential: nc_core::IntegratedPotential, now: Time) {
        self.state.lock().accumulator += potential.net_current;
        self.maybe_fire(now);
    }

    fn maybe_fire(&self, now: Time) {
        let should_fire = {
            let state = self.state.lock();
            state.firing_state != FiringState::Refractory && state.accumulator >= state.threshold
        };
        if should_fire {
            self.fire(now);
        }
    }

    fn fire(&self, now: Time) {
        let value = {
            let mut state = self.state.lock();
            state.last_fire_time = Some(now);
            state.recent_spike_count = state.recent_spike_count.saturating_add(1);
            let value = state.accumulator * self.fire_factor;
            state.accumulator = 0.0;
            state.firing_state = FiringState::Refractory;
            value
        };
        self.homeostasis.on_fire(now);
        self.counters.lock().fires_total += 1;

        if let Some(release) = self.callbacks.release_chemical.as_ref() {
            for ligand in &self.released_ligands {
                let _ = release(ligand.clone(), value.abs());
            }
        }

        for target in self.outputs.read().iter() {
            target.receive(NeuralSignal::new(value, now).with_source(format!("{}", self.id)));
        }
        if let Some(sink) = self.fire_event_sink.read().as_ref() {
            sink(self.id, value, now);
        }
    }

    fn snapshot(&self, now: Time) -> nc_core::MembraneSnapshot {
        let state = self.state.lock();
        nc_core::MembraneSnapshot::new(
            state.accumulator,
            state.threshold,
            0.0,
            self.homeostasis.calcium_level(),
            state.last_fire_time,
            state.recent_spike_count,
            now,
        )
    }

    /// Idempotent shutdown: trips the cancellation flag and drains the axon.
    pub fn close(&self) {
        if self.cancelled.swap(true, AtomicOrdering::AcqRel) {
            return;
        }
        self.axon.shutdown();
    }

    // --- Query surface -----------------------------------------------------

    /// Current (possibly homeostatically adjusted) threshold.
    pub fn current_threshold(&self) -> f64 {
        self.state.lock().threshold
    }

    /// Immutable construction-time threshold.
    pub fn base_threshold(&self) -> f64 {
        self.base_threshold
    }

    /// Current calcium level.
    pub fn calcium_level(&self) -> f64 {
        self.homeostasis.calcium_level()
    }

    /// Fires-per-second over the homeostatic window, as of `now`.
    pub fn current_firing_rate(&self, now: Time) -> f64 {
        self.homeostasis.current_firing_rate(now)
    }

    /// Calcium, firing rate and last threshold-adjustment snapshot.
    pub fn homeostatic_info(&self, now: Time) -> HomeostaticInfo {
        self.homeostasis.info(now)
    }

    /// Copy of every tracked source's current receptor gain.
    pub fn input_gains(&self) -> HashMap<SourceId, f64> {
        self.scaling.get_input_gains()
    }

    /// Copy of the bounded scaling history.
    pub fn scaling_history(&self) -> Vec<ScalingEvent> {
        self.scaling.get_scaling_history()
    }

    /// Copy of the membrane/firing substate.
    pub fn neuron_state(&self, _now: Time) -> NeuronStateSnapshot {
        let state = self.state.lock();
        NeuronStateSnapshot {
            firing_state: state.firing_state,
            threshold: state.threshold,
            accumulator: state.accumulator,
            last_fire_time: state.last_fire_time,
        }
    }

    /// Current firing state, for `processing_status`.
    pub fn processing_status(&self) -> FiringState {
        self.state.lock().firing_state
    }

    /// Coarse input/fire counters.
    pub fn performance_metrics(&self) -> PerformanceMetrics {
        let counters = self.counters.lock();
        PerformanceMetrics {
            inputs_received_total: counters.inputs_received_total,
            inputs_dropped_refractory_total: counters.inputs_dropped_refractory_total,
            inputs_dropped_overflow_total: counters.inputs_dropped_overflow_total,
            fires_total: counters.fires_total,
        }
    }

    /// Bounded input buffer capacity, for `subsystem_health`.
    pub fn input_buffer_capacity(&self) -> usize {
        self.input_buffer_capacity
    }

    /// Coarse health snapshot: firing state and axonal delivery backlog.
    pub fn subsystem_health(&self) -> SubsystemHealth {
        SubsystemHealth {
            firing_state: self.processing_status(),
            axon: self.axon.stats(),
            input_buffer_capacity: self.input_buffer_capacity,
        }
    }

    // --- Configuration surface ----------------------------------------------

    /// Install (or clear) the fire-event sink.
    pub fn set_fire_event_sink(&self, sink: Option<Arc<dyn Fn(NeuronId, f64, Time) + Send + Sync>>) {
        *self.fire_event_sink.write() = sink;
    }

    /// Enable synaptic scaling with new target/rate/interval.
    pub fn enable_synaptic_scaling(&self, target: f64, rate: f64, interval_ms: f64) {
        self.scaling.enable(target, rate, interval_ms);
    }

    /// Disable synaptic scaling; existing gains are preserved.
    pub fn disable_synaptic_scaling(&self) {
        self.scaling.disable();
    }

    /// Directly set one source's receptor gain.
    pub fn set_input_gain(&self, source: SourceId, gain: f64) {
        self.scaling.set_input_gain(source, gain);
    }

    /// Update homeostatic target rate and feedback strength.
    pub fn set_homeostatic_parameters(&self, target_rate: f64, strength: f64) {
        self.homeostasis.set_parameters(target_rate, strength);
    }

    /// Swap the dendritic integration strategy.
    pub fn set_dendritic_mode(&self, mode: DendriticMode) {
        *self.dendritic_mode.write() = mode;
    }

    /// Enable or disable a standalone coincidence-detection window, independent
    /// of any detector already owned by an active-dendrite mode.
    pub fn set_coincidence_detection(&self, enabled: bool, window_ms: f64) {
        *self.coincidence_window_ms.write() = if enabled { Some(window_ms) } else { None };
    }

    /// Compute an STDP weight delta for a pre/post spike pair and, if
    /// feedback is enabled, apply it to the synapse via the callback bundle.
    pub fn feedback_stdp(&self, synapse_id: SynapseId, pre_spike_time: Time, post_spike_time: Time) -> Option<f64> {
        if !self.enable_stdp_feedback {
            return None;
        }
        let delta = crate::stdp::stdp_weight_change_for_spikes(pre_spike_time, post_spike_time, &self.stdp_config);
        if let Some(apply) = self.callbacks.apply_plasticity.as_ref() {
            apply(synapse_id, delta);
        }
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex as StdMutex;

    use super::*;

    struct RecordingTarget {
        received: StdMutex<Vec<f64>>,
    }

    impl SignalTarget for RecordingTarget {
        fn receive(&self, signal: NeuralSignal) {
            self.received.lock().push(signal.value);
        }
    }

    #[test]
    fn test_passive_neuron_fires_above_threshold() {
        let config = NeuronConfig {
            threshold: 1.0,
            decay_rate: 1.0,
            dendritic_mode: DendriticMode::passive(),
            enable_synaptic_scaling: false,
            ..NeuronConfig::default()
        };
        let neuron = NeuronCore::new(NeuronId::new(1), config, CallbackBundle::default()).unwrap();
        let target = Arc::new(RecordingTarget {
            received: StdMutex::new(Vec::new()),
        });
        neuron.add_output_target(target.clone());

        neuron.receive(NeuralSignal::new(1.5, Time::from_millis(0)));
        neuron.maintenance_tick(Time::from_millis(1));

        assert_eq!(neuron.processing_status(), FiringState::Refractory);
        assert_eq!(target.received.lock().len(), 1);
        assert!((target.received.lock()[0] - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_refractory_drops_input() {
        let config = NeuronConfig {
            threshold: 1.0,
            decay_rate: 1.0,
            refractory_period_ms: 100.0,
            enable_synaptic_scaling: false,
            ..NeuronConfig::default()
        };
        let neuron = NeuronCore::new(NeuronId::new(2), config, CallbackBundle::default()).unwrap();
        neuron.receive(NeuralSignal::new(2.0, Time::from_millis(0)));
        neuron.maintenance_tick(Time::from_millis(1));
        assert_eq!(neuron.processing_status(), FiringState::Refractory);

        neuron.receive(NeuralSignal::new(5.0, Time::from_millis(2)));
        assert_eq!(neuron.performance_metrics().inputs_dropped_refractory_total, 1);
    }

    #[test]
    fn test_refractory_recovers_after_period() {
        let config = NeuronConfig {
            threshold: 1.0,
            decay_rate: 1.0,
            refractory_period_ms: 5.0,
            enable_synaptic_scaling: false,
            ..NeuronConfig::default()
        };
        let neuron = NeuronCore::new(NeuronId::new(3), config, CallbackBundle::default()).unwrap();
        neuron.receive(NeuralSignal::new(2.0, Time::from_millis(0)));
        neuron.maintenance_tick(Time::from_millis(1));
        assert_eq!(neuron.processing_status(), FiringState::Refractory);

        neuron.maintenance_tick(Time::from_millis(10));
        assert_eq!(neuron.processing_status(), FiringState::Integrating);
    }

    #[test]
    fn test_missing_apply_plasticity_callback_rejected() {
        let config = NeuronConfig {
            enable_stdp_feedback: true,
            ..NeuronConfig::default()
        };
        let result = NeuronCore::new(NeuronId::new(4), config, CallbackBundle::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let neuron = NeuronCore::new(NeuronId::new(5), NeuronConfig::default(), CallbackBundle::default()).unwrap();
        neuron.close();
        neuron.close();
        neuron.receive(NeuralSignal::new(100.0, Time::from_millis(0)));
        neuron.maintenance_tick(Time::from_millis(1));
        assert_eq!(neuron.processing_status(), FiringState::Resting);
    }

    #[test]
    fn test_input_buffer_overflow_is_dropped_silently() {
        let config = NeuronConfig {
            input_buffer_capacity: 1,
            enable_synaptic_scaling: false,
            ..NeuronConfig::default()
        };
        let neuron = NeuronCore::new(NeuronId::new(6), config, CallbackBundle::default()).unwrap();
        neuron.receive(NeuralSignal::new(0.1, Time::from_millis(0)));
        neuron.receive(NeuralSignal::new(0.1, Time::from_millis(0)));
        assert_eq!(neuron.performance_metrics().inputs_dropped_overflow_total, 1);
    }
}
