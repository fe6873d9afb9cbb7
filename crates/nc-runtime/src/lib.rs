//! Signal scheduler, synaptic scaling, homeostasis, axonal delivery and the
//! neuron state machine for the neurokernel runtime.
//!
//! Built atop `nc-core`'s ion channels, coincidence detectors and dendritic
//! integration modes: this crate owns everything stateful about a neuron's
//! lifecycle that those primitives are deliberately blind to.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod axon;
pub mod error;
pub mod homeostasis;
pub mod neuron_core;
pub mod scaling;
pub mod scheduler;
pub mod stdp;

pub use axon::{AxonConfig, AxonStats, AxonalDeliveryWorker, EnqueueOutcome};
pub use error::{Result, RuntimeError};
pub use homeostasis::{HomeostasisConfig, HomeostaticInfo, HomeostaticRegulator};
pub use neuron_core::{
    CallbackBundle, FiringState, NeuronConfig, NeuronCore, NeuronStateSnapshot, PerformanceMetrics,
    SubsystemHealth,
};
pub use scaling::{ScalingConfig, ScalingEvent, ScalingResult, ScalingSkipReason, SynapticScalingEngine};
pub use scheduler::{ScheduledSignal, SchedulerStats, SignalScheduler, SignalTarget};
pub use stdp::{calculate_stdp_weight_change, stdp_weight_change_for_spikes, StdpConfig};

/// Runtime crate version, surfaced for compatibility checks by dependents.
pub const RUNTIME_VERSION: u32 = 1;

/// Default maintenance-tick period, milliseconds.
pub const DEFAULT_MAINTENANCE_TICK_MS: f64 = 1.0;
