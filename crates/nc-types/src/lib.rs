//! Shared identifiers, timestamps, and the wire type for synaptic events.
//!
//! This crate has no opinions about neuron behavior; it exists so that
//! `nc-core` (dendritic integration primitives) and `nc-runtime` (the neuron
//! state machine and scheduler) can agree on what a neuron ID, a timestamp,
//! and a signal look like without depending on each other.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ids;
pub mod signal;

pub use error::{Result, TypesError};
pub use ids::{NeuronId, NeurotransmitterKind, SourceId, SynapseId, Time};
pub use signal::NeuralSignal;

/// Crate version, surfaced for compatibility checks by dependents.
pub const TYPES_VERSION: u32 = 1;
