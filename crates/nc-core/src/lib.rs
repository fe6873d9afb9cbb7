//! Ion channel kinetics, coincidence detectors and dendritic integration modes.
//!
//! This crate has no notion of a neuron's lifecycle or firing state machine —
//! that lives in `nc-runtime`, which composes these primitives against a
//! `MembraneSnapshot` on every input arrival and maintenance tick.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod channels;
pub mod dendrite;
pub mod detectors;
pub mod error;
pub mod signal_state;

pub use channels::{ChannelState, ChannelTrigger, ChannelType, IonChannel, IonSelectivity};
pub use dendrite::{
    ActiveDendriteConfig, BiologicalConfig, DendriticMode, DendriticModeKind, ShuntingConfig,
};
pub use detectors::{CoincidenceDetector, DetectionResult, DetectorConfig, NmdaConfig, SimpleTemporalConfig};
pub use error::{CoreError, Result};
pub use signal_state::{IntegratedPotential, InputActivity, MembraneSnapshot, TimestampedInput};
