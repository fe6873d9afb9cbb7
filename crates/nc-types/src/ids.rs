//! Identifier and timestamp types shared across the kernel.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Unique identifier for a neuron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeuronId(pub u64);

impl NeuronId {
    /// Create a new neuron ID.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Opaque identifier for an upstream source (a presynaptic neuron, sensor, or
/// test harness). May be empty, which callers use to mean "unattributed".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub Arc<str>);

impl SourceId {
    /// The empty, unattributed source.
    pub fn empty() -> Self {
        Self(Arc::from(""))
    }

    /// True if this source carries no identity.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: AsRef<str>> From<S> for SourceId {
    fn from(s: S) -> Self {
        Self(Arc::from(s.as_ref()))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for a synapse (the connection a signal travelled through).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SynapseId(pub Arc<str>);

impl SynapseId {
    /// The empty synapse id.
    pub fn empty() -> Self {
        Self(Arc::from(""))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SynapseId {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: AsRef<str>> From<S> for SynapseId {
    fn from(s: S) -> Self {
        Self(Arc::from(s.as_ref()))
    }
}

impl fmt::Display for SynapseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic instant, represented as nanoseconds since an arbitrary epoch.
///
/// Kept as a plain integer (rather than `std::time::Instant`) so schedulers
/// and tests can construct arbitrary points in time deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(pub u64);

impl Time {
    /// Create a new time value from raw nanoseconds.
    pub const fn new(ns: u64) -> Self {
        Self(ns)
    }

    /// Create time from nanoseconds.
    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    /// Create time from milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * 1_000_000)
    }

    /// Get nanoseconds since the epoch.
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Get whole milliseconds since the epoch.
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Elapsed nanoseconds since `earlier`, saturating at zero.
    pub fn saturating_since(&self, earlier: Time) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Elapsed time since `earlier` in milliseconds (may be fractional).
    pub fn millis_since(&self, earlier: Time) -> f64 {
        self.saturating_since(earlier) as f64 / 1_000_000.0
    }

    /// `self + duration`, saturating at `u64::MAX`.
    pub fn plus(&self, duration: Duration) -> Time {
        Time(self.0.saturating_add(duration.as_nanos() as u64))
    }

    /// The zero instant.
    pub const ZERO: Self = Self(0);
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Chemical identity of a synaptic signal, when the upstream synapse reports one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NeurotransmitterKind {
    /// Principal excitatory transmitter (drives AMPA/NMDA receptors).
    Glutamate,
    /// Principal inhibitory transmitter (drives GABA-A/B receptors).
    Gaba,
    /// Neuromodulator associated with reward and gain control.
    Dopamine,
    /// Neuromodulator associated with mood and arousal.
    Serotonin,
    /// Brain-derived neurotrophic factor; slow structural/metaplastic signal.
    Bdnf,
    /// Any other named ligand not covered above.
    Other(Arc<str>),
}

impl fmt::Display for NeurotransmitterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glutamate => write!(f, "glutamate"),
            Self::Gaba => write!(f, "GABA"),
            Self::Dopamine => write!(f, "dopamine"),
            Self::Serotonin => write!(f, "serotonin"),
            Self::Bdnf => write!(f, "BDNF"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neuron_id() {
        let id = NeuronId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{id}"), "N42");
    }

    #[test]
    fn test_source_id_empty() {
        let empty = SourceId::empty();
        assert!(empty.is_empty());
        let named: SourceId = "retina-1".into();
        assert!(!named.is_empty());
        assert_eq!(named.as_str(), "retina-1");
    }

    #[test]
    fn test_time_arithmetic() {
        let t0 = Time::from_millis(10);
        let t1 = Time::from_millis(15);
        assert_eq!(t1.saturating_since(t0), 5_000_000);
        assert!((t1.millis_since(t0) - 5.0).abs() < 1e-9);
        // saturates rather than underflowing
        assert_eq!(t0.saturating_since(t1), 0);
    }

    #[test]
    fn test_neurotransmitter_display() {
        assert_eq!(NeurotransmitterKind::Glutamate.to_string(), "glutamate");
        let custom = NeurotransmitterKind::Other(Arc::from("acetylcholine"));
        assert_eq!(custom.to_string(), "acetylcholine");
    }
}
