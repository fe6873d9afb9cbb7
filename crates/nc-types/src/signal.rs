//! The discrete synaptic event that flows through every subsystem.

use crate::ids::{NeurotransmitterKind, SourceId, SynapseId, Time};

/// A discrete synaptic event delivered to a neuron.
///
/// Immutable once emitted: upstream callers build one, hand it to a neuron's
/// `receive`, and it is consumed (or dropped) by the dendritic pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralSignal {
    /// Signed synaptic strength. Sign carries excitation/inhibition.
    pub value: f64,
    /// When the signal was emitted (or, for scheduled delivery, arrives).
    pub timestamp: Time,
    /// Upstream neuron or sensor this signal came from. May be empty.
    pub source_id: SourceId,
    /// Synapse the signal travelled through. May be empty.
    pub synapse_id: SynapseId,
    /// Chemical identity of the signal, if the synapse reports one.
    pub neurotransmitter_kind: Option<NeurotransmitterKind>,
}

impl NeuralSignal {
    /// Build a signal with no source/synapse attribution and no chemical tag.
    pub fn new(value: f64, timestamp: Time) -> Self {
        Self {
            value,
            timestamp,
            source_id: SourceId::empty(),
            synapse_id: SynapseId::empty(),
            neurotransmitter_kind: None,
        }
    }

    /// Builder-style attribution of the originating source.
    pub fn with_source(mut self, source_id: impl Into<SourceId>) -> Self {
        self.source_id = source_id.into();
        self
    }

    /// Builder-style attribution of the synapse.
    pub fn with_synapse(mut self, synapse_id: impl Into<SynapseId>) -> Self {
        self.synapse_id = synapse_id.into();
        self
    }

    /// Builder-style neurotransmitter tag.
    pub fn with_neurotransmitter(mut self, kind: NeurotransmitterKind) -> Self {
        self.neurotransmitter_kind = Some(kind);
        self
    }

    /// True for signals that would depolarize the membrane (value > 0).
    pub fn is_excitatory(&self) -> bool {
        self.value > 0.0
    }

    /// True for signals that would hyperpolarize the membrane (value < 0).
    pub fn is_inhibitory(&self) -> bool {
        self.value < 0.0
    }
}

impl<S: Into<SourceId>> From<(f64, Time, S)> for NeuralSignal {
    fn from((value, timestamp, source): (f64, Time, S)) -> Self {
        Self::new(value, timestamp).with_source(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_sign() {
        let exc = NeuralSignal::new(1.5, Time::ZERO);
        assert!(exc.is_excitatory());
        assert!(!exc.is_inhibitory());

        let inh = NeuralSignal::new(-2.0, Time::ZERO);
        assert!(inh.is_inhibitory());
    }

    #[test]
    fn test_signal_builders() {
        let sig = NeuralSignal::new(1.0, Time::from_millis(5))
            .with_source("src-1")
            .with_synapse("syn-7")
            .with_neurotransmitter(NeurotransmitterKind::Glutamate);
        assert_eq!(sig.source_id.as_str(), "src-1");
        assert_eq!(sig.synapse_id.as_str(), "syn-7");
        assert_eq!(sig.neurotransmitter_kind, Some(NeurotransmitterKind::Glutamate));
    }
}
