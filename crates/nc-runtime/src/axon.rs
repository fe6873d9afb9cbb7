//! Per-neuron axonal delivery: a bounded outbound queue with graceful
//! degradation, offered as an alternative to routing every delayed output
//! back through the shared [`crate::scheduler::SignalScheduler`].
//!
//! Unlike the scheduler, this is exclusively owned by one neuron, so there is
//! no contention to design around beyond the queue itself.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use parking_lot::Mutex;

use nc_types::Time;

use crate::scheduler::{ScheduledSignal, SignalTarget};

/// Configuration for an axonal delivery worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxonConfig {
    /// Maximum number of entries buffered before falling back to immediate delivery.
    pub capacity: usize,
    /// Suggested driver tick period, microseconds. Informational; enforced by the caller's loop.
    pub tick_resolution_us: u64,
}

impl Default for AxonConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            tick_resolution_us: 100,
        }
    }
}

/// What happened to an entry passed to [`AxonalDeliveryWorker::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Buffered for delivery at its `delivery_time`.
    Queued,
    /// The queue was full; delivered synchronously instead of being dropped.
    DeliveredImmediately,
}

/// Delivery counters for the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxonStats {
    /// Entries currently buffered.
    pub queue_len: usize,
    /// Entries delivered on a `tick`.
    pub delivered_total: u64,
    /// Entries delivered immediately because the queue was full.
    pub immediate_fallback_total: u64,
}

struct AxonState {
    queue: VecDeque<ScheduledSignal>,
    delivered_total: u64,
    immediate_fallback_total: u64,
}

/// Bounded per-neuron outbound delivery queue with a graceful-degradation fallback.
pub struct AxonalDeliveryWorker {
    state: Mutex<AxonState>,
    capacity: usize,
    shutting_down: AtomicBool,
}

impl AxonalDeliveryWorker {
    /// Build a worker with the given configuration.
    pub fn new(config: AxonConfig) -> Self {
        Self {
            state: Mutex::new(AxonState {
                queue: VecDeque::new(),
                delivered_total: 0,
                immediate_fallback_total: 0,
            }),
            capacity: config.capacity,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Buffer an entry, or deliver it synchronously if the queue is already at capacity.
    pub fn enqueue(&self, entry: ScheduledSignal) -> EnqueueOutcome {
        if self.shutting_down.load(AtomicOrdering::Acquire) {
            deliver(&entry);
            return EnqueueOutcome::DeliveredImmediately;
        }
        let mut state = self.state.lock();
        if state.queue.len() >= self.capacity {
            state.immediate_fallback_total += 1;
            drop(state);
            deliver(&entry);
            return EnqueueOutcome::DeliveredImmediately;
        }
        state.queue.push_back(entry);
        EnqueueOutcome::Queued
    }

    /// Deliver every buffered entry whose `delivery_time <= now`.
    pub fn tick(&self, now: Time) -> usize {
        let due = {
            let mut state = self.state.lock();
            let mut due = Vec::new();
            let mut remaining = VecDeque::with_capacity(state.queue.len());
            for entry in state.queue.drain(..) {
                if entry.delivery_time.as_nanos() <= now.as_nanos() {
                    due.push(entry);
                } else {
                    remaining.push_back(entry);
                }
            }
            state.queue = remaining;
            due
        };

        let count = due.len();
        for entry in &due {
            deliver(entry);
        }
        self.state.lock().delivered_total += count as u64;
        count
    }

    /// Drain and deliver every remaining entry regardless of `delivery_time`,
    /// then stop accepting new work. Idempotent.
    pub fn shutdown(&self) -> usize {
        self.shutting_down.store(true, AtomicOrdering::Release);
        let due = {
            let mut state = self.state.lock();
            state.queue.drain(..).collect::<Vec<_>>()
        };
        let count = due.len();
        for entry in &due {
            deliver(entry);
        }
        self.state.lock().delivered_total += count as u64;
        count
    }

    /// Current counters.
    pub fn stats(&self) -> AxonStats {
        let state = self.state.lock();
        AxonStats {
            queue_len: state.queue.len(),
            delivered_total: state.delivered_total,
            immediate_fallback_total: state.immediate_fallback_total,
        }
    }
}

fn deliver(entry: &ScheduledSignal) {
    if let Some(target) = entry.target.as_ref() {
        let signal = entry.signal.clone();
        let target: &dyn SignalTarget = target.as_ref();
        if catch_unwind(AssertUnwindSafe(|| target.receive(signal))).is_err() {
            log::warn!("axonal delivery target panicked during receive; continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex as StdMutex;

    use nc_types::NeuralSignal;

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
    fn test_enqueue_then_tick_delivers() {
        let worker = AxonalDeliveryWorker::new(AxonConfig::default());
        let target = Arc::new(RecordingTarget {
            received: StdMutex::new(Vec::new()),
        });
        let t = Time::from_millis(5);
        let outcome = worker.enqueue(ScheduledSignal::new(
            NeuralSignal::new(1.0, t),
            t,
            Some(target.clone() as Arc<dyn SignalTarget>),
        ));
        assert_eq!(outcome, EnqueueOutcome::Queued);
        assert_eq!(worker.tick(t), 1);
        assert_eq!(*target.received.lock(), vec![1.0]);
    }

    #[test]
    fn test_overflow_falls_back_to_immediate_delivery() {
        let worker = AxonalDeliveryWorker::new(AxonConfig {
            capacity: 1,
            ..AxonConfig::default()
        });
        let target = Arc::new(RecordingTarget {
            received: StdMutex::new(Vec::new()),
        });
        let t = Time::from_millis(100);
        worker.enqueue(ScheduledSignal::new(
            NeuralSignal::new(1.0, t),
            t,
            Some(target.clone() as Arc<dyn SignalTarget>),
        ));
        let outcome = worker.enqueue(ScheduledSignal::new(
            NeuralSignal::new(2.0, t),
            t,
            Some(target.clone() as Arc<dyn SignalTarget>),
        ));
        assert_eq!(outcome, EnqueueOutcome::DeliveredImmediately);
        assert_eq!(*target.received.lock(), vec![2.0]);
        assert_eq!(worker.stats().immediate_fallback_total, 1);
    }

    #[test]
    fn test_shutdown_drains_future_entries() {
        let worker = AxonalDeliveryWorker::new(AxonConfig::default());
        let target = Arc::new(RecordingTarget {
            received: StdMutex::new(Vec::new()),
        });
        let far_future = Time::from_millis(1_000_000);
        worker.enqueue(ScheduledSignal::new(
            NeuralSignal::new(1.0, far_future),
            far_future,
            Some(target.clone() as Arc<dyn SignalTarget>),
        ));
        let drained = worker.shutdown();
        assert_eq!(drained, 1);
        assert_eq!(*target.received.lock(), vec![1.0]);
        assert_eq!(worker.stats().queue_len, 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let worker = AxonalDeliveryWorker::new(AxonConfig::default());
        assert_eq!(worker.shutdown(), 0);
        assert_eq!(worker.shutdown(), 0);
    }
}
