//! Centralized, bounded, thread-safe priority scheduler for timed deliveries.
//!
//! Replaces a task-per-outbound-signal model with one shared min-heap keyed
//! by `(delivery_time asc, priority desc)`. A single `parking_lot::Mutex`
//! guards the heap; deliveries run outside the lock so a slow or panicking
//! target cannot stall other producers scheduling new work.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use nc_types::{NeuralSignal, SynapseId, Time};

/// Receiver of a delivered signal. Implementors must tolerate being called
/// from the scheduler's delivery loop on any thread.
pub trait SignalTarget: Send + Sync {
    /// Accept a delivered signal. Must not block indefinitely.
    fn receive(&self, signal: NeuralSignal);
}

/// A signal queued for future delivery.
pub struct ScheduledSignal {
    /// The signal to deliver.
    pub signal: NeuralSignal,
    /// When it should be delivered.
    pub delivery_time: Time,
    /// Delivery target. `None` is a valid, silently-skipped entry.
    pub target: Option<Arc<dyn SignalTarget>>,
    /// Synapse the signal travelled through.
    pub synapse_id: SynapseId,
    /// Tie-break priority; higher delivers first among equal `delivery_time`.
    pub priority: i32,
}

impl ScheduledSignal {
    /// Build an entry with priority 0 and no synapse attribution.
    pub fn new(signal: NeuralSignal, delivery_time: Time, target: Option<Arc<dyn SignalTarget>>) -> Self {
        Self {
            signal,
            delivery_time,
            target,
            synapse_id: SynapseId::empty(),
            priority: 0,
        }
    }

    /// Builder-style priority override.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Builder-style synapse attribution.
    pub fn with_synapse_id(mut self, synapse_id: SynapseId) -> Self {
        self.synapse_id = synapse_id;
        self
    }
}

struct HeapEntry {
    delivery_time: Time,
    priority: i32,
    seq: u64,
    entry: ScheduledSignal,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.delivery_time == other.delivery_time && self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; "greater" must mean "should pop first".
        other
            .delivery_time
            .cmp(&self.delivery_time) // earlier delivery_time pops first
            .then_with(|| self.priority.cmp(&other.priority)) // higher priority pops first on ties
            .then_with(|| other.seq.cmp(&self.seq)) // FIFO among exact ties
    }
}

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerStats {
    /// Entries currently queued.
    pub queue_len: usize,
    /// Delivery time of the next due entry, if any.
    pub next_delivery_time: Option<Time>,
    /// Total entries ever accepted by `schedule`.
    pub scheduled_total: u64,
    /// Total entries ever delivered by `process_due`.
    pub delivered_total: u64,
    /// Total entries rejected for capacity.
    pub dropped_total: u64,
    /// Average delivery latency (now - delivery_time at the moment of delivery), nanoseconds.
    pub avg_latency_ns: u64,
}

struct SchedulerInner {
    heap: BinaryHeap<HeapEntry>,
    next_seq: u64,
    scheduled_total: u64,
    delivered_total: u64,
    dropped_total: u64,
    total_latency_ns: u128,
}

/// Bounded, thread-safe priority queue of timed signal deliveries.
pub struct SignalScheduler {
    inner: Mutex<SchedulerInner>,
    capacity: usize,
}

impl SignalScheduler {
    /// Build a scheduler with the given maximum queue length.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(SchedulerInner {
                heap: BinaryHeap::new(),
                next_seq: 0,
                scheduled_total: 0,
                delivered_total: 0,
                dropped_total: 0,
                total_latency_ns: 0,
            }),
            capacity,
        }
    }

    /// Enqueue an entry. Returns `false` (and increments the dropped counter)
    /// if the queue is already at capacity.
    pub fn schedule(&self, entry: ScheduledSignal) -> bool {
        let mut inner = self.inner.lock();
        if inner.heap.len() >= self.capacity {
            inner.dropped_total += 1;
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(HeapEntry {
            delivery_time: entry.delivery_time,
            priority: entry.priority,
            seq,
            entry,
        });
        inner.scheduled_total += 1;
        true
    }

    /// Pop and deliver every entry whose `delivery_time <= now`.
    ///
    /// A target that panics during `receive` is caught; the delivery loop
    /// continues with the remaining entries.
    pub fn process_due(&self, now: Time) -> usize {
        let due = {
            let mut inner = self.inner.lock();
            let mut due = Vec::new();
            while let Some(top) = inner.heap.peek() {
                if top.entry.delivery_time.as_nanos() > now.as_nanos() {
                    break;
                }
                due.push(inner.heap.pop().expect("peeked Some").entry);
            }
            due
        };

        let mut delivered = 0usize;
        for entry in due {
            let latency_ns = now.saturating_since(entry.delivery_time);
            if let Some(target) = entry.target {
                let signal = entry.signal;
                if catch_unwind(AssertUnwindSafe(|| target.receive(signal))).is_err() {
                    log::warn!("signal delivery target panicked during receive; continuing");
                }
            }
            delivered += 1;
            let mut inner = self.inner.lock();
            inner.delivered_total += 1;
            inner.total_latency_ns += latency_ns as u128;
        }
        delivered
    }

    /// Current counters.
    pub fn stats(&self) -> SchedulerStats {
        let inner = self.inner.lock();
        let avg_latency_ns = if inner.delivered_total > 0 {
            (inner.total_latency_ns / inner.delivered_total as u128) as u64
        } else {
            0
        };
        SchedulerStats {
            queue_len: inner.heap.len(),
            next_delivery_time: inner.heap.peek().map(|e| e.delivery_time),
            scheduled_total: inner.scheduled_total,
            delivered_total: inner.delivered_total,
            dropped_total: inner.dropped_total,
            avg_latency_ns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as StdMutex;

    struct RecordingTarget {
        received: StdMutex<Vec<f64>>,
    }

    impl SignalTarget for RecordingTarget {
        fn receive(&self, signal: NeuralSignal) {
            self.received.lock().push(signal.value);
        }
    }

    struct PanickingTarget;
    impl SignalTarget for PanickingTarget {
        fn receive(&self, _signal: NeuralSignal) {
            panic!("boom");
        }
    }

    #[test]
    fn test_capacity_boundary() {
        let scheduler = SignalScheduler::new(2);
        let t = Time::from_millis(1);
        assert!(scheduler.schedule(ScheduledSignal::new(NeuralSignal::new(1.0, t), t, None)));
        assert!(scheduler.schedule(ScheduledSignal::new(NeuralSignal::new(2.0, t), t, None)));
        assert!(!scheduler.schedule(ScheduledSignal::new(NeuralSignal::new(3.0, t), t, None)));
        assert_eq!(scheduler.stats().dropped_total, 1);
    }

    #[test]
    fn test_scheduler_chronology_scenario() {
        let target = Arc::new(RecordingTarget {
            received: StdMutex::new(Vec::new()),
        });
        let scheduler = SignalScheduler::new(16);
        let t0 = Time::from_millis(0);

        let entries = [
            (10u64, 1.0, 0i32),
            (5u64, 2.0, 0i32),
            (15u64, 3.0, 2i32),
            (10u64, 4.0, 5i32),
        ];
        for (offset_ms, value, priority) in entries {
            let delivery_time = Time::from_millis(offset_ms);
            scheduler.schedule(
                ScheduledSignal::new(
                    NeuralSignal::new(value, delivery_time),
                    delivery_time,
                    Some(target.clone() as Arc<dyn SignalTarget>),
                )
                .with_priority(priority),
            );
        }

        let delivered = scheduler.process_due(Time::from_millis(20));
        assert_eq!(delivered, 4);
        assert_eq!(*target.received.lock(), vec![2.0, 4.0, 1.0, 3.0]);
        let _ = t0;
    }

    #[test]
    fn test_delivery_at_exact_now_is_delivered() {
        let scheduler = SignalScheduler::new(4);
        let t = Time::from_millis(10);
        scheduler.schedule(ScheduledSignal::new(NeuralSignal::new(1.0, t), t, None));
        assert_eq!(scheduler.process_due(t), 1);
    }

    #[test]
    fn test_panicking_target_does_not_abort_loop() {
        let bad = Arc::new(PanickingTarget);
        let good = Arc::new(RecordingTarget {
            received: StdMutex::new(Vec::new()),
        });
        let scheduler = SignalScheduler::new(4);
        let t = Time::from_millis(1);
        scheduler.schedule(ScheduledSignal::new(
            NeuralSignal::new(1.0, t),
            t,
            Some(bad as Arc<dyn SignalTarget>),
        ));
        scheduler.schedule(ScheduledSignal::new(
            NeuralSignal::new(2.0, t),
            t,
            Some(good.clone() as Arc<dyn SignalTarget>),
        ));
        let delivered = scheduler.process_due(t);
        assert_eq!(delivered, 2);
        assert_eq!(*good.received.lock(), vec![2.0]);
    }

    #[test]
    fn test_nil_target_pops_silently() {
        let scheduler = SignalScheduler::new(4);
        let t = Time::from_millis(1);
        scheduler.schedule(ScheduledSignal::new(NeuralSignal::new(1.0, t), t, None));
        assert_eq!(scheduler.process_due(t), 1);
        assert_eq!(scheduler.stats().queue_len, 0);
    }
}
