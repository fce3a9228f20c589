//! # Task scheduling: cutting batches of newly visible events.
//!
//! A task is one atomic batch of appended-but-undelivered events. The cut
//! takes **all** currently undelivered events, not one event per task: the
//! program must observe everything accumulated up to the scheduling instant
//! as a single input, so that two executions fed the identical event log
//! always produce identical task boundaries regardless of timing jitter in
//! signal arrival.
//!
//! ## Rules
//! - The cut runs inside the cell lock; a concurrent append lands either
//!   wholly inside the batch (it happened before the lock was taken) or
//!   strictly after it (next batch). Never dropped, never duplicated.
//! - Batch ranges of consecutive tasks are adjacent and strictly ascending:
//!   every event is delivered to exactly one task, in sequence order.
//! - The cut clears the pending-signal marker once the batch covers it and
//!   records the boundary for replay verification.

use crate::engine::cell::CellInner;
use crate::log::Event;

/// One atomic batch of events handed to the program.
///
/// A contiguous slice of the event log bounded by a start sequence number
/// (exclusive) and an end sequence number (inclusive), captured atomically
/// at scheduling time. Created, consumed exactly once, and discarded.
#[derive(Debug, Clone)]
pub(crate) struct TaskBatch {
    /// Task number, 1-based and contiguous per execution.
    pub(crate) number: u64,
    /// Last sequence number delivered by the previous task (0 for task 1).
    pub(crate) start_exclusive: u64,
    /// Highest sequence number included in this batch.
    pub(crate) end_inclusive: u64,
    /// The events in `(start_exclusive, end_inclusive]`, in sequence order.
    pub(crate) events: Vec<Event>,
}

/// Cuts the next batch from the cell, or `None` when the program is caught up.
///
/// Must be called with the cell lock held (takes `&mut CellInner`).
pub(crate) fn cut(inner: &mut CellInner) -> Option<TaskBatch> {
    let end = inner.log.last_seq();
    if end <= inner.delivered_seq {
        return None;
    }
    let start = inner.delivered_seq;
    let events: Vec<Event> = inner.log.read_from(start).cloned().collect();

    inner.delivered_seq = end;
    if inner.pending_external.is_some_and(|seq| seq <= end) {
        inner.pending_external = None;
    }
    inner.task_counter += 1;
    inner.boundaries.push((start, end));

    Some(TaskBatch {
        number: inner.task_counter,
        start_exclusive: start,
        end_inclusive: end,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::EventKind;

    fn inner_with_signals(count: usize) -> CellInner {
        let mut inner = CellInner::new("input".to_string());
        for i in 0..count {
            inner
                .log
                .append(EventKind::SignalReceived {
                    name: format!("sig-{i}"),
                    payload: String::new(),
                })
                .unwrap();
        }
        inner
    }

    #[test]
    fn test_cut_batches_all_undelivered_events() {
        let mut inner = inner_with_signals(2);
        let batch = cut(&mut inner).expect("three undelivered events");

        assert_eq!(batch.number, 1);
        assert_eq!(batch.start_exclusive, 0);
        assert_eq!(batch.end_inclusive, 3);
        let seqs: Vec<u64> = batch.events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_cut_returns_none_when_caught_up() {
        let mut inner = inner_with_signals(0);
        assert!(cut(&mut inner).is_some());
        assert!(cut(&mut inner).is_none());
        assert_eq!(inner.task_counter, 1);
    }

    #[test]
    fn test_consecutive_batches_are_adjacent_and_ascending() {
        let mut inner = inner_with_signals(1);
        let first = cut(&mut inner).unwrap();

        inner
            .log
            .append(EventKind::TimerFired { timer_id: 7 })
            .unwrap();
        inner
            .log
            .append(EventKind::ActivityCompleted {
                activity_id: 3,
                result: "ok".to_string(),
            })
            .unwrap();
        let second = cut(&mut inner).unwrap();

        // Every event in the first range precedes every event in the second.
        assert_eq!(second.start_exclusive, first.end_inclusive);
        assert!(first.end_inclusive < second.events[0].seq);
        assert_eq!(second.number, first.number + 1);
        assert_eq!(inner.boundaries, vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn test_cut_clears_pending_marker_only_when_covered() {
        let mut inner = inner_with_signals(0);
        // Marker points one past the log: an append that began but whose
        // event is not yet in this cut's range.
        inner.pending_external = Some(inner.log.last_seq() + 1);
        cut(&mut inner).unwrap();
        assert_eq!(inner.pending_external, Some(2));

        inner
            .log
            .append(EventKind::SignalReceived {
                name: "sig".to_string(),
                payload: String::new(),
            })
            .unwrap();
        cut(&mut inner).unwrap();
        assert_eq!(inner.pending_external, None);
    }
}
