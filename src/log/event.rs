//! # History events: the durable record of everything an execution observed.
//!
//! An [`Event`] is one immutable entry in an execution's [`EventLog`](crate::log::EventLog).
//! Its [`EventKind`] carries the kind-specific payload (signal name + argument,
//! timer id, activity result, final result).
//!
//! ## Ordering guarantees
//! Sequence numbers are assigned at append time, start at 1, and are gapless
//! and totally ordered per execution. Once appended, an event never changes.
//!
//! ## Determinism
//! Log events carry **no wall-clock timestamp** and no other ambient data:
//! the log must be a pure function of the inputs so that replaying it from
//! sequence 0 always reconstructs identical execution state. Observability
//! events ([`EngineEvent`](crate::observe::EngineEvent)) carry timestamps
//! instead; they never feed back into program logic.

/// Classification of history events, with kind-specific payloads.
///
/// Payloads are plain `String`s; payload serialization formats are the
/// concern of the transport layer, not the ordering core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Execution started with the given input. Always sequence 1.
    Started {
        /// Caller-supplied input for the program.
        input: String,
    },

    /// An externally submitted signal was recorded.
    SignalReceived {
        /// Signal name, as chosen by the submitter.
        name: String,
        /// Signal argument.
        payload: String,
    },

    /// A timer owned by this execution fired.
    TimerFired {
        /// Identifier of the timer that fired.
        timer_id: u64,
    },

    /// An activity invoked by this execution finished.
    ActivityCompleted {
        /// Identifier of the activity invocation.
        activity_id: u64,
        /// Result produced by the activity.
        result: String,
    },

    /// An external cancellation request was recorded.
    ///
    /// Cancellation is just another event: it is subject to the identical
    /// ordering and completion-race rules as a signal. The program decides
    /// how to react to it.
    CancelRequested {
        /// Caller-supplied reason.
        reason: String,
    },

    /// The execution's result was committed. Terminal: the log is sealed
    /// after this event and no further appends are accepted.
    Completed {
        /// The committed result.
        result: String,
    },
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::Started { .. } => "started",
            EventKind::SignalReceived { .. } => "signal_received",
            EventKind::TimerFired { .. } => "timer_fired",
            EventKind::ActivityCompleted { .. } => "activity_completed",
            EventKind::CancelRequested { .. } => "cancel_requested",
            EventKind::Completed { .. } => "completed",
        }
    }

    /// True for the terminal [`EventKind::Completed`] entry.
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, EventKind::Completed { .. })
    }
}

/// One immutable entry of an execution's event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Strictly monotonic, gapless sequence number (1-based), assigned at append.
    pub seq: u64,
    /// Event classification plus kind-specific payload.
    pub kind: EventKind,
}
