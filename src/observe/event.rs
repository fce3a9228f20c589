//! # Lifecycle events emitted by the engine.
//!
//! The [`EngineEventKind`] enum classifies event types across three categories:
//! - **Execution lifecycle**: start, task dispatch, completion, failure
//! - **Completion race outcomes**: committed vs. deferred proposals
//! - **Subscriber plumbing**: overflow and panic reports
//!
//! These are observability events only: they are fire-and-forget, carry
//! wall-clock timestamps, and never feed back into program logic or the
//! durable event log (which must stay replay-deterministic).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for engine-event ordering.
static ENGINE_EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEventKind {
    // === Execution lifecycle ===
    /// A new execution was registered and its driver spawned.
    ///
    /// Sets: `execution`, `at`, `seq`.
    ExecutionStarted,

    /// An external signal was accepted into the event log.
    ///
    /// Sets: `execution`, `last_seq` (the appended sequence number),
    /// `reason` (signal name), `at`, `seq`.
    SignalAccepted,

    /// A task batch was cut and handed to the program.
    ///
    /// Sets: `execution`, `task`, `first_seq`/`last_seq` (the batch range,
    /// start exclusive, end inclusive), `at`, `seq`.
    TaskDispatched,

    /// The execution failed terminally (program error or liveness violation).
    ///
    /// Sets: `execution`, `task`, `reason`, `at`, `seq`.
    ExecutionFailed,

    // === Completion race outcomes ===
    /// A completion proposal was committed; the log is sealed.
    ///
    /// Sets: `execution`, `task`, `last_seq` (seq of the `Completed` event),
    /// `at`, `seq`.
    CompletionCommitted,

    /// A completion proposal was discarded because a signal was pending or
    /// the log grew past the proposing task. Normal control flow, **not** a
    /// failure: a follow-up task delivers the raced events.
    ///
    /// Sets: `execution`, `task`, `at`, `seq`.
    CompletionDeferred,

    /// A task's program invocation exceeded the liveness bound.
    ///
    /// Sets: `execution`, `task`, `timeout_ms`, `at`, `seq`.
    LivenessTimeout,

    // === Engine lifecycle ===
    /// Engine shutdown was requested; drivers stop at their next safe point.
    ///
    /// Sets: `at`, `seq`.
    ShutdownRequested,

    // === Subscriber plumbing ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (subscriber name + cause), `at`, `seq`.
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (panic info), `at`, `seq`.
    SubscriberPanicked,
}

/// Engine lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EngineEventKind`]
#[derive(Clone, Debug)]
pub struct EngineEvent {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EngineEventKind,

    /// Execution id, if applicable.
    pub execution: Option<Arc<str>>,
    /// Task number within the execution (1-based).
    pub task: Option<u64>,
    /// Start of a log-sequence range (exclusive).
    pub first_seq: Option<u64>,
    /// End of a log-sequence range (inclusive), or a single appended seq.
    pub last_seq: Option<u64>,
    /// Human-readable detail (signal name, error message, panic info).
    pub reason: Option<Arc<str>>,
    /// Liveness bound in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl EngineEvent {
    /// Creates a new event of the given kind with current timestamp and next
    /// global sequence number.
    pub fn now(kind: EngineEventKind) -> Self {
        Self {
            seq: ENGINE_EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            execution: None,
            task: None,
            first_seq: None,
            last_seq: None,
            reason: None,
            timeout_ms: None,
        }
    }

    /// Attaches an execution id.
    #[inline]
    pub fn with_execution(mut self, id: impl Into<Arc<str>>) -> Self {
        self.execution = Some(id.into());
        self
    }

    /// Attaches a task number.
    #[inline]
    pub fn with_task(mut self, number: u64) -> Self {
        self.task = Some(number);
        self
    }

    /// Attaches a log-sequence range (start exclusive, end inclusive).
    #[inline]
    pub fn with_range(mut self, start_exclusive: u64, end_inclusive: u64) -> Self {
        self.first_seq = Some(start_exclusive);
        self.last_seq = Some(end_inclusive);
        self
    }

    /// Attaches a single appended log sequence number.
    #[inline]
    pub fn with_appended_seq(mut self, seq: u64) -> Self {
        self.last_seq = Some(seq);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a liveness bound (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, cause: &'static str) -> Self {
        EngineEvent::now(EngineEventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} cause={cause}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        EngineEvent::now(EngineEventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    #[inline]
    pub(crate) fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EngineEventKind::SubscriberOverflow)
    }
}
