//! # ExecutionCell: per-execution state machine and critical section.
//!
//! The cell owns everything that must change atomically for one execution:
//! the lifecycle state, the event log, the pending-signal marker, the
//! delivery cursor, and the recorded task boundaries. One mutex guards all
//! of it, so signal intake, the batch cut, and the completion check-then-act
//! share a single serialization point — a marker set and a completion check
//! can never tear.
//!
//! ## State machine
//! ```text
//!                    ┌──────────── follow-up forced ───────────┐
//!                    ▼                                          │
//! Running ──propose──► Completing ──quiescent──► Completed (terminal)
//!    │                                          (log sealed)
//!    └── fatal error / liveness violation ────► Failed    (terminal)
//! ```
//!
//! ## Rules
//! - The lock is **never held across an `.await`**: signal intake never
//!   blocks on program progress.
//! - The pending marker is set **before** the signal's append lands and is
//!   cleared only by the batch cut that covers it — never by intake itself.
//! - `Completed` is appended in exactly one place (here, under the lock),
//!   so at most one commit can ever exist.

use std::sync::{Arc, Mutex};

use tokio::sync::{watch, Notify};

use crate::engine::scheduler::{self, TaskBatch};
use crate::error::EngineError;
use crate::log::{Event, EventKind, EventLog};

/// Lifecycle state of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Consuming events; more tasks may be scheduled.
    Running,
    /// A completion proposal is being checked against pending events.
    Completing,
    /// Result committed; the log is sealed. Terminal.
    Completed,
    /// Terminated by a fatal error. Terminal.
    Failed,
}

impl ExecutionState {
    /// True for `Completed` and `Failed`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::Failed)
    }
}

/// Outcome of a completion proposal check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FinalizeDecision {
    /// No signal raced the proposal: the result is durable.
    Committed {
        /// Sequence number of the appended `Completed` event.
        seq: u64,
    },
    /// A signal was pending or the log grew past the proposing task; the
    /// proposal is discarded and a follow-up task must deliver the new
    /// events. Normal control flow, not an error.
    Reopened,
}

/// Everything guarded by the cell lock.
pub(crate) struct CellInner {
    pub(crate) state: ExecutionState,
    pub(crate) log: EventLog,
    /// Highest sequence number already handed to the program (cursor).
    pub(crate) delivered_seq: u64,
    /// PendingSignal marker: highest externally appended sequence number not
    /// yet covered by a dispatched batch. Set the instant an external append
    /// begins; cleared by the batch cut.
    pub(crate) pending_external: Option<u64>,
    /// Number of tasks dispatched so far (task numbers are 1-based).
    pub(crate) task_counter: u64,
    /// Recorded batch boundaries `(start_exclusive, end_inclusive)`, the
    /// durable input to replay verification.
    pub(crate) boundaries: Vec<(u64, u64)>,
}

impl CellInner {
    pub(crate) fn new(input: String) -> Self {
        let mut log = EventLog::new();
        // A fresh log is never sealed.
        let _ = log.append(EventKind::Started { input });
        Self {
            state: ExecutionState::Running,
            log,
            delivered_seq: 0,
            pending_external: None,
            task_counter: 0,
            boundaries: Vec::new(),
        }
    }
}

/// Per-execution coordination point: state machine, log, wakeups, result.
///
/// Owned exclusively by the engine instance handling this execution id; the
/// driver is the only consumer of batches, external callers are the only
/// producers of signals, and both funnel through the same lock.
pub(crate) struct ExecutionCell {
    id: Arc<str>,
    inner: Mutex<CellInner>,
    /// Wakes the driver when new events are appended.
    wakeup: Notify,
    /// Terminal outcome, observed by any number of waiters. Written with
    /// `send_replace` so the value is stored even while no waiter has
    /// subscribed yet.
    result_tx: watch::Sender<Option<Result<String, EngineError>>>,
}

impl ExecutionCell {
    /// Creates a cell with the `Started` event already appended (seq 1).
    pub(crate) fn new(id: Arc<str>, input: String) -> Self {
        let (result_tx, _rx) = watch::channel(None);
        Self {
            id,
            inner: Mutex::new(CellInner::new(input)),
            wakeup: Notify::new(),
            result_tx,
        }
    }

    pub(crate) fn id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    pub(crate) fn state(&self) -> ExecutionState {
        self.inner.lock().unwrap().state
    }

    /// Records an externally submitted event (signal, timer firing, activity
    /// result, cancellation request) and wakes the driver.
    ///
    /// Sets the pending marker before the append lands, inside the same
    /// critical section the completion check uses: a signal submitted at any
    /// point before a `Completed` event is durably appended is guaranteed to
    /// be delivered into the program instead of being lost.
    ///
    /// Never blocks on program progress.
    pub(crate) fn submit_external(&self, kind: EventKind) -> Result<u64, EngineError> {
        let seq = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state.is_terminal() {
                return Err(EngineError::ExecutionAlreadyCompleted {
                    id: self.id.to_string(),
                });
            }
            // Marker first: the finalizer must see this signal from the
            // instant its append begins. Cleared by the covering batch cut.
            let next = inner.log.last_seq() + 1;
            inner.pending_external = Some(next);
            match inner.log.append(kind) {
                Ok(seq) => seq,
                // The Completed append and the state transition share this
                // lock, so a sealed log always comes with a terminal state.
                Err(_) => {
                    return Err(EngineError::ExecutionAlreadyCompleted {
                        id: self.id.to_string(),
                    })
                }
            }
        };
        self.wakeup.notify_one();
        Ok(seq)
    }

    /// Cuts the next task batch, if any events are undelivered.
    pub(crate) fn next_batch(&self) -> Option<TaskBatch> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state.is_terminal() {
            return None;
        }
        scheduler::cut(&mut inner)
    }

    /// Resolves a completion proposal: the core race.
    ///
    /// `observed_seq` is the end of the batch the proposing task consumed.
    /// Under the same lock used by intake and append:
    /// - if the pending marker is set **or** the log grew past
    ///   `observed_seq`, the proposal is discarded and the execution returns
    ///   to `Running` — the caller cuts a follow-up batch;
    /// - otherwise the `Completed` event is appended, the state becomes
    ///   terminal, and every waiter observes the result.
    pub(crate) fn finalize(&self, observed_seq: u64, result: String) -> FinalizeDecision {
        let mut inner = self.inner.lock().unwrap();
        if inner.state.is_terminal() {
            // Terminal cells never reopen and never take another append;
            // the log stays exactly as it is.
            return FinalizeDecision::Committed {
                seq: inner.log.last_seq(),
            };
        }
        inner.state = ExecutionState::Completing;

        if inner.pending_external.is_some() || inner.log.last_seq() > observed_seq {
            inner.state = ExecutionState::Running;
            return FinalizeDecision::Reopened;
        }

        match inner.log.append(EventKind::Completed {
            result: result.clone(),
        }) {
            Ok(seq) => {
                inner.state = ExecutionState::Completed;
                drop(inner);
                // send_replace, not send: a plain send is discarded when no
                // receiver exists yet, and waiters may subscribe only later.
                self.result_tx.send_replace(Some(Ok(result)));
                FinalizeDecision::Committed { seq }
            }
            // A sealed log means a commit already exists; never append a second.
            Err(_) => {
                inner.state = ExecutionState::Completed;
                FinalizeDecision::Committed {
                    seq: inner.log.last_seq(),
                }
            }
        }
    }

    /// Terminates the execution with a fatal error. No-op if already terminal.
    pub(crate) fn fail(&self, err: EngineError) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state.is_terminal() {
                return;
            }
            inner.state = ExecutionState::Failed;
        }
        self.result_tx.send_replace(Some(Err(err)));
    }

    /// Waits until new events are appended.
    ///
    /// A notification permit is stored if nobody is waiting, so an append
    /// that lands between a `next_batch` miss and this call is never lost.
    pub(crate) async fn wait_for_events(&self) {
        self.wakeup.notified().await;
    }

    /// Resolves once the execution reaches `Completed` or `Failed`.
    pub(crate) async fn await_result(&self) -> Result<String, EngineError> {
        let mut rx = self.result_tx.subscribe();
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // The sender lives in this cell; closure means the cell is
                // being dropped out from under the waiter.
                return Err(EngineError::ExecutionNotFound {
                    id: self.id.to_string(),
                });
            }
        }
    }

    /// Snapshots the log and recorded boundaries, for replay verification.
    pub(crate) fn replay_inputs(&self) -> (Vec<Event>, Vec<(u64, u64)>) {
        let inner = self.inner.lock().unwrap();
        (inner.log.snapshot(), inner.boundaries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(id: &str) -> ExecutionCell {
        ExecutionCell::new(Arc::from(id), "input".to_string())
    }

    fn signal(payload: &str) -> EventKind {
        EventKind::SignalReceived {
            name: "sig".to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_finalize_commits_when_quiescent() {
        let cell = cell("quiet");
        let batch = cell.next_batch().expect("started event undelivered");
        assert_eq!(batch.end_inclusive, 1);

        let decision = cell.finalize(batch.end_inclusive, "done".to_string());
        assert_eq!(decision, FinalizeDecision::Committed { seq: 2 });
        assert_eq!(cell.state(), ExecutionState::Completed);
        assert!(cell.next_batch().is_none());
    }

    #[test]
    fn test_finalize_reopens_on_pending_signal() {
        let cell = cell("raced");
        let batch = cell.next_batch().unwrap();

        // Signal lands while the task is (conceptually) still executing.
        cell.submit_external(signal("Signal Input")).unwrap();

        let decision = cell.finalize(batch.end_inclusive, String::new());
        assert_eq!(decision, FinalizeDecision::Reopened);
        assert_eq!(cell.state(), ExecutionState::Running);

        // The follow-up batch delivers exactly the raced signal.
        let follow_up = cell.next_batch().expect("follow-up batch");
        assert_eq!(follow_up.start_exclusive, batch.end_inclusive);
        assert_eq!(follow_up.events.len(), 1);

        let decision = cell.finalize(follow_up.end_inclusive, "Signal Input".to_string());
        assert!(matches!(decision, FinalizeDecision::Committed { .. }));
    }

    #[test]
    fn test_finalize_reopens_on_events_beyond_observed_seq() {
        let cell = cell("stale");
        let first = cell.next_batch().unwrap();
        cell.submit_external(signal("x")).unwrap();
        // A later cut cleared the marker, but the proposing task observed
        // only the first batch.
        let second = cell.next_batch().unwrap();
        assert_eq!(second.end_inclusive, 2);

        assert_eq!(
            cell.finalize(first.end_inclusive, String::new()),
            FinalizeDecision::Reopened
        );
    }

    #[test]
    fn test_at_most_one_commit() {
        let cell = cell("once");
        let batch = cell.next_batch().unwrap();
        let first = cell.finalize(batch.end_inclusive, "a".to_string());
        let second = cell.finalize(batch.end_inclusive + 1, "b".to_string());
        assert_eq!(first, FinalizeDecision::Committed { seq: 2 });
        assert_eq!(second, FinalizeDecision::Committed { seq: 2 });

        let (log, _) = cell.replay_inputs();
        let commits = log.iter().filter(|e| e.kind.is_completed()).count();
        assert_eq!(commits, 1);
    }

    #[test]
    fn test_submit_rejected_after_terminal_state() {
        let cell = cell("sealed");
        let batch = cell.next_batch().unwrap();
        cell.finalize(batch.end_inclusive, "done".to_string());

        let err = cell.submit_external(signal("late")).unwrap_err();
        assert_eq!(err.as_label(), "execution_already_completed");

        let failed = ExecutionCell::new(Arc::from("dead"), String::new());
        failed.fail(EngineError::ProgramFailed {
            error: "boom".to_string(),
        });
        let err = failed.submit_external(signal("late")).unwrap_err();
        assert_eq!(err.as_label(), "execution_already_completed");
    }

    #[test]
    fn test_finalize_on_failed_cell_does_not_resurrect() {
        let cell = cell("wrecked");
        let batch = cell.next_batch().unwrap();
        cell.fail(EngineError::ProgramFailed {
            error: "boom".to_string(),
        });

        let decision = cell.finalize(batch.end_inclusive, "late".to_string());
        assert!(matches!(decision, FinalizeDecision::Committed { .. }));
        assert_eq!(cell.state(), ExecutionState::Failed);

        // No Completed event was appended to the failed execution's log.
        let (log, _) = cell.replay_inputs();
        assert!(log.iter().all(|e| !e.kind.is_completed()));
    }

    #[tokio::test]
    async fn test_result_is_stored_before_any_waiter_subscribes() {
        let cell = cell("unwatched");
        let batch = cell.next_batch().unwrap();
        // Commit while nobody holds a receiver; the first subscription
        // happens only in await_result below.
        cell.finalize(batch.end_inclusive, "done".to_string());
        assert_eq!(cell.await_result().await.unwrap(), "done");

        let failed = ExecutionCell::new(Arc::from("unwatched-fail"), String::new());
        failed.fail(EngineError::ProgramFailed {
            error: "boom".to_string(),
        });
        let err = failed.await_result().await.unwrap_err();
        assert_eq!(err.as_label(), "program_failed");
    }

    #[tokio::test]
    async fn test_await_result_resolves_for_early_waiters() {
        let cell = Arc::new(ExecutionCell::new(Arc::from("waiters"), String::new()));
        let waiter = {
            let cell = Arc::clone(&cell);
            tokio::spawn(async move { cell.await_result().await })
        };

        let batch = cell.next_batch().unwrap();
        cell.finalize(batch.end_inclusive, "done".to_string());

        assert_eq!(waiter.await.unwrap().unwrap(), "done");
        // Late waiters see the same stored outcome.
        assert_eq!(cell.await_result().await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_fail_resolves_waiters_with_error() {
        let cell = cell("failing");
        cell.fail(EngineError::LivenessViolation {
            task: 1,
            timeout: std::time::Duration::from_secs(1),
        });
        let err = cell.await_result().await.unwrap_err();
        assert_eq!(err.as_label(), "liveness_violation");
        assert_eq!(cell.state(), ExecutionState::Failed);
    }
}
