//! # ExecutionDriver: single-execution program loop.
//!
//! One driver task per execution. It owns the program exclusively, which is
//! what guarantees the "single logical thread of control": two tasks of the
//! same execution can never run concurrently, and the program resumes each
//! task exactly where the prior one left off.
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► cut next batch (none? wait for an append or cancellation)
//!   ├─► publish TaskDispatched
//!   ├─► run program.on_task(batch) under the liveness watchdog
//!   │       ├─ timeout      → LivenessTimeout + ExecutionFailed, exit
//!   │       ├─ panic        → ExecutionFailed, exit
//!   │       ├─ Err(program) → ExecutionFailed, exit
//!   │       ├─ Continue     → next iteration
//!   │       └─ Complete(r)  → finalize(observed_seq, r)
//!   │             ├─ Committed → CompletionCommitted, exit
//!   │             └─ Reopened  → CompletionDeferred, next iteration
//! }
//! ```
//!
//! ## Rules
//! - Cancellation is honored at **safe points** only (while waiting for
//!   events); a task that already started runs to its outcome.
//! - The watchdog bounds one task's program invocation, not the execution's
//!   overall lifetime. Expiry is fatal and never retried by the engine.
//! - A deferred completion is published as a non-failure event; the
//!   follow-up batch is cut immediately on the next iteration.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::engine::cell::{ExecutionCell, FinalizeDecision};
use crate::error::EngineError;
use crate::observe::{panic_message, Bus, EngineEvent, EngineEventKind};
use crate::program::{Program, TaskContext, TaskOutcome};

/// Drives one execution's program until commit, failure, or shutdown.
pub(crate) struct ExecutionDriver {
    cell: Arc<ExecutionCell>,
    program: Box<dyn Program>,
    bus: Bus,
    /// Liveness watchdog bound per task (`None` = watchdog disabled).
    liveness: Option<Duration>,
}

impl ExecutionDriver {
    pub(crate) fn new(
        cell: Arc<ExecutionCell>,
        program: Box<dyn Program>,
        bus: Bus,
        liveness: Option<Duration>,
    ) -> Self {
        Self {
            cell,
            program,
            bus,
            liveness,
        }
    }

    /// Runs the driver loop until a terminal state or cancellation.
    pub(crate) async fn run(mut self, runtime_token: CancellationToken) {
        loop {
            if runtime_token.is_cancelled() {
                break;
            }
            let batch = match self.cell.next_batch() {
                Some(batch) => batch,
                None => {
                    tokio::select! {
                        _ = self.cell.wait_for_events() => continue,
                        _ = runtime_token.cancelled() => break,
                    }
                }
            };

            self.bus.publish(
                EngineEvent::now(EngineEventKind::TaskDispatched)
                    .with_execution(self.cell.id())
                    .with_task(batch.number)
                    .with_range(batch.start_exclusive, batch.end_inclusive),
            );

            let ctx = TaskContext {
                execution_id: self.cell.id(),
                task_number: batch.number,
            };
            // catch_unwind: a panicking program must fail the execution like
            // a returned error, not strand it in Running forever.
            let invocation =
                AssertUnwindSafe(self.program.on_task(&ctx, &batch.events)).catch_unwind();
            let invoked = match self.liveness {
                Some(bound) => match time::timeout(bound, invocation).await {
                    Ok(invoked) => invoked,
                    Err(_elapsed) => {
                        self.bus.publish(
                            EngineEvent::now(EngineEventKind::LivenessTimeout)
                                .with_execution(self.cell.id())
                                .with_task(batch.number)
                                .with_timeout(bound),
                        );
                        self.fail_execution(
                            batch.number,
                            EngineError::LivenessViolation {
                                task: batch.number,
                                timeout: bound,
                            },
                        );
                        break;
                    }
                },
                None => invocation.await,
            };

            let outcome = match invoked {
                Ok(outcome) => outcome,
                Err(panic_err) => {
                    self.fail_execution(
                        batch.number,
                        EngineError::ProgramFailed {
                            error: format!(
                                "program panicked: {}",
                                panic_message(panic_err.as_ref())
                            ),
                        },
                    );
                    break;
                }
            };

            match outcome {
                Ok(TaskOutcome::Continue) => {}
                Ok(TaskOutcome::Complete(result)) => {
                    match self.cell.finalize(batch.end_inclusive, result) {
                        FinalizeDecision::Committed { seq } => {
                            self.bus.publish(
                                EngineEvent::now(EngineEventKind::CompletionCommitted)
                                    .with_execution(self.cell.id())
                                    .with_task(batch.number)
                                    .with_appended_seq(seq),
                            );
                            break;
                        }
                        FinalizeDecision::Reopened => {
                            self.bus.publish(
                                EngineEvent::now(EngineEventKind::CompletionDeferred)
                                    .with_execution(self.cell.id())
                                    .with_task(batch.number),
                            );
                        }
                    }
                }
                Err(program_err) => {
                    self.fail_execution(batch.number, program_err.into());
                    break;
                }
            }
        }
    }

    /// Marks the execution `Failed` and publishes the terminal event.
    fn fail_execution(&self, task: u64, err: EngineError) {
        let reason = err.to_string();
        self.cell.fail(err);
        self.bus.publish(
            EngineEvent::now(EngineEventKind::ExecutionFailed)
                .with_execution(self.cell.id())
                .with_task(task)
                .with_reason(reason),
        );
    }
}
