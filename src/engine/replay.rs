//! # Replay verification: the determinism check.
//!
//! Replaying an execution's event log from sequence 0 through the recorded
//! task boundaries with a fresh program instance must reproduce the same
//! decisions the original run made. Divergence is
//! [`NondeterminismDetected`](crate::EngineError::NondeterminismDetected):
//! fatal, surfaced, never silently resolved.
//!
//! ## What is compared
//! The replayed program's final proposal must be `Complete` with exactly the
//! committed result. Proposals at non-final boundaries are allowed either
//! way: in the original run such a proposal was discarded by the finalizer
//! (a raced signal forced a follow-up task), which leaves no trace in the
//! log, so both `Continue` and a discarded `Complete` are consistent with
//! the record.

use std::sync::Arc;

use crate::error::EngineError;
use crate::log::{Event, EventKind};
use crate::program::{Program, TaskContext, TaskOutcome};

/// Replays `log` through the recorded `boundaries` with a fresh program and
/// checks the outcome against the committed result.
///
/// An execution without a committed result has nothing to verify yet;
/// verification succeeds vacuously.
pub(crate) async fn verify(
    id: &str,
    log: &[Event],
    boundaries: &[(u64, u64)],
    program: &mut dyn Program,
) -> Result<(), EngineError> {
    let committed = log.last().and_then(|e| match &e.kind {
        EventKind::Completed { result } => Some(result.clone()),
        _ => None,
    });
    let Some(committed) = committed else {
        return Ok(());
    };

    let execution_id: Arc<str> = Arc::from(id);
    let mut last_outcome = TaskOutcome::Continue;

    for (task_index, &(start, end)) in boundaries.iter().enumerate() {
        let task_number = task_index as u64 + 1;
        let batch: Vec<Event> = log
            .iter()
            .filter(|e| e.seq > start && e.seq <= end)
            .cloned()
            .collect();
        let ctx = TaskContext {
            execution_id: Arc::clone(&execution_id),
            task_number,
        };

        last_outcome = match program.on_task(&ctx, &batch).await {
            Ok(outcome) => outcome,
            Err(err) => {
                return Err(EngineError::NondeterminismDetected {
                    detail: format!(
                        "program failed during replay of task {task_number}: {err}"
                    ),
                })
            }
        };
    }

    match last_outcome {
        TaskOutcome::Complete(replayed) if replayed == committed => Ok(()),
        TaskOutcome::Complete(replayed) => Err(EngineError::NondeterminismDetected {
            detail: format!(
                "replayed result {replayed:?} differs from committed result {committed:?}"
            ),
        }),
        TaskOutcome::Continue => Err(EngineError::NondeterminismDetected {
            detail: "replay of the final task proposed no completion".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProgramError;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Replays a fixed script of outcomes, one per task.
    struct Scripted {
        outcomes: VecDeque<TaskOutcome>,
    }

    impl Scripted {
        fn new(outcomes: Vec<TaskOutcome>) -> Self {
            Self {
                outcomes: outcomes.into(),
            }
        }
    }

    #[async_trait]
    impl Program for Scripted {
        async fn on_task(
            &mut self,
            _ctx: &TaskContext,
            _events: &[Event],
        ) -> Result<TaskOutcome, ProgramError> {
            self.outcomes
                .pop_front()
                .ok_or_else(|| ProgramError::new("script exhausted"))
        }
    }

    fn committed_log() -> (Vec<Event>, Vec<(u64, u64)>) {
        let log = vec![
            Event {
                seq: 1,
                kind: EventKind::Started {
                    input: String::new(),
                },
            },
            Event {
                seq: 2,
                kind: EventKind::SignalReceived {
                    name: "sig".to_string(),
                    payload: "ok".to_string(),
                },
            },
            Event {
                seq: 3,
                kind: EventKind::Completed {
                    result: "ok".to_string(),
                },
            },
        ];
        let boundaries = vec![(0, 1), (1, 2)];
        (log, boundaries)
    }

    #[tokio::test]
    async fn test_replay_matching_result_passes() {
        let (log, boundaries) = committed_log();
        // A proposal discarded at task 1 is consistent with the record.
        let mut program = Scripted::new(vec![
            TaskOutcome::Complete(String::new()),
            TaskOutcome::Complete("ok".to_string()),
        ]);
        verify("r", &log, &boundaries, &mut program).await.unwrap();
    }

    #[tokio::test]
    async fn test_replay_divergent_result_is_nondeterminism() {
        let (log, boundaries) = committed_log();
        let mut program = Scripted::new(vec![
            TaskOutcome::Continue,
            TaskOutcome::Complete("different".to_string()),
        ]);
        let err = verify("r", &log, &boundaries, &mut program)
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "nondeterminism_detected");
    }

    #[tokio::test]
    async fn test_replay_missing_final_proposal_is_nondeterminism() {
        let (log, boundaries) = committed_log();
        let mut program = Scripted::new(vec![TaskOutcome::Continue, TaskOutcome::Continue]);
        let err = verify("r", &log, &boundaries, &mut program)
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "nondeterminism_detected");
    }

    #[tokio::test]
    async fn test_replay_of_uncommitted_execution_is_vacuous() {
        let log = vec![Event {
            seq: 1,
            kind: EventKind::Started {
                input: String::new(),
            },
        }];
        let mut program = Scripted::new(vec![]);
        verify("r", &log, &[(0, 1)], &mut program).await.unwrap();
    }
}
