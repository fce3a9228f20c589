//! Error types used by the execution engine and user programs.
//!
//! This module defines two main error types:
//!
//! - [`EngineError`] — the full error taxonomy surfaced by the engine API.
//! - [`ProgramError`] — an unrecoverable error raised by user program logic.
//!
//! [`EngineError`] provides [`as_label`](EngineError::as_label) for
//! logging/metrics. All variants are `Clone` so a terminal outcome can be
//! stored in a watch channel and handed to every waiter.
//!
//! A discarded completion proposal is **not** an error: it is a normal
//! control-flow outcome of the completion race and never appears here.

use std::time::Duration;
use thiserror::Error;

/// # Errors surfaced by the engine API.
///
/// Exactly these kinds (plus a committed result) are ever returned from the
/// await-result interface.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The execution id is unknown to this engine. Caller error, surfaced immediately.
    #[error("execution not found: {id}")]
    ExecutionNotFound {
        /// The id the caller used.
        id: String,
    },

    /// A signal (or other external event) arrived after the log was sealed.
    /// Surfaced to the submitter, never retried internally.
    #[error("execution already completed: {id}")]
    ExecutionAlreadyCompleted {
        /// The target execution id.
        id: String,
    },

    /// A task ran past the configured liveness bound without yielding or
    /// completing. Fatal: the execution is `Failed` and no further tasks run.
    #[error("liveness violation: task {task} exceeded {timeout:?}")]
    LivenessViolation {
        /// Task number (1-based, per execution) that violated the bound.
        task: u64,
        /// The configured bound that was exceeded.
        timeout: Duration,
    },

    /// Replay produced a different decision than the original run.
    /// Fatal, surfaced, never silently resolved.
    #[error("nondeterminism detected: {detail}")]
    NondeterminismDetected {
        /// What diverged.
        detail: String,
    },

    /// User program logic raised an unrecoverable error. Terminal.
    #[error("program failed: {error}")]
    ProgramFailed {
        /// The underlying error message.
        error: String,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use execore::EngineError;
    ///
    /// let err = EngineError::ExecutionNotFound { id: "demo".into() };
    /// assert_eq!(err.as_label(), "execution_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::ExecutionNotFound { .. } => "execution_not_found",
            EngineError::ExecutionAlreadyCompleted { .. } => "execution_already_completed",
            EngineError::LivenessViolation { .. } => "liveness_violation",
            EngineError::NondeterminismDetected { .. } => "nondeterminism_detected",
            EngineError::ProgramFailed { .. } => "program_failed",
        }
    }

    /// True for errors that terminate the execution (`Failed` state).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::LivenessViolation { .. }
                | EngineError::NondeterminismDetected { .. }
                | EngineError::ProgramFailed { .. }
        )
    }
}

/// # Unrecoverable error raised by user program logic.
///
/// Returned from [`Program::on_task`](crate::Program::on_task); the engine
/// marks the execution `Failed` and schedules no further tasks.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ProgramError {
    /// Human-readable failure description.
    pub message: String,
}

impl ProgramError {
    /// Creates a program error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ProgramError> for EngineError {
    fn from(err: ProgramError) -> Self {
        EngineError::ProgramFailed { error: err.message }
    }
}
