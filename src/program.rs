//! # Program abstraction: user-supplied execution logic.
//!
//! A [`Program`] is the deterministic state machine the engine drives. The
//! engine feeds it one task batch at a time as an ordered event slice; the
//! program mutates its in-memory state and reports whether more work is
//! pending or a result is ready.
//!
//! ## Contract
//! - One logical thread of control: the engine never runs two tasks of the
//!   same execution concurrently, and never redelivers an event the program
//!   has already consumed. `on_task` takes `&mut self` to make that
//!   ownership explicit.
//! - [`TaskOutcome::Complete`] is a **proposal**, not a commit: if a signal
//!   raced the proposal, the engine discards it and calls `on_task` again
//!   with the program's retained state plus the new events. Programs must
//!   therefore be prepared to propose completion more than once.
//! - Programs must stay deterministic under replay: decisions may depend
//!   only on the delivered events and prior program state, never on wall
//!   clock, randomness, or ambient I/O.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ProgramError;
use crate::log::Event;

/// Context for one task invocation.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Id of the execution this task belongs to.
    pub execution_id: Arc<str>,
    /// Task number, 1-based and contiguous per execution.
    pub task_number: u64,
}

/// What the program decided after consuming one task's event batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// More work pending: wait for further events.
    Continue,
    /// Propose completion with this result. Not yet durable; the engine
    /// commits it only if no signal is pending ahead of the commit.
    Complete(String),
}

/// # Deterministic, event-driven execution logic.
///
/// Implementors receive every event of the execution exactly once, in
/// sequence order, batched per task.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use execore::{Event, EventKind, Program, ProgramError, TaskContext, TaskOutcome};
///
/// /// Completes with the payload of the first signal it receives.
/// struct AwaitSignal {
///     signal: Option<String>,
/// }
///
/// #[async_trait]
/// impl Program for AwaitSignal {
///     async fn on_task(
///         &mut self,
///         _ctx: &TaskContext,
///         events: &[Event],
///     ) -> Result<TaskOutcome, ProgramError> {
///         for ev in events {
///             if let EventKind::SignalReceived { payload, .. } = &ev.kind {
///                 self.signal = Some(payload.clone());
///             }
///         }
///         match &self.signal {
///             Some(payload) => Ok(TaskOutcome::Complete(payload.clone())),
///             None => Ok(TaskOutcome::Continue),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Program: Send + 'static {
    /// Consumes one task's event batch and advances program state.
    ///
    /// Events arrive in strictly increasing sequence order and are never
    /// redelivered. Returning an error is terminal for the execution.
    ///
    /// The invocation is bounded by the configured liveness timeout; an
    /// implementation that neither returns nor yields within the bound is a
    /// liveness violation and fails the execution.
    async fn on_task(
        &mut self,
        ctx: &TaskContext,
        events: &[Event],
    ) -> Result<TaskOutcome, ProgramError>;
}
