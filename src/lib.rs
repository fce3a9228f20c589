//! # execore
//!
//! **Deterministic, replay-based task-execution core** — append-only event
//! logs, atomic task batching, and a completion finalizer that makes the
//! signal-vs-completion race unlosable.
//!
//! ## What it does
//!
//! - Runs user [`Program`]s as single-threaded-per-execution event consumers
//! - Records every input in a gapless, append-only [`EventLog`]
//! - Batches newly appended events into tasks, delivered exactly once, in order
//! - Resolves the completion race: a signal accepted before the result is
//!   durable always forces a follow-up task instead of being dropped
//! - Verifies determinism by replaying recorded logs through fresh programs
//! - Bounds each task with a liveness watchdog ([`EngineConfig`])
//! - Publishes lifecycle events to pluggable [`Subscribe`]rs via a broadcast bus
//!
//! ## Architecture
//!
//! ```text
//! callers                         engine                        program
//! ───────                         ──────                        ───────
//! submit_signal ──┐
//! cancel ─────────┼─► intake ──► EventLog (seq 1..N, gapless)
//! record_* ───────┘      │            │
//!                 marker set          ├─► scheduler: cut batch ──► on_task()
//!                 before append       │        (all undelivered)      │
//!                        │            │                          Continue /
//!                        └────────────┼──────────┐               Complete(r)
//!                                     │          ▼                    │
//!                                     │     finalizer ◄───────────────┘
//!                                     │     marker or new events?
//!                                     │       yes → discard, follow-up task
//!                                     │       no  → append Completed, seal
//!                                     ▼
//! await_result ◄───────────── committed result
//! ```
//!
//! ## Rules
//!
//! - **Total order**: events of one execution are totally ordered by sequence
//!   number; programs observe them exactly once, in that order.
//! - **One logical thread**: tasks of the same execution never overlap;
//!   different executions run fully in parallel.
//! - **Completion is a proposal**: the engine commits it only when no signal
//!   is pending ahead of the commit. A discarded proposal is normal control
//!   flow, not an error.
//! - **Determinism**: log events carry no wall-clock data; replaying a log
//!   through a fresh program must reproduce the committed result, else
//!   [`EngineError::NondeterminismDetected`].
//! - **Liveness**: a task that neither yields nor completes within the
//!   configured bound fails the execution. Never retried.
//!
//! ## Quick start
//!
//! ```no_run
//! use async_trait::async_trait;
//! use execore::{
//!     Engine, EngineConfig, Event, EventKind, Program, ProgramError, TaskContext, TaskOutcome,
//! };
//!
//! /// Echoes the first non-empty signal payload back as the result.
//! struct Echo {
//!     payload: Option<String>,
//! }
//!
//! #[async_trait]
//! impl Program for Echo {
//!     async fn on_task(
//!         &mut self,
//!         _ctx: &TaskContext,
//!         events: &[Event],
//!     ) -> Result<TaskOutcome, ProgramError> {
//!         for ev in events {
//!             if let EventKind::SignalReceived { payload, .. } = &ev.kind {
//!                 self.payload = Some(payload.clone());
//!             }
//!         }
//!         match &self.payload {
//!             Some(p) => Ok(TaskOutcome::Complete(p.clone())),
//!             None => Ok(TaskOutcome::Continue),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), execore::EngineError> {
//!     let engine = Engine::new(EngineConfig::default(), Vec::new());
//!
//!     engine
//!         .start("echo-1", Box::new(Echo { payload: None }), "")
//!         .await;
//!     engine.submit_signal("echo-1", "greeting", "hello").await?;
//!
//!     let result = engine.await_result("echo-1").await?;
//!     assert_eq!(result, "hello");
//!
//!     engine.shutdown().await;
//!     Ok(())
//! }
//! ```

mod config;
mod engine;
mod error;
mod log;
mod observe;
mod program;

pub use config::EngineConfig;
pub use engine::{Engine, ExecutionHandle, ExecutionState};
pub use error::{EngineError, ProgramError};
pub use log::{Event, EventKind, EventLog, LogSealed};
pub use program::{Program, TaskContext, TaskOutcome};

pub use observe::{Bus, EngineEvent, EngineEventKind, Subscribe, SubscriberSet};

#[cfg(feature = "logging")]
pub use observe::LogWriter;
