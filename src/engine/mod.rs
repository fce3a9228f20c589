//! # Engine: public surface of the deterministic execution core.
//!
//! The [`Engine`] owns the observability bus, a [`SubscriberSet`], the
//! execution registry, and global configuration. It spawns one driver per
//! execution, routes externally submitted events into the right cell, and
//! exposes the await-result surface.
//!
//! ## High-level architecture
//! ```text
//! start(id, program, input)
//!   └─► Registry::get_or_spawn ──► ExecutionCell (log + state machine)
//!                                  ExecutionDriver::run() (one per id)
//!
//! submit_signal / cancel / record_* ──► cell.submit_external()
//!         (marker + append, one critical section)     │
//!                                                wakes ▼
//!                              driver: cut batch ─► program.on_task()
//!                                        ▲               │
//!                                        │          Complete(result)
//!                                   Reopened ◄── finalize() ──► Committed
//!                                                                 │
//! await_result(id) ◄──────────── watch channel ◄──────────────────┘
//! ```
//!
//! Event flow (observability): drivers and intake publish [`EngineEvent`]s
//! to the [`Bus`]; the engine's listener fans them out to subscribers.

mod cell;
mod driver;
mod registry;
mod replay;
pub(crate) mod scheduler;

pub use cell::ExecutionState;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::engine::cell::ExecutionCell;
use crate::engine::driver::ExecutionDriver;
use crate::engine::registry::Registry;
use crate::error::EngineError;
use crate::log::EventKind;
use crate::observe::{Bus, EngineEvent, EngineEventKind, Subscribe, SubscriberSet};
use crate::program::Program;

/// Handle to one execution, returned by [`Engine::start`].
pub struct ExecutionHandle {
    cell: Arc<ExecutionCell>,
}

impl ExecutionHandle {
    /// The execution's id.
    pub fn id(&self) -> Arc<str> {
        self.cell.id()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExecutionState {
        self.cell.state()
    }

    /// Resolves once the execution reaches `Completed` or `Failed`.
    ///
    /// The result reflects every signal submitted strictly before the
    /// resolving commit.
    pub async fn result(&self) -> Result<String, EngineError> {
        self.cell.await_result().await
    }
}

/// Deterministic task-execution engine: ordering, delivery, and the
/// completion race, for any number of independent executions.
///
/// Executions are fully isolated from each other: tasks of different
/// executions run in parallel with no shared mutable state, while each
/// execution has a single logical thread of control.
pub struct Engine {
    cfg: EngineConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    registry: Arc<Registry>,
    runtime_token: CancellationToken,
}

impl Engine {
    /// Creates an engine with the given config and subscribers.
    ///
    /// Must be called within a tokio runtime: subscriber workers and the
    /// bus listener are spawned immediately.
    pub fn new(cfg: EngineConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        let engine = Self {
            cfg,
            bus,
            subs,
            registry: Registry::new(),
            runtime_token: CancellationToken::new(),
        };
        engine.spawn_subscriber_listener();
        engine
    }

    /// Starts an execution, or returns a handle to the one already running.
    ///
    /// Idempotent on repeated identical `execution_id`: only the first call
    /// spawns a driver; later calls drop the offered program and return a
    /// handle to the existing execution (terminal ones included).
    pub async fn start(
        &self,
        execution_id: impl Into<String>,
        program: Box<dyn Program>,
        input: impl Into<String>,
    ) -> ExecutionHandle {
        let id = execution_id.into();
        let input = input.into();
        let bus = self.bus.clone();
        let liveness = self.cfg.liveness_bound();
        let runtime_token = &self.runtime_token;

        let (cell, created) = self
            .registry
            .get_or_spawn(&id, move |id| {
                let cell = Arc::new(ExecutionCell::new(id, input));
                let token = runtime_token.child_token();
                let driver = ExecutionDriver::new(Arc::clone(&cell), program, bus, liveness);
                let join = tokio::spawn(driver.run(token.clone()));
                (cell, join, token)
            })
            .await;

        if created {
            self.bus.publish(
                EngineEvent::now(EngineEventKind::ExecutionStarted).with_execution(cell.id()),
            );
        }
        ExecutionHandle { cell }
    }

    /// Submits a signal to a running execution.
    ///
    /// May be called from any number of external callers at any time,
    /// including while a task is executing or a completion is being
    /// finalized; it never blocks on program progress. A signal accepted
    /// before the `Completed` event is durably appended is guaranteed to be
    /// observed by the program before the execution finishes.
    pub async fn submit_signal(
        &self,
        execution_id: &str,
        name: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        let cell = self.lookup(execution_id).await?;
        let seq = cell.submit_external(EventKind::SignalReceived {
            name: name.clone(),
            payload: payload.into(),
        })?;
        self.bus.publish(
            EngineEvent::now(EngineEventKind::SignalAccepted)
                .with_execution(cell.id())
                .with_appended_seq(seq)
                .with_reason(name),
        );
        Ok(())
    }

    /// Requests cancellation of an execution.
    ///
    /// Cancellation is modeled as another event: it is subject to the
    /// identical ordering and race-resolution rules as a signal, and the
    /// program decides how to wind down.
    pub async fn cancel(
        &self,
        execution_id: &str,
        reason: impl Into<String>,
    ) -> Result<(), EngineError> {
        let cell = self.lookup(execution_id).await?;
        cell.submit_external(EventKind::CancelRequested {
            reason: reason.into(),
        })?;
        Ok(())
    }

    /// Records that a timer owned by the execution fired.
    pub async fn record_timer_fired(
        &self,
        execution_id: &str,
        timer_id: u64,
    ) -> Result<(), EngineError> {
        let cell = self.lookup(execution_id).await?;
        cell.submit_external(EventKind::TimerFired { timer_id })?;
        Ok(())
    }

    /// Records the result of an activity invoked by the execution.
    pub async fn record_activity_completed(
        &self,
        execution_id: &str,
        activity_id: u64,
        result: impl Into<String>,
    ) -> Result<(), EngineError> {
        let cell = self.lookup(execution_id).await?;
        cell.submit_external(EventKind::ActivityCompleted {
            activity_id,
            result: result.into(),
        })?;
        Ok(())
    }

    /// Resolves once the execution reaches `Completed` or `Failed`.
    pub async fn await_result(&self, execution_id: &str) -> Result<String, EngineError> {
        let cell = self.lookup(execution_id).await?;
        cell.await_result().await
    }

    /// Replays the execution's recorded log through a fresh program instance
    /// and checks that it reproduces the committed result.
    ///
    /// Returns [`EngineError::NondeterminismDetected`] on divergence. An
    /// execution without a committed result verifies vacuously.
    pub async fn verify_replay(
        &self,
        execution_id: &str,
        program: &mut dyn Program,
    ) -> Result<(), EngineError> {
        let cell = self.lookup(execution_id).await?;
        let (log, boundaries) = cell.replay_inputs();
        replay::verify(execution_id, &log, &boundaries, program).await
    }

    /// Shuts the engine down: cancels every driver at its next safe point
    /// and waits for them to exit.
    ///
    /// Executions that have not reached a terminal state are left as-is;
    /// their logs can be replayed by a future engine instance.
    pub async fn shutdown(&self) {
        self.bus
            .publish(EngineEvent::now(EngineEventKind::ShutdownRequested));
        self.runtime_token.cancel();
        self.registry.cancel_all().await;
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    fn spawn_subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let token = self.runtime_token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit_arc(Arc::new(ev)),
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            }
        });
    }

    async fn lookup(&self, execution_id: &str) -> Result<Arc<ExecutionCell>, EngineError> {
        self.registry
            .get(execution_id)
            .await
            .ok_or_else(|| EngineError::ExecutionNotFound {
                id: execution_id.to_string(),
            })
    }
}
