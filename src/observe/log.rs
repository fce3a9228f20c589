//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints engine events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [execution-started] execution=order-17
//! [signal-accepted] execution=order-17 name="approve" seq=2
//! [task-dispatched] execution=order-17 task=1 range=(0,1]
//! [completion-deferred] execution=order-17 task=1
//! [completion-committed] execution=order-17 task=2 seq=3
//! [liveness-timeout] execution=order-17 task=1 timeout_ms=1000
//! ```

use async_trait::async_trait;

use super::event::{EngineEvent, EngineEventKind};
use super::subscribe::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &EngineEvent) {
        match e.kind {
            EngineEventKind::ExecutionStarted => {
                println!("[execution-started] execution={:?}", e.execution);
            }
            EngineEventKind::SignalAccepted => {
                println!(
                    "[signal-accepted] execution={:?} name={:?} seq={:?}",
                    e.execution, e.reason, e.last_seq
                );
            }
            EngineEventKind::TaskDispatched => {
                println!(
                    "[task-dispatched] execution={:?} task={:?} range=({:?},{:?}]",
                    e.execution, e.task, e.first_seq, e.last_seq
                );
            }
            EngineEventKind::CompletionCommitted => {
                println!(
                    "[completion-committed] execution={:?} task={:?} seq={:?}",
                    e.execution, e.task, e.last_seq
                );
            }
            EngineEventKind::CompletionDeferred => {
                println!(
                    "[completion-deferred] execution={:?} task={:?}",
                    e.execution, e.task
                );
            }
            EngineEventKind::LivenessTimeout => {
                println!(
                    "[liveness-timeout] execution={:?} task={:?} timeout_ms={:?}",
                    e.execution, e.task, e.timeout_ms
                );
            }
            EngineEventKind::ExecutionFailed => {
                println!(
                    "[execution-failed] execution={:?} task={:?} err={:?}",
                    e.execution, e.task, e.reason
                );
            }
            EngineEventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EngineEventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] {:?}", e.reason);
            }
            EngineEventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] {:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
