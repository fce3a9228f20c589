//! # Event bus for broadcasting engine lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (drivers, intake,
//! the engine itself).
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls
//!   `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all
//!   receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip
//!   `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers
//!   at send time. The durable record of an execution is its event log, not
//!   this bus.

use tokio::sync::broadcast;

use super::event::EngineEvent;

/// Broadcast channel for engine lifecycle events.
///
/// Multiple publishers can publish concurrently; subscribers receive clones
/// of each event. Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<EngineEvent>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<EngineEvent>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers, the event is dropped; the call still
    /// returns immediately.
    pub fn publish(&self, ev: EngineEvent) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// A receiver only gets events sent after it subscribes; slow receivers
    /// get `RecvError::Lagged(n)` and skip over missed items.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::event::EngineEventKind;

    #[tokio::test]
    async fn test_publish_reaches_subscriber_in_order() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(EngineEvent::now(EngineEventKind::ExecutionStarted).with_execution("e-1"));
        bus.publish(EngineEvent::now(EngineEventKind::TaskDispatched).with_execution("e-1"));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, EngineEventKind::ExecutionStarted);
        assert_eq!(second.kind, EngineEventKind::TaskDispatched);
        assert!(first.seq < second.seq);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let bus = Bus::new(1);
        // No receiver: publish must not block or panic.
        bus.publish(EngineEvent::now(EngineEventKind::ShutdownRequested));
    }
}
