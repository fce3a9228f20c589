//! # Fan-out of engine events to subscribers.
//!
//! [`SubscriberSet`] hands each published event to every registered
//! [`Subscribe`]r through a bounded per-subscriber queue drained by a
//! dedicated worker task, so publishing never waits on a subscriber.
//!
//! ## Delivery semantics
//! - Within one subscriber, events arrive in publish order.
//! - Across subscribers there is no ordering relation at all: A may still be
//!   chewing on event N while B already saw N+5.
//! - A full (or closed) queue drops the event for that subscriber only and
//!   reports it with a `SubscriberOverflow` event.
//! - A panicking subscriber is reported with `SubscriberPanicked` and its
//!   worker moves on to the next event; other subscribers never notice. The
//!   panic is caught through `AssertUnwindSafe`, so a subscriber that
//!   panicked while holding one of its own locks may find that state
//!   poisoned afterwards.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use super::bus::Bus;
use super::event::EngineEvent;
use super::subscribe::Subscribe;

/// Best-effort extraction of a human-readable message from a caught panic.
pub(crate) fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(msg) = err.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = err.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<EngineEvent>>,
}

/// Owns the per-subscriber queues and worker tasks.
///
/// One worker per subscriber; queue capacity comes from
/// [`Subscribe::queue_capacity`], clamped to at least 1.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Builds the set and starts one worker per subscriber.
    ///
    /// Workers run until their queue is closed (see [`SubscriberSet::shutdown`]).
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<EngineEvent>>(cap);
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        worker_bus.publish(EngineEvent::subscriber_panicked(
                            sub.name(),
                            panic_message(panic_err.as_ref()),
                        ));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Offers one event to every subscriber queue via `try_send`.
    ///
    /// Never blocks. An event that does not fit is dropped for that
    /// subscriber and reported as `SubscriberOverflow` — except when the
    /// event itself is an overflow report, which is never re-published
    /// (otherwise a saturated queue would amplify itself).
    pub fn emit_arc(&self, event: Arc<EngineEvent>) {
        let is_overflow_evt = event.is_subscriber_overflow();

        for channel in &self.channels {
            let cause = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(EngineEvent::subscriber_overflow(channel.name, cause));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain and exit.
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}
