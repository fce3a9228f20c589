//! # Observability: lifecycle events, broadcast bus, subscriber fan-out.
//!
//! Everything in this module is fire-and-forget instrumentation. The durable
//! record of an execution is its event log; nothing here feeds back into
//! program logic, so losing observability events (lag, overflow) never
//! affects correctness.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                      Subscriber side:
//!   driver 1 ──┐
//!   driver 2 ──┼──► Bus ──► engine listener ──► SubscriberSet
//!   intake   ──┤  (broadcast)                  ┌─────┼─────┐
//!   engine   ──┘                               ▼     ▼     ▼
//!                                           [queue][queue][queue]
//!                                              │     │     │
//!                                           worker worker worker
//!                                              │     │     │
//!                                        sub.on_event(&EngineEvent)
//! ```

mod bus;
mod event;
#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

pub use bus::Bus;
pub use event::{EngineEvent, EngineEventKind};
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub(crate) use set::panic_message;
pub use subscribe::Subscribe;
