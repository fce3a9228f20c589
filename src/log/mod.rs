//! # Event log: append-only history of one execution.
//!
//! The log is the sole durable artifact of the engine. Replaying it from
//! sequence 0 through any task boundary reconstructs identical execution
//! state, which is what makes the design testable.

mod event;
mod store;

pub use event::{Event, EventKind};
pub use store::{EventLog, LogSealed};
