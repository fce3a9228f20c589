//! # Append-only event log, the sole durable artifact of an execution.
//!
//! [`EventLog`] assigns gapless, strictly increasing sequence numbers at
//! append time and seals itself once a [`EventKind::Completed`] entry lands:
//! any later append is rejected with [`LogSealed`].
//!
//! ## Serialization point
//! The log itself is not internally synchronized. It lives inside the
//! per-execution cell, whose lock is the single serialization point shared
//! by appends, batch cuts, and the completion check. Using one lock for all
//! three is what makes the completion race untearable.

use thiserror::Error;

use super::event::{Event, EventKind};

/// Append was rejected because the log already contains a `Completed` event.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("event log is sealed: execution already completed")]
pub struct LogSealed;

/// Append-only, strictly ordered record of one execution's events.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Appends an event, assigning the next sequence number.
    ///
    /// Sequence numbers start at 1 and never have gaps. Fails with
    /// [`LogSealed`] once the log contains a `Completed` entry.
    pub fn append(&mut self, kind: EventKind) -> Result<u64, LogSealed> {
        if self.is_sealed() {
            return Err(LogSealed);
        }
        let seq = self.events.len() as u64 + 1;
        self.events.push(Event { seq, kind });
        Ok(seq)
    }

    /// Returns an ordered iterator over events with `seq > from_seq`.
    ///
    /// Lazy, finite, and restartable from any valid sequence number:
    /// `read_from(0)` replays the whole log.
    pub fn read_from(&self, from_seq: u64) -> impl Iterator<Item = &Event> {
        let start = (from_seq as usize).min(self.events.len());
        self.events[start..].iter()
    }

    /// Sequence number of the most recently appended event (0 when empty).
    #[inline]
    pub fn last_seq(&self) -> u64 {
        self.events.len() as u64
    }

    /// True once a `Completed` event has been appended.
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.events.last().is_some_and(|e| e.kind.is_completed())
    }

    /// The committed result, if the log is sealed.
    pub fn committed_result(&self) -> Option<&str> {
        match &self.events.last()?.kind {
            EventKind::Completed { result } => Some(result),
            _ => None,
        }
    }

    /// Clones the full log contents, for replay.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.clone()
    }
}
