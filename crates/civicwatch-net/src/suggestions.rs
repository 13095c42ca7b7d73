//! Stale-response discarding for place suggestions.
//!
//! Every search the caller starts takes a ticket carrying a sequence
//! number. A response is applied only if its ticket is still the latest
//! one issued; anything older resolved out of order and is dropped.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SuggestionTicket(u64);

#[derive(Debug, Default)]
pub struct SuggestionTracker {
    latest: u64,
}

impl SuggestionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request; every previously issued ticket becomes stale.
    pub fn issue(&mut self) -> SuggestionTicket {
        self.latest += 1;
        SuggestionTicket(self.latest)
    }

    pub fn is_current(&self, ticket: SuggestionTicket) -> bool {
        ticket.0 == self.latest
    }

    /// Hand back `value` only if `ticket` is still the latest one.
    pub fn accept<T>(&self, ticket: SuggestionTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!(ticket = ticket.0, latest = self.latest, "Discarding stale suggestions");
            None
        }
    }

    /// Make every outstanding ticket stale without starting a request.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}
