//! Coalesced redraw scheduling.
//!
//! Scene edits arrive far faster than frames need to be produced. The
//! scheduler collapses any burst of invalidations into a single pending
//! ticket; whoever drives the render loop takes the ticket, renders, then
//! reports completion. A ticket taken before a newer invalidation is stale
//! and its completion is ignored.

/// Identifies one scheduled redraw. Monotonic per scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RedrawTicket(u64);

#[derive(Debug, Default)]
pub struct RedrawScheduler {
    next: u64,
    pending: Option<RedrawTicket>,
    in_flight: Option<RedrawTicket>,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a redraw. Repeated calls while one is already pending
    /// coalesce into the newest ticket.
    pub fn invalidate(&mut self) -> RedrawTicket {
        self.next += 1;
        let ticket = RedrawTicket(self.next);
        self.pending = Some(ticket);
        ticket
    }

    /// Takes the pending ticket to start rendering, if any.
    pub fn take(&mut self) -> Option<RedrawTicket> {
        let ticket = self.pending.take()?;
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Reports a finished render. Returns true when the ticket was current;
    /// false means a newer invalidation superseded it and the produced frame
    /// should be discarded.
    pub fn complete(&mut self, ticket: RedrawTicket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
        }
        self.pending.is_none() && ticket.0 == self.next
    }

    /// Drops any pending work without rendering.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
