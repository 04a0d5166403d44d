use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::session::SessionManager;

/// Identifies one issued query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    epoch: u64,
}

/// Drops responses that were overtaken by a newer query or outlived the
/// session they were requested under. Nothing is cancelled; late results are
/// simply discarded when they arrive.
pub struct LatestOnly {
    latest: AtomicU64,
    session: Arc<SessionManager>,
}

impl LatestOnly {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            latest: AtomicU64::new(0),
            session,
        }
    }

    /// Call right before sending a query.
    pub fn issue(&self) -> Ticket {
        Ticket {
            seq: self.latest.fetch_add(1, Ordering::SeqCst) + 1,
            epoch: self.session.epoch(),
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.seq == self.latest.load(Ordering::SeqCst) && ticket.epoch == self.session.epoch()
    }

    /// Returns the value only if `ticket` is still the newest one.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            log::debug!("discarding superseded response #{}", ticket.seq);
            None
        }
    }
}
