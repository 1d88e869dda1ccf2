//! Session discovery poller.
//!
//! While the participant is in networked mode without a selected session,
//! the listing of joinable sessions is refreshed on a fixed interval. The
//! poller owns a virtual timer (the next due instant) that the client's tick
//! drives; [`Discovery::stop`] releases it. A stopped poller issues no
//! requests and drops late responses.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

use gambit_proto::SessionId;
use tracing::{debug, warn};

/// Session listing poller.
#[derive(Debug, Clone)]
pub struct Discovery<I> {
    interval: Duration,
    next_due: Option<I>,
    sessions: Vec<SessionId>,
}

impl<I> Discovery<I>
where
    I: Copy + Ord + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Create a stopped poller.
    pub fn new(interval: Duration) -> Self {
        Self { interval, next_due: None, sessions: Vec::new() }
    }

    /// Timer is armed.
    pub fn is_polling(&self) -> bool {
        self.next_due.is_some()
    }

    /// Last successfully fetched listing.
    pub fn sessions(&self) -> &[SessionId] {
        &self.sessions
    }

    /// Arm the timer. Returns `true` when a listing request should be issued
    /// right away; starting an already running poller does nothing.
    pub fn start(&mut self, now: I) -> bool {
        if self.is_polling() {
            return false;
        }
        debug!(interval = ?self.interval, "session discovery started");
        self.next_due = Some(now + self.interval);
        true
    }

    /// Release the timer and forget the advertised sessions. Returns `false`
    /// if the poller was already stopped.
    pub fn stop(&mut self) -> bool {
        self.sessions.clear();
        if self.next_due.take().is_some() {
            debug!("session discovery stopped");
            true
        } else {
            false
        }
    }

    /// Returns `true` when a listing request is due, re-arming the timer.
    pub fn tick(&mut self, now: I) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            },
            _ => false,
        }
    }

    /// Fold in a listing response. Failures keep the previous listing.
    /// Returns `true` if the advertised set changed.
    pub fn on_listing(&mut self, result: Result<Vec<SessionId>, String>) -> bool {
        if !self.is_polling() {
            debug!("dropping listing that arrived after discovery stopped");
            return false;
        }
        match result {
            Ok(sessions) => {
                let changed = sessions != self.sessions;
                self.sessions = sessions;
                changed
            },
            Err(error) => {
                warn!(%error, "failed to fetch joinable sessions");
                false
            },
        }
    }
}
