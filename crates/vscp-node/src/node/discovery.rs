//! Nickname discovery bookkeeping.

use crate::protocol::{NICKNAME_MAX, NICKNAME_SEGMENT_MASTER};

/// Candidates that can be acknowledged before the node gives up.
pub const CANDIDATES: u16 = NICKNAME_MAX as u16;

/// What a `PROBE_ACK` for the current candidate means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The segment master answered; wait for an assignment.
    MasterPresent,
    /// The candidate is taken; probe the next one.
    Taken,
    /// Every candidate is taken.
    Exhausted,
}

/// Candidate tracking for one discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovery {
    candidate: u8,
    acked_in_a_row: u16,
    awaiting_assignment: bool,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Discovery {
    /// Starts at the segment master address.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            candidate: NICKNAME_SEGMENT_MASTER,
            acked_in_a_row: 0,
            awaiting_assignment: false,
        }
    }

    /// Nickname currently probed.
    #[must_use]
    pub const fn candidate(&self) -> u8 {
        self.candidate
    }

    /// `true` after the master acknowledged and before assignment or timeout.
    #[must_use]
    pub const fn awaiting_assignment(&self) -> bool {
        self.awaiting_assignment
    }

    /// Consecutive candidates found taken.
    #[must_use]
    pub const fn acked_in_a_row(&self) -> u16 {
        self.acked_in_a_row
    }

    /// Moves to the next candidate, wrapping within `1..=254`.
    pub fn advance(&mut self) {
        self.candidate = if self.candidate >= NICKNAME_MAX {
            1
        } else {
            self.candidate + 1
        };
        self.awaiting_assignment = false;
    }

    /// Timer expired without an answer.
    pub fn on_timeout(&mut self) {
        self.acked_in_a_row = 0;
        self.advance();
    }

    /// The current candidate was acknowledged.
    pub fn on_ack(&mut self) -> AckOutcome {
        if self.candidate == NICKNAME_SEGMENT_MASTER {
            self.awaiting_assignment = true;
            return AckOutcome::MasterPresent;
        }
        self.acked_in_a_row += 1;
        if self.acked_in_a_row >= CANDIDATES {
            return AckOutcome::Exhausted;
        }
        self.advance();
        AckOutcome::Taken
    }

    /// `true` when `requested` addresses this node during discovery.
    #[must_use]
    pub const fn addresses_us(&self, requested: u8) -> bool {
        requested == crate::protocol::NICKNAME_UNINITIALIZED || requested == self.candidate
    }
}
