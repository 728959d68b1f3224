//! Saturating node diagnostics counters.

use crate::error::RuleFault;

/// Counters the node keeps about its own traffic and rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct NodeDiagnostics {
    /// Events read from the transport.
    pub rx_events: u16,
    /// Events accepted by the transport.
    pub tx_events: u16,
    /// Events the transport refused.
    pub tx_dropped: u16,
    /// `CLASS1.PROTOCOL` events handled.
    pub protocol_events: u16,
    /// Actions fired by the classic decision matrix.
    pub dm_actions: u16,
    /// Actions fired by DM-NG.
    pub dmng_actions: u16,
    /// DM-NG rule faults observed.
    pub dmng_faults: u16,
    /// Nickname collisions detected while active.
    pub nickname_collisions: u16,
    /// Times nickname discovery was (re)started.
    pub discovery_restarts: u16,
    /// Most recent DM-NG fault.
    pub last_dmng_fault: Option<RuleFault>,
}

impl NodeDiagnostics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transmit attempt.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_tx(&mut self, accepted: bool) {
        if accepted {
            self.tx_events = self.tx_events.saturating_add(1);
        } else {
            self.tx_dropped = self.tx_dropped.saturating_add(1);
        }
    }

    /// Records a DM-NG fault.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_dmng_fault(&mut self, fault: RuleFault) {
        self.dmng_faults = self.dmng_faults.saturating_add(1);
        self.last_dmng_fault = Some(fault);
    }

    /// Clears every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Saturating `+= 1` for diagnostics counters.
pub(crate) fn bump(counter: &mut u16) {
    *counter = counter.saturating_add(1);
}
