use crate::dmng::RuleAction;
use crate::error::NodeFault;

/// Node lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum NodeState {
    /// Start-up pending; the next `process()` announces or starts discovery.
    #[default]
    Init,
    /// Probing for a free nickname.
    NicknameDiscovery,
    /// Nickname held, events are processed.
    Active,
    /// Parked until `restart()`; incoming events are drained.
    Idle,
    /// Unrecoverable fault; inert until the node is rebuilt.
    Error(NodeFault),
    /// Control handed to the boot loader; inert.
    BootloaderHandoff,
}

impl NodeState {
    /// Returns the fault of the error state.
    #[must_use]
    pub const fn fault(self) -> Option<NodeFault> {
        match self {
            Self::Error(fault) => Some(fault),
            Self::Init
            | Self::NicknameDiscovery
            | Self::Active
            | Self::Idle
            | Self::BootloaderHandoff => None,
        }
    }

    /// `true` for states in which `process()` does nothing.
    #[must_use]
    pub const fn is_inert(self) -> bool {
        matches!(self, Self::Error(_) | Self::BootloaderHandoff)
    }
}

/// What one `process()` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Node is in an inert state.
    Inert,
    /// Start-up ran: announcement or first probe sent.
    Started,
    /// No event was pending.
    NoEvent,
    /// An event was read and deliberately not acted on.
    Ignored,
    /// A `CLASS1.PROTOCOL` event was handled; carries its type byte.
    Protocol(u8),
    /// An application event went through the decision matrices.
    Application {
        /// Classic decision matrix actions fired.
        dm_actions: usize,
        /// DM-NG action fired, if any.
        dmng: Option<RuleAction>,
    },
}
