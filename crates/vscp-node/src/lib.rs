//! Node-side VSCP Level I protocol engine.
//!
//! [`Node`] runs nickname discovery, the `CLASS1.PROTOCOL` command set, the
//! register space and both decision matrices against host-supplied storage,
//! transport and timers. Nothing here touches hardware or allocates threads.

/// Event value type and wire identifier packing.
pub mod message;
pub use message::{Event, RxEvent, TxEvent, MAX_DATA_LEN, PRIORITY_LOWEST, PRIORITY_NORMAL};

/// Error and fault taxonomy.
pub mod error;
pub use error::{ConfigError, EncodeError, MessageError, NodeFault, RuleFault, RuleFaultKind};

/// Host collaborator traits.
pub mod api;
pub use api::{
    ActionExecutor, Application, ApplicationRegisters, LampState, NodeHooks, PersistentStore,
    TimerService, Transport,
};

/// Timer identifiers, logical timer slots and a software timer service.
pub mod timer;
pub use timer::{SoftTimers, TimerBank, TimerId, TimerSlot, NODE_TIMER_COUNT};

/// Node configuration.
pub mod config;
pub use config::NodeConfig;

/// Persisted layout and an in-memory store.
pub mod persist;
pub use persist::{PersistentLayout, RamStore, GUID_LEN};

/// Traffic and rule counters.
pub mod diag;
pub use diag::NodeDiagnostics;

/// `CLASS1.PROTOCOL` numbering.
pub mod protocol;
pub use protocol::{ProtocolType, CLASS1_PROTOCOL, NICKNAME_UNINITIALIZED};

/// Standard registers and paged access.
pub mod register;
pub use register::{RegisterLayout, RegisterTarget, StandardRegister};

/// Classic decision matrix.
pub mod dm;
pub use dm::{DmFiring, DmRow, ExtensionRow, Zone};

/// Decision Matrix Next Generation.
pub mod dmng;
pub use dmng::{Condition, DmNgEngine, Rule, RuleAction};

/// Node state machine.
pub mod node;
pub use node::{Node, NodeState, ProcessOutcome};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
