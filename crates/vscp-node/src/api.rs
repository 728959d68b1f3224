//! Host-facing collaborator contracts consumed by the node core.
//!
//! The core never touches hardware. Every side effect goes through one of
//! these traits, implemented by the embedding firmware or by test doubles.

use crate::message::{RxEvent, TxEvent};
use crate::timer::TimerId;
use crate::NodeFault;

/// Byte-addressed non-volatile storage.
pub trait PersistentStore {
    /// Reads one byte.
    fn read8(&mut self, addr: u16) -> u8;

    /// Writes one byte.
    fn write8(&mut self, addr: u16, value: u8);

    /// Fills `buf` from consecutive addresses starting at `addr`.
    fn read_multiple(&mut self, addr: u16, buf: &mut [u8]) {
        let mut cursor = addr;
        for byte in buf.iter_mut() {
            *byte = self.read8(cursor);
            cursor = cursor.wrapping_add(1);
        }
    }

    /// Writes `bytes` to consecutive addresses starting at `addr`.
    fn write_multiple(&mut self, addr: u16, bytes: &[u8]) {
        let mut cursor = addr;
        for byte in bytes {
            self.write8(cursor, *byte);
            cursor = cursor.wrapping_add(1);
        }
    }
}

/// Frame-level transport to the segment.
pub trait Transport {
    /// Returns the next pending event, if any. Must not block.
    fn read_message(&mut self) -> Option<RxEvent>;

    /// Queues an event for sending. Returns `false` when the frame was not accepted.
    fn write_message(&mut self, event: &TxEvent) -> bool;
}

/// Logical one-shot timer slots.
pub trait TimerService {
    /// Allocates a slot, or `None` when exhausted.
    fn create(&mut self) -> Option<TimerId>;

    /// (Re)starts a slot with a timeout in milliseconds.
    fn start(&mut self, id: TimerId, timeout_ms: u32);

    /// Stops a slot; stopping an idle slot is a no-op.
    fn stop(&mut self, id: TimerId);

    /// `true` while the slot is counting down.
    fn is_running(&self, id: TimerId) -> bool;

    /// Advances software-driven timers. Hardware-backed services ignore it.
    fn advance(&mut self, _elapsed_ms: u32) {}
}

/// Indicator lamp states driven by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum LampState {
    /// Lamp dark: no nickname and no discovery in progress.
    #[default]
    Off,
    /// Lamp lit: node active with a nickname.
    On,
    /// Lamp blinking: nickname discovery in progress.
    Blink,
}

/// Notifications the node raises towards the host firmware.
pub trait NodeHooks {
    /// Drives the indicator lamp.
    fn set_lamp(&mut self, _state: LampState) {}

    /// The node performed a protocol-level reset.
    fn on_reset(&mut self) {}

    /// The node entered the idle state and will not restart by itself.
    fn on_idle(&mut self) {}

    /// The node entered the error state. Fires once per fault.
    fn on_error(&mut self, _fault: NodeFault) {}

    /// A validated boot-loader handoff was requested.
    fn on_bootloader_request(&mut self, _algorithm: u8) {}

    /// Restore persistent storage to factory defaults.
    fn restore_factory_defaults(&mut self) {}

    /// Application-class event received while active.
    fn provide_event(&mut self, _event: &RxEvent) {}
}

/// Page-relative registers owned by the application.
pub trait ApplicationRegisters {
    /// Reads an application register.
    fn read_app_register(&mut self, _page: u16, _offset: u8) -> u8 {
        0
    }

    /// Writes an application register and returns the read-back value.
    fn write_app_register(&mut self, page: u16, offset: u8, _value: u8) -> u8 {
        self.read_app_register(page, offset)
    }
}

/// Executes decision matrix actions.
pub trait ActionExecutor {
    /// Runs `action` with `param`, triggered by `event`.
    fn execute(&mut self, action: u8, param: u8, event: &RxEvent);
}

/// Everything the node needs from the application side.
pub trait Application: NodeHooks + ApplicationRegisters + ActionExecutor {}

impl<T: NodeHooks + ApplicationRegisters + ActionExecutor> Application for T {}
