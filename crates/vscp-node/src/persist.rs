//! Persisted node identity layout and an in-memory store.

use crate::api::PersistentStore;
use crate::dm::{EXTENSION_ROW_LEN, ROW_LEN};

/// Bytes in a node GUID.
pub const GUID_LEN: usize = 16;
/// Bytes in the user id block.
pub const USER_ID_LEN: usize = 5;

/// Address of the GUID (MSB first).
pub const ADDR_GUID: u16 = 0x00;
/// Address of the nickname byte.
pub const ADDR_NICKNAME: u16 = 0x10;
/// Address of the node control flags.
pub const ADDR_NODE_CONTROL: u16 = 0x11;
/// Address of the last seen segment controller CRC.
pub const ADDR_SEGMENT_CRC: u16 = 0x12;
/// Address of the user id block.
pub const ADDR_USER_ID: u16 = 0x13;
/// Address of the first classic decision matrix row.
pub const ADDR_DM_BASE: u16 = 0x18;

/// Addresses of the variable-size areas for one row count and ruleset capacity.
///
/// Fixed identity fields come first, then classic rows, extension rows and the
/// DM-NG blob, packed without gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersistentLayout {
    dm_rows: u8,
    dmng_capacity: u8,
}

impl PersistentLayout {
    /// Builds the layout.
    #[must_use]
    pub const fn new(dm_rows: u8, dmng_capacity: u8) -> Self {
        Self {
            dm_rows,
            dmng_capacity,
        }
    }

    /// Configured classic row count.
    #[must_use]
    pub const fn dm_rows(&self) -> u8 {
        self.dm_rows
    }

    /// Configured DM-NG capacity.
    #[must_use]
    pub const fn dmng_capacity(&self) -> u8 {
        self.dmng_capacity
    }

    /// Address of classic row `row`.
    #[must_use]
    pub const fn dm_row(&self, row: u8) -> u16 {
        ADDR_DM_BASE + row as u16 * ROW_LEN as u16
    }

    /// Address of the first extension row.
    #[must_use]
    pub const fn extension_base(&self) -> u16 {
        self.dm_row(self.dm_rows)
    }

    /// Address of extension row `row`.
    #[must_use]
    pub const fn extension_row(&self, row: u8) -> u16 {
        self.extension_base() + row as u16 * EXTENSION_ROW_LEN as u16
    }

    /// Address of the DM-NG ruleset.
    #[must_use]
    pub const fn dmng_base(&self) -> u16 {
        self.extension_row(self.dm_rows)
    }

    /// First address past the layout; the minimum store size.
    #[must_use]
    pub const fn end(&self) -> u16 {
        self.dmng_base() + self.dmng_capacity as u16
    }
}

/// Byte store kept in RAM.
///
/// Addresses past the end read as erased (`0xFF`) and ignore writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamStore {
    bytes: Vec<u8>,
}

impl RamStore {
    /// Store of `size` erased bytes (`0xFF`), as fresh flash or EEPROM reads.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0xFF; size],
        }
    }

    /// Store of `size` zero bytes.
    #[must_use]
    pub fn zeroed(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// Store sized for `layout` as a freshly provisioned node: `guid` written,
    /// decision matrix rows zeroed (disabled), everything else erased.
    #[must_use]
    pub fn for_layout(layout: &PersistentLayout, guid: &[u8; GUID_LEN]) -> Self {
        let mut store = Self::new(usize::from(layout.end()));
        store.write_multiple(ADDR_GUID, guid);
        let dm_start = usize::from(layout.dm_row(0));
        let dm_end = usize::from(layout.dmng_base());
        store.bytes[dm_start..dm_end].fill(0);
        store
    }

    /// Raw contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PersistentStore for RamStore {
    fn read8(&mut self, addr: u16) -> u8 {
        self.bytes.get(usize::from(addr)).copied().unwrap_or(0xFF)
    }

    fn write8(&mut self, addr: u16, value: u8) {
        if let Some(byte) = self.bytes.get_mut(usize::from(addr)) {
            *byte = value;
        }
    }
}
