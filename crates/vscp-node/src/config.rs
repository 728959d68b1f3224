//! Immutable per-node configuration.

use crate::dm::{EXTENSION_ROW_LEN, ROW_LEN};
use crate::error::ConfigError;
use crate::message::PRIORITY_LOWEST;

/// Bytes in the page-relative window (`0x00..=0x7F`) of every page.
pub const PAGE_WINDOW_LEN: usize = 0x80;

/// Bytes reserved for the MDF URL in the standard register space.
pub const MDF_URL_LEN: usize = 32;

/// Boot loader algorithm value meaning "no boot loader present".
pub const BOOT_LOADER_NONE: u8 = 0xFF;

/// Default nickname probe timeout.
pub const DEFAULT_PROBE_TIMEOUT_MS: u32 = 500;
/// Default wait for a nickname assignment after the master acknowledged a probe.
pub const DEFAULT_ASSIGNMENT_TIMEOUT_MS: u32 = 5_000;
/// Default node heartbeat period.
pub const DEFAULT_HEARTBEAT_PERIOD_MS: u32 = 1_000;
/// Default multi-frame reassembly timeout.
pub const DEFAULT_MULTI_FRAME_TIMEOUT_MS: u32 = 1_000;
/// Window between the two restore-defaults register writes.
pub const RESTORE_DEFAULTS_WINDOW_MS: u32 = 1_000;

/// Default classic decision matrix row count.
pub const DEFAULT_DM_ROWS: u8 = 6;
/// Default register page holding the classic decision matrix.
pub const DEFAULT_DM_PAGE: u16 = 1;
/// Default register page holding the DM-NG ruleset.
pub const DEFAULT_DMNG_PAGE: u16 = 2;
/// Default DM-NG ruleset capacity in bytes.
pub const DEFAULT_DMNG_CAPACITY: u8 = 64;

/// Identity, layout and timing parameters of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NodeConfig {
    /// Manufacturer device id (registers `0x89..=0x8C`).
    pub manufacturer_device_id: u32,
    /// Manufacturer sub device id (registers `0x8D..=0x90`).
    pub manufacturer_sub_device_id: u32,
    /// Firmware major version.
    pub firmware_major: u8,
    /// Firmware minor version.
    pub firmware_minor: u8,
    /// Firmware sub-minor version.
    pub firmware_sub_minor: u8,
    /// Boot loader algorithm, [`BOOT_LOADER_NONE`] when absent.
    pub boot_loader_algorithm: u8,
    /// Standard device family code.
    pub family_code: u32,
    /// Standard device type.
    pub device_type: u32,
    /// Firmware device code.
    pub firmware_device_code: u16,
    /// Number of register pages the node exposes.
    pub pages_used: u8,
    /// Module description file URL, without scheme, at most 32 bytes.
    pub mdf_url: String,
    /// Zone reported in heartbeats and matched by the decision matrix.
    pub zone: u8,
    /// Sub-zone reported in heartbeats and matched by the decision matrix.
    pub sub_zone: u8,
    /// Classic decision matrix rows.
    pub dm_rows: u8,
    /// Page hosting the classic decision matrix.
    pub dm_page: u16,
    /// Enables DM-NG evaluation.
    pub dmng_enabled: bool,
    /// Page hosting the DM-NG ruleset.
    pub dmng_page: u16,
    /// DM-NG ruleset capacity in bytes.
    pub dmng_capacity: u8,
    /// Node heartbeat period, `0` disables heartbeats.
    pub heartbeat_period_ms: u32,
    /// Wait for a probe answer before trying the next candidate.
    pub probe_timeout_ms: u32,
    /// Wait for `SET_NICKNAME_ID` once the segment master acknowledged a probe.
    pub assignment_timeout_ms: u32,
    /// Timeout between frames of a multi-frame command.
    pub multi_frame_timeout_ms: u32,
    /// Marks node-originated frames as coming from a hard-coded address.
    pub hard_coded: bool,
    /// Priority of node-originated frames.
    pub priority: u8,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            manufacturer_device_id: 0,
            manufacturer_sub_device_id: 0,
            firmware_major: 1,
            firmware_minor: 0,
            firmware_sub_minor: 0,
            boot_loader_algorithm: BOOT_LOADER_NONE,
            family_code: 0,
            device_type: 0,
            firmware_device_code: 0,
            pages_used: 3,
            mdf_url: String::new(),
            zone: 0,
            sub_zone: 0,
            dm_rows: DEFAULT_DM_ROWS,
            dm_page: DEFAULT_DM_PAGE,
            dmng_enabled: false,
            dmng_page: DEFAULT_DMNG_PAGE,
            dmng_capacity: DEFAULT_DMNG_CAPACITY,
            heartbeat_period_ms: DEFAULT_HEARTBEAT_PERIOD_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            assignment_timeout_ms: DEFAULT_ASSIGNMENT_TIMEOUT_MS,
            multi_frame_timeout_ms: DEFAULT_MULTI_FRAME_TIMEOUT_MS,
            hard_coded: false,
            priority: crate::message::PRIORITY_NORMAL,
        }
    }
}

impl NodeConfig {
    /// Checks that the layout fits the register space and the timing is usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mdf_url.len() > MDF_URL_LEN {
            return Err(ConfigError::MdfUrlTooLong {
                len: self.mdf_url.len(),
            });
        }
        if self.dm_page == 0 {
            return Err(ConfigError::PageConflict {
                page: 0,
                what: "decision matrix",
            });
        }
        if self.dmng_page == 0 || self.dmng_page == self.dm_page {
            return Err(ConfigError::PageConflict {
                page: self.dmng_page,
                what: "dm-ng ruleset",
            });
        }
        let dm_bytes = self.dm_window_len();
        if dm_bytes > PAGE_WINDOW_LEN {
            return Err(ConfigError::TooManyRows {
                rows: self.dm_rows,
                bytes: dm_bytes,
            });
        }
        if usize::from(self.dmng_capacity) > PAGE_WINDOW_LEN {
            return Err(ConfigError::RulesetTooLarge {
                capacity: self.dmng_capacity,
            });
        }
        if self.priority > PRIORITY_LOWEST {
            return Err(ConfigError::InvalidPriority {
                priority: self.priority,
            });
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::ZeroProbeTimeout);
        }
        Ok(())
    }

    /// Bytes of the DM page occupied by rows plus extension rows.
    #[must_use]
    pub fn dm_window_len(&self) -> usize {
        usize::from(self.dm_rows) * (ROW_LEN + EXTENSION_ROW_LEN)
    }

    /// MDF URL as the 32 zero-padded register bytes.
    #[must_use]
    pub fn mdf_bytes(&self) -> [u8; MDF_URL_LEN] {
        let mut out = [0; MDF_URL_LEN];
        let src = self.mdf_url.as_bytes();
        let len = src.len().min(MDF_URL_LEN);
        out[..len].copy_from_slice(&src[..len]);
        out
    }
}
