//! Register space: standard block, matrix pages and paged framing.

pub mod access;
pub mod map;
pub mod paging;

pub use access::{be_byte, page_bytes, read_be_u16, read_be_u32};
pub use map::{
    decode_standard, RegisterAccess, RegisterLayout, RegisterTarget, StandardRegister,
    StandardSlot, STANDARD_REGISTERS, STANDARD_START,
};
pub use paging::{
    clamp_count, frame_chunks, page_span, EXTENDED_FRAME_VALUES, FRAME_VALUES, PAGE_LEN,
};

/// VSCP protocol major version reported in register `0x81`.
pub const VSCP_VERSION_MAJOR: u8 = 1;
/// VSCP protocol minor version reported in register `0x82`.
pub const VSCP_VERSION_MINOR: u8 = 6;
/// Level I receive buffer size reported in register `0x98`.
pub const BUFFER_SIZE: u8 = 8;

/// First value of the restore-defaults sequence.
pub const RESTORE_DEFAULTS_ARM: u8 = 0x55;
/// Second value of the restore-defaults sequence.
pub const RESTORE_DEFAULTS_CONFIRM: u8 = 0xAA;
