//! Standard register map and page-relative address decoding.

/// First offset of the standard register block, present on every page.
///
/// Fixed by the VSCP Level I register layout; offsets below it are
/// page-relative and never standard.
pub const STANDARD_START: u8 = 0x80;

/// Access policy of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterAccess {
    /// Writes are ignored.
    ReadOnly,
    /// Reads return 0.
    WriteOnly,
    /// Read and write.
    ReadWrite,
}

impl RegisterAccess {
    /// `true` when a read returns the register content.
    #[must_use]
    pub const fn readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// `true` when a write changes the register.
    #[must_use]
    pub const fn writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Registers in the `0x80..=0xFF` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardRegister {
    /// Alarm status, cleared by reading.
    AlarmStatus,
    /// VSCP major version.
    VersionMajor,
    /// VSCP minor version.
    VersionMinor,
    /// Node control flags.
    NodeControl,
    /// User id, 5 bytes.
    UserId,
    /// Manufacturer device id, 4 bytes.
    ManufacturerDeviceId,
    /// Manufacturer sub device id, 4 bytes.
    ManufacturerSubDeviceId,
    /// Current nickname.
    Nickname,
    /// Page select, high byte.
    PageSelectMsb,
    /// Page select, low byte.
    PageSelectLsb,
    /// Firmware major version.
    FirmwareMajor,
    /// Firmware minor version.
    FirmwareMinor,
    /// Firmware sub-minor version.
    FirmwareSubMinor,
    /// Boot loader algorithm.
    BootLoaderAlgorithm,
    /// Buffer size.
    BufferSize,
    /// Number of pages used.
    PagesUsed,
    /// Standard device family code, 4 bytes.
    FamilyCode,
    /// Standard device type, 4 bytes.
    DeviceType,
    /// Restore standard configuration trigger.
    RestoreDefaults,
    /// Firmware device code, 2 bytes.
    FirmwareDeviceCode,
    /// Unassigned block.
    Reserved,
    /// Node GUID, 16 bytes.
    Guid,
    /// MDF URL, 32 bytes.
    MdfUrl,
}

/// Inclusive offset range and access of every standard register, ascending.
pub const STANDARD_REGISTERS: [(StandardRegister, u8, u8, RegisterAccess); 23] = [
    (StandardRegister::AlarmStatus, 0x80, 0x80, RegisterAccess::ReadOnly),
    (StandardRegister::VersionMajor, 0x81, 0x81, RegisterAccess::ReadOnly),
    (StandardRegister::VersionMinor, 0x82, 0x82, RegisterAccess::ReadOnly),
    (StandardRegister::NodeControl, 0x83, 0x83, RegisterAccess::ReadWrite),
    (StandardRegister::UserId, 0x84, 0x88, RegisterAccess::ReadWrite),
    (StandardRegister::ManufacturerDeviceId, 0x89, 0x8C, RegisterAccess::ReadOnly),
    (StandardRegister::ManufacturerSubDeviceId, 0x8D, 0x90, RegisterAccess::ReadOnly),
    (StandardRegister::Nickname, 0x91, 0x91, RegisterAccess::ReadOnly),
    (StandardRegister::PageSelectMsb, 0x92, 0x92, RegisterAccess::ReadWrite),
    (StandardRegister::PageSelectLsb, 0x93, 0x93, RegisterAccess::ReadWrite),
    (StandardRegister::FirmwareMajor, 0x94, 0x94, RegisterAccess::ReadOnly),
    (StandardRegister::FirmwareMinor, 0x95, 0x95, RegisterAccess::ReadOnly),
    (StandardRegister::FirmwareSubMinor, 0x96, 0x96, RegisterAccess::ReadOnly),
    (StandardRegister::BootLoaderAlgorithm, 0x97, 0x97, RegisterAccess::ReadOnly),
    (StandardRegister::BufferSize, 0x98, 0x98, RegisterAccess::ReadOnly),
    (StandardRegister::PagesUsed, 0x99, 0x99, RegisterAccess::ReadOnly),
    (StandardRegister::FamilyCode, 0x9A, 0x9D, RegisterAccess::ReadOnly),
    (StandardRegister::DeviceType, 0x9E, 0xA1, RegisterAccess::ReadOnly),
    (StandardRegister::RestoreDefaults, 0xA2, 0xA2, RegisterAccess::WriteOnly),
    (StandardRegister::FirmwareDeviceCode, 0xA3, 0xA4, RegisterAccess::ReadOnly),
    (StandardRegister::Reserved, 0xA5, 0xCF, RegisterAccess::ReadOnly),
    (StandardRegister::Guid, 0xD0, 0xDF, RegisterAccess::ReadOnly),
    (StandardRegister::MdfUrl, 0xE0, 0xFF, RegisterAccess::ReadOnly),
];

const _: () = assert_standard_layout();

const fn assert_standard_layout() {
    assert!(
        STANDARD_REGISTERS[0].1 == STANDARD_START,
        "standard block must start at 0x80"
    );
    assert!(
        STANDARD_REGISTERS[STANDARD_REGISTERS.len() - 1].2 == 0xFF,
        "standard block must end at 0xFF"
    );
    let mut index = 1;
    while index < STANDARD_REGISTERS.len() {
        let previous = STANDARD_REGISTERS[index - 1];
        let current = STANDARD_REGISTERS[index];
        assert!(current.1 <= current.2, "register range is inverted");
        assert!(
            previous.2 + 1 == current.1,
            "standard registers must be contiguous"
        );
        index += 1;
    }
}

/// A standard register and the byte within it (0 = MSB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StandardSlot {
    /// Register addressed.
    pub register: StandardRegister,
    /// Byte index within a multi-byte register.
    pub index: u8,
    /// Access policy.
    pub access: RegisterAccess,
}

/// Decodes an offset in `0x80..=0xFF`.
#[must_use]
pub fn decode_standard(offset: u8) -> Option<StandardSlot> {
    STANDARD_REGISTERS
        .iter()
        .find(|(_, start, end, _)| (*start..=*end).contains(&offset))
        .map(|(register, start, _, access)| StandardSlot {
            register: *register,
            index: offset - start,
            access: *access,
        })
}

/// Where a `(page, offset)` address resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterTarget {
    /// Standard register block.
    Standard(StandardSlot),
    /// Byte of the classic decision matrix window (rows then extension rows).
    DecisionMatrix(u8),
    /// Byte of the DM-NG ruleset.
    DmNg(u8),
    /// Application-owned register.
    Application,
    /// Past the configured matrix extent: reads 0, ignores writes.
    Unmapped,
}

/// Placement of the matrix pages in the register space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterLayout {
    /// Page holding classic rows and extension rows.
    pub dm_page: u16,
    /// Bytes of the classic window in use.
    pub dm_len: usize,
    /// Page holding the DM-NG ruleset, `None` when DM-NG is disabled.
    pub dmng_page: Option<u16>,
    /// DM-NG capacity.
    pub dmng_len: usize,
}

impl RegisterLayout {
    /// Resolves an address.
    #[must_use]
    pub fn resolve(&self, page: u16, offset: u8) -> RegisterTarget {
        if offset >= STANDARD_START {
            return decode_standard(offset).map_or(RegisterTarget::Unmapped, RegisterTarget::Standard);
        }
        if page == self.dm_page {
            return if usize::from(offset) < self.dm_len {
                RegisterTarget::DecisionMatrix(offset)
            } else {
                RegisterTarget::Unmapped
            };
        }
        if Some(page) == self.dmng_page {
            return if usize::from(offset) < self.dmng_len {
                RegisterTarget::DmNg(offset)
            } else {
                RegisterTarget::Unmapped
            };
        }
        RegisterTarget::Application
    }
}
