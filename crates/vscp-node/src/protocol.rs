//! Level I class and type numbering used by the node core.

/// `CLASS1.PROTOCOL`: node management traffic handled inline by the core.
pub const CLASS1_PROTOCOL: u16 = 0;
/// `CLASS1.INFORMATION`: carries the node heartbeat.
pub const CLASS1_INFORMATION: u16 = 20;
/// `CLASS1.INFORMATION` type for the node heartbeat.
pub const INFORMATION_NODE_HEARTBEAT: u8 = 9;

/// Nickname value meaning "no nickname assigned".
pub const NICKNAME_UNINITIALIZED: u8 = 0xFF;
/// Nickname reserved for the segment master.
pub const NICKNAME_SEGMENT_MASTER: u8 = 0x00;
/// Highest nickname a node may hold.
pub const NICKNAME_MAX: u8 = 254;

/// `CLASS1.PROTOCOL` event types understood by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ProtocolType {
    SegmentControllerHeartbeat = 1,
    NewNodeOnline = 2,
    ProbeAck = 3,
    SetNicknameId = 6,
    NicknameIdAccepted = 7,
    DropNickname = 8,
    ReadRegister = 9,
    RwResponse = 10,
    WriteRegister = 11,
    EnterBootLoader = 12,
    AckBootLoader = 13,
    NackBootLoader = 14,
    GuidDropNickname = 23,
    PageRead = 24,
    PageWrite = 25,
    RwPageResponse = 26,
    IncrementRegister = 29,
    DecrementRegister = 30,
    WhoIsThere = 31,
    WhoIsThereResponse = 32,
    GetDmInfo = 33,
    DmInfoResponse = 34,
    ExtendedPageRead = 37,
    ExtendedPageWrite = 38,
    ExtendedPageResponse = 39,
}

impl ProtocolType {
    /// Maps a raw type byte onto a known protocol type.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::SegmentControllerHeartbeat),
            2 => Some(Self::NewNodeOnline),
            3 => Some(Self::ProbeAck),
            6 => Some(Self::SetNicknameId),
            7 => Some(Self::NicknameIdAccepted),
            8 => Some(Self::DropNickname),
            9 => Some(Self::ReadRegister),
            10 => Some(Self::RwResponse),
            11 => Some(Self::WriteRegister),
            12 => Some(Self::EnterBootLoader),
            13 => Some(Self::AckBootLoader),
            14 => Some(Self::NackBootLoader),
            23 => Some(Self::GuidDropNickname),
            24 => Some(Self::PageRead),
            25 => Some(Self::PageWrite),
            26 => Some(Self::RwPageResponse),
            29 => Some(Self::IncrementRegister),
            30 => Some(Self::DecrementRegister),
            31 => Some(Self::WhoIsThere),
            32 => Some(Self::WhoIsThereResponse),
            33 => Some(Self::GetDmInfo),
            34 => Some(Self::DmInfoResponse),
            37 => Some(Self::ExtendedPageRead),
            38 => Some(Self::ExtendedPageWrite),
            39 => Some(Self::ExtendedPageResponse),
            _ => None,
        }
    }

    /// Raw type byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}
