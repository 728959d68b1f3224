//! DM-NG byte-code tables: operation nibbles and parameter ids.

use crate::message::Event;
use crate::register::{read_be_u16, read_be_u32};

/// Bytes in a rule header (`length`, `action`, `param`).
pub const RULE_HEADER_LEN: usize = 3;
/// Shortest length a rule header may declare: header plus one body byte.
pub const MIN_RULE_LEN: usize = RULE_HEADER_LEN + 1;
/// Bytes of a condition before its operand (`op`, `param_id`).
pub const CONDITION_HEADER_LEN: usize = 2;
/// Largest legal rule, bounded by the one-byte length field.
pub const MAX_RULE_LEN: usize = u8::MAX as usize;
/// Rule count byte of erased storage.
pub const ERASED_RULE_COUNT: u8 = 0xFF;

/// How a condition combines with the next one (high nibble of the op byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LogicOp {
    /// Ends the chain.
    Last = 0x0,
    /// Next condition is ANDed in.
    And = 0x1,
    /// Next condition is ORed in.
    Or = 0x2,
}

impl LogicOp {
    /// Decodes a high nibble.
    #[must_use]
    pub const fn from_u4(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Last),
            0x1 => Some(Self::And),
            0x2 => Some(Self::Or),
            _ => None,
        }
    }

    /// Raw nibble.
    #[must_use]
    pub const fn as_u4(self) -> u8 {
        self as u8
    }

    /// Source keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Comparison applied between an event field and the operand (low nibble).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum BasicOp {
    Equal = 0x0,
    NotEqual = 0x1,
    Greater = 0x2,
    GreaterEqual = 0x3,
    Lower = 0x4,
    LowerEqual = 0x5,
    /// `field & operand == operand`.
    BitsSet = 0x6,
    /// `field & operand == 0`.
    BitsClear = 0x7,
}

/// Source symbol of every comparison, in nibble order.
pub const BASIC_OP_SYMBOLS: &[(BasicOp, &str)] = &[
    (BasicOp::Equal, "=="),
    (BasicOp::NotEqual, "!="),
    (BasicOp::Greater, ">"),
    (BasicOp::GreaterEqual, ">="),
    (BasicOp::Lower, "<"),
    (BasicOp::LowerEqual, "<="),
    (BasicOp::BitsSet, "&"),
    (BasicOp::BitsClear, "!&"),
];

impl BasicOp {
    /// Decodes a low nibble.
    #[must_use]
    pub const fn from_u4(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Equal),
            0x1 => Some(Self::NotEqual),
            0x2 => Some(Self::Greater),
            0x3 => Some(Self::GreaterEqual),
            0x4 => Some(Self::Lower),
            0x5 => Some(Self::LowerEqual),
            0x6 => Some(Self::BitsSet),
            0x7 => Some(Self::BitsClear),
            _ => None,
        }
    }

    /// Raw nibble.
    #[must_use]
    pub const fn as_u4(self) -> u8 {
        self as u8
    }

    /// Source symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        BASIC_OP_SYMBOLS
            .iter()
            .find_map(|(op, symbol)| (*op == self).then_some(*symbol))
            .unwrap_or("?")
    }

    /// Parses a source symbol.
    #[must_use]
    pub fn from_symbol(text: &str) -> Option<Self> {
        BASIC_OP_SYMBOLS
            .iter()
            .find_map(|(op, symbol)| (*symbol == text).then_some(*op))
    }

    /// Applies the comparison.
    #[must_use]
    pub const fn compare(self, field: u32, operand: u32) -> bool {
        match self {
            Self::Equal => field == operand,
            Self::NotEqual => field != operand,
            Self::Greater => field > operand,
            Self::GreaterEqual => field >= operand,
            Self::Lower => field < operand,
            Self::LowerEqual => field <= operand,
            Self::BitsSet => field & operand == operand,
            Self::BitsClear => field & operand == 0,
        }
    }
}

/// Composes an op byte.
#[must_use]
pub const fn op_byte(logic: LogicOp, basic: BasicOp) -> u8 {
    (logic.as_u4() << 4) | basic.as_u4()
}

/// Event field selected by a parameter id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    /// Event class, 2-byte operand.
    Class,
    /// Event type.
    Type,
    /// Originating address.
    OriginAddr,
    /// Hard-coded flag as 0 or 1.
    HardCoded,
    /// Number of payload bytes.
    DataNum,
    /// Payload byte `n` (0..=7).
    Data(u8),
    /// Big-endian `u16` at payload byte `n` (0..=6).
    DataU16(u8),
    /// Big-endian `u32` at payload byte `n` (0..=4).
    DataU32(u8),
}

const DATA_BASE: u8 = 0x10;
const DATA_U16_BASE: u8 = 0x20;
const DATA_U32_BASE: u8 = 0x30;

impl ParamId {
    /// Decodes a parameter id byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Class),
            0x01 => Some(Self::Type),
            0x02 => Some(Self::OriginAddr),
            0x03 => Some(Self::HardCoded),
            0x04 => Some(Self::DataNum),
            0x10..=0x17 => Some(Self::Data(value - DATA_BASE)),
            0x20..=0x26 => Some(Self::DataU16(value - DATA_U16_BASE)),
            0x30..=0x34 => Some(Self::DataU32(value - DATA_U32_BASE)),
            _ => None,
        }
    }

    /// Raw id byte, or `None` for an out-of-range payload offset.
    #[must_use]
    pub const fn as_u8(self) -> Option<u8> {
        match self {
            Self::Class => Some(0x00),
            Self::Type => Some(0x01),
            Self::OriginAddr => Some(0x02),
            Self::HardCoded => Some(0x03),
            Self::DataNum => Some(0x04),
            Self::Data(n) if n <= 7 => Some(DATA_BASE + n),
            Self::DataU16(n) if n <= 6 => Some(DATA_U16_BASE + n),
            Self::DataU32(n) if n <= 4 => Some(DATA_U32_BASE + n),
            Self::Data(_) | Self::DataU16(_) | Self::DataU32(_) => None,
        }
    }

    /// Operand width in bytes.
    #[must_use]
    pub const fn operand_len(self) -> usize {
        match self {
            Self::Class | Self::DataU16(_) => 2,
            Self::DataU32(_) => 4,
            Self::Type | Self::OriginAddr | Self::HardCoded | Self::DataNum | Self::Data(_) => 1,
        }
    }

    /// Largest operand value that fits the encoded width.
    #[must_use]
    pub const fn operand_max(self) -> u32 {
        match self.operand_len() {
            1 => u8::MAX as u32,
            2 => u16::MAX as u32,
            _ => u32::MAX,
        }
    }

    /// Reads the field from `event`; `None` when the payload is too short.
    #[must_use]
    pub fn fetch(self, event: &Event) -> Option<u32> {
        match self {
            Self::Class => Some(u32::from(event.class())),
            Self::Type => Some(u32::from(event.event_type())),
            Self::OriginAddr => Some(u32::from(event.origin())),
            Self::HardCoded => Some(u32::from(event.hard_coded())),
            Self::DataNum => Some(u32::from(event.data_len())),
            Self::Data(n) => event.data_byte(usize::from(n)).map(u32::from),
            Self::DataU16(n) => read_be_u16(event.data(), usize::from(n)).map(u32::from),
            Self::DataU32(n) => read_be_u32(event.data(), usize::from(n)),
        }
    }
}

impl core::fmt::Display for ParamId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Class => f.write_str("class"),
            Self::Type => f.write_str("type"),
            Self::OriginAddr => f.write_str("oaddr"),
            Self::HardCoded => f.write_str("hardcoded"),
            Self::DataNum => f.write_str("datanum"),
            Self::Data(n) => write!(f, "data{n}"),
            Self::DataU16(n) => write!(f, "u16@{n}"),
            Self::DataU32(n) => write!(f, "u32@{n}"),
        }
    }
}
