//! Classic fixed-row decision matrix.
//!
//! Every enabled row is tested against each non-protocol event in ascending
//! order and every matching row fires. Rows whose action is
//! [`ACTION_EXTENDED_DM`] defer to the extension row with the same index.

use crate::message::Event;

/// Bytes in a classic row.
pub const ROW_LEN: usize = 8;
/// Bytes in an extension row.
pub const EXTENSION_ROW_LEN: usize = 9;

/// Action code selecting the extension row.
pub const ACTION_EXTENDED_DM: u8 = 0xFF;
/// Action code meaning "no operation".
pub const ACTION_NOOP: u8 = 0x00;

/// Zone value matching any zone.
pub const ZONE_WILDCARD: u8 = 0xFF;

/// Row flag: row takes part in evaluation.
pub const FLAG_ENABLED: u8 = 1 << 7;
/// Row flag: the originating address must equal the row's.
pub const FLAG_CHECK_ORIGIN: u8 = 1 << 6;
/// Row flag: only events from hard-coded nodes match.
///
/// Gates on its own; it neither needs nor relaxes [`FLAG_CHECK_ORIGIN`].
pub const FLAG_HARD_CODED: u8 = 1 << 5;
/// Row flag: `data[1]` must match the node zone.
pub const FLAG_MATCH_ZONE: u8 = 1 << 4;
/// Row flag: `data[2]` must match the node sub-zone.
pub const FLAG_MATCH_SUB_ZONE: u8 = 1 << 3;
/// Row flag: bit 8 of the class mask.
pub const FLAG_CLASS_MASK_BIT8: u8 = 1 << 1;
/// Row flag: bit 8 of the class filter.
pub const FLAG_CLASS_FILTER_BIT8: u8 = 1 << 0;

/// Extension option: `data[1]` must match the extension zone.
pub const EXT_MATCH_ZONE: u8 = 1 << 0;
/// Extension option: `data[2]` must match the extension sub-zone.
pub const EXT_MATCH_SUB_ZONE: u8 = 1 << 1;
/// Extension option: `data[0]` must equal `par0`.
pub const EXT_MATCH_DATA0: u8 = 1 << 2;
/// Extension option: `data[3]` must equal `par3`.
pub const EXT_MATCH_DATA3: u8 = 1 << 3;
/// Extension option: `data[4]` must equal `par4`.
pub const EXT_MATCH_DATA4: u8 = 1 << 4;
/// Extension option: `data[5]` must equal `par5`.
pub const EXT_MATCH_DATA5: u8 = 1 << 5;

/// Zone and sub-zone a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Zone {
    /// Zone.
    pub zone: u8,
    /// Sub-zone.
    pub sub_zone: u8,
}

/// One classic decision matrix row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DmRow {
    /// Originating address checked when [`FLAG_CHECK_ORIGIN`] is set.
    pub origin: u8,
    /// `FLAG_*` bits.
    pub flags: u8,
    /// Class mask, low 8 bits.
    pub class_mask: u8,
    /// Class filter, low 8 bits.
    pub class_filter: u8,
    /// Type mask.
    pub type_mask: u8,
    /// Type filter.
    pub type_filter: u8,
    /// Action code.
    pub action: u8,
    /// Action parameter.
    pub param: u8,
}

impl DmRow {
    /// Decodes the register/storage image of a row.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ROW_LEN]) -> Self {
        Self {
            origin: bytes[0],
            flags: bytes[1],
            class_mask: bytes[2],
            class_filter: bytes[3],
            type_mask: bytes[4],
            type_filter: bytes[5],
            action: bytes[6],
            param: bytes[7],
        }
    }

    /// Encodes the row.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; ROW_LEN] {
        [
            self.origin,
            self.flags,
            self.class_mask,
            self.class_filter,
            self.type_mask,
            self.type_filter,
            self.action,
            self.param,
        ]
    }

    /// `true` when the row takes part in evaluation.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.flags & FLAG_ENABLED != 0
    }

    /// Nine-bit class mask.
    #[must_use]
    pub const fn class_mask9(&self) -> u16 {
        let high = if self.flags & FLAG_CLASS_MASK_BIT8 != 0 {
            0x100
        } else {
            0
        };
        high | self.class_mask as u16
    }

    /// Nine-bit class filter.
    #[must_use]
    pub const fn class_filter9(&self) -> u16 {
        let high = if self.flags & FLAG_CLASS_FILTER_BIT8 != 0 {
            0x100
        } else {
            0
        };
        high | self.class_filter as u16
    }

    /// Tests every condition of the base row, ignoring the extension.
    #[must_use]
    pub fn matches(&self, event: &Event, node: Zone) -> bool {
        if !self.enabled() {
            return false;
        }
        if self.flags & FLAG_HARD_CODED != 0 && !event.hard_coded() {
            return false;
        }
        if self.flags & FLAG_CHECK_ORIGIN != 0 && event.origin() != self.origin {
            return false;
        }
        let mask = self.class_mask9();
        if event.class() & mask != self.class_filter9() & mask {
            return false;
        }
        if event.event_type() & self.type_mask != self.type_filter & self.type_mask {
            return false;
        }
        if self.flags & FLAG_MATCH_ZONE != 0 && !zone_matches(event.data_byte(1), node.zone) {
            return false;
        }
        if self.flags & FLAG_MATCH_SUB_ZONE != 0
            && !zone_matches(event.data_byte(2), node.sub_zone)
        {
            return false;
        }
        true
    }
}

/// Extension row used by rows with [`ACTION_EXTENDED_DM`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExtensionRow {
    /// `EXT_MATCH_*` bits.
    pub options: u8,
    /// Zone compared with `data[1]`.
    pub zone: u8,
    /// Sub-zone compared with `data[2]`.
    pub sub_zone: u8,
    /// Expected `data[0]`.
    pub par0: u8,
    /// Expected `data[3]`.
    pub par3: u8,
    /// Expected `data[4]`.
    pub par4: u8,
    /// Expected `data[5]`.
    pub par5: u8,
    /// Action fired instead of the base row's.
    pub action: u8,
    /// Action parameter.
    pub param: u8,
}

impl ExtensionRow {
    /// Decodes the register/storage image of an extension row.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; EXTENSION_ROW_LEN]) -> Self {
        Self {
            options: bytes[0],
            zone: bytes[1],
            sub_zone: bytes[2],
            par0: bytes[3],
            par3: bytes[4],
            par4: bytes[5],
            par5: bytes[6],
            action: bytes[7],
            param: bytes[8],
        }
    }

    /// Encodes the extension row.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; EXTENSION_ROW_LEN] {
        [
            self.options,
            self.zone,
            self.sub_zone,
            self.par0,
            self.par3,
            self.par4,
            self.par5,
            self.action,
            self.param,
        ]
    }

    /// Tests the selected extension conditions.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let checks = [
            (EXT_MATCH_DATA0, 0, self.par0),
            (EXT_MATCH_DATA3, 3, self.par3),
            (EXT_MATCH_DATA4, 4, self.par4),
            (EXT_MATCH_DATA5, 5, self.par5),
        ];
        if self.options & EXT_MATCH_ZONE != 0 && !zone_matches(event.data_byte(1), self.zone) {
            return false;
        }
        if self.options & EXT_MATCH_SUB_ZONE != 0
            && !zone_matches(event.data_byte(2), self.sub_zone)
        {
            return false;
        }
        checks
            .iter()
            .filter(|(bit, _, _)| self.options & bit != 0)
            .all(|(_, index, expected)| event.data_byte(*index) == Some(*expected))
    }
}

fn zone_matches(received: Option<u8>, wanted: u8) -> bool {
    received.is_some_and(|zone| zone == wanted || zone == ZONE_WILDCARD || wanted == ZONE_WILDCARD)
}

/// One action produced by evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DmFiring {
    /// Index of the row that matched.
    pub row: u8,
    /// Action code.
    pub action: u8,
    /// Action parameter.
    pub param: u8,
}

/// Evaluates every row against `event` and calls `fire` for each match in row order.
///
/// `extensions` is indexed like `rows`; a missing extension row makes an
/// extended row unmatched. No-op actions are skipped. Returns the number of
/// actions fired.
pub fn evaluate(
    rows: &[DmRow],
    extensions: &[ExtensionRow],
    event: &Event,
    node: Zone,
    mut fire: impl FnMut(DmFiring),
) -> usize {
    let mut fired = 0;
    for (index, row) in rows.iter().enumerate() {
        let Ok(row_index) = u8::try_from(index) else {
            break;
        };
        if !row.matches(event, node) {
            continue;
        }
        let (action, param) = if row.action == ACTION_EXTENDED_DM {
            match extensions.get(index) {
                Some(ext) if ext.matches(event) => (ext.action, ext.param),
                _ => continue,
            }
        } else {
            (row.action, row.param)
        };
        if action == ACTION_NOOP {
            continue;
        }
        fire(DmFiring {
            row: row_index,
            action,
            param,
        });
        fired += 1;
    }
    fired
}
