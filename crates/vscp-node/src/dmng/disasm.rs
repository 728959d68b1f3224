//! Printable rendering of a DM-NG ruleset.
//!
//! Well-formed rules print in the source syntax accepted by the rule
//! assembler, so a dump can be edited and rebuilt.

use std::fmt::Write as _;

use crate::dmng::cursor::RuleCursor;
use crate::dmng::encoding::{LogicOp, RULE_HEADER_LEN};
use crate::dmng::eval::{read_condition, RuleWalk};
use crate::error::{RuleFault, RuleFaultKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One rule of a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Rule index.
    pub rule_index: u8,
    /// Offset of the rule's length byte.
    pub offset: u16,
    /// Source text, or a comment describing the fault.
    pub text: String,
    /// Fault found while decoding the rule.
    pub fault: Option<RuleFault>,
}

fn fault_row(rule_index: u8, offset: usize, fault: RuleFault) -> DisassemblyRow {
    DisassemblyRow {
        rule_index,
        offset: u16::try_from(offset).unwrap_or(u16::MAX),
        text: format!("; {fault}"),
        fault: Some(fault),
    }
}

/// Renders every rule that can be located.
#[must_use]
pub fn disassemble(ruleset: &[u8]) -> Vec<DisassemblyRow> {
    let mut rows = Vec::new();
    for (index, header) in RuleWalk::new(ruleset) {
        let header = match header {
            Ok(header) => header,
            Err((kind, at)) => {
                let fault = RuleFault {
                    rule_index: index,
                    byte_offset: u16::try_from(at).unwrap_or(u16::MAX),
                    kind,
                };
                rows.push(fault_row(index, at, fault));
                continue;
            }
        };

        let mut text = format!("rule 0x{:02X} {} when", header.action, header.param);
        let mut cursor = RuleCursor::new(ruleset, header.start + RULE_HEADER_LEN, header.end);
        let mut fault = None;
        loop {
            match read_condition(&mut cursor) {
                Ok(condition) => {
                    let _ = write!(
                        text,
                        " {} {} {}",
                        condition.param,
                        condition.compare.symbol(),
                        condition.operand
                    );
                    if condition.logic == LogicOp::Last {
                        if !cursor.at_end() {
                            fault = Some((RuleFaultKind::TrailingBytes, cursor.offset()));
                        }
                        break;
                    }
                    let _ = write!(text, " {}", condition.logic.keyword());
                }
                Err(located) => {
                    fault = Some(located);
                    break;
                }
            }
        }

        match fault {
            None => rows.push(DisassemblyRow {
                rule_index: index,
                offset: u16::try_from(header.start).unwrap_or(u16::MAX),
                text,
                fault: None,
            }),
            Some((kind, at)) => {
                let fault = RuleFault {
                    rule_index: index,
                    byte_offset: u16::try_from(at).unwrap_or(u16::MAX),
                    kind,
                };
                rows.push(fault_row(index, header.start, fault));
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::disassemble;
    use crate::error::RuleFaultKind;

    #[test]
    fn rules_render_in_source_syntax() {
        let bytes = [1, 13, 0x10, 3, 0x10, 0x00, 0x00, 20, 0x22, 0x01, 3, 0x00, 0x10, 1];
        let rows = disassemble(&bytes);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].text,
            "rule 0x10 3 when class == 20 and type > 3 or data0 == 1"
        );
        assert_eq!(rows[0].offset, 1);
        assert!(rows[0].fault.is_none());
    }

    #[test]
    fn faulty_rule_is_rendered_and_walk_continues() {
        let bytes = [2, 6, 1, 0, 0x00, 0x7F, 3, 6, 2, 0, 0x00, 0x01, 3];
        let rows = disassemble(&bytes);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].fault.map(|f| f.kind),
            Some(RuleFaultKind::UnknownParam)
        );
        assert!(rows[0].text.starts_with("; rule 0 at byte 5"));
        assert_eq!(rows[1].text, "rule 0x02 0 when type == 3");
    }

    #[test]
    fn short_rule_length_is_flagged_and_later_rules_render() {
        let bytes = [2, 2, 1, 6, 2, 0, 0x00, 0x01, 3];
        let rows = disassemble(&bytes);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].fault.map(|f| (f.kind, f.byte_offset)),
            Some((RuleFaultKind::RuleLengthInvalid, 1))
        );
        assert_eq!(rows[1].text, "rule 0x02 0 when type == 3");
    }

    #[test]
    fn erased_ruleset_has_no_rows() {
        assert!(disassemble(&[0xFF; 8]).is_empty());
    }
}
