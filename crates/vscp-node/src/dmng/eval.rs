//! DM-NG rule walker and interpreter.

use crate::dmng::cursor::RuleCursor;
use crate::dmng::encoding::{
    BasicOp, LogicOp, ParamId, ERASED_RULE_COUNT, MIN_RULE_LEN, RULE_HEADER_LEN,
};
use crate::dmng::{Condition, RuleAction};
use crate::error::{RuleFault, RuleFaultKind};
use crate::message::Event;

/// Fault kind plus the absolute offset where it was detected.
pub(crate) type Located = (RuleFaultKind, usize);

/// Reads one condition at the cursor.
pub(crate) fn read_condition(cursor: &mut RuleCursor<'_>) -> Result<Condition, Located> {
    let op_at = cursor.offset();
    let op = cursor
        .read_u8(RuleFaultKind::TruncatedCondition)
        .map_err(|kind| (kind, op_at))?;
    let logic = LogicOp::from_u4(op >> 4).ok_or((RuleFaultKind::UnknownLogicOp, op_at))?;
    let compare = BasicOp::from_u4(op & 0x0F).ok_or((RuleFaultKind::UnknownBasicOp, op_at))?;

    let param_at = cursor.offset();
    let raw_param = cursor
        .read_u8(RuleFaultKind::TruncatedCondition)
        .map_err(|kind| (kind, param_at))?;
    let param = ParamId::from_u8(raw_param).ok_or((RuleFaultKind::UnknownParam, param_at))?;

    let operand_at = cursor.offset();
    let operand = cursor
        .read_be(param.operand_len(), RuleFaultKind::TruncatedCondition)
        .map_err(|kind| (kind, operand_at))?;

    Ok(Condition {
        logic,
        compare,
        param,
        operand,
    })
}

/// Header of one rule located in the ruleset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RuleHeader {
    pub start: usize,
    pub end: usize,
    pub action: u8,
    pub param: u8,
}

/// Walks rule headers, yielding each or the fault found in it.
///
/// A short but in-bounds length faults that rule only. A zero length or one
/// running past the buffer ends the walk.
#[derive(Debug, Clone)]
pub(crate) struct RuleWalk<'a> {
    ruleset: &'a [u8],
    count: u8,
    index: u8,
    offset: usize,
    stopped: bool,
}

impl<'a> RuleWalk<'a> {
    pub(crate) fn new(ruleset: &'a [u8]) -> Self {
        let count = match ruleset.first() {
            Some(&ERASED_RULE_COUNT) | None => 0,
            Some(&count) => count,
        };
        Self {
            ruleset,
            count,
            index: 0,
            offset: 1,
            stopped: false,
        }
    }

    /// Announced rule count, 0 for erased or empty storage.
    pub(crate) const fn announced(&self) -> u8 {
        self.count
    }
}

impl Iterator for RuleWalk<'_> {
    type Item = (u8, Result<RuleHeader, Located>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped || self.index >= self.count {
            return None;
        }
        let index = self.index;
        self.index += 1;

        let start = self.offset;
        let Some(&len) = self.ruleset.get(start) else {
            self.stopped = true;
            return Some((index, Err((RuleFaultKind::TruncatedRuleset, start))));
        };
        let len = usize::from(len);
        let end = start + len;
        if len == 0 || end > self.ruleset.len() {
            self.stopped = true;
            return Some((index, Err((RuleFaultKind::RuleLengthInvalid, start))));
        }
        self.offset = end;
        if len < MIN_RULE_LEN {
            return Some((index, Err((RuleFaultKind::RuleLengthInvalid, start))));
        }
        Some((
            index,
            Ok(RuleHeader {
                start,
                end,
                action: self.ruleset[start + 1],
                param: self.ruleset[start + 2],
            }),
        ))
    }
}

/// Evaluates the condition chain of one rule.
///
/// The first condition seeds the result; each condition's logic op folds the
/// following condition in. A field missing from the payload evaluates false.
fn evaluate_chain(ruleset: &[u8], header: RuleHeader, event: &Event) -> Result<bool, Located> {
    let mut cursor = RuleCursor::new(ruleset, header.start + RULE_HEADER_LEN, header.end);
    let mut result: Option<bool> = None;
    let mut pending = LogicOp::Last;

    loop {
        let condition = read_condition(&mut cursor)?;
        let value = condition.holds(event);
        result = Some(match (result, pending) {
            (Some(acc), LogicOp::And) => acc && value,
            (Some(acc), LogicOp::Or) => acc || value,
            (Some(_) | None, _) => value,
        });
        if condition.logic == LogicOp::Last {
            if !cursor.at_end() {
                return Err((RuleFaultKind::TrailingBytes, cursor.offset()));
            }
            return Ok(result.unwrap_or(false));
        }
        pending = condition.logic;
    }
}

fn locate(rule_index: u8, (kind, offset): Located) -> RuleFault {
    RuleFault {
        rule_index,
        byte_offset: u16::try_from(offset).unwrap_or(u16::MAX),
        kind,
    }
}

/// DM-NG interpreter with a sticky last-fault cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DmNgEngine {
    last_fault: Option<RuleFault>,
}

impl DmNgEngine {
    /// Creates an engine with no recorded fault.
    #[must_use]
    pub const fn new() -> Self {
        Self { last_fault: None }
    }

    /// Most recent fault, kept until [`Self::clear_last_fault`].
    #[must_use]
    pub const fn last_fault(&self) -> Option<RuleFault> {
        self.last_fault
    }

    /// Forgets the recorded fault.
    pub fn clear_last_fault(&mut self) {
        self.last_fault = None;
    }

    /// Returns the action of the first rule whose chain holds.
    pub fn evaluate(&mut self, ruleset: &[u8], event: &Event) -> Option<RuleAction> {
        self.evaluate_with(ruleset, event, |_| {})
    }

    /// Like [`Self::evaluate`], reporting every fault met on the way to `on_fault`.
    ///
    /// A fault inside a rule skips that rule only. A zero or overrunning rule
    /// length ends the walk because the next rule cannot be located.
    pub fn evaluate_with(
        &mut self,
        ruleset: &[u8],
        event: &Event,
        mut on_fault: impl FnMut(RuleFault),
    ) -> Option<RuleAction> {
        for (index, header) in RuleWalk::new(ruleset) {
            let outcome = header.and_then(|header| {
                evaluate_chain(ruleset, header, event).map(|hit| (header, hit))
            });
            match outcome {
                Ok((header, true)) => {
                    return Some(RuleAction {
                        rule_index: index,
                        action: header.action,
                        param: header.param,
                    });
                }
                Ok((_, false)) => {}
                Err(located) => {
                    let fault = locate(index, located);
                    self.last_fault = Some(fault);
                    on_fault(fault);
                }
            }
        }
        None
    }
}

/// Checks every rule of a ruleset without an event.
///
/// # Errors
///
/// Returns the first structural fault.
pub fn validate(ruleset: &[u8]) -> Result<u8, RuleFault> {
    let walk = RuleWalk::new(ruleset);
    let count = walk.announced();
    for (index, header) in walk {
        let header = header.map_err(|located| locate(index, located))?;
        let mut cursor = RuleCursor::new(ruleset, header.start + RULE_HEADER_LEN, header.end);
        loop {
            let condition = read_condition(&mut cursor).map_err(|located| locate(index, located))?;
            if condition.logic == LogicOp::Last {
                if !cursor.at_end() {
                    return Err(locate(index, (RuleFaultKind::TrailingBytes, cursor.offset())));
                }
                break;
            }
        }
    }
    Ok(count)
}
