//! Decision Matrix Next Generation: byte-code rules stored in persistent memory.
//!
//! A ruleset is `rule_count` followed by that many rules. Each rule is
//! `length, action, param` and a chain of conditions `op, param_id, operand`.
//! The interpreter reads the buffer only through [`RuleCursor`], so corrupted
//! bytes surface as [`crate::RuleFault`] values instead of out-of-bounds reads.

pub mod cursor;
pub mod disasm;
pub mod encode;
pub mod encoding;
pub mod eval;

pub use cursor::RuleCursor;
pub use disasm::{disassemble, DisassemblyRow};
pub use encode::encode_ruleset;
pub use encoding::{op_byte, BasicOp, LogicOp, ParamId};
pub use eval::{validate, DmNgEngine};

use crate::message::Event;

/// One comparison in a rule chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Condition {
    /// How the following condition folds in; `Last` ends the chain.
    pub logic: LogicOp,
    /// Comparison.
    pub compare: BasicOp,
    /// Event field.
    pub param: ParamId,
    /// Operand, big-endian on the wire.
    pub operand: u32,
}

impl Condition {
    /// Condition with `logic` left as [`LogicOp::Last`].
    #[must_use]
    pub const fn new(param: ParamId, compare: BasicOp, operand: u32) -> Self {
        Self {
            logic: LogicOp::Last,
            compare,
            param,
            operand,
        }
    }

    /// `true` when the field is present and the comparison holds.
    #[must_use]
    pub fn holds(&self, event: &Event) -> bool {
        self.param
            .fetch(event)
            .is_some_and(|field| self.compare.compare(field, self.operand))
    }
}

/// Typed form of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    /// Action fired when the chain holds.
    pub action: u8,
    /// Action parameter.
    pub param: u8,
    /// Condition chain in evaluation order.
    pub conditions: Vec<Condition>,
}

impl Rule {
    /// Rule with a single condition.
    #[must_use]
    pub fn when(action: u8, param: u8, first: Condition) -> Self {
        Self {
            action,
            param,
            conditions: vec![first],
        }
    }

    /// Appends `next`, joined to the chain with `logic`.
    #[must_use]
    pub fn then(mut self, logic: LogicOp, next: Condition) -> Self {
        if let Some(last) = self.conditions.last_mut() {
            last.logic = logic;
        }
        self.conditions.push(next);
        self
    }

    /// Appends `next` with AND.
    #[must_use]
    pub fn and(self, next: Condition) -> Self {
        self.then(LogicOp::And, next)
    }

    /// Appends `next` with OR.
    #[must_use]
    pub fn or(self, next: Condition) -> Self {
        self.then(LogicOp::Or, next)
    }
}

/// Action selected by DM-NG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RuleAction {
    /// Index of the matching rule.
    pub rule_index: u8,
    /// Action code.
    pub action: u8,
    /// Action parameter.
    pub param: u8,
}
