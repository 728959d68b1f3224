//! Typed rules to DM-NG byte-code.

use crate::dmng::encoding::{op_byte, LogicOp, ERASED_RULE_COUNT, MAX_RULE_LEN};
use crate::dmng::Rule;
use crate::error::EncodeError;

/// Encodes one rule, length byte included.
///
/// The last condition is always written as `LAST`.
///
/// # Errors
///
/// See [`EncodeError`].
pub fn encode_rule(index: usize, rule: &Rule) -> Result<Vec<u8>, EncodeError> {
    if rule.conditions.is_empty() {
        return Err(EncodeError::EmptyRule { rule: index });
    }
    let mut out = vec![0, rule.action, rule.param];
    let last = rule.conditions.len() - 1;
    for (position, condition) in rule.conditions.iter().enumerate() {
        let logic = if position == last {
            LogicOp::Last
        } else if condition.logic == LogicOp::Last {
            return Err(EncodeError::ChainEndsEarly {
                rule: index,
                condition: position,
            });
        } else {
            condition.logic
        };
        let id = condition
            .param
            .as_u8()
            .ok_or(EncodeError::FieldOutOfRange { rule: index })?;
        let width = condition.param.operand_len();
        if condition.operand > condition.param.operand_max() {
            return Err(EncodeError::OperandOutOfRange {
                rule: index,
                operand: condition.operand,
                width,
            });
        }
        out.push(op_byte(logic, condition.compare));
        out.push(id);
        out.extend_from_slice(&condition.operand.to_be_bytes()[4 - width..]);
    }
    if out.len() > MAX_RULE_LEN {
        return Err(EncodeError::RuleTooLong {
            rule: index,
            len: out.len(),
        });
    }
    #[allow(clippy::cast_possible_truncation)]
    {
        out[0] = out.len() as u8;
    }
    Ok(out)
}

/// Encodes a complete ruleset and checks it fits `capacity` bytes.
///
/// # Errors
///
/// See [`EncodeError`].
pub fn encode_ruleset(rules: &[Rule], capacity: usize) -> Result<Vec<u8>, EncodeError> {
    let count = u8::try_from(rules.len())
        .ok()
        .filter(|count| *count != ERASED_RULE_COUNT)
        .ok_or(EncodeError::TooManyRules { count: rules.len() })?;
    let mut out = vec![count];
    for (index, rule) in rules.iter().enumerate() {
        out.extend(encode_rule(index, rule)?);
    }
    if out.len() > capacity {
        return Err(EncodeError::CapacityExceeded {
            len: out.len(),
            capacity,
        });
    }
    Ok(out)
}
