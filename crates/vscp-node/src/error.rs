use thiserror::Error;

/// Errors raised while building or decoding a Level I event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MessageError {
    /// Payload longer than the 8-byte Level I limit.
    #[error("payload of {len} bytes exceeds the 8 byte limit")]
    PayloadTooLong {
        /// Offending payload length.
        len: usize,
    },
    /// Priority outside `0..=7`.
    #[error("priority {priority} is outside 0..=7")]
    InvalidPriority {
        /// Offending priority.
        priority: u8,
    },
    /// Identifier does not fit in 29 bits.
    #[error("identifier {id:#010x} does not fit in 29 bits")]
    IdentifierOutOfRange {
        /// Offending identifier.
        id: u32,
    },
}

/// Configuration rejected by [`crate::NodeConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// MDF URL does not fit the 32 register bytes.
    #[error("mdf url is {len} bytes, at most 32 fit the register window")]
    MdfUrlTooLong {
        /// Encoded URL length.
        len: usize,
    },
    /// A decision matrix page collides with page 0 or with another matrix.
    #[error("page {page} cannot host the {what}")]
    PageConflict {
        /// Conflicting page number.
        page: u16,
        /// Which matrix was being placed.
        what: &'static str,
    },
    /// Classic rows plus extension rows overflow the page-relative window.
    #[error("{rows} decision matrix rows need {bytes} bytes, the page window holds 128")]
    TooManyRows {
        /// Configured row count.
        rows: u8,
        /// Bytes required by rows and extension rows.
        bytes: usize,
    },
    /// DM-NG capacity overflows the page-relative window.
    #[error("dm-ng capacity {capacity} exceeds the 128 byte page window")]
    RulesetTooLarge {
        /// Configured capacity.
        capacity: u8,
    },
    /// Priority outside `0..=7`.
    #[error("priority {priority} is outside 0..=7")]
    InvalidPriority {
        /// Offending priority.
        priority: u8,
    },
    /// Probe timeout of zero would re-probe on every step.
    #[error("nickname probe timeout must be non-zero")]
    ZeroProbeTimeout,
}

/// Unrecoverable node faults reported through [`crate::NodeHooks::on_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum NodeFault {
    /// The timer service could not provide every logical timer slot.
    #[error("timer service has no free slot")]
    TimerExhausted,
}

/// Classification of DM-NG byte-code faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum RuleFaultKind {
    /// Ruleset ends before the announced number of rules.
    #[error("ruleset ends before the announced rule count")]
    TruncatedRuleset = 0x01,
    /// Rule length is shorter than a header plus one condition, or runs past the ruleset.
    #[error("rule length byte is invalid")]
    RuleLengthInvalid = 0x02,
    /// Condition runs past the end of its rule.
    #[error("condition is truncated by the rule boundary")]
    TruncatedCondition = 0x03,
    /// Logic operation nibble is not AND, OR or LAST.
    #[error("unknown logic operation")]
    UnknownLogicOp = 0x04,
    /// Basic operation nibble is not a known comparison.
    #[error("unknown comparison operation")]
    UnknownBasicOp = 0x05,
    /// Parameter id does not select an event field.
    #[error("unknown parameter id")]
    UnknownParam = 0x06,
    /// Bytes remain in the rule after the LAST condition.
    #[error("rule has bytes after its last condition")]
    TrailingBytes = 0x07,
}

/// DM-NG fault with the cursor position where it was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("rule {rule_index} at byte {byte_offset}: {kind}")]
pub struct RuleFault {
    /// Zero-based index of the faulting rule.
    pub rule_index: u8,
    /// Absolute offset into the ruleset buffer.
    pub byte_offset: u16,
    /// What went wrong.
    pub kind: RuleFaultKind,
}

/// Typed rules that cannot be turned into DM-NG byte-code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum EncodeError {
    /// More rules than the count byte can announce.
    #[error("{count} rules exceed the limit of 254")]
    TooManyRules {
        /// Rules supplied.
        count: usize,
    },
    /// Rule without conditions.
    #[error("rule {rule} has no conditions")]
    EmptyRule {
        /// Rule index.
        rule: usize,
    },
    /// Encoded rule longer than its one-byte length field allows.
    #[error("rule {rule} encodes to {len} bytes, at most 255 fit")]
    RuleTooLong {
        /// Rule index.
        rule: usize,
        /// Encoded length.
        len: usize,
    },
    /// A condition other than the last one ends the chain.
    #[error("rule {rule} ends its chain at condition {condition}")]
    ChainEndsEarly {
        /// Rule index.
        rule: usize,
        /// Condition index.
        condition: usize,
    },
    /// Payload offset without an id byte.
    #[error("rule {rule} selects a payload field past the 8 byte payload")]
    FieldOutOfRange {
        /// Rule index.
        rule: usize,
    },
    /// Operand wider than the field's encoded width.
    #[error("rule {rule}: operand {operand:#x} does not fit {width} byte(s)")]
    OperandOutOfRange {
        /// Rule index.
        rule: usize,
        /// Offending operand.
        operand: u32,
        /// Encoded operand width.
        width: usize,
    },
    /// Ruleset larger than the configured storage.
    #[error("ruleset needs {len} bytes, capacity is {capacity}")]
    CapacityExceeded {
        /// Encoded length.
        len: usize,
        /// Available bytes.
        capacity: usize,
    },
}
