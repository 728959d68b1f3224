//! Line parser for the rule source language.
//!
//! Statements are whitespace separated tokens:
//! ```text
//! const LAMP_ON = 0x10
//! rule LAMP_ON 3 when class == 20 and type > 3 or data0 == 1
//! ```

use vscp_node::dmng::{BasicOp, LogicOp, ParamId};

use crate::errors::{ParseError, ParseErrorKind};

/// Literal or constant reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Numeric literal.
    Number(u32),
    /// Name of a `const`.
    Symbol(String),
}

/// One `field op value` term of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionLine {
    /// Event field.
    pub param: ParamId,
    /// Comparison.
    pub compare: BasicOp,
    /// Right-hand side.
    pub operand: Value,
    /// Connective to the next term; `Last` on the final one.
    pub logic: LogicOp,
}

/// A parsed `rule` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine {
    /// Action code.
    pub action: Value,
    /// Action parameter.
    pub param: Value,
    /// Terms in source order.
    pub conditions: Vec<ConditionLine>,
}

/// A parsed source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Empty or comment-only line.
    Blank,
    /// `const NAME = value`.
    Const {
        /// Constant name.
        name: String,
        /// Assigned value.
        value: Value,
    },
    /// `rule action param when ...`.
    Rule(RuleLine),
}

/// Words that cannot name a constant.
pub const KEYWORDS: &[&str] = &["const", "rule", "when", "and", "or"];

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    column: usize,
}

struct Tokens<'a> {
    items: Vec<Token<'a>>,
    next: usize,
    end_column: usize,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        let mut items = Vec::new();
        let mut start = None;
        for (index, ch) in line.char_indices() {
            match (ch.is_whitespace(), start) {
                (true, Some(from)) => {
                    items.push(Token {
                        text: &line[from..index],
                        column: from + 1,
                    });
                    start = None;
                }
                (false, None) => start = Some(index),
                _ => {}
            }
        }
        if let Some(from) = start {
            items.push(Token {
                text: &line[from..],
                column: from + 1,
            });
        }
        Self {
            items,
            next: 0,
            end_column: line.len() + 1,
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.items.get(self.next).copied()
    }

    fn next_token(&mut self, what: &'static str) -> Result<Token<'a>, ParseError> {
        let token = self.peek().ok_or(ParseError {
            column: self.end_column,
            kind: ParseErrorKind::Missing(what),
        })?;
        self.next += 1;
        Ok(token)
    }

    fn expect_word(&mut self, word: &'static str, what: &'static str) -> Result<(), ParseError> {
        let token = self.next_token(what)?;
        if token.text.eq_ignore_ascii_case(word) {
            Ok(())
        } else {
            Err(unexpected(token, what))
        }
    }

    fn finish(&self) -> Result<(), ParseError> {
        self.peek()
            .map_or(Ok(()), |token| Err(unexpected(token, "end of line")))
    }
}

fn unexpected(token: Token<'_>, expected: &'static str) -> ParseError {
    ParseError {
        column: token.column,
        kind: ParseErrorKind::Unexpected {
            expected,
            found: token.text.to_string(),
        },
    }
}

/// Parses one source line.
///
/// # Errors
///
/// Returns a [`ParseError`] for unknown statements, fields or operators,
/// malformed numbers and incomplete statements.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseError> {
    let mut tokens = Tokens::new(strip_comment(line));
    let Some(first) = tokens.peek() else {
        return Ok(ParsedLine::Blank);
    };
    tokens.next += 1;

    match first.text.to_ascii_lowercase().as_str() {
        "const" => parse_const(&mut tokens),
        "rule" => parse_rule(&mut tokens).map(ParsedLine::Rule),
        _ => Err(ParseError {
            column: first.column,
            kind: ParseErrorKind::UnknownStatement(first.text.to_string()),
        }),
    }
}

fn strip_comment(line: &str) -> &str {
    line.find(';').map_or(line, |pos| &line[..pos])
}

fn parse_const(tokens: &mut Tokens<'_>) -> Result<ParsedLine, ParseError> {
    let name = tokens.next_token("constant name")?;
    if !is_identifier(name.text) {
        return Err(ParseError {
            column: name.column,
            kind: ParseErrorKind::InvalidName(name.text.to_string()),
        });
    }
    tokens.expect_word("=", "'='")?;
    let value = parse_value(tokens.next_token("value")?)?;
    tokens.finish()?;
    Ok(ParsedLine::Const {
        name: name.text.to_string(),
        value,
    })
}

fn parse_rule(tokens: &mut Tokens<'_>) -> Result<RuleLine, ParseError> {
    let action = parse_value(tokens.next_token("action")?)?;
    let param = parse_value(tokens.next_token("action parameter")?)?;
    tokens.expect_word("when", "'when'")?;

    let mut conditions: Vec<ConditionLine> = Vec::new();
    loop {
        let field = tokens.next_token("condition")?;
        let param_id = parse_field(field.text).ok_or_else(|| ParseError {
            column: field.column,
            kind: ParseErrorKind::UnknownField(field.text.to_string()),
        })?;
        let op = tokens.next_token("operator")?;
        let compare = BasicOp::from_symbol(op.text).ok_or_else(|| ParseError {
            column: op.column,
            kind: ParseErrorKind::UnknownOperator(op.text.to_string()),
        })?;
        let operand = parse_value(tokens.next_token("operand")?)?;
        conditions.push(ConditionLine {
            param: param_id,
            compare,
            operand,
            logic: LogicOp::Last,
        });

        let Some(joiner) = tokens.peek() else {
            break;
        };
        let logic = match joiner.text.to_ascii_lowercase().as_str() {
            "and" => LogicOp::And,
            "or" => LogicOp::Or,
            _ => return Err(unexpected(joiner, "'and', 'or' or end of line")),
        };
        tokens.next += 1;
        if let Some(last) = conditions.last_mut() {
            last.logic = logic;
        }
    }

    Ok(RuleLine {
        action,
        param,
        conditions,
    })
}

/// Maps a field name to its parameter id.
#[must_use]
pub fn parse_field(text: &str) -> Option<ParamId> {
    let lower = text.to_ascii_lowercase();
    let field = match lower.as_str() {
        "class" => ParamId::Class,
        "type" => ParamId::Type,
        "oaddr" => ParamId::OriginAddr,
        "hardcoded" => ParamId::HardCoded,
        "datanum" => ParamId::DataNum,
        other => {
            if let Some(index) = other.strip_prefix("u16@") {
                ParamId::DataU16(index.parse().ok()?)
            } else if let Some(index) = other.strip_prefix("u32@") {
                ParamId::DataU32(index.parse().ok()?)
            } else {
                ParamId::Data(other.strip_prefix("data")?.parse().ok()?)
            }
        }
    };
    field.as_u8().map(|_| field)
}

fn parse_value(token: Token<'_>) -> Result<Value, ParseError> {
    if token.text.starts_with(|c: char| c.is_ascii_digit()) {
        parse_number(token.text)
            .map(Value::Number)
            .ok_or_else(|| ParseError {
                column: token.column,
                kind: ParseErrorKind::InvalidNumber(token.text.to_string()),
            })
    } else if is_identifier(token.text) {
        Ok(Value::Symbol(token.text.to_string()))
    } else {
        Err(ParseError {
            column: token.column,
            kind: ParseErrorKind::InvalidNumber(token.text.to_string()),
        })
    }
}

/// Parses a decimal, `0x` hex or `0b` binary literal.
#[must_use]
pub fn parse_number(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        u32::from_str_radix(bin, 2).ok()
    } else {
        text.parse().ok()
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use vscp_node::dmng::{BasicOp, LogicOp, ParamId};

    use super::{parse_field, parse_line, parse_number, ConditionLine, ParsedLine, RuleLine, Value};
    use crate::errors::ParseErrorKind;

    #[test]
    fn blank_and_comment_lines() {
        assert_eq!(parse_line(""), Ok(ParsedLine::Blank));
        assert_eq!(parse_line("   ; just a note"), Ok(ParsedLine::Blank));
    }

    #[test]
    fn parses_constant() {
        assert_eq!(
            parse_line("const LAMP_ON = 0x10 ; lamp"),
            Ok(ParsedLine::Const {
                name: "LAMP_ON".to_string(),
                value: Value::Number(0x10),
            })
        );
    }

    #[test]
    fn parses_rule_chain_with_connectives() {
        let parsed = parse_line("rule LAMP_ON 3 when class == 20 and type > 3 or data0 == 1");
        let expected = RuleLine {
            action: Value::Symbol("LAMP_ON".to_string()),
            param: Value::Number(3),
            conditions: vec![
                ConditionLine {
                    param: ParamId::Class,
                    compare: BasicOp::Equal,
                    operand: Value::Number(20),
                    logic: LogicOp::And,
                },
                ConditionLine {
                    param: ParamId::Type,
                    compare: BasicOp::Greater,
                    operand: Value::Number(3),
                    logic: LogicOp::Or,
                },
                ConditionLine {
                    param: ParamId::Data(0),
                    compare: BasicOp::Equal,
                    operand: Value::Number(1),
                    logic: LogicOp::Last,
                },
            ],
        };
        assert_eq!(parsed, Ok(ParsedLine::Rule(expected)));
    }

    #[rstest]
    #[case("class", Some(ParamId::Class))]
    #[case("OADDR", Some(ParamId::OriginAddr))]
    #[case("hardcoded", Some(ParamId::HardCoded))]
    #[case("datanum", Some(ParamId::DataNum))]
    #[case("data7", Some(ParamId::Data(7)))]
    #[case("data8", None)]
    #[case("u16@6", Some(ParamId::DataU16(6)))]
    #[case("u16@7", None)]
    #[case("u32@4", Some(ParamId::DataU32(4)))]
    #[case("u32@5", None)]
    #[case("zone", None)]
    fn field_names(#[case] text: &str, #[case] expected: Option<ParamId>) {
        assert_eq!(parse_field(text), expected);
    }

    #[rstest]
    #[case("42", Some(42))]
    #[case("0x2A", Some(42))]
    #[case("0b101010", Some(42))]
    #[case("0xFFFFFFFF", Some(u32::MAX))]
    #[case("0x100000000", None)]
    #[case("12ab", None)]
    fn number_literals(#[case] text: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_number(text), expected);
    }

    #[test]
    fn operator_table_covers_bit_tests() {
        let Ok(ParsedLine::Rule(rule)) = parse_line("rule 1 0 when data0 & 0x80 and data1 !& 1")
        else {
            panic!("rule should parse");
        };
        assert_eq!(rule.conditions[0].compare, BasicOp::BitsSet);
        assert_eq!(rule.conditions[1].compare, BasicOp::BitsClear);
    }

    #[rstest]
    #[case("jump 1 2", 1, ParseErrorKind::UnknownStatement("jump".to_string()))]
    #[case("rule 1 2 when data9 == 1", 15, ParseErrorKind::UnknownField("data9".to_string()))]
    #[case("rule 1 2 when class => 1", 21, ParseErrorKind::UnknownOperator("=>".to_string()))]
    #[case("rule 1 2 when class == 2x", 24, ParseErrorKind::InvalidNumber("2x".to_string()))]
    #[case("rule 1 2 when class == 2 and", 29, ParseErrorKind::Missing("condition"))]
    #[case("rule 1 2 class == 2", 10, ParseErrorKind::Unexpected { expected: "'when'", found: "class".to_string() })]
    #[case("const 9X = 1", 7, ParseErrorKind::InvalidName("9X".to_string()))]
    #[case("const A = 1 2", 13, ParseErrorKind::Unexpected { expected: "end of line", found: "2".to_string() })]
    fn syntax_errors_carry_columns(
        #[case] line: &str,
        #[case] column: usize,
        #[case] kind: ParseErrorKind,
    ) {
        let error = parse_line(line).expect_err("line should be rejected");
        assert_eq!(error.kind, kind);
        assert_eq!(error.column, column);
    }
}
