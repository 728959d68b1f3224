//! Constant table: first pass over the parsed lines.

use std::collections::HashMap;

use crate::errors::SymbolErrorKind;
use crate::parser::{parse_field, ParsedLine, Value, KEYWORDS};

/// A `const` with the line that defined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant {
    /// Resolved value.
    pub value: u32,
    /// Source line of the definition.
    pub defined_at: usize,
}

/// Constant names to definitions.
pub type ConstTable = HashMap<String, Constant>;

/// Constant error tied to a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolError {
    /// Kind of error.
    pub kind: SymbolErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Collects every `const` in source order.
///
/// A constant may refer to one defined on an earlier line. All problems are
/// reported, not just the first.
#[must_use]
pub fn collect_constants(lines: &[(usize, ParsedLine)]) -> (ConstTable, Vec<SymbolError>) {
    let mut table = ConstTable::new();
    let mut errors = Vec::new();

    for (line, parsed) in lines {
        let ParsedLine::Const { name, value } = parsed else {
            continue;
        };
        if is_reserved(name) {
            errors.push(SymbolError {
                kind: SymbolErrorKind::ReservedName(name.clone()),
                line: *line,
            });
            continue;
        }
        if let Some(existing) = table.get(name) {
            errors.push(SymbolError {
                kind: SymbolErrorKind::DuplicateConstant {
                    name: name.clone(),
                    first_definition: existing.defined_at,
                },
                line: *line,
            });
            continue;
        }
        match resolve(&table, value) {
            Ok(value) => {
                table.insert(
                    name.clone(),
                    Constant {
                        value,
                        defined_at: *line,
                    },
                );
            }
            Err(kind) => errors.push(SymbolError { kind, line: *line }),
        }
    }

    (table, errors)
}

/// Resolves a literal or constant reference.
///
/// # Errors
///
/// [`SymbolErrorKind::UndefinedConstant`] for unknown names.
pub fn resolve(table: &ConstTable, value: &Value) -> Result<u32, SymbolErrorKind> {
    match value {
        Value::Number(number) => Ok(*number),
        Value::Symbol(name) => table
            .get(name)
            .map(|constant| constant.value)
            .ok_or_else(|| SymbolErrorKind::UndefinedConstant(name.clone())),
    }
}

/// Resolves a value that must fit one byte.
///
/// # Errors
///
/// Undefined names and values above `0xFF`.
pub fn resolve_byte(table: &ConstTable, value: &Value) -> Result<u8, SymbolErrorKind> {
    let resolved = resolve(table, value)?;
    u8::try_from(resolved).map_err(|_| SymbolErrorKind::ByteOutOfRange { value: resolved })
}

fn is_reserved(name: &str) -> bool {
    KEYWORDS.iter().any(|keyword| keyword.eq_ignore_ascii_case(name)) || parse_field(name).is_some()
}
