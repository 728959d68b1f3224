//! Assembly pipeline.
//!
//! 1. **Parse**: every line, collecting all syntax errors
//! 2. **Constants**: build the `const` table
//! 3. **Encode**: resolve operands and encode each rule with
//!    [`vscp_node::dmng::encode`], then check the ruleset against the
//!    DM-NG capacity
//!
//! The entry points are [`assemble`] for files and [`assemble_source`] for
//! in-memory text.

use std::fs;
use std::path::Path;

use vscp_node::dmng::encode::encode_rule;
use vscp_node::dmng::encode_ruleset;
use vscp_node::{Condition, Rule};

use crate::errors::{AssemblerError, AssemblerErrorKind, ErrorCollection};
use crate::parser::{parse_line, ParsedLine, RuleLine};
use crate::symbols::{collect_constants, resolve, resolve_byte, ConstTable};

/// DM-NG storage size assumed when none is given.
pub const DEFAULT_CAPACITY: usize = 64;

/// One encoded rule of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Offset of the rule's length byte in the ruleset.
    pub offset: usize,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// Source line number.
    pub line: usize,
    /// Source text without the comment.
    pub source: String,
}

/// Output of a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Ruleset bytes, count byte first.
    pub binary: Vec<u8>,
    /// Typed rules in source order.
    pub rules: Vec<Rule>,
    /// Per-rule listing.
    pub listing: Vec<ListingEntry>,
}

/// Assembles the rule file at `path`.
///
/// # Errors
///
/// Returns every error found, each with its `file:line` location where one
/// applies.
pub fn assemble(path: &Path, capacity: usize) -> Result<Assembly, ErrorCollection> {
    let source = fs::read_to_string(path).map_err(|e| {
        AssemblerError::new(AssemblerErrorKind::Io(format!(
            "{}: {e}",
            path.display()
        )))
    })?;
    assemble_source(&source, path, capacity)
}

/// Assembles rule source text; `file` only labels error locations.
///
/// # Errors
///
/// See [`assemble`].
pub fn assemble_source(
    source: &str,
    file: &Path,
    capacity: usize,
) -> Result<Assembly, ErrorCollection> {
    let mut errors = ErrorCollection::new();
    let located = |kind, line| AssemblerError::at(kind, file.to_path_buf(), line);

    let mut lines = Vec::new();
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        match parse_line(text) {
            Ok(parsed) => lines.push((line, parsed)),
            Err(e) => errors.push(located(AssemblerErrorKind::Parse(e.kind), line)),
        }
    }

    let (table, symbol_errors) = collect_constants(&lines);
    for e in symbol_errors {
        errors.push(located(AssemblerErrorKind::Symbol(e.kind), e.line));
    }

    let mut rules = Vec::new();
    let mut listing = Vec::new();
    let mut offset = 1;
    for (line, parsed) in &lines {
        let ParsedLine::Rule(rule_line) = parsed else {
            continue;
        };
        let rule = match build_rule(&table, rule_line) {
            Ok(rule) => rule,
            Err(kind) => {
                errors.push(located(kind, *line));
                continue;
            }
        };
        match encode_rule(rules.len(), &rule) {
            Ok(bytes) => {
                let source = source
                    .lines()
                    .nth(line - 1)
                    .map(|text| text.split(';').next().unwrap_or_default().trim())
                    .unwrap_or_default()
                    .to_string();
                let len = bytes.len();
                listing.push(ListingEntry {
                    offset,
                    bytes,
                    line: *line,
                    source,
                });
                offset += len;
                rules.push(rule);
            }
            Err(e) => errors.push(located(AssemblerErrorKind::Encode(e), *line)),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let binary = encode_ruleset(&rules, capacity)
        .map_err(|e| AssemblerError::new(AssemblerErrorKind::Encode(e)))?;
    Ok(Assembly {
        binary,
        rules,
        listing,
    })
}

fn build_rule(table: &ConstTable, line: &RuleLine) -> Result<Rule, AssemblerErrorKind> {
    let action = resolve_byte(table, &line.action).map_err(AssemblerErrorKind::Symbol)?;
    let param = resolve_byte(table, &line.param).map_err(AssemblerErrorKind::Symbol)?;
    let conditions = line
        .conditions
        .iter()
        .map(|term| {
            resolve(table, &term.operand).map(|operand| Condition {
                logic: term.logic,
                compare: term.compare,
                param: term.param,
                operand,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(AssemblerErrorKind::Symbol)?;
    Ok(Rule {
        action,
        param,
        conditions,
    })
}
