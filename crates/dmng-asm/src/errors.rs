//! Error reporting for the rule assembler.
//!
//! Every error renders in the usual compiler style:
//! ```text
//! lamp.rules:4: error: unknown field: data9
//! ```

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use vscp_node::EncodeError;

/// Line of a rule source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    /// File path.
    pub file: PathBuf,
    /// 1-indexed line number.
    pub line: usize,
}

impl SourceLoc {
    /// Creates a new source location.
    #[must_use]
    pub const fn new(file: PathBuf, line: usize) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Syntax problems found while splitting a line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Line starts with something other than `const` or `rule`.
    #[error("unknown statement: {0}")]
    UnknownStatement(String),
    /// Event field name not recognised or payload offset out of range.
    #[error("unknown field: {0}")]
    UnknownField(String),
    /// Comparison operator not recognised.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    /// Malformed numeric literal.
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    /// Constant name that is not an identifier.
    #[error("invalid constant name: {0}")]
    InvalidName(String),
    /// Token other than the one the grammar needs here.
    #[error("expected {expected}, found {found}")]
    Unexpected {
        /// What the grammar needs.
        expected: &'static str,
        /// Token found instead.
        found: String,
    },
    /// Line ended early.
    #[error("expected {0}")]
    Missing(&'static str),
}

/// Parse error with its 1-indexed column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    /// Column of the offending token.
    pub column: usize,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

/// Constant table problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolErrorKind {
    /// Constant defined twice.
    #[error("duplicate constant: {name} (first defined on line {first_definition})")]
    DuplicateConstant {
        /// Constant name.
        name: String,
        /// Line of the first definition.
        first_definition: usize,
    },
    /// Name used but never defined.
    #[error("undefined constant: {0}")]
    UndefinedConstant(String),
    /// Constant named after a keyword or field.
    #[error("reserved name: {0}")]
    ReservedName(String),
    /// Action or parameter wider than one byte.
    #[error("value {value:#x} does not fit a byte")]
    ByteOutOfRange {
        /// Resolved value.
        value: u32,
    },
}

/// Assembler error classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerErrorKind {
    /// Syntax error.
    #[error("{0}")]
    Parse(ParseErrorKind),
    /// Constant resolution error.
    #[error("{0}")]
    Symbol(SymbolErrorKind),
    /// Byte-code encoding error.
    #[error("{0}")]
    Encode(EncodeError),
    /// Reading the source or writing the output failed.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Assembler error with an optional location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerError {
    /// The kind of error.
    pub kind: AssemblerErrorKind,
    /// Source location if available.
    pub location: Option<SourceLoc>,
}

impl AssemblerError {
    /// Creates an error without a location.
    #[must_use]
    pub const fn new(kind: AssemblerErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    /// Creates an error pointing at `line` of `file`.
    #[must_use]
    pub fn at(kind: AssemblerErrorKind, file: PathBuf, line: usize) -> Self {
        Self {
            kind,
            location: Some(SourceLoc::new(file, line)),
        }
    }

    /// Formats the error for stderr output.
    #[must_use]
    pub fn format_for_stderr(&self) -> String {
        self.location.as_ref().map_or_else(
            || format!("error: {}", self.kind),
            |loc| format!("{loc}: error: {}", self.kind),
        )
    }
}

impl fmt::Display for AssemblerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for AssemblerError {}

/// Every error of one assembly run, in source order.
#[derive(Debug, Clone, Default)]
pub struct ErrorCollection {
    errors: Vec<AssemblerError>,
}

impl ErrorCollection {
    /// Creates an empty error collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Adds an error to the collection.
    pub fn push(&mut self, error: AssemblerError) {
        self.errors.push(error);
    }

    /// Returns true if the collection is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns an iterator over the errors.
    pub fn iter(&self) -> impl Iterator<Item = &AssemblerError> {
        self.errors.iter()
    }

    /// Returns the first error, if any.
    #[must_use]
    pub fn first(&self) -> Option<&AssemblerError> {
        self.errors.first()
    }

    /// Formats all errors for stderr output, one per line.
    #[must_use]
    pub fn format_for_stderr(&self) -> String {
        self.errors
            .iter()
            .map(AssemblerError::format_for_stderr)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<AssemblerError> for ErrorCollection {
    fn from(error: AssemblerError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ErrorCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}
