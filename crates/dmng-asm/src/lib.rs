//! Text assembler and dump tool for VSCP DM-NG rule byte-code.

/// Parse, constant resolution and encoding pipeline.
pub mod assembler;
/// Located error types and multi-error collection.
pub mod errors;
/// Line parser for `const` and `rule` statements.
pub mod parser;
/// Constant table.
pub mod symbols;

pub use assembler::{assemble, assemble_source, Assembly, ListingEntry, DEFAULT_CAPACITY};
pub use errors::{AssemblerError, AssemblerErrorKind, ErrorCollection, SourceLoc};

#[cfg(test)]
use tempfile as _;
