//! Solidity parser using a PEG grammar.
//!
//! The parser produces a [`SourceUnit`] syntax tree in which every node carries its byte
//! [`Location`]. It is tolerant of everything the language server needs to look at
//! (contracts, functions, statements and expressions) but performs no semantic analysis.
//!
//! ```
//! let unit = solidity_parser::parse("contract A { uint256 public x; }").unwrap();
//! assert_eq!(unit.parts.len(), 1);
//! ```
use std::path::Path;

use tracing::instrument;

mod error;
mod grammar;
mod model;

pub use error::Error;
pub use model::{
    AssignmentOperator, BinaryOperator, Block, CallArguments, CatchClause, ContractDefinition,
    ContractKind, ContractPart, EnumDefinition, ErrorDefinition, EventDefinition, EventParameter,
    Expression, ExpressionKind, FunctionAttribute, FunctionDefinition, FunctionKind, Identifier,
    IdentifierPath, ImportDirective, ImportKind, ImportSymbol, InheritanceSpecifier, Literal,
    Location, ModifierInvocation, Mutability, NamedArgument, PragmaDirective, SourceUnit,
    SourceUnitPart, Statement, StorageLocation, StringLiteral, StructDefinition, TypeDefinition,
    TypeName, TypeNameKind, UnaryOperator, UsingDirective, UsingFunction, UsingTarget,
    VariableAttribute, VariableDeclaration, VariableDefinition, Visibility, is_elementary_type,
    is_reserved,
};

/// Parse Solidity source text into a [`SourceUnit`].
///
/// # Errors
/// Returns [`Error::ParseGrammar`] with the furthest position the grammar reached when
/// the input is not syntactically valid.
#[instrument(skip(input), fields(len = input.len()))]
pub fn parse(input: &str) -> Result<SourceUnit, Error> {
    match grammar::solidity_parser::source_unit(input) {
        Ok(unit) => Ok(unit),
        Err(e) => {
            tracing::debug!(line = e.location.line, column = e.location.column, "syntax error");
            Err(e.into())
        }
    }
}

/// Read a file from disk and parse it.
///
/// # Errors
/// Returns [`Error::Io`] when the file cannot be read and [`Error::ParseGrammar`] when
/// it cannot be parsed.
#[instrument(skip(file_path))]
pub fn parse_file<P: AsRef<Path>>(file_path: P) -> Result<SourceUnit, Error> {
    let input = std::fs::read_to_string(file_path)?;
    parse(&input)
}

/// Parse a single expression. Used for completion and signature help on partial input.
///
/// # Errors
/// Returns [`Error::ParseGrammar`] when `input` is not one complete expression.
pub fn parse_expression(input: &str) -> Result<Expression, Error> {
    Ok(grammar::solidity_parser::expression(input)?)
}
