//! Syntax tree produced by the grammar.
//!
//! Every node carries a [`Location`] byte range. Node kinds are closed enums so that
//! consumers match them exhaustively.

use serde::Serialize;

mod expression;
mod location;
mod statement;

pub(crate) use expression::PostfixOperation;
pub use expression::{
    AssignmentOperator, BinaryOperator, CallArguments, Expression, ExpressionKind, Literal,
    NamedArgument, UnaryOperator,
};
pub use location::Location;
pub use statement::{Block, CatchClause, Statement};

/// An identifier with its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub name: String,
    pub location: Location,
}

/// A dotted identifier path such as `Lib.Struct`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierPath {
    pub identifiers: Vec<Identifier>,
    pub location: Location,
}

impl IdentifierPath {
    /// The last segment of the path, which names the referenced entity.
    #[must_use]
    pub fn last(&self) -> Option<&Identifier> {
        self.identifiers.last()
    }
}

impl std::fmt::Display for IdentifierPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for identifier in &self.identifiers {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", identifier.name)?;
            first = false;
        }
        Ok(())
    }
}

/// A parsed Solidity file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceUnit {
    pub parts: Vec<SourceUnitPart>,
    pub location: Location,
}

/// Top-level declarations of a source unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SourceUnitPart {
    Pragma(PragmaDirective),
    Import(ImportDirective),
    Contract(ContractDefinition),
    Function(FunctionDefinition),
    Constant(VariableDefinition),
    Event(EventDefinition),
    Enum(EnumDefinition),
    Struct(StructDefinition),
    Type(TypeDefinition),
    Error(ErrorDefinition),
    Using(UsingDirective),
    StraySemicolon(Location),
}

impl SourceUnitPart {
    #[must_use]
    pub fn location(&self) -> &Location {
        match self {
            Self::Pragma(p) => &p.location,
            Self::Import(i) => &i.location,
            Self::Contract(c) => &c.location,
            Self::Function(f) => &f.location,
            Self::Constant(c) => &c.location,
            Self::Event(e) => &e.location,
            Self::Enum(e) => &e.location,
            Self::Struct(s) => &s.location,
            Self::Type(t) => &t.location,
            Self::Error(e) => &e.location,
            Self::Using(u) => &u.location,
            Self::StraySemicolon(location) => location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PragmaDirective {
    pub name: String,
    pub value: String,
    pub location: Location,
}

/// A string literal with the location of the quoted text (quotes included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringLiteral {
    pub value: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportDirective {
    pub path: StringLiteral,
    pub kind: ImportKind,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImportKind {
    /// `import "path";`, `import "path" as X;` or `import * as X from "path";`
    Plain { alias: Option<Identifier> },
    /// `import {A, B as C} from "path";`
    Symbols(Vec<ImportSymbol>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSymbol {
    pub name: Identifier,
    pub alias: Option<Identifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContractKind {
    Contract,
    AbstractContract,
    Interface,
    Library,
}

impl std::fmt::Display for ContractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Contract => "contract",
            Self::AbstractContract => "abstract contract",
            Self::Interface => "interface",
            Self::Library => "library",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractDefinition {
    pub kind: ContractKind,
    pub name: Identifier,
    pub bases: Vec<InheritanceSpecifier>,
    pub parts: Vec<ContractPart>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InheritanceSpecifier {
    pub name: IdentifierPath,
    pub arguments: Option<Vec<Expression>>,
    pub location: Location,
}

/// Members of a contract, interface or library body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ContractPart {
    Function(FunctionDefinition),
    StateVariable(VariableDefinition),
    Struct(StructDefinition),
    Enum(EnumDefinition),
    Event(EventDefinition),
    Error(ErrorDefinition),
    Using(UsingDirective),
    Type(TypeDefinition),
    StraySemicolon(Location),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Visibility {
    Public,
    Private,
    Internal,
    External,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Internal => "internal",
            Self::External => "external",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mutability {
    Pure,
    View,
    Payable,
    Constant,
}

impl std::fmt::Display for Mutability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pure => "pure",
            Self::View => "view",
            Self::Payable => "payable",
            Self::Constant => "constant",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StorageLocation {
    Memory,
    Storage,
    Calldata,
}

impl std::fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Storage => "storage",
            Self::Calldata => "calldata",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VariableAttribute {
    Visibility(Visibility),
    Constant,
    Immutable,
    Transient,
    Override(Vec<IdentifierPath>),
}

/// State variable or file-level constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDefinition {
    pub ty: TypeName,
    pub attributes: Vec<VariableAttribute>,
    pub name: Identifier,
    pub initializer: Option<Expression>,
    pub location: Location,
}

/// Parameter, return value, struct member, local variable or error parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub ty: TypeName,
    pub storage: Option<StorageLocation>,
    pub name: Option<Identifier>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionKind {
    Function,
    Constructor,
    Fallback,
    Receive,
    Modifier,
}

impl std::fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Function => "function",
            Self::Constructor => "constructor",
            Self::Fallback => "fallback",
            Self::Receive => "receive",
            Self::Modifier => "modifier",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifierInvocation {
    pub name: IdentifierPath,
    pub arguments: Option<Vec<Expression>>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FunctionAttribute {
    Visibility(Visibility),
    Mutability(Mutability),
    Virtual,
    Override(Vec<IdentifierPath>),
    Modifier(ModifierInvocation),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub kind: FunctionKind,
    pub name: Option<Identifier>,
    pub parameters: Vec<VariableDeclaration>,
    pub attributes: Vec<FunctionAttribute>,
    pub returns: Vec<VariableDeclaration>,
    pub body: Option<Block>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructDefinition {
    pub name: Identifier,
    pub members: Vec<VariableDeclaration>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDefinition {
    pub name: Identifier,
    pub values: Vec<Identifier>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventParameter {
    pub ty: TypeName,
    pub indexed: bool,
    pub name: Option<Identifier>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDefinition {
    pub name: Identifier,
    pub parameters: Vec<EventParameter>,
    pub anonymous: bool,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDefinition {
    pub name: Identifier,
    pub parameters: Vec<VariableDeclaration>,
    pub location: Location,
}

/// User-defined value type: `type Price is uint256;`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDefinition {
    pub name: Identifier,
    pub ty: TypeName,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsingFunction {
    pub path: IdentifierPath,
    pub operator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UsingTarget {
    Library(IdentifierPath),
    Functions(Vec<UsingFunction>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsingDirective {
    pub target: UsingTarget,
    /// `None` stands for `for *`.
    pub ty: Option<TypeName>,
    pub global: bool,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeName {
    pub kind: TypeNameKind,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeNameKind {
    /// `uint256`, `address payable`, `bytes32`, ...
    Elementary(String),
    UserDefined(IdentifierPath),
    Mapping {
        key: Box<TypeName>,
        key_name: Option<Identifier>,
        value: Box<TypeName>,
        value_name: Option<Identifier>,
    },
    Array {
        base: Box<TypeName>,
        length: Option<Box<Expression>>,
    },
    Function {
        parameters: Vec<VariableDeclaration>,
        attributes: Vec<FunctionAttribute>,
        returns: Vec<VariableDeclaration>,
    },
}

/// Whether `word` names an elementary type (`uint8`, `bytes32`, `address`, ...).
#[must_use]
pub fn is_elementary_type(word: &str) -> bool {
    match word {
        "address" | "bool" | "string" | "bytes" | "byte" | "int" | "uint" | "fixed"
        | "ufixed" => true,
        _ => {
            if let Some(size) = word.strip_prefix("bytes") {
                return size
                    .parse::<u16>()
                    .is_ok_and(|n| (1..=32).contains(&n) && !size.starts_with('0'));
            }
            let bits = word
                .strip_prefix("uint")
                .or_else(|| word.strip_prefix("int"));
            if let Some(bits) = bits {
                return bits
                    .parse::<u16>()
                    .is_ok_and(|n| n % 8 == 0 && (8..=256).contains(&n) && !bits.starts_with('0'));
            }
            let fixed = word
                .strip_prefix("ufixed")
                .or_else(|| word.strip_prefix("fixed"));
            fixed.is_some_and(|rest| {
                rest.split_once('x').is_some_and(|(m, n)| {
                    !m.is_empty()
                        && !n.is_empty()
                        && m.bytes().all(|b| b.is_ascii_digit())
                        && n.bytes().all(|b| b.is_ascii_digit())
                })
            })
        }
    }
}

/// Words that can never be used as identifiers.
pub(crate) const RESERVED_WORDS: &[&str] = &[
    "abstract",
    "after",
    "alias",
    "anonymous",
    "apply",
    "assembly",
    "auto",
    "break",
    "calldata",
    "case",
    "catch",
    "constant",
    "constructor",
    "continue",
    "contract",
    "copyof",
    "default",
    "define",
    "delete",
    "do",
    "else",
    "emit",
    "enum",
    "event",
    "external",
    "fallback",
    "false",
    "final",
    "for",
    "function",
    "if",
    "immutable",
    "implements",
    "import",
    "in",
    "indexed",
    "inline",
    "interface",
    "internal",
    "is",
    "let",
    "library",
    "macro",
    "mapping",
    "match",
    "memory",
    "modifier",
    "mutable",
    "new",
    "null",
    "of",
    "override",
    "partial",
    "payable",
    "pragma",
    "private",
    "promise",
    "public",
    "pure",
    "receive",
    "reference",
    "relocatable",
    "return",
    "returns",
    "sealed",
    "sizeof",
    "static",
    "storage",
    "struct",
    "supports",
    "switch",
    "true",
    "try",
    "type",
    "typedef",
    "typeof",
    "unchecked",
    "using",
    "var",
    "view",
    "virtual",
    "while",
];

/// Whether `word` is reserved and cannot name a declaration.
#[must_use]
pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.binary_search(&word).is_ok() || is_elementary_type(word)
}
