//! The node graph of one parsed file
//!
//! A [`ParsedDocument`] owns every declaration and every name reference of a file in two
//! flat arenas. Nodes point at each other through [`DeclId`] and [`ExprId`] handles, so
//! the graph can be shared between threads and is never patched after construction:
//! new text produces a new document.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use solidity_parser::{
    ContractKind, FunctionKind, Identifier, Location, Mutability, StorageLocation, Visibility,
};
use tower_lsp::lsp_types::{CompletionItem, Position, Range};

use crate::convert::LineIndex;
use crate::state::SourceDocument;

mod builder;
pub mod info;
pub mod natspec;
mod types;

pub(crate) use builder::build;
pub use types::{DeclarationType, TypeShape, canonical_elementary};

/// Handle of a declaration inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

/// Handle of a name reference inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl DeclId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index.try_into().unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ExprId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index.try_into().unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct Declaration {
    pub id: DeclId,
    /// Empty for constructors, fallback and receive functions, unnamed parameters and
    /// imports without a unit alias.
    pub name: String,
    pub kind: DeclarationKind,
    pub location: Location,
    pub name_location: Option<Location>,
    pub parent: Option<DeclId>,
    pub children: Vec<DeclId>,
    pub(crate) completion: OnceLock<CompletionItem>,
    pub(crate) extension_completion: OnceLock<CompletionItem>,
}

#[derive(Debug)]
pub enum DeclarationKind {
    Contract {
        kind: ContractKind,
        /// Last segment of each inheritance specifier, in declaration order.
        bases: Vec<ExprId>,
    },
    Function(FunctionInfo),
    Struct,
    Event {
        anonymous: bool,
    },
    Error,
    Enum,
    EnumValue,
    CustomType {
        underlying: DeclarationType,
    },
    Variable(VariableInfo),
    Import(ImportInfo),
    Using(UsingInfo),
}

#[derive(Debug)]
pub struct FunctionInfo {
    pub kind: FunctionKind,
    pub parameters: Vec<DeclId>,
    pub returns: Vec<DeclId>,
    pub visibility: Option<Visibility>,
    pub mutability: Option<Mutability>,
    pub is_virtual: bool,
    pub overrides: bool,
    pub modifiers: Vec<ExprId>,
    pub body: Option<Location>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableRole {
    State,
    /// File-level constant.
    Constant,
    Parameter,
    Return,
    Local,
    StructMember,
    EventParameter,
    ErrorParameter,
}

#[derive(Debug)]
pub struct VariableInfo {
    pub ty: DeclarationType,
    pub role: VariableRole,
    pub storage: Option<StorageLocation>,
    pub visibility: Option<Visibility>,
    pub constant: bool,
    pub immutable: bool,
    pub indexed: bool,
    /// Range in which a local variable can be referenced.
    pub visible: Option<Location>,
}

#[derive(Debug)]
pub struct ImportInfo {
    pub specifier: String,
    /// Location of the quoted path.
    pub path_location: Location,
    /// Unit alias of `import "p" as X` and `import * as X from "p"`.
    pub alias: Option<Identifier>,
    pub symbols: Vec<ImportedSymbol>,
}

#[derive(Debug)]
pub struct ImportedSymbol {
    pub reference: ExprId,
    pub name: String,
    pub alias: Option<Identifier>,
}

impl ImportedSymbol {
    /// The name under which the symbol is visible in the importing file.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.alias.as_ref().map_or(&self.name, |alias| &alias.name)
    }
}

#[derive(Debug)]
pub struct UsingInfo {
    pub library: Option<ExprId>,
    pub functions: Vec<ExprId>,
    /// `None` for `using ... for *`.
    pub target: Option<DeclarationType>,
    pub global: bool,
}

impl Declaration {
    #[must_use]
    pub fn function(&self) -> Option<&FunctionInfo> {
        if let DeclarationKind::Function(info) = &self.kind {
            Some(info)
        } else {
            None
        }
    }

    #[must_use]
    pub fn variable(&self) -> Option<&VariableInfo> {
        if let DeclarationKind::Variable(info) = &self.kind {
            Some(info)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.function()
            .is_some_and(|f| f.kind == FunctionKind::Constructor)
    }

    #[must_use]
    pub fn is_contract(&self) -> bool {
        matches!(self.kind, DeclarationKind::Contract { .. })
    }

    /// Whether the declaration can be found by name from a scope. Imports and using
    /// directives are never found this way, nor are nameless declarations.
    #[must_use]
    pub fn is_named_member(&self) -> bool {
        !self.name.is_empty()
            && !matches!(
                self.kind,
                DeclarationKind::Import(_) | DeclarationKind::Using(_)
            )
    }

    /// Whether the declaration names a type.
    #[must_use]
    pub fn is_type(&self) -> bool {
        matches!(
            self.kind,
            DeclarationKind::Contract { .. }
                | DeclarationKind::Struct
                | DeclarationKind::Enum
                | DeclarationKind::CustomType { .. }
        )
    }
}

/// A name used in code: an identifier, a member access, or a segment of a type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExpression {
    pub id: ExprId,
    pub name: String,
    /// Location of the name itself.
    pub location: Location,
    pub kind: ReferenceKind,
    /// Set when the name is called, with the number of arguments.
    pub call: Option<CallSite>,
    /// The expression whose member this is: `a` in `a.b`.
    pub receiver: Option<ExprId>,
    /// Number of index accesses applied to the value of this expression.
    pub index_depth: usize,
    /// Innermost declaration enclosing the expression.
    pub scope: Option<DeclId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// A bare name looked up through the lexical scope.
    Identifier,
    /// A member looked up on the value of the receiver. A member without receiver
    /// belongs to an expression that is not a name, such as a literal.
    Member,
    /// The first segment of a user-defined type name.
    TypeName,
    /// An elementary type used as a value, such as `address` in `address(this)`.
    ElementaryType,
    /// A name inside the braces of `import {A, B as C} from "p"`.
    ImportedSymbol(DeclId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub arguments: usize,
    pub location: Location,
}

/// A line blanked out while recovering from a syntax error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub line: usize,
    pub location: Location,
    pub message: String,
}

/// Request-scoped view of what is under a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Enclosing declarations, outermost first.
    pub scopes: Vec<DeclId>,
    /// Declaration whose name is under the cursor.
    pub declaration: Option<DeclId>,
    /// Innermost name reference under the cursor.
    pub expression: Option<ExprId>,
    /// Import whose path string is under the cursor.
    pub import: Option<DeclId>,
}

impl Selection {
    #[must_use]
    pub fn innermost_scope(&self) -> Option<DeclId> {
        self.scopes.last().copied()
    }
}

#[derive(Debug)]
pub struct ParsedDocument {
    pub source: SourceDocument,
    pub line_index: LineIndex,
    declarations: Vec<Declaration>,
    expressions: Vec<ParsedExpression>,
    roots: Vec<DeclId>,
    pub syntax_issues: Vec<SyntaxIssue>,
}

impl ParsedDocument {
    /// A document without declarations, used when no part of the text could be parsed.
    #[must_use]
    pub fn empty(source: SourceDocument, syntax_issues: Vec<SyntaxIssue>) -> Self {
        Self {
            line_index: LineIndex::new(&source.text),
            source,
            declarations: Vec::new(),
            expressions: Vec::new(),
            roots: Vec::new(),
            syntax_issues,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Arc<Path> {
        &self.source.path
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.source.text
    }

    #[must_use]
    pub fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(id.index())
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    #[must_use]
    pub fn expression(&self, id: ExprId) -> Option<&ParsedExpression> {
        self.expressions.get(id.index())
    }

    #[must_use]
    pub fn expressions(&self) -> &[ParsedExpression] {
        &self.expressions
    }

    /// Top-level declarations in source order.
    pub fn roots(&self) -> impl Iterator<Item = &Declaration> {
        self.roots.iter().filter_map(|id| self.declaration(*id))
    }

    pub fn children(&self, id: DeclId) -> impl Iterator<Item = &Declaration> {
        self.declaration(id)
            .map(|d| d.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.declaration(*child))
    }

    pub fn contracts(&self) -> impl Iterator<Item = &Declaration> {
        self.roots().filter(|d| d.is_contract())
    }

    /// Free functions.
    pub fn functions(&self) -> impl Iterator<Item = &Declaration> {
        self.roots().filter(|d| d.function().is_some())
    }

    pub fn imports(&self) -> impl Iterator<Item = (&Declaration, &ImportInfo)> {
        self.roots().filter_map(|d| {
            if let DeclarationKind::Import(info) = &d.kind {
                Some((d, info))
            } else {
                None
            }
        })
    }

    pub fn usings(&self) -> impl Iterator<Item = (&Declaration, &UsingInfo)> {
        self.roots().filter_map(|d| {
            if let DeclarationKind::Using(info) = &d.kind {
                Some((d, info))
            } else {
                None
            }
        })
    }

    pub fn structs(&self) -> impl Iterator<Item = &Declaration> {
        self.roots()
            .filter(|d| matches!(d.kind, DeclarationKind::Struct))
    }

    pub fn enums(&self) -> impl Iterator<Item = &Declaration> {
        self.roots().filter(|d| matches!(d.kind, DeclarationKind::Enum))
    }

    pub fn events(&self) -> impl Iterator<Item = &Declaration> {
        self.roots()
            .filter(|d| matches!(d.kind, DeclarationKind::Event { .. }))
    }

    pub fn errors(&self) -> impl Iterator<Item = &Declaration> {
        self.roots().filter(|d| matches!(d.kind, DeclarationKind::Error))
    }

    pub fn custom_types(&self) -> impl Iterator<Item = &Declaration> {
        self.roots()
            .filter(|d| matches!(d.kind, DeclarationKind::CustomType { .. }))
    }

    pub fn constants(&self) -> impl Iterator<Item = &Declaration> {
        self.roots().filter(|d| d.variable().is_some())
    }

    /// Name references that are not inside any declaration.
    pub fn top_level_expressions(&self) -> impl Iterator<Item = &ParsedExpression> {
        self.expressions.iter().filter(|e| e.scope.is_none())
    }

    /// The function or modifier parameters, in declaration order.
    pub fn parameters<'a>(&'a self, function: &'a FunctionInfo) -> impl Iterator<Item = &'a Declaration> {
        function.parameters.iter().filter_map(|id| self.declaration(*id))
    }

    pub fn returns<'a>(&'a self, function: &'a FunctionInfo) -> impl Iterator<Item = &'a Declaration> {
        function.returns.iter().filter_map(|id| self.declaration(*id))
    }

    /// The contract a declaration belongs to, or the declaration itself when it is one.
    #[must_use]
    pub fn enclosing_contract(&self, id: DeclId) -> Option<&Declaration> {
        let mut current = Some(id);
        while let Some(id) = current {
            let declaration = self.declaration(id)?;
            if declaration.is_contract() {
                return Some(declaration);
            }
            current = declaration.parent;
        }
        None
    }

    /// The most specific declaration whose range contains `offset`.
    #[must_use]
    pub fn selected_item(&self, offset: usize) -> Option<&Declaration> {
        self.select(offset)
            .scopes
            .last()
            .and_then(|id| self.declaration(*id))
    }

    /// Describe what is under `offset`.
    ///
    /// Descends depth-first through the declarations in source order; each level keeps
    /// the first child whose range contains the offset.
    #[must_use]
    pub fn select(&self, offset: usize) -> Selection {
        let mut selection = Selection::default();
        let mut level: &[DeclId] = &self.roots;
        loop {
            let Some(found) = level
                .iter()
                .filter_map(|id| self.declaration(*id))
                .find(|d| d.location.contains(offset))
            else {
                break;
            };
            selection.scopes.push(found.id);
            if found.name_location.is_some_and(|l| l.contains(offset)) {
                selection.declaration = Some(found.id);
            }
            if let DeclarationKind::Import(info) = &found.kind
                && info.path_location.contains(offset)
            {
                selection.import = Some(found.id);
            }
            level = &found.children;
        }
        selection.expression = self
            .expressions
            .iter()
            .filter(|e| e.location.contains(offset) && e.kind != ReferenceKind::ElementaryType)
            .min_by_key(|e| e.location.len())
            .map(|e| e.id);
        if selection.expression.is_some() {
            selection.declaration = None;
        }
        selection
    }

    /// Byte offset of an editor position, measured on the text the editor sent.
    #[must_use]
    pub fn offset_at(&self, position: Position) -> Option<usize> {
        self.line_index.offset(&self.source.unformatted_text, position)
    }

    #[must_use]
    pub fn range_of(&self, location: &Location) -> Range {
        self.line_index.range(&self.source.unformatted_text, location)
    }

    /// Text covered by `location`.
    #[must_use]
    pub fn slice(&self, location: &Location) -> &str {
        self.text().get(location.start..location.end).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Origin, SourceDocument};
    use pretty_assertions::assert_eq;

    #[allow(clippy::expect_used)]
    fn parse(text: &str) -> ParsedDocument {
        let source = SourceDocument::new(Path::new("/p/A.sol"), text, Origin::Editor);
        let unit = solidity_parser::parse(text).expect("valid solidity");
        build(source, &unit, Vec::new())
    }

    const TEXT: &str = "\
import \"./B.sol\";

struct Point { uint256 x; uint256 y; }

contract Token is Base {
    mapping(address => uint256) balances;

    constructor(uint256 x) {}

    function transfer(address to, uint256 amount) public returns (bool) {
        uint256 balance = balances[msg.sender];
        return balance >= amount;
    }
}
";

    #[test]
    fn test_collections() {
        let document = parse(TEXT);
        assert_eq!(document.imports().count(), 1);
        assert_eq!(document.structs().count(), 1);
        let names: Vec<_> = document.contracts().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Token"]);
        assert_eq!(document.functions().count(), 0);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_constructor_detection() {
        let document = parse(TEXT);
        let constructor = document
            .declarations()
            .find(|d| d.is_constructor())
            .expect("constructor");
        assert_eq!(constructor.name, "");
        let info = constructor.function().expect("function");
        let parameters: Vec<_> = document.parameters(info).map(|p| p.name.as_str()).collect();
        assert_eq!(parameters, vec!["x"]);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_select_nests_declarations() {
        let document = parse(TEXT);
        let offset = TEXT.find("balance =").expect("local");
        let selection = document.select(offset);
        let names: Vec<_> = selection
            .scopes
            .iter()
            .filter_map(|id| document.declaration(*id))
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["Token", "transfer", "balance"]);
        assert_eq!(
            selection.declaration.and_then(|id| document.declaration(id)).map(|d| d.name.as_str()),
            Some("balance")
        );
        assert_eq!(selection.expression, None);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_select_prefers_innermost_expression() {
        let document = parse(TEXT);
        let offset = TEXT.find("sender").expect("member");
        let selection = document.select(offset);
        let expression = selection
            .expression
            .and_then(|id| document.expression(id))
            .expect("expression");
        assert_eq!(expression.name, "sender");
        assert_eq!(expression.kind, ReferenceKind::Member);
        let receiver = expression
            .receiver
            .and_then(|id| document.expression(id))
            .expect("receiver");
        assert_eq!(receiver.name, "msg");
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_select_import_path() {
        let document = parse(TEXT);
        let selection = document.select(TEXT.find("B.sol").expect("path"));
        assert!(selection.import.is_some());
    }
}
