//! Name resolution across documents
//!
//! A bare name is looked up through its lexical scope: locals and parameters of the
//! enclosing function, the enclosing contract and its bases (most derived first), the
//! document, and then the documents it imports in declaration order. The first match
//! wins. A member name is looked up on the value of its receiver, and falls back to the
//! `using ... for` directives that apply to that value.
//!
//! Results are memoized in the cache entry that owns the expression. A memoized
//! declaration is reused only while its document is still the one in the snapshot.

use std::cell::Cell;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashSet;
use solidity_parser::{FunctionKind, Location};

use crate::builtins::{self, Builtin, BuiltinKind, BuiltinValue};
use crate::model::{
    DeclId, Declaration, DeclarationKind, DeclarationType, ExprId, ParsedDocument,
    ReferenceKind, TypeShape, VariableRole, canonical_elementary,
};
use crate::state::Snapshot;

mod abi;

pub use abi::abi_signature;

const MAX_DEPTH: usize = 64;

/// A declaration in a specific version of a document.
#[derive(Debug, Clone)]
pub struct DeclRef {
    pub document: Arc<ParsedDocument>,
    pub id: DeclId,
}

impl DeclRef {
    #[must_use]
    pub fn new(document: &Arc<ParsedDocument>, id: DeclId) -> Self {
        Self {
            document: Arc::clone(document),
            id,
        }
    }

    #[must_use]
    pub fn declaration(&self) -> Option<&Declaration> {
        self.document.declaration(self.id)
    }

    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.document, &other.document)
    }

    fn key(&self) -> (usize, DeclId) {
        (Arc::as_ptr(&self.document).addr(), self.id)
    }

    fn parameter_count(&self) -> Option<usize> {
        let declaration = self.declaration()?;
        match &declaration.kind {
            DeclarationKind::Function(info) => Some(info.parameters.len()),
            DeclarationKind::Event { .. } | DeclarationKind::Error | DeclarationKind::Struct => {
                Some(declaration.children.len())
            }
            DeclarationKind::Contract { .. }
            | DeclarationKind::Enum
            | DeclarationKind::EnumValue
            | DeclarationKind::CustomType { .. }
            | DeclarationKind::Variable(_)
            | DeclarationKind::Import(_)
            | DeclarationKind::Using(_) => None,
        }
    }
}

/// What a name reference points at.
#[derive(Debug, Clone)]
pub enum Resolved {
    Declaration(DeclRef),
    /// A global or member without a source location.
    Builtin(&'static Builtin),
}

impl Resolved {
    #[must_use]
    pub fn as_declaration(&self) -> Option<&DeclRef> {
        if let Self::Declaration(declaration) = self {
            Some(declaration)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_declaration(self) -> Option<DeclRef> {
        if let Self::Declaration(declaration) = self {
            Some(declaration)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Declaration(a), Self::Declaration(b)) => a.is_same(b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Declaration(_), Self::Builtin(_)) | (Self::Builtin(_), Self::Declaration(_)) => {
                false
            }
        }
    }
}

/// What is under a cursor.
#[derive(Debug, Clone)]
pub enum Target {
    Resolved(Resolved),
    /// The file named by an import path.
    Document(Arc<Path>),
}

/// The value produced by an expression, described by what its members are.
#[derive(Debug, Clone)]
pub enum TypeTarget {
    /// A value of a contract, struct, enum or user-defined value type.
    Instance(DeclRef),
    /// The type name itself, as in `Token.Transfer` or `State.Open`.
    Static(DeclRef),
    /// `super` inside the given contract.
    Super(DeclRef),
    /// The unit alias of an import.
    Namespace(Arc<Path>),
    /// A mapping, array or function type declared in `document`.
    Typed {
        document: Arc<ParsedDocument>,
        ty: DeclarationType,
    },
    Elementary(String),
    Members(&'static [Builtin]),
}

/// A candidate offered after a `.` or in a scope.
#[derive(Debug, Clone)]
pub enum Member {
    Declaration(DeclRef),
    Builtin(&'static Builtin),
    /// A library function attached through `using ... for`.
    Extension(DeclRef),
}

impl Member {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Declaration(r) | Self::Extension(r) => {
                r.declaration().map_or("", |d| d.name.as_str())
            }
            Self::Builtin(builtin) => builtin.name,
        }
    }
}

/// A place in a document that refers to a declaration.
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub document: Arc<ParsedDocument>,
    pub location: Location,
}

/// One link of a textual member chain such as `token.balances[owner].`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub called: bool,
    pub index_depth: usize,
}

/// Request-scoped resolution over one snapshot of the cache.
#[derive(Debug)]
pub struct Resolver<'s> {
    snapshot: &'s Snapshot,
    depth: Cell<usize>,
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

type Visited = FxHashSet<Arc<Path>>;

impl<'s> Resolver<'s> {
    #[must_use]
    pub fn new(snapshot: &'s Snapshot) -> Self {
        Self {
            snapshot,
            depth: Cell::new(0),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &'s Snapshot {
        self.snapshot
    }

    fn enter(&self) -> Option<DepthGuard<'_>> {
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            tracing::debug!("resolution depth exceeded");
            return None;
        }
        self.depth.set(depth + 1);
        Some(DepthGuard(&self.depth))
    }

    fn document(&self, path: &Path) -> Option<Arc<ParsedDocument>> {
        self.snapshot.get(path).map(|cached| Arc::clone(&cached.parsed))
    }

    fn is_current(&self, resolved: Option<&Resolved>) -> bool {
        match resolved {
            Some(Resolved::Declaration(r)) => self.snapshot.current(&r.document).is_some(),
            Some(Resolved::Builtin(_)) | None => true,
        }
    }

    /// The declaration the expression `id` of `document` refers to.
    #[must_use]
    pub fn resolve(&self, document: &Arc<ParsedDocument>, id: ExprId) -> Option<Resolved> {
        let cell = self
            .snapshot
            .current(document)
            .and_then(|cached| cached.resolutions.get(id.index()));
        if let Some(memo) = cell.and_then(OnceLock::get)
            && self.is_current(memo.as_ref())
        {
            return memo.clone();
        }
        let _guard = self.enter()?;
        let resolved = self.compute(document, id);
        if let Some(cell) = cell {
            // A stale value stays in place and is recomputed on every access.
            let _ = cell.set(resolved.clone());
        }
        resolved
    }

    fn compute(&self, document: &Arc<ParsedDocument>, id: ExprId) -> Option<Resolved> {
        let expression = document.expression(id)?;
        let arity = expression.call.map(|call| call.arguments);
        if let Some(receiver) = expression.receiver {
            let target = self.value_target(document, receiver)?;
            return self.lookup_member(document, expression.scope, &target, &expression.name, arity);
        }
        match expression.kind {
            ReferenceKind::Identifier | ReferenceKind::TypeName => self.lookup_name(
                document,
                expression.scope,
                expression.location.start,
                &expression.name,
                arity,
            ),
            ReferenceKind::Member | ReferenceKind::ElementaryType => None,
            ReferenceKind::ImportedSymbol(import) => {
                let target = self.import_target(document, import)?;
                self.lookup_in_document(&target, &expression.name, arity, &mut Visited::default())
            }
        }
    }

    /// Look `name` up from `scope` at `offset`.
    #[must_use]
    pub fn lookup_name(
        &self,
        document: &Arc<ParsedDocument>,
        scope: Option<DeclId>,
        offset: usize,
        name: &str,
        arity: Option<usize>,
    ) -> Option<Resolved> {
        let mut current = scope;
        while let Some(id) = current {
            let declaration = document.declaration(id)?;
            if declaration.function().is_some()
                && let Some(found) = declaration
                    .children
                    .iter()
                    .rev()
                    .filter_map(|child| document.declaration(*child))
                    .find(|d| d.name == name && is_visible_at(d, offset))
            {
                return Some(Resolved::Declaration(DeclRef::new(document, found.id)));
            }
            if declaration.is_contract()
                && let Some(found) =
                    self.lookup_in_contract(&DeclRef::new(document, id), name, arity, |_| true)
            {
                return Some(found);
            }
            current = declaration.parent;
        }
        self.lookup_in_document(document, name, arity, &mut Visited::default())
            .or_else(|| builtins::global(name).map(Resolved::Builtin))
    }

    /// `contract` followed by its bases, depth first with the last listed base first.
    #[must_use]
    pub fn linearized(&self, contract: &DeclRef) -> Vec<DeclRef> {
        let mut visited = FxHashSet::default();
        let mut out = Vec::new();
        self.collect_bases(contract, &mut visited, &mut out);
        out
    }

    fn collect_bases(
        &self,
        contract: &DeclRef,
        visited: &mut FxHashSet<(usize, DeclId)>,
        out: &mut Vec<DeclRef>,
    ) {
        if !visited.insert(contract.key()) {
            return;
        }
        out.push(contract.clone());
        let Some(DeclarationKind::Contract { bases, .. }) = contract.declaration().map(|d| &d.kind)
        else {
            return;
        };
        for base in bases.iter().rev() {
            if let Some(Resolved::Declaration(base)) = self.resolve(&contract.document, *base)
                && base.declaration().is_some_and(Declaration::is_contract)
            {
                self.collect_bases(&base, visited, out);
            }
        }
    }

    fn lookup_in_contract(
        &self,
        contract: &DeclRef,
        name: &str,
        arity: Option<usize>,
        filter: impl Fn(&Declaration) -> bool,
    ) -> Option<Resolved> {
        self.find_in_contracts(self.linearized(contract), name, arity, filter)
    }

    fn find_in_contracts(
        &self,
        contracts: Vec<DeclRef>,
        name: &str,
        arity: Option<usize>,
        filter: impl Fn(&Declaration) -> bool,
    ) -> Option<Resolved> {
        contracts
            .into_iter()
            .find_map(|contract| {
                let candidates = contract
                    .document
                    .children(contract.id)
                    .filter(|d| d.is_named_member() && d.name == name && filter(d))
                    .map(|d| DeclRef::new(&contract.document, d.id))
                    .collect();
                choose(candidates, arity)
            })
            .map(Resolved::Declaration)
    }

    fn lookup_in_document(
        &self,
        document: &Arc<ParsedDocument>,
        name: &str,
        arity: Option<usize>,
        visited: &mut Visited,
    ) -> Option<Resolved> {
        if !visited.insert(Arc::clone(document.path())) {
            return None;
        }
        let _guard = self.enter()?;
        let candidates = document
            .roots()
            .filter(|d| d.is_named_member() && d.name == name)
            .map(|d| DeclRef::new(document, d.id))
            .collect();
        if let Some(found) = choose(candidates, arity) {
            return Some(Resolved::Declaration(found));
        }
        let mut plain = Vec::new();
        for (declaration, info) in document.imports() {
            if let Some(alias) = &info.alias {
                if alias.name == name {
                    return Some(Resolved::Declaration(DeclRef::new(document, declaration.id)));
                }
                continue;
            }
            if info.symbols.is_empty() {
                plain.push(declaration.id);
                continue;
            }
            for symbol in &info.symbols {
                if symbol.local_name() == name
                    && let Some(target) = self.import_target(document, declaration.id)
                    && let Some(found) =
                        self.lookup_in_document(&target, &symbol.name, arity, &mut Visited::default())
                {
                    return Some(found);
                }
            }
        }
        plain.into_iter().find_map(|import| {
            let target = self.import_target(document, import)?;
            self.lookup_in_document(&target, name, arity, visited)
        })
    }

    /// The path an import statement of `document` resolved to.
    #[must_use]
    pub fn import_target_path(
        &self,
        document: &Arc<ParsedDocument>,
        import: DeclId,
    ) -> Option<Arc<Path>> {
        self.snapshot
            .current(document)?
            .import_target(import)
            .map(Arc::clone)
    }

    fn import_target(&self, document: &Arc<ParsedDocument>, import: DeclId) -> Option<Arc<ParsedDocument>> {
        self.import_target_path(document, import)
            .and_then(|path| self.document(&path))
    }

    /// The value of expression `id`, after its call and index accesses.
    #[must_use]
    pub fn value_target(&self, document: &Arc<ParsedDocument>, id: ExprId) -> Option<TypeTarget> {
        let expression = document.expression(id)?;
        let called = expression.call.is_some();
        let target = if expression.kind == ReferenceKind::ElementaryType {
            elementary_value(&expression.name, called)?
        } else {
            let resolved = self.resolve(document, id)?;
            self.value_of(document, expression.scope, &resolved, called)?
        };
        self.index(target, expression.index_depth)
    }

    /// The value of a resolved name, or of calling it when `called` is set.
    #[must_use]
    pub fn value_of(
        &self,
        document: &Arc<ParsedDocument>,
        scope: Option<DeclId>,
        resolved: &Resolved,
        called: bool,
    ) -> Option<TypeTarget> {
        let r = match resolved {
            Resolved::Builtin(builtin) => return builtin_value(document, scope, *builtin, called),
            Resolved::Declaration(r) => r,
        };
        let declaration = r.declaration()?;
        match &declaration.kind {
            DeclarationKind::Variable(info) => {
                let target = self.target_of_type(&r.document, &info.ty)?;
                if called {
                    self.call_result(&target)
                } else {
                    Some(target)
                }
            }
            DeclarationKind::Function(info) => {
                if called {
                    let first = info.returns.first().and_then(|id| r.document.declaration(*id))?;
                    self.target_of_type(&r.document, &first.variable()?.ty)
                } else {
                    Some(TypeTarget::Members(builtins::FUNCTION_MEMBERS))
                }
            }
            DeclarationKind::Contract { .. }
            | DeclarationKind::Struct
            | DeclarationKind::Enum
            | DeclarationKind::CustomType { .. } => Some(if called {
                TypeTarget::Instance(r.clone())
            } else {
                TypeTarget::Static(r.clone())
            }),
            DeclarationKind::EnumValue => declaration
                .parent
                .map(|parent| TypeTarget::Instance(DeclRef::new(&r.document, parent))),
            DeclarationKind::Import(_) => self
                .import_target_path(&r.document, r.id)
                .map(TypeTarget::Namespace),
            DeclarationKind::Event { .. } | DeclarationKind::Error => {
                (!called).then_some(TypeTarget::Members(builtins::FUNCTION_MEMBERS))
            }
            DeclarationKind::Using(_) => None,
        }
    }

    /// The value of a variable declared with type `ty` in `document`.
    #[must_use]
    pub fn target_of_type(
        &self,
        document: &Arc<ParsedDocument>,
        ty: &DeclarationType,
    ) -> Option<TypeTarget> {
        match &ty.shape {
            TypeShape::Elementary(name) => {
                Some(TypeTarget::Elementary(canonical_elementary(name).to_string()))
            }
            TypeShape::UserDefined { reference, .. } => self
                .resolve(document, (*reference)?)?
                .into_declaration()
                .map(TypeTarget::Instance),
            TypeShape::Mapping { .. } | TypeShape::Array { .. } | TypeShape::Function { .. } => {
                Some(TypeTarget::Typed {
                    document: Arc::clone(document),
                    ty: ty.clone(),
                })
            }
        }
    }

    fn call_result(&self, target: &TypeTarget) -> Option<TypeTarget> {
        if let TypeTarget::Typed { document, ty } = target
            && let TypeShape::Function { returns, .. } = &ty.shape
        {
            return self.target_of_type(document, returns.first()?);
        }
        None
    }

    /// Apply `depth` index accesses to a value.
    #[must_use]
    pub fn index(&self, target: TypeTarget, depth: usize) -> Option<TypeTarget> {
        (0..depth).try_fold(target, |target, _| self.index_once(target))
    }

    fn index_once(&self, target: TypeTarget) -> Option<TypeTarget> {
        match target {
            TypeTarget::Typed { document, ty } => match &ty.shape {
                TypeShape::Array { base, .. } => self.target_of_type(&document, base),
                TypeShape::Mapping { value, .. } => self.target_of_type(&document, value),
                TypeShape::Elementary(_) | TypeShape::UserDefined { .. } | TypeShape::Function { .. } => {
                    None
                }
            },
            TypeTarget::Elementary(name) => name
                .starts_with("bytes")
                .then(|| TypeTarget::Elementary("bytes1".to_string())),
            // `T[]` written as an expression, as in `new T[](n)`.
            TypeTarget::Static(r) => Some(TypeTarget::Static(r)),
            TypeTarget::Instance(_)
            | TypeTarget::Super(_)
            | TypeTarget::Namespace(_)
            | TypeTarget::Members(_) => None,
        }
    }

    /// Look up the member `name` of a value, falling back to `using ... for` functions.
    #[must_use]
    pub fn lookup_member(
        &self,
        document: &Arc<ParsedDocument>,
        scope: Option<DeclId>,
        target: &TypeTarget,
        name: &str,
        arity: Option<usize>,
    ) -> Option<Resolved> {
        self.direct_member(target, name, arity)
            .or_else(|| self.extension_member(document, scope, target, name, arity))
    }

    fn direct_member(&self, target: &TypeTarget, name: &str, arity: Option<usize>) -> Option<Resolved> {
        match target {
            TypeTarget::Instance(r) => {
                let declaration = r.declaration()?;
                if declaration.is_contract() {
                    self.lookup_in_contract(r, name, arity, is_instance_member)
                } else if matches!(declaration.kind, DeclarationKind::Struct) {
                    child_named(r, name)
                } else {
                    None
                }
            }
            TypeTarget::Static(r) => {
                let declaration = r.declaration()?;
                match &declaration.kind {
                    DeclarationKind::Contract { .. } => self.lookup_in_contract(r, name, arity, |_| true),
                    DeclarationKind::Enum => child_named(r, name),
                    DeclarationKind::CustomType { .. } => {
                        builtins::find(builtins::CUSTOM_TYPE_MEMBERS, name).map(Resolved::Builtin)
                    }
                    DeclarationKind::Function(_)
                    | DeclarationKind::Struct
                    | DeclarationKind::Event { .. }
                    | DeclarationKind::Error
                    | DeclarationKind::EnumValue
                    | DeclarationKind::Variable(_)
                    | DeclarationKind::Import(_)
                    | DeclarationKind::Using(_) => None,
                }
            }
            TypeTarget::Super(r) => {
                let bases = self.linearized(r).into_iter().skip(1).collect();
                self.find_in_contracts(bases, name, arity, |_| true)
            }
            TypeTarget::Namespace(path) => {
                let document = self.document(path)?;
                self.lookup_in_document(&document, name, arity, &mut Visited::default())
            }
            TypeTarget::Typed { ty, .. } => match &ty.shape {
                TypeShape::Array { .. } => builtins::find(builtins::ARRAY_MEMBERS, name),
                TypeShape::Function { .. } => builtins::find(builtins::FUNCTION_MEMBERS, name),
                TypeShape::Elementary(_) | TypeShape::UserDefined { .. } | TypeShape::Mapping { .. } => {
                    None
                }
            }
            .map(Resolved::Builtin),
            TypeTarget::Elementary(type_name) => {
                builtins::find(builtins::elementary_members(type_name), name).map(Resolved::Builtin)
            }
            TypeTarget::Members(members) => builtins::find(*members, name).map(Resolved::Builtin),
        }
    }

    /// Using directives visible from `scope`: the enclosing contract's, the document's,
    /// and every `global` one in the snapshot.
    fn using_directives(&self, document: &Arc<ParsedDocument>, scope: Option<DeclId>) -> Vec<DeclRef> {
        let mut out = Vec::new();
        if let Some(contract) = scope.and_then(|id| document.enclosing_contract(id)) {
            out.extend(
                document
                    .children(contract.id)
                    .filter(|d| matches!(d.kind, DeclarationKind::Using(_)))
                    .map(|d| DeclRef::new(document, d.id)),
            );
        }
        out.extend(document.usings().map(|(d, _)| DeclRef::new(document, d.id)));
        for cached in self.snapshot.documents() {
            out.extend(
                cached
                    .parsed
                    .usings()
                    .filter(|(_, info)| info.global)
                    .map(|(d, _)| DeclRef::new(&cached.parsed, d.id)),
            );
        }
        out
    }

    /// Library functions attached to the value `target`, optionally only those named `name`.
    fn extensions(
        &self,
        document: &Arc<ParsedDocument>,
        scope: Option<DeclId>,
        target: &TypeTarget,
        name: Option<&str>,
    ) -> Vec<Vec<DeclRef>> {
        let Some((type_name, is_array, is_mapping)) = using_key(target) else {
            return Vec::new();
        };
        let mut groups = Vec::new();
        for directive in self.using_directives(document, scope) {
            let Some(DeclarationKind::Using(info)) = directive.declaration().map(|d| &d.kind) else {
                continue;
            };
            let applies = info.target.as_ref().is_none_or(|ty| {
                ty.name() == type_name && ty.is_array() == is_array && ty.is_mapping() == is_mapping
            });
            if !applies {
                continue;
            }
            let mut group = Vec::new();
            if let Some(library) = info.library
                && let Some(Resolved::Declaration(library)) = self.resolve(&directive.document, library)
            {
                group.extend(
                    library
                        .document
                        .children(library.id)
                        .filter(|d| {
                            d.function().is_some_and(|f| f.kind == FunctionKind::Function)
                                && name.is_none_or(|name| d.name == name)
                        })
                        .map(|d| DeclRef::new(&library.document, d.id)),
                );
            }
            for function in &info.functions {
                let matches_name = directive
                    .document
                    .expression(*function)
                    .is_some_and(|e| name.is_none_or(|name| e.name == name));
                if matches_name
                    && let Some(Resolved::Declaration(found)) = self.resolve(&directive.document, *function)
                {
                    group.push(found);
                }
            }
            if !group.is_empty() {
                groups.push(group);
            }
        }
        groups
    }

    fn extension_member(
        &self,
        document: &Arc<ParsedDocument>,
        scope: Option<DeclId>,
        target: &TypeTarget,
        name: &str,
        arity: Option<usize>,
    ) -> Option<Resolved> {
        // The receiver is passed as the first argument.
        self.extensions(document, scope, target, Some(name))
            .into_iter()
            .find_map(|group| choose(group, arity.map(|n| n + 1)))
            .map(Resolved::Declaration)
    }

    /// Everything reachable with `.` on a value.
    #[must_use]
    pub fn members(
        &self,
        document: &Arc<ParsedDocument>,
        scope: Option<DeclId>,
        target: &TypeTarget,
    ) -> Vec<Member> {
        let mut out: Vec<Member> = match target {
            TypeTarget::Instance(r) => match r.declaration().map(|d| &d.kind) {
                Some(DeclarationKind::Contract { .. }) => {
                    contract_members(self.linearized(r), is_instance_member)
                }
                Some(DeclarationKind::Struct) => children(r),
                Some(_) | None => Vec::new(),
            },
            TypeTarget::Static(r) => match r.declaration().map(|d| &d.kind) {
                Some(DeclarationKind::Contract { .. }) => contract_members(self.linearized(r), |_| true),
                Some(DeclarationKind::Enum) => children(r),
                Some(DeclarationKind::CustomType { .. }) => {
                    builtin_members(builtins::CUSTOM_TYPE_MEMBERS)
                }
                Some(_) | None => Vec::new(),
            },
            TypeTarget::Super(r) => {
                contract_members(self.linearized(r).into_iter().skip(1).collect(), |_| true)
            }
            TypeTarget::Namespace(path) => self
                .document(path)
                .map(|document| {
                    document
                        .roots()
                        .filter(|d| d.is_named_member())
                        .map(|d| Member::Declaration(DeclRef::new(&document, d.id)))
                        .collect()
                })
                .unwrap_or_default(),
            TypeTarget::Typed { ty, .. } => {
                if ty.is_array() {
                    builtin_members(builtins::ARRAY_MEMBERS)
                } else if matches!(ty.shape, TypeShape::Function { .. }) {
                    builtin_members(builtins::FUNCTION_MEMBERS)
                } else {
                    Vec::new()
                }
            }
            TypeTarget::Elementary(type_name) => {
                builtin_members(builtins::elementary_members(type_name))
            }
            TypeTarget::Members(members) => builtin_members(*members),
        };
        out.extend(
            self.extensions(document, scope, target, None)
                .into_iter()
                .flatten()
                .map(Member::Extension),
        );
        out
    }

    /// Every name visible at `offset`, innermost first, one entry per name.
    #[must_use]
    pub fn scope_members(&self, document: &Arc<ParsedDocument>, offset: usize) -> Vec<Member> {
        let selection = document.select(offset);
        let mut members = Vec::new();
        for scope in selection.scopes.iter().rev() {
            let Some(declaration) = document.declaration(*scope) else {
                continue;
            };
            if declaration.function().is_some() {
                members.extend(
                    declaration
                        .children
                        .iter()
                        .filter_map(|id| document.declaration(*id))
                        .filter(|d| !d.name.is_empty() && is_visible_at(d, offset))
                        .map(|d| Member::Declaration(DeclRef::new(document, d.id))),
                );
            } else if declaration.is_contract() {
                members.extend(contract_members(
                    self.linearized(&DeclRef::new(document, declaration.id)),
                    |_| true,
                ));
            }
        }
        self.document_members(document, &mut Visited::default(), &mut members);
        members.extend(builtin_members(builtins::GLOBALS));
        let mut seen = FxHashSet::default();
        members.retain(|member| seen.insert(member.name().to_string()));
        members
    }

    fn document_members(&self, document: &Arc<ParsedDocument>, visited: &mut Visited, out: &mut Vec<Member>) {
        if !visited.insert(Arc::clone(document.path())) {
            return;
        }
        out.extend(
            document
                .roots()
                .filter(|d| d.is_named_member())
                .map(|d| Member::Declaration(DeclRef::new(document, d.id))),
        );
        for (declaration, info) in document.imports() {
            if info.alias.is_some() {
                out.push(Member::Declaration(DeclRef::new(document, declaration.id)));
                continue;
            }
            let Some(target) = self.import_target(document, declaration.id) else {
                continue;
            };
            if info.symbols.is_empty() {
                self.document_members(&target, visited, out);
                continue;
            }
            for symbol in &info.symbols {
                if let Some(Resolved::Declaration(found)) =
                    self.lookup_in_document(&target, &symbol.name, None, &mut Visited::default())
                {
                    out.push(Member::Declaration(found));
                }
            }
        }
    }

    /// Resolve the last segment of a textual member chain written at `offset`.
    #[must_use]
    pub fn resolve_chain(
        &self,
        document: &Arc<ParsedDocument>,
        offset: usize,
        segments: &[Segment],
    ) -> Option<Resolved> {
        let (last, init) = segments.split_last()?;
        let scope = document.select(offset).innermost_scope();
        if init.is_empty() {
            return self.lookup_name(document, scope, offset, &last.name, None);
        }
        let target = self.chain_target(document, offset, init)?;
        self.lookup_member(document, scope, &target, &last.name, None)
    }

    /// The value of a whole textual member chain written at `offset`.
    #[must_use]
    pub fn chain_target(
        &self,
        document: &Arc<ParsedDocument>,
        offset: usize,
        segments: &[Segment],
    ) -> Option<TypeTarget> {
        let scope = document.select(offset).innermost_scope();
        let (first, rest) = segments.split_first()?;
        let target = if solidity_parser::is_elementary_type(&first.name) {
            elementary_value(&first.name, first.called)?
        } else {
            let resolved = self.lookup_name(document, scope, offset, &first.name, None)?;
            self.value_of(document, scope, &resolved, first.called)?
        };
        let mut target = self.index(target, first.index_depth)?;
        for segment in rest {
            let resolved = self.lookup_member(document, scope, &target, &segment.name, None)?;
            let value = self.value_of(document, scope, &resolved, segment.called)?;
            target = self.index(value, segment.index_depth)?;
        }
        Some(target)
    }

    /// What the cursor at `offset` designates: a name reference, a declaration name, or
    /// an import path.
    #[must_use]
    pub fn target_at(&self, document: &Arc<ParsedDocument>, offset: usize) -> Option<Target> {
        let selection = document.select(offset);
        if let Some(id) = selection.expression {
            return self.resolve(document, id).map(Target::Resolved);
        }
        if let Some(id) = selection.declaration {
            return Some(Target::Resolved(Resolved::Declaration(DeclRef::new(document, id))));
        }
        let import = selection.import?;
        self.import_target_path(document, import).map(Target::Document)
    }

    /// The declaration of the type of a variable, or of a function's first return value.
    #[must_use]
    pub fn type_definition(&self, resolved: &Resolved) -> Option<DeclRef> {
        let r = resolved.as_declaration()?;
        let declaration = r.declaration()?;
        let ty = match &declaration.kind {
            DeclarationKind::Variable(info) => &info.ty,
            DeclarationKind::Function(info) => {
                let first = info.returns.first().and_then(|id| r.document.declaration(*id))?;
                &first.variable()?.ty
            }
            DeclarationKind::Contract { .. }
            | DeclarationKind::Struct
            | DeclarationKind::Enum
            | DeclarationKind::CustomType { .. } => return Some(r.clone()),
            DeclarationKind::EnumValue => {
                return declaration.parent.map(|parent| DeclRef::new(&r.document, parent));
            }
            DeclarationKind::Event { .. }
            | DeclarationKind::Error
            | DeclarationKind::Import(_)
            | DeclarationKind::Using(_) => return None,
        };
        self.resolve(&r.document, ty.innermost_reference()?)?
            .into_declaration()
    }

    /// Declarations sharing the name of a function: its overloads in the same contract
    /// and its bases, or in the same document for free functions.
    #[must_use]
    pub fn overloads(&self, function: &DeclRef) -> Vec<DeclRef> {
        let Some(declaration) = function.declaration() else {
            return Vec::new();
        };
        let parent = declaration
            .parent
            .filter(|id| function.document.declaration(*id).is_some_and(Declaration::is_contract));
        match parent {
            Some(contract) => self
                .linearized(&DeclRef::new(&function.document, contract))
                .iter()
                .flat_map(|c| {
                    c.document
                        .children(c.id)
                        .filter(|d| d.name == declaration.name && d.function().is_some())
                        .map(|d| DeclRef::new(&c.document, d.id))
                        .collect::<Vec<_>>()
                })
                .collect(),
            None => function
                .document
                .roots()
                .filter(|d| d.name == declaration.name)
                .map(|d| DeclRef::new(&function.document, d.id))
                .collect(),
        }
    }

    /// Every reference to `target` in its document and in the documents importing it,
    /// directly or not. Local variables are only searched in their own document.
    #[must_use]
    pub fn references(&self, target: &DeclRef, include_declaration: bool) -> Vec<Occurrence> {
        let Some(declaration) = target.declaration() else {
            return Vec::new();
        };
        let documents: Vec<Arc<ParsedDocument>> = if is_local(declaration) {
            vec![Arc::clone(&target.document)]
        } else {
            self.snapshot
                .importers_closure(target.document.path())
                .into_iter()
                .map(|cached| Arc::clone(&cached.parsed))
                .collect()
        };
        let aliases: FxHashSet<String> = documents
            .iter()
            .flat_map(|document| {
                document
                    .imports()
                    .flat_map(|(_, info)| info.symbols.iter())
                    .filter(|symbol| symbol.name == declaration.name)
                    .filter_map(|symbol| symbol.alias.as_ref().map(|alias| alias.name.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        let mut out = Vec::new();
        if include_declaration && let Some(location) = declaration.name_location {
            out.push(Occurrence {
                document: Arc::clone(&target.document),
                location,
            });
        }
        for document in &documents {
            let mut found: Vec<Location> = document
                .expressions()
                .iter()
                .filter(|e| e.name == declaration.name || aliases.contains(&e.name))
                .filter(|e| {
                    self.resolve(document, e.id)
                        .is_some_and(|r| matches!(&r, Resolved::Declaration(d) if d.is_same(target)))
                })
                .map(|e| e.location)
                .collect();
            found.sort_by_key(|location| location.start);
            out.extend(found.into_iter().map(|location| Occurrence {
                document: Arc::clone(document),
                location,
            }));
        }
        out
    }
}

/// Pick the first candidate taking `arity` arguments, or the first one.
fn choose(candidates: Vec<DeclRef>, arity: Option<usize>) -> Option<DeclRef> {
    if let Some(arity) = arity
        && let Some(found) = candidates
            .iter()
            .find(|c| c.parameter_count() == Some(arity))
    {
        return Some(found.clone());
    }
    candidates.into_iter().next()
}

fn child_named(r: &DeclRef, name: &str) -> Option<Resolved> {
    r.document
        .children(r.id)
        .find(|d| d.name == name)
        .map(|d| Resolved::Declaration(DeclRef::new(&r.document, d.id)))
}

fn children(r: &DeclRef) -> Vec<Member> {
    r.document
        .children(r.id)
        .filter(|d| !d.name.is_empty())
        .map(|d| Member::Declaration(DeclRef::new(&r.document, d.id)))
        .collect()
}

fn builtin_members(members: &'static [Builtin]) -> Vec<Member> {
    members.iter().map(Member::Builtin).collect()
}

fn contract_members(contracts: Vec<DeclRef>, filter: impl Fn(&Declaration) -> bool) -> Vec<Member> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for contract in contracts {
        for declaration in contract.document.children(contract.id) {
            if declaration.is_named_member()
                && filter(declaration)
                && !declaration.is_constructor()
                && seen.insert(declaration.name.clone())
            {
                out.push(Member::Declaration(DeclRef::new(&contract.document, declaration.id)));
            }
        }
    }
    out
}

/// Functions and state variables, the members reachable on a contract instance.
fn is_instance_member(declaration: &Declaration) -> bool {
    declaration
        .function()
        .is_some_and(|f| f.kind == FunctionKind::Function)
        || declaration.variable().is_some()
}

fn is_visible_at(declaration: &Declaration, offset: usize) -> bool {
    declaration
        .variable()
        .is_none_or(|info| info.visible.is_none_or(|range| range.contains(offset)))
}

fn is_local(declaration: &Declaration) -> bool {
    declaration.variable().is_some_and(|info| {
        matches!(
            info.role,
            VariableRole::Parameter | VariableRole::Return | VariableRole::Local
        )
    })
}

fn elementary_value(name: &str, called: bool) -> Option<TypeTarget> {
    if called {
        Some(TypeTarget::Elementary(canonical_elementary(name).to_string()))
    } else {
        builtins::global(name).map(|builtin| TypeTarget::Members(builtin.members()))
    }
}

fn builtin_value(
    document: &Arc<ParsedDocument>,
    scope: Option<DeclId>,
    builtin: &'static Builtin,
    called: bool,
) -> Option<TypeTarget> {
    if builtin.kind == BuiltinKind::Function && !called {
        return Some(TypeTarget::Members(builtins::FUNCTION_MEMBERS));
    }
    let enclosing = || {
        scope
            .and_then(|id| document.enclosing_contract(id))
            .map(|contract| DeclRef::new(document, contract.id))
    };
    match builtin.value {
        BuiltinValue::None => None,
        BuiltinValue::Elementary(name) => Some(TypeTarget::Elementary(name.to_string())),
        BuiltinValue::Members(members) => Some(TypeTarget::Members(members)),
        BuiltinValue::EnclosingContract => enclosing().map(TypeTarget::Instance),
        BuiltinValue::BaseContracts => enclosing().map(TypeTarget::Super),
    }
}

/// The name, array-ness and mapping-ness compared against `using ... for` targets.
fn using_key(target: &TypeTarget) -> Option<(String, bool, bool)> {
    match target {
        TypeTarget::Instance(r) => Some((r.declaration()?.name.clone(), false, false)),
        TypeTarget::Typed { ty, .. } => Some((ty.name(), ty.is_array(), ty.is_mapping())),
        TypeTarget::Elementary(name) => {
            Some((name.trim_end_matches(" payable").to_string(), false, false))
        }
        TypeTarget::Static(_)
        | TypeTarget::Super(_)
        | TypeTarget::Namespace(_)
        | TypeTarget::Members(_) => None,
    }
}

#[cfg(test)]
mod tests;
