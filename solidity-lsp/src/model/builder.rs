//! Building a [`ParsedDocument`] from a syntax tree
//!
//! One pass over the tree: declarations go to one arena, every name used in code goes
//! to the other, tagged with the innermost enclosing declaration.

use std::sync::OnceLock;

use solidity_parser::{
    Block, ContractDefinition, ContractPart, EnumDefinition, ErrorDefinition, EventDefinition,
    Expression, ExpressionKind, FunctionAttribute, FunctionDefinition, Identifier,
    IdentifierPath, ImportDirective, ImportKind, Location, SourceUnit, SourceUnitPart, Statement,
    StructDefinition, TypeDefinition, TypeName, TypeNameKind, UsingDirective, UsingTarget,
    VariableAttribute, VariableDeclaration, VariableDefinition,
};

use crate::convert::LineIndex;
use crate::model::{
    CallSite, DeclId, Declaration, DeclarationKind, DeclarationType, ExprId, FunctionInfo,
    ImportInfo, ImportedSymbol, ParsedDocument, ParsedExpression, ReferenceKind, SyntaxIssue,
    TypeShape, UsingInfo, VariableInfo, VariableRole,
};
use crate::state::SourceDocument;

/// Build the node graph of `unit`, which was parsed from `source.text`.
pub(crate) fn build(
    source: SourceDocument,
    unit: &SourceUnit,
    syntax_issues: Vec<SyntaxIssue>,
) -> ParsedDocument {
    let text = std::sync::Arc::clone(&source.text);
    let mut builder = Builder {
        text: &text,
        declarations: Vec::new(),
        expressions: Vec::new(),
        roots: Vec::new(),
        scope: None,
        block_end: text.len(),
    };
    for part in &unit.parts {
        builder.source_unit_part(part);
    }
    let Builder {
        declarations,
        expressions,
        roots,
        ..
    } = builder;
    ParsedDocument {
        line_index: LineIndex::new(&text),
        source,
        declarations,
        expressions,
        roots,
        syntax_issues,
    }
}

struct Builder<'a> {
    text: &'a str,
    declarations: Vec<Declaration>,
    expressions: Vec<ParsedExpression>,
    roots: Vec<DeclId>,
    scope: Option<DeclId>,
    /// End of the innermost block, where locals declared in it stop being visible.
    block_end: usize,
}

impl Builder<'_> {
    fn source_unit_part(&mut self, part: &SourceUnitPart) {
        match part {
            SourceUnitPart::Pragma(_) | SourceUnitPart::StraySemicolon(_) => {}
            SourceUnitPart::Import(import) => self.import(import),
            SourceUnitPart::Contract(contract) => self.contract(contract),
            SourceUnitPart::Function(function) => self.function(function),
            SourceUnitPart::Constant(constant) => {
                self.variable_definition(constant, VariableRole::Constant);
            }
            SourceUnitPart::Event(event) => self.event(event),
            SourceUnitPart::Enum(enumeration) => self.enumeration(enumeration),
            SourceUnitPart::Struct(structure) => self.structure(structure),
            SourceUnitPart::Type(custom) => self.custom_type(custom),
            SourceUnitPart::Error(error) => self.error(error),
            SourceUnitPart::Using(using) => self.using(using),
        }
    }

    fn contract_part(&mut self, part: &ContractPart) {
        match part {
            ContractPart::Function(function) => self.function(function),
            ContractPart::StateVariable(variable) => {
                self.variable_definition(variable, VariableRole::State);
            }
            ContractPart::Struct(structure) => self.structure(structure),
            ContractPart::Enum(enumeration) => self.enumeration(enumeration),
            ContractPart::Event(event) => self.event(event),
            ContractPart::Error(error) => self.error(error),
            ContractPart::Using(using) => self.using(using),
            ContractPart::Type(custom) => self.custom_type(custom),
            ContractPart::StraySemicolon(_) => {}
        }
    }

    fn declare(
        &mut self,
        name: Option<&Identifier>,
        location: Location,
        kind: DeclarationKind,
    ) -> DeclId {
        let id = DeclId::new(self.declarations.len());
        self.declarations.push(Declaration {
            id,
            name: name.map(|n| n.name.clone()).unwrap_or_default(),
            kind,
            location,
            name_location: name.map(|n| n.location),
            parent: self.scope,
            children: Vec::new(),
            completion: OnceLock::new(),
            extension_completion: OnceLock::new(),
        });
        match self.scope.and_then(|parent| self.declarations.get_mut(parent.index())) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn kind_mut(&mut self, id: DeclId) -> Option<&mut DeclarationKind> {
        self.declarations.get_mut(id.index()).map(|d| &mut d.kind)
    }

    fn within<T>(&mut self, scope: DeclId, f: impl FnOnce(&mut Self) -> T) -> T {
        let outer = self.scope.replace(scope);
        let result = f(self);
        self.scope = outer;
        result
    }

    fn reference(
        &mut self,
        name: &str,
        location: Location,
        kind: ReferenceKind,
        receiver: Option<ExprId>,
    ) -> ExprId {
        let id = ExprId::new(self.expressions.len());
        self.expressions.push(ParsedExpression {
            id,
            name: name.to_string(),
            location,
            kind,
            call: None,
            receiver,
            index_depth: 0,
            scope: self.scope,
        });
        id
    }

    fn set_call(&mut self, id: ExprId, arguments: usize, location: Location) {
        if let Some(expression) = self.expressions.get_mut(id.index())
            && expression.call.is_none()
        {
            expression.call = Some(CallSite {
                arguments,
                location,
            });
        }
    }

    /// Record every segment of a dotted path and return the last one.
    fn path_reference(&mut self, path: &IdentifierPath, first: ReferenceKind) -> Option<ExprId> {
        let mut previous = None;
        for identifier in &path.identifiers {
            let kind = if previous.is_some() {
                ReferenceKind::Member
            } else {
                first
            };
            previous = Some(self.reference(&identifier.name, identifier.location, kind, previous));
        }
        previous
    }

    fn import(&mut self, import: &ImportDirective) {
        let (alias, symbols) = match &import.kind {
            ImportKind::Plain { alias } => (alias.clone(), [].as_slice()),
            ImportKind::Symbols(symbols) => (None, symbols.as_slice()),
        };
        let name = alias.clone();
        let id = self.declare(
            name.as_ref(),
            import.location,
            DeclarationKind::Import(ImportInfo {
                specifier: import.path.value.clone(),
                path_location: import.path.location,
                alias,
                symbols: Vec::new(),
            }),
        );
        let imported: Vec<ImportedSymbol> = symbols
            .iter()
            .map(|symbol| ImportedSymbol {
                reference: self.reference(
                    &symbol.name.name,
                    symbol.name.location,
                    ReferenceKind::ImportedSymbol(id),
                    None,
                ),
                name: symbol.name.name.clone(),
                alias: symbol.alias.clone(),
            })
            .collect();
        if let Some(DeclarationKind::Import(info)) = self.kind_mut(id) {
            info.symbols = imported;
        }
    }

    fn contract(&mut self, contract: &ContractDefinition) {
        // Bases are looked up from outside the contract.
        let mut bases = Vec::new();
        for base in &contract.bases {
            let Some(reference) = self.path_reference(&base.name, ReferenceKind::TypeName) else {
                continue;
            };
            if let Some(arguments) = &base.arguments {
                self.set_call(reference, arguments.len(), base.location);
                for argument in arguments {
                    self.expression(argument);
                }
            }
            bases.push(reference);
        }
        let id = self.declare(
            Some(&contract.name),
            contract.location,
            DeclarationKind::Contract {
                kind: contract.kind,
                bases,
            },
        );
        self.within(id, |b| {
            for part in &contract.parts {
                b.contract_part(part);
            }
        });
    }

    fn function(&mut self, function: &FunctionDefinition) {
        let mut info = FunctionInfo {
            kind: function.kind,
            parameters: Vec::new(),
            returns: Vec::new(),
            visibility: None,
            mutability: None,
            is_virtual: false,
            overrides: false,
            modifiers: Vec::new(),
            body: function.body.as_ref().map(|body| body.location),
        };
        for attribute in &function.attributes {
            match attribute {
                FunctionAttribute::Visibility(visibility) => info.visibility = Some(*visibility),
                FunctionAttribute::Mutability(mutability) => info.mutability = Some(*mutability),
                FunctionAttribute::Virtual => info.is_virtual = true,
                FunctionAttribute::Override(_) => info.overrides = true,
                FunctionAttribute::Modifier(_) => {}
            }
        }
        let id = self.declare(
            function.name.as_ref(),
            function.location,
            DeclarationKind::Function(info),
        );
        self.within(id, |b| {
            let parameters: Vec<DeclId> = function
                .parameters
                .iter()
                .map(|p| b.variable_declaration(p, VariableRole::Parameter, None))
                .collect();
            let returns: Vec<DeclId> = function
                .returns
                .iter()
                .map(|r| b.variable_declaration(r, VariableRole::Return, None))
                .collect();
            let mut modifiers = Vec::new();
            for attribute in &function.attributes {
                match attribute {
                    FunctionAttribute::Modifier(invocation) => {
                        let Some(reference) =
                            b.path_reference(&invocation.name, ReferenceKind::Identifier)
                        else {
                            continue;
                        };
                        if let Some(arguments) = &invocation.arguments {
                            b.set_call(reference, arguments.len(), invocation.location);
                            for argument in arguments {
                                b.expression(argument);
                            }
                        }
                        modifiers.push(reference);
                    }
                    FunctionAttribute::Override(paths) => {
                        for path in paths {
                            b.path_reference(path, ReferenceKind::TypeName);
                        }
                    }
                    FunctionAttribute::Visibility(_)
                    | FunctionAttribute::Mutability(_)
                    | FunctionAttribute::Virtual => {}
                }
            }
            if let Some(body) = &function.body {
                b.block(body);
            }
            if let Some(DeclarationKind::Function(info)) = b.kind_mut(id) {
                info.parameters = parameters;
                info.returns = returns;
                info.modifiers = modifiers;
            }
        });
    }

    fn variable_declaration(
        &mut self,
        declaration: &VariableDeclaration,
        role: VariableRole,
        visible: Option<Location>,
    ) -> DeclId {
        let ty = self.declaration_type(&declaration.ty);
        self.declare(
            declaration.name.as_ref(),
            declaration.location,
            DeclarationKind::Variable(VariableInfo {
                ty,
                role,
                storage: declaration.storage,
                visibility: None,
                constant: false,
                immutable: false,
                indexed: false,
                visible,
            }),
        )
    }

    fn variable_definition(&mut self, variable: &VariableDefinition, role: VariableRole) {
        let ty = self.declaration_type(&variable.ty);
        let mut info = VariableInfo {
            ty,
            role,
            storage: None,
            visibility: None,
            constant: role == VariableRole::Constant,
            immutable: false,
            indexed: false,
            visible: None,
        };
        for attribute in &variable.attributes {
            match attribute {
                VariableAttribute::Visibility(visibility) => info.visibility = Some(*visibility),
                VariableAttribute::Constant => info.constant = true,
                VariableAttribute::Immutable => info.immutable = true,
                VariableAttribute::Transient => {}
                VariableAttribute::Override(paths) => {
                    for path in paths {
                        self.path_reference(path, ReferenceKind::TypeName);
                    }
                }
            }
        }
        if let Some(initializer) = &variable.initializer {
            self.expression(initializer);
        }
        self.declare(
            Some(&variable.name),
            variable.location,
            DeclarationKind::Variable(info),
        );
    }

    fn structure(&mut self, structure: &StructDefinition) {
        let id = self.declare(
            Some(&structure.name),
            structure.location,
            DeclarationKind::Struct,
        );
        self.within(id, |b| {
            for member in &structure.members {
                b.variable_declaration(member, VariableRole::StructMember, None);
            }
        });
    }

    fn enumeration(&mut self, enumeration: &EnumDefinition) {
        let id = self.declare(
            Some(&enumeration.name),
            enumeration.location,
            DeclarationKind::Enum,
        );
        self.within(id, |b| {
            for value in &enumeration.values {
                b.declare(Some(value), value.location, DeclarationKind::EnumValue);
            }
        });
    }

    fn event(&mut self, event: &EventDefinition) {
        let id = self.declare(
            Some(&event.name),
            event.location,
            DeclarationKind::Event {
                anonymous: event.anonymous,
            },
        );
        self.within(id, |b| {
            for parameter in &event.parameters {
                let ty = b.declaration_type(&parameter.ty);
                b.declare(
                    parameter.name.as_ref(),
                    parameter.location,
                    DeclarationKind::Variable(VariableInfo {
                        ty,
                        role: VariableRole::EventParameter,
                        storage: None,
                        visibility: None,
                        constant: false,
                        immutable: false,
                        indexed: parameter.indexed,
                        visible: None,
                    }),
                );
            }
        });
    }

    fn error(&mut self, error: &ErrorDefinition) {
        let id = self.declare(Some(&error.name), error.location, DeclarationKind::Error);
        self.within(id, |b| {
            for parameter in &error.parameters {
                b.variable_declaration(parameter, VariableRole::ErrorParameter, None);
            }
        });
    }

    fn custom_type(&mut self, custom: &TypeDefinition) {
        let underlying = self.declaration_type(&custom.ty);
        self.declare(
            Some(&custom.name),
            custom.location,
            DeclarationKind::CustomType { underlying },
        );
    }

    fn using(&mut self, using: &UsingDirective) {
        let (library, functions) = match &using.target {
            UsingTarget::Library(path) => (
                self.path_reference(path, ReferenceKind::TypeName),
                Vec::new(),
            ),
            UsingTarget::Functions(functions) => (
                None,
                functions
                    .iter()
                    .filter_map(|f| self.path_reference(&f.path, ReferenceKind::Identifier))
                    .collect(),
            ),
        };
        let target = using.ty.as_ref().map(|ty| self.declaration_type(ty));
        self.declare(
            None,
            using.location,
            DeclarationKind::Using(UsingInfo {
                library,
                functions,
                target,
                global: using.global,
            }),
        );
    }

    fn declaration_type(&mut self, ty: &TypeName) -> DeclarationType {
        let shape = match &ty.kind {
            TypeNameKind::Elementary(name) => TypeShape::Elementary(name.clone()),
            TypeNameKind::UserDefined(path) => TypeShape::UserDefined {
                path: path.to_string(),
                reference: self.path_reference(path, ReferenceKind::TypeName),
            },
            TypeNameKind::Mapping { key, value, .. } => TypeShape::Mapping {
                key: Box::new(self.declaration_type(key)),
                value: Box::new(self.declaration_type(value)),
            },
            TypeNameKind::Array { base, length } => {
                let base = self.declaration_type(base);
                let length = length.as_ref().map(|length| {
                    self.expression(length);
                    self.slice(&length.location).trim().to_string()
                });
                TypeShape::Array {
                    base: Box::new(base),
                    length,
                }
            }
            TypeNameKind::Function {
                parameters,
                returns,
                ..
            } => TypeShape::Function {
                parameters: parameters
                    .iter()
                    .map(|p| self.declaration_type(&p.ty))
                    .collect(),
                returns: returns.iter().map(|r| self.declaration_type(&r.ty)).collect(),
            },
        };
        DeclarationType {
            shape,
            location: ty.location,
        }
    }

    fn slice(&self, location: &Location) -> &str {
        self.text.get(location.start..location.end).unwrap_or_default()
    }

    fn block(&mut self, block: &Block) {
        let outer = std::mem::replace(&mut self.block_end, block.location.end);
        for statement in &block.statements {
            self.statement(statement);
        }
        self.block_end = outer;
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) | Statement::Unchecked(block) => self.block(block),
            Statement::VariableDeclaration {
                declarations,
                initializer,
                location,
            } => {
                if let Some(initializer) = initializer {
                    self.expression(initializer);
                }
                let visible = Location::new(location.end, self.block_end);
                for declaration in declarations.iter().flatten() {
                    self.variable_declaration(declaration, VariableRole::Local, Some(visible));
                }
            }
            Statement::Expression { expression, .. } => {
                self.expression(expression);
            }
            Statement::If {
                condition,
                then,
                otherwise,
                ..
            } => {
                self.expression(condition);
                self.statement(then);
                if let Some(otherwise) = otherwise {
                    self.statement(otherwise);
                }
            }
            Statement::For {
                init,
                condition,
                update,
                body,
                location,
            } => {
                let outer = std::mem::replace(&mut self.block_end, location.end);
                if let Some(init) = init {
                    self.statement(init);
                }
                if let Some(condition) = condition {
                    self.expression(condition);
                }
                if let Some(update) = update {
                    self.expression(update);
                }
                self.statement(body);
                self.block_end = outer;
            }
            Statement::While {
                condition, body, ..
            }
            | Statement::DoWhile {
                body, condition, ..
            } => {
                self.expression(condition);
                self.statement(body);
            }
            Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.expression(value);
                }
            }
            Statement::Emit { event, .. }
            | Statement::Revert {
                error: event, ..
            } => {
                self.expression(event);
            }
            Statement::Try {
                expression,
                returns,
                body,
                catches,
                ..
            } => {
                self.expression(expression);
                for declaration in returns {
                    self.variable_declaration(declaration, VariableRole::Local, Some(body.location));
                }
                self.block(body);
                for catch in catches {
                    for parameter in &catch.parameters {
                        self.variable_declaration(
                            parameter,
                            VariableRole::Local,
                            Some(catch.body.location),
                        );
                    }
                    self.block(&catch.body);
                }
            }
            Statement::Assembly { .. } | Statement::Break(_) | Statement::Continue(_) => {}
        }
    }

    /// Record the names used in `expression`.
    ///
    /// Returns the node whose value is the value of the whole expression, if there is
    /// one: `b` for `a.b`, `f` for `f(x)`, `m` for `m[k]`.
    fn expression(&mut self, expression: &Expression) -> Option<ExprId> {
        match &expression.kind {
            ExpressionKind::Identifier(identifier) => Some(self.reference(
                &identifier.name,
                identifier.location,
                ReferenceKind::Identifier,
                None,
            )),
            ExpressionKind::Literal(_) => None,
            ExpressionKind::ElementaryType(name) => Some(self.reference(
                name,
                expression.location,
                ReferenceKind::ElementaryType,
                None,
            )),
            ExpressionKind::MemberAccess {
                expression: inner,
                member,
            } => {
                let receiver = self.expression(inner);
                Some(self.reference(
                    &member.name,
                    member.location,
                    ReferenceKind::Member,
                    receiver,
                ))
            }
            ExpressionKind::Index { base, index } => {
                let node = self.expression(base);
                if let Some(index) = index {
                    self.expression(index);
                }
                if let Some(node) = node.and_then(|id| self.expressions.get_mut(id.index())) {
                    node.index_depth += 1;
                }
                node
            }
            ExpressionKind::IndexRange { base, start, end } => {
                let node = self.expression(base);
                for bound in [start, end].into_iter().flatten() {
                    self.expression(bound);
                }
                node
            }
            ExpressionKind::Call { callee, arguments } => {
                let node = self.expression(callee);
                for argument in arguments.expressions() {
                    self.expression(argument);
                }
                if let Some(node) = node {
                    self.set_call(node, arguments.len(), expression.location);
                }
                node
            }
            ExpressionKind::CallOptions { callee, options } => {
                let node = self.expression(callee);
                for option in options {
                    self.expression(&option.value);
                }
                node
            }
            ExpressionKind::New(ty) => self.declaration_type(ty).innermost_reference().filter(|_| {
                matches!(ty.kind, TypeNameKind::UserDefined(_))
            }),
            ExpressionKind::TypeInfo(ty) => {
                self.declaration_type(ty);
                let start = expression.location.start;
                let node = self.reference(
                    "type",
                    Location::new(start, start + "type".len()),
                    ReferenceKind::Identifier,
                    None,
                );
                self.set_call(node, 1, expression.location);
                Some(node)
            }
            ExpressionKind::Unary { operand, .. } => {
                self.expression(operand);
                None
            }
            ExpressionKind::Binary { left, right, .. }
            | ExpressionKind::Assignment { left, right, .. } => {
                self.expression(left);
                self.expression(right);
                None
            }
            ExpressionKind::Conditional {
                condition,
                if_true,
                if_false,
            } => {
                self.expression(condition);
                self.expression(if_true);
                self.expression(if_false);
                None
            }
            ExpressionKind::Tuple(items) => {
                let nodes: Vec<Option<ExprId>> = items
                    .iter()
                    .map(|item| item.as_ref().and_then(|e| self.expression(e)))
                    .collect();
                match nodes.as_slice() {
                    [single] => *single,
                    _ => None,
                }
            }
            ExpressionKind::Array(items) => {
                for item in items {
                    self.expression(item);
                }
                None
            }
        }
    }
}
