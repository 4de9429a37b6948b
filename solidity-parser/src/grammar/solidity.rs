use crate::model::{
    AssignmentOperator, BinaryOperator, Block, CallArguments, CatchClause, ContractDefinition,
    ContractKind, ContractPart, EnumDefinition, ErrorDefinition, EventDefinition, EventParameter,
    Expression, ExpressionKind, FunctionAttribute, FunctionDefinition, FunctionKind, Identifier,
    IdentifierPath, ImportDirective, ImportKind, ImportSymbol, InheritanceSpecifier, Literal,
    Location, ModifierInvocation, Mutability, NamedArgument, PostfixOperation, PragmaDirective,
    SourceUnit, SourceUnitPart, Statement, StorageLocation, StringLiteral, StructDefinition,
    TypeDefinition, TypeName, TypeNameKind, UnaryOperator, UsingDirective, UsingFunction,
    UsingTarget, VariableAttribute, VariableDeclaration, VariableDefinition, Visibility,
    is_elementary_type, is_reserved,
};

const UNITS: &[&str] = &[
    "wei", "gwei", "ether", "seconds", "minutes", "hours", "days", "weeks", "years",
];

#[derive(Debug)]
// Header of a function, modifier, constructor, fallback or receive definition.
struct FunctionHeader {
    kind: FunctionKind,
    name: Option<Identifier>,
    parameters: Vec<VariableDeclaration>,
}

fn identifier_path(identifiers: Vec<Identifier>) -> IdentifierPath {
    let start = identifiers.first().map_or(0, |i| i.location.start);
    let end = identifiers.last().map_or(start, |i| i.location.end);
    IdentifierPath {
        identifiers,
        location: Location::new(start, end),
    }
}

peg::parser! {
    pub(crate) grammar solidity_parser() for str {

        pub(crate) rule source_unit() -> SourceUnit
            = "\u{feff}"? _ parts:(p:source_unit_part() _ { p })* end:position!() ![_] {
                SourceUnit { parts, location: Location::new(0, end) }
            }

        rule source_unit_part() -> SourceUnitPart
            = p:pragma_directive() { SourceUnitPart::Pragma(p) }
            / i:import_directive() { SourceUnitPart::Import(i) }
            / c:contract_definition() { SourceUnitPart::Contract(c) }
            / f:function_definition() { SourceUnitPart::Function(f) }
            / s:struct_definition() { SourceUnitPart::Struct(s) }
            / e:enum_definition() { SourceUnitPart::Enum(e) }
            / e:event_definition() { SourceUnitPart::Event(e) }
            / e:error_definition() { SourceUnitPart::Error(e) }
            / t:type_definition() { SourceUnitPart::Type(t) }
            / u:using_directive() { SourceUnitPart::Using(u) }
            / v:variable_definition() { SourceUnitPart::Constant(v) }
            / start:position!() ";" end:position!() { SourceUnitPart::StraySemicolon(Location::new(start, end)) }

        rule pragma_directive() -> PragmaDirective
            = start:position!() kw("pragma") _ name:$(ident_start() ident_char()*) _ value:$([^';']*) ";" end:position!() {
                PragmaDirective {
                    name: name.to_string(),
                    value: value.trim().to_string(),
                    location: Location::new(start, end),
                }
            }

        rule import_directive() -> ImportDirective
            = start:position!() kw("import") _ path:string_literal() alias:(_ kw("as") _ i:identifier() { i })? _ ";" end:position!() {
                ImportDirective { path, kind: ImportKind::Plain { alias }, location: Location::new(start, end) }
            }
            / start:position!() kw("import") _ "*" _ kw("as") _ alias:identifier() _ kw("from") _ path:string_literal() _ ";" end:position!() {
                ImportDirective { path, kind: ImportKind::Plain { alias: Some(alias) }, location: Location::new(start, end) }
            }
            / start:position!() kw("import") _ "{" _ symbols:(import_symbol() ** (_ "," _)) _ "}" _ kw("from") _ path:string_literal() _ ";" end:position!() {
                ImportDirective { path, kind: ImportKind::Symbols(symbols), location: Location::new(start, end) }
            }

        rule import_symbol() -> ImportSymbol
            = name:identifier() alias:(_ kw("as") _ i:identifier() { i })? { ImportSymbol { name, alias } }

        rule contract_definition() -> ContractDefinition
            = start:position!() kind:contract_kind() _ name:identifier()
              bases:(_ kw("is") _ b:(inheritance_specifier() ++ (_ "," _)) { b })?
              _ "{" parts:(_ p:contract_part() { p })* _ "}" end:position!() {
                ContractDefinition {
                    kind,
                    name,
                    bases: bases.unwrap_or_default(),
                    parts,
                    location: Location::new(start, end),
                }
            }

        rule contract_kind() -> ContractKind
            = kw("abstract") _ kw("contract") { ContractKind::AbstractContract }
            / kw("contract") { ContractKind::Contract }
            / kw("interface") { ContractKind::Interface }
            / kw("library") { ContractKind::Library }

        rule inheritance_specifier() -> InheritanceSpecifier
            = start:position!() name:identifier_path() arguments:(_ "(" _ a:(expression() ** (_ "," _)) _ ")" { a })? end:position!() {
                InheritanceSpecifier { name, arguments, location: Location::new(start, end) }
            }

        rule contract_part() -> ContractPart
            = f:function_definition() { ContractPart::Function(f) }
            / s:struct_definition() { ContractPart::Struct(s) }
            / e:enum_definition() { ContractPart::Enum(e) }
            / e:event_definition() { ContractPart::Event(e) }
            / e:error_definition() { ContractPart::Error(e) }
            / u:using_directive() { ContractPart::Using(u) }
            / t:type_definition() { ContractPart::Type(t) }
            / v:variable_definition() { ContractPart::StateVariable(v) }
            / start:position!() ";" end:position!() { ContractPart::StraySemicolon(Location::new(start, end)) }

        rule variable_definition() -> VariableDefinition
            = start:position!() ty:type_name() attributes:(_ a:variable_attribute() { a })* _ name:identifier()
              initializer:(_ "=" _ e:expression() { e })? _ ";" end:position!() {
                VariableDefinition { ty, attributes, name, initializer, location: Location::new(start, end) }
            }

        rule variable_attribute() -> VariableAttribute
            = v:visibility() { VariableAttribute::Visibility(v) }
            / kw("constant") { VariableAttribute::Constant }
            / kw("immutable") { VariableAttribute::Immutable }
            / kw("transient") !(_ ['=' | ';']) { VariableAttribute::Transient }
            / o:override_specifier() { VariableAttribute::Override(o) }

        rule override_specifier() -> Vec<IdentifierPath>
            = kw("override") paths:(_ "(" _ p:(identifier_path() ** (_ "," _)) _ ")" { p })? {
                paths.unwrap_or_default()
            }

        rule visibility() -> Visibility
            = kw("public") { Visibility::Public }
            / kw("private") { Visibility::Private }
            / kw("internal") { Visibility::Internal }
            / kw("external") { Visibility::External }

        rule mutability() -> Mutability
            = kw("pure") { Mutability::Pure }
            / kw("view") { Mutability::View }
            / kw("payable") { Mutability::Payable }
            / kw("constant") { Mutability::Constant }

        rule storage_location() -> StorageLocation
            = kw("memory") { StorageLocation::Memory }
            / kw("storage") { StorageLocation::Storage }
            / kw("calldata") { StorageLocation::Calldata }

        rule function_definition() -> FunctionDefinition
            = start:position!() header:function_header()
              attributes:(_ a:function_attribute() { a })*
              returns:(_ kw("returns") _ r:parameter_list() { r })?
              _ body:function_body() end:position!() {
                FunctionDefinition {
                    kind: header.kind,
                    name: header.name,
                    parameters: header.parameters,
                    attributes,
                    returns: returns.unwrap_or_default(),
                    body,
                    location: Location::new(start, end),
                }
            }

        rule function_header() -> FunctionHeader
            = kw("function") _ name:function_name() _ parameters:parameter_list() {
                FunctionHeader { kind: FunctionKind::Function, name: Some(name), parameters }
            }
            / kw("constructor") _ parameters:parameter_list() {
                FunctionHeader { kind: FunctionKind::Constructor, name: None, parameters }
            }
            / kw("fallback") _ parameters:parameter_list() {
                FunctionHeader { kind: FunctionKind::Fallback, name: None, parameters }
            }
            / kw("receive") _ parameters:parameter_list() {
                FunctionHeader { kind: FunctionKind::Receive, name: None, parameters }
            }
            / kw("modifier") _ name:identifier() parameters:(_ p:parameter_list() { p })? {
                FunctionHeader { kind: FunctionKind::Modifier, name: Some(name), parameters: parameters.unwrap_or_default() }
            }

        rule function_name() -> Identifier
            = start:position!() name:$(ident_start() ident_char()*) end:position!() {?
                if is_reserved(name) && name != "fallback" && name != "receive" {
                    Err("function name")
                } else {
                    Ok(Identifier { name: name.to_string(), location: Location::new(start, end) })
                }
            }

        rule function_body() -> Option<Block>
            = b:block() { Some(b) }
            / ";" { None }

        rule function_attribute() -> FunctionAttribute
            = v:visibility() { FunctionAttribute::Visibility(v) }
            / m:mutability() { FunctionAttribute::Mutability(m) }
            / kw("virtual") { FunctionAttribute::Virtual }
            / o:override_specifier() { FunctionAttribute::Override(o) }
            / m:modifier_invocation() { FunctionAttribute::Modifier(m) }

        rule modifier_invocation() -> ModifierInvocation
            = start:position!() name:identifier_path() arguments:(_ "(" _ a:(expression() ** (_ "," _)) _ ")" { a })? end:position!() {
                ModifierInvocation { name, arguments, location: Location::new(start, end) }
            }

        rule parameter_list() -> Vec<VariableDeclaration>
            = "(" _ parameters:(parameter() ** (_ "," _)) _ ")" { parameters }

        rule parameter() -> VariableDeclaration
            = start:position!() ty:type_name() storage:(_ s:storage_location() { s })? name:(_ i:identifier() { i })? end:position!() {
                VariableDeclaration { ty, storage, name, location: Location::new(start, end) }
            }

        rule named_variable_declaration() -> VariableDeclaration
            = start:position!() ty:type_name() storage:(_ s:storage_location() { s })? _ name:identifier() end:position!() {
                VariableDeclaration { ty, storage, name: Some(name), location: Location::new(start, end) }
            }

        rule struct_definition() -> StructDefinition
            = start:position!() kw("struct") _ name:identifier() _ "{" members:(_ m:named_variable_declaration() _ ";" { m })* _ "}" end:position!() {
                StructDefinition { name, members, location: Location::new(start, end) }
            }

        rule enum_definition() -> EnumDefinition
            = start:position!() kw("enum") _ name:identifier() _ "{" _ values:(identifier() ** (_ "," _)) _ ("," _)? "}" end:position!() {
                EnumDefinition { name, values, location: Location::new(start, end) }
            }

        rule event_definition() -> EventDefinition
            = start:position!() kw("event") _ name:identifier() _ "(" _ parameters:(event_parameter() ** (_ "," _)) _ ")"
              anonymous:(_ kw("anonymous"))? _ ";" end:position!() {
                EventDefinition { name, parameters, anonymous: anonymous.is_some(), location: Location::new(start, end) }
            }

        rule event_parameter() -> EventParameter
            = start:position!() ty:type_name() indexed:(_ kw("indexed"))? name:(_ i:identifier() { i })? end:position!() {
                EventParameter { ty, indexed: indexed.is_some(), name, location: Location::new(start, end) }
            }

        rule error_definition() -> ErrorDefinition
            = start:position!() kw("error") _ name:identifier() _ parameters:parameter_list() _ ";" end:position!() {
                ErrorDefinition { name, parameters, location: Location::new(start, end) }
            }

        rule type_definition() -> TypeDefinition
            = start:position!() kw("type") _ name:identifier() _ kw("is") _ ty:type_name() _ ";" end:position!() {
                TypeDefinition { name, ty, location: Location::new(start, end) }
            }

        rule using_directive() -> UsingDirective
            = start:position!() kw("using") _ target:using_target() _ kw("for") _
              ty:("*" { None } / t:type_name() { Some(t) })
              global:(_ kw("global"))? _ ";" end:position!() {
                UsingDirective { target, ty, global: global.is_some(), location: Location::new(start, end) }
            }

        rule using_target() -> UsingTarget
            = "{" _ functions:(using_function() ** (_ "," _)) _ "}" { UsingTarget::Functions(functions) }
            / path:identifier_path() { UsingTarget::Library(path) }

        rule using_function() -> UsingFunction
            = path:identifier_path() operator:(_ kw("as") _ o:$(['+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '~' | '<' | '>' | '=' | '!']+) { o.to_string() })? {
                UsingFunction { path, operator }
            }

        // Type names

        rule type_name() -> TypeName
            = start:position!() base:type_name_base() suffixes:(_ "[" _ length:expression()? _ "]" end:position!() { (length, end) })* {
                suffixes.into_iter().fold(base, |base, (length, end)| TypeName {
                    kind: TypeNameKind::Array { base: Box::new(base), length: length.map(Box::new) },
                    location: Location::new(start, end),
                })
            }

        rule type_name_base() -> TypeName
            = start:position!() kw("mapping") _ "(" _ key:type_name() key_name:(_ i:identifier() { i })? _ "=>" _
              value:type_name() value_name:(_ i:identifier() { i })? _ ")" end:position!() {
                TypeName {
                    kind: TypeNameKind::Mapping { key: Box::new(key), key_name, value: Box::new(value), value_name },
                    location: Location::new(start, end),
                }
            }
            / start:position!() kw("function") _ parameters:parameter_list()
              attributes:(_ a:function_type_attribute() { a })*
              returns:(_ kw("returns") _ r:parameter_list() { r })? end:position!() {
                TypeName {
                    kind: TypeNameKind::Function { parameters, attributes, returns: returns.unwrap_or_default() },
                    location: Location::new(start, end),
                }
            }
            / start:position!() kw("address") _ kw("payable") end:position!() {
                TypeName { kind: TypeNameKind::Elementary("address payable".to_string()), location: Location::new(start, end) }
            }
            / start:position!() name:elementary_type_word() end:position!() {
                TypeName { kind: TypeNameKind::Elementary(name), location: Location::new(start, end) }
            }
            / path:identifier_path() {
                let location = path.location;
                TypeName { kind: TypeNameKind::UserDefined(path), location }
            }

        rule function_type_attribute() -> FunctionAttribute
            = v:visibility() { FunctionAttribute::Visibility(v) }
            / m:mutability() { FunctionAttribute::Mutability(m) }

        rule elementary_type_word() -> String
            = name:$(ident_start() ident_char()*) {?
                if is_elementary_type(name) { Ok(name.to_string()) } else { Err("elementary type") }
            }

        rule identifier_path() -> IdentifierPath
            = identifiers:(identifier() ++ (_ "." _)) { identifier_path(identifiers) }

        // Statements

        pub(crate) rule block() -> Block
            = start:position!() "{" statements:(_ s:statement() { s })* _ "}" end:position!() {
                Block { statements, location: Location::new(start, end) }
            }

        rule statement() -> Statement
            = b:block() { Statement::Block(b) }
            / if_statement()
            / for_statement()
            / while_statement()
            / do_while_statement()
            / return_statement()
            / emit_statement()
            / revert_statement()
            / try_statement()
            / assembly_statement()
            / start:position!() kw("unchecked") _ b:block() { Statement::Unchecked(b) }
            / start:position!() kw("break") _ ";" end:position!() { Statement::Break(Location::new(start, end)) }
            / start:position!() kw("continue") _ ";" end:position!() { Statement::Continue(Location::new(start, end)) }
            / simple_statement()

        rule simple_statement() -> Statement
            = variable_declaration_statement()
            / expression_statement()

        rule if_statement() -> Statement
            = start:position!() kw("if") _ "(" _ condition:expression() _ ")" _ then:statement()
              otherwise:(_ kw("else") _ s:statement() { s })? end:position!() {
                Statement::If {
                    condition,
                    then: Box::new(then),
                    otherwise: otherwise.map(Box::new),
                    location: Location::new(start, end),
                }
            }

        rule for_statement() -> Statement
            = start:position!() kw("for") _ "(" _ init:(s:simple_statement() { Some(Box::new(s)) } / ";" { None }) _
              condition:expression()? _ ";" _ update:expression()? _ ")" _ body:statement() end:position!() {
                Statement::For { init, condition, update, body: Box::new(body), location: Location::new(start, end) }
            }

        rule while_statement() -> Statement
            = start:position!() kw("while") _ "(" _ condition:expression() _ ")" _ body:statement() end:position!() {
                Statement::While { condition, body: Box::new(body), location: Location::new(start, end) }
            }

        rule do_while_statement() -> Statement
            = start:position!() kw("do") _ body:statement() _ kw("while") _ "(" _ condition:expression() _ ")" _ ";" end:position!() {
                Statement::DoWhile { body: Box::new(body), condition, location: Location::new(start, end) }
            }

        rule return_statement() -> Statement
            = start:position!() kw("return") value:(_ e:expression() { e })? _ ";" end:position!() {
                Statement::Return { value, location: Location::new(start, end) }
            }

        rule emit_statement() -> Statement
            = start:position!() kw("emit") _ event:expression() _ ";" end:position!() {
                Statement::Emit { event, location: Location::new(start, end) }
            }

        rule revert_statement() -> Statement
            = start:position!() kw("revert") _ !"(" error:expression() _ ";" end:position!() {
                Statement::Revert { error, location: Location::new(start, end) }
            }

        rule try_statement() -> Statement
            = start:position!() kw("try") _ expression:expression()
              returns:(_ kw("returns") _ r:parameter_list() { r })? _ body:block()
              catches:(_ c:catch_clause() { c })+ end:position!() {
                Statement::Try {
                    expression,
                    returns: returns.unwrap_or_default(),
                    body,
                    catches,
                    location: Location::new(start, end),
                }
            }

        rule catch_clause() -> CatchClause
            = start:position!() kw("catch") name:(_ i:identifier() { i })? parameters:(_ p:parameter_list() { p })? _ body:block() end:position!() {
                CatchClause { name, parameters: parameters.unwrap_or_default(), body, location: Location::new(start, end) }
            }

        rule assembly_statement() -> Statement
            = start:position!() kw("assembly") (_ string_part())? (_ "(" [^')']* ")")? _ yul_block() end:position!() {
                Statement::Assembly { location: Location::new(start, end) }
            }

        rule yul_block()
            = "{" (yul_block() / string_part() / comment() / [^'{' | '}'])* "}"

        rule variable_declaration_statement() -> Statement
            = start:position!() declaration:named_variable_declaration()
              initializer:(_ "=" _ e:expression() { e })? _ ";" end:position!() {
                Statement::VariableDeclaration {
                    declarations: vec![Some(declaration)],
                    initializer,
                    location: Location::new(start, end),
                }
            }
            / start:position!() "(" _ declarations:(tuple_declaration() ** (_ "," _)) _ ")" _ "=" _ initializer:expression() _ ";" end:position!() {?
                if declarations.iter().any(Option::is_some) {
                    Ok(Statement::VariableDeclaration {
                        declarations,
                        initializer: Some(initializer),
                        location: Location::new(start, end),
                    })
                } else {
                    Err("variable declaration")
                }
            }

        rule tuple_declaration() -> Option<VariableDeclaration>
            = d:named_variable_declaration()? { d }

        rule expression_statement() -> Statement
            = start:position!() expression:expression() _ ";" end:position!() {
                Statement::Expression { expression, location: Location::new(start, end) }
            }

        // Expressions

        pub(crate) rule expression() -> Expression = precedence! {
            x:@ _ op:assignment_operator() _ y:(@) { Expression::assignment(op, x, y) }
            --
            c:@ _ "?" _ t:expression() _ ":" _ f:(@) { Expression::conditional(c, t, f) }
            --
            x:(@) _ "||" _ y:@ { Expression::binary(BinaryOperator::Or, x, y) }
            --
            x:(@) _ "&&" _ y:@ { Expression::binary(BinaryOperator::And, x, y) }
            --
            x:(@) _ "==" _ y:@ { Expression::binary(BinaryOperator::Equal, x, y) }
            x:(@) _ "!=" _ y:@ { Expression::binary(BinaryOperator::NotEqual, x, y) }
            --
            x:(@) _ "<=" _ y:@ { Expression::binary(BinaryOperator::LessEqual, x, y) }
            x:(@) _ ">=" _ y:@ { Expression::binary(BinaryOperator::GreaterEqual, x, y) }
            x:(@) _ "<" !['<' | '='] _ y:@ { Expression::binary(BinaryOperator::Less, x, y) }
            x:(@) _ ">" !['>' | '='] _ y:@ { Expression::binary(BinaryOperator::Greater, x, y) }
            --
            x:(@) _ "|" !['|' | '='] _ y:@ { Expression::binary(BinaryOperator::BitOr, x, y) }
            --
            x:(@) _ "^" !['='] _ y:@ { Expression::binary(BinaryOperator::BitXor, x, y) }
            --
            x:(@) _ "&" !['&' | '='] _ y:@ { Expression::binary(BinaryOperator::BitAnd, x, y) }
            --
            x:(@) _ "<<" !['='] _ y:@ { Expression::binary(BinaryOperator::ShiftLeft, x, y) }
            x:(@) _ ">>" !['='] _ y:@ { Expression::binary(BinaryOperator::ShiftRight, x, y) }
            --
            x:(@) _ "+" !['+' | '='] _ y:@ { Expression::binary(BinaryOperator::Add, x, y) }
            x:(@) _ "-" !['-' | '='] _ y:@ { Expression::binary(BinaryOperator::Subtract, x, y) }
            --
            x:(@) _ "*" !['*' | '='] _ y:@ { Expression::binary(BinaryOperator::Multiply, x, y) }
            x:(@) _ "/" !['='] _ y:@ { Expression::binary(BinaryOperator::Divide, x, y) }
            x:(@) _ "%" !['='] _ y:@ { Expression::binary(BinaryOperator::Modulo, x, y) }
            --
            x:@ _ "**" _ y:(@) { Expression::binary(BinaryOperator::Power, x, y) }
            --
            u:unary_expression() { u }
        }

        rule assignment_operator() -> AssignmentOperator
            = "=" !['=' | '>'] { AssignmentOperator::Assign }
            / "+=" { AssignmentOperator::Add }
            / "-=" { AssignmentOperator::Subtract }
            / "*=" { AssignmentOperator::Multiply }
            / "/=" { AssignmentOperator::Divide }
            / "%=" { AssignmentOperator::Modulo }
            / "|=" { AssignmentOperator::BitOr }
            / "&=" { AssignmentOperator::BitAnd }
            / "^=" { AssignmentOperator::BitXor }
            / "<<=" { AssignmentOperator::ShiftLeft }
            / ">>=" { AssignmentOperator::ShiftRight }

        rule unary_expression() -> Expression
            = start:position!() operator:prefix_operator() _ operand:unary_expression() {
                let location = Location::new(start, operand.location.end);
                Expression::new(ExpressionKind::Unary { operator, operand: Box::new(operand) }, location)
            }
            / postfix_expression()

        rule prefix_operator() -> UnaryOperator
            = "++" { UnaryOperator::PreIncrement }
            / "--" { UnaryOperator::PreDecrement }
            / "!" { UnaryOperator::Not }
            / "~" { UnaryOperator::BitNot }
            / "-" { UnaryOperator::Negate }
            / "+" { UnaryOperator::Plus }
            / kw("delete") { UnaryOperator::Delete }

        rule postfix_expression() -> Expression
            = base:primary_expression() operations:(_ op:postfix_operation() end:position!() { (op, end) })* {
                operations.into_iter().fold(base, |base, (op, end)| op.apply(base, end))
            }

        rule postfix_operation() -> PostfixOperation
            = "." _ member:member_name() { PostfixOperation::Member(member) }
            / "[" _ start:expression()? _ ":" _ end:expression()? _ "]" { PostfixOperation::Range(start, end) }
            / "[" _ index:expression()? _ "]" { PostfixOperation::Index(index) }
            / "(" _ arguments:call_arguments() _ ")" { PostfixOperation::Call(arguments) }
            / "{" _ options:(named_argument() ++ (_ "," _)) _ "}" { PostfixOperation::Options(options) }
            / "++" { PostfixOperation::Increment }
            / "--" { PostfixOperation::Decrement }

        rule call_arguments() -> CallArguments
            = "{" _ arguments:(named_argument() ** (_ "," _)) _ ("," _)? "}" { CallArguments::Named(arguments) }
            / arguments:(expression() ** (_ "," _)) { CallArguments::Positional(arguments) }

        rule named_argument() -> NamedArgument
            = name:identifier() _ ":" _ value:expression() { NamedArgument { name, value } }

        rule primary_expression() -> Expression
            = start:position!() kw("new") _ ty:type_name() end:position!() {
                Expression::new(ExpressionKind::New(ty), Location::new(start, end))
            }
            / start:position!() kw("type") _ "(" _ ty:type_name() _ ")" end:position!() {
                Expression::new(ExpressionKind::TypeInfo(ty), Location::new(start, end))
            }
            / start:position!() kw("payable") end:position!() &(_ "(") {
                Expression::new(ExpressionKind::ElementaryType("payable".to_string()), Location::new(start, end))
            }
            / start:position!() literal:literal() end:position!() {
                Expression::new(ExpressionKind::Literal(literal), Location::new(start, end))
            }
            / start:position!() name:elementary_type_word() end:position!() {
                Expression::new(ExpressionKind::ElementaryType(name), Location::new(start, end))
            }
            / start:position!() "(" _ items:(tuple_item() ** (_ "," _)) _ ")" end:position!() {
                let items = if matches!(items.as_slice(), [None]) { Vec::new() } else { items };
                Expression::new(ExpressionKind::Tuple(items), Location::new(start, end))
            }
            / start:position!() "[" _ items:(expression() ** (_ "," _)) _ "]" end:position!() {
                Expression::new(ExpressionKind::Array(items), Location::new(start, end))
            }
            / identifier:identifier() {
                let location = identifier.location;
                Expression::new(ExpressionKind::Identifier(identifier), location)
            }

        rule tuple_item() -> Option<Expression>
            = e:expression()? { e }

        rule literal() -> Literal
            = kw("true") { Literal::Bool(true) }
            / kw("false") { Literal::Bool(false) }
            / "hex" parts:(hex_string_part() ++ _) { Literal::HexString(parts.concat()) }
            / ("unicode" &['"' | '\''])? parts:(string_part() ++ _) { Literal::String(parts.concat()) }
            / number_literal()

        rule number_literal() -> Literal
            = value:$(hex_number() / decimal_number()) !ident_char() unit:(_ u:unit() { u })? {
                Literal::Number { value: value.to_string(), unit }
            }

        rule hex_number()
            = "0" ['x' | 'X'] ['0'..='9' | 'a'..='f' | 'A'..='F' | '_']+

        rule decimal_number()
            = ['0'..='9'] ['0'..='9' | '_']* ("." ['0'..='9'] ['0'..='9' | '_']*)? (['e' | 'E'] "-"? ['0'..='9']+)?

        rule unit() -> String
            = word:$(ident_start() ident_char()*) {?
                if UNITS.contains(&word) { Ok(word.to_string()) } else { Err("unit") }
            }

        rule string_literal() -> StringLiteral
            = start:position!() value:string_part() end:position!() {
                StringLiteral { value, location: Location::new(start, end) }
            }

        rule string_part() -> String
            = "\"" s:$(("\\" [_] / [^'"' | '\\' | '\n'])*) "\"" { s.to_string() }
            / "'" s:$(("\\" [_] / [^'\'' | '\\' | '\n'])*) "'" { s.to_string() }

        rule hex_string_part() -> String
            = "\"" s:$(['0'..='9' | 'a'..='f' | 'A'..='F' | '_']*) "\"" { s.to_string() }
            / "'" s:$(['0'..='9' | 'a'..='f' | 'A'..='F' | '_']*) "'" { s.to_string() }

        rule member_name() -> Identifier
            = start:position!() name:$(ident_start() ident_char()*) end:position!() {
                Identifier { name: name.to_string(), location: Location::new(start, end) }
            }

        // Lexical

        pub(crate) rule identifier() -> Identifier
            = start:position!() name:$(ident_start() ident_char()*) end:position!() {?
                if is_reserved(name) {
                    Err("identifier")
                } else {
                    Ok(Identifier { name: name.to_string(), location: Location::new(start, end) })
                }
            }

        rule kw(keyword: &'static str)
            = word:$(ident_start() ident_char()*) {?
                if word == keyword { Ok(()) } else { Err(keyword) }
            }

        rule ident_start() = ['a'..='z' | 'A'..='Z' | '_' | '$']

        rule ident_char() = ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '$']

        rule comment()
            = "//" [^'\n']*
            / "/*" (!"*/" [_])* "*/"

        rule whitespace() = [' ' | '\t' | '\n' | '\r' | '\u{c}']

        rule _() = quiet!{ (whitespace() / comment())* }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[allow(clippy::panic)]
    fn parse_expression(input: &str) -> Expression {
        solidity_parser::expression(input).unwrap_or_else(|e| panic!("{input}: {e}"))
    }

    #[test]
    #[allow(clippy::panic, clippy::indexing_slicing)]
    fn test_binary_precedence() {
        let expression = parse_expression("a + b * c");
        let ExpressionKind::Binary { operator, right, .. } = expression.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(operator, BinaryOperator::Add);
        assert!(matches!(
            right.kind,
            ExpressionKind::Binary { operator: BinaryOperator::Multiply, .. }
        ));
    }

    #[test]
    #[allow(clippy::panic, clippy::indexing_slicing)]
    fn test_power_is_right_associative() {
        let expression = parse_expression("a ** b ** c");
        let ExpressionKind::Binary { left, right, .. } = expression.kind else {
            panic!("expected binary expression");
        };
        assert!(matches!(left.kind, ExpressionKind::Identifier(_)));
        assert!(matches!(
            right.kind,
            ExpressionKind::Binary { operator: BinaryOperator::Power, .. }
        ));
    }

    #[test]
    fn test_compound_assignment_is_not_comparison() {
        let expression = parse_expression("a <<= 2");
        assert!(matches!(
            expression.kind,
            ExpressionKind::Assignment { operator: AssignmentOperator::ShiftLeft, .. }
        ));
        let expression = parse_expression("a <= 2");
        assert!(matches!(
            expression.kind,
            ExpressionKind::Binary { operator: BinaryOperator::LessEqual, .. }
        ));
    }

    #[test]
    #[allow(clippy::panic, clippy::indexing_slicing)]
    fn test_member_chain_locations() {
        let input = "msg.sender.balance";
        let expression = parse_expression(input);
        assert_eq!(expression.location, Location::new(0, input.len()));
        let ExpressionKind::MemberAccess { expression: base, member } = expression.kind else {
            panic!("expected member access");
        };
        assert_eq!(member.name, "balance");
        assert_eq!(member.location, Location::new(11, 18));
        assert_eq!(base.location, Location::new(0, 10));
    }

    #[test]
    #[allow(clippy::panic, clippy::indexing_slicing)]
    fn test_call_with_options_and_named_arguments() {
        let expression = parse_expression("target.call{value: 1 ether}(data)");
        let ExpressionKind::Call { callee, arguments } = expression.kind else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 1);
        assert!(matches!(callee.kind, ExpressionKind::CallOptions { .. }));

        let expression = parse_expression("f({a: 1, b: 2})");
        let ExpressionKind::Call { arguments, .. } = expression.kind else {
            panic!("expected call");
        };
        assert!(matches!(arguments, CallArguments::Named(ref named) if named.len() == 2));
    }

    #[test]
    fn test_number_with_unit() {
        let expression = parse_expression("2 days");
        assert_eq!(
            expression.kind,
            ExpressionKind::Literal(Literal::Number {
                value: "2".to_string(),
                unit: Some("days".to_string())
            })
        );
        assert_eq!(expression.location, Location::new(0, 6));
    }

    #[test]
    fn test_conditional() {
        let expression = parse_expression("a > b ? a : b");
        assert!(matches!(expression.kind, ExpressionKind::Conditional { .. }));
    }

    #[test]
    #[allow(clippy::panic, clippy::indexing_slicing)]
    fn test_type_info_and_payable() {
        assert!(matches!(
            parse_expression("type(uint256).max").kind,
            ExpressionKind::MemberAccess { .. }
        ));
        let expression = parse_expression("payable(msg.sender)");
        let ExpressionKind::Call { callee, .. } = expression.kind else {
            panic!("expected call");
        };
        assert_eq!(callee.kind, ExpressionKind::ElementaryType("payable".to_string()));
    }

    #[test]
    #[allow(clippy::panic, clippy::indexing_slicing)]
    fn test_empty_tuple_and_holes() {
        assert_eq!(parse_expression("()").kind, ExpressionKind::Tuple(Vec::new()));
        let ExpressionKind::Tuple(items) = parse_expression("(, b)").kind else {
            panic!("expected tuple");
        };
        assert_eq!(items.len(), 2);
        assert!(items[0].is_none());
    }

    #[test]
    #[allow(clippy::panic, clippy::indexing_slicing)]
    fn test_block_with_statements() {
        let input = "{ uint256 a = 1; (bool ok, ) = to.call(\"\"); a += 2; unchecked { a++; } assembly { let x := 1 } }";
        let block = solidity_parser::block(input).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(block.statements.len(), 5);
        assert!(matches!(block.statements[0], Statement::VariableDeclaration { .. }));
        assert!(matches!(
            &block.statements[1],
            Statement::VariableDeclaration { declarations, .. } if declarations.len() == 2 && declarations[1].is_none()
        ));
        assert!(matches!(block.statements[2], Statement::Expression { .. }));
        assert!(matches!(block.statements[3], Statement::Unchecked(_)));
        assert!(matches!(block.statements[4], Statement::Assembly { .. }));
    }

    #[test]
    #[allow(clippy::panic, clippy::indexing_slicing)]
    fn test_try_catch_and_revert() {
        let input = "{ try token.transfer(to, 1) returns (bool ok) { return; } catch Error(string memory reason) { revert Failed(reason); } catch { revert(\"x\"); } }";
        let block = solidity_parser::block(input).unwrap_or_else(|e| panic!("{e}"));
        let Statement::Try { catches, returns, body, .. } = &block.statements[0] else {
            panic!("expected try statement");
        };
        assert_eq!(returns.len(), 1);
        assert_eq!(catches.len(), 2);
        assert!(matches!(catches[0].body.statements[0], Statement::Revert { .. }));
        assert!(matches!(catches[1].body.statements[0], Statement::Expression { .. }));
        assert!(matches!(body.statements[0], Statement::Return { value: None, .. }));
    }

    #[test]
    fn test_reserved_word_is_not_identifier() {
        assert!(solidity_parser::identifier("contract").is_err());
        assert!(solidity_parser::identifier("owner").is_ok());
        assert!(solidity_parser::identifier("_").is_ok());
    }
}
