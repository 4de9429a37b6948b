//! Display text for declarations: signatures, hover bodies and completion entries

use solidity_parser::{ContractKind, FunctionKind};
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionItemLabelDetails, Documentation,
    InsertTextFormat, MarkupContent, MarkupKind,
};

use crate::builtins::{Builtin, BuiltinKind};
use crate::model::natspec::Natspec;
use crate::model::{Declaration, DeclarationKind, ParsedDocument, VariableInfo, VariableRole};

/// One-line (or, for structs and enums, block) Solidity rendering of a declaration.
#[must_use]
pub fn signature(document: &ParsedDocument, declaration: &Declaration) -> String {
    match &declaration.kind {
        DeclarationKind::Contract { kind, bases } => {
            let bases: Vec<&str> = bases
                .iter()
                .filter_map(|id| document.expression(*id))
                .map(|e| e.name.as_str())
                .collect();
            if bases.is_empty() {
                format!("{kind} {}", declaration.name)
            } else {
                format!("{kind} {} is {}", declaration.name, bases.join(", "))
            }
        }
        DeclarationKind::Function(info) => {
            let parameters = parameter_list(document, &info.parameters);
            let mut out = match info.kind {
                FunctionKind::Function => format!("function {}({parameters})", declaration.name),
                FunctionKind::Modifier => format!("modifier {}({parameters})", declaration.name),
                FunctionKind::Constructor => format!("constructor({parameters})"),
                FunctionKind::Fallback => format!("fallback({parameters})"),
                FunctionKind::Receive => "receive()".to_string(),
            };
            if let Some(visibility) = info.visibility {
                out.push_str(&format!(" {visibility}"));
            }
            if let Some(mutability) = info.mutability {
                out.push_str(&format!(" {mutability}"));
            }
            if info.is_virtual {
                out.push_str(" virtual");
            }
            if info.overrides {
                out.push_str(" override");
            }
            if !info.returns.is_empty() {
                out.push_str(&format!(" returns ({})", parameter_list(document, &info.returns)));
            }
            out
        }
        DeclarationKind::Struct => {
            let members: String = document
                .children(declaration.id)
                .map(|member| format!("    {};\n", variable_signature(member)))
                .collect();
            format!("struct {} {{\n{members}}}", declaration.name)
        }
        DeclarationKind::Event { anonymous } => {
            let parameters = parameter_list(document, &declaration.children);
            let anonymous = if *anonymous { " anonymous" } else { "" };
            format!("event {}({parameters}){anonymous}", declaration.name)
        }
        DeclarationKind::Error => format!(
            "error {}({})",
            declaration.name,
            parameter_list(document, &declaration.children)
        ),
        DeclarationKind::Enum => {
            let values: Vec<&str> = document
                .children(declaration.id)
                .map(|value| value.name.as_str())
                .collect();
            format!("enum {} {{ {} }}", declaration.name, values.join(", "))
        }
        DeclarationKind::EnumValue => {
            let parent = declaration
                .parent
                .and_then(|id| document.declaration(id))
                .map_or("", |parent| parent.name.as_str());
            format!("{parent}.{}", declaration.name)
        }
        DeclarationKind::CustomType { underlying } => {
            format!("type {} is {underlying}", declaration.name)
        }
        DeclarationKind::Variable(_) => variable_signature(declaration),
        DeclarationKind::Import(info) => match &info.alias {
            Some(alias) => format!("import \"{}\" as {}", info.specifier, alias.name),
            None => format!("import \"{}\"", info.specifier),
        },
        DeclarationKind::Using(info) => {
            let target = info
                .target
                .as_ref()
                .map_or_else(|| "*".to_string(), ToString::to_string);
            let subject = info
                .library
                .and_then(|id| document.expression(id))
                .map_or_else(
                    || {
                        let functions: Vec<&str> = info
                            .functions
                            .iter()
                            .filter_map(|id| document.expression(*id))
                            .map(|e| e.name.as_str())
                            .collect();
                        format!("{{{}}}", functions.join(", "))
                    },
                    |library| library.name.clone(),
                );
            let global = if info.global { " global" } else { "" };
            format!("using {subject} for {target}{global}")
        }
    }
}

fn variable_signature(declaration: &Declaration) -> String {
    let Some(info) = declaration.variable() else {
        return declaration.name.clone();
    };
    let mut parts = vec![info.ty.to_string()];
    parts.extend(variable_attributes(info));
    if !declaration.name.is_empty() {
        parts.push(declaration.name.clone());
    }
    parts.join(" ")
}

fn variable_attributes(info: &VariableInfo) -> Vec<String> {
    let mut attributes = Vec::new();
    if info.indexed {
        attributes.push("indexed".to_string());
    }
    if let Some(visibility) = info.visibility {
        attributes.push(visibility.to_string());
    }
    if info.constant {
        attributes.push("constant".to_string());
    }
    if info.immutable {
        attributes.push("immutable".to_string());
    }
    if let Some(storage) = info.storage {
        attributes.push(storage.to_string());
    }
    attributes
}

fn parameter_list(document: &ParsedDocument, ids: &[crate::model::DeclId]) -> String {
    ids.iter()
        .filter_map(|id| document.declaration(*id))
        .map(variable_signature)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The doc comment written directly above a declaration.
#[must_use]
pub fn natspec(document: &ParsedDocument, declaration: &Declaration) -> Option<Natspec> {
    Natspec::above(document.text(), &document.line_index, declaration.location.start)
}

/// Markdown body for hovering a declaration: a code block with its signature followed
/// by `documentation`.
#[must_use]
pub fn hover_markdown(
    document: &ParsedDocument,
    declaration: &Declaration,
    documentation: Option<&Natspec>,
) -> String {
    let mut out = format!("```solidity\n{}\n```", signature(document, declaration));
    if let Some(parent) = declaration
        .parent
        .and_then(|id| document.declaration(id))
        .filter(|parent| parent.is_contract() && !declaration.is_contract())
    {
        out = format!("*{}*\n{out}", parent.name);
    }
    if let Some(natspec) = documentation {
        let text = natspec.to_markdown();
        if !text.is_empty() {
            out.push_str("\n\n");
            out.push_str(&text);
        }
    }
    out
}

#[must_use]
pub fn builtin_markdown(builtin: &Builtin) -> String {
    format!(
        "```solidity\n{}\n```\n\n{}",
        builtin.signature, builtin.documentation
    )
}

/// Completion entry for a declaration, built once per declaration.
#[must_use]
pub fn completion_item<'a>(
    document: &ParsedDocument,
    declaration: &'a Declaration,
) -> &'a CompletionItem {
    declaration
        .completion
        .get_or_init(|| create_completion_item(document, declaration, false))
}

/// Completion entry for a library function used through `using ... for`, whose first
/// parameter is the receiver and therefore not part of the inserted call.
#[must_use]
pub fn extension_completion_item<'a>(
    document: &ParsedDocument,
    declaration: &'a Declaration,
) -> &'a CompletionItem {
    declaration
        .extension_completion
        .get_or_init(|| create_completion_item(document, declaration, true))
}

fn create_completion_item(
    document: &ParsedDocument,
    declaration: &Declaration,
    skip_self: bool,
) -> CompletionItem {
    let callable = match &declaration.kind {
        DeclarationKind::Function(info) => Some(info.parameters.as_slice()),
        DeclarationKind::Event { .. } | DeclarationKind::Error => {
            Some(declaration.children.as_slice())
        }
        DeclarationKind::Contract { .. }
        | DeclarationKind::Struct
        | DeclarationKind::Enum
        | DeclarationKind::EnumValue
        | DeclarationKind::CustomType { .. }
        | DeclarationKind::Variable(_)
        | DeclarationKind::Import(_)
        | DeclarationKind::Using(_) => None,
    };
    let (insert_text, insert_text_format) = match callable {
        Some(parameters) => {
            let names: Vec<String> = parameters
                .iter()
                .skip(usize::from(skip_self))
                .filter_map(|id| document.declaration(*id))
                .enumerate()
                .map(|(index, parameter)| {
                    let name = if parameter.name.is_empty() {
                        parameter
                            .variable()
                            .map_or_else(String::new, |info| info.ty.to_string())
                    } else {
                        parameter.name.clone()
                    };
                    format!("${{{}:{name}}}", index + 1)
                })
                .collect();
            (
                format!("{}({})", declaration.name, names.join(", ")),
                InsertTextFormat::SNIPPET,
            )
        }
        None => (declaration.name.clone(), InsertTextFormat::PLAIN_TEXT),
    };
    let documentation = hover_markdown(document, declaration, natspec(document, declaration).as_ref());
    let detail = match &declaration.kind {
        DeclarationKind::Variable(info) => Some(info.ty.to_string()),
        DeclarationKind::Contract { .. }
        | DeclarationKind::Function(_)
        | DeclarationKind::Struct
        | DeclarationKind::Event { .. }
        | DeclarationKind::Error
        | DeclarationKind::Enum
        | DeclarationKind::EnumValue
        | DeclarationKind::CustomType { .. }
        | DeclarationKind::Import(_)
        | DeclarationKind::Using(_) => Some(signature(document, declaration)),
    };
    CompletionItem {
        label: declaration.name.clone(),
        kind: Some(completion_kind(declaration)),
        detail,
        label_details: declaration
            .parent
            .and_then(|id| document.declaration(id))
            .filter(|parent| parent.is_contract())
            .map(|parent| CompletionItemLabelDetails {
                detail: None,
                description: Some(parent.name.clone()),
            }),
        documentation: Some(Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: documentation,
        })),
        insert_text: Some(insert_text),
        insert_text_format: Some(insert_text_format),
        ..CompletionItem::default()
    }
}

fn completion_kind(declaration: &Declaration) -> CompletionItemKind {
    match &declaration.kind {
        DeclarationKind::Contract { kind, .. } => match kind {
            ContractKind::Interface => CompletionItemKind::INTERFACE,
            ContractKind::Library => CompletionItemKind::MODULE,
            ContractKind::Contract | ContractKind::AbstractContract => CompletionItemKind::CLASS,
        },
        DeclarationKind::Function(info) => match info.kind {
            FunctionKind::Constructor => CompletionItemKind::CONSTRUCTOR,
            FunctionKind::Function
            | FunctionKind::Modifier
            | FunctionKind::Fallback
            | FunctionKind::Receive => {
                if declaration.parent.is_some() {
                    CompletionItemKind::METHOD
                } else {
                    CompletionItemKind::FUNCTION
                }
            }
        },
        DeclarationKind::Struct => CompletionItemKind::STRUCT,
        DeclarationKind::Event { .. } | DeclarationKind::Error => CompletionItemKind::EVENT,
        DeclarationKind::Enum => CompletionItemKind::ENUM,
        DeclarationKind::EnumValue => CompletionItemKind::ENUM_MEMBER,
        DeclarationKind::CustomType { .. } => CompletionItemKind::TYPE_PARAMETER,
        DeclarationKind::Variable(info) => match info.role {
            VariableRole::Constant => CompletionItemKind::CONSTANT,
            VariableRole::State | VariableRole::StructMember => {
                if info.constant {
                    CompletionItemKind::CONSTANT
                } else {
                    CompletionItemKind::FIELD
                }
            }
            VariableRole::Parameter
            | VariableRole::Return
            | VariableRole::Local
            | VariableRole::EventParameter
            | VariableRole::ErrorParameter => CompletionItemKind::VARIABLE,
        },
        DeclarationKind::Import(_) => CompletionItemKind::MODULE,
        DeclarationKind::Using(_) => CompletionItemKind::REFERENCE,
    }
}

#[must_use]
pub fn builtin_completion_item(builtin: &Builtin) -> CompletionItem {
    let (insert_text, insert_text_format) = if builtin.kind == BuiltinKind::Function {
        let parameters: Vec<String> = builtin
            .parameters
            .iter()
            .enumerate()
            .map(|(index, name)| format!("${{{}:{name}}}", index + 1))
            .collect();
        (
            format!("{}({})", builtin.name, parameters.join(", ")),
            InsertTextFormat::SNIPPET,
        )
    } else {
        (builtin.name.to_string(), InsertTextFormat::PLAIN_TEXT)
    };
    CompletionItem {
        label: builtin.name.to_string(),
        kind: Some(match builtin.kind {
            BuiltinKind::Variable => CompletionItemKind::VARIABLE,
            BuiltinKind::Function => CompletionItemKind::FUNCTION,
            BuiltinKind::Namespace => CompletionItemKind::MODULE,
        }),
        detail: Some(builtin.signature.to_string()),
        documentation: Some(Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: builtin.documentation.to_string(),
        })),
        insert_text: Some(insert_text),
        insert_text_format: Some(insert_text_format),
        ..CompletionItem::default()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::model::build;
    use crate::state::{Origin, SourceDocument};
    use pretty_assertions::assert_eq;

    #[allow(clippy::expect_used)]
    fn parse(text: &str) -> ParsedDocument {
        let source = SourceDocument::new(Path::new("/p/A.sol"), text, Origin::Editor);
        let unit = solidity_parser::parse(text).expect("valid solidity");
        build(source, &unit, Vec::new())
    }

    #[allow(clippy::expect_used)]
    fn find<'a>(document: &'a ParsedDocument, name: &str) -> &'a Declaration {
        document
            .declarations()
            .find(|d| d.name == name)
            .expect("declaration")
    }

    const TEXT: &str = "\
library SafeMath {
    /// @notice Adds two numbers
    function add(uint a, uint b) internal pure returns (uint) { return a + b; }
}

contract Token is Base, Ownable {
    event Transfer(address indexed from, address to, uint256 value);
    enum State { Open, Closed }
    mapping(address => uint256) public balances;
}
";

    #[test]
    fn test_signatures() {
        let document = parse(TEXT);
        assert_eq!(
            signature(&document, find(&document, "add")),
            "function add(uint a, uint b) internal pure returns (uint)"
        );
        assert_eq!(
            signature(&document, find(&document, "Token")),
            "contract Token is Base, Ownable"
        );
        assert_eq!(
            signature(&document, find(&document, "Transfer")),
            "event Transfer(address indexed from, address to, uint256 value)"
        );
        assert_eq!(signature(&document, find(&document, "State")), "enum State { Open, Closed }");
        assert_eq!(signature(&document, find(&document, "Closed")), "State.Closed");
        assert_eq!(
            signature(&document, find(&document, "balances")),
            "mapping(address => uint256) public balances"
        );
    }

    #[test]
    fn test_hover_includes_natspec() {
        let document = parse(TEXT);
        let add = find(&document, "add");
        let markdown = hover_markdown(&document, add, natspec(&document, add).as_ref());
        assert!(markdown.starts_with("*SafeMath*\n```solidity\nfunction add("));
        assert!(markdown.ends_with("Adds two numbers"));
    }

    #[test]
    fn test_completion_snippets() {
        let document = parse(TEXT);
        let add = find(&document, "add");
        let item = completion_item(&document, add);
        assert_eq!(item.insert_text.as_deref(), Some("add(${1:a}, ${2:b})"));
        assert_eq!(item.kind, Some(CompletionItemKind::METHOD));
        let extension = extension_completion_item(&document, add);
        assert_eq!(extension.insert_text.as_deref(), Some("add(${1:b})"));
        assert!(std::ptr::eq(item, completion_item(&document, add)));
    }
}
