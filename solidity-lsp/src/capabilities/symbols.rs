//! Document symbols: the outline of contracts and their members

use solidity_parser::{ContractKind, FunctionKind};
use tower_lsp::lsp_types::{DocumentSymbol, SymbolKind};

use crate::model::info::signature;
use crate::model::{Declaration, DeclarationKind, ParsedDocument, VariableRole};

/// Extract the document outline as nested symbols
#[must_use]
pub fn document_symbols(document: &ParsedDocument) -> Vec<DocumentSymbol> {
    document
        .roots()
        .filter_map(|declaration| declaration_to_symbol(document, declaration))
        .collect()
}

fn declaration_to_symbol(document: &ParsedDocument, declaration: &Declaration) -> Option<DocumentSymbol> {
    let kind = symbol_kind(declaration)?;
    let children: Vec<DocumentSymbol> = match &declaration.kind {
        DeclarationKind::Contract { .. } | DeclarationKind::Struct | DeclarationKind::Enum => document
            .children(declaration.id)
            .filter_map(|child| declaration_to_symbol(document, child))
            .collect(),
        DeclarationKind::Function(_)
        | DeclarationKind::Event { .. }
        | DeclarationKind::Error
        | DeclarationKind::EnumValue
        | DeclarationKind::CustomType { .. }
        | DeclarationKind::Variable(_)
        | DeclarationKind::Import(_)
        | DeclarationKind::Using(_) => Vec::new(),
    };
    let name = match (&declaration.kind, declaration.name.is_empty()) {
        (DeclarationKind::Function(info), true) => info.kind.to_string(),
        (_, true) => return None,
        (_, false) => declaration.name.clone(),
    };
    let range = document.range_of(&declaration.location);
    #[allow(deprecated)] // deprecated field but required by the type
    Some(DocumentSymbol {
        name,
        detail: Some(signature(document, declaration)),
        kind,
        tags: None,
        deprecated: None,
        range,
        selection_range: declaration
            .name_location
            .map_or(range, |location| document.range_of(&location)),
        children: (!children.is_empty()).then_some(children),
    })
}

fn symbol_kind(declaration: &Declaration) -> Option<SymbolKind> {
    Some(match &declaration.kind {
        DeclarationKind::Contract { kind, .. } => match kind {
            ContractKind::Interface => SymbolKind::INTERFACE,
            ContractKind::Library => SymbolKind::MODULE,
            ContractKind::Contract | ContractKind::AbstractContract => SymbolKind::CLASS,
        },
        DeclarationKind::Function(info) => match info.kind {
            FunctionKind::Constructor => SymbolKind::CONSTRUCTOR,
            FunctionKind::Function | FunctionKind::Fallback | FunctionKind::Receive => {
                if declaration.parent.is_some() {
                    SymbolKind::METHOD
                } else {
                    SymbolKind::FUNCTION
                }
            }
            FunctionKind::Modifier => SymbolKind::FUNCTION,
        },
        DeclarationKind::Struct => SymbolKind::STRUCT,
        DeclarationKind::Enum => SymbolKind::ENUM,
        DeclarationKind::EnumValue => SymbolKind::ENUM_MEMBER,
        DeclarationKind::Event { .. } => SymbolKind::EVENT,
        DeclarationKind::Error => SymbolKind::OBJECT,
        DeclarationKind::CustomType { .. } => SymbolKind::TYPE_PARAMETER,
        DeclarationKind::Variable(info) => match info.role {
            VariableRole::Constant => SymbolKind::CONSTANT,
            VariableRole::State | VariableRole::StructMember => {
                if info.constant {
                    SymbolKind::CONSTANT
                } else {
                    SymbolKind::FIELD
                }
            }
            VariableRole::Parameter
            | VariableRole::Return
            | VariableRole::Local
            | VariableRole::EventParameter
            | VariableRole::ErrorParameter => return None,
        },
        DeclarationKind::Import(_) | DeclarationKind::Using(_) => return None,
    })
}
