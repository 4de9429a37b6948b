//! Semantic Tokens: highlighting of names by what they resolve to
//!
//! Declaration names are tokenized from the node graph, and every name reference gets
//! the token type of the declaration it resolves to. Names that do not resolve are left
//! to the editor's grammar.

use std::sync::Arc;

use solidity_parser::{ContractKind, FunctionKind, Location};
use tower_lsp::lsp_types::{
    SemanticToken, SemanticTokenModifier, SemanticTokenType, SemanticTokens,
    SemanticTokensFullOptions, SemanticTokensLegend, SemanticTokensOptions,
    WorkDoneProgressOptions,
};

use crate::builtins::BuiltinKind;
use crate::model::{Declaration, DeclarationKind, ParsedDocument, ReferenceKind, VariableRole};
use crate::resolve::{Resolved, Resolver};
use crate::state::Snapshot;

/// Semantic token types used by this LSP
pub const TOKEN_TYPES: &[SemanticTokenType] = &[
    SemanticTokenType::NAMESPACE,   // 0 - libraries, import aliases, builtin namespaces
    SemanticTokenType::CLASS,       // 1 - contracts
    SemanticTokenType::INTERFACE,   // 2 - interfaces
    SemanticTokenType::STRUCT,      // 3
    SemanticTokenType::ENUM,        // 4
    SemanticTokenType::ENUM_MEMBER, // 5
    SemanticTokenType::TYPE,        // 6 - errors, user-defined value types, elementary casts
    SemanticTokenType::FUNCTION,    // 7
    SemanticTokenType::DECORATOR,   // 8 - modifiers
    SemanticTokenType::EVENT,       // 9
    SemanticTokenType::PARAMETER,   // 10
    SemanticTokenType::VARIABLE,    // 11 - locals and builtin variables
    SemanticTokenType::PROPERTY,    // 12 - state variables, constants, struct members
];

/// Semantic token modifiers
pub const TOKEN_MODIFIERS: &[SemanticTokenModifier] = &[
    SemanticTokenModifier::DECLARATION,     // 1
    SemanticTokenModifier::READONLY,        // 2 - constant and immutable
    SemanticTokenModifier::DEFAULT_LIBRARY, // 4 - builtins
];

const NAMESPACE: u32 = 0;
const CLASS: u32 = 1;
const INTERFACE: u32 = 2;
const STRUCT: u32 = 3;
const ENUM: u32 = 4;
const ENUM_MEMBER: u32 = 5;
const TYPE: u32 = 6;
const FUNCTION: u32 = 7;
const DECORATOR: u32 = 8;
const EVENT: u32 = 9;
const PARAMETER: u32 = 10;
const VARIABLE: u32 = 11;
const PROPERTY: u32 = 12;

const DECLARATION: u32 = 1;
const READONLY: u32 = 2;
const DEFAULT_LIBRARY: u32 = 4;

/// Create the semantic tokens legend for capability registration
#[must_use]
pub fn create_legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: TOKEN_TYPES.to_vec(),
        token_modifiers: TOKEN_MODIFIERS.to_vec(),
    }
}

/// Create semantic tokens options for capability registration
#[must_use]
pub fn create_options() -> SemanticTokensOptions {
    SemanticTokensOptions {
        legend: create_legend(),
        full: Some(SemanticTokensFullOptions::Bool(true)),
        range: None,
        work_done_progress_options: WorkDoneProgressOptions::default(),
    }
}

/// Token being collected before encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawToken {
    line: u32,
    start_char: u32,
    length: u32,
    token_type: u32,
    token_modifiers: u32,
}

/// Compute semantic tokens for a document
#[must_use]
pub fn compute_semantic_tokens(snapshot: &Snapshot, document: &Arc<ParsedDocument>) -> SemanticTokens {
    let resolver = Resolver::new(snapshot);
    let mut tokens = Vec::new();

    for declaration in document.declarations() {
        if let Some(location) = declaration.name_location
            && let Some((token_type, modifiers)) = classify(declaration)
        {
            push_token(document, &location, token_type, modifiers | DECLARATION, &mut tokens);
        }
    }

    for expression in document.expressions() {
        let classified = if expression.kind == ReferenceKind::ElementaryType {
            Some((TYPE, DEFAULT_LIBRARY))
        } else {
            match resolver.resolve(document, expression.id) {
                Some(Resolved::Declaration(declared)) => declared.declaration().and_then(classify),
                Some(Resolved::Builtin(builtin)) => Some((
                    match builtin.kind {
                        BuiltinKind::Function => FUNCTION,
                        BuiltinKind::Namespace => NAMESPACE,
                        BuiltinKind::Variable => VARIABLE,
                    },
                    DEFAULT_LIBRARY,
                )),
                None => None,
            }
        };
        if let Some((token_type, modifiers)) = classified {
            push_token(document, &expression.location, token_type, modifiers, &mut tokens);
        }
    }

    // Sort by position for delta encoding
    tokens.sort_by(|a, b| a.line.cmp(&b.line).then(a.start_char.cmp(&b.start_char)));
    tokens.dedup_by(|a, b| a.line == b.line && a.start_char == b.start_char);

    SemanticTokens {
        result_id: None,
        data: delta_encode(tokens),
    }
}

fn classify(declaration: &Declaration) -> Option<(u32, u32)> {
    let token_type = match &declaration.kind {
        DeclarationKind::Contract { kind, .. } => match kind {
            ContractKind::Interface => INTERFACE,
            ContractKind::Library => NAMESPACE,
            ContractKind::Contract | ContractKind::AbstractContract => CLASS,
        },
        DeclarationKind::Function(info) => {
            if info.kind == FunctionKind::Modifier {
                DECORATOR
            } else {
                FUNCTION
            }
        }
        DeclarationKind::Struct => STRUCT,
        DeclarationKind::Enum => ENUM,
        DeclarationKind::EnumValue => ENUM_MEMBER,
        DeclarationKind::Event { .. } => EVENT,
        DeclarationKind::Error | DeclarationKind::CustomType { .. } => TYPE,
        DeclarationKind::Variable(info) => {
            let modifiers = if info.constant || info.immutable { READONLY } else { 0 };
            let token_type = match info.role {
                VariableRole::Parameter
                | VariableRole::Return
                | VariableRole::EventParameter
                | VariableRole::ErrorParameter => PARAMETER,
                VariableRole::Local => VARIABLE,
                VariableRole::State | VariableRole::Constant | VariableRole::StructMember => {
                    PROPERTY
                }
            };
            return Some((token_type, modifiers));
        }
        DeclarationKind::Import(_) => NAMESPACE,
        DeclarationKind::Using(_) => return None,
    };
    Some((token_type, 0))
}

fn push_token(
    document: &ParsedDocument,
    location: &Location,
    token_type: u32,
    token_modifiers: u32,
    tokens: &mut Vec<RawToken>,
) {
    let range = document.range_of(location);
    // Names never span lines; anything else is a recovery artifact.
    if range.start.line != range.end.line || range.end.character <= range.start.character {
        return;
    }
    tokens.push(RawToken {
        line: range.start.line,
        start_char: range.start.character,
        length: range.end.character - range.start.character,
        token_type,
        token_modifiers,
    });
}

/// Delta encode tokens for LSP format
fn delta_encode(tokens: Vec<RawToken>) -> Vec<SemanticToken> {
    let mut result = Vec::with_capacity(tokens.len());
    let mut prev_line = 0u32;
    let mut prev_start = 0u32;

    for token in tokens {
        let delta_line = token.line - prev_line;
        let delta_start = if delta_line == 0 {
            token.start_char - prev_start
        } else {
            token.start_char
        };

        result.push(SemanticToken {
            delta_line,
            delta_start,
            length: token.length,
            token_type: token.token_type,
            token_modifiers_bitset: token.token_modifiers,
        });

        prev_line = token.line;
        prev_start = token.start_char;
    }

    result
}
