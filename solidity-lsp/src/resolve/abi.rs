//! Canonical ABI signatures of functions, events and errors

use std::sync::Arc;

use solidity_parser::FunctionKind;

use crate::model::{
    Declaration, DeclarationKind, DeclarationType, ParsedDocument, TypeShape, canonical_elementary,
};
use crate::resolve::{DeclRef, Resolver};

/// Structs nested deeper than this are rendered by name.
const MAX_TUPLE_DEPTH: usize = 8;

/// `name(t1,t2)` with every parameter type in its canonical ABI form.
///
/// Contracts become `address`, enums `uint8`, structs a tuple of their member types and
/// user-defined value types their underlying type. `None` for anything that has no
/// selector.
#[must_use]
pub fn abi_signature(
    resolver: &Resolver<'_>,
    document: &Arc<ParsedDocument>,
    declaration: &Declaration,
) -> Option<String> {
    let parameters = match &declaration.kind {
        DeclarationKind::Function(info) if info.kind == FunctionKind::Function => &info.parameters,
        DeclarationKind::Event { .. } | DeclarationKind::Error => &declaration.children,
        DeclarationKind::Function(_)
        | DeclarationKind::Contract { .. }
        | DeclarationKind::Struct
        | DeclarationKind::Enum
        | DeclarationKind::EnumValue
        | DeclarationKind::CustomType { .. }
        | DeclarationKind::Variable(_)
        | DeclarationKind::Import(_)
        | DeclarationKind::Using(_) => return None,
    };
    let types: Vec<String> = parameters
        .iter()
        .filter_map(|id| document.declaration(*id))
        .filter_map(Declaration::variable)
        .map(|info| abi_type(resolver, document, &info.ty, 0))
        .collect();
    Some(format!("{}({})", declaration.name, types.join(",")))
}

fn abi_type(
    resolver: &Resolver<'_>,
    document: &Arc<ParsedDocument>,
    ty: &DeclarationType,
    depth: usize,
) -> String {
    match &ty.shape {
        TypeShape::Elementary(name) => canonical_elementary(name)
            .trim_end_matches(" payable")
            .to_string(),
        TypeShape::Array { base, length } => format!(
            "{}[{}]",
            abi_type(resolver, document, base, depth),
            length.as_deref().unwrap_or_default()
        ),
        TypeShape::UserDefined { path, reference } => reference
            .and_then(|reference| resolver.resolve(document, reference))
            .and_then(|resolved| resolved.into_declaration())
            .and_then(|declared| declared_abi_type(resolver, &declared, depth))
            .unwrap_or_else(|| path.clone()),
        TypeShape::Mapping { .. } | TypeShape::Function { .. } => ty.type_string(),
    }
}

fn declared_abi_type(resolver: &Resolver<'_>, declared: &DeclRef, depth: usize) -> Option<String> {
    let declaration = declared.declaration()?;
    match &declaration.kind {
        DeclarationKind::Contract { .. } => Some("address".to_string()),
        DeclarationKind::Enum => Some("uint8".to_string()),
        DeclarationKind::CustomType { underlying } => {
            Some(abi_type(resolver, &declared.document, underlying, depth))
        }
        DeclarationKind::Struct if depth < MAX_TUPLE_DEPTH => {
            let members: Vec<String> = declared
                .document
                .children(declared.id)
                .filter_map(Declaration::variable)
                .map(|info| abi_type(resolver, &declared.document, &info.ty, depth + 1))
                .collect();
            Some(format!("({})", members.join(",")))
        }
        DeclarationKind::Struct
        | DeclarationKind::Function(_)
        | DeclarationKind::Event { .. }
        | DeclarationKind::Error
        | DeclarationKind::EnumValue
        | DeclarationKind::Variable(_)
        | DeclarationKind::Import(_)
        | DeclarationKind::Using(_) => None,
    }
}
