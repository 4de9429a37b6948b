//! Signature help for the call around the cursor

use std::sync::Arc;

use solidity_parser::ContractKind;
use tower_lsp::lsp_types::{
    ParameterInformation, ParameterLabel, Position, SignatureHelp, SignatureInformation,
};

use crate::model::info::signature;
use crate::model::{Declaration, DeclarationKind, ParsedDocument};
use crate::resolve::{DeclRef, Resolved, Resolver, TypeTarget};
use crate::state::Snapshot;
use crate::text::find_call_before_cursor;

#[must_use]
pub fn compute_signature_help(
    snapshot: &Snapshot,
    document: &Arc<ParsedDocument>,
    position: Position,
) -> Option<SignatureHelp> {
    let offset = document.offset_at(position)?;
    let call = find_call_before_cursor(&document.source.unformatted_text, offset)?;
    let resolver = Resolver::new(snapshot);
    let resolved = resolver.resolve_chain(document, call.open_paren, &call.segments)?;
    let signatures = match resolved {
        Resolved::Builtin(builtin) => vec![SignatureInformation {
            label: builtin.signature.to_string(),
            documentation: None,
            parameters: Some(
                builtin
                    .parameters
                    .iter()
                    .map(|parameter| ParameterInformation {
                        label: ParameterLabel::Simple((*parameter).to_string()),
                        documentation: None,
                    })
                    .collect(),
            ),
            active_parameter: None,
        }],
        Resolved::Declaration(declared) => {
            let skip_receiver = call.segments.len() > 1
                && is_library_member(&declared)
                && !matches!(
                    call.segments
                        .split_last()
                        .and_then(|(_, receiver)| resolver.chain_target(document, call.open_paren, receiver)),
                    Some(TypeTarget::Static(_) | TypeTarget::Namespace(_))
                );
            callables(&resolver, &declared)
                .iter()
                .filter_map(|callable| signature_information(callable, skip_receiver))
                .collect()
        }
    };
    if signatures.is_empty() {
        return None;
    }
    let active_parameter = u32::try_from(call.active_parameter).unwrap_or(u32::MAX);
    let active_signature = signatures
        .iter()
        .position(|s| {
            s.parameters
                .as_ref()
                .is_some_and(|p| p.len() > call.active_parameter)
        })
        .unwrap_or(0);
    Some(SignatureHelp {
        signatures,
        active_signature: u32::try_from(active_signature).ok(),
        active_parameter: Some(active_parameter),
    })
}

/// The declarations whose parameter lists apply to a call of `declared`.
fn callables(resolver: &Resolver<'_>, declared: &DeclRef) -> Vec<DeclRef> {
    let Some(declaration) = declared.declaration() else {
        return Vec::new();
    };
    match &declaration.kind {
        DeclarationKind::Function(_) => resolver.overloads(declared),
        DeclarationKind::Event { .. } | DeclarationKind::Error | DeclarationKind::Struct => {
            vec![declared.clone()]
        }
        // `new C(...)` takes the constructor arguments.
        DeclarationKind::Contract { .. } => declared
            .document
            .children(declared.id)
            .filter(|d| d.is_constructor())
            .map(|d| DeclRef::new(&declared.document, d.id))
            .collect(),
        DeclarationKind::Enum
        | DeclarationKind::EnumValue
        | DeclarationKind::CustomType { .. }
        | DeclarationKind::Variable(_)
        | DeclarationKind::Import(_)
        | DeclarationKind::Using(_) => Vec::new(),
    }
}

fn is_library_member(declared: &DeclRef) -> bool {
    declared
        .declaration()
        .and_then(|d| d.parent)
        .and_then(|parent| declared.document.declaration(parent))
        .is_some_and(|parent| {
            matches!(
                parent.kind,
                DeclarationKind::Contract {
                    kind: ContractKind::Library,
                    ..
                }
            )
        })
}

fn signature_information(callable: &DeclRef, skip_receiver: bool) -> Option<SignatureInformation> {
    let declaration = callable.declaration()?;
    let document = &callable.document;
    let parameters: Vec<&Declaration> = match &declaration.kind {
        DeclarationKind::Function(info) => document.parameters(info).collect(),
        DeclarationKind::Event { .. } | DeclarationKind::Error | DeclarationKind::Struct => {
            document.children(declaration.id).collect()
        }
        DeclarationKind::Contract { .. }
        | DeclarationKind::Enum
        | DeclarationKind::EnumValue
        | DeclarationKind::CustomType { .. }
        | DeclarationKind::Variable(_)
        | DeclarationKind::Import(_)
        | DeclarationKind::Using(_) => return None,
    };
    let labels: Vec<String> = parameters
        .iter()
        .skip(usize::from(skip_receiver))
        .map(|parameter| signature(document, parameter))
        .collect();
    let name = if declaration.name.is_empty() {
        "constructor"
    } else {
        declaration.name.as_str()
    };
    Some(SignatureInformation {
        label: format!("{name}({})", labels.join(", ")),
        documentation: None,
        parameters: Some(
            labels
                .into_iter()
                .map(|label| ParameterInformation {
                    label: ParameterLabel::Simple(label),
                    documentation: None,
                })
                .collect(),
        ),
        active_parameter: None,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::capabilities::fixtures::walker;
    use pretty_assertions::assert_eq;

    const TOKEN: &str = "\
library SafeMath {
    function add(uint256 a, uint256 b) internal pure returns (uint256) {
        return a + b;
    }
}

contract Token {
    using SafeMath for uint256;

    constructor(string memory name, uint8 decimals) {}

    function mint(address to) external {}
    function mint(address to, uint256 amount) external {}

    function f(uint256 x) external {
        CALL
    }
}
";

    fn help_at_end_of(call: &str) -> Option<SignatureHelp> {
        let text = TOKEN.replace("CALL", call);
        let cursor = text.find(call)? + call.len();
        let line = text.get(..cursor).map(|before| before.matches('\n').count());
        let walker = walker(&[]);
        let cached = walker.get_selected_document(Path::new("/p/src/Token.sol"), &text, line);
        let position = cached
            .parsed
            .line_index
            .position(&cached.parsed.source.unformatted_text, cursor);
        compute_signature_help(&walker.snapshot(), &cached.parsed, position)
    }

    fn labels(help: &SignatureHelp) -> Vec<&str> {
        help.signatures.iter().map(|s| s.label.as_str()).collect()
    }

    #[test]
    fn test_overloads_pick_the_one_fitting_the_argument() {
        let help = help_at_end_of("mint(msg.sender, ").expect("mint is callable");
        assert_eq!(
            labels(&help),
            vec!["mint(address to)", "mint(address to, uint256 amount)"]
        );
        assert_eq!(help.active_signature, Some(1));
        assert_eq!(help.active_parameter, Some(1));
    }

    #[test]
    fn test_using_for_drops_the_receiver() {
        let help = help_at_end_of("x.add(").expect("add is attached to uint256");
        assert_eq!(labels(&help), vec!["add(uint256 b)"]);
        let help = help_at_end_of("SafeMath.add(").expect("add called on the library");
        assert_eq!(labels(&help), vec!["add(uint256 a, uint256 b)"]);
    }

    #[test]
    fn test_constructor_and_builtin() {
        let help = help_at_end_of("new Token(").expect("constructor arguments");
        assert_eq!(labels(&help), vec!["constructor(string memory name, uint8 decimals)"]);
        let help = help_at_end_of("require(x > 0, ").expect("builtin require");
        assert_eq!(help.active_parameter, Some(1));
        assert_eq!(help.signatures.len(), 1);
    }
}
