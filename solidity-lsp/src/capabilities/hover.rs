//! Hover: signature and documentation of what is under the cursor

use std::sync::Arc;

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};

use crate::model::info::{builtin_markdown, hover_markdown, natspec};
use crate::model::natspec::Natspec;
use crate::model::ParsedDocument;
use crate::resolve::{DeclRef, Resolved, Resolver, Target, abi_signature};
use crate::state::Snapshot;

/// Compute hover information for a position
#[must_use]
pub fn compute_hover(
    snapshot: &Snapshot,
    document: &Arc<ParsedDocument>,
    position: Position,
) -> Option<Hover> {
    let offset = document.offset_at(position)?;
    let resolver = Resolver::new(snapshot);
    let selection = document.select(offset);
    let range = selection
        .expression
        .and_then(|id| document.expression(id))
        .map(|expression| expression.location)
        .or_else(|| {
            selection
                .declaration
                .and_then(|id| document.declaration(id))
                .and_then(|declaration| declaration.name_location)
        });
    let value = match resolver.target_at(document, offset)? {
        Target::Resolved(Resolved::Builtin(builtin)) => builtin_markdown(builtin),
        Target::Resolved(Resolved::Declaration(declared)) => {
            declaration_markdown(&resolver, &declared)?
        }
        Target::Document(path) => format!("```\n{}\n```", path.display()),
    };
    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: range.map(|location| document.range_of(&location)),
    })
}

fn declaration_markdown(resolver: &Resolver<'_>, declared: &DeclRef) -> Option<String> {
    let declaration = declared.declaration()?;
    let own = natspec(&declared.document, declaration);
    let inherited = own
        .as_ref()
        .and_then(|doc| doc.inheritdoc.as_deref())
        .and_then(|base| inherited_natspec(resolver, declared, base));
    let mut value = hover_markdown(&declared.document, declaration, inherited.or(own).as_ref());
    if let Some(signature) = abi_signature(resolver, &declared.document, declaration) {
        value.push_str(&format!("\n\nABI: `{signature}`"));
    }
    Some(value)
}

/// Documentation of the member with the same name in the base contract `base`.
fn inherited_natspec(resolver: &Resolver<'_>, declared: &DeclRef, base: &str) -> Option<Natspec> {
    let declaration = declared.declaration()?;
    let contract = DeclRef::new(&declared.document, declaration.parent?);
    resolver
        .linearized(&contract)
        .into_iter()
        .filter(|candidate| candidate.declaration().is_some_and(|c| c.name == base))
        .find_map(|candidate| {
            candidate
                .document
                .children(candidate.id)
                .find(|member| member.name == declaration.name)
                .and_then(|member| natspec(&candidate.document, member))
        })
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::capabilities::fixtures::{document, position, walker};

    const VAULT: &str = "\
interface IVault {
    /// @notice Moves `amount` into the vault.
    /// @param amount How much to deposit
    function deposit(uint256 amount) external;
}

contract Vault is IVault {
    /// @inheritdoc IVault
    function deposit(uint256 amount) external {
        total += amount;
    }

    uint256 total;

    function run() external {
        deposit(1);
        msg.sender;
    }
}
";

    fn hover_text(marker: &str) -> Option<String> {
        let walker = walker(&[("/p/src/Vault.sol", VAULT)]);
        let snapshot = walker.snapshot();
        let document = document(&snapshot, "/p/src/Vault.sol")?;
        let hover = compute_hover(&snapshot, &document, position(&document, marker)?)?;
        let HoverContents::Markup(markup) = hover.contents else {
            return None;
        };
        Some(markup.value)
    }

    #[test]
    fn test_hover_follows_inheritdoc() {
        let value = hover_text("        depo|sit(1)").expect("hover on call");
        assert!(value.starts_with("*Vault*\n```solidity\nfunction deposit(uint256 amount) external"));
        assert!(value.contains("Moves `amount` into the vault."));
        assert!(value.contains("*@param* `amount` How much to deposit"));
        assert!(value.ends_with("ABI: `deposit(uint256)`"));
    }

    #[test]
    fn test_hover_on_builtin_member() {
        let value = hover_text("msg.sen|der").expect("hover on msg.sender");
        assert!(value.contains("msg.sender"));
    }

    #[test]
    fn test_hover_on_state_variable() {
        let value = hover_text("tot|al += amount").expect("hover on state variable");
        assert!(value.contains("uint256 total"));
        assert!(!value.contains("ABI:"));
    }

    #[test]
    fn test_no_hover_on_whitespace() {
        assert_eq!(hover_text("\n|\n    uint256 total"), None);
    }
}
