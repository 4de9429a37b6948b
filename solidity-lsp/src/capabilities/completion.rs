//! Completion: members after `.`, names in scope, and import paths

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionTextEdit, Position, Range, TextEdit,
};

use crate::model::ParsedDocument;
use crate::model::info::{builtin_completion_item, completion_item, extension_completion_item};
use crate::project::Project;
use crate::resolve::{Member, Resolver};
use crate::state::Snapshot;
use crate::text::{CompletionContext, completion_context};

/// Keywords offered alongside the names in scope.
const KEYWORDS: &[&str] = &[
    "address", "bool", "break", "bytes", "bytes32", "calldata", "constant", "continue",
    "delete", "else", "emit", "external", "false", "for", "if", "immutable", "internal",
    "memory", "new", "payable", "private", "public", "pure", "return", "returns", "revert",
    "storage", "string", "true", "uint256", "unchecked", "view", "while",
];

/// Compute completion items at `position`.
#[must_use]
pub fn compute_completion(
    snapshot: &Snapshot,
    project: &Project,
    document: &Arc<ParsedDocument>,
    position: Position,
) -> Vec<CompletionItem> {
    let Some(offset) = document.offset_at(position) else {
        return Vec::new();
    };
    let resolver = Resolver::new(snapshot);
    match completion_context(&document.source.unformatted_text, offset) {
        CompletionContext::ImportPath { prefix } => {
            import_completions(snapshot, project, document, &prefix, position)
        }
        CompletionContext::Member { segments, .. } => {
            let Some(target) = resolver.chain_target(document, offset, &segments) else {
                return Vec::new();
            };
            let scope = document.select(offset).innermost_scope();
            member_items(resolver.members(document, scope, &target))
        }
        CompletionContext::Scope { .. } => {
            let mut items = member_items(resolver.scope_members(document, offset));
            items.extend(KEYWORDS.iter().map(|keyword| CompletionItem {
                label: (*keyword).to_string(),
                kind: Some(CompletionItemKind::KEYWORD),
                ..CompletionItem::default()
            }));
            items
        }
    }
}

fn member_items(members: Vec<Member>) -> Vec<CompletionItem> {
    let mut seen = FxHashSet::default();
    members
        .into_iter()
        .filter(|member| seen.insert(member.name().to_string()))
        .filter_map(|member| match member {
            Member::Declaration(declared) => declared
                .declaration()
                .map(|d| completion_item(&declared.document, d).clone()),
            Member::Extension(declared) => declared
                .declaration()
                .map(|d| extension_completion_item(&declared.document, d).clone()),
            Member::Builtin(builtin) => Some(builtin_completion_item(builtin)),
        })
        .collect()
}

/// Specifiers for every known file except `document`, replacing what is typed so far.
fn import_completions(
    snapshot: &Snapshot,
    project: &Project,
    document: &ParsedDocument,
    prefix: &str,
    position: Position,
) -> Vec<CompletionItem> {
    let typed = prefix.encode_utf16().count();
    let start = Position {
        line: position.line,
        character: position
            .character
            .saturating_sub(u32::try_from(typed).unwrap_or(u32::MAX)),
    };
    let mut specifiers: Vec<String> = snapshot
        .documents()
        .filter(|cached| cached.path() != document.path())
        .map(|cached| project.import_specifier(cached.path(), document.path()))
        .filter(|specifier| specifier.starts_with(prefix))
        .collect();
    specifiers.sort();
    specifiers.dedup();
    specifiers
        .into_iter()
        .map(|specifier| CompletionItem {
            label: specifier.clone(),
            kind: Some(CompletionItemKind::FILE),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit {
                range: Range {
                    start,
                    end: position,
                },
                new_text: specifier,
            })),
            ..CompletionItem::default()
        })
        .collect()
}
