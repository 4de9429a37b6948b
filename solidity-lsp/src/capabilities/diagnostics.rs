//! Diagnostics: lines dropped by syntax error recovery
//!
//! A line that had to be blanked before the document parsed is reported as a warning
//! over the whole line. Declarations on it are missing from every other query.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity};

use crate::model::{ParsedDocument, SyntaxIssue};

/// Source name attached to every diagnostic.
pub const SOURCE: &str = "solidity";

/// Convert a recovered syntax issue to an LSP diagnostic
#[must_use]
pub fn issue_to_diagnostic(document: &ParsedDocument, issue: &SyntaxIssue) -> Diagnostic {
    Diagnostic {
        range: document.range_of(&issue.location),
        severity: Some(DiagnosticSeverity::WARNING),
        source: Some(SOURCE.to_string()),
        message: issue.message.clone(),
        ..Default::default()
    }
}

#[must_use]
pub fn syntax_diagnostics(document: &ParsedDocument) -> Vec<Diagnostic> {
    document
        .syntax_issues
        .iter()
        .map(|issue| issue_to_diagnostic(document, issue))
        .collect()
}
