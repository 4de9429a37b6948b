//! Go-to-definition and go-to-type-definition

use std::path::Path;
use std::sync::Arc;

use tower_lsp::lsp_types::{self, GotoDefinitionResponse, Position, Range};

use crate::builtins::Builtin;
use crate::convert::{lsp_location, path_to_url};
use crate::model::ParsedDocument;
use crate::resolve::{DeclRef, Resolved, Resolver, Target};
use crate::state::Snapshot;

/// Where a name is defined.
#[derive(Debug, Clone)]
pub enum Definition {
    Declaration(DeclRef),
    /// The file an import path points at.
    Document(Arc<Path>),
    /// Found, but defined by the language rather than in source.
    Builtin(&'static Builtin),
}

impl Definition {
    /// The editor location, `None` for builtins.
    #[must_use]
    pub fn to_lsp(&self) -> Option<lsp_types::Location> {
        match self {
            Self::Declaration(declared) => {
                let declaration = declared.declaration()?;
                let location = declaration.name_location.unwrap_or(declaration.location);
                lsp_location(&declared.document, &location)
            }
            Self::Document(path) => Some(lsp_types::Location {
                uri: path_to_url(path)?,
                range: Range::default(),
            }),
            Self::Builtin(_) => None,
        }
    }
}

/// Find the definition of whatever is under `position`.
#[must_use]
pub fn find_definition(
    snapshot: &Snapshot,
    document: &Arc<ParsedDocument>,
    position: Position,
) -> Option<Definition> {
    let offset = document.offset_at(position)?;
    let resolver = Resolver::new(snapshot);
    Some(match resolver.target_at(document, offset)? {
        Target::Resolved(Resolved::Declaration(declared)) => Definition::Declaration(declared),
        Target::Resolved(Resolved::Builtin(builtin)) => Definition::Builtin(builtin),
        Target::Document(path) => Definition::Document(path),
    })
}

/// Find the declaration of the type of the value under `position`.
#[must_use]
pub fn find_type_definition(
    snapshot: &Snapshot,
    document: &Arc<ParsedDocument>,
    position: Position,
) -> Option<Definition> {
    let offset = document.offset_at(position)?;
    let resolver = Resolver::new(snapshot);
    let Target::Resolved(resolved) = resolver.target_at(document, offset)? else {
        return None;
    };
    resolver
        .type_definition(&resolved)
        .map(Definition::Declaration)
}

#[must_use]
pub fn to_response(definition: &Definition) -> Option<GotoDefinitionResponse> {
    definition.to_lsp().map(GotoDefinitionResponse::Scalar)
}
