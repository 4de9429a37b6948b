//! LSP capability implementations
//!
//! Every provider is a function of a cache snapshot, a document and a position. None of
//! them mutate the cache.

pub mod code_lens;
pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod hover;
pub mod references;
pub mod semantic_tokens;
pub mod signature_help;
pub mod symbols;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::Path;
    use std::sync::Arc;

    use tower_lsp::lsp_types::Position;

    use crate::config::ServerConfig;
    use crate::model::ParsedDocument;
    use crate::project::Project;
    use crate::state::{CodeWalker, Snapshot};

    pub(crate) fn walker(documents: &[(&str, &str)]) -> CodeWalker {
        let walker = CodeWalker::new(Project::load(Path::new("/p"), &ServerConfig::default()), 8);
        for (path, text) in documents {
            walker.get_selected_document(Path::new(path), text, None);
        }
        walker
    }

    pub(crate) fn document(snapshot: &Snapshot, path: &str) -> Option<Arc<ParsedDocument>> {
        snapshot.get(Path::new(path)).map(|cached| Arc::clone(&cached.parsed))
    }

    /// Position of the `|` in `marker`, which must occur once in the document text.
    pub(crate) fn position(document: &ParsedDocument, marker: &str) -> Option<Position> {
        let split = marker.find('|')?;
        let start = document.source.unformatted_text.find(&marker.replace('|', ""))?;
        Some(
            document
                .line_index
                .position(&document.source.unformatted_text, start + split),
        )
    }
}
