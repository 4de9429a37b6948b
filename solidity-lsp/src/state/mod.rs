//! Documents and the cache that holds their parsed form

mod code_walker;
mod source;

pub use code_walker::{CachedDocument, CodeWalker, ImportEdge, Snapshot};
pub use source::{Origin, SourceDocument, content_hash, normalize_path};
