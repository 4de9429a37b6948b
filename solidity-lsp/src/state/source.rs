//! Source documents: one physical file at one point in time

use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHasher;

/// Where the text of a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A file under the project's sources, tests or scripts.
    Project,
    /// A file under one of the library folders.
    Library,
    /// Text received from the editor that may differ from the file on disk.
    Editor,
}

/// One physical file. Never mutated: a change of text creates a new `SourceDocument`.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: Arc<Path>,
    /// The text handed to the parser, possibly with lines blanked by error recovery.
    pub text: Arc<str>,
    /// The text as it was received.
    pub unformatted_text: Arc<str>,
    pub content_hash: u64,
    pub origin: Origin,
}

impl SourceDocument {
    #[must_use]
    pub fn new(path: impl Into<Arc<Path>>, text: impl Into<Arc<str>>, origin: Origin) -> Self {
        let text = text.into();
        Self {
            path: path.into(),
            content_hash: content_hash(&text),
            unformatted_text: Arc::clone(&text),
            text,
            origin,
        }
    }

    /// Read a document from disk.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] when the file cannot be read.
    pub fn read(path: &Path, origin: Origin) -> Result<Self, crate::Error> {
        let text = std::fs::read_to_string(path).map_err(|e| crate::Error::io(path, e))?;
        Ok(Self::new(normalize_path(path), text, origin))
    }

    /// Copy of this document whose parsed text has been altered by error recovery.
    #[must_use]
    pub(crate) fn with_recovered_text(&self, text: String) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Whether `text` is exactly the text this document was created from.
    #[must_use]
    pub fn has_text(&self, text: &str) -> bool {
        self.content_hash == content_hash(text) && *self.unformatted_text == *text
    }

    #[must_use]
    pub fn is_library(&self) -> bool {
        self.origin == Origin::Library
    }
}

#[must_use]
pub fn content_hash(text: &str) -> u64 {
    let mut hasher = FxHasher::default();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Lexically normalize a path: drop `.` components and fold `..` into their parent.
///
/// Paths are not canonicalized against the file system so that documents that only
/// exist in the editor get the same key as the ones read from disk.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component);
            }
        }
    }
    normalized
}
