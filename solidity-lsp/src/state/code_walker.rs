//! The document cache
//!
//! [`CodeWalker`] owns one [`CachedDocument`] per path. A cached document pairs an
//! immutable [`ParsedDocument`] with its import edges and the memoized resolution of its
//! name references. Replacing the text of a file replaces its entry and re-wires only
//! the documents that import it, directly or through other imports. The parsed documents
//! of every file stay untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

use dashmap::{DashMap, DashSet};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use solidity_parser::Location;

use crate::convert::LineIndex;
use crate::model::{self, DeclId, ParsedDocument, SyntaxIssue};
use crate::project::Project;
use crate::resolve::Resolved;
use crate::state::{Origin, SourceDocument, normalize_path};

/// An import statement and the file it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEdge {
    pub import: DeclId,
    pub target: Option<Arc<Path>>,
}

/// A parsed document wired into the cache.
#[derive(Debug)]
pub struct CachedDocument {
    pub parsed: Arc<ParsedDocument>,
    pub imports: Vec<ImportEdge>,
    /// One cell per expression of `parsed`, filled on first resolution.
    pub(crate) resolutions: Box<[OnceLock<Option<Resolved>>]>,
    /// Generation of the cache at which the edges were computed.
    pub wired_at: u64,
}

impl CachedDocument {
    fn wire(parsed: Arc<ParsedDocument>, project: &Project, generation: u64) -> Self {
        let imports = import_edges(&parsed, project);
        Self::with_edges(parsed, imports, generation)
    }

    fn with_edges(parsed: Arc<ParsedDocument>, imports: Vec<ImportEdge>, generation: u64) -> Self {
        let resolutions = (0..parsed.expressions().len())
            .map(|_| OnceLock::new())
            .collect();
        Self {
            parsed,
            imports,
            resolutions,
            wired_at: generation,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Arc<Path> {
        self.parsed.path()
    }

    /// Resolved targets of the import statements, in declaration order.
    pub fn imported_paths(&self) -> impl Iterator<Item = &Arc<Path>> {
        self.imports.iter().filter_map(|edge| edge.target.as_ref())
    }

    #[must_use]
    pub fn import_target(&self, import: DeclId) -> Option<&Arc<Path>> {
        self.imports
            .iter()
            .find(|edge| edge.import == import)
            .and_then(|edge| edge.target.as_ref())
    }

    #[must_use]
    pub fn imports_path(&self, path: &Path) -> bool {
        self.imported_paths().any(|target| **target == *path)
    }
}

fn import_edges(parsed: &ParsedDocument, project: &Project) -> Vec<ImportEdge> {
    parsed
        .imports()
        .map(|(declaration, info)| ImportEdge {
            import: declaration.id,
            target: project
                .resolve_import(&info.specifier, parsed.path())
                .map(Arc::from),
        })
        .collect()
}

/// A consistent, path-ordered view of the cache for one query.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    documents: BTreeMap<Arc<Path>, Arc<CachedDocument>>,
}

impl Snapshot {
    pub(crate) fn new(documents: impl IntoIterator<Item = Arc<CachedDocument>>) -> Self {
        Self {
            documents: documents
                .into_iter()
                .map(|document| (Arc::clone(document.path()), document))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Arc<CachedDocument>> {
        self.documents.get(path)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<CachedDocument>> {
        self.documents.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The cache entry holding exactly `parsed`, if it is still the current one.
    #[must_use]
    pub fn current(&self, parsed: &Arc<ParsedDocument>) -> Option<&Arc<CachedDocument>> {
        self.documents
            .get(parsed.path())
            .filter(|cached| Arc::ptr_eq(&cached.parsed, parsed))
    }

    /// `path` followed by every document that imports it, directly or not.
    #[must_use]
    pub fn importers_closure(&self, path: &Path) -> Vec<&Arc<CachedDocument>> {
        let mut seen: FxHashSet<&Path> = FxHashSet::default();
        let mut queue: Vec<&Path> = vec![path];
        let mut result = Vec::new();
        while let Some(current) = queue.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(document) = self.documents.get(current) {
                result.push(document);
            }
            for document in self.documents.values() {
                if document.imports_path(current) {
                    queue.push(document.path());
                }
            }
        }
        result.sort_by(|a, b| {
            (**a.path() != *path)
                .cmp(&(**b.path() != *path))
                .then_with(|| a.path().cmp(b.path()))
        });
        result
    }
}

/// Parses documents, keeps them in the cache and keeps their import edges current.
#[derive(Debug)]
pub struct CodeWalker {
    project: RwLock<Arc<Project>>,
    documents: DashMap<Arc<Path>, Arc<CachedDocument>>,
    pinned: DashSet<Arc<Path>>,
    /// Serializes every multi-step mutation of `documents`.
    writer: Mutex<()>,
    generation: AtomicU64,
    max_recovery_attempts: AtomicUsize,
}

impl CodeWalker {
    #[must_use]
    pub fn new(project: Project, max_recovery_attempts: usize) -> Self {
        Self {
            project: RwLock::new(Arc::new(project)),
            documents: DashMap::new(),
            pinned: DashSet::new(),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
            max_recovery_attempts: AtomicUsize::new(max_recovery_attempts),
        }
    }

    #[must_use]
    pub fn project(&self) -> Arc<Project> {
        Arc::clone(&self.project.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the project layout. Callers follow up with
    /// [`CodeWalker::initialise_changed_documents`].
    pub fn set_project(&self, project: Project, max_recovery_attempts: usize) {
        *self.project.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(project);
        self.max_recovery_attempts
            .store(max_recovery_attempts, Ordering::Relaxed);
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Arc<CachedDocument>> {
        self.documents
            .get(path)
            .map(|entry| Arc::clone(entry.value()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let _guard = self.lock();
        Snapshot::new(self.documents.iter().map(|entry| Arc::clone(entry.value())))
    }

    /// Parse every project file, and the library files when they are indexed, then wire
    /// all import edges in one pass once every document exists.
    #[tracing::instrument(skip(self))]
    pub fn init_documents(&self) {
        let project = self.project();
        let files = source_files(&project);
        let parsed = self.parse_files(&files);
        let _guard = self.lock();
        for document in parsed {
            let path = Arc::clone(document.path());
            if self
                .get(&path)
                .is_some_and(|cached| cached.parsed.source.origin == Origin::Editor)
            {
                continue;
            }
            self.documents.insert(
                path,
                Arc::new(CachedDocument::with_edges(Arc::new(document), Vec::new(), 0)),
            );
        }
        self.load_missing_imports(&project);
        self.rewire_all(&project, None);
        tracing::info!(documents = self.documents.len(), "documents initialised");
    }

    fn parse_files(&self, files: &[(PathBuf, Origin)]) -> Vec<ParsedDocument> {
        files
            .par_iter()
            .filter_map(|(path, origin)| match SourceDocument::read(path, *origin) {
                Ok(source) => Some(self.parse_selected_document(source, None)),
                Err(e) => {
                    tracing::warn!("skipping {}: {e}", path.display());
                    None
                }
            })
            .collect()
    }

    /// Parse files that are imported but not cached yet, until the import graph is closed.
    fn load_missing_imports(&self, project: &Project) {
        let mut attempted: FxHashSet<Arc<Path>> = FxHashSet::default();
        loop {
            let mut missing: Vec<Arc<Path>> = self
                .documents
                .iter()
                .flat_map(|entry| {
                    let parsed = &entry.value().parsed;
                    parsed
                        .imports()
                        .filter_map(|(_, info)| project.resolve_import(&info.specifier, parsed.path()))
                        .collect::<Vec<_>>()
                })
                .map(Arc::<Path>::from)
                .filter(|path| !self.documents.contains_key(path) && path.is_file())
                .filter(|path| attempted.insert(Arc::clone(path)))
                .collect();
            if missing.is_empty() {
                return;
            }
            missing.sort();
            let files: Vec<(PathBuf, Origin)> = missing
                .iter()
                .map(|path| (path.to_path_buf(), project.origin_of(path)))
                .collect();
            for document in self.parse_files(&files) {
                self.documents.insert(
                    Arc::clone(document.path()),
                    Arc::new(CachedDocument::with_edges(Arc::new(document), Vec::new(), 0)),
                );
            }
        }
    }

    fn rewire(&self, cached: &CachedDocument, project: &Project, generation: u64) {
        self.documents.insert(
            Arc::clone(cached.path()),
            Arc::new(CachedDocument::wire(
                Arc::clone(&cached.parsed),
                project,
                generation,
            )),
        );
    }

    /// Re-wire every document except the pinned ones and `except`.
    fn rewire_all(&self, project: &Project, except: Option<&Path>) {
        let generation = self.next_generation();
        let entries: Vec<Arc<CachedDocument>> = self
            .documents
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for cached in entries {
            if self.pinned.contains(cached.path()) || except.is_some_and(|p| **cached.path() == *p) {
                continue;
            }
            self.rewire(&cached, project, generation);
        }
    }

    /// Every document importing `path`, directly or through other documents.
    fn importers_of(&self, path: &Path) -> Vec<Arc<CachedDocument>> {
        let entries: Vec<Arc<CachedDocument>> = self
            .documents
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut seen: FxHashSet<&Path> = FxHashSet::default();
        seen.insert(path);
        let mut queue: Vec<&Path> = vec![path];
        let mut importers = Vec::new();
        while let Some(current) = queue.pop() {
            for cached in &entries {
                if cached.imports_path(current) && seen.insert(cached.path()) {
                    queue.push(cached.path());
                    importers.push(Arc::clone(cached));
                }
            }
        }
        importers
    }

    /// The cached document for the text an editor shows.
    ///
    /// The cached entry is reused when its text is identical or when it is pinned; only
    /// its import edges are refreshed. Otherwise the text is parsed, recovering from
    /// syntax errors starting with `cursor_line`, and the cache is updated.
    #[tracing::instrument(skip(self, text))]
    pub fn get_selected_document(
        &self,
        path: &Path,
        text: &str,
        cursor_line: Option<usize>,
    ) -> Arc<CachedDocument> {
        let path: Arc<Path> = normalize_path(path).into();
        if let Some(cached) = self.get(&path)
            && (cached.parsed.source.has_text(text) || self.is_pinned(&path))
        {
            return self.refresh_edges(cached);
        }
        let source = SourceDocument::new(path, text, Origin::Editor);
        let parsed = self.parse_selected_document(source, cursor_line);
        self.update_cache(parsed)
    }

    fn refresh_edges(&self, cached: Arc<CachedDocument>) -> Arc<CachedDocument> {
        let project = self.project();
        let edges = import_edges(&cached.parsed, &project);
        if edges == cached.imports {
            return cached;
        }
        let _guard = self.lock();
        let generation = self.next_generation();
        let rewired = Arc::new(CachedDocument::with_edges(
            Arc::clone(&cached.parsed),
            edges,
            generation,
        ));
        self.documents
            .insert(Arc::clone(cached.path()), Arc::clone(&rewired));
        for importer in self.importers_of(cached.path()) {
            if !self.pinned.contains(importer.path()) {
                self.rewire(&importer, &project, generation);
            }
        }
        rewired
    }

    /// Parse `source`, blanking lines that fail to parse.
    #[must_use]
    pub fn parse_selected_document(
        &self,
        source: SourceDocument,
        cursor_line: Option<usize>,
    ) -> ParsedDocument {
        parse_with_recovery(
            source,
            cursor_line,
            self.max_recovery_attempts.load(Ordering::Relaxed),
        )
    }

    /// Put a freshly parsed document into the cache.
    ///
    /// A new path re-wires the whole cache. A pinned entry, or one with the same text, is
    /// kept as it is. Otherwise the old entry is replaced and only the documents that
    /// import it, directly or not, are re-wired.
    #[tracing::instrument(skip_all, fields(path = %parsed.path().display()))]
    pub fn update_cache(&self, parsed: ParsedDocument) -> Arc<CachedDocument> {
        let project = self.project();
        let _guard = self.lock();
        let path = Arc::clone(parsed.path());
        let Some(existing) = self.get(&path) else {
            let inserted = Arc::new(CachedDocument::wire(
                Arc::new(parsed),
                &project,
                self.next_generation(),
            ));
            self.documents.insert(Arc::clone(&path), Arc::clone(&inserted));
            self.rewire_all(&project, Some(&path));
            return inserted;
        };
        if self.pinned.contains(&path)
            || existing
                .parsed
                .source
                .has_text(&parsed.source.unformatted_text)
        {
            return existing;
        }
        let affected = self.importers_of(&path);
        let generation = self.next_generation();
        let inserted = Arc::new(CachedDocument::wire(Arc::new(parsed), &project, generation));
        self.documents.insert(Arc::clone(&path), Arc::clone(&inserted));
        for importer in affected {
            if !self.pinned.contains(importer.path()) {
                self.rewire(&importer, &project, generation);
            }
        }
        tracing::debug!(generation, "document replaced");
        inserted
    }

    /// Re-read every source file from disk and replace the ones that changed.
    ///
    /// Documents with editor text and pinned documents are kept. Files that disappeared
    /// are dropped. All edges are re-wired at the end.
    #[tracing::instrument(skip(self))]
    pub fn initialise_changed_documents(&self) {
        let project = self.project();
        let files = source_files(&project);
        let candidates: Vec<SourceDocument> = files
            .par_iter()
            .filter_map(|(path, origin)| SourceDocument::read(path, *origin).ok())
            .filter(|source| match self.get(&source.path) {
                Some(cached) => {
                    cached.parsed.source.origin != Origin::Editor
                        && !self.is_pinned(&source.path)
                        && !cached.parsed.source.has_text(&source.unformatted_text)
                }
                None => true,
            })
            .collect();
        let parsed: Vec<ParsedDocument> = candidates
            .into_par_iter()
            .map(|source| self.parse_selected_document(source, None))
            .collect();
        let _guard = self.lock();
        let changed = parsed.len();
        for document in parsed {
            self.documents.insert(
                Arc::clone(document.path()),
                Arc::new(CachedDocument::with_edges(Arc::new(document), Vec::new(), 0)),
            );
        }
        self.documents.retain(|path, cached| {
            cached.parsed.source.origin == Origin::Editor
                || self.pinned.contains(path)
                || path.is_file()
        });
        self.load_missing_imports(&project);
        self.rewire_all(&project, None);
        tracing::info!(changed, documents = self.documents.len(), "documents refreshed");
    }

    /// Drop a document, for example after its file was deleted.
    pub fn remove_document(&self, path: &Path) -> bool {
        let project = self.project();
        let _guard = self.lock();
        let path = normalize_path(path);
        self.pinned.remove(path.as_path());
        if self.documents.remove(path.as_path()).is_none() {
            return false;
        }
        let generation = self.next_generation();
        for importer in self.importers_of(&path) {
            if !self.pinned.contains(importer.path()) {
                self.rewire(&importer, &project, generation);
            }
        }
        true
    }

    /// The cached document for `path`, reading and parsing it from disk when needed.
    pub fn get_or_load(&self, path: &Path) -> Option<Arc<CachedDocument>> {
        let path = normalize_path(path);
        if let Some(cached) = self.get(&path) {
            return Some(cached);
        }
        self.reload_from_disk(&path)
    }

    /// Replace the cached document with the file on disk, discarding editor text.
    pub fn reload_from_disk(&self, path: &Path) -> Option<Arc<CachedDocument>> {
        let origin = self.project().origin_of(path);
        match SourceDocument::read(path, origin) {
            Ok(source) => Some(self.update_cache(self.parse_selected_document(source, None))),
            Err(e) => {
                tracing::debug!("cannot load {}: {e}", path.display());
                None
            }
        }
    }

    /// Freeze the cached document for `path` against replacement.
    pub fn pin(&self, path: &Path) -> bool {
        let path: Arc<Path> = normalize_path(path).into();
        if !self.documents.contains_key(&path) {
            return false;
        }
        self.pinned.insert(path)
    }

    pub fn unpin(&self, path: &Path) -> bool {
        self.pinned.remove(normalize_path(path).as_path()).is_some()
    }

    #[must_use]
    pub fn is_pinned(&self, path: &Path) -> bool {
        self.pinned.contains(path)
    }
}

fn source_files(project: &Project) -> Vec<(PathBuf, Origin)> {
    let mut files: Vec<(PathBuf, Origin)> = project
        .project_source_files()
        .into_iter()
        .map(|path| (path, Origin::Project))
        .collect();
    if project.index_libraries {
        files.extend(
            project
                .library_source_files()
                .into_iter()
                .map(|path| (path, Origin::Library)),
        );
    }
    files
}

/// Parse `source`, blanking one line per failure until the text parses.
///
/// The first line blanked is `cursor_line`, the line being edited. After that the line
/// reported by the grammar is blanked, or the closest non-blank line above it when the
/// failure is at the start of its line. Recovery stops when the chosen line is already
/// blank or after `max_attempts` lines, returning a document without declarations.
pub(crate) fn parse_with_recovery(
    source: SourceDocument,
    cursor_line: Option<usize>,
    max_attempts: usize,
) -> ParsedDocument {
    let mut text = source.unformatted_text.to_string();
    let mut issues: Vec<SyntaxIssue> = Vec::new();
    let mut cursor_line = cursor_line;
    loop {
        let error = match solidity_parser::parse(&text) {
            Ok(unit) => {
                let source = if issues.is_empty() {
                    source
                } else {
                    source.with_recovered_text(text)
                };
                return model::build(source, &unit, issues);
            }
            Err(e) => e,
        };
        if issues.len() >= max_attempts {
            tracing::debug!(attempts = issues.len(), "giving up on syntax recovery");
            break;
        }
        let index = LineIndex::new(&text);
        let line = cursor_line
            .take()
            .filter(|line| !is_blank_line(&text, &index, *line))
            .or_else(|| line_to_blank(&text, &index, &error));
        let Some(range) = line.and_then(|line| index.line_range(&text, line)) else {
            break;
        };
        if text.get(range.clone()).is_none_or(|t| t.trim().is_empty()) {
            break;
        }
        issues.push(SyntaxIssue {
            line: index.line_of(range.start),
            location: Location::new(range.start, range.end),
            message: error.to_string(),
        });
        blank(&mut text, range);
    }
    ParsedDocument::empty(source.with_recovered_text(text), issues)
}

fn is_blank_line(text: &str, index: &LineIndex, line: usize) -> bool {
    index
        .line_text(text, line)
        .is_none_or(|t| t.trim().is_empty())
}

fn line_to_blank(text: &str, index: &LineIndex, error: &solidity_parser::Error) -> Option<usize> {
    let offset = error.offset()?.min(text.len());
    let line = index.line_of(offset);
    let start = index.line_start(line)?;
    if text.get(start..offset).is_some_and(|before| !before.trim().is_empty()) {
        return Some(line);
    }
    // A failure at the start of a line is usually caused by the line above it.
    (0..line)
        .rev()
        .find(|candidate| !is_blank_line(text, index, *candidate))
        .or(Some(line))
}

/// Replace the characters in `range` with spaces, keeping every byte offset.
fn blank(text: &mut String, range: std::ops::Range<usize>) {
    let Some(original) = text.get(range.clone()) else {
        return;
    };
    let spaces = " ".repeat(original.len());
    text.replace_range(range, &spaces);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recover(text: &str, cursor_line: Option<usize>) -> ParsedDocument {
        let source = SourceDocument::new(Path::new("/p/A.sol"), text, Origin::Editor);
        parse_with_recovery(source, cursor_line, 8)
    }

    fn names(document: &ParsedDocument) -> Vec<&str> {
        document
            .declarations()
            .filter(|d| !d.name.is_empty())
            .map(|d| d.name.as_str())
            .collect()
    }

    #[test]
    fn test_blanks_the_broken_line() {
        let text = "contract A {\n    uint256 x;\n    function f() public {\n        uint y = ;\n    }\n    function g() public {}\n}\n";
        let document = recover(text, None);
        assert_eq!(names(&document), vec!["A", "x", "f", "g"]);
        assert_eq!(document.syntax_issues.len(), 1);
        assert_eq!(document.syntax_issues.first().map(|i| i.line), Some(3));
        assert_eq!(document.text().len(), text.len());
        assert_eq!(&*document.source.unformatted_text, text);
    }

    #[test]
    fn test_missing_semicolon_blanks_the_line_above() {
        let text = "contract A {\n    uint256 x = 1\n    uint256 y;\n}\n";
        let document = recover(text, None);
        assert_eq!(names(&document), vec!["A", "y"]);
        assert_eq!(document.syntax_issues.first().map(|i| i.line), Some(1));
    }

    #[test]
    fn test_cursor_line_is_blanked_first() {
        let text = "contract A {\n    function f() public {\n        token.\n    }\n}\n";
        let document = recover(text, Some(2));
        assert_eq!(names(&document), vec!["A", "f"]);
        assert_eq!(document.syntax_issues.first().map(|i| i.line), Some(2));
    }

    #[test]
    fn test_single_broken_line_terminates() {
        let document = recover("uint x = ;", None);
        assert_eq!(document.declarations().count(), 0);
        assert_eq!(document.syntax_issues.len(), 1);
    }

    #[test]
    fn test_recovery_is_bounded() {
        let text = "contract A {\n\"\n\"\n\"\n\"\n\"\n\"\n\"\n\"\n\"\n\"\n";
        let source = SourceDocument::new(Path::new("/p/A.sol"), text, Origin::Editor);
        let document = parse_with_recovery(source, None, 3);
        assert!(document.syntax_issues.len() <= 3);
    }

    #[test]
    fn test_blank_keeps_offsets() {
        let mut text = "a\nπ = 1;\nb".to_string();
        blank(&mut text, 2..9);
        assert_eq!(text.len(), "a\nπ = 1;\nb".len());
        assert_eq!(text.lines().nth(1).map(str::trim), Some(""));
    }
}
