//! Project layout, file enumeration and import resolution
//!
//! A project is a Foundry-style workspace: sources, tests and scripts under the root,
//! dependencies under one or more library folders, and remapping rules tying import
//! specifiers to paths on disk.

mod remapping;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::Deserialize;

pub use remapping::Remapping;

use crate::config::ServerConfig;
use crate::state::{Origin, normalize_path};

const DEFAULT_SOURCES_FOLDER: &str = "src";
const DEFAULT_LIBRARY_FOLDERS: &[&str] = &["lib", "node_modules"];
const PROJECT_FOLDERS: &[&str] = &["test", "script"];
const SKIPPED_FOLDERS: &[&str] = &["out", "cache", "broadcast", "node_modules", "artifacts"];

#[derive(Debug, Default, Deserialize)]
struct FoundryToml {
    #[serde(default)]
    profile: BTreeMap<String, FoundryProfile>,
}

#[derive(Debug, Default, Deserialize)]
struct FoundryProfile {
    src: Option<String>,
    #[serde(default)]
    libs: Vec<String>,
    #[serde(default)]
    remappings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub sources_folder: PathBuf,
    pub library_folders: Vec<PathBuf>,
    pub remappings: Vec<Remapping>,
    pub index_libraries: bool,
}

impl Project {
    /// Load the project rooted at `root`.
    ///
    /// Reads `foundry.toml` and `remappings.txt` when present. A missing or invalid file
    /// is logged and replaced by defaults so the server always has a usable layout.
    #[tracing::instrument(skip(config))]
    pub fn load(root: &Path, config: &ServerConfig) -> Self {
        let root = normalize_path(root);
        let profile = match read_foundry_profile(&root) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("ignoring foundry.toml: {e}");
                FoundryProfile::default()
            }
        };

        let sources_folder = config
            .sources_folder
            .clone()
            .or(profile.src)
            .unwrap_or_else(|| DEFAULT_SOURCES_FOLDER.to_string());

        let library_folders: Vec<String> = if !config.library_folders.is_empty() {
            config.library_folders.clone()
        } else if !profile.libs.is_empty() {
            profile.libs
        } else {
            DEFAULT_LIBRARY_FOLDERS.iter().map(ToString::to_string).collect()
        };

        let mut remappings = Vec::new();
        match std::fs::read_to_string(root.join("remappings.txt")) {
            Ok(text) => remappings.extend(Remapping::parse_all(&text, &root)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("could not read remappings.txt: {e}"),
        }
        remappings.extend(
            profile
                .remappings
                .iter()
                .chain(&config.remappings)
                .filter_map(|line| Remapping::parse(line, &root)),
        );

        let mut project = Self {
            sources_folder: normalize_path(&root.join(sources_folder)),
            library_folders: library_folders
                .iter()
                .map(|folder| normalize_path(&root.join(folder)))
                .collect(),
            root,
            remappings,
            index_libraries: config.index_libraries,
        };
        project.add_library_remappings();
        tracing::debug!(
            sources = %project.sources_folder.display(),
            remappings = project.remappings.len(),
            "project loaded"
        );
        project
    }

    /// Add `name/=lib/name/src/` style rules for libraries that no explicit rule covers.
    fn add_library_remappings(&mut self) {
        let mut detected = Vec::new();
        for folder in &self.library_folders {
            if folder.file_name().is_some_and(|name| name == "node_modules") {
                continue;
            }
            let Ok(entries) = std::fs::read_dir(folder) else {
                continue;
            };
            let mut libraries: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            libraries.sort();
            for library in libraries {
                let Some(name) = library.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let prefix = format!("{name}/");
                if self.remappings.iter().any(|r| r.prefix == prefix) {
                    continue;
                }
                let target = if library.join("src").is_dir() {
                    library.join("src")
                } else {
                    library.clone()
                };
                let rule = format!("{prefix}={}/", target.display());
                detected.extend(Remapping::parse(&rule, &self.root));
            }
        }
        self.remappings.extend(detected);
    }

    /// Solidity files under the sources folder and the `test` and `script` folders.
    #[must_use]
    pub fn project_source_files(&self) -> Vec<PathBuf> {
        let mut folders = vec![self.sources_folder.clone()];
        folders.extend(PROJECT_FOLDERS.iter().map(|f| self.root.join(f)));
        folders.dedup();
        let mut files = Vec::new();
        let mut visited = FxHashSet::default();
        for folder in folders {
            collect_solidity_files(&folder, &self.library_folders, &mut visited, &mut files);
        }
        files.sort();
        files.dedup();
        files
    }

    /// Solidity files under the library folders.
    #[must_use]
    pub fn library_source_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut visited = FxHashSet::default();
        for folder in &self.library_folders {
            collect_solidity_files(folder, &[], &mut visited, &mut files);
        }
        files.sort();
        files.dedup();
        files
    }

    #[must_use]
    pub fn origin_of(&self, path: &Path) -> Origin {
        if self.is_library_file(path) {
            Origin::Library
        } else {
            Origin::Project
        }
    }

    #[must_use]
    pub fn is_library_file(&self, path: &Path) -> bool {
        self.library_folders.iter().any(|folder| path.starts_with(folder))
    }

    /// The rule with the deepest target directory that contains `path`. Ties go to the
    /// rule declared first.
    #[must_use]
    pub fn find_remapping_for_file(&self, path: &Path) -> Option<&Remapping> {
        self.remappings
            .iter()
            .rev()
            .filter(|r| r.is_file_for_this(path))
            .max_by_key(|r| r.target_path().components().count())
    }

    /// Resolve an import specifier written in `from_file` to an absolute path.
    ///
    /// Relative specifiers resolve against the importing file. Otherwise the applicable
    /// remapping with the longest context and prefix wins, then the project root, then
    /// each library folder.
    #[must_use]
    pub fn resolve_import(&self, import: &str, from_file: &Path) -> Option<PathBuf> {
        if import.is_empty() {
            return None;
        }
        if import.starts_with("./") || import.starts_with("../") {
            let base = from_file.parent()?;
            return Some(normalize_path(&base.join(import)));
        }
        let remapped = self
            .remappings
            .iter()
            .rev()
            .filter(|r| r.is_import_for_this(import, Some(from_file)))
            .max_by_key(|r| (r.context.as_ref().map_or(0, String::len), r.prefix.len()))
            .and_then(|r| r.resolve_import(import, Some(from_file)));
        if remapped.is_some() {
            return remapped;
        }
        let from_root = normalize_path(&self.root.join(import));
        if from_root.is_file() {
            return Some(from_root);
        }
        self.library_folders
            .iter()
            .map(|folder| normalize_path(&folder.join(import)))
            .find(|candidate| candidate.is_file())
            .or(Some(from_root))
    }

    /// The specifier to write in `from_file` to import `file`.
    #[must_use]
    pub fn import_specifier(&self, file: &Path, from_file: &Path) -> String {
        if let Some(specifier) = self
            .find_remapping_for_file(file)
            .and_then(|r| r.create_import_from_file(file))
        {
            return specifier;
        }
        let from_dir = from_file.parent().unwrap_or(&self.root);
        let relative = relative_path(from_dir, file);
        if relative.starts_with("../") {
            relative
        } else {
            format!("./{relative}")
        }
    }
}

fn read_foundry_profile(root: &Path) -> Result<FoundryProfile, crate::Error> {
    let path = root.join("foundry.toml");
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FoundryProfile::default()),
        Err(e) => return Err(crate::Error::io(path, e)),
    };
    let mut config: FoundryToml = toml::from_str(&text)?;
    Ok(config.profile.remove("default").unwrap_or_default())
}

/// Walk `folder` recursively. Directories are entered once by their canonical path, so a
/// symlink back to a parent folder is not followed twice.
fn collect_solidity_files(
    folder: &Path,
    excluded: &[PathBuf],
    visited: &mut FxHashSet<PathBuf>,
    files: &mut Vec<PathBuf>,
) {
    let Ok(canonical) = folder.canonicalize() else {
        return;
    };
    if !visited.insert(canonical) {
        tracing::debug!(folder = %folder.display(), "skipping folder already walked");
        return;
    }
    let Ok(entries) = std::fs::read_dir(folder) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if path.is_dir() {
            if name.starts_with('.')
                || SKIPPED_FOLDERS.contains(&name.as_ref())
                || excluded.iter().any(|e| normalize_path(&path) == *e)
            {
                continue;
            }
            collect_solidity_files(&path, excluded, visited, files);
        } else if name.ends_with(".sol") {
            files.push(normalize_path(&path));
        }
    }
}

/// Path of `to` relative to the directory `from`, with forward slashes.
fn relative_path(from: &Path, to: &Path) -> String {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<String> = from.iter().skip(common).map(|_| "..".to_string()).collect();
    parts.extend(
        to.iter()
            .skip(common)
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn write(root: &Path, relative: &str, text: &str) -> Result<PathBuf, std::io::Error> {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, text)?;
        Ok(normalize_path(&path))
    }

    #[test]
    fn test_foundry_layout() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write(
            root,
            "foundry.toml",
            "[profile.default]\nsrc = \"contracts\"\nlibs = [\"deps\"]\nremappings = [\"@oz/=deps/oz/\"]\n",
        )?;
        let token = write(root, "contracts/Token.sol", "contract Token {}")?;
        let test = write(root, "test/Token.t.sol", "contract TokenTest {}")?;
        let library = write(root, "deps/oz/ERC20.sol", "contract ERC20 {}")?;
        write(root, "contracts/notes.md", "not solidity")?;

        let project = Project::load(root, &ServerConfig::default());
        assert_eq!(project.project_source_files(), vec![token.clone(), test]);
        assert_eq!(project.library_source_files(), vec![library.clone()]);
        assert_eq!(project.origin_of(&library), Origin::Library);
        assert_eq!(project.origin_of(&token), Origin::Project);
        assert_eq!(project.resolve_import("@oz/ERC20.sol", &token), Some(library.clone()));
        assert_eq!(project.import_specifier(&library, &token), "@oz/ERC20.sol");
        Ok(())
    }

    #[test]
    fn test_relative_imports() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        let a = write(root, "src/a/A.sol", "")?;
        let b = write(root, "src/b/B.sol", "")?;
        let project = Project::load(root, &ServerConfig::default());
        assert_eq!(project.resolve_import("../b/B.sol", &a), Some(b.clone()));
        assert_eq!(project.import_specifier(&b, &a), "../b/B.sol");
        assert_eq!(project.import_specifier(&a, &a), "./A.sol");
        assert_eq!(project.resolve_import("src/b/B.sol", &a), Some(b));
        Ok(())
    }

    #[test]
    fn test_detected_library_remappings() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        let test = write(root, "lib/forge-std/src/Test.sol", "contract Test {}")?;
        let main = write(root, "src/Main.sol", "")?;
        let project = Project::load(root, &ServerConfig::default());
        assert_eq!(project.resolve_import("forge-std/Test.sol", &main), Some(test));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_invalid_foundry_toml_falls_back() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "foundry.toml", "this is = = not toml")?;
        let project = Project::load(dir.path(), &ServerConfig::default());
        assert!(project.sources_folder.ends_with("src"));
        assert_eq!(project.library_folders.len(), 2);
        assert!(logs_contain("ignoring foundry.toml"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_walked_once() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        let dependency = write(root, "lib/dep/src/D.sol", "contract D {}")?;
        std::os::unix::fs::symlink(root.join("lib/dep"), root.join("lib/dep/src/self"))?;
        let project = Project::load(root, &ServerConfig::default());
        assert_eq!(project.library_source_files(), vec![dependency]);
        Ok(())
    }
}
