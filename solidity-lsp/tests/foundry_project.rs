#![allow(clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use solidity_lsp::capabilities::completion::compute_completion;
use solidity_lsp::capabilities::definition::{Definition, find_definition};
use solidity_lsp::config::ServerConfig;
use solidity_lsp::model::ParsedDocument;
use solidity_lsp::project::Project;
use solidity_lsp::state::{CodeWalker, Snapshot, normalize_path};
use tempfile::TempDir;
use tower_lsp::lsp_types::Position;

const MATH: &str = "\
library Math {
    function add(uint256 a, uint256 b) internal pure returns (uint256) {
        return a + b;
    }
}
";

const VAULT: &str = "\
import \"@oz/Math.sol\";

contract Vault {
    using Math for uint256;
    uint256 total;

    constructor(uint256 initial) {
        total = initial;
    }

    function deposit(uint256 amount) public {
        total = total.add(amount);
    }
}
";

struct Workspace {
    dir: TempDir,
    project: Project,
    walker: CodeWalker,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temporary directory");
        for (relative, text) in [
            ("remappings.txt", "@oz/=lib/oz/\n"),
            ("lib/oz/Math.sol", MATH),
            ("src/Vault.sol", VAULT),
        ] {
            let path = dir.path().join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("parent directory");
            }
            std::fs::write(&path, text).expect("fixture file");
        }
        let project = Project::load(dir.path(), &ServerConfig::default());
        let walker = CodeWalker::new(project.clone(), 8);
        walker.init_documents();
        Self {
            dir,
            project,
            walker,
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        normalize_path(&self.dir.path().join(relative))
    }

    fn vault(&self, snapshot: &Snapshot) -> Arc<ParsedDocument> {
        let cached = snapshot.get(&self.path("src/Vault.sol")).expect("vault cached");
        Arc::clone(&cached.parsed)
    }
}

fn position_after(document: &ParsedDocument, needle: &str) -> Position {
    let offset = document.text().find(needle).expect("needle in text") + needle.len();
    document
        .line_index
        .position(&document.source.unformatted_text, offset)
}

#[test]
fn test_remapped_import_round_trip() {
    let workspace = Workspace::new();
    let vault = workspace.path("src/Vault.sol");
    let math = workspace.path("lib/oz/Math.sol");
    assert_eq!(workspace.project.resolve_import("@oz/Math.sol", &vault), Some(math.clone()));
    assert_eq!(workspace.project.import_specifier(&math, &vault), "@oz/Math.sol");
    assert!(workspace.project.is_library_file(&math));
}

#[test]
fn test_library_is_indexed_and_wired() {
    let workspace = Workspace::new();
    let cached = workspace
        .walker
        .get(&workspace.path("src/Vault.sol"))
        .expect("vault cached");
    assert!(cached.imports_path(&workspace.path("lib/oz/Math.sol")));
}

#[test]
fn test_using_for_call_goes_to_the_library() {
    let workspace = Workspace::new();
    let snapshot = workspace.walker.snapshot();
    let vault = workspace.vault(&snapshot);
    let position = position_after(&vault, "total.a");
    let Some(Definition::Declaration(found)) = find_definition(&snapshot, &vault, position) else {
        unreachable!("add resolves to a declaration");
    };
    assert_eq!(found.declaration().map(|d| d.name.as_str()), Some("add"));
    assert_eq!(&**found.document.path(), workspace.path("lib/oz/Math.sol").as_path());
}

#[test]
fn test_member_completion_offers_extensions() {
    let workspace = Workspace::new();
    let snapshot = workspace.walker.snapshot();
    let vault = workspace.vault(&snapshot);
    let position = position_after(&vault, "total.");
    let items = compute_completion(&snapshot, &workspace.project, &vault, position);
    assert!(items.iter().any(|item| item.label == "add"));
}

#[test]
fn test_constructor_is_detected() {
    let workspace = Workspace::new();
    let snapshot = workspace.walker.snapshot();
    let vault = workspace.vault(&snapshot);
    let constructor = vault
        .functions()
        .find(|f| f.is_constructor())
        .expect("constructor");
    assert_eq!(constructor.name, "");
    let info = constructor.function().expect("function info");
    let parameters: Vec<&str> = vault
        .parameters(info)
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(parameters, vec!["initial"]);
}
