#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use solidity_lsp::config::ServerConfig;
use solidity_lsp::project::Project;
use solidity_lsp::resolve::{Resolved, Resolver, Target};
use solidity_lsp::state::{CodeWalker, Origin, normalize_path};
use tempfile::TempDir;

const A: &str = "\
struct Point {
    uint256 x;
}
";

const B: &str = "\
import \"./A.sol\";

contract Canvas {
    Point origin;
    function left() public view returns (uint256) {
        return origin.x;
    }
}
";

const C: &str = "\
import \"./B.sol\";

contract Gallery is Canvas {}
";

struct Fixture {
    dir: TempDir,
    walker: CodeWalker,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().expect("temporary directory");
        for (relative, text) in files {
            let path = dir.path().join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("parent directory");
            }
            std::fs::write(&path, text).expect("source file");
        }
        let walker = CodeWalker::new(Project::load(dir.path(), &ServerConfig::default()), 8);
        walker.init_documents();
        Self { dir, walker }
    }

    fn path(&self, relative: &str) -> PathBuf {
        normalize_path(&self.dir.path().join(relative))
    }
}

#[test]
fn test_init_documents_wires_imports() {
    let fixture = Fixture::new(&[("src/A.sol", A), ("src/B.sol", B), ("src/C.sol", C)]);
    assert_eq!(fixture.walker.len(), 3);
    let b = fixture.walker.get(&fixture.path("src/B.sol")).expect("B cached");
    assert!(b.imports_path(&fixture.path("src/A.sol")));
    assert_eq!(b.parsed.source.origin, Origin::Project);
}

#[test]
fn test_unchanged_text_reuses_the_parse() {
    let fixture = Fixture::new(&[("src/A.sol", A)]);
    let path = fixture.path("src/A.sol");
    let first = fixture.walker.get_selected_document(&path, A, None);
    let second = fixture.walker.get_selected_document(&path, A, Some(1));
    assert!(Arc::ptr_eq(&first.parsed, &second.parsed));
}

#[test]
fn test_pinned_document_ignores_edits() {
    let fixture = Fixture::new(&[("src/A.sol", A)]);
    let path = fixture.path("src/A.sol");
    let pinned = fixture.walker.get_selected_document(&path, A, None);
    assert!(fixture.walker.pin(&path));
    assert!(fixture.walker.is_pinned(&path));

    let edited = format!("{A}\nstruct Size {{ uint256 w; }}\n");
    let while_pinned = fixture.walker.get_selected_document(&path, &edited, None);
    assert!(Arc::ptr_eq(&pinned.parsed, &while_pinned.parsed));

    assert!(fixture.walker.unpin(&path));
    let after = fixture.walker.get_selected_document(&path, &edited, None);
    assert!(!Arc::ptr_eq(&pinned.parsed, &after.parsed));
    assert!(after.parsed.structs().any(|s| s.name == "Size"));
}

#[test]
fn test_pinning_an_unknown_path_fails() {
    let fixture = Fixture::new(&[("src/A.sol", A)]);
    assert!(!fixture.walker.pin(&fixture.path("src/Missing.sol")));
}

#[test]
fn test_changing_a_rewires_its_importers() {
    let fixture = Fixture::new(&[("src/A.sol", A), ("src/B.sol", B), ("src/C.sol", C)]);
    let walker = &fixture.walker;
    let b_before = walker.get(&fixture.path("src/B.sol")).expect("B cached");
    let c_before = walker.get(&fixture.path("src/C.sol")).expect("C cached");

    let edited_a = format!("// moved\n{A}");
    let a = walker.get_selected_document(&fixture.path("src/A.sol"), &edited_a, None);

    let b_after = walker.get(&fixture.path("src/B.sol")).expect("B cached");
    let c_after = walker.get(&fixture.path("src/C.sol")).expect("C cached");
    assert!(Arc::ptr_eq(&b_before.parsed, &b_after.parsed));
    assert!(b_after.wired_at > b_before.wired_at);
    assert!(Arc::ptr_eq(&c_before.parsed, &c_after.parsed));
    assert!(c_after.wired_at > c_before.wired_at);

    // B now resolves into the new A
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let b = &snapshot.get(&fixture.path("src/B.sol")).expect("B in snapshot").parsed;
    let offset = b.text().find("origin.x").expect("member access") + "origin.".len();
    let Some(Target::Resolved(Resolved::Declaration(field))) = resolver.target_at(b, offset) else {
        unreachable!("x resolves to the struct member");
    };
    assert!(Arc::ptr_eq(&field.document, &a.parsed));
}

#[test]
fn test_name_added_to_a_resolves_in_indirect_importer() {
    let gallery = "\
import \"./B.sol\";

contract Gallery is Canvas {
    Size frame;
}
";
    let fixture = Fixture::new(&[("src/A.sol", A), ("src/B.sol", B), ("src/C.sol", gallery)]);
    let walker = &fixture.walker;
    let c_path = fixture.path("src/C.sol");
    let size_in_c = |snapshot: &solidity_lsp::state::Snapshot| {
        let c = Arc::clone(&snapshot.get(&c_path).expect("C in snapshot").parsed);
        let offset = c.text().find("Size frame").expect("type name") + 1;
        Resolver::new(snapshot).target_at(&c, offset)
    };

    let before = walker.snapshot();
    assert!(!matches!(
        size_in_c(&before),
        Some(Target::Resolved(Resolved::Declaration(_)))
    ));

    let edited_a = format!("{A}\nstruct Size {{ uint256 w; }}\n");
    let a = walker.get_selected_document(&fixture.path("src/A.sol"), &edited_a, None);

    let after = walker.snapshot();
    let Some(Target::Resolved(Resolved::Declaration(size))) = size_in_c(&after) else {
        unreachable!("Size resolves through B into the new A");
    };
    assert_eq!(size.declaration().map(|d| d.name.as_str()), Some("Size"));
    assert!(Arc::ptr_eq(&size.document, &a.parsed));
}

#[test]
fn test_snapshot_never_misses_a_replaced_document() {
    let fixture = Fixture::new(&[("src/A.sol", A), ("src/B.sol", B)]);
    let walker = &fixture.walker;
    let a_path = fixture.path("src/A.sol");
    let b_path = fixture.path("src/B.sol");
    let edited_a = format!("// moved\n{A}");

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for round in 0..200 {
                let text = if round % 2 == 0 { edited_a.as_str() } else { A };
                walker.get_selected_document(&a_path, text, None);
            }
        });
        for _ in 0..200 {
            let snapshot = walker.snapshot();
            assert!(snapshot.get(&a_path).is_some());
            let b = snapshot.get(&b_path).expect("B in snapshot");
            assert!(b.imports_path(&a_path));
        }
    });
}

#[test]
fn test_changing_c_leaves_a_and_b_alone() {
    let fixture = Fixture::new(&[("src/A.sol", A), ("src/B.sol", B), ("src/C.sol", C)]);
    let walker = &fixture.walker;
    let a_before = walker.get(&fixture.path("src/A.sol")).expect("A cached");
    let b_before = walker.get(&fixture.path("src/B.sol")).expect("B cached");

    let edited_c = format!("{C}\ncontract Annex {{}}\n");
    walker.get_selected_document(&fixture.path("src/C.sol"), &edited_c, None);

    let a_after = walker.get(&fixture.path("src/A.sol")).expect("A cached");
    let b_after = walker.get(&fixture.path("src/B.sol")).expect("B cached");
    assert!(Arc::ptr_eq(&a_before, &a_after));
    assert!(Arc::ptr_eq(&b_before, &b_after));
}

#[test]
fn test_pinned_importer_is_not_rewired() {
    let fixture = Fixture::new(&[("src/A.sol", A), ("src/B.sol", B)]);
    let walker = &fixture.walker;
    let b_path = fixture.path("src/B.sol");
    assert!(walker.pin(&b_path));
    let b_before = walker.get(&b_path).expect("B cached");

    walker.get_selected_document(&fixture.path("src/A.sol"), &format!("// moved\n{A}"), None);

    let b_after = walker.get(&b_path).expect("B cached");
    assert!(Arc::ptr_eq(&b_before, &b_after));
}

#[test]
fn test_refresh_picks_up_disk_changes_but_keeps_editor_text() {
    let fixture = Fixture::new(&[("src/A.sol", A), ("src/B.sol", B)]);
    let walker = &fixture.walker;
    let a_path = fixture.path("src/A.sol");
    let b_path = fixture.path("src/B.sol");

    let editor_b = format!("{B}\ncontract Draft {{}}\n");
    walker.get_selected_document(&b_path, &editor_b, None);
    std::fs::write(&a_path, format!("{A}\nstruct Size {{ uint256 w; }}\n")).expect("rewrite A");
    std::fs::write(&b_path, "contract Overwritten {}\n").expect("rewrite B");

    walker.initialise_changed_documents();

    let a = walker.get(&a_path).expect("A cached");
    assert!(a.parsed.structs().any(|s| s.name == "Size"));
    let b = walker.get(&b_path).expect("B cached");
    assert_eq!(b.parsed.source.origin, Origin::Editor);
    assert!(b.parsed.contracts().any(|c| c.name == "Draft"));
}

#[test]
fn test_deleted_file_is_removed_and_unwired() {
    let fixture = Fixture::new(&[("src/A.sol", A), ("src/B.sol", B)]);
    let walker = &fixture.walker;
    let a_path = fixture.path("src/A.sol");
    let b_before = walker.get(&fixture.path("src/B.sol")).expect("B cached");

    std::fs::remove_file(&a_path).expect("delete A");
    assert!(walker.remove_document(&a_path));
    assert!(walker.get(&a_path).is_none());
    assert!(!walker.remove_document(&a_path));

    let b_after = walker.get(&fixture.path("src/B.sol")).expect("B cached");
    assert!(b_after.wired_at > b_before.wired_at);
}

#[test]
fn test_closing_restores_the_disk_version() {
    let fixture = Fixture::new(&[("src/A.sol", A)]);
    let path = fixture.path("src/A.sol");
    let unsaved = "struct Unsaved { uint256 y; }\n";
    fixture.walker.get_selected_document(&path, unsaved, None);

    let reloaded = fixture.walker.reload_from_disk(&path).expect("A on disk");
    assert_eq!(reloaded.parsed.text(), A);
    assert_eq!(reloaded.parsed.source.origin, Origin::Project);
}

#[test]
fn test_get_or_load_parses_on_demand() {
    let fixture = Fixture::new(&[]);
    let path: &Path = &fixture.path("script/Deploy.s.sol");
    assert!(fixture.walker.get_or_load(path).is_none());
    std::fs::create_dir_all(fixture.path("script")).expect("script folder");
    std::fs::write(path, "contract Deploy {}\n").expect("script file");
    let loaded = fixture.walker.get_or_load(path).expect("loaded");
    assert!(loaded.parsed.contracts().any(|c| c.name == "Deploy"));
}
