use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use super::*;
use crate::config::ServerConfig;
use crate::project::Project;
use crate::state::CodeWalker;

fn walker(documents: &[(&str, &str)]) -> CodeWalker {
    let walker = CodeWalker::new(Project::load(Path::new("/p"), &ServerConfig::default()), 8);
    for (path, text) in documents {
        walker.get_selected_document(Path::new(path), text, None);
    }
    walker
}

/// Offset of the `|` in `marker` within `text`.
fn cursor(text: &str, marker: &str) -> Option<usize> {
    let split = marker.find('|')?;
    text.find(&marker.replace('|', "")).map(|start| start + split)
}

/// Name and home path of whatever the cursor in `marker` designates.
fn resolved_at(walker: &CodeWalker, path: &str, marker: &str) -> Option<(String, PathBuf)> {
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let cached = snapshot.get(Path::new(path))?;
    let offset = cursor(cached.parsed.text(), marker)?;
    if let Some(Target::Resolved(Resolved::Declaration(r))) = resolver.target_at(&cached.parsed, offset) {
        return Some((r.declaration()?.name.clone(), r.document.path().to_path_buf()));
    }
    None
}

fn parent_name(walker: &CodeWalker, path: &str, marker: &str) -> Option<String> {
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let cached = snapshot.get(Path::new(path))?;
    let offset = cursor(cached.parsed.text(), marker)?;
    let Some(Target::Resolved(Resolved::Declaration(r))) = resolver.target_at(&cached.parsed, offset)
    else {
        return None;
    };
    let parent = r.declaration()?.parent?;
    Some(r.document.declaration(parent)?.name.clone())
}

const TOKEN: &str = "\
contract Token {
    uint256 total;
    function f(uint256 amount) public returns (uint256) {
        uint256 before = total;
        uint256 total = amount;
        return total + before;
    }
}
";

#[test]
fn test_locals_shadow_state_after_their_declaration() {
    let walker = walker(&[("/p/src/Token.sol", TOKEN)]);
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let document = snapshot.get(Path::new("/p/src/Token.sol")).map(|c| Arc::clone(&c.parsed));
    let role_at = |marker: &str| {
        let document = document.as_ref()?;
        let offset = cursor(document.text(), marker)?;
        let Some(Target::Resolved(Resolved::Declaration(r))) = resolver.target_at(document, offset)
        else {
            return None;
        };
        r.declaration()?.variable().map(|v| v.role)
    };
    assert_eq!(role_at("before = |total"), Some(VariableRole::State));
    assert_eq!(role_at("return |total"), Some(VariableRole::Local));
    assert_eq!(role_at("= |amount"), Some(VariableRole::Parameter));
}

const INHERITANCE: &str = "\
contract Base {
    uint256 shared;
    function hello() public virtual returns (uint256) { return 1; }
}
contract Child is Base {
    function run() public { shared = hello(); }
}
";

#[test]
fn test_inherited_members() {
    let walker = walker(&[("/p/src/Child.sol", INHERITANCE)]);
    assert_eq!(
        parent_name(&walker, "/p/src/Child.sol", "= |hello()"),
        Some("Base".to_string())
    );
    assert_eq!(
        parent_name(&walker, "/p/src/Child.sol", "{ |shared ="),
        Some("Base".to_string())
    );
    assert_eq!(
        resolved_at(&walker, "/p/src/Child.sol", "is |Base").map(|(name, _)| name),
        Some("Base".to_string())
    );
}

const SAFE_MATH: &str = "\
library SafeMath {
    function add(uint256 a, uint256 b) internal pure returns (uint256) { return a + b; }
}
contract Bank {
    using SafeMath for uint256;
    function deposit(uint256 x, uint256 y) public pure returns (uint256) {
        return x.add(y);
    }
}
";

#[test]
fn test_using_for_attaches_library_functions() {
    let walker = walker(&[("/p/src/Bank.sol", SAFE_MATH)]);
    assert_eq!(
        parent_name(&walker, "/p/src/Bank.sol", "x.|add(y)"),
        Some("SafeMath".to_string())
    );
}

const OVERLOADS: &str = "\
contract O {
    function put(uint256 a) public {}
    function put(uint256 a, uint256 b) public {}
    function run() public { put(1, 2); }
}
";

#[test]
#[allow(clippy::expect_used)]
fn test_overload_chosen_by_argument_count() {
    let walker = walker(&[("/p/src/O.sol", OVERLOADS)]);
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let document = &snapshot.get(Path::new("/p/src/O.sol")).expect("cached").parsed;
    let offset = cursor(document.text(), "{ |put(1").expect("call");
    let resolved = resolver
        .target_at(document, offset)
        .and_then(|target| if let Target::Resolved(r) = target { r.into_declaration() } else { None })
        .expect("resolved");
    let parameters = resolved
        .declaration()
        .and_then(Declaration::function)
        .map(|f| f.parameters.len());
    assert_eq!(parameters, Some(2));
    assert_eq!(resolver.overloads(&resolved).len(), 2);
}

const ENUMS: &str = "\
contract E {
    enum State { Open, Closed }
    State state;
    function close() public { state = State.Closed; }
    function caller() public view returns (address) { return msg.sender; }
}
";

#[test]
fn test_enum_values_and_builtins() {
    let walker = walker(&[("/p/src/E.sol", ENUMS)]);
    assert_eq!(
        parent_name(&walker, "/p/src/E.sol", "State.|Closed"),
        Some("State".to_string())
    );
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let builtin = snapshot.get(Path::new("/p/src/E.sol")).and_then(|cached| {
        let offset = cursor(cached.parsed.text(), "msg.|sender")?;
        if let Some(Target::Resolved(Resolved::Builtin(builtin))) = resolver.target_at(&cached.parsed, offset) {
            Some(builtin.name)
        } else {
            None
        }
    });
    assert_eq!(builtin, Some("sender"));
}

const SHAPES: &str = "\
struct Point { uint256 x; uint256 y; }
contract Shapes {
    mapping(address => Point) public points;
}
";

const CANVAS: &str = "\
import \"./Shapes.sol\";
contract Canvas is Shapes {
    function draw() public view returns (uint256) {
        return points[msg.sender].x;
    }
}
";

const USER: &str = "\
import {Point as P} from \"./Shapes.sol\";
import \"./Shapes.sol\" as Geo;
contract User {
    P origin;
    Geo.Shapes shapes;
}
";

#[test]
fn test_members_through_imports_and_indexing() {
    let walker = walker(&[("/p/src/Shapes.sol", SHAPES), ("/p/src/Canvas.sol", CANVAS)]);
    assert_eq!(
        resolved_at(&walker, "/p/src/Canvas.sol", "].|x"),
        Some(("x".to_string(), PathBuf::from("/p/src/Shapes.sol")))
    );
    assert_eq!(
        parent_name(&walker, "/p/src/Canvas.sol", "].|x"),
        Some("Point".to_string())
    );
}

#[test]
fn test_import_aliases() {
    let walker = walker(&[("/p/src/User.sol", USER), ("/p/src/Shapes.sol", SHAPES)]);
    assert_eq!(
        resolved_at(&walker, "/p/src/User.sol", "|P origin"),
        Some(("Point".to_string(), PathBuf::from("/p/src/Shapes.sol")))
    );
    assert_eq!(
        resolved_at(&walker, "/p/src/User.sol", "Geo.|Shapes shapes"),
        Some(("Shapes".to_string(), PathBuf::from("/p/src/Shapes.sol")))
    );
}

#[test]
#[allow(clippy::expect_used, clippy::panic)]
fn test_references_are_symmetric() {
    let walker = walker(&[("/p/src/Shapes.sol", SHAPES), ("/p/src/Canvas.sol", CANVAS)]);
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let canvas = &snapshot.get(Path::new("/p/src/Canvas.sol")).expect("canvas").parsed;
    let offset = cursor(canvas.text(), "].|x").expect("member");
    let Some(Target::Resolved(Resolved::Declaration(x))) = resolver.target_at(canvas, offset) else {
        panic!("x does not resolve");
    };
    let occurrences = resolver.references(&x, true);
    let places: Vec<(PathBuf, usize)> = occurrences
        .iter()
        .map(|o| (o.document.path().to_path_buf(), o.location.start))
        .collect();
    assert_eq!(
        places,
        vec![
            (PathBuf::from("/p/src/Shapes.sol"), SHAPES.find("x;").expect("field")),
            (PathBuf::from("/p/src/Canvas.sol"), offset),
        ]
    );
}

#[test]
#[allow(clippy::expect_used)]
fn test_memo_follows_replaced_imports() {
    let walker = walker(&[("/p/src/Shapes.sol", SHAPES), ("/p/src/Canvas.sol", CANVAS)]);
    assert!(resolved_at(&walker, "/p/src/Canvas.sol", "].|x").is_some());
    let edited = format!("// edited\n{SHAPES}");
    let shapes = walker.get_selected_document(Path::new("/p/src/Shapes.sol"), &edited, None);
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let canvas = &snapshot.get(Path::new("/p/src/Canvas.sol")).expect("canvas").parsed;
    let offset = cursor(canvas.text(), "].|x").expect("member");
    let resolved = resolver
        .target_at(canvas, offset)
        .and_then(|t| if let Target::Resolved(r) = t { r.into_declaration() } else { None })
        .expect("resolved");
    assert!(Arc::ptr_eq(&resolved.document, &shapes.parsed));
}

#[test]
#[allow(clippy::expect_used)]
fn test_chain_members_and_scope() {
    let walker = walker(&[("/p/src/Shapes.sol", SHAPES), ("/p/src/Canvas.sol", CANVAS)]);
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let canvas = &snapshot.get(Path::new("/p/src/Canvas.sol")).expect("canvas").parsed;
    let offset = cursor(canvas.text(), "return |points").expect("body");
    let segments = [Segment {
        name: "points".to_string(),
        called: false,
        index_depth: 1,
    }];
    let target = resolver.chain_target(canvas, offset, &segments).expect("point");
    let names: Vec<String> = resolver
        .members(canvas, None, &target)
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    assert_eq!(names, vec!["x", "y"]);
    let visible: Vec<String> = resolver
        .scope_members(canvas, offset)
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    for expected in ["draw", "points", "Canvas", "Point", "msg"] {
        assert!(visible.iter().any(|name| name == expected), "{expected} missing");
    }
}

const ABI: &str = "\
struct Pair { uint a; address payable b; }
contract X {
    enum Kind { A }
    function swap(Pair memory p, Kind k, X other, uint[] calldata v) external {}
}
";

#[test]
#[allow(clippy::expect_used)]
fn test_abi_signature() {
    let walker = walker(&[("/p/src/X.sol", ABI)]);
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let document = &snapshot.get(Path::new("/p/src/X.sol")).expect("cached").parsed;
    let swap = document
        .declarations()
        .find(|d| d.name == "swap")
        .expect("swap");
    assert_eq!(
        abi_signature(&resolver, document, swap).as_deref(),
        Some("swap((uint256,address),uint8,address,uint256[])")
    );
}

#[test]
#[allow(clippy::expect_used)]
fn test_type_definition_of_variable() {
    let walker = walker(&[("/p/src/User.sol", USER), ("/p/src/Shapes.sol", SHAPES)]);
    let snapshot = walker.snapshot();
    let resolver = Resolver::new(&snapshot);
    let user = &snapshot.get(Path::new("/p/src/User.sol")).expect("user").parsed;
    let origin = user
        .declarations()
        .find(|d| d.name == "origin")
        .expect("origin");
    let ty = resolver
        .type_definition(&Resolved::Declaration(DeclRef::new(user, origin.id)))
        .expect("type");
    assert_eq!(ty.declaration().map(|d| d.name.as_str()), Some("Point"));
}
