//! Code lenses to run Foundry tests from `.t.sol` files

use tower_lsp::lsp_types::{CodeLens, Command};

use crate::forge::TestTarget;
use crate::model::{Declaration, ParsedDocument};

pub const RUN_TEST: &str = "solidity.runTest";
pub const RUN_CONTRACT_TESTS: &str = "solidity.runContractTests";

fn is_test_file(document: &ParsedDocument) -> bool {
    document
        .path()
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".t.sol"))
}

fn is_test_function(declaration: &Declaration) -> bool {
    declaration.function().is_some()
        && (declaration.name.starts_with("test") || declaration.name.starts_with("invariant"))
}

/// A "Run all tests" lens on every contract with tests, and a "Run test" lens on each
/// test function.
#[must_use]
pub fn compute_code_lenses(document: &ParsedDocument) -> Vec<CodeLens> {
    if !is_test_file(document) {
        return Vec::new();
    }
    let mut lenses = Vec::new();
    for contract in document.contracts() {
        let tests: Vec<&Declaration> = document
            .children(contract.id)
            .filter(|d| is_test_function(d))
            .collect();
        if tests.is_empty() {
            continue;
        }
        let target = TestTarget {
            path: document.path().to_path_buf(),
            contract: contract.name.clone(),
            test: None,
        };
        lenses.push(lens(document, contract, "Run all tests", RUN_CONTRACT_TESTS, &target));
        for test in tests {
            let target = TestTarget {
                test: Some(test.name.clone()),
                ..target.clone()
            };
            lenses.push(lens(document, test, "Run test", RUN_TEST, &target));
        }
    }
    lenses
}

fn lens(
    document: &ParsedDocument,
    declaration: &Declaration,
    title: &str,
    command: &str,
    target: &TestTarget,
) -> CodeLens {
    let location = declaration.name_location.unwrap_or(declaration.location);
    CodeLens {
        range: document.range_of(&location),
        command: Some(Command {
            title: title.to_string(),
            command: command.to_string(),
            arguments: serde_json::to_value(target).ok().map(|value| vec![value]),
        }),
        data: None,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::capabilities::fixtures::{document, walker};
    use pretty_assertions::assert_eq;

    const TEST: &str = "\
contract TokenTest {
    function setUp() public {}
    function testMint() public {}
    function invariant_supply() public {}
}

contract Helper {
    function help() public {}
}
";

    #[test]
    fn test_lenses_for_test_functions() {
        let walker = walker(&[("/p/test/Token.t.sol", TEST)]);
        let document = document(&walker.snapshot(), "/p/test/Token.t.sol").expect("parsed");
        let lenses = compute_code_lenses(&document);
        let commands: Vec<(u32, String, String)> = lenses
            .iter()
            .filter_map(|lens| {
                let command = lens.command.as_ref()?;
                Some((lens.range.start.line, command.title.clone(), command.command.clone()))
            })
            .collect();
        assert_eq!(
            commands,
            vec![
                (0, "Run all tests".to_string(), RUN_CONTRACT_TESTS.to_string()),
                (2, "Run test".to_string(), RUN_TEST.to_string()),
                (3, "Run test".to_string(), RUN_TEST.to_string()),
            ]
        );
        let argument = lenses
            .get(1)
            .and_then(|lens| lens.command.as_ref())
            .and_then(|command| command.arguments.as_ref())
            .and_then(|arguments| arguments.first())
            .cloned()
            .expect("lens argument");
        let target: TestTarget = serde_json::from_value(argument).expect("test target");
        assert_eq!(target.key(), "TokenTest::testMint");
    }

    #[test]
    fn test_no_lenses_outside_test_files() {
        let walker = walker(&[("/p/src/Token.sol", TEST)]);
        let document = document(&walker.snapshot(), "/p/src/Token.sol").expect("parsed");
        assert!(compute_code_lenses(&document).is_empty());
    }
}
