//! Find References: every name that resolves to the declaration under the cursor

use std::sync::Arc;

use tower_lsp::lsp_types::{self, Position};

use crate::convert::lsp_location;
use crate::model::ParsedDocument;
use crate::resolve::{Resolved, Resolver, Target};
use crate::state::Snapshot;

/// Find all references to the symbol at the given position.
///
/// The cursor can be on a declaration name or on any reference to it. Builtins and
/// import paths have no references.
#[must_use]
pub fn find_references(
    snapshot: &Snapshot,
    document: &Arc<ParsedDocument>,
    position: Position,
    include_declaration: bool,
) -> Option<Vec<lsp_types::Location>> {
    let offset = document.offset_at(position)?;
    let resolver = Resolver::new(snapshot);
    let Target::Resolved(Resolved::Declaration(declared)) = resolver.target_at(document, offset)?
    else {
        return None;
    };
    Some(
        resolver
            .references(&declared, include_declaration)
            .iter()
            .filter_map(|occurrence| lsp_location(&occurrence.document, &occurrence.location))
            .collect(),
    )
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::capabilities::fixtures::{document, position, walker};
    use pretty_assertions::assert_eq;

    const LIB: &str = "\
library Math {
    function min(uint256 a, uint256 b) internal pure returns (uint256) {
        return a < b ? a : b;
    }
}
";

    const USER: &str = "\
import {Math as M} from \"./Math.sol\";

contract User {
    function f(uint256 a) external pure returns (uint256) {
        return M.min(a, 1) + M.min(2, a);
    }
}
";

    #[test]
    fn test_references_cross_documents_and_aliases() {
        let walker = walker(&[("/p/src/Math.sol", LIB), ("/p/src/User.sol", USER)]);
        let snapshot = walker.snapshot();
        let math = document(&snapshot, "/p/src/Math.sol").expect("math parsed");
        let at = position(&math, "function m|in").expect("marker");

        let found = find_references(&snapshot, &math, at, true).expect("min is a declaration");
        let places: Vec<(String, u32)> = found
            .iter()
            .map(|l| (l.uri.path().to_string(), l.range.start.line))
            .collect();
        assert_eq!(
            places,
            vec![
                ("/p/src/Math.sol".to_string(), 1),
                ("/p/src/User.sol".to_string(), 4),
                ("/p/src/User.sol".to_string(), 4),
            ]
        );

        let without = find_references(&snapshot, &math, at, false).expect("min is a declaration");
        assert_eq!(without.len(), 2);
    }

    #[test]
    fn test_parameter_references_stay_in_their_function() {
        let walker = walker(&[("/p/src/Math.sol", LIB), ("/p/src/User.sol", USER)]);
        let snapshot = walker.snapshot();
        let user = document(&snapshot, "/p/src/User.sol").expect("user parsed");
        let at = position(&user, "min(|a, 1)").expect("marker");
        let found = find_references(&snapshot, &user, at, false).expect("a is a parameter");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|l| l.uri.path() == "/p/src/User.sol"));
    }
}
