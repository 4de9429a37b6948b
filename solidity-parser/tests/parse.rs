#![allow(clippy::panic, clippy::indexing_slicing)]

use pretty_assertions::assert_eq;
use rstest::rstest;
use solidity_parser::{
    ContractKind, ContractPart, Error, FunctionKind, ImportKind, Location, SourceUnitPart,
    TypeNameKind, UsingTarget, parse,
};

const TOKEN: &str = r#"// SPDX-License-Identifier: MIT
pragma solidity ^0.8.20;

import "./IERC20.sol";
import {Ownable as Owned, Context} from "@oz/access/Ownable.sol";
import * as Utils from "./Utils.sol";

error Unauthorized(address caller);

type Price is uint128;

struct Point {
    uint256 x;
    uint256 y;
}

using Utils for uint256 global;

uint256 constant MAX = 2 ** 256 - 1;

abstract contract Token is Owned, IERC20 {
    using {Utils.add, Utils.sub as -} for Price;

    event Transfer(address indexed from, address indexed to, uint256 value);

    enum State { Active, Paused, }

    mapping(address owner => mapping(address => uint256)) internal allowances;
    uint256[] public history;
    uint256 private immutable decimals;

    modifier onlyActive {
        _;
    }

    constructor(uint256 d) Owned(msg.sender) {
        decimals = d;
    }

    receive() external payable {}

    function transfer(address to, uint256 amount) external virtual override returns (bool) {
        if (amount == 0) revert Unauthorized(msg.sender);
        for (uint256 i = 0; i < history.length; ++i) {
            history[i] += amount;
        }
        emit Transfer(msg.sender, to, amount);
        return true;
    }

    function balanceOf(address) public view virtual returns (uint256);
}
"#;

#[test]
fn test_parse_token_contract() -> Result<(), Error> {
    let unit = parse(TOKEN)?;
    assert_eq!(unit.location, Location::new(0, TOKEN.len()));
    assert_eq!(unit.parts.len(), 10);

    let SourceUnitPart::Import(symbols) = &unit.parts[2] else {
        panic!("expected import");
    };
    let ImportKind::Symbols(imported) = &symbols.kind else {
        panic!("expected symbol import");
    };
    assert_eq!(symbols.path.value, "@oz/access/Ownable.sol");
    assert_eq!(imported.len(), 2);
    assert_eq!(imported[0].alias.as_ref().map(|a| a.name.as_str()), Some("Owned"));

    let SourceUnitPart::Using(using) = &unit.parts[7] else {
        panic!("expected using");
    };
    assert!(using.global);

    let SourceUnitPart::Contract(contract) = &unit.parts[9] else {
        panic!("expected contract");
    };
    assert_eq!(contract.kind, ContractKind::AbstractContract);
    assert_eq!(contract.name.name, "Token");
    assert_eq!(contract.bases.len(), 2);

    let functions: Vec<_> = contract
        .parts
        .iter()
        .filter_map(|part| match part {
            ContractPart::Function(f) => Some(f),
            ContractPart::StateVariable(_)
            | ContractPart::Struct(_)
            | ContractPart::Enum(_)
            | ContractPart::Event(_)
            | ContractPart::Error(_)
            | ContractPart::Using(_)
            | ContractPart::Type(_)
            | ContractPart::StraySemicolon(_) => None,
        })
        .collect();
    let kinds: Vec<_> = functions.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FunctionKind::Modifier,
            FunctionKind::Constructor,
            FunctionKind::Receive,
            FunctionKind::Function,
            FunctionKind::Function,
        ]
    );
    assert!(functions[4].body.is_none());
    assert_eq!(functions[3].returns.len(), 1);
    Ok(())
}

#[test]
fn test_nested_mapping_with_names() -> Result<(), Error> {
    let unit = parse("contract A { mapping(address owner => mapping(address => uint256)) m; }")?;
    let SourceUnitPart::Contract(contract) = &unit.parts[0] else {
        panic!("expected contract");
    };
    let ContractPart::StateVariable(variable) = &contract.parts[0] else {
        panic!("expected state variable");
    };
    let TypeNameKind::Mapping { key_name, value, .. } = &variable.ty.kind else {
        panic!("expected mapping");
    };
    assert_eq!(key_name.as_ref().map(|k| k.name.as_str()), Some("owner"));
    assert!(matches!(value.kind, TypeNameKind::Mapping { .. }));
    Ok(())
}

#[test]
fn test_using_function_list() -> Result<(), Error> {
    let unit = parse("using {add as +, Lib.sub} for Fixed global;")?;
    let SourceUnitPart::Using(using) = &unit.parts[0] else {
        panic!("expected using");
    };
    let UsingTarget::Functions(functions) = &using.target else {
        panic!("expected function list");
    };
    assert_eq!(functions[0].operator.as_deref(), Some("+"));
    assert_eq!(functions[1].path.to_string(), "Lib.sub");
    Ok(())
}

#[rstest]
#[case::missing_semicolon("contract A { uint x }", 0)]
#[case::unterminated_block("contract A {\n function f() public {\n", 2)]
#[case::dangling_member("contract A {\n function f() public {\n  msg.\n }\n}", 3)]
fn test_syntax_error_line(#[case] input: &str, #[case] line: usize) {
    let Err(error) = parse(input) else {
        panic!("expected syntax error for {input:?}");
    };
    assert_eq!(error.line(), Some(line));
}

#[test]
fn test_syntax_tree_serializes() -> Result<(), Box<dyn std::error::Error>> {
    let unit = parse("contract A { function f() public {} }")?;
    let json = serde_json::to_value(&unit)?;
    assert_eq!(json["location"], serde_json::json!([0, 37]));
    Ok(())
}
