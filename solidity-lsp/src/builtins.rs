//! Globally available symbols and the members of value types
//!
//! Builtins resolve like declarations but have no source location, which lets
//! go-to-definition tell "found, nothing to jump to" apart from "not found".

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Variable,
    Function,
    Namespace,
}

/// What evaluating a builtin (or calling it, for functions) produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinValue {
    None,
    Elementary(&'static str),
    Members(&'static [Builtin]),
    /// `this`: an instance of the enclosing contract.
    EnclosingContract,
    /// `super`: the bases of the enclosing contract.
    BaseContracts,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    pub kind: BuiltinKind,
    pub signature: &'static str,
    pub documentation: &'static str,
    pub value: BuiltinValue,
    pub parameters: &'static [&'static str],
}

impl Builtin {
    /// Members reachable with `.` on the builtin itself, such as `msg.sender`.
    #[must_use]
    pub fn members(&self) -> &'static [Builtin] {
        match self.kind {
            BuiltinKind::Function => FUNCTION_MEMBERS,
            BuiltinKind::Namespace | BuiltinKind::Variable => {
                if let BuiltinValue::Members(members) = self.value {
                    members
                } else {
                    &[]
                }
            }
        }
    }
}

const fn variable(
    name: &'static str,
    value: &'static str,
    signature: &'static str,
    documentation: &'static str,
) -> Builtin {
    Builtin {
        name,
        kind: BuiltinKind::Variable,
        signature,
        documentation,
        value: BuiltinValue::Elementary(value),
        parameters: &[],
    }
}

const fn function(
    name: &'static str,
    value: BuiltinValue,
    signature: &'static str,
    parameters: &'static [&'static str],
    documentation: &'static str,
) -> Builtin {
    Builtin {
        name,
        kind: BuiltinKind::Function,
        signature,
        documentation,
        value,
        parameters,
    }
}

const fn namespace(
    name: &'static str,
    members: &'static [Builtin],
    documentation: &'static str,
) -> Builtin {
    Builtin {
        name,
        kind: BuiltinKind::Namespace,
        signature: name,
        documentation,
        value: BuiltinValue::Members(members),
        parameters: &[],
    }
}

const BYTES: BuiltinValue = BuiltinValue::Elementary("bytes");
const BYTES32: BuiltinValue = BuiltinValue::Elementary("bytes32");
const BOOL: BuiltinValue = BuiltinValue::Elementary("bool");
const UINT256: BuiltinValue = BuiltinValue::Elementary("uint256");
const ADDRESS: BuiltinValue = BuiltinValue::Elementary("address");

pub const MSG_MEMBERS: &[Builtin] = &[
    variable("data", "bytes", "bytes calldata msg.data", "Complete calldata."),
    variable("sender", "address", "address msg.sender", "Sender of the message (current call)."),
    variable("sig", "bytes4", "bytes4 msg.sig", "First four bytes of the calldata (function identifier)."),
    variable("value", "uint256", "uint256 msg.value", "Number of wei sent with the message."),
];

pub const BLOCK_MEMBERS: &[Builtin] = &[
    variable("basefee", "uint256", "uint256 block.basefee", "Current block's base fee."),
    variable("blobbasefee", "uint256", "uint256 block.blobbasefee", "Current block's blob base fee."),
    variable("chainid", "uint256", "uint256 block.chainid", "Current chain id."),
    variable("coinbase", "address", "address payable block.coinbase", "Current block miner's address."),
    variable("difficulty", "uint256", "uint256 block.difficulty", "Current block difficulty. Deprecated alias of `block.prevrandao`."),
    variable("gaslimit", "uint256", "uint256 block.gaslimit", "Current block gas limit."),
    variable("number", "uint256", "uint256 block.number", "Current block number."),
    variable("prevrandao", "uint256", "uint256 block.prevrandao", "Random number provided by the beacon chain."),
    variable("timestamp", "uint256", "uint256 block.timestamp", "Current block timestamp as seconds since unix epoch."),
];

pub const TX_MEMBERS: &[Builtin] = &[
    variable("gasprice", "uint256", "uint256 tx.gasprice", "Gas price of the transaction."),
    variable("origin", "address", "address tx.origin", "Sender of the transaction (full call chain)."),
];

pub const ABI_MEMBERS: &[Builtin] = &[
    function("decode", BuiltinValue::None, "abi.decode(bytes memory encodedData, (...)) returns (...)", &["bytes memory encodedData", "(...)"], "ABI-decodes the given data. The types are given in parentheses as second argument."),
    function("encode", BYTES, "abi.encode(...) returns (bytes memory)", &["..."], "ABI-encodes the given arguments."),
    function("encodeCall", BYTES, "abi.encodeCall(function functionPointer, (...)) returns (bytes memory)", &["function functionPointer", "(...)"], "ABI-encodes a call to `functionPointer` with the arguments found in the tuple."),
    function("encodePacked", BYTES, "abi.encodePacked(...) returns (bytes memory)", &["..."], "Performs packed encoding of the given arguments."),
    function("encodeWithSelector", BYTES, "abi.encodeWithSelector(bytes4 selector, ...) returns (bytes memory)", &["bytes4 selector", "..."], "ABI-encodes the given arguments starting from the second and prepends the given four-byte selector."),
    function("encodeWithSignature", BYTES, "abi.encodeWithSignature(string memory signature, ...) returns (bytes memory)", &["string memory signature", "..."], "Equivalent to `abi.encodeWithSelector(bytes4(keccak256(bytes(signature))), ...)`."),
];

pub const BYTES_NAMESPACE_MEMBERS: &[Builtin] = &[function(
    "concat",
    BYTES,
    "bytes.concat(...) returns (bytes memory)",
    &["..."],
    "Concatenates a variable number of bytes and bytes1, ..., bytes32 arguments to one byte array.",
)];

pub const STRING_NAMESPACE_MEMBERS: &[Builtin] = &[function(
    "concat",
    BuiltinValue::Elementary("string"),
    "string.concat(...) returns (string memory)",
    &["..."],
    "Concatenates a variable number of string arguments to one string array.",
)];

pub const TYPE_INFO_MEMBERS: &[Builtin] = &[
    variable("creationCode", "bytes", "bytes memory type(C).creationCode", "Memory byte array that contains the creation bytecode of the contract."),
    variable("interfaceId", "bytes4", "bytes4 type(I).interfaceId", "The EIP-165 interface identifier of the given interface."),
    variable("max", "uint256", "type(T).max", "The largest value representable by the integer type `T`."),
    variable("min", "uint256", "type(T).min", "The smallest value representable by the integer type `T`."),
    variable("name", "string", "string type(C).name", "The name of the contract."),
    variable("runtimeCode", "bytes", "bytes memory type(C).runtimeCode", "Memory byte array that contains the runtime bytecode of the contract."),
];

pub const ADDRESS_MEMBERS: &[Builtin] = &[
    variable("balance", "uint256", "uint256 <address>.balance", "Balance of the address in wei."),
    function("call", BuiltinValue::None, "<address>.call(bytes memory) returns (bool, bytes memory)", &["bytes memory"], "Issue a low-level `CALL` with the given payload."),
    variable("code", "bytes", "bytes memory <address>.code", "Code at the address (can be empty)."),
    variable("codehash", "bytes32", "bytes32 <address>.codehash", "The codehash of the address."),
    function("delegatecall", BuiltinValue::None, "<address>.delegatecall(bytes memory) returns (bool, bytes memory)", &["bytes memory"], "Issue a low-level `DELEGATECALL` with the given payload."),
    function("send", BOOL, "<address payable>.send(uint256 amount) returns (bool)", &["uint256 amount"], "Send the given amount of wei to the address, returns `false` on failure."),
    function("staticcall", BuiltinValue::None, "<address>.staticcall(bytes memory) returns (bool, bytes memory)", &["bytes memory"], "Issue a low-level `STATICCALL` with the given payload."),
    function("transfer", BuiltinValue::None, "<address payable>.transfer(uint256 amount)", &["uint256 amount"], "Send the given amount of wei to the address, reverts on failure."),
];

pub const ARRAY_MEMBERS: &[Builtin] = &[
    variable("length", "uint256", "uint256 <array>.length", "Number of elements in the array."),
    function("pop", BuiltinValue::None, "<array>.pop()", &[], "Remove the last element of a dynamic storage array."),
    function("push", BuiltinValue::None, "<array>.push(element)", &["element"], "Append an element at the end of a dynamic storage array."),
];

pub const FIXED_BYTES_MEMBERS: &[Builtin] = &[variable(
    "length",
    "uint8",
    "uint8 <bytesN>.length",
    "Fixed length of the byte array.",
)];

pub const FUNCTION_MEMBERS: &[Builtin] = &[
    variable("address", "address", "address <function>.address", "Address of the contract of an external function."),
    variable("selector", "bytes4", "bytes4 <function>.selector", "The ABI function selector."),
];

pub const CUSTOM_TYPE_MEMBERS: &[Builtin] = &[
    function("unwrap", BuiltinValue::None, "C.unwrap(C value) returns (Underlying)", &["C value"], "Convert a user-defined value type to its underlying type."),
    function("wrap", BuiltinValue::None, "C.wrap(Underlying value) returns (C)", &["Underlying value"], "Convert a value of the underlying type to the user-defined value type."),
];

pub const GLOBALS: &[Builtin] = &[
    namespace("abi", ABI_MEMBERS, "ABI encoding and decoding functions."),
    function("addmod", UINT256, "addmod(uint256 x, uint256 y, uint256 k) returns (uint256)", &["uint256 x", "uint256 y", "uint256 k"], "Compute `(x + y) % k` with arbitrary precision."),
    function("assert", BuiltinValue::None, "assert(bool condition)", &["bool condition"], "Causes a Panic error and thus state change reversion if the condition is not met."),
    function("blobhash", BYTES32, "blobhash(uint256 index) returns (bytes32)", &["uint256 index"], "Versioned hash of the `index`-th blob associated with the current transaction."),
    namespace("block", BLOCK_MEMBERS, "Properties of the current block."),
    function("blockhash", BYTES32, "blockhash(uint256 blockNumber) returns (bytes32)", &["uint256 blockNumber"], "Hash of the given block, only works for the 256 most recent blocks."),
    namespace("bytes", BYTES_NAMESPACE_MEMBERS, "Dynamically-sized byte array."),
    function("ecrecover", ADDRESS, "ecrecover(bytes32 hash, uint8 v, bytes32 r, bytes32 s) returns (address)", &["bytes32 hash", "uint8 v", "bytes32 r", "bytes32 s"], "Recover the address associated with the public key from an elliptic curve signature."),
    function("gasleft", UINT256, "gasleft() returns (uint256)", &[], "Remaining gas."),
    function("keccak256", BYTES32, "keccak256(bytes memory) returns (bytes32)", &["bytes memory"], "Compute the Keccak-256 hash of the input."),
    namespace("msg", MSG_MEMBERS, "Properties of the current message call."),
    function("mulmod", UINT256, "mulmod(uint256 x, uint256 y, uint256 k) returns (uint256)", &["uint256 x", "uint256 y", "uint256 k"], "Compute `(x * y) % k` with arbitrary precision."),
    function("require", BuiltinValue::None, "require(bool condition, string memory message)", &["bool condition", "string memory message"], "Reverts if the condition is not met. The message or custom error is returned to the caller."),
    function("revert", BuiltinValue::None, "revert(string memory reason)", &["string memory reason"], "Abort execution and revert state changes, providing an explanatory string."),
    function("ripemd160", BuiltinValue::Elementary("bytes20"), "ripemd160(bytes memory) returns (bytes20)", &["bytes memory"], "Compute the RIPEMD-160 hash of the input."),
    function("selfdestruct", BuiltinValue::None, "selfdestruct(address payable recipient)", &["address payable recipient"], "Send the balance of the contract to the recipient. Deprecated."),
    function("sha256", BYTES32, "sha256(bytes memory) returns (bytes32)", &["bytes memory"], "Compute the SHA-256 hash of the input."),
    namespace("string", STRING_NAMESPACE_MEMBERS, "Dynamically-sized UTF-8 string."),
    Builtin {
        name: "super",
        kind: BuiltinKind::Variable,
        signature: "super",
        documentation: "The contract one level higher in the inheritance hierarchy.",
        value: BuiltinValue::BaseContracts,
        parameters: &[],
    },
    Builtin {
        name: "this",
        kind: BuiltinKind::Variable,
        signature: "this",
        documentation: "The current contract, explicitly convertible to `address`.",
        value: BuiltinValue::EnclosingContract,
        parameters: &[],
    },
    namespace("tx", TX_MEMBERS, "Properties of the current transaction."),
    function("type", BuiltinValue::Members(TYPE_INFO_MEMBERS), "type(T)", &["T"], "Information about the type `T`: contract name and code, interface id, or integer bounds."),
];

/// A global symbol by name.
#[must_use]
pub fn global(name: &str) -> Option<&'static Builtin> {
    find(GLOBALS, name)
}

/// A builtin in `members` by name.
#[must_use]
pub fn find(members: &'static [Builtin], name: &str) -> Option<&'static Builtin> {
    members.iter().find(|b| b.name == name)
}

/// Members of a value of the elementary type `type_string`.
#[must_use]
pub fn elementary_members(type_string: &str) -> &'static [Builtin] {
    match type_string {
        "address" | "address payable" => ADDRESS_MEMBERS,
        "bytes" => ARRAY_MEMBERS,
        other if other.starts_with("bytes") => FIXED_BYTES_MEMBERS,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tables_are_sorted_by_name() {
        for table in [
            GLOBALS,
            MSG_MEMBERS,
            BLOCK_MEMBERS,
            ABI_MEMBERS,
            ADDRESS_MEMBERS,
            TYPE_INFO_MEMBERS,
        ] {
            let names: Vec<_> = table.iter().map(|b| b.name).collect();
            let mut sorted = names.clone();
            sorted.sort_unstable();
            assert_eq!(names, sorted);
        }
    }

    #[test]
    fn test_globals() {
        assert_eq!(global("msg").map(Builtin::members).map(<[Builtin]>::len), Some(4));
        assert_eq!(
            global("keccak256").map(|b| b.value),
            Some(BuiltinValue::Elementary("bytes32"))
        );
        assert!(global("owner").is_none());
    }

    #[test]
    fn test_elementary_members() {
        assert!(find(elementary_members("address payable"), "transfer").is_some());
        assert!(find(elementary_members("bytes"), "push").is_some());
        assert!(find(elementary_members("bytes32"), "length").is_some());
        assert!(elementary_members("uint256").is_empty());
    }
}
