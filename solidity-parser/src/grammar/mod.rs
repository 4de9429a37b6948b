mod solidity;

pub(crate) use solidity::solidity_parser;
