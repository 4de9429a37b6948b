//! solidity-lsp library
//!
//! The language intelligence core for Solidity: a node graph per document, resolvers
//! over it, a cache that keeps import edges current, and the LSP backend serving
//! queries from it.

pub mod backend;
pub mod builtins;
pub mod capabilities;
pub mod config;
pub mod convert;
mod error;
pub mod forge;
pub mod model;
pub mod project;
pub mod resolve;
pub mod state;
pub mod text;

pub use backend::Backend;
pub use error::Error;
