//! solidity-lsp: Language Server Protocol implementation for Solidity
//!
//! This binary provides LSP support for Solidity projects, enabling features like:
//! - Hover, go-to-definition and references across imports and remappings
//! - Completion and signature help, including `using ... for` extensions
//! - Code lenses to run Foundry tests

use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use solidity_lsp::Backend;

#[tokio::main]
async fn main() {
    // Logs go to stderr since stdout is for LSP
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting solidity-lsp server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
