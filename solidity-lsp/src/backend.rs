//! LSP backend implementation
//!
//! Contains the main `Backend` struct that implements the `LanguageServer` trait. Every
//! query runs behind [`guarded`], so a panic inside a provider is logged and answered
//! with "no result" instead of taking the server down.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_lsp::jsonrpc::{self, Result};
use tower_lsp::lsp_types::request::{GotoTypeDefinitionParams, GotoTypeDefinitionResponse};
use tower_lsp::lsp_types::{
    CodeLens, CodeLensOptions, CodeLensParams, CompletionOptions, CompletionParams,
    CompletionResponse, DidChangeConfigurationParams, DidChangeTextDocumentParams,
    DidChangeWatchedFilesParams, DidChangeWatchedFilesRegistrationOptions,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DocumentSymbolParams,
    DocumentSymbolResponse, ExecuteCommandOptions, ExecuteCommandParams, FileChangeType,
    FileSystemWatcher, GlobPattern, GotoDefinitionParams, GotoDefinitionResponse, Hover,
    HoverParams, HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams,
    Location, MessageType, OneOf, Position, ReferenceParams, Registration,
    SemanticTokensParams, SemanticTokensResult, SemanticTokensServerCapabilities,
    ServerCapabilities, ServerInfo, SignatureHelp, SignatureHelpOptions, SignatureHelpParams,
    TextDocumentSyncCapability, TextDocumentSyncKind, TypeDefinitionProviderCapability, Url,
};
use tower_lsp::{Client, LanguageServer};

use crate::capabilities::code_lens::{RUN_CONTRACT_TESTS, RUN_TEST};
use crate::capabilities::{
    code_lens, completion, definition, diagnostics, hover, references, semantic_tokens,
    signature_help, symbols,
};
use crate::config::{DEFAULT_MAX_RECOVERY_ATTEMPTS, ServerConfig};
use crate::convert::url_to_path;
use crate::forge::{ForgeRunner, TestOutcome, TestTarget};
use crate::model::ParsedDocument;
use crate::project::Project;
use crate::state::{CodeWalker, Snapshot};

pub const PIN_DOCUMENT: &str = "solidity.pinDocument";
pub const UNPIN_DOCUMENT: &str = "solidity.unpinDocument";
pub const SYNTAX_TREE: &str = "solidity.syntaxTree";

/// Files whose change alters the project layout rather than a single document.
const PROJECT_FILES: &[&str] = &["foundry.toml", "remappings.txt"];

/// LSP backend for Solidity documents
pub struct Backend {
    /// Client handle for sending messages back to the editor
    client: Client,
    walker: Arc<CodeWalker>,
    config: RwLock<ServerConfig>,
    /// Latest text of every document open in the editor
    open_documents: DashMap<Url, String>,
    forge: Arc<ForgeRunner>,
}

impl Backend {
    /// Create a new backend instance
    #[must_use]
    pub fn new(client: Client) -> Self {
        let config = ServerConfig::default();
        Self {
            client,
            walker: Arc::new(CodeWalker::new(
                Project::load(Path::new("."), &config),
                DEFAULT_MAX_RECOVERY_ATTEMPTS,
            )),
            config: RwLock::new(config),
            open_documents: DashMap::new(),
            forge: Arc::new(ForgeRunner::new()),
        }
    }

    fn config(&self) -> ServerConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `query` against the cached document for `uri`.
    ///
    /// An open document is brought up to date with its editor text first, recovering
    /// from syntax errors around `position`. Other documents are loaded from disk.
    fn query<T>(
        &self,
        operation: &str,
        uri: &Url,
        position: Option<Position>,
        query: impl FnOnce(&Snapshot, &Arc<ParsedDocument>) -> Option<T>,
    ) -> Option<T> {
        let path = match url_to_path(uri) {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!("{operation}: {e}");
                return None;
            }
        };
        let text = self
            .open_documents
            .get(uri)
            .map(|entry| entry.value().clone());
        guarded(operation, || {
            let cached = match text {
                Some(text) => Some(self.walker.get_selected_document(
                    &path,
                    &text,
                    position.map(|position| position.line as usize),
                )),
                None => self.walker.get_or_load(&path),
            }?;
            let snapshot = self.walker.snapshot();
            query(&snapshot, &cached.parsed)
        })
    }

    /// Parse the editor text of `uri` and publish its diagnostics
    async fn on_change(&self, uri: Url, text: String, version: Option<i32>) {
        let Ok(path) = url_to_path(&uri) else {
            return;
        };
        let cached = guarded("parse", || {
            Some(self.walker.get_selected_document(&path, &text, None))
        });
        self.open_documents.insert(uri.clone(), text);
        let diagnostics = match cached {
            Some(cached) if self.config().syntax_diagnostics => {
                diagnostics::syntax_diagnostics(&cached.parsed)
            }
            Some(_) | None => Vec::new(),
        };
        self.client
            .publish_diagnostics(uri, diagnostics, version)
            .await;
    }

    /// Apply a new project layout and refresh every document from disk
    async fn reload_project(&self, config: &ServerConfig) {
        let root = self.walker.project().root.clone();
        let project = Project::load(&root, config);
        let max_recovery_attempts = config.max_recovery_attempts;
        let walker = Arc::clone(&self.walker);
        let refreshed = tokio::task::spawn_blocking(move || {
            walker.set_project(project, max_recovery_attempts);
            walker.initialise_changed_documents();
        })
        .await;
        if let Err(e) = refreshed {
            tracing::error!("project reload failed: {e}");
        }
    }

    async fn refresh_documents(&self) {
        let walker = Arc::clone(&self.walker);
        if let Err(e) =
            tokio::task::spawn_blocking(move || walker.initialise_changed_documents()).await
        {
            tracing::error!("document refresh failed: {e}");
        }
    }

    async fn register_file_watchers(&self) {
        let watchers = ["**/*.sol", "**/foundry.toml", "**/remappings.txt"]
            .into_iter()
            .map(|pattern| FileSystemWatcher {
                glob_pattern: GlobPattern::String(pattern.to_string()),
                kind: None,
            })
            .collect();
        let options = DidChangeWatchedFilesRegistrationOptions { watchers };
        let registration = Registration {
            id: "solidity-watched-files".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: serde_json::to_value(options).ok(),
        };
        if let Err(e) = self.client.register_capability(vec![registration]).await {
            tracing::warn!("cannot watch files: {e}");
        }
    }

    /// Start a forge run in the background and report its outcome to the editor
    fn run_tests(&self, target: TestTarget) {
        let client = self.client.clone();
        let forge = Arc::clone(&self.forge);
        let forge_path = self.config().forge_path;
        let root = self.walker.project().root.clone();
        tokio::spawn(async move {
            let key = target.key();
            match forge.run(&forge_path, &root, &target).await {
                Ok(TestOutcome::Passed) => {
                    client
                        .show_message(MessageType::INFO, format!("{key}: passed"))
                        .await;
                }
                Ok(TestOutcome::Failed) => {
                    client
                        .show_message(MessageType::ERROR, format!("{key}: failed"))
                        .await;
                }
                Ok(TestOutcome::Cancelled) => tracing::debug!(%key, "superseded by a newer run"),
                Err(e) => {
                    client
                        .show_message(MessageType::ERROR, format!("{key}: {e}"))
                        .await;
                }
            }
        });
    }

    fn document_text(&self, uri: &Url, path: &Path) -> Result<String> {
        if let Some(text) = self.open_documents.get(uri) {
            return Ok(text.value().clone());
        }
        std::fs::read_to_string(path)
            .map_err(|e| jsonrpc::Error::invalid_params(format!("{}: {e}", path.display())))
    }
}

/// Run `query`, turning a panic into `None`.
fn guarded<T>(operation: &str, query: impl FnOnce() -> Option<T>) -> Option<T> {
    match std::panic::catch_unwind(AssertUnwindSafe(query)) {
        Ok(result) => result,
        Err(panic) => {
            let message = if let Some(s) = panic.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            tracing::error!(operation, "query panicked: {message}");
            None
        }
    }
}

fn command_argument<T: DeserializeOwned>(arguments: Vec<Value>) -> Result<T> {
    let value = arguments
        .into_iter()
        .next()
        .ok_or_else(|| jsonrpc::Error::invalid_params("missing command argument"))?;
    serde_json::from_value(value).map_err(|e| jsonrpc::Error::invalid_params(e.to_string()))
}

fn command_path(uri: &Url) -> Result<PathBuf> {
    url_to_path(uri).map_err(|e| jsonrpc::Error::invalid_params(e.to_string()))
}

fn is_project_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| PROJECT_FILES.contains(&name))
}

fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    let folder = params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri);
    #[allow(deprecated)] // clients that predate workspace folders only send the root URI
    let uri = folder.or(params.root_uri.as_ref())?;
    url_to_path(uri).ok()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("Initializing solidity-lsp");

        let config = match params.initialization_options.clone() {
            Some(options) => ServerConfig::from_value(options).unwrap_or_else(|e| {
                tracing::warn!("ignoring initialization options: {e}");
                ServerConfig::default()
            }),
            None => ServerConfig::default(),
        };
        if let Some(root) = workspace_root(&params) {
            tracing::info!(root = %root.display(), "workspace root");
            self.walker
                .set_project(Project::load(&root, &config), config.max_recovery_attempts);
        }
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // Full sync: the cache compares whole texts anyway
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                type_definition_provider: Some(TypeDefinitionProviderCapability::Simple(true)),
                references_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string(), "\"".to_string(), "/".to_string()]),
                    ..Default::default()
                }),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    ..Default::default()
                }),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        semantic_tokens::create_options(),
                    ),
                ),
                document_symbol_provider: Some(OneOf::Left(true)),
                code_lens_provider: Some(CodeLensOptions {
                    resolve_provider: Some(false),
                }),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: [RUN_TEST, RUN_CONTRACT_TESTS, PIN_DOCUMENT, UNPIN_DOCUMENT, SYNTAX_TREE]
                        .into_iter()
                        .map(ToString::to_string)
                        .collect(),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "solidity-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.register_file_watchers().await;
        let walker = Arc::clone(&self.walker);
        match tokio::task::spawn_blocking(move || walker.init_documents()).await {
            Ok(()) => tracing::info!(documents = self.walker.len(), "solidity-lsp initialized"),
            Err(e) => tracing::error!("indexing failed: {e}"),
        }
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down solidity-lsp");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        tracing::debug!("Document opened: {}", document.uri);
        self.on_change(document.uri, document.text, Some(document.version))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        // With FULL sync, the last change holds the complete new text
        if let Some(change) = params.content_changes.into_iter().last() {
            tracing::debug!("Document changed: {uri}");
            self.on_change(uri, change.text, Some(params.text_document.version))
                .await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document closed: {uri}");

        self.open_documents.remove(&uri);
        if let Ok(path) = url_to_path(&uri) {
            // Unsaved edits are dropped with the editor buffer
            guarded("reload", || self.walker.reload_from_disk(&path));
        }
        // Clear diagnostics for closed file
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let config = match ServerConfig::from_value(params.settings) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring configuration: {e}");
                return;
            }
        };
        let previous = std::mem::replace(
            &mut *self.config.write().unwrap_or_else(PoisonError::into_inner),
            config.clone(),
        );
        if previous.affects_project(&config) {
            tracing::info!("configuration changed, reloading project");
            self.reload_project(&config).await;
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let mut project_changed = false;
        for change in params.changes {
            let Ok(path) = url_to_path(&change.uri) else {
                continue;
            };
            if is_project_file(&path) {
                project_changed = true;
            } else if change.typ == FileChangeType::DELETED
                && !self.open_documents.contains_key(&change.uri)
            {
                self.walker.remove_document(&path);
            }
        }
        if project_changed {
            self.reload_project(&self.config()).await;
        } else {
            self.refresh_documents().await;
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        Ok(self.query("hover", &uri, Some(position), |snapshot, document| {
            hover::compute_hover(snapshot, document, position)
        }))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        Ok(self.query("definition", &uri, Some(position), |snapshot, document| {
            definition::find_definition(snapshot, document, position)
                .and_then(|found| definition::to_response(&found))
        }))
    }

    async fn goto_type_definition(
        &self,
        params: GotoTypeDefinitionParams,
    ) -> Result<Option<GotoTypeDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        Ok(self.query("type definition", &uri, Some(position), |snapshot, document| {
            definition::find_type_definition(snapshot, document, position)
                .and_then(|found| definition::to_response(&found))
        }))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let include_declaration = params.context.include_declaration;
        Ok(self.query("references", &uri, Some(position), |snapshot, document| {
            references::find_references(snapshot, document, position, include_declaration)
        }))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let project = self.walker.project();
        Ok(self.query("completion", &uri, Some(position), |snapshot, document| {
            let items = completion::compute_completion(snapshot, &project, document, position);
            (!items.is_empty()).then_some(CompletionResponse::Array(items))
        }))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        Ok(self.query("signature help", &uri, Some(position), |snapshot, document| {
            signature_help::compute_signature_help(snapshot, document, position)
        }))
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let uri = params.text_document.uri;
        Ok(self.query("semantic tokens", &uri, None, |snapshot, document| {
            Some(SemanticTokensResult::Tokens(
                semantic_tokens::compute_semantic_tokens(snapshot, document),
            ))
        }))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        Ok(self.query("document symbols", &uri, None, |_, document| {
            Some(DocumentSymbolResponse::Nested(symbols::document_symbols(
                document,
            )))
        }))
    }

    async fn code_lens(&self, params: CodeLensParams) -> Result<Option<Vec<CodeLens>>> {
        let uri = params.text_document.uri;
        Ok(self.query("code lens", &uri, None, |_, document| {
            Some(code_lens::compute_code_lenses(document))
        }))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        tracing::debug!(command = %params.command, "executing command");
        match params.command.as_str() {
            RUN_TEST | RUN_CONTRACT_TESTS => {
                let target: TestTarget = command_argument(params.arguments)?;
                self.run_tests(target);
                Ok(None)
            }
            PIN_DOCUMENT => {
                let uri: Url = command_argument(params.arguments)?;
                let path = command_path(&uri)?;
                let pinned = self.walker.get_or_load(&path).is_some() && self.walker.pin(&path);
                Ok(Some(Value::Bool(pinned)))
            }
            UNPIN_DOCUMENT => {
                let uri: Url = command_argument(params.arguments)?;
                let path = command_path(&uri)?;
                Ok(Some(Value::Bool(self.walker.unpin(&path))))
            }
            SYNTAX_TREE => {
                let uri: Url = command_argument(params.arguments)?;
                let path = command_path(&uri)?;
                let text = self.document_text(&uri, &path)?;
                let unit = solidity_parser::parse(&text)
                    .map_err(|e| jsonrpc::Error::invalid_params(e.to_string()))?;
                serde_json::to_value(unit)
                    .map(Some)
                    .map_err(|e| jsonrpc::Error::invalid_params(e.to_string()))
            }
            other => Err(jsonrpc::Error::invalid_params(format!(
                "unknown command {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_turns_panics_into_none() {
        #[allow(clippy::panic)]
        let result: Option<u32> = guarded("test", || panic!("boom"));
        assert_eq!(result, None);
        assert_eq!(guarded("test", || Some(3)), Some(3));
    }

    #[test]
    fn test_project_files() {
        assert!(is_project_file(Path::new("/p/foundry.toml")));
        assert!(is_project_file(Path::new("/p/remappings.txt")));
        assert!(!is_project_file(Path::new("/p/src/A.sol")));
    }

    #[test]
    fn test_command_argument_errors() {
        let missing: Result<TestTarget> = command_argument(Vec::new());
        assert!(missing.is_err());
        let wrong: Result<Url> = command_argument(vec![serde_json::json!(3)]);
        assert!(wrong.is_err());
        let uri: Result<Url> = command_argument(vec![serde_json::json!("file:///p/src/A.sol")]);
        assert!(uri.is_ok());
    }
}
