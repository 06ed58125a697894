//! The tower-lsp server.
//!
//! Handlers never touch shared state directly: each one captures what it
//! needs, wraps the real work into a closure, and hands it to the reactor.
//! Notifications are fire-and-forget; requests get their reply back over
//! a oneshot channel. Diagnostics and hover updates therefore reach the
//! client in exactly the order the client's events arrived.

use crate::completion::{CompletionSources, completion_prefix, completions};
use crate::diagnostics::to_lsp_diagnostics;
use crate::hover::HoverIndex;
use crate::parse::Pipeline;
use crate::reactor::Reactor;
use crate::vfs::{Vfs, line_at};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

/// Diagnostics to publish after a document event.
#[derive(Debug)]
pub struct DocumentUpdate {
    pub version: i32,
    pub diagnostics: Vec<Diagnostic>,
}

/// State shared by all handlers and mutated only from the reactor.
pub struct ServerState {
    pub vfs: RwLock<Vfs>,
    pub hovers: HoverIndex,
    pub pipeline: Pipeline,
    trace_parses: AtomicBool,
}

impl ServerState {
    pub fn new(pipeline: Pipeline) -> ServerState {
        ServerState {
            vfs: RwLock::new(Vfs::new()),
            hovers: HoverIndex::new(),
            pipeline,
            trace_parses: AtomicBool::new(false),
        }
    }

    fn set_trace_parses(&self, enabled: bool) {
        self.trace_parses.store(enabled, Ordering::Relaxed);
    }

    /// Parse+infer one version of a document. On success the hover
    /// entries for `(uri, version)` are replaced; on failure the previous
    /// hover index stays in place so hover keeps answering against the
    /// last good version.
    fn analyze(&self, uri: &Url, version: i32, text: &str) -> Vec<Diagnostic> {
        let result = self.pipeline.run(text);
        if self.trace_parses.load(Ordering::Relaxed) {
            match &result {
                Ok(out) => info!(
                    "parsed {} v{}: ok, {} hover ranges",
                    uri,
                    version,
                    out.hovers.len()
                ),
                Err(diags) => info!("parsed {} v{}: {} diagnostics", uri, version, diags.len()),
            }
        }
        match result {
            Ok(output) => {
                self.hovers.replace(uri.clone(), version, output.hovers);
                Vec::new()
            }
            Err(diags) => to_lsp_diagnostics(&diags),
        }
    }

    pub fn open_document(&self, uri: Url, version: i32, text: String) -> DocumentUpdate {
        if let Ok(mut vfs) = self.vfs.write() {
            vfs.open(uri.clone(), version, text.clone());
        }
        DocumentUpdate {
            version,
            diagnostics: self.analyze(&uri, version, &text),
        }
    }

    pub fn change_document(
        &self,
        uri: &Url,
        version: i32,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Option<DocumentUpdate> {
        let doc = match self.vfs.write() {
            Ok(mut vfs) => vfs.apply_changes(uri, version, changes)?,
            Err(_) => return None,
        };
        Some(DocumentUpdate {
            version: doc.version,
            diagnostics: self.analyze(uri, doc.version, &doc.text),
        })
    }

    pub fn close_document(&self, uri: &Url) {
        if let Ok(mut vfs) = self.vfs.write() {
            vfs.close(uri);
        }
        // Hover entries for closed versions are intentionally retained
    }

    pub fn hover_at(&self, uri: &Url, position: Position) -> Option<Hover> {
        let version = match self.vfs.read() {
            Ok(vfs) => vfs.get(uri)?.version,
            Err(_) => return None,
        };
        let entry = self.hovers.query(uri, version, position)?;
        Some(Hover {
            contents: HoverContents::Markup(entry.contents),
            range: Some(entry.range),
        })
    }

    pub fn completions_at(&self, uri: &Url, position: Position) -> Vec<CompletionItem> {
        let prefix = match self.vfs.read() {
            Ok(vfs) => match vfs.get(uri) {
                Some(doc) => line_at(&doc.text, position.line)
                    .map(|line| completion_prefix(line, position.character))
                    .unwrap_or_default(),
                None => String::new(),
            },
            Err(_) => String::new(),
        };
        let extern_idents: Vec<String> =
            (self.pipeline.get_idents)().into_iter().flatten().collect();
        completions(
            &prefix,
            &CompletionSources {
                prelude: &self.pipeline.prelude,
                extern_idents,
            },
        )
    }
}

pub struct MerlLanguageServer {
    client: Client,
    reactor: Reactor,
    state: Arc<ServerState>,
}

impl MerlLanguageServer {
    /// Must be called within a tokio runtime (the reactor consumer is
    /// spawned here).
    pub fn new(client: Client, pipeline: Pipeline) -> MerlLanguageServer {
        MerlLanguageServer {
            client,
            reactor: Reactor::start(),
            state: Arc::new(ServerState::new(pipeline)),
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for MerlLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("Merl LSP server initializing");

        let trace_parses = params
            .initialization_options
            .as_ref()
            .and_then(|opts| opts.get("trace_parses"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if trace_parses {
            info!("per-parse tracing enabled");
        }
        self.state.set_trace_parses(trace_parses);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        will_save: None,
                        will_save_wait_until: None,
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(false),
                        })),
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "merl-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Merl LSP server initialized");
        self.client
            .log_message(MessageType::INFO, "Merl language server ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Merl LSP server shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let state = self.state.clone();
        let client = self.client.clone();
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        let text = params.text_document.text;

        self.reactor.enqueue("didOpen", async move {
            debug!("document opened: {}", uri);
            let update = state.open_document(uri.clone(), version, text);
            client
                .publish_diagnostics(uri, update.diagnostics, Some(update.version))
                .await;
        });
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let state = self.state.clone();
        let client = self.client.clone();
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        let changes = params.content_changes;

        self.reactor.enqueue("didChange", async move {
            match state.change_document(&uri, version, changes) {
                Some(update) => {
                    client
                        .publish_diagnostics(uri, update.diagnostics, Some(update.version))
                        .await;
                }
                None => warn!("change notification for unopened document {}", uri),
            }
        });
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let state = self.state.clone();
        let client = self.client.clone();
        let uri = params.text_document.uri;

        self.reactor.enqueue("didClose", async move {
            debug!("document closed: {}", uri);
            state.close_document(&uri);
            client.publish_diagnostics(uri, Vec::new(), None).await;
        });
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        // Save carries no text (include_text is off); nothing to re-check
        debug!("document saved: {}", params.text_document.uri);
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let state = self.state.clone();
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let reply = self
            .reactor
            .request("hover", async move { state.hover_at(&uri, position) })
            .await;
        Ok(reply.flatten())
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let state = self.state.clone();
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let reply = self
            .reactor
            .request("completion", async move {
                state.completions_at(&uri, position)
            })
            .await;
        Ok(reply.map(CompletionResponse::Array))
    }
}
