// ==============================================================================
// tower-lsp LanguageServer implementation
// ==============================================================================
//
// Lifecycle and request dispatch. The engine state sits behind a
// parking_lot::Mutex that is only held for mutations and snapshots; the
// actual tool execution happens in the pipelines, outside any lock. Lint
// runs are fire-and-forget through the scheduler; formatting answers the
// RPC directly because the edits are the reply.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tower_lsp::jsonrpc;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::notification::Progress;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use relay_core::config::{LintEvent, Settings};
use relay_core::engine::LangEngine;
use relay_core::format::run_all_formatters;

use crate::scheduler::Scheduler;

pub struct RelayLanguageServer {
    client: Client,
    engine: Arc<Mutex<LangEngine>>,
    scheduler: Arc<Scheduler>,
}

/// `initializationOptions` understood at startup. These exist so a client
/// can advertise formatting before any `didChangeConfiguration` arrives;
/// capabilities cannot change later, but configuration can.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InitializeOptions {
    document_formatting: bool,
    document_range_formatting: bool,
}

impl RelayLanguageServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            engine: Arc::new(Mutex::new(LangEngine::new())),
            scheduler: Arc::new(Scheduler::new()),
        }
    }

    fn schedule_lint(&self, uri: Url, event: LintEvent) {
        self.scheduler
            .schedule_lint(self.client.clone(), Arc::clone(&self.engine), uri, event);
    }

    /// Shared path of `textDocument/formatting` and `rangeFormatting`.
    async fn format_request(
        &self,
        uri: Url,
        range: Option<Range>,
        options: FormattingOptions,
    ) -> Result<Option<Vec<TextEdit>>> {
        if !self.scheduler.try_begin_format() {
            log::debug!("format debounced for {uri}");
            return Ok(Some(Vec::new()));
        }

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(params) = progress_rx.recv().await {
                client.send_notification::<Progress>(params).await;
            }
        });

        let result = run_all_formatters(&self.engine, &uri, range, options, progress_tx).await;
        let _ = forwarder.await;

        match result {
            Ok(edits) => Ok(Some(edits)),
            Err(e) => {
                log::error!("{e}");
                let mut error = jsonrpc::Error::internal_error();
                error.message = e.to_string().into();
                Err(error)
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for RelayLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(ref info) = params.client_info {
            log::info!(
                "client: {}{}",
                info.name,
                info.version
                    .as_deref()
                    .map_or(String::new(), |v| format!(" v{v}")),
            );
        }

        if let Some(ref root_uri) = params.root_uri {
            match root_uri.to_file_path() {
                Ok(path) => {
                    let root = path.to_string_lossy().into_owned();
                    log::info!("workspace root: {root}");
                    self.engine.lock().root_path = root;
                }
                Err(()) => log::warn!("ignoring non-file workspace root {root_uri}"),
            }
        }

        let options = params
            .initialization_options
            .and_then(|value| {
                serde_json::from_value::<InitializeOptions>(value)
                    .map_err(|e| log::warn!("failed to parse initializationOptions: {e}"))
                    .ok()
            })
            .unwrap_or_default();

        // Formatting may also be enabled by configuration that arrives only
        // after initialize; the init options let clients opt in up front.
        let (has_format, has_range) = self.engine.lock().formatting_capabilities();
        let document_formatting = has_format || options.document_formatting;
        let document_range_formatting = has_range || options.document_range_formatting;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                position_encoding: Some(PositionEncodingKind::UTF16),
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        // Full sync: commands get the whole buffer anyway.
                        change: Some(TextDocumentSyncKind::FULL),
                        ..Default::default()
                    },
                )),
                document_formatting_provider: Some(OneOf::Left(document_formatting)),
                document_range_formatting_provider: Some(OneOf::Left(document_range_formatting)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "relay-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let engine = self.engine.lock();
        log::info!("ready — {} configured languages", engine.language_count());
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let result =
            self.engine
                .lock()
                .open_file(doc.uri.clone(), doc.language_id, doc.version, doc.text);
        match result {
            Ok(()) => self.schedule_lint(doc.uri, LintEvent::Open),
            Err(e) => log::warn!("didOpen: {e}"),
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: one change event carrying the whole buffer.
        let Some(change) = params.content_changes.into_iter().next() else {
            return;
        };
        let uri = params.text_document.uri;
        let result =
            self.engine
                .lock()
                .update_file(&uri, change.text, Some(params.text_document.version));
        match result {
            Ok(()) => self.schedule_lint(uri, LintEvent::Change),
            Err(e) => log::warn!("didChange: {e}"),
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(text) = params.text {
            if let Err(e) = self.engine.lock().update_file(&uri, text, None) {
                log::warn!("didSave: {e}");
                return;
            }
        }
        self.schedule_lint(uri, LintEvent::Save);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.engine.lock().close_file(&uri);
        // Clear any published diagnostics for the closed buffer.
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let settings = match serde_json::from_value::<Settings>(params.settings) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("failed to parse configuration: {e}");
                return;
            }
        };

        if let Some(ms) = settings.lint_debounce.filter(|ms| *ms > 0) {
            self.scheduler.set_lint_debounce(Duration::from_millis(ms));
        }
        if let Some(ms) = settings.format_debounce.filter(|ms| *ms > 0) {
            self.scheduler.set_format_debounce(Duration::from_millis(ms));
        }
        if let Some(languages) = settings.languages {
            let count = languages.len();
            self.engine.lock().replace_languages(languages);
            log::info!("configuration updated: {count} languages");
        }
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        self.format_request(params.text_document.uri, None, params.options)
            .await
    }

    async fn range_formatting(
        &self,
        params: DocumentRangeFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        self.format_request(params.text_document.uri, Some(params.range), params.options)
            .await
    }
}
