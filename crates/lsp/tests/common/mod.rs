// ==============================================================================
// E2E LSP test harness
// ==============================================================================
//
// Exercises the full tower-lsp `Service` pipeline in-process: real
// `LanguageServer` impl, real scheduler with debounce/cancellation, real
// subprocess execution, without any transport framing.
//
// `LspService::new()` returns `(LspService<S>, ClientSocket)`:
// - `LspService` implements `tower::Service<Request>`; we call it with
//   JSON-RPC requests directly.
// - `ClientSocket` is a `Stream` of server→client notifications
//   (`publishDiagnostics`, `$/progress`, `window/logMessage`), drained by a
//   background task so the server never blocks on its outbound channel.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::{Service, ServiceExt};
use tower_lsp::jsonrpc::{Request, Response};
use tower_lsp::lsp_types::*;
use tower_lsp::LspService;

use relay_lsp::server::RelayLanguageServer;

/// Lint runs go through timers and child processes; 5 seconds is generous
/// margin for CI.
pub const TIMEOUT: Duration = Duration::from_secs(5);

#[allow(dead_code)]
pub struct LspTestHarness {
    service: LspService<RelayLanguageServer>,
    /// Buffered server→client notifications.
    notif_rx: mpsc::UnboundedReceiver<Request>,
    next_id: AtomicI64,
    pub workspace: tempfile::TempDir,
    pub init_result: InitializeResult,
}

#[allow(dead_code)]
impl LspTestHarness {
    pub async fn new() -> Self {
        Self::with_init_options(None).await
    }

    pub async fn with_init_options(init_options: Option<Value>) -> Self {
        let workspace = tempfile::tempdir().unwrap();
        let root_uri = Url::from_file_path(workspace.path()).unwrap();

        let (service, client_socket) = LspService::new(RelayLanguageServer::new);

        let (notif_tx, notif_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut stream = client_socket;
            while let Some(msg) = stream.next().await {
                let _ = notif_tx.send(msg);
            }
        });

        let mut harness = LspTestHarness {
            service,
            notif_rx,
            next_id: AtomicI64::new(1),
            workspace,
            init_result: InitializeResult::default(),
        };

        let mut params = json!({
            "capabilities": {},
            "rootUri": root_uri.as_str(),
        });
        if let Some(options) = init_options {
            params["initializationOptions"] = options;
        }
        let init = Request::build("initialize")
            .params(params)
            .id(harness.next_id())
            .finish();
        let response = harness.send_request(init).await.expect("initialize reply");
        let (_id, result) = response.into_parts();
        harness.init_result =
            serde_json::from_value(result.expect("initialize must succeed")).unwrap();

        let initialized = Request::build("initialized").params(json!({})).finish();
        harness.send_notification(initialized).await;

        harness
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn send_request(&mut self, req: Request) -> Option<Response> {
        self.service
            .ready()
            .await
            .expect("service not ready")
            .call(req)
            .await
            .expect("service call failed")
    }

    async fn send_notification(&mut self, notif: Request) {
        let _ = self.service.ready().await.unwrap().call(notif).await;
    }

    /// Raw request escape hatch, e.g. for methods the server does not handle.
    pub async fn request(&mut self, method: &'static str, params: Value) -> Response {
        let req = Request::build(method)
            .params(params)
            .id(self.next_id())
            .finish();
        self.send_request(req).await.unwrap()
    }

    // ==========================================================================
    // Configuration and document lifecycle
    // ==========================================================================

    pub async fn configure(&mut self, settings: Value) {
        let notif = Request::build("workspace/didChangeConfiguration")
            .params(json!({ "settings": settings }))
            .finish();
        self.send_notification(notif).await;
    }

    pub fn uri(&self, name: &str) -> Url {
        Url::from_file_path(self.workspace.path().join(name)).unwrap()
    }

    /// Write the file into the workspace (root-marker walks are real fs
    /// walks) and open it.
    pub async fn open(&mut self, name: &str, language_id: &str, text: &str) {
        std::fs::write(self.workspace.path().join(name), text).unwrap();
        let notif = Request::build("textDocument/didOpen")
            .params(json!({
                "textDocument": {
                    "uri": self.uri(name).as_str(),
                    "languageId": language_id,
                    "version": 1,
                    "text": text,
                }
            }))
            .finish();
        self.send_notification(notif).await;
    }

    pub async fn change(&mut self, name: &str, version: i32, text: &str) {
        let notif = Request::build("textDocument/didChange")
            .params(json!({
                "textDocument": { "uri": self.uri(name).as_str(), "version": version },
                "contentChanges": [{ "text": text }],
            }))
            .finish();
        self.send_notification(notif).await;
    }

    pub async fn save(&mut self, name: &str) {
        let notif = Request::build("textDocument/didSave")
            .params(json!({
                "textDocument": { "uri": self.uri(name).as_str() },
            }))
            .finish();
        self.send_notification(notif).await;
    }

    pub async fn close(&mut self, name: &str) {
        let notif = Request::build("textDocument/didClose")
            .params(json!({
                "textDocument": { "uri": self.uri(name).as_str() },
            }))
            .finish();
        self.send_notification(notif).await;
    }

    // ==========================================================================
    // Formatting
    // ==========================================================================

    /// `textDocument/formatting`; an error reply comes back as its message.
    pub async fn format(&mut self, name: &str) -> Result<Vec<TextEdit>, String> {
        let req = Request::build("textDocument/formatting")
            .params(json!({
                "textDocument": { "uri": self.uri(name).as_str() },
                "options": { "tabSize": 4, "insertSpaces": true },
            }))
            .id(self.next_id())
            .finish();

        let response = self.send_request(req).await.unwrap();
        let (_id, result) = response.into_parts();
        match result {
            Ok(value) => Ok(serde_json::from_value::<Option<Vec<TextEdit>>>(value)
                .unwrap()
                .unwrap_or_default()),
            Err(e) => Err(e.message.to_string()),
        }
    }

    // ==========================================================================
    // Diagnostics
    // ==========================================================================

    /// Wait for the next `publishDiagnostics` for the file, skipping other
    /// notifications. None on timeout.
    pub async fn wait_for_diagnostics(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> Option<PublishDiagnosticsParams> {
        let expected_uri = self.uri(name);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match tokio::time::timeout_at(deadline, self.notif_rx.recv()).await {
                Ok(Some(msg)) => {
                    if let Some(params) = as_diagnostics(&msg) {
                        if params.uri == expected_uri {
                            return Some(params);
                        }
                    }
                }
                Ok(None) => return None,
                Err(_) => return None,
            }
        }
    }

    /// Collect every `publishDiagnostics` for the file over a fixed window.
    /// Used to count runs (each run is one reset publish plus one publish
    /// per config).
    pub async fn collect_diagnostics(
        &mut self,
        name: &str,
        window: Duration,
    ) -> Vec<PublishDiagnosticsParams> {
        let expected_uri = self.uri(name);
        let deadline = tokio::time::Instant::now() + window;
        let mut collected = Vec::new();

        loop {
            match tokio::time::timeout_at(deadline, self.notif_rx.recv()).await {
                Ok(Some(msg)) => {
                    if let Some(params) = as_diagnostics(&msg) {
                        if params.uri == expected_uri {
                            collected.push(params);
                        }
                    }
                }
                Ok(None) | Err(_) => return collected,
            }
        }
    }

    /// Progress notifications seen so far, without blocking.
    pub fn drain_progress(&mut self) -> Vec<ProgressParams> {
        let mut result = Vec::new();
        while let Ok(msg) = self.notif_rx.try_recv() {
            if msg.method() == "$/progress" {
                if let Some(params) = msg.params() {
                    if let Ok(p) = serde_json::from_value(params.clone()) {
                        result.push(p);
                    }
                }
            }
        }
        result
    }

    // ==========================================================================
    // Shutdown
    // ==========================================================================

    pub async fn shutdown(&mut self) {
        let shutdown = Request::build("shutdown").id(self.next_id()).finish();
        self.send_request(shutdown).await;

        let exit = Request::build("exit").finish();
        let _ = self.service.call(exit).await;
    }
}

fn as_diagnostics(msg: &Request) -> Option<PublishDiagnosticsParams> {
    if msg.method() != "textDocument/publishDiagnostics" {
        return None;
    }
    serde_json::from_value(msg.params()?.clone()).ok()
}
