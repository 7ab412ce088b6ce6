// ==============================================================================
// Debounce and cancellation scheduling
// ==============================================================================
//
// Two independent debounce slots, both runtime-configurable:
//
// - Format: request/response, so debouncing can only drop. While the slot
//   is armed, new format requests return an empty edit list and the client
//   keeps its buffer.
// - Lint: fire-and-forget, so debouncing coalesces. A new trigger pushes
//   the armed deadline out, and when the timer finally fires, the previous
//   in-flight run for that URI is cancelled before the new one starts.
//   Latest state wins.
//
// The per-URI cancellation map pairs each token with a run id so a finished
// run only deregisters itself, never the run that superseded it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::notification::Progress;
use tower_lsp::lsp_types::{MessageType, Url};
use tower_lsp::Client;

use relay_core::config::LintEvent;
use relay_core::engine::LangEngine;
use relay_core::lint::run_all_linters;

pub struct Scheduler {
    format_debounce: Mutex<Duration>,
    lint_debounce: Mutex<Duration>,
    /// True while a format window is open; cleared by a timer task.
    format_active: Mutex<bool>,
    /// Deadline of the armed lint timer, shared with its timer task so new
    /// triggers can push it out.
    lint_deadline: Mutex<Option<Arc<Mutex<Instant>>>>,
    running: Mutex<HashMap<Url, (u64, CancellationToken)>>,
    run_counter: AtomicU64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            format_debounce: Mutex::new(Duration::ZERO),
            lint_debounce: Mutex::new(Duration::ZERO),
            format_active: Mutex::new(false),
            lint_deadline: Mutex::new(None),
            running: Mutex::new(HashMap::new()),
            run_counter: AtomicU64::new(0),
        }
    }

    pub fn set_format_debounce(&self, debounce: Duration) {
        *self.format_debounce.lock() = debounce;
    }

    pub fn set_lint_debounce(&self, debounce: Duration) {
        *self.lint_debounce.lock() = debounce;
    }

    /// Open the format window, or report that one is already open (the
    /// caller then answers the request with no edits). The caller that
    /// opened the window proceeds with the actual formatting.
    pub fn try_begin_format(self: &Arc<Self>) -> bool {
        let mut active = self.format_active.lock();
        if *active {
            return false;
        }
        *active = true;

        let debounce = *self.format_debounce.lock();
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            *scheduler.format_active.lock() = false;
        });
        true
    }

    /// Arm (or extend) the lint timer. Note the armed URI is kept: a trigger
    /// arriving during the window only moves the deadline, it does not
    /// retarget the pending run.
    pub fn schedule_lint(
        self: &Arc<Self>,
        client: Client,
        engine: Arc<Mutex<LangEngine>>,
        uri: Url,
        event: LintEvent,
    ) {
        let debounce = *self.lint_debounce.lock();
        let mut slot = self.lint_deadline.lock();
        if let Some(deadline) = slot.as_ref() {
            *deadline.lock() = Instant::now() + debounce;
            log::debug!("lint debounced: {debounce:?}");
            return;
        }

        let deadline = Arc::new(Mutex::new(Instant::now() + debounce));
        *slot = Some(Arc::clone(&deadline));
        drop(slot);

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            // Sleep until the deadline stops moving.
            loop {
                let at = *deadline.lock();
                tokio::time::sleep_until(at).await;
                if Instant::now() >= *deadline.lock() {
                    break;
                }
            }
            *scheduler.lint_deadline.lock() = None;
            scheduler.run_lint(client, engine, uri, event).await;
        });
    }

    /// Cancel the previous run for this URI, register a fresh token, wire the
    /// channel consumers to the client, and drive the pipeline to completion.
    async fn run_lint(
        &self,
        client: Client,
        engine: Arc<Mutex<LangEngine>>,
        uri: Url,
        event: LintEvent,
    ) {
        let run_id = self.run_counter.fetch_add(1, Ordering::Relaxed);
        let token = {
            let mut running = self.running.lock();
            if let Some((_, previous)) = running.get(&uri) {
                previous.cancel();
            }
            let token = CancellationToken::new();
            running.insert(uri.clone(), (run_id, token.clone()));
            token
        };

        let (diagnostics_tx, mut diagnostics_rx) =
            mpsc::unbounded_channel::<tower_lsp::lsp_types::PublishDiagnosticsParams>();
        let (errors_tx, mut errors_rx) = mpsc::unbounded_channel::<relay_core::Error>();
        let (progress_tx, mut progress_rx) =
            mpsc::unbounded_channel::<tower_lsp::lsp_types::ProgressParams>();

        // Consumers drain until the pipeline drops its senders.
        let diagnostics_client = client.clone();
        let diagnostics_task = tokio::spawn(async move {
            while let Some(params) = diagnostics_rx.recv().await {
                diagnostics_client
                    .publish_diagnostics(params.uri, params.diagnostics, params.version)
                    .await;
            }
        });
        let errors_client = client.clone();
        let errors_task = tokio::spawn(async move {
            while let Some(error) = errors_rx.recv().await {
                errors_client
                    .log_message(MessageType::ERROR, error.to_string())
                    .await;
            }
        });
        let progress_client = client.clone();
        let progress_task = tokio::spawn(async move {
            while let Some(params) = progress_rx.recv().await {
                progress_client.send_notification::<Progress>(params).await;
            }
        });

        let result = run_all_linters(
            &engine,
            &uri,
            event,
            token,
            diagnostics_tx,
            errors_tx,
            progress_tx,
        )
        .await;
        if let Err(e) = result {
            log::error!("{e}");
            client.log_message(MessageType::ERROR, e.to_string()).await;
        }

        let _ = diagnostics_task.await;
        let _ = errors_task.await;
        let _ = progress_task.await;

        // Release the cancellation handle unless a newer run took the slot.
        let mut running = self.running.lock();
        if matches!(running.get(&uri), Some((id, _)) if *id == run_id) {
            running.remove(&uri);
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
