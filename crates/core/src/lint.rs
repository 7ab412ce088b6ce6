// ==============================================================================
// Linting pipeline: fan out configured linters, publish per-config results
// ==============================================================================
//
// One run per URI at a time (the scheduler cancels the previous run before
// starting a new one). Within a run every selected config executes
// concurrently; each publishes its own diagnostics message so a slow linter
// never delays a fast one. The run always starts by publishing an empty set,
// which is what clears stale squiggles when the new run finds nothing.

use std::path::Path;

use lsp_types::{
    Diagnostic, DiagnosticSeverity, NumberOrString, Position, ProgressParams,
    PublishDiagnosticsParams, Range, Url,
};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::command::run_lint_command;
use crate::config::{LanguageConfig, LintEvent};
use crate::document::FileRef;
use crate::engine::LangEngine;
use crate::error::{Error, Result};
use crate::errorformat::{Entry, Errorformat, DEFAULT_LINT_FORMATS};
use crate::placeholder::build_lint_command;
use crate::position::{utf16_len, word_at_utf16};
use crate::progress::{new_progress_token, work_begin, work_end};
use crate::rootmarker::{effective_root, match_root_path};

/// Filenames linters report when they read the document from stdin.
const STDIN_PLACEHOLDERS: [&str; 4] = ["stdin", "-", "<text>", "<stdin>"];

/// Run every matching linter for `uri` concurrently. Diagnostics and errors
/// stream through the channels while the run progresses; the call returns
/// once every linter has finished. Individual linter failures go to
/// `errors_out` without cancelling their siblings.
pub async fn run_all_linters(
    engine: &Mutex<LangEngine>,
    uri: &Url,
    event: LintEvent,
    cancel: CancellationToken,
    diagnostics_out: UnboundedSender<PublishDiagnosticsParams>,
    errors_out: UnboundedSender<Error>,
    progress: UnboundedSender<ProgressParams>,
) -> Result<()> {
    let (file, candidates, root_path) = {
        let engine = engine.lock();
        let file = engine.snapshot(uri)?;
        let candidates = engine.configs_for(&file.language_id);
        (file, candidates, engine.root_path.clone())
    };

    let configs = select_lint_configs(&file.normalized_filename, candidates, event);
    if configs.is_empty() {
        log::debug!("no matching lint configs for language {}", file.language_id);
        return Ok(());
    }

    // Reset first, before any linter output: stale diagnostics must not
    // outlive the edit that invalidated them.
    let _ = diagnostics_out.send(PublishDiagnosticsParams {
        uri: uri.clone(),
        diagnostics: Vec::new(),
        version: Some(file.version),
    });

    let token = new_progress_token();
    let _ = progress.send(work_begin(token.clone(), "Linting document"));

    let mut tasks = Vec::with_capacity(configs.len());
    for config in configs {
        let file = file.clone();
        let root_path = root_path.clone();
        let cancel = cancel.clone();
        let diagnostics_out = diagnostics_out.clone();
        let errors_out = errors_out.clone();

        tasks.push(tokio::spawn(async move {
            let root = effective_root(&file.normalized_filename, &config, &root_path);
            match lint_document(&root, &file, &config, &cancel).await {
                Ok(diagnostics) => {
                    let _ = diagnostics_out.send(PublishDiagnosticsParams {
                        uri: file.uri.clone(),
                        diagnostics,
                        version: Some(file.version),
                    });
                }
                Err(e) => {
                    log::error!("{e}");
                    let _ = errors_out.send(e);
                }
            }
        }));
    }

    for task in tasks {
        let _ = task.await;
    }

    let _ = progress.send(work_end(token));
    Ok(())
}

/// One linter over one document: run, scan, filter, map.
async fn lint_document(
    root_path: &str,
    file: &FileRef,
    config: &LanguageConfig,
    cancel: &CancellationToken,
) -> Result<Vec<Diagnostic>> {
    let command = build_lint_command(config, &file.normalized_filename, root_path);
    log::info!("{command}");

    let stdin = config.lint_stdin.then_some(file.text.as_str());
    let output = run_lint_command(
        &command,
        root_path,
        &config.env,
        stdin,
        config.lint_ignore_exit_code,
        cancel,
    )
    .await?
    .unwrap_or_default();
    log::debug!("{output}");

    let formats = if config.lint_formats.is_empty() {
        DEFAULT_LINT_FORMATS.iter().map(|s| s.to_string()).collect()
    } else {
        config.lint_formats.clone()
    };
    let efm = Errorformat::new(&formats)?;

    let mut diagnostics = Vec::new();
    for mut entry in efm.scan(&output) {
        entry.filename = normalize_entry_filename(entry.filename, config, &file.normalized_filename);
        if !entry_matches_uri(root_path, &file.uri, &entry) {
            // Output for some other file; not ours to publish.
            continue;
        }
        diagnostics.push(entry_to_diagnostic(&entry, config, file));
    }
    Ok(diagnostics)
}

fn select_lint_configs(
    filename: &str,
    candidates: Vec<LanguageConfig>,
    event: LintEvent,
) -> Vec<LanguageConfig> {
    candidates
        .into_iter()
        .filter(|config| {
            if config.lint_command.is_empty() {
                return false;
            }
            if config.require_marker && match_root_path(filename, &config.root_markers).is_none() {
                return false;
            }
            config.lints_on(event)
        })
        .collect()
}

/// A linter fed over stdin reports a placeholder filename; map it back to
/// the real document so the URI filter keeps the entry. All filenames are
/// slash-normalized for comparison.
fn normalize_entry_filename(filename: String, config: &LanguageConfig, document: &str) -> String {
    let filename = if config.lint_stdin && STDIN_PLACEHOLDERS.contains(&filename.as_str()) {
        document.to_string()
    } else {
        filename
    };
    if cfg!(windows) {
        filename.replace('\\', "/")
    } else {
        filename
    }
}

/// An empty filename is assumed to mean "this document". Everything else is
/// resolved (relative entries against the effective root) and compared as a
/// file URI, case-insensitively on Windows.
fn entry_matches_uri(root_path: &str, uri: &Url, entry: &Entry) -> bool {
    if entry.filename.is_empty() {
        return true;
    }

    let path = Path::new(&entry.filename);
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(root_path).join(path)
    };
    let Ok(entry_uri) = Url::from_file_path(&resolved) else {
        return false;
    };

    if cfg!(windows) {
        entry_uri.as_str().eq_ignore_ascii_case(uri.as_str())
    } else {
        entry_uri.as_str() == uri.as_str()
    }
}

/// Errorformat coordinates (1-based, optional ends) → LSP range (0-based,
/// UTF-16). See the config field docs for the two offset quirks: the line
/// offset is subtracted, and column 0 means "whole line" and never shifts.
fn entry_to_diagnostic(entry: &Entry, config: &LanguageConfig, file: &FileRef) -> Diagnostic {
    let line_start = (entry.lnum - 1 - config.lint_offset).max(0) as u32;
    let line_end = if entry.end_lnum != 0 {
        (entry.end_lnum - 1 - config.lint_offset).max(0) as u32
    } else {
        line_start
    };

    let mut col_start = (entry.col - 1).max(0);
    let mut col_end = col_start;
    if entry.col != 0 {
        col_start += config.lint_offset_columns;
        if entry.end_col != 0 {
            col_end = (entry.end_col - 1).max(0) + config.lint_offset_columns;
        } else {
            let word = word_at_utf16(&file.text, Position::new(line_start, col_start.max(0) as u32));
            col_end = col_start + utf16_len(&word) as i64;
        }
    }

    Diagnostic {
        range: Range::new(
            Position::new(line_start, col_start.max(0) as u32),
            Position::new(line_end, col_end.max(0) as u32),
        ),
        severity: Some(severity_for(entry.category, config)),
        code: (entry.nr != 0).then(|| NumberOrString::Number(entry.nr as i32)),
        source: (!config.lint_source.is_empty()).then(|| config.lint_source.clone()),
        message: match config.prefix.as_str() {
            "" => entry.text.clone(),
            prefix => format!("[{prefix}] {}", entry.text),
        },
        ..Default::default()
    }
}

/// Category char → severity. The category map runs first so tools with
/// non-standard letters (pylint's `R`, `C`) can be folded onto E/W/I/N;
/// anything still unrecognized falls back to `lintSeverity`, then Error.
fn severity_for(category: Option<char>, config: &LanguageConfig) -> DiagnosticSeverity {
    let category = match category {
        Some(c) if !config.lint_category_map.is_empty() => config
            .lint_category_map
            .get(&c.to_string())
            .and_then(|mapped| mapped.chars().next())
            .unwrap_or(c),
        other => other.unwrap_or('\0'),
    };

    match category {
        'E' | 'e' => DiagnosticSeverity::ERROR,
        'W' | 'w' => DiagnosticSeverity::WARNING,
        'I' | 'i' => DiagnosticSeverity::INFORMATION,
        'N' | 'n' => DiagnosticSeverity::HINT,
        _ => config.lint_severity.unwrap_or(DiagnosticSeverity::ERROR),
    }
}
