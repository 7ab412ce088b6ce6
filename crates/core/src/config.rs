// ==============================================================================
// Wire-facing configuration model
// ==============================================================================
//
// Settings arrive over `workspace/didChangeConfiguration`; nothing is read
// from disk. Field names are camelCase on the wire to match what editor
// plugins already send.

use std::collections::HashMap;

use lsp_types::DiagnosticSeverity;
use serde::Deserialize;

/// Configuration key applied to every language in addition to its own entries.
pub const WILDCARD: &str = "=";

/// Language-id → ordered tool configurations. Selection walks the entries for
/// the document's language id first, then the [`WILDCARD`] entries.
pub type ConfigTable = HashMap<String, Vec<LanguageConfig>>;

/// One external tool wired to a language: a formatter, a linter, or both.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageConfig {
    /// Extra `KEY=VALUE` environment bindings for the child process.
    pub env: Vec<String>,
    /// Glob patterns marking a project root; a trailing `/` matches
    /// directories instead of files.
    pub root_markers: Vec<String>,
    /// Skip this tool entirely when no root marker is found.
    pub require_marker: bool,
    /// Rendered as `"[prefix] "` in front of every diagnostic message.
    pub prefix: String,
    pub format_command: String,
    pub format_can_range: bool,
    pub lint_command: String,
    /// Feed the document over stdin instead of appending `${INPUT}`.
    pub lint_stdin: bool,
    /// Parse output even when the linter exits 0.
    pub lint_ignore_exit_code: bool,
    /// Errorformat patterns, tried in order. Empty means the
    /// `["%f:%l:%m", "%f:%l:%c:%m"]` defaults.
    pub lint_formats: Vec<String>,
    /// Subtracted from the line the linter reports. The sign is historical
    /// (existing configurations rely on it), so it stays subtraction.
    pub lint_offset: i64,
    /// Added to the column the linter reports, except for column 0, which
    /// means "whole line" and is never shifted.
    pub lint_offset_columns: i64,
    /// Remaps the linter's category character before severity mapping,
    /// e.g. `{"R": "I"}` to turn refactoring hints into Information.
    pub lint_category_map: HashMap<String, String>,
    /// Overrides the diagnostic `source` field when non-empty.
    pub lint_source: String,
    /// Fallback severity for category characters outside E/W/I/N.
    pub lint_severity: Option<DiagnosticSeverity>,
    // The three event gates are tri-state on purpose: absent means enabled.
    pub lint_after_open: Option<bool>,
    pub lint_on_change: Option<bool>,
    pub lint_on_save: Option<bool>,
}

impl LanguageConfig {
    /// Event gate with the unset-means-true default.
    pub fn lints_on(&self, event: LintEvent) -> bool {
        let gate = match event {
            LintEvent::Open => self.lint_after_open,
            LintEvent::Change => self.lint_on_change,
            LintEvent::Save => self.lint_on_save,
        };
        gate.unwrap_or(true)
    }
}

/// What triggered a lint run. Gated per config by `lintAfterOpen`,
/// `lintOnChange` and `lintOnSave`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintEvent {
    Open,
    Change,
    Save,
}

/// Top-level `settings` payload of `workspace/didChangeConfiguration`.
///
/// Absent fields leave the current value untouched; a present `languages`
/// map replaces the whole table. Debounce values are milliseconds. The log
/// file is CLI-only and intentionally has no field here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub languages: Option<ConfigTable>,
    pub lint_debounce: Option<u64>,
    pub format_debounce: Option<u64>,
}
