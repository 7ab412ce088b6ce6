// ==============================================================================
// LangEngine: documents + configuration + workspace root
// ==============================================================================
//
// The server holds this behind a parking_lot::Mutex and locks it only to
// mutate or to take a per-run snapshot, never across an await. A pipeline
// run therefore sees one coherent (document, configs, root) view even while
// `didChangeConfiguration` swaps the table underneath it.

use lsp_types::Url;

use crate::config::{ConfigTable, LanguageConfig, WILDCARD};
use crate::document::{DocumentStore, FileRef};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct LangEngine {
    documents: DocumentStore,
    configs: ConfigTable,
    /// Workspace root from `initialize.rootUri`; empty until then.
    pub root_path: String,
}

impl LangEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configs(configs: ConfigTable) -> Self {
        Self {
            configs,
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    pub fn open_file(&mut self, uri: Url, language_id: String, version: i32, text: String) -> Result<()> {
        self.documents.open(uri, language_id, version, text)
    }

    pub fn update_file(&mut self, uri: &Url, text: String, version: Option<i32>) -> Result<()> {
        self.documents.update(uri, text, version)
    }

    pub fn close_file(&mut self, uri: &Url) {
        self.documents.close(uri);
    }

    pub fn snapshot(&self, uri: &Url) -> Result<FileRef> {
        self.documents.snapshot(uri)
    }

    pub fn open_count(&self) -> usize {
        self.documents.len()
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// The `languages` map is replaced wholesale, never merged: a config push
    /// is the client's full intent.
    pub fn replace_languages(&mut self, configs: ConfigTable) {
        self.configs = configs;
    }

    pub fn language_count(&self) -> usize {
        self.configs.len()
    }

    /// All candidate configs for a language id: its own entries first, then
    /// the wildcard entries. Wildcards are additive, never a fallback.
    pub fn configs_for(&self, language_id: &str) -> Vec<LanguageConfig> {
        let mut configs = Vec::new();
        if let Some(entries) = self.configs.get(language_id) {
            configs.extend(entries.iter().cloned());
        }
        if let Some(entries) = self.configs.get(WILDCARD) {
            configs.extend(entries.iter().cloned());
        }
        configs
    }

    /// Whether any configured language advertises formatting (and range
    /// formatting); drives the initialize capabilities.
    pub fn formatting_capabilities(&self) -> (bool, bool) {
        let mut has_format = false;
        let mut has_range = false;
        for config in self.configs.values().flatten() {
            if !config.format_command.is_empty() {
                has_format = true;
                if config.format_can_range {
                    has_range = true;
                    break;
                }
            }
        }
        (has_format, has_range)
    }
}
