// ==============================================================================
// In-memory document store
// ==============================================================================
//
// One snapshot per open URI, kept in sync by didOpen/didChange/didSave and
// dropped on didClose. The text is the full buffer (the server negotiates
// full-text sync), so pipelines can hand it to child processes unchanged.

use std::collections::HashMap;

use lsp_types::Url;

use crate::error::{Error, Result};

/// Snapshot of one open document.
#[derive(Debug, Clone)]
pub struct FileRef {
    pub uri: Url,
    /// Absolute path with forward slashes, used for `${INPUT}`/`${FILENAME}`
    /// and for matching linter output back to this document.
    pub normalized_filename: String,
    pub language_id: String,
    pub version: i32,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    files: HashMap<Url, FileRef>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document. Opening a URI that is already open replaces the
    /// previous snapshot.
    pub fn open(&mut self, uri: Url, language_id: String, version: i32, text: String) -> Result<()> {
        let normalized_filename = normalized_filename_from_uri(&uri)?;
        self.files.insert(
            uri.clone(),
            FileRef {
                uri,
                normalized_filename,
                language_id,
                version,
                text,
            },
        );
        Ok(())
    }

    /// Replace the text of an open document; `version` of `None` keeps the
    /// current version (used for didSave, which may resend the buffer).
    pub fn update(&mut self, uri: &Url, text: String, version: Option<i32>) -> Result<()> {
        let file = self
            .files
            .get_mut(uri)
            .ok_or_else(|| Error::NotFound(uri.clone()))?;
        file.text = text;
        if let Some(version) = version {
            file.version = version;
        }
        Ok(())
    }

    /// Closing an unknown URI is a no-op.
    pub fn close(&mut self, uri: &Url) {
        self.files.remove(uri);
    }

    pub fn get(&self, uri: &Url) -> Option<&FileRef> {
        self.files.get(uri)
    }

    /// Owned copy for a pipeline run, so the run keeps a coherent view while
    /// the store moves on underneath it.
    pub fn snapshot(&self, uri: &Url) -> Result<FileRef> {
        self.get(uri).cloned().ok_or_else(|| Error::NotFound(uri.clone()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// file:// URI → slash-normalized absolute path.
pub fn normalized_filename_from_uri(uri: &Url) -> Result<String> {
    let path = uri
        .to_file_path()
        .map_err(|_| Error::InvalidUri(uri.clone()))?;
    let mut filename = path.to_string_lossy().into_owned();
    if cfg!(windows) {
        filename = filename.replace('\\', "/");
    }
    Ok(filename)
}
