use lsp_types::Url;
use thiserror::Error;

/// Engine-level failures. Cancellation is deliberately not represented here:
/// a lint child killed by its cancellation token simply produces no output.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation referenced a URI with no open document.
    #[error("document not found: {0}")]
    NotFound(Url),

    /// A URI that cannot be mapped to a local file path.
    #[error("invalid uri: {0}")]
    InvalidUri(Url),

    /// A configured errorformat pattern failed to compile.
    #[error("invalid error-format: {0:?}")]
    InvalidFormat(Vec<String>),

    /// Spawn or I/O failure, or a formatter exiting non-zero. `message`
    /// carries the child's stderr where one was captured.
    #[error("{command}: {message}")]
    Subprocess { command: String, message: String },

    /// Every selected formatter failed; the per-config errors are joined so
    /// the client sees one actionable message.
    #[error("could not format document for language {language_id}; all errors: {errors:?}")]
    NoFormatterSucceeded {
        language_id: String,
        errors: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
