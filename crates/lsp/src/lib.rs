//! The LSP-facing half of relay-ls: a tower-lsp server that stores documents
//! in [`relay_core`]'s engine and drives its linting/formatting pipelines
//! through a debounce/cancellation scheduler.

pub mod scheduler;
pub mod server;
