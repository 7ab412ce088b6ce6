//! Engine for relay-ls: everything between an LSP request and the external
//! tools it fans out to.
//!
//! The flow for one document: the server stores its text ([`document`]),
//! picks the configured tools for its language ([`engine`], [`config`]),
//! renders their command templates ([`placeholder`], [`rootmarker`]), runs
//! them ([`command`]), and turns what comes back into protocol data: text
//! edits via a line diff ([`format`], [`diff`]) or diagnostics via
//! errorformat scanning ([`lint`], [`errorformat`], [`position`]).
//!
//! Nothing in this crate touches a transport; results stream through
//! channels and the caller owns the JSON-RPC side.

pub mod command;
pub mod config;
pub mod diff;
pub mod document;
pub mod engine;
pub mod error;
pub mod errorformat;
pub mod format;
pub mod lint;
pub mod placeholder;
pub mod position;
pub mod progress;
pub mod rootmarker;

#[cfg(test)]
mod pbt;

pub use error::{Error, Result};
