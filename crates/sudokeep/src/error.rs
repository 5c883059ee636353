//! Domain errors raised while editing the sudoers file.
//!
//! All errors use a `thiserror`-derived enum with structured context so
//! callers can inspect the failure programmatically. Diagnostics produced by
//! the external syntax checker are preserved verbatim.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from grant edits and the surrounding transaction.
#[derive(Debug, Error)]
pub enum GrantError {
    /// The live file could not be opened or read.
    ///
    /// A missing live file is reported through this variant rather than
    /// being treated as an empty entry set.
    #[error("{path} is missing or not readable: {source}")]
    Unreadable {
        /// Path that was opened.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A staged working copy already exists, so another invocation holds
    /// the transaction lock.
    #[error("another edit is in progress: staged copy {path} already exists")]
    LockHeld {
        /// Path of the pre-existing staged artifact.
        path: Utf8PathBuf,
    },

    /// The external syntax checker rejected the staged content.
    #[error("staged content rejected by syntax checker: {diagnostic}")]
    ValidationFailed {
        /// Checker output, verbatim.
        diagnostic: String,
    },

    /// Promoting the staged copy over the live file failed.
    #[error("failed to promote staged copy over {path}: {source}")]
    CommitFailed {
        /// Live file path that was being replaced.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A write target (the staged copy, or a requested backup) was not
    /// writable.
    #[error("{path} is not writable: {source}")]
    PermissionDenied {
        /// Path that was being written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A principal was constructed with an empty name.
    #[error("principal name must not be empty")]
    EmptyPrincipal,
}
