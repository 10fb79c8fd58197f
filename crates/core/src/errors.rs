//! Error types for the reposync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and the
//! top-level [`SyncError`] enum unifies them for callers that want a single
//! error type. Errors are propagated to the caller unmodified; there is no
//! retry or recovery anywhere in this crate.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for a pipeline run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required property is absent from the merged configuration.
    /// Detected before any process is spawned.
    #[error("missing \"{0}\" property in sync configuration")]
    MissingProperty(&'static str),

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Process errors
// ---------------------------------------------------------------------------

/// Errors from spawning and waiting on an external process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executable was not found on `$PATH`.
    #[error("executable not found: {0}")]
    BinaryNotFound(String),

    /// The process exited with a nonzero status. `message` is everything
    /// the process wrote to stderr, in arrival order, or the synthesized
    /// fallback `"Process failed: <code>"` when stderr was silent.
    #[error("{message}")]
    Failed { code: i32, message: String },

    /// I/O failure while spawning or waiting on the process.
    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),
}
