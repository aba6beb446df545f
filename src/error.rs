//! Error types for debug sessions.

use thiserror::Error;

/// Failures surfaced by the session pipeline.
#[derive(Error, Debug)]
pub enum DebugError {
    /// The target file's extension has no debugger runtime.
    #[error("Unsupported file extension '{extension}'. Supported: {}", supported.join(", "))]
    UnsupportedExtension {
        extension: String,
        supported: Vec<&'static str>,
    },

    /// The sandbox program could not be started or waited on.
    #[error("Failed to run '{program}': {source}")]
    Process {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The debugger exited without printing a complete result block.
    #[error("Debugger output ended before a complete result was emitted")]
    IncompleteResult,

    /// No result arrived within the configured bound.
    #[error("No result received within {seconds}s")]
    ResultTimeout { seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DebugError>;
