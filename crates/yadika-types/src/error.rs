//! Error types for the yadika shell engine.
//!
//! Variant display strings double as the terminal error messages, so the
//! submit boundary can render any `Err` with plain `to_string()`.

use std::io;

/// Errors produced by the shell engine.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("{cmd}: {path}: No such file or directory")]
    NotFound { cmd: String, path: String },

    #[error("{cmd}: {path}: Not a directory")]
    NotADirectory { cmd: String, path: String },

    #[error("{cmd}: {path}: Is a directory")]
    IsADirectory { cmd: String, path: String },

    #[error("{cmd}: {path}: Permission denied")]
    PermissionDenied { cmd: String, path: String },

    #[error("{cmd}: missing operand")]
    MissingOperand { cmd: String },

    #[error("{0}: command not found")]
    UnknownCommand(String),

    /// Deferred content could not be fetched. The transport detail stays
    /// in the log; the learner sees a generic read failure.
    #[error("{cmd}: {path}: could not read file")]
    ContentLoad { cmd: String, path: String },

    #[error("syntax error: {0}")]
    Parse(String),

    #[error("lesson error: {0}")]
    Lesson(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;
