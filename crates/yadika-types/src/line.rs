//! Terminal line records.
//!
//! Every component of the engine communicates in ordered sequences of
//! [`TerminalLine`]: command output, error reporting, the session log, and
//! the implicit stdin of pipeline stages. The embedding UI renders kinds
//! differently (color, prompt prefix) but the engine only distinguishes
//! error lines from everything else.

use serde::{Deserialize, Serialize};

/// How a terminal line should be treated and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    /// The learner's submitted command, echoed back.
    Input,
    /// Normal command output.
    Output,
    /// A failed operation. Error lines abort pipelines and redirections.
    Error,
    /// Positive feedback (used by lesson hooks, e.g. a cracked password).
    Success,
    /// Engine or lesson housekeeping (welcome banners, hints).
    System,
}

/// One line of terminal traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalLine {
    pub text: String,
    pub kind: LineKind,
}

impl TerminalLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn input(text: impl Into<String>) -> Self {
        Self::new(LineKind::Input, text)
    }

    pub fn output(text: impl Into<String>) -> Self {
        Self::new(LineKind::Output, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(LineKind::Error, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(LineKind::Success, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(LineKind::System, text)
    }

    pub fn is_error(&self) -> bool {
        self.kind == LineKind::Error
    }
}
