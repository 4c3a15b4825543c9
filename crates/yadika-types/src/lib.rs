//! Foundation types for the yadika shell engine.
//!
//! This crate contains the vocabulary shared by all engine crates: the
//! terminal line records every component communicates in, and the error
//! type whose display strings are the exact messages a learner sees.

pub mod error;
pub mod line;

pub use error::{Result, ShellError};
pub use line::{LineKind, TerminalLine};
