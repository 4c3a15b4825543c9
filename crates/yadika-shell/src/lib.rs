//! Simulated shell engine: command dispatch, pipelines, redirection, and
//! lesson plumbing over the immutable VFS.
//!
//! The engine is deliberately headless. It consumes submitted lines and
//! produces [`TerminalLine`](yadika_types::TerminalLine) sequences plus
//! [`EngineEvent`]s; rendering, prompts, and keystroke handling belong to
//! the embedding UI.

pub mod commands;
pub mod flag;
pub mod interpreter;
pub mod loader;
pub mod session;
pub mod text_commands;
pub mod tutorial;

pub use flag::{DEFAULT_FLAG_PREFIX, FlagDetector};
pub use interpreter::{
    Command, CommandOutput, CommandRegistry, EngineEvent, Environment, LessonHook, ShellEngine,
};
pub use loader::{ContentFetcher, ContentLoader, MemoryFetcher};
pub use session::ShellSession;
pub use tutorial::{TutorialMachine, TutorialStep};
