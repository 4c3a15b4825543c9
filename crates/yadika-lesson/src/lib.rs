//! Lesson loading for the yadika shell engine.
//!
//! A lesson is external data: a seed VFS tree, session parameters, and
//! optional flag/welcome configuration, shipped as JSON. This crate turns
//! that JSON into a ready [`ShellSession`](yadika_shell::ShellSession)
//! and [`ShellEngine`](yadika_shell::ShellEngine); lesson code (hooks,
//! tutorial steps) is registered by the embedding application on top.

pub mod demo;
pub mod spec;

pub use demo::demo_lesson;
pub use spec::{LessonSpec, NodeSpec, deferred_paths};
