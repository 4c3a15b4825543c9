//! Per-lesson session state.
//!
//! A session is created when a lesson's terminal mounts and dropped when
//! it unmounts. It is plain data owned by the caller: the engine reads
//! and mutates it through [`submit`](crate::ShellEngine::submit) but
//! keeps no state of its own between submissions.

use std::collections::BTreeMap;

use yadika_types::TerminalLine;
use yadika_vfs::Vfs;

/// Mutable state of one terminal session.
pub struct ShellSession {
    pub(crate) vfs: Vfs,
    pub(crate) cwd: String,
    pub(crate) environment: BTreeMap<String, String>,
    pub(crate) history: Vec<String>,
    pub(crate) output_log: Vec<TerminalLine>,
}

impl ShellSession {
    /// Mount a session over a seeded VFS.
    ///
    /// Seeds the fixed environment keys (`SHELL`, `USER`, `HOSTNAME`,
    /// `PWD`, `PATH`, `LANG`); lesson overrides go on top via
    /// [`set_var`](Self::set_var). If `cwd` does not name a directory in
    /// the tree the session starts at `/` instead.
    pub fn new(vfs: Vfs, cwd: &str, user: &str, hostname: &str) -> Self {
        let cwd = if vfs.node(cwd).is_some_and(|n| n.is_dir()) {
            cwd.to_string()
        } else {
            log::warn!("initial directory {cwd} is not a directory, starting at /");
            "/".to_string()
        };

        let mut environment = BTreeMap::new();
        environment.insert("SHELL".to_string(), "/bin/bash".to_string());
        environment.insert("USER".to_string(), user.to_string());
        environment.insert("HOSTNAME".to_string(), hostname.to_string());
        environment.insert("PWD".to_string(), cwd.clone());
        environment.insert(
            "PATH".to_string(),
            "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin".to_string(),
        );
        environment.insert("LANG".to_string(), "en_US.UTF-8".to_string());

        Self {
            vfs,
            cwd,
            environment,
            history: Vec::new(),
            output_log: Vec::new(),
        }
    }

    /// The current VFS snapshot.
    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    /// The current working directory; always names a directory in the
    /// current snapshot.
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.environment.get(name).map(String::as_str)
    }

    /// Set an environment variable (lesson overrides, UI-driven tweaks).
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.environment.insert(name.into(), value.into());
    }

    /// Submitted non-empty lines, oldest first. Recall only; never
    /// re-executed by the engine.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Everything the terminal shows, oldest first.
    pub fn output_log(&self) -> &[TerminalLine] {
        &self.output_log
    }

    /// Append a line to the log outside command dispatch (welcome
    /// banners, lesson hints).
    pub fn push_system_line(&mut self, text: impl Into<String>) {
        self.output_log.push(TerminalLine::system(text));
    }
}
