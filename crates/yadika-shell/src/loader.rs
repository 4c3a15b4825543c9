//! Lazy content loader.
//!
//! Large file bodies ship as [`FileContent::Deferred`] in the lesson seed
//! and are fetched from the backend on first read. A successful fetch is
//! cached back into the VFS, so the same node never triggers a second
//! fetch. A failed fetch leaves the node deferred; the learner sees a
//! generic read error and a retry may fetch again.

use std::cell::Cell;
use std::collections::HashMap;

use yadika_types::{Result, ShellError};
use yadika_vfs::{FileContent, Vfs};

/// Backend seam for deferred file bodies.
///
/// Keyed by level identifier and absolute VFS path. The error string is a
/// transport detail for the log; learners never see it.
pub trait ContentFetcher {
    fn fetch(&self, level: &str, path: &str) -> std::result::Result<String, String>;
}

/// Resolves deferred content against a [`ContentFetcher`], caching results
/// into the VFS.
pub struct ContentLoader {
    level: String,
    fetcher: Box<dyn ContentFetcher>,
}

impl ContentLoader {
    pub fn new(level: impl Into<String>, fetcher: Box<dyn ContentFetcher>) -> Self {
        Self {
            level: level.into(),
            fetcher,
        }
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    /// Fetch the body for a deferred file and patch it into the VFS.
    ///
    /// `cmd` is the built-in reporting the failure (`cat`, `grep`, ...).
    pub fn materialize(&self, vfs: &mut Vfs, cmd: &str, path: &str) -> Result<String> {
        log::info!("fetching deferred content for {path} (level {})", self.level);
        match self.fetcher.fetch(&self.level, path) {
            Ok(text) => {
                let cached = text.clone();
                vfs.update(path, move |existing| match existing {
                    Some(node) => node.clone().with_content(FileContent::Text(cached)),
                    None => yadika_vfs::FsNode::file(cached),
                });
                Ok(text)
            },
            Err(detail) => {
                log::warn!("content fetch failed for {path}: {detail}");
                Err(ShellError::ContentLoad {
                    cmd: cmd.to_string(),
                    path: path.to_string(),
                })
            },
        }
    }
}

/// In-memory fetcher backed by a `(level, path) -> body` table.
///
/// Used by tests and by web embeddings that preload content. Counts calls
/// so the at-most-once caching guarantee is observable.
#[derive(Default)]
pub struct MemoryFetcher {
    entries: HashMap<(String, String), String>,
    calls: Cell<usize>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, level: &str, path: &str, body: impl Into<String>) {
        self.entries
            .insert((level.to_string(), path.to_string()), body.into());
    }

    /// Total fetch calls, hits and misses alike.
    pub fn fetch_count(&self) -> usize {
        self.calls.get()
    }
}

impl ContentFetcher for MemoryFetcher {
    fn fetch(&self, level: &str, path: &str) -> std::result::Result<String, String> {
        self.calls.set(self.calls.get() + 1);
        self.entries
            .get(&(level.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| format!("no content for {level}:{path}"))
    }
}

// Lets a caller keep a handle on a fetcher (e.g. to inspect call counts)
// after handing it to the engine.
impl<T: ContentFetcher + ?Sized> ContentFetcher for std::rc::Rc<T> {
    fn fetch(&self, level: &str, path: &str) -> std::result::Result<String, String> {
        (**self).fetch(level, path)
    }
}
