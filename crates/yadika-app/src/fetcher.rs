//! Directory-backed content fetcher.
//!
//! Deferred file bodies live on disk under `<root>/<level>/<vfs path>`,
//! mirroring what the web deployment serves over HTTP.

use std::path::PathBuf;

use yadika_shell::ContentFetcher;

pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ContentFetcher for DirFetcher {
    fn fetch(&self, level: &str, path: &str) -> Result<String, String> {
        let relative = path.trim_start_matches('/');
        let file = self.root.join(level).join(relative);
        log::debug!("reading deferred content from {}", file.display());
        std::fs::read_to_string(&file).map_err(|e| format!("{}: {e}", file.display()))
    }
}
