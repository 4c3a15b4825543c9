//! Lesson specification: serde types for the seed data a lesson ships,
//! plus construction of a ready-to-use session and engine from it.

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use yadika_shell::{ContentFetcher, ShellEngine, ShellSession};
use yadika_types::{Result, ShellError};
use yadika_vfs::{DEFAULT_DIR_PERMS, FsNode, Vfs};

/// One node of the seed tree.
///
/// Kind is inferred: `children` present makes a directory, otherwise the
/// node is a file. Omitted permissions fall back to the kind's default;
/// an omitted owner falls back to the lesson user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Body is fetched from the backend on first read.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deferred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<String, NodeSpec>>,
}

impl NodeSpec {
    /// A file node with inline content.
    pub fn file(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A file node whose body comes from the content backend.
    pub fn deferred_file() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    /// A directory node.
    pub fn dir(children: impl IntoIterator<Item = (&'static str, NodeSpec)>) -> Self {
        Self {
            children: Some(
                children
                    .into_iter()
                    .map(|(name, node)| (name.to_string(), node))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn with_permissions(mut self, permissions: impl Into<String>) -> Self {
        self.permissions = Some(permissions.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn is_dir(&self) -> bool {
        self.children.is_some()
    }

    fn build(&self, default_owner: &str) -> FsNode {
        let node = match &self.children {
            Some(children) => FsNode::Directory {
                children: children
                    .iter()
                    .map(|(name, child)| (name.clone(), Rc::new(child.build(default_owner))))
                    .collect(),
                permissions: DEFAULT_DIR_PERMS.to_string(),
                owner: default_owner.to_string(),
            },
            None if self.deferred => FsNode::deferred_file(),
            None => FsNode::file(self.content.clone().unwrap_or_default()),
        };
        let node = match &self.permissions {
            Some(p) => node.with_permissions(p.clone()),
            None => node,
        };
        node.with_owner(self.owner.as_deref().unwrap_or(default_owner))
    }
}

/// A complete lesson: identity, seed tree, and session parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LessonSpec {
    /// Level identifier, the key the content backend serves deferred
    /// bodies under.
    pub level: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Initial working directory.
    #[serde(default = "default_cwd")]
    pub cwd: String,
    /// Extra environment entries layered over the fixed seeds.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Flag marker prefix override (default `yadika{`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_prefix: Option<String>,
    /// System lines shown before the first prompt.
    #[serde(default)]
    pub welcome: Vec<String>,
    /// Seed tree; must be a directory.
    pub root: NodeSpec,
}

fn default_user() -> String {
    "guest".to_string()
}

fn default_hostname() -> String {
    "yadika".to_string()
}

fn default_cwd() -> String {
    "/".to_string()
}

impl LessonSpec {
    /// Parse a lesson from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let spec: LessonSpec = serde_json::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Load a lesson from a JSON file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("loading lesson from {}", path.display());
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(ShellError::Lesson(
                "root node must be a directory".to_string(),
            ));
        }
        if self.level.is_empty() {
            return Err(ShellError::Lesson("level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Build the seed VFS described by `root`.
    pub fn build_vfs(&self) -> Vfs {
        Vfs::from_root(self.root.build(&self.user))
    }

    /// Build a fresh session: seed VFS, working directory, environment
    /// overrides, welcome banner.
    pub fn build_session(&self) -> ShellSession {
        let mut session = ShellSession::new(self.build_vfs(), &self.cwd, &self.user, &self.hostname);
        for (key, value) in &self.environment {
            session.set_var(key.clone(), value.clone());
        }
        for line in &self.welcome {
            session.push_system_line(line.clone());
        }
        session
    }

    /// Build the engine for this lesson over the given content backend.
    pub fn build_engine(&self, fetcher: Box<dyn ContentFetcher>) -> ShellEngine {
        let mut engine = ShellEngine::new(self.level.clone(), fetcher);
        if let Some(prefix) = &self.flag_prefix {
            engine.set_flag_marker(prefix.clone());
        }
        engine
    }
}

/// Paths of every deferred file in the lesson, for content preloading.
pub fn deferred_paths(spec: &LessonSpec) -> Vec<String> {
    fn walk(node: &NodeSpec, path: &str, out: &mut Vec<String>) {
        match &node.children {
            Some(children) => {
                for (name, child) in children {
                    let child_path = if path == "/" {
                        format!("/{name}")
                    } else {
                        format!("{path}/{name}")
                    };
                    walk(child, &child_path, out);
                }
            },
            None if node.deferred => out.push(path.to_string()),
            None => {},
        }
    }
    let mut out = Vec::new();
    walk(&spec.root, "/", &mut out);
    out
}
