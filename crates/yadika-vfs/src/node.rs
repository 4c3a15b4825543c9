//! Immutable file/directory tree with copy-on-write updates.
//!
//! The whole tree hangs off one `Rc<FsNode>` root. Lookups walk borrowed
//! children; updates rebuild only the spine from the root to the touched
//! path and share every untouched subtree with the previous snapshot.
//! A snapshot handed out once is never mutated afterwards, so anything
//! still holding it (an old session view, a pending fetch) stays valid.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::perms::{DEFAULT_DIR_PERMS, DEFAULT_FILE_PERMS};

/// Owner of nodes the engine materializes on its own (intermediate
/// directories created on write).
const DEFAULT_OWNER: &str = "root";

/// Body of a file node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Loaded text body.
    Text(String),
    /// Not yet loaded; the lazy content loader fills it on first read.
    Deferred,
}

/// One node of the virtual filesystem tree.
///
/// Files carry content, directories carry children; the enum makes any
/// other combination unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsNode {
    File {
        content: FileContent,
        permissions: String,
        owner: String,
    },
    Directory {
        children: BTreeMap<String, Rc<FsNode>>,
        permissions: String,
        owner: String,
    },
}

impl FsNode {
    /// A text file with default permissions, owned by root.
    pub fn file(text: impl Into<String>) -> Self {
        FsNode::File {
            content: FileContent::Text(text.into()),
            permissions: DEFAULT_FILE_PERMS.to_string(),
            owner: DEFAULT_OWNER.to_string(),
        }
    }

    /// A file whose body is fetched lazily on first read.
    pub fn deferred_file() -> Self {
        FsNode::File {
            content: FileContent::Deferred,
            permissions: DEFAULT_FILE_PERMS.to_string(),
            owner: DEFAULT_OWNER.to_string(),
        }
    }

    /// An empty directory with default permissions, owned by root.
    pub fn dir() -> Self {
        FsNode::Directory {
            children: BTreeMap::new(),
            permissions: DEFAULT_DIR_PERMS.to_string(),
            owner: DEFAULT_OWNER.to_string(),
        }
    }

    /// Same node with different permissions.
    pub fn with_permissions(self, permissions: impl Into<String>) -> Self {
        match self {
            FsNode::File { content, owner, .. } => FsNode::File {
                content,
                permissions: permissions.into(),
                owner,
            },
            FsNode::Directory { children, owner, .. } => FsNode::Directory {
                children,
                permissions: permissions.into(),
                owner,
            },
        }
    }

    /// Same node with a different owner.
    pub fn with_owner(self, owner: impl Into<String>) -> Self {
        match self {
            FsNode::File {
                content,
                permissions,
                ..
            } => FsNode::File {
                content,
                permissions,
                owner: owner.into(),
            },
            FsNode::Directory {
                children,
                permissions,
                ..
            } => FsNode::Directory {
                children,
                permissions,
                owner: owner.into(),
            },
        }
    }

    /// Same file with its body replaced; directories come back unchanged
    /// (callers check the kind first).
    pub fn with_content(self, content: FileContent) -> Self {
        match self {
            FsNode::File {
                permissions, owner, ..
            } => FsNode::File {
                content,
                permissions,
                owner,
            },
            dir => dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FsNode::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FsNode::File { .. })
    }

    pub fn permissions(&self) -> &str {
        match self {
            FsNode::File { permissions, .. } | FsNode::Directory { permissions, .. } => permissions,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            FsNode::File { owner, .. } | FsNode::Directory { owner, .. } => owner,
        }
    }

    /// Children of a directory, `None` for files.
    pub fn children(&self) -> Option<&BTreeMap<String, Rc<FsNode>>> {
        match self {
            FsNode::Directory { children, .. } => Some(children),
            FsNode::File { .. } => None,
        }
    }

    /// Content of a file, `None` for directories.
    pub fn content(&self) -> Option<&FileContent> {
        match self {
            FsNode::File { content, .. } => Some(content),
            FsNode::Directory { .. } => None,
        }
    }
}

/// Handle on the current tree snapshot.
///
/// Cloning a `Vfs` (or keeping the result of [`Vfs::root`]) captures a
/// snapshot; [`Vfs::update`] swaps in a rebuilt root and leaves every
/// previously captured snapshot untouched.
#[derive(Debug, Clone)]
pub struct Vfs {
    root: Rc<FsNode>,
}

impl Vfs {
    /// An empty tree: just the root directory.
    pub fn new() -> Self {
        Self {
            root: Rc::new(FsNode::dir()),
        }
    }

    /// Wrap a fully built tree (lesson seeding).
    pub fn from_root(root: FsNode) -> Self {
        Self {
            root: Rc::new(root),
        }
    }

    /// The current root snapshot.
    pub fn root(&self) -> Rc<FsNode> {
        Rc::clone(&self.root)
    }

    /// Look up a node by pre-resolved absolute path.
    ///
    /// Segments are matched literally (resolution happens before lookup).
    /// `None` when any segment is missing or a non-final segment is a file.
    pub fn node(&self, path: &str) -> Option<&FsNode> {
        let mut current: &FsNode = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match current {
                FsNode::Directory { children, .. } => {
                    current = children.get(segment)?.as_ref();
                },
                FsNode::File { .. } => return None,
            }
        }
        Some(current)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    /// Copy-on-write update of the node at `path`.
    ///
    /// The updater sees the existing node (or `None`) and returns its
    /// replacement; missing intermediate segments are materialized as
    /// default directories on the way down. Only the spine from the root
    /// to `path` is copied; every sibling subtree is shared with the
    /// previous snapshot.
    pub fn update<F>(&mut self, path: &str, f: F)
    where
        F: FnOnce(Option<&FsNode>) -> FsNode,
    {
        log::debug!("updating node at {path}");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.root = Rc::new(rebuild(&self.root, &segments, f));
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

fn rebuild<F>(node: &FsNode, segments: &[&str], f: F) -> FsNode
where
    F: FnOnce(Option<&FsNode>) -> FsNode,
{
    let Some((name, rest)) = segments.split_first() else {
        return f(Some(node));
    };

    // Walking into a file replaces it with a fresh directory shell. The
    // command layer rejects that case first, so built-ins never hit it.
    let (mut children, permissions, owner) = match node {
        FsNode::Directory {
            children,
            permissions,
            owner,
        } => (children.clone(), permissions.clone(), owner.clone()),
        FsNode::File { .. } => {
            log::warn!("update path crosses a file node, replacing it with a directory");
            (
                BTreeMap::new(),
                DEFAULT_DIR_PERMS.to_string(),
                DEFAULT_OWNER.to_string(),
            )
        },
    };

    let new_child = match children.get(*name) {
        Some(child) => rebuild(child, rest, f),
        None => attach_missing(rest, f),
    };
    children.insert((*name).to_string(), Rc::new(new_child));

    FsNode::Directory {
        children,
        permissions,
        owner,
    }
}

/// Build the missing tail of an update path: default directories down to
/// the terminal segment, then whatever the updater makes of `None`.
fn attach_missing<F>(segments: &[&str], f: F) -> FsNode
where
    F: FnOnce(Option<&FsNode>) -> FsNode,
{
    let Some((name, rest)) = segments.split_first() else {
        return f(None);
    };
    let mut children = BTreeMap::new();
    children.insert((*name).to_string(), Rc::new(attach_missing(rest, f)));
    FsNode::Directory {
        children,
        permissions: DEFAULT_DIR_PERMS.to_string(),
        owner: DEFAULT_OWNER.to_string(),
    }
}
