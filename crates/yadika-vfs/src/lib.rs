//! Virtual file system for the yadika shell engine.
//!
//! Three small pieces, leaves first: purely syntactic path resolution
//! ([`path::resolve`]), an immutable file/directory tree with copy-on-write
//! updates and structural sharing ([`node::Vfs`]), and the textual rwx
//! permission model ([`perms`]). Existence checks, permission checks, and
//! path syntax are deliberately separate concerns.

pub mod node;
pub mod path;
pub mod perms;

pub use node::{FileContent, FsNode, Vfs};
pub use path::{resolve, split_parent};
pub use perms::{DEFAULT_DIR_PERMS, DEFAULT_FILE_PERMS, apply_chmod, is_readable};
