//! Purely syntactic path resolution.
//!
//! Resolution never consults the tree: `..` at the root stays at the root,
//! `.` and empty segments vanish, and the result is always a normalized
//! absolute path (leading `/`, no `//`, no trailing slash except root).
//! Whether the result exists is the node store's business.

/// Resolve a target path against the current working directory.
///
/// Absolute targets are normalized through the same segment walk, so
/// `resolve("/home", "/a/../b")` is `/b`.
pub fn resolve(cwd: &str, target: &str) -> String {
    let raw = if target.starts_with('/') {
        target.to_string()
    } else if cwd == "/" {
        format!("/{target}")
    } else {
        format!("{cwd}/{target}")
    };

    let mut stack: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                // Popping past root is a no-op, not an error.
                stack.pop();
            },
            name => stack.push(name),
        }
    }

    if stack.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", stack.join("/"))
    }
}

/// Split a normalized absolute path into (parent, final name).
///
/// Root has no parent and returns `None`.
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(("/", &path[1..])),
        Some(i) => Some((&path[..i], &path[i + 1..])),
        None => None,
    }
}
