//! Textual rwx permission model.
//!
//! Permissions are 9-character strings over `{r,w,x,-}` in three triplets
//! (owner/group/other in display order). Access checks only look at the
//! read bits; group/other distinctions are display-only in this model.

/// Default permissions for a newly created file.
pub const DEFAULT_FILE_PERMS: &str = "rw-r--r--";

/// Default permissions for a newly created directory.
pub const DEFAULT_DIR_PERMS: &str = "rwxr-xr-x";

/// Apply a chmod mode string to a permission string.
///
/// Octal modes (`755`, `644`) replace the whole string; symbolic modes
/// (`+r`, `-x`) set or clear one letter. Anything else is a no-op and
/// returns the current permissions unchanged (lenient failure, not an
/// error).
pub fn apply_chmod(mode: &str, current: &str) -> String {
    if let Some(perms) = apply_octal(mode) {
        return perms;
    }
    if let Some(perms) = apply_symbolic(mode, current) {
        return perms;
    }
    current.to_string()
}

/// Exactly three octal digits; bit 4 = read, 2 = write, 1 = execute.
fn apply_octal(mode: &str) -> Option<String> {
    if mode.chars().count() != 3 {
        return None;
    }
    let mut out = String::with_capacity(9);
    for ch in mode.chars() {
        let digit = ch.to_digit(8)?;
        out.push(if digit & 4 != 0 { 'r' } else { '-' });
        out.push(if digit & 2 != 0 { 'w' } else { '-' });
        out.push(if digit & 1 != 0 { 'x' } else { '-' });
    }
    Some(out)
}

/// `+`/`-` followed by exactly one of `r`, `w`, `x`.
///
/// `r` and `x` act on all three triplets; `w` acts on the owner bit only.
/// That asymmetry is deliberate: deployed lesson content relies on
/// `-w`/`+w` leaving group/other write bits alone, so it is kept and
/// pinned by test rather than normalized.
fn apply_symbolic(mode: &str, current: &str) -> Option<String> {
    let mut chars: Vec<char> = current.chars().collect();
    if chars.len() != 9 {
        return None;
    }
    let rest = mode.strip_prefix(['+', '-'])?;
    let grant = mode.starts_with('+');
    let positions: &[usize] = match rest {
        "r" => &[0, 3, 6],
        "w" => &[1],
        "x" => &[2, 5, 8],
        _ => return None,
    };
    let letter = rest.chars().next()?;
    for &i in positions {
        chars[i] = if grant { letter } else { '-' };
    }
    Some(chars.into_iter().collect())
}

/// Read-access check used by `cat`, `grep`, `head`, `tail`, `wc`.
///
/// Readable iff any of the three read bits (index 0, 3, 6) is `r`.
pub fn is_readable(perms: &str) -> bool {
    let bytes = perms.as_bytes();
    [0usize, 3, 6].iter().any(|&i| bytes.get(i) == Some(&b'r'))
}
