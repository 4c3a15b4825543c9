//! Core built-ins: pwd, whoami, ls, cat, chmod, echo, env, printenv,
//! tree, clear.

use yadika_types::{Result, ShellError, TerminalLine};
use yadika_vfs::{FileContent, FsNode, apply_chmod, is_readable, resolve};

use crate::interpreter::{Command, CommandOutput, CommandRegistry, Environment};

/// Register the core built-in set.
pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(Box::new(PwdCmd));
    registry.register(Box::new(WhoamiCmd));
    registry.register(Box::new(LsCmd));
    registry.register(Box::new(CatCmd));
    registry.register(Box::new(ChmodCmd));
    registry.register(Box::new(EchoCmd));
    registry.register(Box::new(EnvCmd));
    registry.register(Box::new(PrintenvCmd));
    registry.register(Box::new(TreeCmd));
    registry.register(Box::new(ClearCmd));
}

/// Read a file's body, materializing deferred content.
///
/// Checks existence, kind, and the read bits before touching content.
/// Error paths carry the path as the learner typed it; only a fetch
/// failure reports the resolved path (the loader does not see the typed
/// form).
pub(crate) fn read_file_text(cmd: &str, target: &str, env: &mut Environment<'_>) -> Result<String> {
    let path = resolve(&env.cwd, target);
    {
        let Some(node) = env.vfs.node(&path) else {
            return Err(ShellError::NotFound {
                cmd: cmd.to_string(),
                path: target.to_string(),
            });
        };
        if node.is_dir() {
            return Err(ShellError::IsADirectory {
                cmd: cmd.to_string(),
                path: target.to_string(),
            });
        }
        if !is_readable(node.permissions()) {
            return Err(ShellError::PermissionDenied {
                cmd: cmd.to_string(),
                path: target.to_string(),
            });
        }
        if let Some(FileContent::Text(text)) = node.content() {
            return Ok(text.clone());
        }
    }
    env.loader.materialize(env.vfs, cmd, &path)
}

// ---------------------------------------------------------------------------
// pwd / whoami
// ---------------------------------------------------------------------------

struct PwdCmd;
impl Command for PwdCmd {
    fn name(&self) -> &str {
        "pwd"
    }
    fn description(&self) -> &str {
        "Print the current directory"
    }
    fn usage(&self) -> &str {
        "pwd"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::line(env.cwd.clone()))
    }
}

struct WhoamiCmd;
impl Command for WhoamiCmd {
    fn name(&self) -> &str {
        "whoami"
    }
    fn description(&self) -> &str {
        "Print the current user"
    }
    fn usage(&self) -> &str {
        "whoami"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::line(env.var("USER").unwrap_or("root")))
    }
}

// ---------------------------------------------------------------------------
// ls
// ---------------------------------------------------------------------------

struct LsCmd;
impl Command for LsCmd {
    fn name(&self) -> &str {
        "ls"
    }
    fn description(&self) -> &str {
        "List directory contents"
    }
    fn usage(&self) -> &str {
        "ls [path] [-a] [-l]"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let mut all = false;
        let mut long = false;
        let mut target = ".";
        for &arg in args {
            if let Some(flags) = arg.strip_prefix('-') {
                // Combined short flags (-la, -al); unknown letters ignored.
                all |= flags.contains('a');
                long |= flags.contains('l');
            } else {
                target = arg;
            }
        }

        let path = resolve(&env.cwd, target);
        let Some(node) = env.vfs.node(&path) else {
            return Err(ShellError::NotFound {
                cmd: "ls".to_string(),
                path: target.to_string(),
            });
        };
        let Some(children) = node.children() else {
            return Err(ShellError::NotADirectory {
                cmd: "ls".to_string(),
                path: target.to_string(),
            });
        };

        let mut lines = Vec::new();
        for (name, child) in children {
            if !all && name.starts_with('.') {
                continue;
            }
            let suffix = if child.is_dir() { "/" } else { "" };
            let text = if long {
                let type_char = if child.is_dir() { 'd' } else { '-' };
                format!(
                    "{type_char}{}  {}  {name}{suffix}",
                    child.permissions(),
                    child.owner()
                )
            } else {
                format!("{name}{suffix}")
            };
            lines.push(TerminalLine::output(text));
        }
        Ok(CommandOutput::Lines(lines))
    }
}

// ---------------------------------------------------------------------------
// cat
// ---------------------------------------------------------------------------

struct CatCmd;
impl Command for CatCmd {
    fn name(&self) -> &str {
        "cat"
    }
    fn description(&self) -> &str {
        "Print file contents"
    }
    fn usage(&self) -> &str {
        "cat <file>"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let Some(&target) = args.first() else {
            return Err(ShellError::MissingOperand {
                cmd: "cat".to_string(),
            });
        };
        let text = read_file_text("cat", target, env)?;
        Ok(CommandOutput::text(&text))
    }
}

// ---------------------------------------------------------------------------
// chmod
// ---------------------------------------------------------------------------

struct ChmodCmd;
impl Command for ChmodCmd {
    fn name(&self) -> &str {
        "chmod"
    }
    fn description(&self) -> &str {
        "Change file permissions"
    }
    fn usage(&self) -> &str {
        "chmod <mode> <file>"
    }
    fn category(&self) -> &str {
        "security"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let (Some(&mode), Some(&target)) = (args.first(), args.get(1)) else {
            return Err(ShellError::MissingOperand {
                cmd: "chmod".to_string(),
            });
        };

        let path = resolve(&env.cwd, target);
        let Some(node) = env.vfs.node(&path).cloned() else {
            return Err(ShellError::NotFound {
                cmd: "chmod".to_string(),
                path: target.to_string(),
            });
        };
        let old = node.permissions().to_string();
        let new = apply_chmod(mode, &old);
        let updated = node.with_permissions(new.clone());
        env.vfs.update(&path, move |_| updated);
        Ok(CommandOutput::line(format!("{target}: {old} -> {new}")))
    }
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Print arguments"
    }
    fn usage(&self) -> &str {
        "echo [args...]"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let expanded: Vec<String> = args.iter().map(|arg| expand(arg, env)).collect();
        Ok(CommandOutput::line(expanded.join(" ")))
    }
}

/// Whole-token variable expansion: `$NAME` and `${NAME}`, empty if unset.
/// Tokens that are not entirely a variable reference stay literal.
fn expand(arg: &str, env: &Environment<'_>) -> String {
    let name = match arg.strip_prefix('$') {
        Some(rest) => match rest.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            Some(inner) => inner,
            None if rest.starts_with('{') => return arg.to_string(),
            None => rest,
        },
        None => return arg.to_string(),
    };
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return arg.to_string();
    }
    env.var(name).unwrap_or_default().to_string()
}

// ---------------------------------------------------------------------------
// env / printenv
// ---------------------------------------------------------------------------

fn env_dump(env: &Environment<'_>) -> CommandOutput {
    // BTreeMap iteration is already key-sorted.
    CommandOutput::Lines(
        env.vars
            .iter()
            .map(|(k, v)| TerminalLine::output(format!("{k}={v}")))
            .collect(),
    )
}

struct EnvCmd;
impl Command for EnvCmd {
    fn name(&self) -> &str {
        "env"
    }
    fn description(&self) -> &str {
        "Print environment variables"
    }
    fn usage(&self) -> &str {
        "env"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(env_dump(env))
    }
}

struct PrintenvCmd;
impl Command for PrintenvCmd {
    fn name(&self) -> &str {
        "printenv"
    }
    fn description(&self) -> &str {
        "Print environment variables"
    }
    fn usage(&self) -> &str {
        "printenv [name]"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        match args.first() {
            Some(&name) => match env.var(name) {
                Some(value) => Ok(CommandOutput::line(value)),
                None => Ok(CommandOutput::None),
            },
            None => Ok(env_dump(env)),
        }
    }
}

// ---------------------------------------------------------------------------
// tree
// ---------------------------------------------------------------------------

struct TreeCmd;
impl Command for TreeCmd {
    fn name(&self) -> &str {
        "tree"
    }
    fn description(&self) -> &str {
        "Show directory tree"
    }
    fn usage(&self) -> &str {
        "tree [path]"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let target = args.first().copied().unwrap_or(".");
        let path = resolve(&env.cwd, target);
        let Some(node) = env.vfs.node(&path) else {
            return Err(ShellError::NotFound {
                cmd: "tree".to_string(),
                path: target.to_string(),
            });
        };
        if !node.is_dir() {
            return Err(ShellError::NotADirectory {
                cmd: "tree".to_string(),
                path: target.to_string(),
            });
        }

        let mut lines = vec![TerminalLine::output(target)];
        let mut dirs = 0usize;
        let mut files = 0usize;
        tree_recursive(node, "", &mut lines, &mut dirs, &mut files);
        lines.push(TerminalLine::output(""));
        lines.push(TerminalLine::output(format!(
            "{dirs} directories, {files} files"
        )));
        Ok(CommandOutput::Lines(lines))
    }
}

fn tree_recursive(
    node: &FsNode,
    prefix: &str,
    lines: &mut Vec<TerminalLine>,
    dirs: &mut usize,
    files: &mut usize,
) {
    let Some(children) = node.children() else {
        return;
    };
    let visible: Vec<_> = children
        .iter()
        .filter(|(name, _)| !name.starts_with('.'))
        .collect();
    let last_index = visible.len().saturating_sub(1);
    for (i, (name, child)) in visible.into_iter().enumerate() {
        let connector = if i == last_index { "└── " } else { "├── " };
        let suffix = if child.is_dir() { "/" } else { "" };
        lines.push(TerminalLine::output(format!(
            "{prefix}{connector}{name}{suffix}"
        )));
        if child.is_dir() {
            *dirs += 1;
            let extension = if i == last_index { "    " } else { "│   " };
            tree_recursive(child, &format!("{prefix}{extension}"), lines, dirs, files);
        } else {
            *files += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// clear
// ---------------------------------------------------------------------------

struct ClearCmd;
impl Command for ClearCmd {
    fn name(&self) -> &str {
        "clear"
    }
    fn description(&self) -> &str {
        "Clear the terminal"
    }
    fn usage(&self) -> &str {
        "clear"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Clear)
    }
}
