//! Text processing built-ins: grep, head, tail, wc, sort, uniq.
//!
//! All of these read a named file when one is given and fall back to the
//! piped input of the current pipeline stage otherwise.

use yadika_types::{Result, ShellError};

use crate::commands::read_file_text;
use crate::interpreter::{Command, CommandOutput, CommandRegistry, Environment};

/// Register the text processing set.
pub fn register_text_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(GrepCmd));
    registry.register(Box::new(HeadCmd));
    registry.register(Box::new(TailCmd));
    registry.register(Box::new(WcCmd));
    registry.register(Box::new(SortCmd));
    registry.register(Box::new(UniqCmd));
}

/// Text from the named file, or the stage's piped input when `file` is
/// absent. No file and no piped input reads as empty.
fn read_text_input(cmd: &str, file: Option<&str>, env: &mut Environment<'_>) -> Result<String> {
    match file {
        Some(target) => read_file_text(cmd, target, env),
        None => Ok(env.stdin.clone().unwrap_or_default()),
    }
}

/// Parse an optional `-n N` flag; remaining positional arg is the file.
fn parse_n_flag<'a>(cmd: &str, args: &[&'a str], default: usize) -> Result<(usize, Option<&'a str>)> {
    let mut n = default;
    let mut file = None;
    let mut iter = args.iter();
    while let Some(&arg) = iter.next() {
        if arg == "-n" {
            let value = iter.next().ok_or_else(|| ShellError::MissingOperand {
                cmd: cmd.to_string(),
            })?;
            n = value.parse().map_err(|_| {
                ShellError::Parse(format!("{cmd}: invalid line count '{value}'"))
            })?;
        } else {
            file = Some(arg);
        }
    }
    Ok((n, file))
}

// ---------------------------------------------------------------------------
// grep
// ---------------------------------------------------------------------------

struct GrepCmd;
impl Command for GrepCmd {
    fn name(&self) -> &str {
        "grep"
    }
    fn description(&self) -> &str {
        "Filter lines matching a pattern"
    }
    fn usage(&self) -> &str {
        "grep <pattern> [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let Some(&pattern) = args.first() else {
            return Err(ShellError::MissingOperand {
                cmd: "grep".to_string(),
            });
        };
        let text = read_text_input("grep", args.get(1).copied(), env)?;
        let needle = pattern.to_lowercase();
        let matched: Vec<&str> = text
            .lines()
            .filter(|line| line.to_lowercase().contains(&needle))
            .collect();
        Ok(CommandOutput::text(&matched.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// head / tail
// ---------------------------------------------------------------------------

struct HeadCmd;
impl Command for HeadCmd {
    fn name(&self) -> &str {
        "head"
    }
    fn description(&self) -> &str {
        "Show first N lines"
    }
    fn usage(&self) -> &str {
        "head [-n N] [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let (n, file) = parse_n_flag("head", args, 10)?;
        let text = read_text_input("head", file, env)?;
        let taken: Vec<&str> = text.lines().take(n).collect();
        Ok(CommandOutput::text(&taken.join("\n")))
    }
}

struct TailCmd;
impl Command for TailCmd {
    fn name(&self) -> &str {
        "tail"
    }
    fn description(&self) -> &str {
        "Show last N lines"
    }
    fn usage(&self) -> &str {
        "tail [-n N] [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let (n, file) = parse_n_flag("tail", args, 10)?;
        let text = read_text_input("tail", file, env)?;
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(CommandOutput::text(&lines[start..].join("\n")))
    }
}

// ---------------------------------------------------------------------------
// wc
// ---------------------------------------------------------------------------

struct WcCmd;
impl Command for WcCmd {
    fn name(&self) -> &str {
        "wc"
    }
    fn description(&self) -> &str {
        "Count lines"
    }
    fn usage(&self) -> &str {
        "wc [-l] [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let mut bare = false;
        let mut file = None;
        for &arg in args {
            if arg == "-l" {
                bare = true;
            } else {
                file = Some(arg);
            }
        }
        let text = read_text_input("wc", file, env)?;
        let count = text.lines().count();
        if bare {
            Ok(CommandOutput::line(count.to_string()))
        } else {
            Ok(CommandOutput::line(format!("{count} lines")))
        }
    }
}

// ---------------------------------------------------------------------------
// sort / uniq
// ---------------------------------------------------------------------------

struct SortCmd;
impl Command for SortCmd {
    fn name(&self) -> &str {
        "sort"
    }
    fn description(&self) -> &str {
        "Sort lines"
    }
    fn usage(&self) -> &str {
        "sort [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text_input("sort", args.first().copied(), env)?;
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort_unstable();
        Ok(CommandOutput::text(&lines.join("\n")))
    }
}

struct UniqCmd;
impl Command for UniqCmd {
    fn name(&self) -> &str {
        "uniq"
    }
    fn description(&self) -> &str {
        "Collapse adjacent duplicate lines"
    }
    fn usage(&self) -> &str {
        "uniq [file]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = read_text_input("uniq", args.first().copied(), env)?;
        let mut out: Vec<&str> = Vec::new();
        for line in text.lines() {
            if out.last() != Some(&line) {
                out.push(line);
            }
        }
        Ok(CommandOutput::text(&out.join("\n")))
    }
}
