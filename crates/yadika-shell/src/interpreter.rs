//! Command trait, registry, and the pipeline/redirection executor.
//!
//! A submitted line is split on unquoted `|` into stages; each stage is
//! resolved through the lesson hooks first, then the `cd`/`help` special
//! cases, then the registry. Stage output threads into the next stage as
//! implicit stdin; `>`/`>>` at the end of the line writes the final
//! output into a VFS file. Errors never cross the submit boundary: every
//! failure becomes one error-kind terminal line and the session stays
//! usable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use yadika_types::{Result, ShellError, TerminalLine};
use yadika_vfs::{FileContent, FsNode, Vfs, resolve, split_parent};

use crate::flag::FlagDetector;
use crate::loader::{ContentFetcher, ContentLoader};
use crate::session::ShellSession;
use crate::tutorial::TutorialMachine;

/// Output produced by one command invocation.
#[derive(Debug, Clone)]
pub enum CommandOutput {
    /// Ordered terminal lines; also the next pipeline stage's stdin.
    Lines(Vec<TerminalLine>),
    /// Command produced no visible output.
    None,
    /// Signal to wipe the session's output log.
    Clear,
}

impl CommandOutput {
    /// One output-kind line per line of `text`.
    pub fn text(text: &str) -> Self {
        CommandOutput::Lines(text.lines().map(TerminalLine::output).collect())
    }

    /// A single output-kind line.
    pub fn line(text: impl Into<String>) -> Self {
        CommandOutput::Lines(vec![TerminalLine::output(text)])
    }
}

/// Mutable environment passed to every command invocation.
pub struct Environment<'a> {
    /// Current working directory (absolute VFS path).
    pub cwd: String,
    /// The session's VFS; mutations become the new snapshot.
    pub vfs: &'a mut Vfs,
    /// Session environment variables.
    pub vars: &'a std::collections::BTreeMap<String, String>,
    /// Piped input from the previous pipeline stage.
    pub stdin: Option<String>,
    /// Resolves deferred file bodies.
    pub loader: &'a ContentLoader,
}

impl Environment<'_> {
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// A single built-in command.
pub trait Command {
    /// The command name (what the learner types).
    fn name(&self) -> &str;

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string (e.g. "ls \[path\] \[-a\] \[-l\]").
    fn usage(&self) -> &str;

    /// Category for grouping in `help` output.
    fn category(&self) -> &str {
        "general"
    }

    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput>;
}

/// Lesson-supplied command resolver, consulted before every built-in.
///
/// Returning `Some` handles the stage outright; `None` passes to the next
/// hook and finally to the dispatcher. Lessons use this to add fictional
/// commands (`nmap`, `sqlmap`, ...) or shadow a built-in for narrative.
pub trait LessonHook {
    fn intercept(
        &self,
        cmd: &str,
        args: &[&str],
        env: &mut Environment<'_>,
    ) -> Option<CommandOutput>;
}

/// Registry of built-in commands.
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(Box::as_ref)
    }

    /// Sorted (name, description) pairs of registered commands.
    pub fn list_commands(&self) -> Vec<(&str, &str)> {
        let mut cmds: Vec<(&str, &str)> = self
            .commands
            .values()
            .map(|c| (c.name(), c.description()))
            .collect();
        cmds.sort_by_key(|(name, _)| *name);
        cmds
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Usage text grouped by category, identical on every invocation.
    fn help_output(&self) -> CommandOutput {
        use std::collections::BTreeMap;

        let mut categories: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
        // Dispatcher-level commands that live outside the registry.
        categories
            .entry("filesystem")
            .or_default()
            .push(("cd", "Change the current directory"));
        categories
            .entry("general")
            .or_default()
            .push(("help", "Show this help"));
        for cmd in self.commands.values() {
            categories
                .entry(cmd.category())
                .or_default()
                .push((cmd.name(), cmd.description()));
        }

        let total: usize = categories.values().map(Vec::len).sum();
        let mut lines = vec![TerminalLine::output(format!("Commands ({total}):"))];
        for (category, mut cmds) in categories {
            cmds.sort_by_key(|(name, _)| *name);
            lines.push(TerminalLine::output(format!("  [{category}]")));
            for (name, desc) in cmds {
                lines.push(TerminalLine::output(format!("    {name:10} {desc}")));
            }
        }
        lines.push(TerminalLine::output(
            "Type '<command>' to run it; pipe with | and redirect with > or >>.",
        ));
        CommandOutput::Lines(lines)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Event exposed to the embedding UI after a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A new flag token appeared in command output.
    FlagFound { flag: String },
    /// A tutorial step's predicate passed.
    StepCompleted { step: usize },
    /// The tutorial reached its terminal step.
    TutorialComplete,
}

enum StageOutcome {
    Done(CommandOutput),
    ChangeDir(String),
}

/// The shell engine: dispatch machinery without session state.
///
/// One engine serves one lesson instance; all mutable lesson state lives
/// in the [`ShellSession`] passed to [`submit`](Self::submit).
pub struct ShellEngine {
    registry: CommandRegistry,
    hooks: Vec<Box<dyn LessonHook>>,
    loader: ContentLoader,
    flags: FlagDetector,
    tutorial: Option<TutorialMachine>,
}

impl ShellEngine {
    /// Engine with the full built-in set, fetching deferred content for
    /// `level` through `fetcher`.
    pub fn new(level: impl Into<String>, fetcher: Box<dyn ContentFetcher>) -> Self {
        let mut registry = CommandRegistry::new();
        crate::commands::register_builtins(&mut registry);
        crate::text_commands::register_text_commands(&mut registry);
        Self {
            registry,
            hooks: Vec::new(),
            loader: ContentLoader::new(level, fetcher),
            flags: FlagDetector::default(),
            tutorial: None,
        }
    }

    /// Replace the flag marker prefix (default `yadika{`).
    pub fn set_flag_marker(&mut self, prefix: impl Into<String>) {
        self.flags = FlagDetector::new(prefix);
    }

    /// Add a lesson hook. Hooks run in registration order, before every
    /// built-in including `cd`.
    pub fn add_hook(&mut self, hook: Box<dyn LessonHook>) {
        self.hooks.push(hook);
    }

    pub fn set_tutorial(&mut self, tutorial: TutorialMachine) {
        self.tutorial = Some(tutorial);
    }

    pub fn tutorial(&self) -> Option<&TutorialMachine> {
        self.tutorial.as_ref()
    }

    /// Registry access for lessons that register extra real commands.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    /// Execute one submitted line against a session.
    ///
    /// Appends the echoed input and all produced lines to the session's
    /// output log and returns the events this submission raised. Never
    /// fails: any error is rendered as an error-kind line.
    pub fn submit(&mut self, session: &mut ShellSession, line: &str) -> Vec<EngineEvent> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        log::debug!("submit: {trimmed}");
        session.history.push(trimmed.to_string());

        let mut events = Vec::new();
        // `clear` bypasses the echo-then-output flow entirely.
        if trimmed == "clear" {
            session.output_log.clear();
        } else {
            session.output_log.push(TerminalLine::input(trimmed));
            let (lines, clear) = self.run_line(session, trimmed);
            if clear {
                session.output_log.clear();
            } else {
                for line in &lines {
                    for flag in self.flags.scan(&line.text) {
                        log::info!("flag found: {flag}");
                        events.push(EngineEvent::FlagFound { flag });
                    }
                }
                session.output_log.extend(lines);
            }
        }

        if let Some(tutorial) = &mut self.tutorial {
            events.extend(tutorial.tick(trimmed, &session.vfs));
        }
        events
    }

    /// Command-name or path completions for the UI's tab handler.
    pub fn completions(&self, session: &ShellSession, partial: &str) -> Vec<String> {
        match partial.rsplit_once(char::is_whitespace) {
            None => {
                let mut names: Vec<String> = self
                    .registry
                    .names()
                    .filter(|name| name.starts_with(partial))
                    .map(str::to_string)
                    .collect();
                for extra in ["cd", "help"] {
                    if extra.starts_with(partial) {
                        names.push(extra.to_string());
                    }
                }
                names.sort();
                names.dedup();
                names
            },
            Some((_, token)) => {
                let (dir_part, name_part) = match token.rsplit_once('/') {
                    Some(("", name)) => ("/", name),
                    Some((dir, name)) => (dir, name),
                    None => (".", token),
                };
                let dir = resolve(&session.cwd, dir_part);
                let Some(children) = session.vfs.node(&dir).and_then(FsNode::children) else {
                    return Vec::new();
                };
                children
                    .iter()
                    .filter(|(name, _)| name.starts_with(name_part))
                    .map(|(name, node)| {
                        if node.is_dir() {
                            format!("{name}/")
                        } else {
                            name.clone()
                        }
                    })
                    .collect()
            },
        }
    }

    /// Run a full line: pipe splitting, stage sequencing, redirection.
    ///
    /// Returns the lines to append plus a clear-log signal. An error-kind
    /// line (or an `Err`) at any stage aborts the rest of the pipeline
    /// and drops a pending redirection.
    fn run_line(&self, session: &mut ShellSession, line: &str) -> (Vec<TerminalLine>, bool) {
        let stages = match split_pipes(line) {
            Ok(stages) => stages,
            Err(e) => return (vec![TerminalLine::error(e.to_string())], false),
        };
        if stages.is_empty() {
            return (Vec::new(), false);
        }

        let last = stages.len() - 1;
        let (last_cmd, redirect) = parse_redirect(&stages[last]);
        let last_cmd = last_cmd.trim().to_string();
        let redirect = redirect.map(|r| (r.path.trim().to_string(), r.append));

        let mut stdin: Option<String> = None;
        let mut current: Vec<TerminalLine> = Vec::new();
        for (i, stage) in stages.iter().enumerate() {
            let cmd_text = if i == last { last_cmd.as_str() } else { stage.as_str() };
            match self.run_stage(session, cmd_text, stdin.take()) {
                Ok(CommandOutput::Lines(lines)) => {
                    if lines.iter().any(TerminalLine::is_error) {
                        return (lines, false);
                    }
                    stdin = Some(
                        lines
                            .iter()
                            .map(|l| l.text.as_str())
                            .collect::<Vec<_>>()
                            .join("\n"),
                    );
                    current = lines;
                },
                Ok(CommandOutput::None) => {
                    current = Vec::new();
                },
                Ok(CommandOutput::Clear) => return (Vec::new(), true),
                Err(e) => return (vec![TerminalLine::error(e.to_string())], false),
            }
        }

        if let Some((target, append)) = redirect {
            if target.is_empty() {
                let e = ShellError::Parse("missing redirect target".to_string());
                return (vec![TerminalLine::error(e.to_string())], false);
            }
            let text = current
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            return match self.write_redirect(session, &target, &text, append) {
                Ok(()) => (Vec::new(), false),
                Err(e) => (vec![TerminalLine::error(e.to_string())], false),
            };
        }

        (current, false)
    }

    /// Run one pipeline stage through the resolver chain: lesson hooks,
    /// then the `cd` and `help` special cases, then the registry.
    fn run_stage(
        &self,
        session: &mut ShellSession,
        stage: &str,
        stdin: Option<String>,
    ) -> Result<CommandOutput> {
        let tokens = tokenize(stage)?;
        let Some((name, rest)) = tokens.split_first() else {
            return Ok(CommandOutput::None);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();

        let outcome = {
            let mut env = Environment {
                cwd: session.cwd.clone(),
                vfs: &mut session.vfs,
                vars: &session.environment,
                stdin,
                loader: &self.loader,
            };

            let mut hooked = None;
            for hook in &self.hooks {
                if let Some(output) = hook.intercept(name, &args, &mut env) {
                    hooked = Some(output);
                    break;
                }
            }

            match hooked {
                Some(output) => StageOutcome::Done(output),
                // cd mutates the session rather than producing lines, so it
                // lives outside the registry.
                None if name == "cd" => {
                    let target = match args.first() {
                        Some(&t) => t.to_string(),
                        None => env.var("HOME").unwrap_or("/").to_string(),
                    };
                    let path = resolve(&env.cwd, &target);
                    match env.vfs.node(&path) {
                        None => {
                            return Err(ShellError::NotFound {
                                cmd: "cd".to_string(),
                                path: target,
                            });
                        },
                        Some(node) if !node.is_dir() => {
                            return Err(ShellError::NotADirectory {
                                cmd: "cd".to_string(),
                                path: target,
                            });
                        },
                        Some(_) => StageOutcome::ChangeDir(path),
                    }
                },
                // help needs the registry, which commands cannot see.
                None if name == "help" => StageOutcome::Done(self.registry.help_output()),
                None => match self.registry.get(name) {
                    Some(cmd) => StageOutcome::Done(cmd.execute(&args, &mut env)?),
                    None => return Err(ShellError::UnknownCommand(name.clone())),
                },
            }
        };

        match outcome {
            StageOutcome::Done(output) => Ok(output),
            StageOutcome::ChangeDir(path) => {
                session
                    .environment
                    .insert("PWD".to_string(), path.clone());
                session.cwd = path;
                Ok(CommandOutput::None)
            },
        }
    }

    /// Write pipeline output into a VFS file, creating it if absent.
    ///
    /// The target must end as a file: writing onto an existing directory,
    /// or through a file in the middle of the path, is an error and
    /// leaves the VFS untouched.
    fn write_redirect(
        &self,
        session: &mut ShellSession,
        target: &str,
        text: &str,
        append: bool,
    ) -> Result<()> {
        let path = resolve(&session.cwd, target);
        if let Some(node) = session.vfs.node(&path)
            && node.is_dir()
        {
            return Err(ShellError::IsADirectory {
                cmd: "redirect".to_string(),
                path: target.to_string(),
            });
        }
        if let Some((parent, _)) = split_parent(&path) {
            let mut prefix = String::new();
            for segment in parent.split('/').filter(|s| !s.is_empty()) {
                prefix.push('/');
                prefix.push_str(segment);
                if let Some(node) = session.vfs.node(&prefix)
                    && !node.is_dir()
                {
                    return Err(ShellError::NotADirectory {
                        cmd: "redirect".to_string(),
                        path: prefix,
                    });
                }
            }
        }

        let body = if append {
            match session.vfs.node(&path).and_then(FsNode::content) {
                Some(FileContent::Text(existing)) if !existing.is_empty() => {
                    format!("{existing}\n{text}")
                },
                _ => text.to_string(),
            }
        } else {
            text.to_string()
        };

        let owner = session
            .environment
            .get("USER")
            .cloned()
            .unwrap_or_else(|| "root".to_string());
        session.vfs.update(&path, move |existing| match existing {
            Some(node) if node.is_file() => node.clone().with_content(FileContent::Text(body)),
            _ => FsNode::file(body).with_owner(owner),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tokenizer: single quotes, double quotes, and backslash escapes.
// ---------------------------------------------------------------------------

/// Tokenize a stage respecting quotes and backslash escapes.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            if ch == '"' {
                in_double = false;
            } else if ch == '\\' {
                match chars.next() {
                    Some(next @ ('"' | '\\')) => current.push(next),
                    Some(next) => {
                        current.push('\\');
                        current.push(next);
                    },
                    None => current.push('\\'),
                }
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '\'' => in_single = true,
                '"' => in_double = true,
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                },
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                },
                _ => current.push(ch),
            }
        }
    }

    if in_single {
        return Err(ShellError::Parse("unterminated single quote".to_string()));
    }
    if in_double {
        return Err(ShellError::Parse("unterminated double quote".to_string()));
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Pipe splitting
// ---------------------------------------------------------------------------

/// Split on unquoted `|`, trimming each stage.
pub fn split_pipes(input: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            current.push(ch);
            if ch == '\'' {
                in_single = false;
            }
            continue;
        }
        if in_double {
            current.push(ch);
            if ch == '"' {
                in_double = false;
            } else if ch == '\\'
                && let Some(next) = chars.next()
            {
                current.push(next);
            }
            continue;
        }

        match ch {
            '\'' => {
                in_single = true;
                current.push(ch);
            },
            '"' => {
                in_double = true;
                current.push(ch);
            },
            '\\' => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            },
            '|' => {
                segments.push(current.trim().to_string());
                current.clear();
            },
            _ => current.push(ch),
        }
    }

    let remaining = current.trim().to_string();
    if !remaining.is_empty() {
        segments.push(remaining);
    } else if !segments.is_empty() {
        return Err(ShellError::Parse("missing command after |".to_string()));
    }

    Ok(segments)
}

// ---------------------------------------------------------------------------
// Redirection parsing
// ---------------------------------------------------------------------------

pub(crate) struct Redirect<'a> {
    pub path: &'a str,
    pub append: bool,
}

/// Find the rightmost unquoted `>` or `>>` and split the stage there.
pub(crate) fn parse_redirect(input: &str) -> (&str, Option<Redirect<'_>>) {
    let bytes = input.as_bytes();
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;
    let mut last_redirect: Option<(usize, bool)> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if in_single {
            if b == b'\'' {
                in_single = false;
            }
        } else if in_double {
            if b == b'"' {
                in_double = false;
            } else if b == b'\\' {
                i += 1;
            }
        } else {
            match b {
                b'\'' => in_single = true,
                b'"' => in_double = true,
                b'\\' => i += 1,
                b'>' => {
                    if i + 1 < bytes.len() && bytes[i + 1] == b'>' {
                        last_redirect = Some((i, true));
                        i += 1;
                    } else {
                        last_redirect = Some((i, false));
                    }
                },
                _ => {},
            }
        }
        i += 1;
    }

    match last_redirect {
        Some((pos, append)) => {
            let skip = if append { 2 } else { 1 };
            (
                &input[..pos],
                Some(Redirect {
                    path: &input[pos + skip..],
                    append,
                }),
            )
        },
        None => (input, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::loader::MemoryFetcher;
    use yadika_types::LineKind;

    fn seed_vfs() -> Vfs {
        let mut vfs = Vfs::new();
        vfs.update("/home/guest/secret.txt", |_| {
            FsNode::file("yadika{abc}").with_owner("guest")
        });
        vfs.update("/home/guest/data.txt", |_| {
            FsNode::file("one foo\ntwo\nthree foo\nfour\nfive").with_owner("guest")
        });
        vfs.update("/home/guest/.profile", |_| FsNode::file("export PS1='$ '"));
        vfs.update("/home/guest/docs", |_| FsNode::dir());
        vfs.update("/etc/passwd", |_| FsNode::file("root:x:0:0\nguest:x:1000:1000"));
        vfs
    }

    fn setup() -> (ShellEngine, ShellSession) {
        let session = ShellSession::new(seed_vfs(), "/home/guest", "guest", "yadika");
        let engine = ShellEngine::new("level-1", Box::new(MemoryFetcher::new()));
        (engine, session)
    }

    /// Submit a line and return the produced lines (input echo excluded).
    fn exec(engine: &mut ShellEngine, session: &mut ShellSession, line: &str) -> Vec<TerminalLine> {
        let before = session.output_log().len();
        engine.submit(session, line);
        session.output_log()[before..]
            .iter()
            .filter(|l| l.kind != LineKind::Input)
            .cloned()
            .collect()
    }

    fn texts(lines: &[TerminalLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    // -- tokenizer / parsing --

    #[test]
    fn tokenize_splits_on_whitespace() {
        assert_eq!(tokenize("ls -l  /home").unwrap(), ["ls", "-l", "/home"]);
    }

    #[test]
    fn tokenize_quotes_keep_spaces() {
        assert_eq!(
            tokenize("cat 'my notes.txt'").unwrap(),
            ["cat", "my notes.txt"]
        );
        assert_eq!(tokenize("echo \"a  b\"").unwrap(), ["echo", "a  b"]);
    }

    #[test]
    fn tokenize_backslash_escapes() {
        assert_eq!(tokenize(r"cat my\ file").unwrap(), ["cat", "my file"]);
    }

    #[test]
    fn tokenize_unterminated_quote_is_error() {
        assert!(tokenize("echo 'open").is_err());
        assert!(tokenize("echo \"open").is_err());
    }

    #[test]
    fn split_pipes_respects_quotes() {
        assert_eq!(
            split_pipes("grep 'a|b' f | wc -l").unwrap(),
            ["grep 'a|b' f", "wc -l"]
        );
    }

    #[test]
    fn split_pipes_trailing_pipe_is_error() {
        assert!(split_pipes("ls |").is_err());
    }

    #[test]
    fn parse_redirect_finds_rightmost() {
        let (cmd, redir) = parse_redirect("echo hi > out.txt");
        assert_eq!(cmd.trim(), "echo hi");
        let redir = redir.unwrap();
        assert_eq!(redir.path.trim(), "out.txt");
        assert!(!redir.append);
    }

    #[test]
    fn parse_redirect_append() {
        let (_, redir) = parse_redirect("echo hi >> log.txt");
        let redir = redir.unwrap();
        assert_eq!(redir.path.trim(), "log.txt");
        assert!(redir.append);
    }

    #[test]
    fn parse_redirect_ignores_quoted() {
        let (cmd, redir) = parse_redirect("echo '2 > 1'");
        assert_eq!(cmd, "echo '2 > 1'");
        assert!(redir.is_none());
    }

    // -- dispatch basics --

    #[test]
    fn unknown_command_reports_not_found() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "frobnicate now");
        assert_eq!(texts(&lines), ["frobnicate: command not found"]);
        assert!(lines[0].is_error());
    }

    #[test]
    fn empty_input_produces_nothing() {
        let (mut engine, mut session) = setup();
        let events = engine.submit(&mut session, "   ");
        assert!(events.is_empty());
        assert!(session.output_log().is_empty());
        assert!(session.history().is_empty());
    }

    #[test]
    fn input_line_is_echoed_before_output() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "pwd");
        let log = session.output_log();
        assert_eq!(log[0], TerminalLine::input("pwd"));
        assert_eq!(log[1], TerminalLine::output("/home/guest"));
    }

    #[test]
    fn history_records_submitted_lines() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "pwd");
        engine.submit(&mut session, "nonsense");
        engine.submit(&mut session, "");
        engine.submit(&mut session, "pwd");
        assert_eq!(session.history(), ["pwd", "nonsense", "pwd"]);
    }

    #[test]
    fn clear_wipes_the_log() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "pwd");
        engine.submit(&mut session, "ls");
        assert!(!session.output_log().is_empty());
        engine.submit(&mut session, "clear");
        assert!(session.output_log().is_empty());
        assert_eq!(session.history().last().map(String::as_str), Some("clear"));
    }

    #[test]
    fn clear_through_pipeline_also_wipes() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "pwd");
        engine.submit(&mut session, "pwd | clear");
        assert!(session.output_log().is_empty());
    }

    #[test]
    fn session_stays_usable_after_error() {
        let (mut engine, mut session) = setup();
        exec(&mut engine, &mut session, "cat missing.txt");
        exec(&mut engine, &mut session, "bogus | cat");
        let lines = exec(&mut engine, &mut session, "pwd");
        assert_eq!(texts(&lines), ["/home/guest"]);
    }

    // -- cd --

    #[test]
    fn cd_dotdot_chain_stops_at_root() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "cd ..");
        assert_eq!(session.cwd(), "/home");
        engine.submit(&mut session, "cd ..");
        assert_eq!(session.cwd(), "/");
        let lines = exec(&mut engine, &mut session, "cd ..");
        assert_eq!(session.cwd(), "/");
        assert!(lines.is_empty());
    }

    #[test]
    fn cd_updates_pwd_variable() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "cd /etc");
        assert_eq!(session.cwd(), "/etc");
        assert_eq!(session.var("PWD"), Some("/etc"));
    }

    #[test]
    fn cd_to_missing_path_is_error() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "cd nowhere");
        assert_eq!(texts(&lines), ["cd: nowhere: No such file or directory"]);
        assert_eq!(session.cwd(), "/home/guest");
    }

    #[test]
    fn cd_to_file_is_error() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "cd secret.txt");
        assert_eq!(texts(&lines), ["cd: secret.txt: Not a directory"]);
    }

    #[test]
    fn bare_cd_goes_home_or_root() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "cd /etc");
        engine.submit(&mut session, "cd");
        assert_eq!(session.cwd(), "/");

        session.set_var("HOME", "/home/guest");
        engine.submit(&mut session, "cd");
        assert_eq!(session.cwd(), "/home/guest");
    }

    // -- pipelines --

    #[test]
    fn pipeline_threads_output_to_stdin() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "cat data.txt | grep foo");
        assert_eq!(texts(&lines), ["one foo", "three foo"]);
    }

    #[test]
    fn cat_grep_wc_counts_matches() {
        // Scenario: five lines, two containing "foo".
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "cat data.txt | grep foo | wc -l");
        assert_eq!(texts(&lines), ["2"]);
    }

    #[test]
    fn grep_chain_filters_conjunctively() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "cat data.txt | grep o | grep foo");
        assert_eq!(texts(&lines), ["one foo", "three foo"]);
    }

    #[test]
    fn pipeline_aborts_on_stage_error() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "cat missing.txt | wc -l");
        assert_eq!(
            texts(&lines),
            ["cat: missing.txt: No such file or directory"]
        );
    }

    // -- redirection --

    #[test]
    fn echo_redirect_creates_file() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "echo hello > out.txt");
        assert!(lines.is_empty());
        let lines = exec(&mut engine, &mut session, "cat out.txt");
        assert_eq!(texts(&lines), ["hello"]);

        let node = session.vfs().node("/home/guest/out.txt").unwrap();
        assert!(node.is_file());
        assert_eq!(node.owner(), "guest");
    }

    #[test]
    fn redirect_overwrites_existing_file() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "echo first > f.txt");
        engine.submit(&mut session, "echo second > f.txt");
        let lines = exec(&mut engine, &mut session, "cat f.txt");
        assert_eq!(texts(&lines), ["second"]);
    }

    #[test]
    fn append_redirect_extends_file() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "echo first > f.txt");
        engine.submit(&mut session, "echo second >> f.txt");
        let lines = exec(&mut engine, &mut session, "cat f.txt");
        assert_eq!(texts(&lines), ["first", "second"]);
    }

    #[test]
    fn append_to_missing_file_creates_it() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "echo only >> fresh.txt");
        let lines = exec(&mut engine, &mut session, "cat fresh.txt");
        assert_eq!(texts(&lines), ["only"]);
    }

    #[test]
    fn redirect_of_pipeline_output() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "cat data.txt | grep foo > matches.txt");
        let lines = exec(&mut engine, &mut session, "cat matches.txt");
        assert_eq!(texts(&lines), ["one foo", "three foo"]);
    }

    #[test]
    fn redirect_onto_directory_is_error() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "echo x > docs");
        assert_eq!(texts(&lines), ["redirect: docs: Is a directory"]);
        assert!(session.vfs().node("/home/guest/docs").unwrap().is_dir());
    }

    #[test]
    fn redirect_through_a_file_is_error() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "echo x > secret.txt/inner");
        assert_eq!(
            texts(&lines),
            ["redirect: /home/guest/secret.txt: Not a directory"]
        );
        // The file in the middle was not replaced.
        assert!(session.vfs().node("/home/guest/secret.txt").unwrap().is_file());
    }

    #[test]
    fn redirect_aborts_when_source_errors() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "cat missing.txt > out.txt");
        assert_eq!(
            texts(&lines),
            ["cat: missing.txt: No such file or directory"]
        );
        assert!(!session.vfs().exists("/home/guest/out.txt"));
    }

    #[test]
    fn redirect_without_target_is_error() {
        let (mut engine, mut session) = setup();
        let lines = exec(&mut engine, &mut session, "echo hi >");
        assert_eq!(texts(&lines), ["syntax error: missing redirect target"]);
    }

    #[test]
    fn redirect_into_subdirectory() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "echo deep > docs/note.txt");
        let lines = exec(&mut engine, &mut session, "cat docs/note.txt");
        assert_eq!(texts(&lines), ["deep"]);
    }

    // -- flags --

    #[test]
    fn cat_of_flag_file_fires_event_once() {
        let (mut engine, mut session) = setup();
        let events = engine.submit(&mut session, "cat secret.txt");
        assert_eq!(
            events,
            [EngineEvent::FlagFound {
                flag: "yadika{abc}".to_string()
            }]
        );
        // Same flag again: no second event.
        let events = engine.submit(&mut session, "cat secret.txt");
        assert!(events.is_empty());
    }

    #[test]
    fn denied_cat_does_not_fire_flag() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "chmod 000 secret.txt");
        let before = session.output_log().len();
        let events = engine.submit(&mut session, "cat secret.txt");
        assert!(events.is_empty());
        let produced: Vec<&TerminalLine> = session.output_log()[before..]
            .iter()
            .filter(|l| l.kind != LineKind::Input)
            .collect();
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].text, "cat: secret.txt: Permission denied");
    }

    #[test]
    fn chmod_unlocks_previously_denied_file() {
        let (mut engine, mut session) = setup();
        engine.submit(&mut session, "chmod 000 secret.txt");
        engine.submit(&mut session, "cat secret.txt");
        engine.submit(&mut session, "chmod 644 secret.txt");
        assert_eq!(
            session
                .vfs()
                .node("/home/guest/secret.txt")
                .unwrap()
                .permissions(),
            "rw-r--r--"
        );
        let events = engine.submit(&mut session, "cat secret.txt");
        assert_eq!(
            events,
            [EngineEvent::FlagFound {
                flag: "yadika{abc}".to_string()
            }]
        );
    }

    #[test]
    fn flag_from_echo_also_fires() {
        let (mut engine, mut session) = setup();
        let events = engine.submit(&mut session, "echo yadika{typed}");
        assert_eq!(
            events,
            [EngineEvent::FlagFound {
                flag: "yadika{typed}".to_string()
            }]
        );
    }

    #[test]
    fn custom_flag_marker() {
        let (mut engine, mut session) = setup();
        engine.set_flag_marker("FLAG{");
        let events = engine.submit(&mut session, "echo FLAG{x}");
        assert_eq!(
            events,
            [EngineEvent::FlagFound {
                flag: "FLAG{x}".to_string()
            }]
        );
        assert!(engine.submit(&mut session, "cat secret.txt").is_empty());
    }

    // -- lazy content loading --

    fn setup_with_deferred() -> (ShellEngine, ShellSession, Rc<MemoryFetcher>) {
        let mut vfs = seed_vfs();
        vfs.update("/home/guest/big.log", |_| FsNode::deferred_file());
        let session = ShellSession::new(vfs, "/home/guest", "guest", "yadika");

        let mut fetcher = MemoryFetcher::new();
        fetcher.insert("level-1", "/home/guest/big.log", "alpha\nbeta\ngamma");
        let fetcher = Rc::new(fetcher);
        let engine = ShellEngine::new("level-1", Box::new(Rc::clone(&fetcher)));
        (engine, session, fetcher)
    }

    #[test]
    fn deferred_content_fetched_at_most_once() {
        let (mut engine, mut session, fetcher) = setup_with_deferred();
        let lines = exec(&mut engine, &mut session, "cat big.log");
        assert_eq!(texts(&lines), ["alpha", "beta", "gamma"]);
        assert_eq!(fetcher.fetch_count(), 1);

        exec(&mut engine, &mut session, "cat big.log");
        exec(&mut engine, &mut session, "grep beta big.log");
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[test]
    fn failed_fetch_surfaces_generic_read_error() {
        let mut vfs = seed_vfs();
        vfs.update("/home/guest/ghost.log", |_| FsNode::deferred_file());
        let mut session = ShellSession::new(vfs, "/home/guest", "guest", "yadika");
        let mut engine = ShellEngine::new("level-1", Box::new(MemoryFetcher::new()));

        let lines = exec(&mut engine, &mut session, "cat ghost.log");
        assert_eq!(
            texts(&lines),
            ["cat: /home/guest/ghost.log: could not read file"]
        );
        // Still deferred: a retry may fetch again.
        assert_eq!(
            session.vfs().node("/home/guest/ghost.log").unwrap().content(),
            Some(&FileContent::Deferred)
        );
    }

    // -- lesson hooks --

    struct NmapHook;
    impl LessonHook for NmapHook {
        fn intercept(
            &self,
            cmd: &str,
            args: &[&str],
            _env: &mut Environment<'_>,
        ) -> Option<CommandOutput> {
            if cmd != "nmap" {
                return None;
            }
            let target = args.first().copied().unwrap_or("localhost");
            Some(CommandOutput::Lines(vec![
                TerminalLine::output(format!("Scanning {target}...")),
                TerminalLine::success("22/tcp open ssh"),
            ]))
        }
    }

    struct ShadowPwdHook;
    impl LessonHook for ShadowPwdHook {
        fn intercept(
            &self,
            cmd: &str,
            _args: &[&str],
            _env: &mut Environment<'_>,
        ) -> Option<CommandOutput> {
            (cmd == "pwd").then(|| CommandOutput::line("/nowhere"))
        }
    }

    #[test]
    fn hook_adds_fictional_command() {
        let (mut engine, mut session) = setup();
        engine.add_hook(Box::new(NmapHook));
        let lines = exec(&mut engine, &mut session, "nmap 10.0.0.5");
        assert_eq!(texts(&lines), ["Scanning 10.0.0.5...", "22/tcp open ssh"]);
        assert_eq!(lines[1].kind, LineKind::Success);
    }

    #[test]
    fn hook_shadows_builtin() {
        let (mut engine, mut session) = setup();
        engine.add_hook(Box::new(ShadowPwdHook));
        let lines = exec(&mut engine, &mut session, "pwd");
        assert_eq!(texts(&lines), ["/nowhere"]);
    }

    #[test]
    fn hooks_run_in_registration_order() {
        struct FirstHook(Rc<Cell<bool>>);
        impl LessonHook for FirstHook {
            fn intercept(
                &self,
                cmd: &str,
                _args: &[&str],
                _env: &mut Environment<'_>,
            ) -> Option<CommandOutput> {
                if cmd == "probe" {
                    self.0.set(true);
                    Some(CommandOutput::line("first"))
                } else {
                    None
                }
            }
        }
        struct SecondHook;
        impl LessonHook for SecondHook {
            fn intercept(
                &self,
                cmd: &str,
                _args: &[&str],
                _env: &mut Environment<'_>,
            ) -> Option<CommandOutput> {
                (cmd == "probe").then(|| CommandOutput::line("second"))
            }
        }

        let (mut engine, mut session) = setup();
        let fired = Rc::new(Cell::new(false));
        engine.add_hook(Box::new(FirstHook(Rc::clone(&fired))));
        engine.add_hook(Box::new(SecondHook));
        let lines = exec(&mut engine, &mut session, "probe");
        assert_eq!(texts(&lines), ["first"]);
        assert!(fired.get());
    }

    #[test]
    fn hook_pass_falls_through_to_builtin() {
        let (mut engine, mut session) = setup();
        engine.add_hook(Box::new(NmapHook));
        let lines = exec(&mut engine, &mut session, "pwd");
        assert_eq!(texts(&lines), ["/home/guest"]);
    }

    // -- tutorial integration --

    #[test]
    fn tutorial_events_flow_through_submit() {
        use crate::tutorial::TutorialStep;

        let (mut engine, mut session) = setup();
        engine.set_tutorial(TutorialMachine::new(vec![
            TutorialStep::new("Print the working directory", |line, _| line == "pwd"),
            TutorialStep::new("Create hello.txt", |_, vfs| {
                vfs.exists("/home/guest/hello.txt")
            }),
            TutorialStep::new("Done", |_, _| false),
        ]));

        assert!(engine.submit(&mut session, "ls").is_empty());
        assert_eq!(
            engine.submit(&mut session, "pwd"),
            [EngineEvent::StepCompleted { step: 0 }]
        );
        assert_eq!(
            engine.submit(&mut session, "echo hi > hello.txt"),
            [
                EngineEvent::StepCompleted { step: 1 },
                EngineEvent::TutorialComplete,
            ]
        );
        assert!(engine.tutorial().unwrap().is_complete());
    }

    // -- completions --

    #[test]
    fn completions_suggest_command_names() {
        let (engine, session) = setup();
        let mut names = engine.completions(&session, "c");
        names.sort();
        assert!(names.contains(&"cat".to_string()));
        assert!(names.contains(&"cd".to_string()));
        assert!(names.contains(&"chmod".to_string()));
        assert!(names.contains(&"clear".to_string()));
        assert!(!names.contains(&"ls".to_string()));
    }

    #[test]
    fn completions_suggest_paths_after_command() {
        let (engine, session) = setup();
        let names = engine.completions(&session, "cat se");
        assert_eq!(names, ["secret.txt"]);
        let names = engine.completions(&session, "cd do");
        assert_eq!(names, ["docs/"]);
    }

    #[test]
    fn completions_with_directory_prefix() {
        let (engine, session) = setup();
        let names = engine.completions(&session, "cat /etc/pa");
        assert_eq!(names, ["passwd"]);
    }

    #[test]
    fn event_serialization_shape() {
        let json = serde_json::to_string(&EngineEvent::FlagFound {
            flag: "yadika{x}".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"flag_found","flag":"yadika{x}"}"#);
        assert_eq!(
            serde_json::to_string(&EngineEvent::TutorialComplete).unwrap(),
            r#"{"event":"tutorial_complete"}"#
        );
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn lines_strategy() -> impl Strategy<Value = Vec<String>> {
            proptest::collection::vec("[a-z ]{1,12}", 1..16)
        }

        fn session_over(lines: &[String]) -> (ShellEngine, ShellSession) {
            let mut vfs = Vfs::new();
            vfs.update("/data.txt", |_| FsNode::file(lines.join("\n")));
            let session = ShellSession::new(vfs, "/", "guest", "yadika");
            let engine = ShellEngine::new("level-1", Box::new(MemoryFetcher::new()));
            (engine, session)
        }

        proptest! {
            // A grep chain filters conjunctively, order-preserving.
            #[test]
            fn grep_chain_equals_conjunctive_filter(
                lines in lines_strategy(),
                a in "[a-z]{1,3}",
                b in "[a-z]{1,3}",
            ) {
                let (mut engine, mut session) = session_over(&lines);
                let got = exec(
                    &mut engine,
                    &mut session,
                    &format!("cat data.txt | grep {a} | grep {b}"),
                );
                let want: Vec<&str> = lines
                    .iter()
                    .map(String::as_str)
                    .filter(|l| l.contains(&a) && l.contains(&b))
                    .collect();
                prop_assert_eq!(texts(&got), want);
            }

            #[test]
            fn head_caps_the_line_count(
                lines in lines_strategy(),
                n in 1usize..24,
            ) {
                let (mut engine, mut session) = session_over(&lines);
                let got = exec(
                    &mut engine,
                    &mut session,
                    &format!("cat data.txt | head -n {n} | wc -l"),
                );
                prop_assert_eq!(texts(&got), [lines.len().min(n).to_string()]);
            }

            #[test]
            fn sort_uniq_yields_sorted_distinct_lines(
                lines in lines_strategy(),
            ) {
                let (mut engine, mut session) = session_over(&lines);
                let got = exec(&mut engine, &mut session, "cat data.txt | sort | uniq");
                let mut want: Vec<&str> = lines.iter().map(String::as_str).collect();
                want.sort_unstable();
                want.dedup();
                prop_assert_eq!(texts(&got), want);
            }
        }
    }
}
