//! Native REPL entry point.
//!
//! Drives the shell engine from stdin/stdout the way the web terminal
//! drives it from keystrokes: one submitted line per prompt, new log
//! lines printed after each submission, engine events emitted as JSON.
//! Lesson JSON comes from the first CLI argument or `YADIKA_LESSON`;
//! deferred content is served from the `YADIKA_CONTENT` directory.

mod fetcher;

use std::io::{BufRead, Write};

use anyhow::Result;
use yadika_lesson::{LessonSpec, demo_lesson};
use yadika_shell::{ContentFetcher, MemoryFetcher};
use yadika_types::LineKind;

use fetcher::DirFetcher;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Lesson from CLI arg, YADIKA_LESSON env var, or the built-in demo.
    let lesson_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("YADIKA_LESSON").ok());
    let spec = match &lesson_path {
        Some(path) => LessonSpec::from_file(path)?,
        None => demo_lesson(),
    };
    log::info!("starting lesson '{}' as {}@{}", spec.level, spec.user, spec.hostname);

    let fetcher: Box<dyn ContentFetcher> = match std::env::var("YADIKA_CONTENT") {
        Ok(root) => {
            log::info!("serving deferred content from {root}");
            Box::new(DirFetcher::new(root))
        },
        Err(_) => Box::new(MemoryFetcher::new()),
    };

    let mut session = spec.build_session();
    let mut engine = spec.build_engine(fetcher);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut printed = 0;
    printed += print_new_lines(&session.output_log()[printed..]);

    loop {
        write!(
            stdout,
            "{}@{}:{}$ ",
            session.var("USER").unwrap_or("guest"),
            session.var("HOSTNAME").unwrap_or("yadika"),
            session.cwd()
        )?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line == "exit" || line == "quit" {
            break;
        }

        let events = engine.submit(&mut session, line);

        // Clearing shrinks the log; start over from the top.
        printed = printed.min(session.output_log().len());
        printed += print_new_lines(&session.output_log()[printed..]);

        for event in events {
            println!("event: {}", serde_json::to_string(&event)?);
        }
    }

    Ok(())
}

/// Print lines the terminal has not shown yet, skipping the input echo
/// (the learner just typed it). Returns how many lines were consumed.
fn print_new_lines(lines: &[yadika_types::TerminalLine]) -> usize {
    for line in lines {
        match line.kind {
            LineKind::Input => {},
            LineKind::Error => eprintln!("{}", line.text),
            _ => println!("{}", line.text),
        }
    }
    lines.len()
}
