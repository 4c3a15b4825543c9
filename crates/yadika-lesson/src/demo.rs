//! Built-in demo lesson.
//!
//! A small permissions-and-pipes level used by the native REPL when no
//! lesson file is given, and by integration tests as realistic seed data.

use crate::spec::{LessonSpec, NodeSpec};

/// The demo lesson: find the flag behind a chmod-locked file.
pub fn demo_lesson() -> LessonSpec {
    LessonSpec {
        level: "demo".to_string(),
        user: "guest".to_string(),
        hostname: "yadika".to_string(),
        cwd: "/home/guest".to_string(),
        environment: Default::default(),
        flag_prefix: None,
        welcome: vec![
            "Welcome to the yadika demo level.".to_string(),
            "Somewhere in this tree a flag is hidden. Start with 'ls' and 'help'.".to_string(),
        ],
        root: NodeSpec::dir([
            (
                "home",
                NodeSpec::dir([(
                    "guest",
                    NodeSpec::dir([
                        (
                            "readme.txt",
                            NodeSpec::file(
                                "The admin locked vault/flag.txt before leaving.\n\
                                 Perhaps chmod can undo that.",
                            ),
                        ),
                        (
                            "server.log",
                            NodeSpec::file(
                                "INFO boot ok\nWARN disk 81%\nINFO login guest\n\
                                 ERROR backup failed\nINFO login guest\nWARN disk 84%",
                            ),
                        ),
                        (
                            "vault",
                            NodeSpec::dir([(
                                "flag.txt",
                                NodeSpec::file("yadika{chmod-opens-doors}")
                                    .with_permissions("---------"),
                            )]),
                        ),
                        (".bash_history", NodeSpec::file("ls\ncd vault\nls -l")),
                    ]),
                )]),
            ),
            (
                "etc",
                NodeSpec::dir([(
                    "motd",
                    NodeSpec::file("Property of the yadika training range.").with_owner("root"),
                )])
                .with_owner("root"),
            ),
        ]),
    }
}
