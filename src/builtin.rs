//! Commands executed inside the interpreter's own process.
//!
//! A builtin is recognized only when the whole line parsed to exactly one
//! stage. A line with a pipe never treats `cd`, `exit` or `prompt` as a
//! builtin, even as the piped program name; the orchestrator then execs the
//! name like any external program. Builtins never fork and are never seen
//! by the job controller.

use crate::pipeline::Stage;
use crate::session::Session;
use std::env;
use std::path::PathBuf;

/// Run the stage as a builtin if its program name is one. Returns false when
/// the name is not a builtin so the caller can hand it to the orchestrator.
/// Usage errors are reported on stderr and leave the session untouched.
pub fn try_run(stage: &Stage, session: &mut Session) -> bool {
    let Some(name) = stage.argv.first() else {
        return false;
    };
    match name.as_str() {
        "exit" => session.terminate = true,
        "cd" => run_cd(&stage.argv[1..], session),
        "prompt" => run_prompt(&stage.argv[1..], session),
        _ => return false,
    }
    true
}

/// `cd <dir>`: exactly one argument. `-` changes to the previously recorded
/// directory. On a successful change (and on any attempted `-` change) the
/// directory before the change becomes the new previous directory.
fn run_cd(args: &[String], session: &mut Session) {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match args {
        [] => eprintln!("pipesh: missing argument for cd"),
        [target] if target == "-" => {
            if env::set_current_dir(&session.previous_dir).is_err() {
                eprintln!("pipesh: unable to change to previous directory");
            }
            session.previous_dir = cwd;
        }
        [target] => {
            if env::set_current_dir(target).is_err() {
                eprintln!("pipesh: unable to change to directory {target}");
            } else {
                session.previous_dir = cwd;
            }
        }
        _ => eprintln!("pipesh: too many arguments for cd"),
    }
}

/// `prompt <format>`: exactly one argument, stored verbatim. The escape
/// sequences are interpreted at render time, not validated here.
fn run_prompt(args: &[String], session: &mut Session) {
    match args {
        [format] => session.prompt_format = format.clone(),
        [] => eprintln!("pipesh: missing argument for prompt"),
        _ => eprintln!("pipesh: too many arguments for prompt"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(argv: &[&str]) -> Stage {
        Stage {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            redirections: Vec::new(),
        }
    }

    #[test]
    fn exit_sets_the_terminate_flag_only() {
        let mut session = Session::new();
        assert!(try_run(&stage(&["exit"]), &mut session));
        assert!(session.terminate);
    }

    #[test]
    fn unknown_names_are_not_builtins() {
        let mut session = Session::new();
        assert!(!try_run(&stage(&["ls"]), &mut session));
        assert!(!try_run(&stage(&[]), &mut session));
    }

    #[test]
    fn prompt_replaces_the_format_verbatim() {
        let mut session = Session::new();
        assert!(try_run(&stage(&["prompt", "\\u@\\w$ "]), &mut session));
        assert_eq!(session.prompt_format, "\\u@\\w$ ");
    }

    #[test]
    fn prompt_arity_errors_leave_the_format_alone() {
        let mut session = Session::new();
        try_run(&stage(&["prompt"]), &mut session);
        try_run(&stage(&["prompt", "a", "b"]), &mut session);
        assert_eq!(session.prompt_format, "> ");
    }

    #[test]
    fn cd_arity_errors_leave_the_session_alone() {
        let mut session = Session::new();
        let before = session.previous_dir.clone();
        try_run(&stage(&["cd"]), &mut session);
        try_run(&stage(&["cd", "a", "b"]), &mut session);
        assert_eq!(session.previous_dir, before);
    }

    #[test]
    fn cd_to_missing_directory_leaves_the_session_alone() {
        let mut session = Session::new();
        let before = session.previous_dir.clone();
        try_run(&stage(&["cd", "/definitely/not/a/real/dir"]), &mut session);
        assert_eq!(session.previous_dir, before);
    }

    // The one test that changes the process working directory; kept as a
    // single function so concurrent tests never observe a half-made move.
    #[test]
    fn cd_dash_toggles_between_the_last_two_directories() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let first_path = first.path().canonicalize().unwrap();
        let second_path = second.path().canonicalize().unwrap();

        let start = env::current_dir().unwrap();
        let mut session = Session::new();

        try_run(&stage(&["cd", first_path.to_str().unwrap()]), &mut session);
        try_run(&stage(&["cd", second_path.to_str().unwrap()]), &mut session);
        assert_eq!(session.previous_dir, first_path);

        try_run(&stage(&["cd", "-"]), &mut session);
        assert_eq!(env::current_dir().unwrap(), first_path);
        assert_eq!(session.previous_dir, second_path);

        try_run(&stage(&["cd", "-"]), &mut session);
        assert_eq!(env::current_dir().unwrap(), second_path);
        assert_eq!(session.previous_dir, first_path);

        env::set_current_dir(start).unwrap();
    }
}
