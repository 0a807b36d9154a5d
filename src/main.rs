use anyhow::Result;
use argh::FromArgs;
use log::LevelFilter;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use pipesh::session::Session;
use pipesh::{exec, expand, jobs, prompt};

#[derive(FromArgs)]
/// A small interactive command interpreter with pipes, redirection and
/// command substitution.
struct Options {
    /// suppress the prompt (batch mode)
    #[argh(switch, short = 't')]
    terse: bool,

    /// enable debug logging on stderr
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let options: Options = argh::from_env();

    let level = if options.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    // The only startup failure that is fatal to the interpreter.
    jobs::install_sigchld_handler()?;

    let mut session = Session::new();
    let mut editor = DefaultEditor::new()?;

    while !session.terminate {
        jobs::reap_background(&mut session);

        let rendered = if options.terse {
            String::new()
        } else {
            prompt::render(&session.prompt_format)
        };

        match editor.readline(&rendered) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if let Err(err) = run(line, &mut session) {
                    eprintln!("pipesh: {err}");
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                session.terminate = true;
            }
            Err(err) => {
                eprintln!("pipesh: {err}");
                session.terminate = true;
            }
        }
    }

    print!("{}", prompt::RESET);
    Ok(())
}

/// One full line: expand substitutions, then parse and execute.
fn run(line: &str, session: &mut Session) -> Result<()> {
    let expanded = expand::expand_line(line, session)?;
    exec::run_line(&expanded, session)
}
