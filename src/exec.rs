//! Process orchestration: pipes, forks, file-descriptor wiring and exec.
//!
//! The intended standard-stream wiring of every stage is computed as plain
//! data ([`StageWiring`]) before anything is forked; the child then applies
//! the plan in one step. That keeps the orchestration logic pure and
//! testable apart from actual process creation.

use crate::builtin;
use crate::jobs;
use crate::pipeline::{Pipeline, Stage};
use crate::session::Session;
use crate::tokenizer::Direction;
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::process;

/// Where a stage's standard input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
    /// Keep the interpreter's own stdin.
    Inherit,
    /// Read end of the pipe from the previous stage.
    Pipe(RawFd),
    /// A file named by an input redirection, opened read-only in the child.
    File(String),
}

/// Where a stage's standard output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSink {
    /// Keep the interpreter's own stdout.
    Inherit,
    /// Write end of the pipe to the next stage.
    Pipe(RawFd),
    /// A file named by an output redirection, created/truncated in the child.
    File(String),
}

/// The standard-stream plan for one stage, built before forking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageWiring {
    pub stdin: StreamSource,
    pub stdout: StreamSink,
    /// Pipe ends displaced by an explicit redirection. The child closes
    /// these so the overridden pipe can never carry data or leak.
    pub overridden: Vec<RawFd>,
}

/// Compute the wiring for a stage given its implicit pipe ends.
///
/// An explicit redirection always beats the implicit pipe for the same end;
/// the displaced pipe fd is recorded so the child can close it.
pub fn plan_wiring(stage: &Stage, pipe_in: Option<RawFd>, pipe_out: Option<RawFd>) -> StageWiring {
    let mut overridden = Vec::new();

    let stdin = match stage.redirection(Direction::Input) {
        Some(redirection) => {
            if let Some(fd) = pipe_in {
                overridden.push(fd);
            }
            StreamSource::File(redirection.target.clone())
        }
        None => match pipe_in {
            Some(fd) => StreamSource::Pipe(fd),
            None => StreamSource::Inherit,
        },
    };

    let stdout = match stage.redirection(Direction::Output) {
        Some(redirection) => {
            if let Some(fd) = pipe_out {
                overridden.push(fd);
            }
            StreamSink::File(redirection.target.clone())
        }
        None => match pipe_out {
            Some(fd) => StreamSink::Pipe(fd),
            None => StreamSink::Inherit,
        },
    };

    StageWiring {
        stdin,
        stdout,
        overridden,
    }
}

/// Spawn every stage of a pipeline and return the pids in stage order.
///
/// One pipe connects each adjacent stage pair. A stage that fails to fork
/// (or has an empty argv) contributes no process; its pipe ends are closed
/// so sibling stages see end-of-file instead of blocking forever. The
/// returned list is what the job controller waits on.
pub fn spawn_pipeline(pipeline: &Pipeline) -> anyhow::Result<Vec<Pid>> {
    let n = pipeline.stages.len();

    let mut pipes: Vec<(RawFd, RawFd)> = Vec::with_capacity(n.saturating_sub(1));
    for _ in 0..n.saturating_sub(1) {
        match unistd::pipe() {
            Ok((read, write)) => pipes.push((read.into_raw_fd(), write.into_raw_fd())),
            Err(err) => {
                for (read, write) in &pipes {
                    let _ = unistd::close(*read);
                    let _ = unistd::close(*write);
                }
                return Err(anyhow::anyhow!("unable to create pipe: {err}"));
            }
        }
    }

    let mut pids = Vec::new();
    for (i, stage) in pipeline.stages.iter().enumerate() {
        let pipe_in = (i > 0).then(|| pipes[i - 1].0);
        let pipe_out = (i + 1 < n).then(|| pipes[i].1);

        if stage.argv.is_empty() {
            release_ends(pipe_in, pipe_out);
            continue;
        }

        let wiring = plan_wiring(stage, pipe_in, pipe_out);
        // Converted up front so the child allocates as little as possible
        // between fork and exec.
        let argv = to_cstrings(&stage.argv);

        match unsafe { unistd::fork() } {
            Ok(ForkResult::Child) => child_run(&wiring, &pipes, argv),
            Ok(ForkResult::Parent { child }) => {
                log::debug!("spawned {:?} as pid {child}", stage.argv[0]);
                pids.push(child);
                // These ends now belong exclusively to the child side.
                release_ends(pipe_in, pipe_out);
            }
            Err(err) => {
                eprintln!("pipesh: unable to fork: {err}");
                release_ends(pipe_in, pipe_out);
            }
        }
    }

    Ok(pids)
}

/// Execute one fully expanded line: parse it, run a builtin when the line is
/// a single non-piped stage, otherwise spawn the pipeline and either wait in
/// the foreground or detach it.
pub fn run_line(line: &str, session: &mut Session) -> anyhow::Result<()> {
    let pipeline = Pipeline::parse(line)?;

    if pipeline.stages.len() == 1 && builtin::try_run(&pipeline.stages[0], session) {
        return Ok(());
    }

    let pids = spawn_pipeline(&pipeline)?;
    if pipeline.background {
        jobs::detach(session, &pids);
    } else {
        jobs::wait_foreground(&pids);
    }
    Ok(())
}

fn release_ends(pipe_in: Option<RawFd>, pipe_out: Option<RawFd>) {
    if let Some(fd) = pipe_in {
        let _ = unistd::close(fd);
    }
    if let Some(fd) = pipe_out {
        let _ = unistd::close(fd);
    }
}

fn to_cstrings(argv: &[String]) -> Vec<CString> {
    argv.iter()
        .map(|arg| CString::new(arg.as_str()).unwrap_or_default())
        .collect()
}

/// Child side: apply the wiring plan, close every inherited pipe end, exec.
/// Never returns; every failure path prints to stderr and exits non-zero
/// without reaching exec.
fn child_run(wiring: &StageWiring, pipes: &[(RawFd, RawFd)], argv: Vec<CString>) -> ! {
    match &wiring.stdin {
        StreamSource::Inherit => {}
        StreamSource::Pipe(fd) => dup_onto(*fd, 0),
        StreamSource::File(target) => {
            let file = match File::open(target) {
                Ok(file) => file,
                Err(_) => {
                    eprintln!("pipesh: unable to open file: {target}");
                    process::exit(1);
                }
            };
            dup_onto(file.as_raw_fd(), 0);
            drop(file);
        }
    }

    match &wiring.stdout {
        StreamSink::Inherit => {}
        StreamSink::Pipe(fd) => dup_onto(*fd, 1),
        StreamSink::File(target) => {
            let file = match OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o666)
                .open(target)
            {
                Ok(file) => file,
                Err(_) => {
                    eprintln!("pipesh: unable to open file: {target}");
                    process::exit(1);
                }
            };
            dup_onto(file.as_raw_fd(), 1);
            drop(file);
        }
    }

    // Covers the overridden ends too: every pipe fd the child inherited is
    // closed here, after the dup2 calls above made copies on 0 and 1.
    for (read, write) in pipes {
        let _ = unistd::close(*read);
        let _ = unistd::close(*write);
    }

    let _ = unistd::execvp(&argv[0], &argv);
    eprintln!(
        "pipesh: {}: command not found",
        argv[0].to_string_lossy()
    );
    process::exit(1);
}

fn dup_onto(fd: RawFd, stream: RawFd) {
    if unistd::dup2(fd, stream).is_err() {
        eprintln!("pipesh: unable to redirect standard stream");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{Direction, Redirection};
    use std::fs;

    fn stage(argv: &[&str], redirections: Vec<Redirection>) -> Stage {
        Stage {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            redirections,
        }
    }

    #[test]
    fn sole_stage_inherits_both_streams() {
        let wiring = plan_wiring(&stage(&["ls"], Vec::new()), None, None);
        assert_eq!(wiring.stdin, StreamSource::Inherit);
        assert_eq!(wiring.stdout, StreamSink::Inherit);
        assert!(wiring.overridden.is_empty());
    }

    #[test]
    fn middle_stage_uses_both_pipe_ends() {
        let wiring = plan_wiring(&stage(&["grep", "x"], Vec::new()), Some(3), Some(4));
        assert_eq!(wiring.stdin, StreamSource::Pipe(3));
        assert_eq!(wiring.stdout, StreamSink::Pipe(4));
        assert!(wiring.overridden.is_empty());
    }

    #[test]
    fn redirection_beats_implicit_pipe_and_displaces_it() {
        let redirections = vec![Redirection {
            direction: Direction::Output,
            target: "out.txt".to_string(),
        }];
        let wiring = plan_wiring(&stage(&["echo", "hi"], redirections), Some(3), Some(4));
        assert_eq!(wiring.stdin, StreamSource::Pipe(3));
        assert_eq!(wiring.stdout, StreamSink::File("out.txt".to_string()));
        assert_eq!(wiring.overridden, vec![4]);
    }

    #[test]
    fn input_redirection_displaces_input_pipe() {
        let redirections = vec![Redirection {
            direction: Direction::Input,
            target: "in.txt".to_string(),
        }];
        let wiring = plan_wiring(&stage(&["sort"], redirections), Some(5), None);
        assert_eq!(wiring.stdin, StreamSource::File("in.txt".to_string()));
        assert_eq!(wiring.stdout, StreamSink::Inherit);
        assert_eq!(wiring.overridden, vec![5]);
    }

    #[test]
    fn rightmost_output_redirection_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.txt");
        let second = dir.path().join("b.txt");

        let mut session = Session::new();
        let line = format!("echo hi > {} > {}", first.display(), second.display());
        run_line(&line, &mut session).unwrap();

        assert_eq!(fs::read_to_string(&second).unwrap(), "hi\n");
        // The losing redirection is never opened, so the file is not created.
        assert!(!first.exists());
    }

    #[test]
    fn pipeline_moves_data_between_stages() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("count.txt");

        let mut session = Session::new();
        let line = format!("printf 'a\\nb\\nc\\n' | wc -l > {}", out.display());
        run_line(&line, &mut session).unwrap();

        let counted = fs::read_to_string(&out).unwrap();
        assert_eq!(counted.trim(), "3");
    }

    #[test]
    fn input_redirection_feeds_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let out = dir.path().join("out.txt");
        fs::write(&input, "x y z").unwrap();

        let mut session = Session::new();
        let line = format!("cat < {} > {}", input.display(), out.display());
        run_line(&line, &mut session).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "x y z");
    }

    #[test]
    fn missing_program_does_not_disturb_the_interpreter() {
        let mut session = Session::new();
        run_line("definitely-not-a-real-program-0xf00", &mut session).unwrap();
        assert!(!session.terminate);
    }

    #[test]
    fn piped_builtin_name_is_not_a_builtin() {
        let mut session = Session::new();
        // `exit` through a pipe is handed to exec like any external program
        // and fails as not-found; the interpreter must keep running.
        run_line("exit | cat", &mut session).unwrap();
        assert!(!session.terminate);
    }

    #[test]
    fn background_pipeline_returns_without_waiting() {
        let mut session = Session::new();
        run_line("sleep 0.1 &", &mut session).unwrap();
        assert_eq!(session.background.len(), 1);

        // Foreground-wait the detached pid so the test leaves no zombie.
        let pids = std::mem::take(&mut session.background);
        jobs::wait_foreground(&pids);
    }
}
