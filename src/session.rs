use nix::unistd::Pid;
use std::env;
use std::path::PathBuf;

/// Process-wide interpreter state.
///
/// Created once at startup and threaded explicitly through builtins and the
/// job controller; there is no global mutable singleton. `previous_dir` backs
/// the `cd -` builtin, `background` holds pids of detached pipelines that
/// still await a non-blocking reap.
#[derive(Debug, Clone)]
pub struct Session {
    /// When set to true, the read loop exits after the current line.
    pub terminate: bool,
    /// Format string rendered before each read; see [`crate::prompt::render`].
    pub prompt_format: String,
    /// The working directory before the most recent `cd` change.
    pub previous_dir: PathBuf,
    /// Pids of background pipeline stages not yet waited on.
    pub background: Vec<Pid>,
}

impl Session {
    /// Build the initial session: default prompt, the starting working
    /// directory recorded as the previous one, no background children.
    pub fn new() -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            terminate: false,
            prompt_format: "> ".to_string(),
            previous_dir: cwd,
            background: Vec::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_defaults() {
        let session = Session::new();
        assert!(!session.terminate);
        assert_eq!(session.prompt_format, "> ");
        assert!(session.background.is_empty());
    }
}
