//! Data model for one parsed command line: stages, redirections and the
//! background flag.

use crate::error::ParseError;
use crate::tokenizer::{self, Direction, Redirection};

/// One process to spawn (or one builtin invocation when it is the sole
/// stage): its argv and the redirections attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Program name followed by its arguments.
    pub argv: Vec<String>,
    /// Redirections in rightmost-first order as produced by the extractor.
    pub redirections: Vec<Redirection>,
}

impl Stage {
    /// The effective redirection for a stream: the first match in the list,
    /// which is the rightmost occurrence in the original text.
    pub fn redirection(&self, direction: Direction) -> Option<&Redirection> {
        self.redirections.iter().find(|r| r.direction == direction)
    }
}

/// An ordered sequence of stages connected by pipes, built from one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    /// True when the line carried a trailing unquoted `&`.
    pub background: bool,
}

impl Pipeline {
    /// Parse a fully expanded line into a pipeline.
    ///
    /// A trailing `&` marks the whole pipeline as background and is stripped
    /// before any splitting. Unbalanced quotes anywhere reject the line.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut line = line.trim();
        let mut background = false;
        if let Some(stripped) = line.strip_suffix('&') {
            background = true;
            line = stripped.trim_end();
        }

        let mut stages = Vec::new();
        for segment in tokenizer::split_pipes(line)? {
            let (rest, redirections) = tokenizer::extract_redirections(&segment)?;
            let argv = tokenizer::split_words(&rest)?;
            stages.push(Stage { argv, redirections });
        }
        Ok(Pipeline { stages, background })
    }
}
