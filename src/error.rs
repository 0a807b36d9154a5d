use thiserror::Error;

/// Errors detected while scanning a command line, before anything is spawned.
///
/// A line that fails to parse is rejected as a whole: no process is forked
/// and no session state changes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// A single or double quote was opened but never closed.
    #[error("invalid command line: unbalanced quote")]
    UnbalancedQuote,
    /// A `$(` was opened but the matching unquoted `)` was never found.
    #[error("invalid command line: unterminated command substitution")]
    UnterminatedSubstitution,
}
