//! Command substitution: every unquoted `$( ... )` span is replaced by the
//! captured output of the inner command line before the line is otherwise
//! parsed.
//!
//! Expansion is a fixpoint loop over an owned buffer: one substitution is
//! resolved per pass and the result is re-scanned from the start, because a
//! splice can introduce or shift further `$(` occurrences.

use crate::error::ParseError;
use crate::exec;
use crate::session::Session;
use std::fs;

/// A located `$( ... )` span: char offsets of the `$` and of the closing
/// `)`, plus the text between the parentheses.
#[derive(Debug, PartialEq, Eq)]
struct Substitution {
    start: usize,
    close: usize,
    inner: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleQuote,
    DoubleQuote,
    /// Saw `$`, deciding whether `(` follows.
    Dollar,
    Inner,
    InnerSingleQuote,
    InnerDoubleQuote,
}

/// Expand every command substitution in the line and return the final text.
///
/// The inner command runs as a foreground line with its output redirected
/// into a private capture file; the capture is read back only after the
/// foreground wait has completed. Captured newlines become spaces and
/// trailing whitespace is dropped, so `$(echo 1)2` splices to `12`.
pub fn expand_line(line: &str, session: &mut Session) -> anyhow::Result<String> {
    let mut text = line.to_string();
    loop {
        let Some(substitution) = find_substitution(&text)? else {
            return Ok(text);
        };
        let captured = capture_output(&substitution.inner, session)?;
        log::debug!("substituted $({}) -> {captured:?}", substitution.inner);

        let chars: Vec<char> = text.chars().collect();
        let mut spliced: String = chars[..substitution.start].iter().collect();
        spliced.push_str(&captured);
        spliced.extend(&chars[substitution.close + 1..]);
        text = spliced;
    }
}

/// Find the first unquoted `$( ... )` span, quote-tracking the inner text so
/// an unquoted `)` is required to close it.
fn find_substitution(line: &str) -> Result<Option<Substitution>, ParseError> {
    let chars: Vec<char> = line.chars().collect();
    let mut state = ScanState::Normal;
    let mut start = 0;
    let mut inner = String::new();

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match state {
            ScanState::Normal => match ch {
                '\'' => state = ScanState::SingleQuote,
                '"' => state = ScanState::DoubleQuote,
                '$' => {
                    start = i;
                    state = ScanState::Dollar;
                }
                _ => {}
            },
            ScanState::SingleQuote => {
                if ch == '\'' {
                    state = ScanState::Normal;
                }
            }
            ScanState::DoubleQuote => {
                if ch == '"' {
                    state = ScanState::Normal;
                }
            }
            ScanState::Dollar => {
                if ch == '(' {
                    state = ScanState::Inner;
                } else {
                    // Not a substitution; re-examine this char outside one.
                    state = ScanState::Normal;
                    continue;
                }
            }
            ScanState::Inner => match ch {
                '\'' => {
                    inner.push(ch);
                    state = ScanState::InnerSingleQuote;
                }
                '"' => {
                    inner.push(ch);
                    state = ScanState::InnerDoubleQuote;
                }
                ')' => {
                    return Ok(Some(Substitution {
                        start,
                        close: i,
                        inner,
                    }));
                }
                c => inner.push(c),
            },
            ScanState::InnerSingleQuote => {
                inner.push(ch);
                if ch == '\'' {
                    state = ScanState::Inner;
                }
            }
            ScanState::InnerDoubleQuote => {
                inner.push(ch);
                if ch == '"' {
                    state = ScanState::Inner;
                }
            }
        }
        i += 1;
    }

    match state {
        ScanState::Normal | ScanState::Dollar => Ok(None),
        ScanState::SingleQuote | ScanState::DoubleQuote => Err(ParseError::UnbalancedQuote),
        ScanState::Inner => Err(ParseError::UnterminatedSubstitution),
        ScanState::InnerSingleQuote | ScanState::InnerDoubleQuote => {
            Err(ParseError::UnbalancedQuote)
        }
    }
}

/// Run the inner text as a foreground command line with stdout captured,
/// then return the capture with newlines flattened to spaces and trailing
/// whitespace trimmed.
fn capture_output(inner: &str, session: &mut Session) -> anyhow::Result<String> {
    let capture = tempfile::NamedTempFile::new()?;
    let line = format!("{inner} > {}", capture.path().display());
    exec::run_line(&line, session)?;

    let text = fs::read_to_string(capture.path())?;
    let text = text.replace('\n', " ");
    Ok(text.trim_end().to_string())
}
