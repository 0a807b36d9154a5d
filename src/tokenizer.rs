//! Quote-aware scanners that cut one raw command line into stages, argv
//! tokens and redirections.
//!
//! Each scanner is a small finite state machine over an immutable input
//! slice producing owned output tokens. Splitting never happens inside a
//! quoted span, and every scanner rejects the whole line when it finishes
//! in a quoted state.

use crate::error::ParseError;

/// Quote tracking shared by the pipe splitter and the redirection extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Normal,
    SingleQuote,
    DoubleQuote,
}

/// Split a line on unquoted `|` into raw stage texts.
///
/// Each segment is trimmed of leading and trailing whitespace; quote
/// characters stay in place for the later scanners. An input with N unquoted
/// separators always yields N+1 segments.
pub fn split_pipes(line: &str) -> Result<Vec<String>, ParseError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut state = QuoteState::Normal;

    for ch in line.chars() {
        match state {
            QuoteState::Normal => match ch {
                '|' => {
                    segments.push(current.trim().to_string());
                    current.clear();
                }
                '\'' => {
                    state = QuoteState::SingleQuote;
                    current.push(ch);
                }
                '"' => {
                    state = QuoteState::DoubleQuote;
                    current.push(ch);
                }
                c => current.push(c),
            },
            QuoteState::SingleQuote => {
                if ch == '\'' {
                    state = QuoteState::Normal;
                }
                current.push(ch);
            }
            QuoteState::DoubleQuote => {
                if ch == '"' {
                    state = QuoteState::Normal;
                }
                current.push(ch);
            }
        }
    }

    if state != QuoteState::Normal {
        return Err(ParseError::UnbalancedQuote);
    }
    segments.push(current.trim().to_string());
    Ok(segments)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordState {
    Between,
    InWord,
    SingleQuote,
    DoubleQuote,
}

/// Split a stage text into argv tokens on runs of whitespace.
///
/// Quoted spans join the current token with the quote characters stripped.
/// A token built from a quoted span keeps the whitespace the user quoted;
/// a token that was never quoted is whitespace-trimmed.
pub fn split_words(text: &str) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut state = WordState::Between;

    for ch in text.chars() {
        match state {
            WordState::Between => match ch {
                '\'' => {
                    quoted = true;
                    state = WordState::SingleQuote;
                }
                '"' => {
                    quoted = true;
                    state = WordState::DoubleQuote;
                }
                c if c.is_whitespace() => {}
                c => {
                    current.push(c);
                    state = WordState::InWord;
                }
            },
            WordState::InWord => match ch {
                '\'' => {
                    quoted = true;
                    state = WordState::SingleQuote;
                }
                '"' => {
                    quoted = true;
                    state = WordState::DoubleQuote;
                }
                c if c.is_whitespace() => {
                    words.push(finish_word(&mut current, &mut quoted));
                    state = WordState::Between;
                }
                c => current.push(c),
            },
            WordState::SingleQuote => {
                if ch == '\'' {
                    state = WordState::InWord;
                } else {
                    current.push(ch);
                }
            }
            WordState::DoubleQuote => {
                if ch == '"' {
                    state = WordState::InWord;
                } else {
                    current.push(ch);
                }
            }
        }
    }

    match state {
        WordState::SingleQuote | WordState::DoubleQuote => {
            return Err(ParseError::UnbalancedQuote);
        }
        WordState::InWord => words.push(finish_word(&mut current, &mut quoted)),
        WordState::Between => {}
    }
    Ok(words)
}

fn finish_word(current: &mut String, quoted: &mut bool) -> String {
    let word = std::mem::take(current);
    let word = if *quoted {
        word
    } else {
        word.trim().to_string()
    };
    *quoted = false;
    word
}

/// Which standard stream a redirection replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// One `< target` or `> target` extracted from a stage text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub direction: Direction,
    pub target: String,
}

/// Extract every redirection from a stage text.
///
/// The text is scanned right to left, outside quotes, for `<` or `>`. Each
/// match consumes the operator and everything up to the previous end of
/// text as one redirection, truncates the stage text there and continues
/// leftward. The returned list is therefore ordered rightmost first, so the
/// first entry of a given direction is the one that wins when the same
/// stream is redirected twice. Returns the shortened command text together
/// with the redirections.
pub fn extract_redirections(text: &str) -> Result<(String, Vec<Redirection>), ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut redirections = Vec::new();
    let mut end = chars.len();
    let mut state = QuoteState::Normal;

    for i in (0..chars.len()).rev() {
        match state {
            QuoteState::Normal => match chars[i] {
                '<' | '>' => {
                    let direction = if chars[i] == '<' {
                        Direction::Input
                    } else {
                        Direction::Output
                    };
                    let target: String = chars[i + 1..end].iter().collect();
                    redirections.push(Redirection {
                        direction,
                        target: target.trim().to_string(),
                    });
                    end = i;
                }
                // Scanning backwards, so this is the closing quote of a span.
                '\'' => state = QuoteState::SingleQuote,
                '"' => state = QuoteState::DoubleQuote,
                _ => {}
            },
            QuoteState::SingleQuote => {
                if chars[i] == '\'' {
                    state = QuoteState::Normal;
                }
            }
            QuoteState::DoubleQuote => {
                if chars[i] == '"' {
                    state = QuoteState::Normal;
                }
            }
        }
    }

    if state != QuoteState::Normal {
        return Err(ParseError::UnbalancedQuote);
    }
    let remaining: String = chars[..end].iter().collect();
    Ok((remaining, redirections))
}
