//! Prompt-format rendering.
//!
//! Recognized escapes: `\w` working directory, `\u` user name, `\d` date,
//! `\@` 12-hour time, `\A` 24-hour time, `\0`..`\7` ANSI colors. Any other
//! escape renders literally. A failing escape degrades to empty text rather
//! than failing the read loop.

use chrono::Local;
use std::env;

const COLORS: [&str; 8] = [
    "\x1b[0m", "\x1b[31m", "\x1b[32m", "\x1b[34m", "\x1b[33m", "\x1b[35m", "\x1b[36m", "\x1b[37m",
];

/// The ANSI reset sequence, printed once when the interpreter exits.
pub const RESET: &str = "\x1b[0m";

/// Render a prompt format string for display.
pub fn render(format: &str) -> String {
    let mut out = String::new();
    let mut chars = format.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('w') => out.push_str(&working_dir()),
            Some('u') => out.push_str(&user_name()),
            Some('d') => out.push_str(&Local::now().format("%a %b %d").to_string()),
            Some('@') => out.push_str(&Local::now().format("%I:%M %p").to_string()),
            Some('A') => out.push_str(&Local::now().format("%R").to_string()),
            Some(c @ '0'..='7') => out.push_str(COLORS[c as usize - '0' as usize]),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn working_dir() -> String {
    env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn user_name() -> String {
    env::var("USER").or_else(|_| env::var("LOGNAME")).unwrap_or_default()
}
