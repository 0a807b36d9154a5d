//! A small interactive command interpreter.
//!
//! One line of input becomes one pipeline of processes connected by pipes,
//! with quote-aware tokenization, input/output redirection, `$( ... )`
//! command substitution and foreground/background job control. The crate is
//! split along the data flow: [`expand`] rewrites the raw line, [`tokenizer`]
//! and [`pipeline`] turn it into stages, [`exec`] forks and wires the
//! processes, [`jobs`] waits on or detaches them, and [`builtin`] intercepts
//! `cd`, `exit` and `prompt` for non-piped lines.

pub mod builtin;
pub mod error;
pub mod exec;
pub mod expand;
pub mod jobs;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod tokenizer;

pub use error::ParseError;
pub use pipeline::{Pipeline, Stage};
pub use session::Session;
