//! # weft parser
//! The regular-expression grammar of rule bodies:
//!
//! ```text
//! Expr    := Cat ( '|' Cat )*
//! Cat     := Closure+
//! Closure := Term ( '*' | '+' | '?' )?
//! Term    := '(' Expr ')' | '.' | '^' | '$' | '[' Class ']' | Char
//! Class   := '^'? Item*
//! Item    := Char ( '-' Char )?     # '-' first or last is a literal
//! Char    := non-meta code point | '\' (punctuation | a b f n r t v)
//! ```
//!
//! Parsing produces a [crate::regex::Ast]; all syntax that parses is valid
//! input for the Thompson construction. Errors are classified by
//! [RegexErrorKind] so diagnostics can say what actually went wrong
//! (`weft: rule at line 7: closure with nothing to repeat`), rather than
//! where a combinator gave up.
//!
//! ```
//! use weft::parser::{self, RegexErrorKind};
//! assert!(parser::regex("a(b|c)*d").is_ok());
//! assert_eq!(parser::regex("a(bc").unwrap_err().kind, RegexErrorKind::UnmatchedParen);
//! assert_eq!(parser::regex("*a").unwrap_err().kind, RegexErrorKind::BareClosure);
//! ```

mod regex;

use crate::regex::Ast;
use nom::error::{ErrorKind, ParseError};
use nom::{combinator::all_consuming, Finish};
use std::fmt;
use thiserror::Error;

/// Classification of a regex syntax error.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegexErrorKind {
    #[error("unmatched parenthesis")]
    UnmatchedParen,
    #[error("unmatched bracket")]
    UnmatchedBracket,
    #[error("closure with nothing to repeat")]
    BareClosure,
    #[error("bad character range")]
    BadRange,
    #[error("bad escape sequence")]
    BadEscape,
    #[error("malformed regular expression")]
    Syntax,
}

/// A regex syntax error: the classified kind plus the remaining input at the
/// point of failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexError<'a> {
    pub input: &'a str,
    pub kind: RegexErrorKind,
}

impl fmt::Display for RegexError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for RegexError<'_> {}

impl<'a> ParseError<&'a str> for RegexError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        RegexError {
            input,
            kind: RegexErrorKind::Syntax,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

/// Parses a regular expression according to the grammar above. The whole
/// input must be consumed.
pub fn regex(input: &str) -> Result<Ast, RegexError> {
    all_consuming(regex::full_regex)(input)
        .finish()
        .map(|(_, ast)| ast)
        .map_err(classify_leftover)
}

/// `all_consuming` reports leftover input as a generic error; an unconsumed
/// closing delimiter tells us which bracket was actually unmatched.
fn classify_leftover(mut error: RegexError) -> RegexError {
    if error.kind == RegexErrorKind::Syntax {
        match error.input.chars().next() {
            Some(')') => error.kind = RegexErrorKind::UnmatchedParen,
            Some(']') => error.kind = RegexErrorKind::UnmatchedBracket,
            _ => {}
        }
    }
    error
}
