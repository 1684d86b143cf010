//! # The scanner runtime
//! The runtime executes a [Program] — the transition-table form of a
//! compiled rule tree — against a reader, running every rule's DFA in
//! parallel over the same input and emitting, at each step, the longest
//! accepted prefix (ties go to the earlier rule). Unmatched input is
//! dropped one code point at a time. `^` matches only at the start of a
//! frame, `$` only at end of input; both are zero-width. When a rule with
//! nested rules matches, a nested frame scans the matched text with the
//! child rule list before the outer scan resumes.
//!
//! The implementation lives in `runtime.rs`, which is written against std
//! alone: the [emitter](crate::emit) embeds that file verbatim in generated
//! lexers, so the algorithm here and the algorithm in generated code are
//! the same source text.
//!
//! ## Example
//! ```
//! use weft::{scanner, spec};
//!
//! let spec = spec::parse("/ab/ { }\n/a/ { }\n").unwrap();
//! let program = scanner::compile(&spec.root).unwrap();
//! let mut scanner = scanner::Scanner::new(program, "aab".as_bytes());
//! assert_eq!(scanner.next(0), 1);
//! assert_eq!((scanner.text(), scanner.line(), scanner.column()), ("a", 1, 1));
//! assert_eq!(scanner.next(0), 0);
//! assert_eq!(scanner.text(), "ab");
//! assert_eq!(scanner.next(0), -1);
//! ```

mod runtime;

pub use runtime::{Program, RuleTable, Scanner, StateRow, DEAD};

use crate::dfa::{self, CompileError};
use crate::spec::Rule;

/// Compiles a rule tree straight to an executable [Program]: the
/// parse → NFA → alphabet → DFA pipeline per leaf, assembled into nested
/// transition tables.
pub fn compile(root: &Rule) -> Result<Program, CompileError<'_>> {
    dfa::compile_rule_tree(root).map(|tree| tree.to_program())
}
