//!# weft
//!
//! `weft` is a lexer generator. It reads a specification pairing regular
//! expressions with action code and produces a self-contained Rust source
//! file that tokenizes its input by running one DFA per rule in parallel
//! and dispatching the longest match — ties broken by rule order — to that
//! rule's action.
//!
//! ## Pipeline
//!
//! * [spec] reads the specification into a rule tree.
//! * [parser] parses each rule's regex into an AST ([regex::Ast]).
//! * [regex] compiles the AST into an NFA with typed edges ([nfa]) via the
//!   Thompson construction.
//! * [alphabet] computes the regex-local alphabet: literal code points,
//!   disjoint ranges, and the implicit wild element.
//! * [dfa] runs the subset construction over that alphabet, including the
//!   zero-width `^`/`$` transition tables.
//! * [emit] serializes the DFA tree and the action driver into one output
//!   file, embedding the [scanner] runtime verbatim.
//!
//! The [scanner] module is both the contract the generated code satisfies
//! and a directly usable runtime, which is how the test suite exercises the
//! whole pipeline without compiling generated files.
//!
//! ## Usage
//!
//! ```rust
//! use weft::{dfa, emit, scanner, spec};
//!
//! let source = "\
//! /rob/   { println!(\"rob\") }
//! /robot/ { println!(\"robot\") }
//! //
//! fn main() {}
//! ";
//! let spec = spec::parse(source).unwrap();
//!
//! // Run the rules directly...
//! let program = scanner::compile(&spec.root).unwrap();
//! let mut scanner = scanner::Scanner::new(program, "robot rob".as_bytes());
//! assert_eq!(scanner.next(0), 1); // longest match wins
//! assert_eq!(scanner.text(), "robot");
//! assert_eq!(scanner.next(0), 0);
//! assert_eq!(scanner.text(), "rob");
//! assert_eq!(scanner.next(0), -1);
//!
//! // ...or generate the standalone lexer source.
//! let tree = dfa::compile_rule_tree(&spec.root).unwrap();
//! let code = emit::generate(&spec, &tree, &emit::Options::default());
//! assert!(code.contains("fn yyprogram"));
//! assert!(code.contains("fn main() {}"));
//! ```
//!
//! ## Specification format
//!
//! See [spec] for the file format and [parser] for the regex grammar:
//! concatenation, alternation `|`, grouping `()`, classes `[...]` with
//! negation and ranges, closures `*` `+` `?`, the wildcard `.`, the anchors
//! `^` (start of scan) and `$` (end of input), and backslash escapes.

pub mod alphabet;
pub mod dfa;
pub mod emit;
pub mod nfa;
pub mod parser;
pub mod regex;
pub mod scanner;
pub mod spec;

#[cfg(test)]
mod tests;

#[cfg(test)]
mod integration {
    use crate::{scanner, spec};

    #[test]
    fn line_counter_spec_file() {
        let source = include_str!("../tests/files/lc.weft");
        let spec = spec::parse(source).unwrap();
        let program = scanner::compile(&spec.root).unwrap();
        let mut scanner = scanner::Scanner::new(program, "one two three\nfour five six\n".as_bytes());

        let (mut lines, mut chars) = (0, 0);
        loop {
            match scanner.next(0) {
                0 => {
                    lines += 1;
                    chars += 1;
                }
                1 => chars += 1,
                _ => break,
            }
        }
        assert_eq!((lines, chars), (2, 28));
    }
}
