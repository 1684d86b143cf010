//! # Regular expressions
//! The rule regexes support concatenation, alternation `|`, grouping `()`,
//! character classes `[...]` with optional `^` negation and `-` ranges, the
//! closures `*`, `+` and `?`, the wildcard `.`, the zero-width anchors `^`
//! and `$`, and escapes (`\` before any ASCII punctuation is that literal;
//! `\a \b \f \n \r \t \v` are the usual control characters). Parentheses
//! group only; there are no capturing semantics.
//!
//! Parsing lives in [crate::parser]; this module holds the [Ast] and the
//! Thompson construction turning it into an [Nfa].
//!
//! ```
//! let ast = weft::parser::regex("a(b|c)*").unwrap();
//! let nfa = ast.to_nfa();
//! assert_eq!(nfa.start(), 0);
//! ```

use crate::nfa::{EdgeKind, Nfa, NfaBuilder};

/// Parse tree of one regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    /// A literal code point.
    Rune(char),
    /// `.`
    Any,
    /// `^`
    Start,
    /// `$`
    End,
    /// `[...]`; intervals are sorted, merged and non-empty unless the class
    /// itself was empty.
    Class { negated: bool, intervals: Vec<(u32, u32)> },
    /// Concatenation of two or more terms.
    Cat(Vec<Ast>),
    /// Alternation of two or more branches.
    Alt(Vec<Ast>),
    Star(Box<Ast>),
    Plus(Box<Ast>),
    Quest(Box<Ast>),
}

/// A partial NFA under construction: where it is entered and where it ends
/// up on success.
#[derive(Debug, Clone, Copy)]
struct Frag {
    start: usize,
    end: usize,
}

impl Ast {
    /// Thompson construction. Every atom gets two fresh nodes joined by one
    /// labeled edge; concatenation splices the second fragment's entry edges
    /// onto the first fragment's end; the closures re-use fragment nodes as
    /// their entry points so ε-chains stay short.
    pub fn to_nfa(&self) -> Nfa {
        let mut builder = NfaBuilder::new();
        let frag = build(&mut builder, self);
        builder.finish(frag.start, frag.end)
    }
}

fn build(b: &mut NfaBuilder, ast: &Ast) -> Frag {
    match ast {
        Ast::Rune(c) => atom(b, EdgeKind::Rune(*c)),
        Ast::Any => atom(b, EdgeKind::Wild),
        Ast::Start => atom(b, EdgeKind::Start),
        Ast::End => atom(b, EdgeKind::End),
        Ast::Class { negated, intervals } => atom(
            b,
            EdgeKind::Class {
                negated: *negated,
                intervals: intervals.clone(),
            },
        ),
        Ast::Cat(items) => {
            let mut iter = items.iter();
            let first_item = iter.next().expect("BUG: empty concatenation");
            let mut acc = build(b, first_item);
            for item in iter {
                let frag = build(b, item);
                b.splice(acc.end, frag.start);
                acc = Frag {
                    start: acc.start,
                    end: frag.end,
                };
            }
            acc
        }
        Ast::Alt(items) => {
            let fork = b.new_node();
            let join = b.new_node();
            for item in items {
                let frag = build(b, item);
                b.new_edge(fork, frag.start, EdgeKind::Nil);
                b.new_edge(frag.end, join, EdgeKind::Nil);
            }
            Frag {
                start: fork,
                end: join,
            }
        }
        Ast::Star(inner) => {
            let frag = build(b, inner);
            let end = b.new_node();
            b.new_edge(frag.end, frag.start, EdgeKind::Nil);
            b.new_edge(frag.end, end, EdgeKind::Nil);
            // Zero traversals allowed: the old end doubles as the entry.
            Frag {
                start: frag.end,
                end,
            }
        }
        Ast::Plus(inner) => {
            let frag = build(b, inner);
            let end = b.new_node();
            b.new_edge(frag.end, frag.start, EdgeKind::Nil);
            b.new_edge(frag.end, end, EdgeKind::Nil);
            // At least one traversal: entry stays at the fragment start.
            Frag {
                start: frag.start,
                end,
            }
        }
        Ast::Quest(inner) => {
            let frag = build(b, inner);
            let start = b.new_node();
            b.new_edge(start, frag.start, EdgeKind::Nil);
            b.new_edge(start, frag.end, EdgeKind::Nil);
            Frag {
                start,
                end: frag.end,
            }
        }
    }
}

fn atom(b: &mut NfaBuilder, kind: EdgeKind) -> Frag {
    let start = b.new_node();
    let end = b.new_node();
    b.new_edge(start, end, kind);
    Frag { start, end }
}
