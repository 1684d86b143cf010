//! # Deterministic finite automata
//! Subset construction over the per-regex [alphabet](crate::alphabet): one
//! outbound transition per single, per range, plus the wild fall-through and
//! the zero-width `^`/`$` transitions. A DFA state is the ε-closure of a set
//! of NFA nodes, keyed by its bitset for deduplication; the all-zero set is
//! the *dead* state, which is excluded from the state array and shows up as
//! `None` destinations (`-1` in emitted tables).
//!
//! Construction is a plain worklist to fixpoint:
//! * the initial state is the ε-closure of the (renumbered) start node;
//! * a single `c` probes every edge with `c` itself;
//! * a range probes with its lower bound — sound because the alphabet is
//!   refined until no edge can distinguish two points of one range;
//! * the wild element can only be matched by `Wild` edges and negated
//!   classes (every class interval is covered by singles and ranges);
//! * `^`/`$` transitions come from `Start`/`End` edges alone.
//!
//! A state accepts iff its set contains the NFA's accept node. Re-running
//! the construction on the same NFA reproduces the same DFA, which the test
//! suite leans on.

use crate::alphabet::Alphabet;
use crate::nfa::{dot_label, EdgeKind, Nfa};
use crate::parser::{self, RegexError};
use crate::spec::Rule;
use crate::scanner::{Program, RuleTable, StateRow};
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::fmt::Write;

/// A compiled DFA for one regex. State 0 is the initial state; the dead
/// state is not materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    pub(crate) states: Vec<DfaState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaState {
    pub accept: bool,
    /// The constituent NFA nodes, for diagnostics and DOT output.
    pub set: Vec<usize>,
    /// Transitions per single, in ascending code-point order.
    pub runes: Vec<(char, Option<usize>)>,
    /// Transitions per range, in alphabet order.
    pub ranges: Vec<((u32, u32), Option<usize>)>,
    /// Fall-through for code points outside the alphabet.
    pub wild: Option<usize>,
    /// Zero-width `^` transition.
    pub start: Option<usize>,
    /// Zero-width `$` transition.
    pub end: Option<usize>,
}

/// What a subset-construction edge is probed with.
#[derive(Clone, Copy)]
enum Probe {
    Char(u32),
    Wild,
    Start,
    End,
}

impl Dfa {
    /// Runs the subset construction. The NFA is reachability-pruned and
    /// renumbered first, so orphaned concatenation nodes never widen the
    /// bitsets.
    pub fn from_nfa(nfa: &Nfa) -> Dfa {
        let nfa = nfa.compact();
        let alphabet = Alphabet::of(&nfa);
        let n = nfa.nodes().len();

        let mut keys: HashMap<Vec<bool>, Option<usize>> = HashMap::new();
        // The empty set is the dead state.
        keys.insert(vec![false; n], None);
        let mut sets: Vec<Vec<bool>> = Vec::new();
        let mut worklist: VecDeque<usize> = VecDeque::new();

        let mut init = vec![false; n];
        nfa.close(nfa.start(), &mut init);
        intern(init, &mut keys, &mut sets, &mut worklist);

        let mut states = Vec::new();
        while let Some(id) = worklist.pop_front() {
            debug_assert_eq!(id, states.len(), "states are built in id order");
            let set = sets[id].clone();

            let mut runes = Vec::with_capacity(alphabet.singles.len());
            for &c in &alphabet.singles {
                let dest = step_set(&nfa, &set, Probe::Char(c as u32));
                runes.push((c, intern(dest, &mut keys, &mut sets, &mut worklist)));
            }
            let mut ranges = Vec::with_capacity(alphabet.ranges.len());
            for &(lo, hi) in &alphabet.ranges {
                let dest = step_set(&nfa, &set, Probe::Char(lo));
                ranges.push(((lo, hi), intern(dest, &mut keys, &mut sets, &mut worklist)));
            }
            let wild = intern(
                step_set(&nfa, &set, Probe::Wild),
                &mut keys,
                &mut sets,
                &mut worklist,
            );
            let start = intern(
                step_set(&nfa, &set, Probe::Start),
                &mut keys,
                &mut sets,
                &mut worklist,
            );
            let end = intern(
                step_set(&nfa, &set, Probe::End),
                &mut keys,
                &mut sets,
                &mut worklist,
            );

            states.push(DfaState {
                accept: set[nfa.accept()],
                set: set
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &b)| b.then_some(i))
                    .collect(),
                runes,
                ranges,
                wild,
                start,
                end,
            });
        }

        debug!(
            "subset construction: {} NFA nodes -> {} DFA states",
            n,
            states.len()
        );
        Dfa { states }
    }

    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    /// Converts to the transition-table form the scanner runtime executes
    /// and the emitter serializes. `nest` is left empty; the caller wires up
    /// the rule tree.
    pub fn to_table(&self) -> RuleTable {
        RuleTable {
            acc: self.states.iter().map(|s| s.accept).collect(),
            trans: self
                .states
                .iter()
                .map(|s| StateRow {
                    runes: s.runes.iter().map(|&(c, d)| (c, opt_i32(d))).collect(),
                    ranges: s
                        .ranges
                        .iter()
                        .map(|&((lo, hi), d)| (lo, hi, opt_i32(d)))
                        .collect(),
                    wild: opt_i32(s.wild),
                })
                .collect(),
            startf: self.states.iter().map(|s| opt_i32(s.start)).collect(),
            endf: self.states.iter().map(|s| opt_i32(s.end)).collect(),
            nest: Vec::new(),
        }
    }

    /// Renders the DFA as a Graphviz digraph named `name`, for the
    /// `--dfadot` debugging output.
    pub fn to_dot(&self, name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {name} {{");
        let _ = writeln!(out, "    rankdir=LR;");
        let _ = writeln!(out, "    node [shape=circle];");
        for (idx, state) in self.states.iter().enumerate() {
            if state.accept {
                let _ = writeln!(out, "    {idx} [shape=doublecircle];");
            }
            let mut edge = |to: Option<usize>, label: String| {
                if let Some(to) = to {
                    let _ = writeln!(out, "    {idx} -> {to} [label=\"{label}\"];");
                }
            };
            for &(c, to) in &state.runes {
                edge(to, dot_label(&EdgeKind::Rune(c)));
            }
            for &((lo, hi), to) in &state.ranges {
                edge(
                    to,
                    dot_label(&EdgeKind::Class {
                        negated: false,
                        intervals: vec![(lo, hi)],
                    }),
                );
            }
            edge(state.wild, "any".to_string());
            edge(state.start, "^".to_string());
            edge(state.end, "$".to_string());
        }
        out.push_str("}\n");
        out
    }
}

fn opt_i32(dest: Option<usize>) -> i32 {
    dest.map_or(-1, |d| d as i32)
}

/// Registers a state set, handing out ids in discovery order. The empty set
/// maps to the dead state (`None`); new sets are queued for expansion.
fn intern(
    key: Vec<bool>,
    keys: &mut HashMap<Vec<bool>, Option<usize>>,
    sets: &mut Vec<Vec<bool>>,
    worklist: &mut VecDeque<usize>,
) -> Option<usize> {
    if let Some(&id) = keys.get(&key) {
        return id;
    }
    let id = sets.len();
    sets.push(key.clone());
    worklist.push_back(id);
    keys.insert(key, Some(id));
    Some(id)
}

/// The destination set for one alphabet element: every edge out of the
/// current set that the probe matches, ε-closed.
fn step_set(nfa: &Nfa, set: &[bool], probe: Probe) -> Vec<bool> {
    let mut out = vec![false; set.len()];
    for (idx, &present) in set.iter().enumerate() {
        if !present {
            continue;
        }
        for edge in nfa.nodes()[idx].edges() {
            if probe_matches(&edge.kind, probe) {
                nfa.close(edge.to, &mut out);
            }
        }
    }
    out
}

fn probe_matches(kind: &EdgeKind, probe: Probe) -> bool {
    match (kind, probe) {
        (EdgeKind::Rune(c), Probe::Char(p)) => *c as u32 == p,
        (EdgeKind::Wild, Probe::Char(_)) => true,
        (EdgeKind::Class { negated, intervals }, Probe::Char(p)) => {
            in_intervals(intervals, p) != *negated
        }
        (EdgeKind::Wild, Probe::Wild) => true,
        // The wild element lies outside every inserted interval, so a
        // negated class always matches it and a plain class never does.
        (EdgeKind::Class { negated, .. }, Probe::Wild) => *negated,
        (EdgeKind::Start, Probe::Start) => true,
        (EdgeKind::End, Probe::End) => true,
        _ => false,
    }
}

fn in_intervals(intervals: &[(u32, u32)], p: u32) -> bool {
    intervals.iter().any(|&(lo, hi)| lo <= p && p <= hi)
}

/// A regex failed to compile; `line` is the rule's id line in the
/// specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError<'a> {
    pub line: usize,
    pub source: RegexError<'a>,
}

impl std::fmt::Display for CompileError<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule at line {}: {}", self.line, self.source)
    }
}

impl std::error::Error for CompileError<'_> {}

/// The compiled counterpart of a [Rule]: its automata plus the compiled
/// children, in rule order. The root carries no automata of its own.
#[derive(Debug, Clone)]
pub struct RuleDfa {
    pub nfa: Option<Nfa>,
    pub dfa: Option<Dfa>,
    pub nest: Vec<RuleDfa>,
}

/// Compiles every regex of a rule tree: parse, Thompson construction,
/// subset construction, recursively over the children.
pub fn compile_rule_tree(rule: &Rule) -> Result<RuleDfa, CompileError<'_>> {
    let (nfa, dfa) = if rule.regex.is_empty() {
        (None, None)
    } else {
        let ast = parser::regex(&rule.regex).map_err(|source| CompileError {
            line: rule.id,
            source,
        })?;
        let nfa = ast.to_nfa();
        let dfa = Dfa::from_nfa(&nfa);
        (Some(nfa), Some(dfa))
    };
    let mut nest = Vec::with_capacity(rule.kids.len());
    for kid in &rule.kids {
        nest.push(compile_rule_tree(kid)?);
    }
    Ok(RuleDfa { nfa, dfa, nest })
}

impl RuleDfa {
    /// Assembles the runtime [Program] for a compiled *root* rule.
    pub fn to_program(&self) -> Program {
        Program {
            rules: self.nest.iter().map(RuleDfa::to_rule_table).collect(),
        }
    }

    fn to_rule_table(&self) -> RuleTable {
        let mut table = self
            .dfa
            .as_ref()
            .expect("BUG: non-root rule without a DFA")
            .to_table();
        table.nest = self.nest.iter().map(RuleDfa::to_rule_table).collect();
        table
    }
}
