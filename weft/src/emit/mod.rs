//! # Code emission
//! The emitter turns a parsed [Spec] and its compiled rule tree into one
//! self-contained Rust source file. The file carries, in order: the scanner
//! runtime (embedded verbatim from this crate's `scanner/runtime.rs`, so
//! generated code executes the very same algorithm the library tests), the
//! transition tables, a lexer struct, the action driver, and the user code
//! passed through from the specification.
//!
//! Emission is deterministic: DFA states appear in index order, rune
//! transitions in ascending code-point order, ranges in alphabet order, and
//! nested tables mirror the rule tree. Generating a spec twice produces
//! byte-identical output.

use crate::dfa::RuleDfa;
use crate::scanner::RuleTable;
use crate::spec::{Rule, Spec};
use log::debug;
use std::fmt::Write;

const RUNTIME: &str = include_str!("../scanner/runtime.rs");

/// Emission options, mapped straight from the CLI surface.
#[derive(Debug, Clone)]
pub struct Options {
    /// Prefix applied to every generated top-level identifier.
    pub prefix: String,
    /// Emit a free driver function instead of the `lex` method.
    pub standalone: bool,
    /// Suppress the default `error` handler.
    pub custom_error: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            prefix: "yy".to_string(),
            standalone: false,
            custom_error: false,
        }
    }
}

/// Generates the complete output file for a compiled specification.
/// `tree` must be the result of [crate::dfa::compile_rule_tree] on
/// `spec.root`.
pub fn generate(spec: &Spec, tree: &RuleDfa, options: &Options) -> String {
    let p = &options.prefix;
    let program = tree.to_program();
    debug!(
        "emitting {} top-level rules (prefix {p:?}, standalone: {})",
        program.rules.len(),
        options.standalone
    );

    let mut out = String::new();
    out.push_str("// Code generated by weft. DO NOT EDIT.\n\n");

    // The runtime, as a module.
    let _ = writeln!(out, "#[allow(dead_code, unused_imports)]");
    let _ = writeln!(out, "mod {p}scan {{");
    out.push_str(RUNTIME);
    out.push_str("}\n\n");

    // The transition tables.
    let _ = writeln!(out, "#[allow(dead_code)]");
    let _ = writeln!(out, "fn {p}program() -> {p}scan::Program {{");
    let _ = writeln!(out, "    use self::{p}scan::{{Program, RuleTable, StateRow}};");
    let _ = writeln!(out, "    Program {{");
    let _ = writeln!(out, "        rules: vec![");
    for rule in &program.rules {
        write_table(&mut out, rule, 3);
    }
    let _ = writeln!(out, "        ],");
    let _ = writeln!(out, "    }}");
    out.push_str("}\n\n");

    // The lexer struct and its accessors.
    let _ = writeln!(out, "#[allow(dead_code, non_camel_case_types)]");
    let _ = writeln!(out, "pub struct {p}Lexer<R: std::io::Read> {{");
    let _ = writeln!(out, "    scanner: {p}scan::Scanner<R>,");
    let _ = writeln!(out, "    started: bool,");
    let _ = writeln!(out, "    finished: bool,");
    out.push_str("}\n\n");

    let _ = writeln!(out, "#[allow(dead_code)]");
    let _ = writeln!(out, "impl<R: std::io::Read> {p}Lexer<R> {{");
    let _ = writeln!(out, "    pub fn new(input: R) -> Self {{");
    let _ = writeln!(out, "        {p}Lexer {{");
    let _ = writeln!(out, "            scanner: {p}scan::Scanner::new({p}program(), input),");
    let _ = writeln!(out, "            started: false,");
    let _ = writeln!(out, "            finished: false,");
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "    /// Text of the most recent match.");
    let _ = writeln!(out, "    pub fn text(&self) -> &str {{ self.scanner.text() }}");
    let _ = writeln!(out, "    /// Line the most recent match began on (1-based).");
    let _ = writeln!(out, "    pub fn line(&self) -> usize {{ self.scanner.line() }}");
    let _ = writeln!(out, "    /// Column the most recent match began on (1-based).");
    let _ = writeln!(out, "    pub fn column(&self) -> usize {{ self.scanner.column() }}");
    let _ = writeln!(out, "    /// Stops the scan; no further tokens are produced.");
    let _ = writeln!(out, "    pub fn cancel(&mut self) {{ self.scanner.cancel() }}");
    out.push_str("}\n\n");

    // The action driver.
    let _ = writeln!(out, "#[allow(dead_code, unused_variables, unreachable_code)]");
    if options.standalone {
        let _ = writeln!(out, "pub fn {p}main<R: std::io::Read>({p}lex: &mut {p}Lexer<R>) {{");
        write_hooks_and_driver(&mut out, spec, p, false);
        out.push_str("}\n\n");
    } else {
        let _ = writeln!(out, "impl<R: std::io::Read> {p}Lexer<R> {{");
        let _ = writeln!(
            out,
            "    /// Scans until an action returns a token code; -1 means end of input."
        );
        let _ = writeln!(out, "    pub fn lex(&mut self) -> i32 {{");
        let _ = writeln!(out, "        let {p}lex = self;");
        write_hooks_and_driver(&mut out, spec, p, true);
        let _ = writeln!(out, "        -1");
        let _ = writeln!(out, "    }}");
        out.push_str("}\n\n");
    }

    if !options.custom_error {
        let _ = writeln!(out, "#[allow(dead_code)]");
        let _ = writeln!(out, "impl<R: std::io::Read> {p}Lexer<R> {{");
        let _ = writeln!(out, "    /// Default error handler.");
        let _ = writeln!(out, "    pub fn error(&mut self, s: &str) {{");
        let _ = writeln!(out, "        panic!(\"{{}}\", s);");
        let _ = writeln!(out, "    }}");
        out.push_str("}\n\n");
    }

    out.push_str(&spec.user_code);
    out
}

/// The top-level hooks around the level-0 dispatch loop. `method` shifts the
/// indentation for the `lex` method body.
fn write_hooks_and_driver(out: &mut String, spec: &Spec, p: &str, method: bool) {
    let ind = if method { 2 } else { 1 };
    if let Some(code) = &spec.root.start_code {
        indent(out, ind);
        let _ = writeln!(out, "if !{p}lex.started {{");
        indent(out, ind + 1);
        let _ = writeln!(out, "{p}lex.started = true;");
        indent(out, ind + 1);
        out.push_str(code);
        out.push('\n');
        indent(out, ind);
        out.push_str("}\n");
    }
    write_driver(out, &spec.root.kids, 0, p, ind);
    if let Some(code) = &spec.root.end_code {
        indent(out, ind);
        let _ = writeln!(out, "if !{p}lex.finished {{");
        indent(out, ind + 1);
        let _ = writeln!(out, "{p}lex.finished = true;");
        indent(out, ind + 1);
        out.push_str(code);
        out.push('\n');
        indent(out, ind);
        out.push_str("}\n");
    }
}

/// The dispatch loop for one frame depth: one arm per rule, nested loops
/// for rules with sub-rules, group hooks guarded against stale re-dispatch.
fn write_driver(out: &mut String, rules: &[Rule], level: usize, p: &str, ind: usize) {
    indent(out, ind);
    let _ = writeln!(out, "'scan{level}: loop {{");
    indent(out, ind + 1);
    let _ = writeln!(out, "match {p}lex.scanner.next({level}) {{");
    for (i, rule) in rules.iter().enumerate() {
        if rule.is_leaf() {
            indent(out, ind + 2);
            let action = if rule.action.is_empty() { "{ }" } else { rule.action.as_str() };
            let _ = writeln!(out, "{i} => {action}");
        } else {
            indent(out, ind + 2);
            let _ = writeln!(out, "{i} => {{");
            if let Some(code) = &rule.start_code {
                indent(out, ind + 3);
                let _ = writeln!(out, "if !{p}lex.scanner.is_stale() {code}");
            }
            write_driver(out, &rule.kids, level + 1, p, ind + 3);
            if let Some(code) = &rule.end_code {
                indent(out, ind + 3);
                let _ = writeln!(out, "if !{p}lex.scanner.is_stale() {code}");
            }
            indent(out, ind + 2);
            out.push_str("}\n");
        }
    }
    indent(out, ind + 2);
    let _ = writeln!(out, "_ => break 'scan{level},");
    indent(out, ind + 1);
    out.push_str("}\n");
    indent(out, ind);
    out.push_str("}\n");
}

fn write_table(out: &mut String, table: &RuleTable, ind: usize) {
    indent(out, ind);
    out.push_str("RuleTable {\n");

    indent(out, ind + 1);
    out.push_str("acc: vec![");
    for (i, acc) in table.acc.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{acc}");
    }
    out.push_str("],\n");

    indent(out, ind + 1);
    out.push_str("trans: vec![\n");
    for row in &table.trans {
        indent(out, ind + 2);
        out.push_str("StateRow { runes: vec![");
        for (i, &(c, to)) in row.runes.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "({c:?}, {to})");
        }
        out.push_str("], ranges: vec![");
        for (i, &(lo, hi, to)) in row.ranges.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "({lo}, {hi}, {to})");
        }
        let _ = writeln!(out, "], wild: {} }},", row.wild);
    }
    indent(out, ind + 1);
    out.push_str("],\n");

    write_i32s(out, "startf", &table.startf, ind + 1);
    write_i32s(out, "endf", &table.endf, ind + 1);

    indent(out, ind + 1);
    if table.nest.is_empty() {
        out.push_str("nest: vec![],\n");
    } else {
        out.push_str("nest: vec![\n");
        for nested in &table.nest {
            write_table(out, nested, ind + 2);
        }
        indent(out, ind + 1);
        out.push_str("],\n");
    }

    indent(out, ind);
    out.push_str("},\n");
}

fn write_i32s(out: &mut String, name: &str, values: &[i32], ind: usize) {
    indent(out, ind);
    let _ = write!(out, "{name}: vec![");
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{v}");
    }
    out.push_str("],\n");
}

fn indent(out: &mut String, levels: usize) {
    for _ in 0..levels {
        out.push_str("    ");
    }
}
