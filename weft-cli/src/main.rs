use clap::Parser;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use weft::dfa::RuleDfa;
use weft::spec::Rule;
use weft::{dfa, emit, spec};

/// Generates a Rust lexer from a rule specification.
#[derive(Debug, Parser)]
#[command(name = "weft", version)]
struct Options {
    /// Output file (defaults to the input path with an .rs extension, or
    /// stdout when reading stdin)
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Identifier prefix used in the generated code
    #[arg(short = 'p', default_value = "yy", value_name = "PREFIX")]
    prefix: String,

    /// Standalone mode: emit a free driver function instead of the lex()
    /// method
    #[arg(short = 's')]
    standalone: bool,

    /// Suppress the default error handler
    #[arg(short = 'e')]
    custom_error: bool,

    /// Compile the generated program with rustc and run it, piping stdio
    /// through
    #[arg(short = 'r')]
    run: bool,

    /// Write the NFA of every rule to a DOT file
    #[arg(long, value_name = "FILE")]
    nfadot: Option<PathBuf>,

    /// Write the DFA of every rule to a DOT file
    #[arg(long, value_name = "FILE")]
    dfadot: Option<PathBuf>,

    /// Input specification (stdin when omitted)
    input: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum Error {
    #[error("{}: {1}", .0.display())]
    File(PathBuf, io::Error),
    #[error("input file already has a .rs extension: {}", .0.display())]
    RustInput(PathBuf),
    #[error("{0}")]
    Spec(#[from] spec::SpecError),
    #[error("{0}")]
    Compile(String),
    #[error("rustc: {0}")]
    Rustc(io::Error),
    #[error("rustc exited with {0}")]
    RustcFailed(std::process::ExitStatus),
    #[error("temporary directory: {0}")]
    TempDir(io::Error),
}

fn main() {
    env_logger::init();
    match run() {
        Ok(status) => std::process::exit(status),
        Err(e) => {
            eprintln!("weft: {e}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32, Error> {
    let options = Options::parse();

    if let Some(input) = &options.input {
        if input.extension().is_some_and(|ext| ext == "rs") {
            return Err(Error::RustInput(input.clone()));
        }
    }

    let source = match &options.input {
        Some(path) => fs::read_to_string(path).map_err(|e| Error::File(path.clone(), e))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| Error::File(PathBuf::from("<stdin>"), e))?;
            buf
        }
    };

    let spec = spec::parse(&source)?;
    let tree =
        dfa::compile_rule_tree(&spec.root).map_err(|e| Error::Compile(e.to_string()))?;

    if let Some(path) = &options.nfadot {
        write_file(path, &dot_graphs(&spec.root, &tree, true))?;
    }
    if let Some(path) = &options.dfadot {
        write_file(path, &dot_graphs(&spec.root, &tree, false))?;
    }

    let code = emit::generate(
        &spec,
        &tree,
        &emit::Options {
            prefix: options.prefix.clone(),
            standalone: options.standalone,
            custom_error: options.custom_error,
        },
    );

    if options.run {
        return compile_and_run(&code);
    }

    match output_path(&options) {
        Some(path) => write_file(&path, &code)?,
        None => io::stdout()
            .write_all(code.as_bytes())
            .map_err(|e| Error::File(PathBuf::from("<stdout>"), e))?,
    }
    Ok(0)
}

fn output_path(options: &Options) -> Option<PathBuf> {
    if let Some(out) = &options.output {
        return Some(out.clone());
    }
    options
        .input
        .as_ref()
        .map(|input| input.with_extension("rs"))
}

fn write_file(path: &Path, contents: &str) -> Result<(), Error> {
    fs::write(path, contents).map_err(|e| Error::File(path.to_path_buf(), e))
}

/// Generates into a temporary directory, builds with rustc and runs the
/// program with inherited stdio; the child's exit status becomes ours.
fn compile_and_run(code: &str) -> Result<i32, Error> {
    let dir = tempfile::tempdir().map_err(Error::TempDir)?;
    let source = dir.path().join("lexer.rs");
    let binary = dir.path().join("lexer");
    write_file(&source, code)?;

    let status = Command::new("rustc")
        .arg("--edition=2021")
        .arg("-O")
        .arg(&source)
        .arg("-o")
        .arg(&binary)
        .status()
        .map_err(Error::Rustc)?;
    if !status.success() {
        return Err(Error::RustcFailed(status));
    }

    let status = Command::new(&binary)
        .status()
        .map_err(|e| Error::File(binary.clone(), e))?;
    Ok(status.code().unwrap_or(1))
}

/// One digraph per rule, named by the rule's id line, in rule-tree order.
fn dot_graphs(rule: &Rule, tree: &RuleDfa, want_nfa: bool) -> String {
    let mut out = String::new();
    collect_dots(rule, tree, want_nfa, &mut out);
    out
}

fn collect_dots(rule: &Rule, tree: &RuleDfa, want_nfa: bool, out: &mut String) {
    let kind = if want_nfa { "nfa" } else { "dfa" };
    let name = format!("{kind}_{}", rule.id);
    if want_nfa {
        if let Some(nfa) = &tree.nfa {
            out.push_str(&nfa.compact().to_dot(&name));
        }
    } else if let Some(dfa) = &tree.dfa {
        out.push_str(&dfa.to_dot(&name));
    }
    for (kid, kid_tree) in rule.kids.iter().zip(&tree.nest) {
        collect_dots(kid, kid_tree, want_nfa, out);
    }
}
