//! # Specification files
//! A weft specification is a list of rules, where each rule pairs a regular
//! expression with a block of action code. The file is read as a sequence of
//! code points and parsed into a [Rule] tree whose child order defines rule
//! precedence (earlier rules win ties).
//!
//! ## Format
//! ```text
//! < { start code }          # optional, brackets the whole rule list
//! /regex/   { action code }
//! /outer/ < { group start code }
//!     /inner/ { action code }
//! >         { group end code }
//! > { end code }
//! //
//! ...user code, copied verbatim into the generated file...
//! ```
//!
//! Each rule starts with an arbitrary delimiter character (commonly `/`); the
//! regex body runs to the next unescaped occurrence of the same delimiter and
//! may not contain a newline. After the body comes either a balanced-brace
//! action block, or `<` opening a nested rule list that applies to the text
//! matched by the rule. A nested list is closed by `>`; both `<` and `>` may
//! be followed by an optional code block, run when the group is entered and
//! exited. An empty regex (two consecutive delimiters) terminates the rule
//! list; everything after it is passed through to the generated file.
//!
//! Whitespace between tokens is skipped. A line counter feeds diagnostics,
//! and each rule's [id](Rule::id) is the line its regex starts on.
//!
//! ## Example
//! ```
//! let spec = weft::spec::parse("/ab*/ { ab() }\n/./ { other() }\n//\nfn main() {}\n").unwrap();
//! assert_eq!(spec.root.kids.len(), 2);
//! assert_eq!(spec.root.kids[0].regex, "ab*");
//! assert_eq!(spec.root.kids[1].id, 2);
//! assert_eq!(spec.user_code.trim(), "fn main() {}");
//! ```

use thiserror::Error;

/// One rule of the specification: a regex, the action code to run when it
/// matches, optional hooks run when the rule's group is entered and exited,
/// and the nested rules scanned over this rule's matched text. The root of
/// the tree is synthetic: its regex is empty and its children are the
/// top-level rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// The regex body, verbatim (escapes still in place).
    pub regex: String,
    /// The action block, including its outer braces.
    pub action: String,
    /// Code run when this rule's group is entered, if any.
    pub start_code: Option<String>,
    /// Code run when this rule's group is exited, if any.
    pub end_code: Option<String>,
    /// The line the regex starts on; used in diagnostics.
    pub id: usize,
    /// Nested rules, in precedence order.
    pub kids: Vec<Rule>,
}

impl Rule {
    fn new(regex: String, id: usize) -> Self {
        Rule {
            regex,
            action: String::new(),
            start_code: None,
            end_code: None,
            id,
            kids: Vec::new(),
        }
    }

    /// Whether this rule has no nested rules.
    pub fn is_leaf(&self) -> bool {
        self.kids.is_empty()
    }
}

/// A parsed specification: the rule tree plus the user code following the
/// terminator, which the emitter copies verbatim into the generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spec {
    pub root: Rule,
    pub user_code: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("line {0}: unexpected end of file")]
    UnexpectedEof(usize),
    #[error("line {0}: newline inside a regex")]
    NewlineInRegex(usize),
    #[error("line {0}: unmatched '{{'")]
    UnmatchedBrace(usize),
    #[error("line {0}: unmatched '<'")]
    UnmatchedOpen(usize),
    #[error("line {0}: unmatched '>'")]
    UnmatchedClose(usize),
    #[error("line {0}: '<' may only open the file or follow a rule's regex")]
    MisplacedOpen(usize),
    #[error("line {0}: empty regex inside a rule group")]
    EmptyNestedRegex(usize),
    #[error("line {0}: expected '{{' action code or '<' sub-rule list after regex")]
    MissingAction(usize),
}

/// Parses a specification file into a [Spec]. The input is consumed as code
/// points; errors carry the line they were detected on.
pub fn parse(input: &str) -> Result<Spec, SpecError> {
    let mut cur = Cursor::new(input);
    let mut root = Rule::new(String::new(), 0);

    cur.skip_ws();
    let mut top_open = None;
    if cur.peek() == Some('<') {
        top_open = Some(cur.line);
        cur.bump();
        cur.skip_ws();
        if cur.peek() == Some('{') {
            root.start_code = Some(code_block(&mut cur)?);
        }
    }

    let user_code = rule_list(&mut cur, &mut root, top_open, true)?;
    Ok(Spec { root, user_code })
}

/// Parses rules into `parent.kids` until the list is terminated. `open` is
/// the line of the unmatched `<` this list has to close, if any. At top
/// level (`top`), the list ends at the empty-regex terminator or EOF and the
/// remainder of the input is returned as user code.
fn rule_list(
    cur: &mut Cursor,
    parent: &mut Rule,
    open: Option<usize>,
    top: bool,
) -> Result<String, SpecError> {
    let mut open = open;
    loop {
        cur.skip_ws();
        let Some(c) = cur.peek() else {
            return match open {
                Some(line) => Err(SpecError::UnmatchedOpen(line)),
                None if top => Ok(String::new()),
                None => Err(SpecError::UnexpectedEof(cur.line)),
            };
        };

        match c {
            '>' => {
                if open.is_none() {
                    return Err(SpecError::UnmatchedClose(cur.line));
                }
                cur.bump();
                cur.skip_ws();
                if cur.peek() == Some('{') {
                    parent.end_code = Some(code_block(cur)?);
                }
                open = None;
                if !top {
                    return Ok(String::new());
                }
            }
            '<' => return Err(SpecError::MisplacedOpen(cur.line)),
            delim => {
                let id = cur.line;
                cur.bump();
                let regex = regex_body(cur, delim, id)?;
                if regex.is_empty() {
                    if !top {
                        return Err(SpecError::EmptyNestedRegex(id));
                    }
                    if let Some(line) = open {
                        return Err(SpecError::UnmatchedOpen(line));
                    }
                    return Ok(cur.rest());
                }

                cur.skip_ws();
                match cur.peek() {
                    Some('{') => {
                        let mut rule = Rule::new(regex, id);
                        rule.action = code_block(cur)?;
                        parent.kids.push(rule);
                    }
                    Some('<') => {
                        let open_line = cur.line;
                        cur.bump();
                        cur.skip_ws();
                        let mut rule = Rule::new(regex, id);
                        if cur.peek() == Some('{') {
                            rule.start_code = Some(code_block(cur)?);
                        }
                        rule_list(cur, &mut rule, Some(open_line), false)?;
                        parent.kids.push(rule);
                    }
                    None => return Err(SpecError::UnexpectedEof(cur.line)),
                    Some(_) => return Err(SpecError::MissingAction(cur.line)),
                }
            }
        }
    }
}

/// Reads a regex body up to the next unescaped `delim`. A backslash escapes
/// the following code point for delimiter purposes only; both code points are
/// kept for the regex parser. Newlines are not allowed in a body.
fn regex_body(cur: &mut Cursor, delim: char, id: usize) -> Result<String, SpecError> {
    let mut body = String::new();
    loop {
        match cur.bump() {
            None => return Err(SpecError::UnexpectedEof(cur.line)),
            Some('\n') => return Err(SpecError::NewlineInRegex(id)),
            Some('\\') => {
                body.push('\\');
                match cur.bump() {
                    None => return Err(SpecError::UnexpectedEof(cur.line)),
                    Some('\n') => return Err(SpecError::NewlineInRegex(id)),
                    Some(c) => body.push(c),
                }
            }
            Some(c) if c == delim => return Ok(body),
            Some(c) => body.push(c),
        }
    }
}

/// Reads a balanced-braces code block, returning it with its outer braces.
/// The cursor must be on the opening `{`. Brace counting is purely lexical:
/// braces inside string literals of the action code count too.
fn code_block(cur: &mut Cursor) -> Result<String, SpecError> {
    let open_line = cur.line;
    let mut out = String::new();
    out.push(cur.bump().expect("caller checked for '{'"));
    let mut depth = 1usize;
    loop {
        match cur.bump() {
            None => return Err(SpecError::UnmatchedBrace(open_line)),
            Some(c) => {
                out.push(c);
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(out);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Code-point cursor over the input with a 1-based line counter.
struct Cursor {
    src: Vec<char>,
    pos: usize,
    line: usize,
}

impl Cursor {
    fn new(input: &str) -> Self {
        Cursor {
            src: input.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.bump();
        }
    }

    fn rest(&self) -> String {
        self.src[self.pos..].iter().collect()
    }
}
